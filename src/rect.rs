/// An axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Create a rectangle from its top-left corner and size.
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// One past the right edge, clamped to `i32::MAX`.
    pub fn right(&self) -> i32 {
        clamp_edge(self.x as i64 + self.width as i64)
    }

    /// One past the bottom edge, clamped to `i32::MAX`.
    pub fn bottom(&self) -> i32 {
        clamp_edge(self.y as i64 + self.height as i64)
    }

    /// Returns `true` if the point lies inside the rectangle.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && y >= self.y
            && (x as i64) < self.x as i64 + self.width as i64
            && (y as i64) < self.y as i64 + self.height as i64
    }
}

fn clamp_edge(edge: i64) -> i32 {
    edge.min(i32::MAX as i64) as i32
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn edges() {
        let r = Rect::new(-2, 3, 4, 5);
        assert_eq!((r.right(), r.bottom()), (2, 8));
        assert!(r.contains(-2, 3));
        assert!(r.contains(1, 7));
        assert!(!r.contains(2, 7));
    }

    #[test]
    fn edges_clamp_at_the_limit() {
        let r = Rect::new(i32::MAX - 1, 0, u32::MAX, 1);
        assert_eq!(r.right(), i32::MAX);
        assert_eq!(r.bottom(), 1);
        assert!(r.contains(i32::MAX, 0));
        assert!(!r.contains(i32::MAX - 2, 0));
    }
}
