use std::{error::Error, fmt, io, path::PathBuf, string::FromUtf8Error};

/// An error occured while loading an Aseprite file or deriving assets from it.
#[derive(Debug)]
pub enum AsepriteError {
    /// The input file does not exist.
    FileNotFound(PathBuf),
    /// The input data was malformed, truncated or inconsistent. String
    /// contains detailed message.
    InvalidInput(String),
    /// The input data was correct, but uses a feature that is not supported by
    /// this version of `asepack`. String contains detailed message.
    UnsupportedFeature(String),
    /// A caller-supplied index or option is out of range.
    InvalidArgument(String),
    /// A lookup by name failed.
    NotFound {
        /// What was looked up, e.g. `"tag"` or `"layer"`.
        kind: &'static str,
        /// The requested name.
        name: String,
        /// All names of this kind that do exist in the file.
        available: Vec<String>,
    },
    /// An internal error occurred.
    InternalError(String),
    /// An IO error occured while reading the input.
    IoError(io::Error),
}

impl AsepriteError {
    pub(crate) fn not_found<'a, I>(kind: &'static str, name: &str, available: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        AsepriteError::NotFound {
            kind,
            name: name.to_owned(),
            available: available.into_iter().map(str::to_owned).collect(),
        }
    }

    pub(crate) fn index_out_of_range(kind: &str, index: u32, count: u32) -> Self {
        AsepriteError::InvalidArgument(format!(
            "{} index out of range: {} (count: {})",
            kind, index, count
        ))
    }
}

impl From<io::Error> for AsepriteError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => {
                AsepriteError::InvalidInput(format!("Unexpected end of data: {}", err))
            }
            io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => {
                AsepriteError::InvalidInput(format!("Corrupt data block: {}", err))
            }
            _ => AsepriteError::IoError(err),
        }
    }
}

impl From<FromUtf8Error> for AsepriteError {
    fn from(err: FromUtf8Error) -> Self {
        AsepriteError::InvalidInput(format!("Could not decode utf8: {}", err))
    }
}

impl fmt::Display for AsepriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsepriteError::FileNotFound(path) => write!(f, "File not found: {}", path.display()),
            AsepriteError::InvalidInput(msg) => write!(f, "Invalid Aseprite input: {}", msg),
            AsepriteError::UnsupportedFeature(msg) => {
                write!(f, "Unsupported Aseprite feature: {}", msg)
            }
            AsepriteError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            AsepriteError::NotFound {
                kind,
                name,
                available,
            } => write!(
                f,
                "No {} named '{}'. Available: [{}]",
                kind,
                name,
                available.join(", ")
            ),
            AsepriteError::InternalError(msg) => {
                write!(f, "Internal error: {}", msg)
            }
            AsepriteError::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl Error for AsepriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AsepriteError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

#[test]
fn not_found_lists_available_names() {
    let err = AsepriteError::not_found("tag", "jump", vec!["idle", "run"]);
    assert_eq!(
        err.to_string(),
        "No tag named 'jump'. Available: [idle, run]"
    );
}

#[test]
fn eof_is_a_format_error() {
    let err: AsepriteError = io::Error::from(io::ErrorKind::UnexpectedEof).into();
    assert!(matches!(err, AsepriteError::InvalidInput(_)));
    let err: AsepriteError = io::Error::from(io::ErrorKind::PermissionDenied).into();
    assert!(matches!(err, AsepriteError::IoError(_)));
}
