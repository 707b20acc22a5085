use crate::{AsepriteError, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;
use std::io::{Cursor, Read};

fn to_ase(e: std::io::Error) -> AsepriteError {
    e.into()
}

/// Little-endian cursor over Aseprite data. All reads advance the cursor.
pub(crate) struct AseReader<T: Read> {
    input: T,
}

impl<'a> AseReader<Cursor<&'a [u8]>> {
    pub(crate) fn new(data: &'a [u8]) -> AseReader<Cursor<&'a [u8]>> {
        let input = Cursor::new(data);
        AseReader { input }
    }

    /// Number of bytes consumed so far.
    pub(crate) fn position(&self) -> u64 {
        self.input.position()
    }
}

impl<T> AseReader<T>
where
    T: Read,
{
    pub(crate) fn byte(&mut self) -> Result<u8> {
        self.input.read_u8().map_err(to_ase)
    }

    pub(crate) fn word(&mut self) -> Result<u16> {
        self.input.read_u16::<LittleEndian>().map_err(to_ase)
    }

    pub(crate) fn short(&mut self) -> Result<i16> {
        self.input.read_i16::<LittleEndian>().map_err(to_ase)
    }

    pub(crate) fn dword(&mut self) -> Result<u32> {
        self.input.read_u32::<LittleEndian>().map_err(to_ase)
    }

    pub(crate) fn long(&mut self) -> Result<i32> {
        self.input.read_i32::<LittleEndian>().map_err(to_ase)
    }

    pub(crate) fn qword(&mut self) -> Result<u64> {
        self.input.read_u64::<LittleEndian>().map_err(to_ase)
    }

    /// 32-bit fixed point number (16.16).
    pub(crate) fn fixed(&mut self) -> Result<f64> {
        self.long().map(|raw| raw as f64 / 65536.0)
    }

    pub(crate) fn string(&mut self) -> Result<String> {
        let str_len = self.word()?;
        let mut str_bytes = vec![0_u8; str_len as usize];
        self.read_exact(&mut str_bytes)?;
        let s = String::from_utf8(str_bytes)?;
        Ok(s)
    }

    pub(crate) fn read_exact(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.input.read_exact(buffer).map_err(to_ase)
    }

    pub(crate) fn skip_bytes(&mut self, count: usize) -> Result<()> {
        let skipped = std::io::copy(
            &mut (&mut self.input).take(count as u64),
            &mut std::io::sink(),
        )?;
        if skipped as usize != count {
            return Err(AsepriteError::InvalidInput(format!(
                "Unexpected end of data while skipping {} bytes ({} available)",
                count, skipped
            )));
        }
        Ok(())
    }

    /// Read exactly `limit` bytes. The buffer grows with the data actually
    /// present, so a bogus size from the file fails instead of allocating.
    pub(crate) fn take_bytes(&mut self, limit: usize) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        (&mut self.input).take(limit as u64).read_to_end(&mut output)?;
        if output.len() != limit {
            Err(AsepriteError::InvalidInput(format!(
                "Invalid data size. Expected: {}, Actual: {}",
                limit,
                output.len()
            )))
        } else {
            Ok(output)
        }
    }

    /// Inflate the rest of the input. Fails if the inflated data is shorter
    /// than `expected_output_size`; extra trailing bytes are dropped.
    pub(crate) fn unzip(self, expected_output_size: usize) -> Result<Vec<u8>> {
        let decoder = ZlibDecoder::new(self.input);
        let mut buffer = Vec::new();
        decoder
            .take(expected_output_size as u64)
            .read_to_end(&mut buffer)?;
        if buffer.len() < expected_output_size {
            return Err(AsepriteError::InvalidInput(format!(
                "Compressed block too small. Expected: {} bytes, Actual: {}",
                expected_output_size,
                buffer.len()
            )));
        }
        Ok(buffer)
    }
}
