use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::Path;

use anyhow::{Context, Result};

/// Input over a file or a fully buffered stdin pipe.
///
/// A pipe is read to the end up front so its length is known for progress
/// reporting.
pub enum InputReader {
    File(BufReader<File>),
    Pipe(Cursor<Vec<u8>>),
}

impl InputReader {
    /// Opens `input_path`; "-" reads stdin.
    pub fn new<P: AsRef<Path>>(input_path: P) -> Result<Self> {
        let input_path = input_path.as_ref();

        if input_path.as_os_str() == "-" {
            let mut data = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut data)
                .context("Failed to read stdin")?;
            log::debug!("Buffered {} bytes from stdin", data.len());

            return Ok(Self::Pipe(Cursor::new(data)));
        }

        let file = File::open(input_path)
            .with_context(|| format!("Failed to open {}", input_path.display()))?;
        Ok(Self::File(BufReader::new(file)))
    }

    /// Total stream length in bytes.
    pub fn stream_len(&self) -> Result<u64> {
        let len = match self {
            Self::File(reader) => reader.get_ref().metadata()?.len(),
            Self::Pipe(cursor) => cursor.get_ref().len() as u64,
        };

        Ok(len)
    }
}

impl Read for InputReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::File(reader) => reader.read(buf),
            Self::Pipe(cursor) => cursor.read(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esframe::process::EXAMPLE_ADTS;
    use esframe::process::adts::AdtsExtractor;

    #[test]
    fn buffered_input_reports_its_length() -> Result<()> {
        let input = InputReader::Pipe(Cursor::new(EXAMPLE_ADTS.to_vec()));
        assert_eq!(input.stream_len()?, EXAMPLE_ADTS.len() as u64);

        let frames = AdtsExtractor::with_capacity(input, 9)?.count();
        assert_eq!(frames, 3);

        Ok(())
    }

    #[test]
    fn missing_file_is_reported() {
        let error = InputReader::new("does/not/exist.h264").err().unwrap();
        assert!(error.to_string().contains("does/not/exist.h264"));
    }
}
