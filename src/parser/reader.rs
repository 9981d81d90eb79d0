//! Buffered big-endian reads over a byte stream.
//!
//! Every read returns a `Result`; the first failure is meant to end the
//! whole decode. A short read is reported as `DecodeError::Truncated`
//! with the offset at which the stream ran out.

use crate::utils::error::DecodeError;
use std::io::{self, BufRead, BufReader, ErrorKind, Read};

/// Longest header string accepted before giving up on finding its NUL
const MAX_HEADER_LEN: u64 = 64;

/// Big-endian primitive reader with position tracking
pub struct ByteReader<R: Read> {
    inner: BufReader<R>,
    id_size: usize,
    offset: u64,
    scratch: [u8; 8],
}

impl<R: Read> ByteReader<R> {
    /// Wrap a raw stream; identifiers default to 8 bytes
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            id_size: 8,
            offset: 0,
            scratch: [0; 8],
        }
    }

    pub fn id_size(&self) -> usize {
        self.id_size
    }

    pub fn set_id_size(&mut self, id_size: usize) {
        self.id_size = id_size;
    }

    /// Number of bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn io_error(&self, err: io::Error) -> DecodeError {
        if err.kind() == ErrorKind::UnexpectedEof {
            DecodeError::Truncated {
                offset: self.offset,
            }
        } else {
            DecodeError::Io(err)
        }
    }

    fn fill(&mut self, n: usize) -> Result<&[u8], DecodeError> {
        let result = self.inner.read_exact(&mut self.scratch[..n]);
        if let Err(err) = result {
            return Err(self.io_error(err));
        }
        self.offset += n as u64;
        Ok(&self.scratch[..n])
    }

    pub fn u1(&mut self) -> Result<u8, DecodeError> {
        Ok(self.fill(1)?[0])
    }

    pub fn u2(&mut self) -> Result<u16, DecodeError> {
        let b = self.fill(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u4(&mut self) -> Result<u32, DecodeError> {
        let b = self.fill(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u8(&mut self) -> Result<u64, DecodeError> {
        let b = self.fill(8)?;
        Ok(u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    /// An object/string identifier of the configured width
    pub fn id(&mut self) -> Result<u64, DecodeError> {
        match self.id_size {
            4 => self.u4().map(u64::from),
            _ => self.u8(),
        }
    }

    /// Read exactly `n` bytes into a fresh buffer
    ///
    /// The buffer grows with the bytes actually read, so a bogus length in
    /// a truncated stream does not allocate up front.
    pub fn bytes(&mut self, n: usize) -> Result<Vec<u8>, DecodeError> {
        let mut buf = Vec::new();
        let result = (&mut self.inner).take(n as u64).read_to_end(&mut buf);
        let read = result.map_err(|err| self.io_error(err))?;
        self.offset += read as u64;
        if read < n {
            return Err(DecodeError::Truncated {
                offset: self.offset,
            });
        }
        Ok(buf)
    }

    /// Discard exactly `n` bytes
    pub fn skip(&mut self, n: u64) -> Result<(), DecodeError> {
        let result = io::copy(&mut (&mut self.inner).take(n), &mut io::sink());
        let copied = result.map_err(|err| self.io_error(err))?;
        self.offset += copied;
        if copied < n {
            return Err(DecodeError::Truncated {
                offset: self.offset,
            });
        }
        Ok(())
    }

    /// Read one byte, or `None` on a clean end of stream
    pub fn try_u1(&mut self) -> Result<Option<u8>, DecodeError> {
        let mut b = [0u8; 1];
        loop {
            let result = self.inner.read(&mut b);
            match result {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.offset += 1;
                    return Ok(Some(b[0]));
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(self.io_error(err)),
            }
        }
    }

    /// Read up to and including the next NUL byte
    ///
    /// Gives up after a short bound so a non-dump file fails fast.
    pub fn nul_terminated(&mut self) -> Result<Vec<u8>, DecodeError> {
        let mut buf = Vec::new();
        let result = (&mut self.inner).take(MAX_HEADER_LEN).read_until(0, &mut buf);
        let read = result.map_err(|err| self.io_error(err))?;
        self.offset += read as u64;
        Ok(buf)
    }
}
