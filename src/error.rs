/*
MIT License

Copyright (c) 2021 Philipp Schuster

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/
//! Module for [`ArError`].

use std::io;
use std::sync::Arc;

/// Errors that may happen while reading or writing an ar archive.
///
/// The error is [`Clone`] so that [`crate::ArReader`] and [`crate::ArWriter`]
/// can hand out the same error again for every call after a failure.
#[derive(thiserror::Error, Debug, Clone)]
pub enum ArError {
    /// The byte stream does not conform to the ar format.
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),
    /// The archive may be valid, but it uses a feature this crate does not
    /// support.
    #[error("feature not implemented: {0}")]
    NotImplemented(&'static str),
    /// The stream ended cleanly before the first byte of a structure.
    #[error("end of stream")]
    EndOfStream,
    /// Payload bytes were requested while no entry is open.
    #[error("no active archive entry")]
    NoActiveEntry,
    /// The payload source of an entry ended before the declared size.
    #[error("payload ended after {copied} of {declared} declared bytes")]
    ShortPayload { declared: u64, copied: u64 },
    /// Error of the underlying stream, passed through untouched.
    #[error("I/O error: {0}")]
    Io(Arc<io::Error>),
}

impl ArError {
    /// Returns the [`io::ErrorKind`] of a wrapped I/O error.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io(err) => Some(err.kind()),
            _ => None,
        }
    }

    /// True if the underlying stream ended in the middle of a structure.
    pub fn is_unexpected_eof(&self) -> bool {
        self.io_kind() == Some(io::ErrorKind::UnexpectedEof)
    }
}

impl From<io::Error> for ArError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<ArError> for io::Error {
    fn from(err: ArError) -> Self {
        let kind = match &err {
            ArError::Io(inner) => inner.kind(),
            ArError::EndOfStream | ArError::ShortPayload { .. } => io::ErrorKind::UnexpectedEof,
            ArError::NoActiveEntry => io::ErrorKind::NotFound,
            ArError::NotImplemented(_) => io::ErrorKind::Unsupported,
            ArError::CorruptArchive(_) => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, err)
    }
}
