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
//! Module for [`ArReader`] and the global magic checks.

use crate::{ArError, EntryMetadata, HEADER_LEN, MAGIC, PADDING};
use std::io::{self, Read};

/// Fills `buf` from `reader` until it is full or the stream ends.
/// Returns the number of bytes read.
fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Reads a whole block. Returns `false` if the stream ended before the first
/// byte, and an [`io::ErrorKind::UnexpectedEof`] error if it ended within the
/// block.
fn read_block<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<bool, ArError> {
    match read_full(reader, buf)? {
        0 => Ok(false),
        n if n == buf.len() => Ok(true),
        _ => Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
    }
}

/// Consumes the global archive magic from `reader`.
///
/// # Errors
/// - [`ArError::EndOfStream`] if the stream is empty,
/// - an [`io::ErrorKind::UnexpectedEof`] error if it ends within the magic,
/// - [`ArError::CorruptArchive`] if the bytes are not the magic.
pub fn check_magic<R: Read + ?Sized>(reader: &mut R) -> Result<(), ArError> {
    let mut magic = [0; MAGIC.len()];
    if !read_block(reader, &mut magic)? {
        return Err(ArError::EndOfStream);
    }
    if magic != MAGIC {
        return Err(ArError::CorruptArchive(
            "global archive header not found".into(),
        ));
    }
    Ok(())
}

/// Whether `reader` starts with the global archive magic.
pub fn has_magic<R: Read + ?Sized>(reader: &mut R) -> bool {
    check_magic(reader).is_ok()
}

/// Underlying stream with room for one pushed back byte.
#[derive(Debug)]
struct Source<R> {
    inner: R,
    lookahead: Option<u8>,
}

impl<R: Read> Source<R> {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0];
        match read_full(self, &mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    fn unread(&mut self, byte: u8) {
        debug_assert!(self.lookahead.is_none(), "only one byte can be pushed back");
        self.lookahead = Some(byte);
    }
}

impl<R: Read> Read for Source<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.lookahead.take() {
            Some(byte) => {
                buf[0] = byte;
                Ok(1)
            }
            None => self.inner.read(buf),
        }
    }
}

#[derive(Debug, Clone)]
enum ReaderState {
    /// The global magic was not checked yet.
    Fresh,
    /// The next byte is the start of a header.
    Positioned,
    /// Within the payload of an entry.
    InPayload { remaining: u64 },
    /// The stream ended cleanly.
    Exhausted,
    /// Every operation fails with this error until [`ArReader::reset`].
    Errored(ArError),
}

/// Sequential reader of an ar archive.
///
/// Call [`ArReader::next_entry`] to advance to the next entry, then read its
/// content with [`ArReader::read_payload`] or the [`Read`] implementation.
/// Payload that was not read is skipped on the next advance.
///
/// Once an operation failed, the reader returns the same error for all
/// following operations until it is [`ArReader::reset`].
#[derive(Debug)]
pub struct ArReader<R> {
    source: Source<R>,
    state: ReaderState,
}

impl<R: Read> ArReader<R> {
    /// Starts to parse a possible archive from `inner`.
    pub const fn new(inner: R) -> Self {
        Self {
            source: Source {
                inner,
                lookahead: None,
            },
            state: ReaderState::Fresh,
        }
    }

    /// Drops all state and starts to read a new archive from `inner`. Has the
    /// same effect as [`ArReader::new`]. Returns the previous stream.
    pub fn reset(&mut self, inner: R) -> R {
        core::mem::replace(self, Self::new(inner)).source.inner
    }

    /// Advances to the next entry of the archive and returns its metadata.
    /// Returns `None` at the end of the archive.
    pub fn next_entry(&mut self) -> Result<Option<EntryMetadata>, ArError> {
        match &self.state {
            ReaderState::Errored(err) => return Err(err.clone()),
            ReaderState::Exhausted => return Ok(None),
            _ => {}
        }

        match self.advance() {
            Ok(Some(entry)) => {
                log::trace!("Found entry {:?} of {} bytes", entry.name, entry.size);
                self.state = ReaderState::InPayload {
                    remaining: entry.size,
                };
                Ok(Some(entry))
            }
            Ok(None) => {
                log::debug!("End of ar archive");
                self.state = ReaderState::Exhausted;
                Ok(None)
            }
            Err(err) => self.stick(err),
        }
    }

    fn advance(&mut self) -> Result<Option<EntryMetadata>, ArError> {
        if let ReaderState::Fresh = self.state {
            match check_magic(&mut self.source) {
                Ok(()) => self.state = ReaderState::Positioned,
                // nothing at all, treat it like an archive without entries
                Err(ArError::EndOfStream) => return Ok(None),
                Err(err) => return Err(err),
            }
        }

        if let ReaderState::InPayload { remaining } = self.state {
            if !self.finish_payload(remaining)? {
                return Ok(None);
            }
            self.state = ReaderState::Positioned;
        }

        let mut block = [0; HEADER_LEN];
        if !read_block(&mut self.source, &mut block)? {
            return Ok(None);
        }
        EntryMetadata::decode(&block).map(Some)
    }

    /// Skips the rest of the current payload and the padding byte, if there
    /// is one. Returns `false` if the stream ended right after the payload.
    fn finish_payload(&mut self, remaining: u64) -> Result<bool, ArError> {
        if remaining > 0 {
            log::debug!("Skipping {remaining} unread payload bytes");
            let skipped = io::copy(&mut (&mut self.source).take(remaining), &mut io::sink())?;
            if skipped < remaining {
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
            }
        }

        match self.source.read_byte()? {
            Some(PADDING) => Ok(true),
            Some(byte) => {
                // no padding, the byte belongs to the next header
                self.source.unread(byte);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Reads payload of the current entry into `buf`. Returns `0` once the
    /// whole payload was read.
    ///
    /// # Errors
    /// Returns [`ArError::NoActiveEntry`] if [`ArReader::next_entry`] didn't
    /// return an entry.
    pub fn read_payload(&mut self, buf: &mut [u8]) -> Result<usize, ArError> {
        let remaining = match &self.state {
            ReaderState::Errored(err) => return Err(err.clone()),
            ReaderState::InPayload { remaining } => *remaining,
            _ => return Err(ArError::NoActiveEntry),
        };
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let len = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
        match self.source.read(&mut buf[..len]) {
            Ok(0) => self.stick(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
            Ok(n) => {
                self.state = ReaderState::InPayload {
                    remaining: remaining - n as u64,
                };
                Ok(n)
            }
            // the caller is expected to retry
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(e.into()),
            Err(e) => self.stick(e.into()),
        }
    }

    /// Number of payload bytes of the current entry that were not read yet.
    pub const fn remaining_payload(&self) -> Option<u64> {
        match self.state {
            ReaderState::InPayload { remaining } => Some(remaining),
            _ => None,
        }
    }

    /// Returns a reference to the underlying stream.
    pub const fn get_ref(&self) -> &R {
        &self.source.inner
    }

    /// Returns a mutable reference to the underlying stream. Reading from it
    /// desynchronizes the archive reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.source.inner
    }

    /// Unwraps the underlying stream. A pushed back header byte is lost.
    pub fn into_inner(self) -> R {
        self.source.inner
    }

    fn stick<T>(&mut self, err: ArError) -> Result<T, ArError> {
        log::warn!("Reading ar archive failed: {err}");
        self.state = ReaderState::Errored(err.clone());
        Err(err)
    }
}

impl<R: Read> Read for ArReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_payload(buf).map_err(io::Error::from)
    }
}
