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
//! Module for [`ArWriter`].

use crate::{ArError, EntryMetadata, HEADER_LEN, MAGIC, PADDING};
use std::io::{self, Read, Write};

#[derive(Debug, Clone)]
enum WriterState {
    /// Nothing was written yet, not even the global magic.
    Fresh,
    /// `offset` bytes of the archive were written.
    Started { offset: u64 },
    /// Every operation fails with this error until [`ArWriter::reset`].
    Errored(ArError),
}

/// Sequential writer of an ar archive.
///
/// The global magic is written together with the first entry. After each
/// entry the underlying sink is flushed.
///
/// Once an operation failed, the writer returns the same error for all
/// following operations until it is [`ArWriter::reset`].
#[derive(Debug)]
pub struct ArWriter<W> {
    inner: W,
    state: WriterState,
}

impl<W: Write> ArWriter<W> {
    /// Starts a new archive in `inner`.
    pub const fn new(inner: W) -> Self {
        Self {
            inner,
            state: WriterState::Fresh,
        }
    }

    /// Drops all state and starts a new archive in `inner`. Has the same
    /// effect as [`ArWriter::new`]. Returns the previous sink.
    pub fn reset(&mut self, inner: W) -> W {
        core::mem::replace(self, Self::new(inner)).inner
    }

    /// Appends an entry described by `entry`. Exactly `entry.size` bytes are
    /// copied from `payload`. Returns the number of bytes written to the
    /// sink, including the global magic and padding.
    ///
    /// # Errors
    /// - [`ArError::NotImplemented`] if `entry` can't be encoded, in which
    ///   case nothing is written,
    /// - [`ArError::ShortPayload`] if `payload` ends early. The missing bytes
    ///   are not made up for, the archive is unusable.
    pub fn write_entry<P: Read>(
        &mut self,
        entry: &EntryMetadata,
        payload: P,
    ) -> Result<u64, ArError> {
        let offset = match &self.state {
            WriterState::Errored(err) => return Err(err.clone()),
            WriterState::Fresh => None,
            WriterState::Started { offset } => Some(*offset),
        };

        match self.append(entry, payload, offset) {
            Ok(written) => {
                self.state = WriterState::Started {
                    offset: offset.unwrap_or(0) + written,
                };
                Ok(written)
            }
            Err(err) => {
                log::warn!("Writing ar entry {:?} failed: {err}", entry.name);
                self.state = WriterState::Errored(err.clone());
                Err(err)
            }
        }
    }

    fn append<P: Read>(
        &mut self,
        entry: &EntryMetadata,
        payload: P,
        offset: Option<u64>,
    ) -> Result<u64, ArError> {
        let header = entry.encode()?;
        let mut written = 0;

        if offset.is_none() {
            self.inner.write_all(&MAGIC)?;
            written += MAGIC.len() as u64;
        }
        self.inner.write_all(&header)?;
        written += HEADER_LEN as u64;

        let copied = io::copy(&mut payload.take(entry.size), &mut self.inner)?;
        written += copied;
        if copied < entry.size {
            return Err(ArError::ShortPayload {
                declared: entry.size,
                copied,
            });
        }

        if (offset.unwrap_or(0) + written) % 2 == 1 {
            self.inner.write_all(&[PADDING])?;
            written += 1;
        }
        self.inner.flush()?;

        log::trace!("Wrote entry {:?} of {} bytes", entry.name, entry.size);
        Ok(written)
    }

    /// Ends the archive and returns the sink. An archive without entries
    /// still gets the global magic.
    pub fn finish(mut self) -> Result<W, ArError> {
        match self.state {
            WriterState::Errored(err) => return Err(err),
            WriterState::Fresh => self.inner.write_all(&MAGIC)?,
            WriterState::Started { .. } => {}
        }
        self.inner.flush()?;
        Ok(self.inner)
    }

    /// Returns a reference to the underlying sink.
    pub const fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Returns a mutable reference to the underlying sink. Writing to it
    /// corrupts the archive.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Unwraps the underlying sink without finishing the archive.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
