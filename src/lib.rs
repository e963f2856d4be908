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
//! Library to read and write common Unix "ar" archives as a stream. If you
//! need symbol tables or long file names (GNU or BSD style), I recommend the
//! use of <https://crates.io/crates/ar> instead.
//!
//! The crate is simple and only supports "basic" archives, as used by Debian
//! packages (`.deb`). The maximum supported file name length is 16 bytes. Only
//! regular files are supported, special files are rejected.
//!
//! Entries are processed strictly sequentially. Neither [`ArReader`] nor
//! [`ArWriter`] buffer whole files in memory, so archives of any size can be
//! processed with constant memory.
//!
//! ## Usage
//!
//! ```rust
//! use std::io::Read;
//! use ar_stream::{ArReader, ArWriter, EntryMetadata};
//!
//! let mut writer = ArWriter::new(Vec::new());
//! writer.write_entry(&EntryMetadata::new("debian-binary", 4), &b"2.0\n"[..]).unwrap();
//! let archive = writer.finish().unwrap();
//!
//! let mut reader = ArReader::new(archive.as_slice());
//! while let Some(entry) = reader.next_entry().unwrap() {
//!     let mut content = String::new();
//!     reader.read_to_string(&mut content).unwrap();
//!     println!("{}: {:?}", entry.name, content);
//! }
//! ```

#![deny(rustdoc::all)]
#![allow(rustdoc::missing_doc_code_examples)]
#![deny(clippy::all)]
#![deny(missing_debug_implementations)]

/// Global magic at the start of every archive.
pub const MAGIC: [u8; 8] = *b"!<arch>\n";

/// Each entry starts with a header of 60 bytes.
pub const HEADER_LEN: usize = 60;

/// Maximum length of a file name in bytes.
pub const NAME_LEN: usize = 16;

/// Keeps headers at even offsets.
const PADDING: u8 = b'\n';

mod ar_format_types;
mod error;
mod header;
mod reader;
mod writer;

pub use ar_format_types::*;
pub use error::*;
pub use header::*;
pub use reader::*;
pub use writer::*;

#[cfg(test)]
fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
