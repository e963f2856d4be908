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
//! ar header definition, see <https://en.wikipedia.org/wiki/Ar_(Unix)>.
//! An ar archive is the global magic `!<arch>\n`, followed by entries. Each
//! entry is a 60 byte header of space padded ASCII fields followed by the
//! file content. Unfortunately there are several ar variants (GNU, BSD, ...)
//! which differ in how long file names and symbol tables are stored.
//!
//! This library only supports the common format all variants share.

#![allow(non_upper_case_globals)]

use crate::{ArError, ArFormatDecimal, ArFormatOctal, ArFormatString, HEADER_LEN, NAME_LEN};
use core::fmt::{Debug, Formatter};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Magic that terminates every entry header.
pub const ENTRY_MAGIC: [u8; 2] = *b"`\n";

/// Bit mask of the file type in a UNIX file mode.
const S_IFMT: u32 = 0o170000;
/// File type of a regular file.
const S_IFREG: u32 = 0o100000;

/// Wrapper around the UNIX file mode given in octal ASCII.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct Mode(ArFormatOctal<8>);

impl Mode {
    /// Parses the [`ModeFlags`] from the mode string. Only regular files are
    /// accepted, the file type bits are stripped from the result.
    pub fn to_flags(self) -> Result<ModeFlags, ArError> {
        let bits = self
            .0
            .as_number::<u32>()
            .map_err(|e| ArError::CorruptArchive(e.to_string()))?;

        if bits & !(ModeFlags::all().bits() | S_IFMT) != 0 {
            return Err(ArError::CorruptArchive("invalid file mode".into()));
        }

        match bits & S_IFMT {
            // no file type specified, assume regular file
            0 | S_IFREG => Ok(ModeFlags::from_bits_truncate(bits)),
            _ => Err(ArError::NotImplemented("non-regular files")),
        }
    }

    /// Encodes the permission bits of `flags`. The file type is left out.
    pub fn from_flags(flags: ModeFlags) -> Option<Self> {
        ArFormatOctal::from_u64(u64::from(flags.bits())).map(Self)
    }
}

impl Debug for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(&self.to_flags(), f)
    }
}

bitflags::bitflags! {
    /// UNIX file permissions in octal format.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModeFlags: u32 {
        /// Owner read.
        const OwnerRead = 0o400;
        /// Owner write.
        const OwnerWrite = 0o200;
        /// Owner execute.
        const OwnerExec = 0o100;
        /// Group read.
        const GroupRead = 0o040;
        /// Group write.
        const GroupWrite = 0o020;
        /// Group execute.
        const GroupExec = 0o010;
        /// Others read.
        const OthersRead = 0o004;
        /// Others write.
        const OthersWrite = 0o002;
        /// Others execute.
        const OthersExec = 0o001;
    }
}

/// Header of an ar entry in its on-disk layout.
///
/// Each file is started by such a header, that describes the name, the
/// ownership and the size. The file content directly follows the header. If
/// the content ends on an odd offset, one `\n` byte of padding follows.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct RawHeader {
    pub name: ArFormatString<NAME_LEN>,
    /// Seconds since the Unix epoch.
    pub mtime: ArFormatDecimal<12>,
    pub owner: ArFormatDecimal<6>,
    pub group: ArFormatDecimal<6>,
    pub mode: Mode,
    pub size: ArFormatDecimal<10>,
    /// Must be [`ENTRY_MAGIC`].
    pub magic: [u8; 2],
}

const _: () = assert!(core::mem::size_of::<RawHeader>() == HEADER_LEN);
const _: () = assert!(core::mem::align_of::<RawHeader>() == 1);

impl RawHeader {
    /// Interprets a header block.
    pub fn from_bytes(bytes: &[u8; HEADER_LEN]) -> &Self {
        // SAFETY: RawHeader consists of byte arrays only, so it has the size
        // of the block, an alignment of 1 and every bit pattern is valid.
        unsafe { &*bytes.as_ptr().cast::<Self>() }
    }

    /// Returns the header block.
    pub fn as_bytes(&self) -> &[u8; HEADER_LEN] {
        // SAFETY: see `from_bytes`.
        unsafe { &*(self as *const Self).cast::<[u8; HEADER_LEN]>() }
    }

    /// Whether the header ends with [`ENTRY_MAGIC`].
    pub fn has_valid_magic(&self) -> bool {
        self.magic == ENTRY_MAGIC
    }

    /// Returns the number of payload bytes that follow the header.
    pub fn payload_size(&self) -> Result<u64, ArError> {
        self.size.as_number::<u64>().map_err(corrupt)
    }
}

fn corrupt<E: core::fmt::Display>(err: E) -> ArError {
    ArError::CorruptArchive(err.to_string())
}

/// Describes an entry in an archive.
/// Currently only supports regular files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    /// File name, at most 16 bytes.
    pub name: String,
    /// Permission bits.
    pub mode: ModeFlags,
    /// Length of the payload in bytes.
    pub size: u64,
    /// Modification time in seconds since the Unix epoch, negative before it.
    pub mtime: i64,
    /// Numeric user id, if stored.
    pub owner: Option<u32>,
    /// Numeric group id, if stored.
    pub group: Option<u32>,
}

impl EntryMetadata {
    /// Metadata of a `size` bytes long file, readable by everyone and
    /// writable by the owner, with a modification time of zero.
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            mode: ModeFlags::from_bits_truncate(0o644),
            size,
            mtime: 0,
            owner: None,
            group: None,
        }
    }

    /// Takes name, size, permissions, ownership and modification time from
    /// the metadata of a file on disk.
    #[cfg(unix)]
    pub fn from_fs_metadata(
        name: impl Into<String>,
        metadata: &std::fs::Metadata,
    ) -> Result<Self, ArError> {
        use std::os::unix::fs::MetadataExt;

        if !metadata.file_type().is_file() {
            return Err(ArError::NotImplemented("non-regular files"));
        }
        Ok(Self {
            name: name.into(),
            mode: ModeFlags::from_bits_truncate(metadata.mode()),
            size: metadata.size(),
            mtime: metadata.mtime(),
            owner: Some(metadata.uid()),
            group: Some(metadata.gid()),
        })
    }

    /// Modification time.
    pub fn modified(&self) -> SystemTime {
        let secs = Duration::from_secs(self.mtime.unsigned_abs());
        if self.mtime < 0 {
            UNIX_EPOCH - secs
        } else {
            UNIX_EPOCH + secs
        }
    }

    /// Sets the modification time. Sub-second precision is dropped, rounding
    /// towards the past.
    pub fn set_modified(&mut self, time: SystemTime) -> Result<(), ArError> {
        let mtime = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => i64::try_from(after.as_secs()).ok(),
            Err(err) => {
                let before = err.duration();
                let secs = before.as_secs() + u64::from(before.subsec_nanos() > 0);
                i64::try_from(secs).ok().map(|secs| -secs)
            }
        };
        self.mtime = mtime.ok_or(ArError::NotImplemented(
            "modification times out of the 64 bit range",
        ))?;
        Ok(())
    }

    /// Parses a header block.
    pub fn decode(block: &[u8; HEADER_LEN]) -> Result<Self, ArError> {
        let hdr = RawHeader::from_bytes(block);
        if !hdr.has_valid_magic() {
            return Err(ArError::CorruptArchive("per-file magic not found".into()));
        }

        let name = hdr.name.as_str().map_err(corrupt)?;
        if name.is_empty() {
            log::warn!("Found empty file name");
        }
        let mtime = hdr.mtime.as_number::<i64>().map_err(corrupt)?;
        let owner = decode_id(&hdr.owner)?;
        let group = decode_id(&hdr.group)?;
        let mode = hdr.mode.to_flags()?;
        let size = hdr.payload_size()?;

        Ok(Self {
            name: name.to_owned(),
            mode,
            size,
            mtime,
            owner,
            group,
        })
    }

    /// Builds the header block.
    pub fn encode(&self) -> Result<[u8; HEADER_LEN], ArError> {
        let hdr = RawHeader {
            name: ArFormatString::from_str_padded(&self.name)
                .ok_or(ArError::NotImplemented("file names longer than 16 bytes"))?,
            mtime: ArFormatDecimal::from_i64(self.mtime)
                .ok_or(ArError::NotImplemented("modification times wider than 12 characters"))?,
            owner: ArFormatDecimal::from_u64(u64::from(self.owner.unwrap_or(0)))
                .ok_or(ArError::NotImplemented("owner ids wider than 6 digits"))?,
            group: ArFormatDecimal::from_u64(u64::from(self.group.unwrap_or(0)))
                .ok_or(ArError::NotImplemented("group ids wider than 6 digits"))?,
            mode: Mode::from_flags(self.mode)
                .ok_or(ArError::NotImplemented("file modes wider than 8 digits"))?,
            size: ArFormatDecimal::from_u64(self.size)
                .ok_or(ArError::NotImplemented("files larger than 9999999999 bytes"))?,
            magic: ENTRY_MAGIC,
        };
        Ok(*hdr.as_bytes())
    }
}

/// Owner and group are optional, some archivers leave them blank.
fn decode_id<const N: usize>(field: &ArFormatDecimal<N>) -> Result<Option<u32>, ArError> {
    if field.as_inner().is_blank() {
        return Ok(None);
    }
    field.as_number::<u32>().map(Some).map_err(corrupt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAGIC;

    fn block(s: &str) -> [u8; HEADER_LEN] {
        s.as_bytes().try_into().unwrap()
    }

    /// Returns the first header of the archive.
    fn first_header(archive: &[u8]) -> &RawHeader {
        let block: &[u8; HEADER_LEN] = archive[MAGIC.len()..MAGIC.len() + HEADER_LEN]
            .try_into()
            .unwrap();
        RawHeader::from_bytes(block)
    }

    #[test]
    fn test_display_header() {
        let hdr = first_header(include_bytes!("../tests/common.a"));
        assert_eq!(hdr.name.as_str(), Ok("debian-binary"));
        assert!(hdr.has_valid_magic());
        assert_eq!(hdr.payload_size().unwrap(), 4);
        println!("{:#?}", hdr);
    }

    #[test]
    fn test_decode_regular_file_mode() {
        let meta = EntryMetadata::decode(&block(
            "debian-binary   1385068169  0     0     100644  4         `\n",
        ))
        .unwrap();
        assert_eq!(meta.name, "debian-binary");
        assert_eq!(meta.mtime, 1385068169);
        assert_eq!(meta.mode.bits(), 0o644);
        assert_eq!(meta.size, 4);
        assert_eq!(meta.owner, Some(0));
        assert_eq!(meta.group, Some(0));
    }

    #[test]
    fn test_decode_unspecified_file_type() {
        let meta = EntryMetadata::decode(&block(
            "debian-binary   1385068169  0     0     644     4         `\n",
        ))
        .unwrap();
        assert_eq!(meta.mode.bits(), 0o644);
        assert_eq!(
            meta.modified(),
            UNIX_EPOCH + Duration::from_secs(1385068169)
        );
    }

    #[test]
    fn test_decode_negative_mtime() {
        let meta = EntryMetadata::decode(&block(
            "debian-binary   -1          0     0     644     4         `\n",
        ))
        .unwrap();
        assert_eq!(meta.mtime, -1);
        assert_eq!(meta.modified(), UNIX_EPOCH - Duration::from_secs(1));
    }

    #[test]
    fn test_decode_rejects_plus_sign() {
        for hdr in [
            "debian-binary   1385068169  0     0     +644    4         `\n",
            "debian-binary   1385068169  0     0     644     +4        `\n",
            "debian-binary   +1          0     0     644     4         `\n",
        ] {
            let err = EntryMetadata::decode(&block(hdr)).unwrap_err();
            assert!(matches!(err, ArError::CorruptArchive(_)), "{hdr:?}: {err}");
        }
    }

    #[test]
    fn test_decode_non_regular_file() {
        let err = EntryMetadata::decode(&block(
            "debian-binary   1385068169  0     0     120644  4         `\n",
        ))
        .unwrap_err();
        assert_eq!(err.to_string(), "feature not implemented: non-regular files");
    }

    #[test]
    fn test_decode_invalid_mode() {
        let err = EntryMetadata::decode(&block(
            "debian-binary   1385068169  0     0     220644  4         `\n",
        ))
        .unwrap_err();
        assert_eq!(err.to_string(), "corrupt archive: invalid file mode");

        // setuid is not a permission bit
        let err = EntryMetadata::decode(&block(
            "debian-binary   1385068169  0     0     4755    4         `\n",
        ))
        .unwrap_err();
        assert!(matches!(err, ArError::CorruptArchive(_)));
    }

    #[test]
    fn test_decode_bad_entry_magic() {
        let err = EntryMetadata::decode(&block(
            "debian-binary   1385068169  0     0     644     4         \n`",
        ))
        .unwrap_err();
        assert_eq!(err.to_string(), "corrupt archive: per-file magic not found");
    }

    #[test]
    fn test_decode_bad_numbers() {
        for hdr in [
            "debian-binary   13850x8169  0     0     644     4         `\n",
            "debian-binary   1385068169  x     0     644     4         `\n",
            "debian-binary   1385068169  0     -1    644     4         `\n",
            "debian-binary   1385068169  0     0     648     4         `\n",
            "debian-binary   1385068169  0     0     644     4a        `\n",
            "debian-binary   1385068169  0     0     644               `\n",
        ] {
            let err = EntryMetadata::decode(&block(hdr)).unwrap_err();
            assert!(matches!(err, ArError::CorruptArchive(_)), "{hdr:?}: {err}");
        }
    }

    #[test]
    fn test_decode_blank_owner_and_group() {
        let meta = EntryMetadata::decode(&block(
            "data.tar.xz     1385068169              644     0         `\n",
        ))
        .unwrap();
        assert_eq!(meta.owner, None);
        assert_eq!(meta.group, None);
    }

    #[test]
    fn test_encode_matches_reference() {
        let mut meta = EntryMetadata::new("debian-binary", 4);
        meta.mtime = 1385068169;
        assert_eq!(
            &meta.encode().unwrap(),
            b"debian-binary   1385068169  0     0     644     4         `\n"
        );
    }

    #[test]
    fn test_round_trip() {
        let cases = [
            EntryMetadata::new("", 0),
            EntryMetadata {
                name: "control.tar.gz".into(),
                mode: ModeFlags::all(),
                size: 9_999_999_999,
                mtime: 999_999_999_999,
                owner: Some(999_999),
                group: Some(1000),
            },
            EntryMetadata {
                name: "before-epoch".into(),
                mode: ModeFlags::OwnerRead,
                size: 3,
                mtime: -99_999_999_999,
                owner: None,
                group: None,
            },
            EntryMetadata {
                name: "sixteen-bytes-xx".into(),
                mode: ModeFlags::OwnerRead | ModeFlags::GroupExec,
                size: 1,
                mtime: 1,
                owner: Some(0),
                group: Some(0),
            },
        ];
        for meta in cases {
            let decoded = EntryMetadata::decode(&meta.encode().unwrap()).unwrap();
            assert_eq!(decoded.name, meta.name);
            assert_eq!(decoded.mode, meta.mode);
            assert_eq!(decoded.size, meta.size);
            assert_eq!(decoded.mtime, meta.mtime);
        }
    }

    #[test]
    fn test_encode_rejects_long_name() {
        let meta = EntryMetadata::new("seventeen-bytes-x", 0);
        assert!(matches!(meta.encode(), Err(ArError::NotImplemented(_))));
    }

    #[test]
    fn test_encode_rejects_wide_numbers() {
        let meta = EntryMetadata::new("big", 10_000_000_000);
        assert!(matches!(meta.encode(), Err(ArError::NotImplemented(_))));

        let mut meta = EntryMetadata::new("owner", 0);
        meta.owner = Some(1_000_000);
        assert!(matches!(meta.encode(), Err(ArError::NotImplemented(_))));

        // the sign counts towards the width
        let mut meta = EntryMetadata::new("old", 0);
        meta.mtime = -100_000_000_000;
        assert!(matches!(meta.encode(), Err(ArError::NotImplemented(_))));
    }

    #[test]
    fn test_set_modified_drops_subsec() {
        let mut meta = EntryMetadata::new("a", 0);
        meta.set_modified(UNIX_EPOCH + Duration::from_millis(1_500))
            .unwrap();
        assert_eq!(meta.mtime, 1);

        meta.set_modified(UNIX_EPOCH - Duration::from_secs(1))
            .unwrap();
        assert_eq!(meta.mtime, -1);
        meta.set_modified(UNIX_EPOCH - Duration::from_millis(1_500))
            .unwrap();
        assert_eq!(meta.mtime, -2);
    }

    #[cfg(unix)]
    #[test]
    fn test_from_fs_metadata() {
        let meta = std::fs::metadata(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/common.a"))
            .unwrap();
        let entry = EntryMetadata::from_fs_metadata("common.a", &meta).unwrap();
        assert_eq!(entry.size, 132);
        assert!(entry.owner.is_some());

        let dir = std::fs::metadata(env!("CARGO_MANIFEST_DIR")).unwrap();
        assert!(matches!(
            EntryMetadata::from_fs_metadata("dir", &dir),
            Err(ArError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_size() {
        assert_eq!(HEADER_LEN, core::mem::size_of::<RawHeader>());
    }
}
