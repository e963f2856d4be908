use core::fmt::{Debug, Formatter};
use core::str::{from_utf8, Utf8Error};

/// Base type for strings embedded in an ar header. The length depends on the
/// context. The returned string is likely to be ASCII, which is verified
/// by getters, such as [`ArFormatString::as_str`].
///
/// Unlike C-style strings, ar header fields are never NULL terminated. The
/// value is left-justified and the unused bytes are ASCII spaces.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct ArFormatString<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> ArFormatString<N> {
    /// Constructor.
    ///
    /// # Panics
    /// Panics of `N` is zero, i.e., the underlying array has no length.
    #[must_use]
    pub const fn new(bytes: [u8; N]) -> Self {
        assert!(N > 0, "array should have at least one element");
        Self { bytes }
    }

    /// Creates a field that only consists of padding.
    #[must_use]
    pub const fn blank() -> Self {
        Self::new([b' '; N])
    }

    /// Left-justifies `value` in a new field. Returns `None` if `value`
    /// needs more than `N` bytes.
    #[must_use]
    pub fn from_str_padded(value: &str) -> Option<Self> {
        let value = value.as_bytes();
        if value.len() > N {
            return None;
        }
        let mut field = Self::blank();
        field.bytes[..value.len()].copy_from_slice(value);
        Some(field)
    }

    /// True if the field only contains whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.bytes.iter().all(u8::is_ascii_whitespace)
    }

    /// Returns the raw bytes of the field, including the padding.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    /// Returns a str ref without leading and trailing whitespace.
    ///
    /// # Errors
    /// Returns a [`Utf8Error`] error for invalid strings.
    pub fn as_str(&self) -> Result<&str, Utf8Error> {
        from_utf8(&self.bytes).map(|str| str.trim_matches(|c: char| c.is_ascii_whitespace()))
    }
}

impl<const N: usize> Debug for ArFormatString<N> {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        write!(f, "str='{:?}',byte_usage={}", self.as_str(), N)
    }
}

/// A number with a specified base. Surrounding spaces in the string are ignored.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct ArFormatNumber<const N: usize, const R: u32>(ArFormatString<N>);

/// An octal number. Surrounding spaces in the string are ignored.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct ArFormatOctal<const N: usize>(ArFormatNumber<N, 8>);

/// A decimal number. Surrounding spaces in the string are ignored.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct ArFormatDecimal<const N: usize>(ArFormatNumber<N, 10>);

impl<const N: usize, const R: u32> ArFormatNumber<N, R> {
    #[cfg(test)]
    const fn new(bytes: [u8; N]) -> Self {
        Self(ArFormatString::<N>::new(bytes))
    }

    /// Renders `value` with radix `R`, left-justified and space padded.
    /// Returns `None` if the digits don't fit into `N` bytes.
    #[must_use]
    pub fn from_u64(value: u64) -> Option<Self> {
        Self::render(false, value)
    }

    /// Like [`Self::from_u64`], a negative `value` is prefixed with `-`.
    #[must_use]
    pub fn from_i64(value: i64) -> Option<Self> {
        Self::render(value < 0, value.unsigned_abs())
    }

    fn render(negative: bool, mut magnitude: u64) -> Option<Self> {
        debug_assert!((2..=10).contains(&R), "only digit radixes are supported");
        let mut digits = [0u8; 64];
        let mut len = 0;
        loop {
            digits[len] = b'0' + (magnitude % u64::from(R)) as u8;
            len += 1;
            magnitude /= u64::from(R);
            if magnitude == 0 {
                break;
            }
        }
        if negative {
            digits[len] = b'-';
            len += 1;
        }
        if len > N {
            return None;
        }

        let mut field = ArFormatString::<N>::blank();
        for (dst, src) in field.bytes.iter_mut().zip(digits[..len].iter().rev()) {
            *dst = *src;
        }
        Some(Self(field))
    }

    /// Interprets the underlying value as a number of the specified type using
    /// its respective radix.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying value cannot be parsed as a number
    /// of the specified type and respective radix. Blank fields and a
    /// leading `+` are an error, too.
    pub fn as_number<T>(&self) -> core::result::Result<T, T::FromStrRadixErr>
    where
        T: num_traits::Num,
    {
        // invalid UTF-8 or an explicit plus can't be a number; let the parser
        // report it
        let str = match self.0.as_str() {
            Ok(str) if !str.starts_with('+') => str,
            _ => "\u{fffd}",
        };
        T::from_str_radix(str, R)
    }

    /// Returns the underlying [`ArFormatString`].
    #[must_use]
    pub const fn as_inner(&self) -> &ArFormatString<N> {
        &self.0
    }
}

impl<const N: usize, const R: u32> Debug for ArFormatNumber<N, R> {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        match self.as_number::<i128>() {
            Err(msg) => write!(f, "{} [{:?}]", msg, self.0.as_str()),
            Ok(val) => write!(f, "{} [{:?}]", val, self.0.as_str()),
        }
    }
}

impl<const N: usize> Debug for ArFormatOctal<N> {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

impl<const N: usize> Debug for ArFormatDecimal<N> {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

impl<const N: usize> ArFormatDecimal<N> {
    /// See [`ArFormatNumber::from_u64`].
    #[must_use]
    pub fn from_u64(value: u64) -> Option<Self> {
        ArFormatNumber::from_u64(value).map(Self)
    }

    /// See [`ArFormatNumber::from_i64`].
    #[must_use]
    pub fn from_i64(value: i64) -> Option<Self> {
        ArFormatNumber::from_i64(value).map(Self)
    }

    /// Interprets the underlying value as a decimal number.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying value cannot be parsed as a number
    /// of the specified type.
    pub fn as_number<T>(&self) -> core::result::Result<T, T::FromStrRadixErr>
    where
        T: num_traits::Num,
    {
        self.0.as_number::<T>()
    }

    /// Returns the underlying [`ArFormatString`].
    #[must_use]
    pub const fn as_inner(&self) -> &ArFormatString<N> {
        self.0.as_inner()
    }
}

impl<const N: usize> ArFormatOctal<N> {
    /// See [`ArFormatNumber::from_u64`].
    #[must_use]
    pub fn from_u64(value: u64) -> Option<Self> {
        ArFormatNumber::from_u64(value).map(Self)
    }

    /// Interprets the underlying value as an octal number.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying value cannot be parsed as a number
    /// of the specified type.
    pub fn as_number<T>(&self) -> core::result::Result<T, T::FromStrRadixErr>
    where
        T: num_traits::Num,
    {
        self.0.as_number::<T>()
    }

    /// Returns the underlying [`ArFormatString`].
    #[must_use]
    pub const fn as_inner(&self) -> &ArFormatString<N> {
        self.0.as_inner()
    }
}

#[cfg(test)]
mod ar_format_string_tests {
    use super::ArFormatString;

    use core::mem::size_of_val;

    #[test]
    fn test_blank_string() {
        let blank = ArFormatString::<4>::blank();
        assert_eq!(size_of_val(&blank), 4);
        assert!(blank.is_blank());
        assert_eq!(blank.as_str(), Ok(""));
    }

    #[test]
    fn test_trims_padding() {
        let s = ArFormatString::new(*b"debian-binary   ");
        assert!(!s.is_blank());
        assert_eq!(s.as_str(), Ok("debian-binary"));

        let s = ArFormatString::new(*b"  x ");
        assert_eq!(s.as_str(), Ok("x"));
    }

    #[test]
    fn test_from_str_padded() {
        let s = ArFormatString::<6>::from_str_padded("ab").unwrap();
        assert_eq!(s.as_bytes(), b"ab    ");

        let s = ArFormatString::<2>::from_str_padded("ab").unwrap();
        assert_eq!(s.as_bytes(), b"ab");

        assert!(ArFormatString::<2>::from_str_padded("abc").is_none());
    }

    #[test]
    fn test_invalid_utf8() {
        let s = ArFormatString::new([0xff, b' ']);
        assert!(s.as_str().is_err());
    }
}
