//! The dynamically typed [`SqliteValue`] and the engine's coercion rules
//! between its storage classes.

use std::borrow::Cow;

use tessera_error::{Result, TesseraError};

use crate::StorageClass;

/// A dynamically-typed SQLite value.
///
/// Mirrors the engine's five storage classes, plus [`SqliteValue::ZeroBlob`]
/// for a blob of `n` zero bytes that is only materialized when its bytes are
/// read. Every accessor follows the engine's `CAST` rules rather than Rust's
/// own parsing or formatting.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum SqliteValue {
    /// SQL NULL.
    Null,
    /// A 64-bit signed integer.
    Integer(i64),
    /// A 64-bit IEEE 754 floating-point number.
    Float(f64),
    /// A UTF-8 text string.
    Text(String),
    /// A binary large object.
    Blob(Vec<u8>),
    /// A blob of the given length filled with zero bytes.
    ZeroBlob(usize),
}

impl SqliteValue {
    /// A zero-filled blob of `len` bytes.
    pub const fn zero_blob(len: usize) -> Self {
        Self::ZeroBlob(len)
    }

    /// Returns the storage class of this value.
    pub const fn storage_class(&self) -> StorageClass {
        match self {
            Self::Null => StorageClass::Null,
            Self::Integer(_) => StorageClass::Integer,
            Self::Float(_) => StorageClass::Real,
            Self::Text(_) => StorageClass::Text,
            Self::Blob(_) | Self::ZeroBlob(_) => StorageClass::Blob,
        }
    }

    /// Returns true if this is NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the SQLite `typeof()` string for this value.
    pub const fn typeof_str(&self) -> &'static str {
        self.storage_class().typeof_str()
    }

    /// Convert to a 64-bit integer following `CAST(x AS INTEGER)`.
    ///
    /// - NULL -> 0
    /// - Float -> truncated toward zero, saturating at `i64::MIN`/`i64::MAX`
    /// - Text -> longest leading integer after leading spaces, 0 if none
    /// - Blob -> bytes read as UTF-8 text, then as Text
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_int64(&self) -> i64 {
        match self {
            Self::Null | Self::ZeroBlob(_) => 0,
            Self::Integer(i) => *i,
            // `as` saturates out-of-range floats and maps NaN to 0.
            Self::Float(f) => *f as i64,
            Self::Text(s) => parse_integer_prefix(s),
            Self::Blob(b) => parse_integer_prefix(&String::from_utf8_lossy(b)),
        }
    }

    /// Convert to a 32-bit integer.
    ///
    /// Takes the low 32 bits of [`SqliteValue::to_int64`], as
    /// `sqlite3_value_int` does.
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_int32(&self) -> i32 {
        self.to_int64() as i32
    }

    /// Convert to a float following `CAST(x AS REAL)`.
    ///
    /// Text and blobs parse the longest leading decimal literal (optional
    /// minus, digits, optional fraction) after leading spaces; 0.0 if none.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_double(&self) -> f64 {
        match self {
            Self::Null | Self::ZeroBlob(_) => 0.0,
            Self::Integer(i) => *i as f64,
            Self::Float(f) => *f,
            Self::Text(s) => parse_float_prefix(s),
            Self::Blob(b) => parse_float_prefix(&String::from_utf8_lossy(b)),
        }
    }

    /// Convert to text.
    ///
    /// Fails with [`TesseraError::UnsupportedCoercion`] for floats, whose
    /// textual form is engine-defined.
    pub fn to_text(&self) -> Result<Cow<'_, str>> {
        match self {
            Self::Null => Ok(Cow::Borrowed("")),
            Self::Integer(i) => Ok(Cow::Owned(i.to_string())),
            Self::Float(_) => Err(self.unsupported("text")),
            Self::Text(s) => Ok(Cow::Borrowed(s)),
            Self::Blob(b) => Ok(String::from_utf8_lossy(b)),
            Self::ZeroBlob(n) => Ok(Cow::Owned("\0".repeat(*n))),
        }
    }

    /// Convert to blob bytes.
    ///
    /// Integers yield the bytes of their decimal text. Fails for floats.
    pub fn to_blob(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            Self::Null => Ok(Cow::Borrowed(&[])),
            Self::Integer(i) => Ok(Cow::Owned(i.to_string().into_bytes())),
            Self::Float(_) => Err(self.unsupported("blob")),
            Self::Text(s) => Ok(Cow::Borrowed(s.as_bytes())),
            Self::Blob(b) => Ok(Cow::Borrowed(b)),
            Self::ZeroBlob(n) => Ok(Cow::Owned(vec![0; *n])),
        }
    }

    /// Byte length of the value's text or blob form. Fails for floats.
    pub fn length(&self) -> Result<usize> {
        match self {
            Self::Null => Ok(0),
            Self::Integer(i) => Ok(decimal_len(*i)),
            Self::Float(_) => Err(self.unsupported("length")),
            Self::Text(s) => Ok(s.len()),
            Self::Blob(b) => Ok(b.len()),
            Self::ZeroBlob(n) => Ok(*n),
        }
    }

    /// Borrow the integer payload without coercion.
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Borrow the text payload without coercion.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    fn unsupported(&self, to: &'static str) -> TesseraError {
        TesseraError::UnsupportedCoercion {
            from: self.typeof_str(),
            to,
        }
    }
}

impl PartialEq for SqliteValue {
    #[allow(clippy::float_cmp)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::ZeroBlob(a), Self::ZeroBlob(b)) => a == b,
            (Self::Blob(a), Self::Blob(b)) => a == b,
            (Self::Blob(b), Self::ZeroBlob(n)) | (Self::ZeroBlob(n), Self::Blob(b)) => {
                b.len() == *n && b.iter().all(|&byte| byte == 0)
            }
            _ => false,
        }
    }
}

fn decimal_len(i: i64) -> usize {
    let digits = i.unsigned_abs().checked_ilog10().map_or(1, |log| log as usize + 1);
    digits + usize::from(i < 0)
}

/// Split `s` after leading spaces into (negative, digits, rest).
fn split_sign_digits(s: &str) -> (bool, &str, &str) {
    let s = s.trim_start_matches(' ');
    let (negative, unsigned) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let end = unsigned
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(unsigned.len());
    (negative, &unsigned[..end], &unsigned[end..])
}

fn parse_integer_prefix(s: &str) -> i64 {
    let (negative, digits, _) = split_sign_digits(s);
    if digits.is_empty() {
        return 0;
    }

    let magnitude = digits.bytes().try_fold(0_u64, |acc, b| {
        acc.checked_mul(10)?.checked_add(u64::from(b - b'0'))
    });

    match (magnitude, negative) {
        (Some(m), false) => i64::try_from(m).unwrap_or(i64::MAX),
        (Some(m), true) => 0_i64.checked_sub_unsigned(m).unwrap_or(i64::MIN),
        (None, false) => i64::MAX,
        (None, true) => i64::MIN,
    }
}

fn parse_float_prefix(s: &str) -> f64 {
    let trimmed = s.trim_start_matches(' ');
    let (negative, digits, rest) = split_sign_digits(trimmed);
    if digits.is_empty() {
        return 0.0;
    }

    let mut len = usize::from(negative) + digits.len();
    if let Some(fraction) = rest.strip_prefix('.') {
        let frac_digits = fraction
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        if frac_digits > 0 {
            len += 1 + frac_digits;
        }
    }

    trimmed[..len].parse::<f64>().unwrap_or(0.0)
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for SqliteValue {
                fn from(value: $ty) -> Self {
                    Self::Integer(i64::from(value))
                }
            }
        )*
    };
}

impl_from_integer!(i8, u8, i16, u16, i32, u32, i64, bool);

impl From<f64> for SqliteValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<f32> for SqliteValue {
    fn from(f: f32) -> Self {
        Self::Float(f64::from(f))
    }
}

impl From<String> for SqliteValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for SqliteValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<Vec<u8>> for SqliteValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Blob(b)
    }
}

impl From<&[u8]> for SqliteValue {
    fn from(b: &[u8]) -> Self {
        Self::Blob(b.to_vec())
    }
}

impl<T: Into<Self>> From<Option<T>> for SqliteValue {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn null_coercions() {
        let v = SqliteValue::Null;
        assert_eq!(v.to_int64(), 0);
        assert_eq!(v.to_int32(), 0);
        assert_eq!(v.to_double(), 0.0);
        assert_eq!(v.to_text().unwrap(), "");
        assert!(v.to_blob().unwrap().is_empty());
        assert_eq!(v.length().unwrap(), 0);
        assert_eq!(v.storage_class(), StorageClass::Null);
    }

    #[test]
    fn integer_text_and_length() {
        let v = SqliteValue::Integer(-1234);
        assert_eq!(v.to_text().unwrap(), "-1234");
        assert_eq!(&*v.to_blob().unwrap(), b"-1234");
        assert_eq!(v.length().unwrap(), 5);
        assert_eq!(v.to_double(), -1234.0);

        assert_eq!(SqliteValue::Integer(0).length().unwrap(), 1);
        assert_eq!(SqliteValue::Integer(i64::MIN).length().unwrap(), 20);
        assert_eq!(SqliteValue::Integer(i64::MAX).length().unwrap(), 19);
    }

    #[test]
    fn integer_to_int32_wraps() {
        assert_eq!(SqliteValue::Integer(3_147_483_648).to_int32(), -1_147_483_648);
        assert_eq!(SqliteValue::Integer(i64::from(i32::MAX)).to_int32(), i32::MAX);
    }

    #[test]
    fn float_truncates_and_saturates() {
        assert_eq!(SqliteValue::Float(1.11).to_int64(), 1);
        assert_eq!(SqliteValue::Float(-195_489_100.8377).to_int64(), -195_489_100);
        assert_eq!(SqliteValue::Float(1.123_456_789_012_345_7e100).to_int64(), i64::MAX);
        assert_eq!(SqliteValue::Float(-1.123_456_789_012_345_7e100).to_int64(), i64::MIN);
    }

    #[test]
    fn float_text_blob_length_unsupported() {
        let v = SqliteValue::Float(1.7e3);
        assert!(matches!(
            v.to_text(),
            Err(TesseraError::UnsupportedCoercion { to: "text", .. })
        ));
        assert!(matches!(
            v.to_blob(),
            Err(TesseraError::UnsupportedCoercion { to: "blob", .. })
        ));
        assert!(v.length().is_err());
        assert_eq!(v.to_double(), 1700.0);
        assert_eq!(v.to_int64(), 1700);
    }

    #[test]
    fn text_integer_prefix() {
        let cases = [
            ("", 0),
            ("  1234.56", 1234),
            (" 1234.abasd", 1234),
            ("abacdd", 0),
            ("0x1A", 0),
            ("-1234", -1234),
            ("2147483647", 2_147_483_647),
            ("9223372036854775807", i64::MAX),
            ("-9223372036854775808", i64::MIN),
            ("9923372036854775809", i64::MAX),
            ("-9923372036854775809", i64::MIN),
            ("-", 0),
        ];
        for (text, expected) in cases {
            assert_eq!(
                SqliteValue::from(text).to_int64(),
                expected,
                "text {text:?}"
            );
        }
    }

    #[test]
    fn text_float_prefix() {
        assert_eq!(SqliteValue::from("  1234.56").to_double(), 1234.56);
        assert_eq!(SqliteValue::from(" 1234.abasd").to_double(), 1234.0);
        assert_eq!(SqliteValue::from("-12.5xyz").to_double(), -12.5);
        assert_eq!(SqliteValue::from("").to_double(), 0.0);
        assert_eq!(SqliteValue::from(".5").to_double(), 0.0);
    }

    #[test]
    fn blob_reads_through_text() {
        let v = SqliteValue::from(b"  42abc".as_slice());
        assert_eq!(v.to_int64(), 42);
        assert_eq!(v.to_double(), 42.0);
        assert_eq!(v.to_text().unwrap(), "  42abc");
    }

    #[test]
    fn zero_blob_matches_explicit_blob() {
        for n in [0_usize, 1, 2, 10] {
            let zero = SqliteValue::zero_blob(n);
            let explicit = SqliteValue::Blob(vec![0; n]);
            assert_eq!(zero.length().unwrap(), n);
            assert_eq!(zero.to_blob().unwrap(), explicit.to_blob().unwrap());
            assert_eq!(zero.to_text().unwrap(), explicit.to_text().unwrap());
            assert_eq!(zero.to_int64(), explicit.to_int64());
            assert_eq!(zero.to_double(), explicit.to_double());
            assert_eq!(zero.storage_class(), StorageClass::Blob);
            assert_eq!(zero, explicit);
        }
    }

    #[test]
    fn from_option() {
        assert!(SqliteValue::from(None::<i64>).is_null());
        assert_eq!(SqliteValue::from(Some(7_i32)), SqliteValue::Integer(7));
        assert_eq!(SqliteValue::from(true), SqliteValue::Integer(1));
    }

    #[test]
    fn serde_round_trip_keeps_zero_blob_lazy() {
        let json = serde_json::to_string(&SqliteValue::zero_blob(4)).unwrap();
        let back: SqliteValue = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, SqliteValue::ZeroBlob(4)));
    }
}
