//! Conversions between Rust field types and [`SqliteValue`].
//!
//! Reading goes through the value's coercion accessors so a column holding
//! any storage class can be read into any supported type the way the engine
//! would cast it. Narrowing conversions that do not fit report
//! [`TesseraError::OutOfRange`] instead of wrapping.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tessera_error::{Result, TesseraError};
use uuid::Uuid;

use crate::SqliteValue;

/// The declared kind of a mapped field, used to pick its SQL column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Char,
    Text,
    Blob,
    Duration,
    SystemTime,
    Uuid,
    /// A field-less enum stored as its integer discriminant.
    Enum,
}

impl ValueKind {
    /// Rust-facing name of the kind, for diagnostics.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Char => "char",
            Self::Text => "String",
            Self::Blob => "Vec<u8>",
            Self::Duration => "Duration",
            Self::SystemTime => "SystemTime",
            Self::Uuid => "Uuid",
            Self::Enum => "enum",
        }
    }
}

/// A Rust type that can be stored in and read back from a column.
///
/// `Option<T>` maps `None` to NULL and NULL back to `None`; every other
/// implementation reads NULL through the usual coercions (0, 0.0, "").
pub trait ColumnValue: Sized {
    /// The kind that decides this type's SQL column type.
    const KIND: ValueKind;

    fn to_sqlite_value(&self) -> SqliteValue;

    fn from_sqlite_value(value: &SqliteValue) -> Result<Self>;
}

macro_rules! impl_narrow_integer {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl ColumnValue for $ty {
                const KIND: ValueKind = ValueKind::$kind;

                fn to_sqlite_value(&self) -> SqliteValue {
                    SqliteValue::Integer(i64::from(*self))
                }

                fn from_sqlite_value(value: &SqliteValue) -> Result<Self> {
                    let wide = value.to_int64();
                    <$ty>::try_from(wide)
                        .map_err(|_| TesseraError::out_of_range(stringify!($ty), wide))
                }
            }
        )*
    };
}

impl_narrow_integer!(i8 => I8, u8 => U8, i16 => I16, u16 => U16, i32 => I32, u32 => U32);

impl ColumnValue for i64 {
    const KIND: ValueKind = ValueKind::I64;

    fn to_sqlite_value(&self) -> SqliteValue {
        SqliteValue::Integer(*self)
    }

    fn from_sqlite_value(value: &SqliteValue) -> Result<Self> {
        Ok(value.to_int64())
    }
}

impl ColumnValue for u64 {
    const KIND: ValueKind = ValueKind::U64;

    fn to_sqlite_value(&self) -> SqliteValue {
        i64::try_from(*self).map_or_else(
            |_| SqliteValue::Text(self.to_string()),
            SqliteValue::Integer,
        )
    }

    fn from_sqlite_value(value: &SqliteValue) -> Result<Self> {
        if let SqliteValue::Text(s) = value {
            if let Ok(parsed) = s.parse::<Self>() {
                return Ok(parsed);
            }
        }
        let wide = value.to_int64();
        Self::try_from(wide).map_err(|_| TesseraError::out_of_range("u64", wide))
    }
}

impl ColumnValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn to_sqlite_value(&self) -> SqliteValue {
        SqliteValue::Integer(i64::from(*self))
    }

    fn from_sqlite_value(value: &SqliteValue) -> Result<Self> {
        Ok(value.to_int64() != 0)
    }
}

impl ColumnValue for f64 {
    const KIND: ValueKind = ValueKind::F64;

    fn to_sqlite_value(&self) -> SqliteValue {
        SqliteValue::Float(*self)
    }

    fn from_sqlite_value(value: &SqliteValue) -> Result<Self> {
        Ok(value.to_double())
    }
}

impl ColumnValue for f32 {
    const KIND: ValueKind = ValueKind::F32;

    fn to_sqlite_value(&self) -> SqliteValue {
        SqliteValue::Float(f64::from(*self))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_sqlite_value(value: &SqliteValue) -> Result<Self> {
        Ok(value.to_double() as Self)
    }
}

impl ColumnValue for char {
    const KIND: ValueKind = ValueKind::Char;

    fn to_sqlite_value(&self) -> SqliteValue {
        SqliteValue::Text(self.to_string())
    }

    fn from_sqlite_value(value: &SqliteValue) -> Result<Self> {
        let text = value.to_text()?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(TesseraError::type_mismatch("char", text.into_owned())),
        }
    }
}

impl ColumnValue for String {
    const KIND: ValueKind = ValueKind::Text;

    fn to_sqlite_value(&self) -> SqliteValue {
        SqliteValue::Text(self.clone())
    }

    fn from_sqlite_value(value: &SqliteValue) -> Result<Self> {
        Ok(value.to_text()?.into_owned())
    }
}

impl ColumnValue for Vec<u8> {
    const KIND: ValueKind = ValueKind::Blob;

    fn to_sqlite_value(&self) -> SqliteValue {
        SqliteValue::Blob(self.clone())
    }

    fn from_sqlite_value(value: &SqliteValue) -> Result<Self> {
        Ok(value.to_blob()?.into_owned())
    }
}

/// Stored as whole microseconds.
impl ColumnValue for Duration {
    const KIND: ValueKind = ValueKind::Duration;

    fn to_sqlite_value(&self) -> SqliteValue {
        SqliteValue::Integer(i64::try_from(self.as_micros()).unwrap_or(i64::MAX))
    }

    fn from_sqlite_value(value: &SqliteValue) -> Result<Self> {
        let micros = value.to_int64();
        u64::try_from(micros)
            .map(Self::from_micros)
            .map_err(|_| TesseraError::out_of_range("Duration", micros))
    }
}

/// Stored as microseconds relative to the Unix epoch; negative before it.
impl ColumnValue for SystemTime {
    const KIND: ValueKind = ValueKind::SystemTime;

    fn to_sqlite_value(&self) -> SqliteValue {
        let micros = match self.duration_since(UNIX_EPOCH) {
            Ok(after) => i64::try_from(after.as_micros()).unwrap_or(i64::MAX),
            Err(before) => {
                i64::try_from(before.duration().as_micros()).map_or(i64::MIN, |m| -m)
            }
        };
        SqliteValue::Integer(micros)
    }

    fn from_sqlite_value(value: &SqliteValue) -> Result<Self> {
        let micros = value.to_int64();
        let offset = Duration::from_micros(micros.unsigned_abs());
        let time = if micros >= 0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        };
        time.ok_or_else(|| TesseraError::out_of_range("SystemTime", micros))
    }
}

/// Stored as hyphenated text; 16-byte blobs are also accepted on read.
impl ColumnValue for Uuid {
    const KIND: ValueKind = ValueKind::Uuid;

    fn to_sqlite_value(&self) -> SqliteValue {
        SqliteValue::Text(self.hyphenated().to_string())
    }

    fn from_sqlite_value(value: &SqliteValue) -> Result<Self> {
        if let SqliteValue::Blob(bytes) = value {
            if let Ok(id) = Self::from_slice(bytes) {
                return Ok(id);
            }
        }
        let text = value.to_text()?;
        Self::parse_str(&text).map_err(|_| TesseraError::type_mismatch("Uuid", text.into_owned()))
    }
}

impl<T: ColumnValue> ColumnValue for Option<T> {
    const KIND: ValueKind = T::KIND;

    fn to_sqlite_value(&self) -> SqliteValue {
        self.as_ref().map_or(SqliteValue::Null, T::to_sqlite_value)
    }

    fn from_sqlite_value(value: &SqliteValue) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_sqlite_value(value).map(Some)
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn narrow_integers_reject_overflow() {
        assert_eq!(i8::from_sqlite_value(&SqliteValue::Integer(-128)).unwrap(), -128);
        assert!(matches!(
            i8::from_sqlite_value(&SqliteValue::Integer(300)),
            Err(TesseraError::OutOfRange { .. })
        ));
        assert!(u32::from_sqlite_value(&SqliteValue::Integer(-1)).is_err());
        assert_eq!(u16::from_sqlite_value(&SqliteValue::from("  65535")).unwrap(), 65535);
    }

    #[test]
    fn bool_uses_integer_truthiness() {
        assert!(bool::from_sqlite_value(&SqliteValue::Integer(2)).unwrap());
        assert!(!bool::from_sqlite_value(&SqliteValue::Null).unwrap());
        assert_eq!(true.to_sqlite_value(), SqliteValue::Integer(1));
    }

    #[test]
    fn u64_above_i64_survives_as_text() {
        let big = u64::MAX;
        let stored = big.to_sqlite_value();
        assert_eq!(stored, SqliteValue::Text(big.to_string()));
        assert_eq!(u64::from_sqlite_value(&stored).unwrap(), big);
    }

    #[test]
    fn string_from_float_is_unsupported() {
        assert!(matches!(
            String::from_sqlite_value(&SqliteValue::Float(1.5)),
            Err(TesseraError::UnsupportedCoercion { .. })
        ));
        assert_eq!(
            String::from_sqlite_value(&SqliteValue::Integer(42)).unwrap(),
            "42"
        );
    }

    #[test]
    fn char_requires_single_character() {
        assert_eq!(char::from_sqlite_value(&SqliteValue::from("x")).unwrap(), 'x');
        assert!(char::from_sqlite_value(&SqliteValue::from("xy")).is_err());
    }

    #[test]
    fn durations_are_microseconds() {
        let d = Duration::from_millis(1500);
        assert_eq!(d.to_sqlite_value(), SqliteValue::Integer(1_500_000));
        assert_eq!(Duration::from_sqlite_value(&SqliteValue::Integer(1_500_000)).unwrap(), d);
        assert!(Duration::from_sqlite_value(&SqliteValue::Integer(-1)).is_err());
    }

    #[test]
    fn system_time_before_epoch_is_negative() {
        let before = UNIX_EPOCH - Duration::from_secs(1);
        assert_eq!(before.to_sqlite_value(), SqliteValue::Integer(-1_000_000));
        assert_eq!(
            SystemTime::from_sqlite_value(&SqliteValue::Integer(-1_000_000)).unwrap(),
            before
        );
    }

    #[test]
    fn uuid_reads_text_and_blob() {
        let id = Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
        let text = id.to_sqlite_value();
        assert_eq!(text.length().unwrap(), 36);
        assert_eq!(Uuid::from_sqlite_value(&text).unwrap(), id);
        assert_eq!(
            Uuid::from_sqlite_value(&SqliteValue::Blob(id.as_bytes().to_vec())).unwrap(),
            id
        );
        assert!(Uuid::from_sqlite_value(&SqliteValue::from("not-a-uuid")).is_err());
    }

    #[test]
    fn option_maps_null() {
        assert_eq!(Option::<i64>::from_sqlite_value(&SqliteValue::Null).unwrap(), None);
        assert_eq!(
            Option::<i64>::from_sqlite_value(&SqliteValue::Integer(3)).unwrap(),
            Some(3)
        );
        assert!(None::<String>.to_sqlite_value().is_null());
        assert_eq!(<Option<f32> as ColumnValue>::KIND, ValueKind::F32);
    }

    #[test]
    fn floats_follow_double_coercion() {
        assert_eq!(f64::from_sqlite_value(&SqliteValue::from("2.5kg")).unwrap(), 2.5);
        assert_eq!(f32::from_sqlite_value(&SqliteValue::Integer(4)).unwrap(), 4.0);
    }
}
