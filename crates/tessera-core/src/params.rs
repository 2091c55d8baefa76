//! Parameter helpers.

/// Build a positional parameter slice of [`SqliteValue`](crate::SqliteValue)s
/// from heterogeneous values.
///
/// ```ignore
/// use tessera_core::params;
///
/// conn.execute_with_params("INSERT INTO t VALUES (?1, ?2)", params![42_i64, "hello"])?;
/// ```
#[macro_export]
macro_rules! params {
    () => {
        &[] as &[$crate::SqliteValue]
    };
    ($($val:expr),+ $(,)?) => {
        &[$($crate::SqliteValue::from($val)),+] as &[$crate::SqliteValue]
    };
}
