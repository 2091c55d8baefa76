//! The in-process coercion accessors must agree with the engine's own CAST
//! results for the same bound value.

#![allow(clippy::float_cmp)]

use tessera_core::{Connection, ConnectionConfig, SqliteValue, TesseraError};

const TEXT_SAMPLES: &[&str] = &[
    "",
    "  1234.56",
    " 1234.abasd",
    "abacdd\u{10FFFF}",
    "2147483647",
    "-2147483648",
    "9223372036854775807",
    "-9223372036854775808",
    "9923372036854775809",
    "-9923372036854775809",
    "3147483648",
    "-1234",
];

const FLOAT_SAMPLES: &[f64] = &[
    1.0,
    1.11,
    1.7e3,
    -195_489_100.837_7,
    1.123_456_789_012_345_7e100,
    -1.123_456_789_012_345_7e100,
];

const INTEGER_SAMPLES: &[i64] = &[
    i32::MAX as i64,
    i32::MIN as i64,
    i64::MAX,
    i64::MIN,
    -1234,
    0,
];

fn cast_row(conn: &Connection, value: &SqliteValue) -> (i64, f64, String) {
    let mut stmt = conn
        .prepare("SELECT CAST(?1 AS INTEGER), CAST(?1 AS REAL), typeof(?1)")
        .unwrap();
    stmt.bind(1, value).unwrap();
    let row = stmt.query_row().unwrap();
    (
        row.get_typed(0).unwrap(),
        row.get_typed(1).unwrap(),
        row.get_typed(2).unwrap(),
    )
}

fn assert_close(actual: f64, expected: f64, context: &str) {
    let scale = expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= scale * 1e-12,
        "{context}: {actual} vs {expected}"
    );
}

// ============================================================================
// Text and blob coercion
// ============================================================================

#[test]
fn text_casts_match_engine() {
    let conn = Connection::open_in_memory().unwrap();
    for &sample in TEXT_SAMPLES {
        let value = SqliteValue::from(sample);
        let (int, real, kind) = cast_row(&conn, &value);
        assert_eq!(value.to_int64(), int, "integer cast of {sample:?}");
        assert_close(value.to_double(), real, sample);
        assert_eq!(kind, value.typeof_str());
    }
}

#[test]
fn blob_casts_match_engine() {
    let conn = Connection::open_in_memory().unwrap();
    for &sample in TEXT_SAMPLES {
        let value = SqliteValue::from(sample.as_bytes());
        let (int, real, kind) = cast_row(&conn, &value);
        assert_eq!(value.to_int64(), int, "integer cast of blob {sample:?}");
        assert_close(value.to_double(), real, sample);
        assert_eq!(kind, "blob");
    }
}

#[test]
fn text_reads_back_unchanged() {
    let conn = Connection::open_in_memory().unwrap();
    for &sample in TEXT_SAMPLES {
        let mut stmt = conn.prepare("SELECT ?1").unwrap();
        stmt.bind(1, &SqliteValue::from(sample)).unwrap();
        let row = stmt.query_row().unwrap();
        assert_eq!(row.get(0), Some(&SqliteValue::from(sample)));
    }
}

// ============================================================================
// Numeric coercion
// ============================================================================

#[test]
fn float_casts_match_engine() {
    let conn = Connection::open_in_memory().unwrap();
    for &sample in FLOAT_SAMPLES {
        let value = SqliteValue::Float(sample);
        let (int, real, kind) = cast_row(&conn, &value);
        assert_eq!(value.to_int64(), int, "integer cast of {sample}");
        assert_eq!(value.to_double(), real);
        assert_eq!(kind, "real");
        assert!(value.to_text().is_err());
    }
}

#[test]
fn integer_casts_match_engine() {
    let conn = Connection::open_in_memory().unwrap();
    for &sample in INTEGER_SAMPLES {
        let value = SqliteValue::Integer(sample);
        let mut stmt = conn
            .prepare("SELECT CAST(?1 AS TEXT), length(?1), CAST(?1 AS BLOB)")
            .unwrap();
        stmt.bind(1, &value).unwrap();
        let row = stmt.query_row().unwrap();

        let text: String = row.get_typed(0).unwrap();
        let length: i64 = row.get_typed(1).unwrap();
        let blob: Vec<u8> = row.get_typed(2).unwrap();
        assert_eq!(value.to_text().unwrap(), text);
        assert_eq!(i64::try_from(value.length().unwrap()).unwrap(), length);
        assert_eq!(&*value.to_blob().unwrap(), blob.as_slice());
        assert_eq!(value.to_int32(), row.get(0).map(SqliteValue::to_int32).unwrap());
    }
}

// ============================================================================
// Zero blobs
// ============================================================================

#[test]
fn zero_blob_binds_as_engine_zeroblob() {
    let conn = Connection::open_in_memory().unwrap();
    for n in [0_usize, 1, 2, 10] {
        let mut stmt = conn.prepare("SELECT ?1, length(?1), typeof(?1)").unwrap();
        stmt.bind(1, &SqliteValue::zero_blob(n)).unwrap();
        let row = stmt.query_row().unwrap();

        let length: i64 = row.get_typed(1).unwrap();
        assert_eq!(usize::try_from(length).unwrap(), n);
        assert_eq!(row.get_typed::<String>(2).unwrap(), "blob");
        assert_eq!(row.get(0), Some(&SqliteValue::zero_blob(n)));
    }
}

// ============================================================================
// Statement binding
// ============================================================================

#[test]
fn named_parameters() {
    let conn = Connection::open_in_memory().unwrap();
    let mut stmt = conn.prepare("SELECT :a + :b").unwrap();
    stmt.bind_named(":a", &SqliteValue::Integer(2)).unwrap();
    stmt.bind_named(":b", &SqliteValue::Integer(3)).unwrap();
    assert!(!stmt.try_bind_named(":c", &SqliteValue::Null).unwrap());
    assert!(matches!(
        stmt.bind_named(":c", &SqliteValue::Null),
        Err(TesseraError::NoSuchParameter { .. })
    ));
    assert_eq!(stmt.query_row().unwrap().get_typed::<i64>(0).unwrap(), 5);

    // Bindings survive re-execution until replaced.
    stmt.bind_named(":b", &SqliteValue::Integer(10)).unwrap();
    assert_eq!(stmt.query_row().unwrap().get_typed::<i64>(0).unwrap(), 12);
}

#[test]
fn result_columns_report_their_origin() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute("CREATE TABLE t (a integer, b varchar)").unwrap();
    let stmt = conn.prepare("SELECT a AS alias, b, a + 1 FROM t").unwrap();
    let columns = stmt.columns();
    assert_eq!(columns.len(), 3);

    let aliased = &columns[0];
    assert_eq!(aliased.name, "alias");
    assert_eq!(aliased.database_name.as_deref(), Some("main"));
    assert_eq!(aliased.table_name.as_deref(), Some("t"));
    assert_eq!(aliased.origin_name.as_deref(), Some("a"));
    assert_eq!(aliased.declared_type.as_deref(), Some("integer"));

    assert_eq!(columns[1].origin_name.as_deref(), Some("b"));
    assert_eq!(columns[1].declared_type.as_deref(), Some("varchar"));

    let computed = &columns[2];
    assert_eq!(computed.database_name, None);
    assert_eq!(computed.table_name, None);
    assert_eq!(computed.origin_name, None);
    assert_eq!(computed.declared_type, None);
}

#[test]
fn reopen_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("oracle.db");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute("CREATE TABLE kv (k varchar, v blob)").unwrap();
        conn.execute_with_params(
            "INSERT INTO kv VALUES (?1, ?2)",
            &[SqliteValue::from("a"), SqliteValue::Blob(vec![1, 2, 3])],
        )
        .unwrap();
    }

    let conn = Connection::open_with_config(&path, &ConnectionConfig::read_only()).unwrap();
    let row = conn.query_row("SELECT v FROM kv WHERE k = 'a'").unwrap();
    assert_eq!(row.get(0), Some(&SqliteValue::Blob(vec![1, 2, 3])));
    assert!(conn.execute("DELETE FROM kv").is_err());
}
