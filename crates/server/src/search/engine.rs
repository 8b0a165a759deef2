//! Embedded DuckDB executor
//!
//! One in-memory connection serves every request. DuckDB calls block (and
//! may fetch remote CSVs), so they run on the blocking pool.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, NaiveTime};
use docpilot_core::{ClinicalError, Record};
use duckdb::Connection;
use duckdb::types::{TimeUnit, Value};
use serde_json::{Number, Value as JsonValue};

/// Shared handle to the analytical engine
#[derive(Clone)]
pub struct QueryEngine {
    conn: Arc<Mutex<Connection>>,
}

impl QueryEngine {
    /// Open a fresh in-memory database
    pub fn in_memory() -> Result<Self, ClinicalError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ClinicalError::Query(format!("Failed to open DuckDB: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `sql` and return every row as a JSON object keyed by column name.
    pub async fn execute(&self, sql: String) -> Result<Vec<Record>, ClinicalError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| ClinicalError::Query("DuckDB connection poisoned".to_string()))?;
            run_query(&conn, &sql)
        })
        .await
        .map_err(|e| ClinicalError::Query(format!("Query task failed: {e}")))?
    }
}

fn execution_error(err: duckdb::Error) -> ClinicalError {
    ClinicalError::Query(format!("Query execution failed: {err}"))
}

fn run_query(conn: &Connection, sql: &str) -> Result<Vec<Record>, ClinicalError> {
    let mut stmt = conn.prepare(sql).map_err(execution_error)?;
    let mut rows = stmt.query([]).map_err(execution_error)?;
    let columns = rows
        .as_ref()
        .map(|stmt| stmt.column_names())
        .unwrap_or_default();

    let mut records = Vec::new();
    while let Some(row) = rows.next().map_err(execution_error)? {
        let mut record = Record::new();
        for (idx, name) in columns.iter().enumerate() {
            let value: Value = row.get(idx).map_err(execution_error)?;
            record.insert(name.clone(), to_json(value));
        }
        records.push(record);
    }

    tracing::debug!(rows = records.len(), columns = columns.len(), "Query executed");
    Ok(records)
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

fn float(value: f64) -> JsonValue {
    Number::from_f64(value).map_or(JsonValue::Null, JsonValue::Number)
}

/// Convert a DuckDB cell into JSON: temporal values become ISO-8601 text,
/// decimals become floats, lists become arrays, other nested values
/// become their debug text.
fn to_json(value: Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(b),
        Value::TinyInt(n) => n.into(),
        Value::SmallInt(n) => n.into(),
        Value::Int(n) => n.into(),
        Value::BigInt(n) => n.into(),
        Value::HugeInt(n) => match i64::try_from(n) {
            Ok(n) => n.into(),
            Err(_) => JsonValue::String(n.to_string()),
        },
        Value::UTinyInt(n) => n.into(),
        Value::USmallInt(n) => n.into(),
        Value::UInt(n) => n.into(),
        Value::UBigInt(n) => n.into(),
        Value::Float(f) => float(f64::from(f)),
        Value::Double(f) => float(f),
        Value::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .map_or_else(|_| JsonValue::String(d.to_string()), float),
        Value::Text(s) | Value::Enum(s) => JsonValue::String(s),
        Value::Blob(bytes) => JsonValue::String(String::from_utf8_lossy(&bytes).into_owned()),
        Value::Date32(days) => NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(i64::from(days))))
            .map_or(JsonValue::Null, |d| JsonValue::String(d.format("%Y-%m-%d").to_string())),
        Value::Timestamp(unit, value) => DateTime::from_timestamp_micros(to_micros(unit, value))
            .map_or(JsonValue::Null, |ts| {
                JsonValue::String(ts.naive_utc().format("%Y-%m-%dT%H:%M:%S%.3f").to_string())
            }),
        Value::Time64(unit, value) => {
            let micros = to_micros(unit, value);
            let secs = u32::try_from(micros.div_euclid(1_000_000)).unwrap_or(0);
            let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).unwrap_or(0);
            NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
                .map_or(JsonValue::Null, |t| JsonValue::String(t.format("%H:%M:%S").to_string()))
        }
        Value::List(items) => JsonValue::Array(items.into_iter().map(to_json).collect()),
        other => JsonValue::String(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[tokio::test]
    async fn scalar_types_become_json() {
        let engine = QueryEngine::in_memory().unwrap();
        let rows = engine
            .execute(
                "SELECT 1 AS n, 'x' AS s, DATE '2024-01-15' AS d, 45.86 AS cost, \
                 TIMESTAMP '2023-05-01 10:30:00' AS ts, NULL AS z, [1, 2] AS l"
                    .to_string(),
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row["n"], json!(1));
        assert_eq!(row["s"], json!("x"));
        assert_eq!(row["d"], json!("2024-01-15"));
        assert_eq!(row["cost"], json!(45.86));
        assert_eq!(row["ts"], json!("2023-05-01T10:30:00.000"));
        assert_eq!(row["z"], JsonValue::Null);
        assert_eq!(row["l"], json!([1, 2]));
    }

    #[tokio::test]
    async fn columns_keep_select_order() {
        let engine = QueryEngine::in_memory().unwrap();
        let rows = engine
            .execute("SELECT 'x' AS zeta, 2 AS alpha, 3 AS middle".to_string())
            .await
            .unwrap();

        let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "middle"]);
    }

    #[tokio::test]
    async fn reads_csv_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "PATIENTID,medications_DESCRIPTION").unwrap();
        writeln!(file, "p1,Metformin 500 MG").unwrap();
        writeln!(file, "p1,Albuterol inhaler").unwrap();
        file.flush().unwrap();

        let engine = QueryEngine::in_memory().unwrap();
        let sql = format!(
            "SELECT medications_DESCRIPTION FROM '{}' ORDER BY 1",
            file.path().display()
        );
        let rows = engine.execute(sql).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["medications_DESCRIPTION"], "Albuterol inhaler");
    }

    #[tokio::test]
    async fn bad_sql_is_a_query_error() {
        let engine = QueryEngine::in_memory().unwrap();
        let err = engine.execute("SELEKT nothing".to_string()).await.unwrap_err();
        assert!(matches!(err, ClinicalError::Query(_)));
        assert!(err.to_string().starts_with("Query execution failed"));
    }
}
