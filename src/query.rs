/// Query Layer Module
///
/// This module defines the unit of execution (`Query`), the row shape
/// produced to callers (`Record`, `Page`) and the raw fetch/execute
/// operations every wrapper in this crate composes around.
///
/// Every statement is logged before it runs. The record shape is
/// schema-driven: whatever columns the statement selects are the fields the
/// record carries, in declared order.

use crate::core::{Result, RowflowError};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use tracing::debug;

/// An immutable pair of statement text and positional parameters.
///
/// A `Query` is both the unit of execution and, for cacheable reads, the
/// cache key. Parameters use SQLite `?` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    statement: String,
    params: Vec<Value>,
}

impl Query {
    /// Creates a query with no parameters.
    pub fn new(statement: impl Into<String>) -> Self {
        Query {
            statement: statement.into(),
            params: Vec::new(),
        }
    }

    /// Creates a query with positional parameters.
    pub fn with_params(statement: impl Into<String>, params: Vec<Value>) -> Self {
        Query {
            statement: statement.into(),
            params,
        }
    }

    /// The statement text.
    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// The positional parameters, in binding order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Returns true for statements that only read.
    ///
    /// Used by the cache to warn when a mutating statement is being
    /// memoized; callers remain responsible for only caching reads.
    pub fn is_read_only(&self) -> bool {
        let upper = self.statement.trim_start().to_uppercase();
        upper.starts_with("SELECT") || upper.starts_with("WITH")
    }

}

/// One row of query results: an ordered column-name-to-value mapping.
///
/// Produced fresh per row and immutable once yielded; it has no identity
/// beyond its data.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

/// A bounded, ordered group of records returned by one fetch step.
pub type Page = Vec<Record>;

impl Record {
    /// Builds a record from a rusqlite row given the statement's columns.
    pub fn from_row(columns: &[String], row: &Row) -> rusqlite::Result<Self> {
        let mut fields = Vec::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            fields.push((name.clone(), row.get::<_, Value>(i)?));
        }
        Ok(Record { fields })
    }

    /// Looks up a field by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column names in declared order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true for a record with no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Reads a field as a float, coercing integers.
    ///
    /// # Errors
    ///
    /// Returns `RowflowError::Decode` if the column is missing or not
    /// numeric.
    pub fn numeric(&self, column: &str) -> Result<f64> {
        match self.get(column) {
            Some(Value::Integer(i)) => Ok(*i as f64),
            Some(Value::Real(f)) => Ok(*f),
            Some(other) => Err(RowflowError::Decode(format!(
                "column '{}' is not numeric: {}",
                column,
                format_value(other)
            ))),
            None => Err(RowflowError::Decode(format!("no such column: '{}'", column))),
        }
    }

    /// Reads a field as text.
    ///
    /// # Errors
    ///
    /// Returns `RowflowError::Decode` if the column is missing or not text.
    pub fn text(&self, column: &str) -> Result<&str> {
        match self.get(column) {
            Some(Value::Text(s)) => Ok(s.as_str()),
            Some(other) => Err(RowflowError::Decode(format!(
                "column '{}' is not text: {}",
                column,
                format_value(other)
            ))),
            None => Err(RowflowError::Decode(format!("no such column: '{}'", column))),
        }
    }

    /// Converts the record to a JSON object for callers that serialize
    /// results.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), value_to_json(value)))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// Executes a read query and materializes every row.
///
/// This is the innermost operation the scope/transaction/retry/cache
/// wrappers compose around; streaming consumers use `RowStream` instead.
///
/// # Errors
///
/// Returns `RowflowError::Statement` if the statement cannot be prepared or
/// fails during execution.
pub fn fetch_all(conn: &Connection, query: &Query) -> Result<Vec<Record>> {
    debug!("Executing query: {}", query.statement());

    let mut stmt = conn
        .prepare(query.statement())
        .map_err(RowflowError::Statement)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let rows = stmt
        .query_map(params_from_iter(query.params().iter()), |row| {
            Record::from_row(&columns, row)
        })
        .map_err(RowflowError::Statement)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(RowflowError::Statement)?;

    Ok(rows)
}

/// Executes a mutating statement and returns the number of affected rows.
///
/// # Errors
///
/// Returns `RowflowError::Statement` if the statement fails.
pub fn execute(conn: &Connection, query: &Query) -> Result<usize> {
    debug!("Executing statement: {}", query.statement());

    conn.execute(query.statement(), params_from_iter(query.params().iter()))
        .map_err(RowflowError::Statement)
}

/// Formats a SQLite value for display.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(t) => t.clone(),
        Value::Blob(b) => format!("<BLOB: {} bytes>", b.len()),
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Real(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(t) => serde_json::Value::String(t.clone()),
        Value::Blob(b) => serde_json::Value::Array(
            b.iter().map(|byte| serde_json::Value::from(*byte)).collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup_test_table(conn: &Connection) {
        conn.execute_batch(
            "
            CREATE TABLE test (
                id INTEGER PRIMARY KEY,
                name TEXT,
                value REAL
            );
            INSERT INTO test (name, value) VALUES ('Alice', 123.45);
            INSERT INTO test (name, value) VALUES ('Bob', 678.90);
            INSERT INTO test (name, value) VALUES (NULL, NULL);
        ",
        )
        .unwrap();
    }

    #[test]
    fn test_fetch_all_yields_records_in_order() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_table(&conn);

        let rows = fetch_all(&conn, &Query::new("SELECT * FROM test ORDER BY id")).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0].columns().collect::<Vec<_>>(),
            vec!["id", "name", "value"]
        );
        assert_eq!(rows[0].text("name").unwrap(), "Alice");
        assert_eq!(rows[1].numeric("value").unwrap(), 678.90);
        assert_eq!(rows[2].get("name"), Some(&Value::Null));
    }

    #[test]
    fn test_fetch_all_binds_positional_params() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_table(&conn);

        let query = Query::with_params(
            "SELECT name FROM test WHERE value > ? ORDER BY id",
            vec![Value::Real(200.0)],
        );
        let rows = fetch_all(&conn, &query).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text("name").unwrap(), "Bob");
    }

    #[test]
    fn test_statement_error_classification() {
        let conn = Connection::open_in_memory().unwrap();

        let result = fetch_all(&conn, &Query::new("SELECT * FROM nonexistent_table"));

        match result.unwrap_err() {
            RowflowError::Statement(e) => assert!(e.to_string().contains("no such table")),
            other => panic!("Expected Statement error, got {:?}", other),
        }
    }

    #[test]
    fn test_execute_reports_affected_rows() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_table(&conn);

        let affected = execute(
            &conn,
            &Query::with_params(
                "UPDATE test SET value = ? WHERE name IS NOT NULL",
                vec![Value::Real(1.0)],
            ),
        )
        .unwrap();

        assert_eq!(affected, 2);
    }

    #[test]
    fn test_read_only_detection() {
        assert!(Query::new("SELECT * FROM test").is_read_only());
        assert!(Query::new("  with t as (select 1) select * from t").is_read_only());
        assert!(!Query::new("UPDATE test SET value = 1").is_read_only());
        assert!(!Query::new("DELETE FROM test").is_read_only());
    }

    #[test]
    fn test_record_decode_errors() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_table(&conn);

        let rows = fetch_all(&conn, &Query::new("SELECT * FROM test WHERE id = 1")).unwrap();
        let record = &rows[0];

        assert!(matches!(
            record.numeric("name"),
            Err(RowflowError::Decode(_))
        ));
        assert!(matches!(
            record.text("missing"),
            Err(RowflowError::Decode(_))
        ));
    }

    #[test]
    fn test_record_to_json() {
        let conn = Connection::open_in_memory().unwrap();
        setup_test_table(&conn);

        let rows = fetch_all(&conn, &Query::new("SELECT * FROM test WHERE id = 1")).unwrap();
        let json = rows[0].to_json();

        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "Alice");
        assert_eq!(json["value"], 123.45);
    }
}
