/// Streaming Aggregation Module
///
/// Aggregates over a record stream without materializing it: one running
/// accumulator, O(1) memory however many rows pass through.

use crate::core::Result;
use crate::query::Record;

/// Computes the mean of a numeric column over a record stream.
///
/// Returns `None` for an empty stream rather than dividing by zero.
///
/// # Errors
///
/// Propagates the first stream error, or `RowflowError::Decode` if a
/// record lacks a numeric `column`.
pub fn column_mean(
    rows: impl Iterator<Item = Result<Record>>,
    column: &str,
) -> Result<Option<f64>> {
    let mut total = 0.0;
    let mut count = 0u64;

    for record in rows {
        total += record?.numeric(column)?;
        count += 1;
    }

    if count == 0 {
        Ok(None)
    } else {
        Ok(Some(total / count as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectInfo;
    use crate::connection::ConnectionScope;
    use crate::core::RowflowError;
    use crate::query::{execute, Query};
    use crate::stream::RowStream;
    use tempfile::NamedTempFile;

    fn db_with_ages(ages: &[i64]) -> (NamedTempFile, ConnectInfo) {
        let file = NamedTempFile::new().unwrap();
        let info = ConnectInfo::with_database(file.path().to_str().unwrap());
        ConnectionScope::new(info.clone())
            .run(|conn| {
                execute(conn, &Query::new("CREATE TABLE user_data (age INTEGER)"))?;
                for age in ages {
                    execute(
                        conn,
                        &Query::with_params(
                            "INSERT INTO user_data (age) VALUES (?)",
                            vec![rusqlite::types::Value::Integer(*age)],
                        ),
                    )?;
                }
                Ok(())
            })
            .unwrap();
        (file, info)
    }

    #[test]
    fn test_mean_over_a_stream() {
        let (_file, info) = db_with_ages(&[35, 28, 45, 22]);

        let stream = RowStream::open(&info, Query::new("SELECT age FROM user_data")).unwrap();
        let mean = column_mean(stream, "age").unwrap();

        assert_eq!(mean, Some(32.5));
    }

    #[test]
    fn test_empty_stream_has_no_mean() {
        let (_file, info) = db_with_ages(&[]);

        let stream = RowStream::open(&info, Query::new("SELECT age FROM user_data")).unwrap();
        assert_eq!(column_mean(stream, "age").unwrap(), None);
    }

    #[test]
    fn test_missing_column_is_a_decode_error() {
        let (_file, info) = db_with_ages(&[30]);

        let stream = RowStream::open(&info, Query::new("SELECT age FROM user_data")).unwrap();
        let result = column_mean(stream, "height");
        assert!(matches!(result, Err(RowflowError::Decode(_))));
    }
}
