use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgConnection, Postgres, QueryBuilder, Row, TypeInfo};

use unifill_core::{KeySource, Record, Value, WriteOperation, quote_ident, quote_qualified};

use crate::session::SessionError;

/// Postgres accepts at most this many bind parameters per statement.
const MAX_BIND_PARAMS: usize = 65_535;

/// Rows that fit into one multi-row `INSERT` for this operation.
pub fn rows_per_statement(op: &WriteOperation) -> usize {
    (MAX_BIND_PARAMS / op.arity().max(1)).max(1)
}

pub async fn insert_rows(
    conn: &mut PgConnection,
    op: &WriteOperation,
    records: &[Record],
) -> Result<u64, SessionError> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(op.insert_prefix());
    builder.push_values(records, |mut row, record| {
        for value in record.values() {
            match value {
                // Untyped so the column type decides, whatever it is.
                Value::Null => {
                    row.push("NULL");
                }
                Value::Bool(value) => {
                    row.push_bind(*value);
                }
                Value::Int(value) => {
                    row.push_bind(*value);
                }
                Value::Float(value) => {
                    row.push_bind(*value);
                }
                Value::Text(value) => {
                    row.push_bind(value.clone());
                }
                Value::Date(value) => {
                    row.push_bind(*value);
                }
                Value::Time(value) => {
                    row.push_bind(*value);
                }
                Value::Timestamp(value) => {
                    row.push_bind(*value);
                }
            }
        }
    });

    let result = builder.build().execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

pub async fn fetch_keys(
    conn: &mut PgConnection,
    source: &KeySource,
) -> Result<Vec<Vec<Value>>, SessionError> {
    let sql = select_keys_sql(source)?;
    let mut query: Query<'_, Postgres, PgArguments> = sqlx::query(&sql);
    if let Some(filter) = &source.filter {
        query = bind_value(query, &filter.equals);
    }

    let rows = query.fetch_all(&mut *conn).await?;
    rows.iter().map(decode_row).collect()
}

fn select_keys_sql(source: &KeySource) -> Result<String, SessionError> {
    let columns = source
        .columns
        .iter()
        .map(|column| quote_ident(column))
        .collect::<unifill_core::Result<Vec<_>>>()
        .map_err(|err| SessionError::statement(err.to_string()))?;
    let table =
        quote_qualified(&source.table).map_err(|err| SessionError::statement(err.to_string()))?;

    let mut sql = format!(
        "SELECT {}{} FROM {}",
        if source.distinct { "DISTINCT " } else { "" },
        columns.join(", "),
        table
    );
    if let Some(filter) = &source.filter {
        let column =
            quote_ident(&filter.column).map_err(|err| SessionError::statement(err.to_string()))?;
        sql.push_str(&format!(" WHERE {column} = $1"));
    }
    // Populations are sampled by index, so the order must not depend on the scan.
    sql.push_str(&format!(" ORDER BY {}", columns.join(", ")));
    if let Some(limit) = source.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    Ok(sql)
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(value) => query.bind(*value),
        Value::Int(value) => query.bind(*value),
        Value::Float(value) => query.bind(*value),
        Value::Text(value) => query.bind(value.clone()),
        Value::Date(value) => query.bind(*value),
        Value::Time(value) => query.bind(*value),
        Value::Timestamp(value) => query.bind(*value),
    }
}

fn decode_row(row: &PgRow) -> Result<Vec<Value>, SessionError> {
    (0..row.len()).map(|index| decode_column(row, index)).collect()
}

fn decode_column(row: &PgRow, index: usize) -> Result<Value, SessionError> {
    let column = &row.columns()[index];
    let value = match column.type_info().name() {
        "INT2" => Value::from(row.try_get::<Option<i16>, _>(index)?.map(i64::from)),
        "INT4" => Value::from(row.try_get::<Option<i32>, _>(index)?.map(i64::from)),
        "INT8" => Value::from(row.try_get::<Option<i64>, _>(index)?),
        "BOOL" => Value::from(row.try_get::<Option<bool>, _>(index)?),
        "FLOAT4" => Value::from(row.try_get::<Option<f32>, _>(index)?.map(f64::from)),
        "FLOAT8" => Value::from(row.try_get::<Option<f64>, _>(index)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            Value::from(row.try_get::<Option<String>, _>(index)?)
        }
        "DATE" => Value::from(row.try_get::<Option<NaiveDate>, _>(index)?),
        "TIME" => Value::from(row.try_get::<Option<NaiveTime>, _>(index)?),
        "TIMESTAMP" => Value::from(row.try_get::<Option<NaiveDateTime>, _>(index)?),
        other => {
            return Err(SessionError::statement(format!(
                "unsupported key column type {other} for '{}'",
                column.name()
            )));
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_respect_the_bind_limit() {
        let op = WriteOperation::new(
            "grades",
            [
                "student_id",
                "course_id",
                "professor_id",
                "semester_id",
                "grade_value",
                "grade_date",
                "exam_type",
            ],
        )
        .unwrap();
        let rows = rows_per_statement(&op);
        assert_eq!(rows, 9_362);
        assert!(rows * op.arity() <= MAX_BIND_PARAMS);
    }

    #[test]
    fn builds_key_queries() {
        let source = KeySource::column("courses", "course_id")
            .filter_eq("course_level", "Master")
            .limit(500);
        assert_eq!(
            select_keys_sql(&source).unwrap(),
            "SELECT \"course_id\" FROM \"courses\" WHERE \"course_level\" = $1 \
             ORDER BY \"course_id\" LIMIT 500"
        );

        let pairs = KeySource::new("professor_course_assignments", ["course_id", "professor_id"])
            .unwrap()
            .distinct();
        assert_eq!(
            select_keys_sql(&pairs).unwrap(),
            "SELECT DISTINCT \"course_id\", \"professor_id\" FROM \"professor_course_assignments\" \
             ORDER BY \"course_id\", \"professor_id\""
        );
    }
}
