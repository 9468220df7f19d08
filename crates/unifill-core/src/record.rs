use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::sql::{quote_ident, quote_qualified};
use crate::value::Value;

/// One row's worth of values, ordered like the columns of its write operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record(Vec<Value>);

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Value>> for Record {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (index, value) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str(")")
    }
}

/// Build a [`Record`] from expressions convertible into [`Value`].
///
/// ```
/// let record = unifill_core::record![1_i64, "intro", None::<i64>];
/// assert_eq!(record.len(), 3);
/// ```
#[macro_export]
macro_rules! record {
    ($($value:expr),* $(,)?) => {
        $crate::Record::new(vec![$($crate::Value::from($value)),*])
    };
}

/// Target table and ordered column list of an insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOperation {
    table: String,
    columns: Vec<String>,
    #[serde(skip)]
    insert_prefix: String,
}

impl WriteOperation {
    pub fn new<I, S>(table: &str, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(Error::NoColumns(table.to_string()));
        }

        let quoted = columns
            .iter()
            .map(|column| quote_ident(column))
            .collect::<Result<Vec<_>>>()?;
        let insert_prefix = format!(
            "INSERT INTO {} ({}) ",
            quote_qualified(table)?,
            quoted.join(", ")
        );

        Ok(Self {
            table: table.to_string(),
            columns,
            insert_prefix,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    /// `INSERT INTO "table" ("a", "b") ` with a trailing space, ready for `VALUES`.
    pub fn insert_prefix(&self) -> &str {
        &self.insert_prefix
    }

    pub fn position(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|candidate| candidate == column)
            .ok_or_else(|| Error::UnknownColumn {
                table: self.table.clone(),
                column: column.to_string(),
            })
    }

    /// Verify a record carries exactly one value per column.
    pub fn check(&self, record: &Record) -> Result<()> {
        if record.len() != self.arity() {
            return Err(Error::ArityMismatch {
                table: self.table.clone(),
                expected: self.arity(),
                actual: record.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    #[test]
    fn builds_quoted_statements() {
        let op = WriteOperation::new("resource_keywords", ["resource_id", "keyword"]).unwrap();
        assert_eq!(
            op.insert_prefix(),
            "INSERT INTO \"resource_keywords\" (\"resource_id\", \"keyword\") "
        );
        assert_eq!(op.position("keyword").unwrap(), 1);
        assert!(op.position("missing").is_err());
    }

    #[test]
    fn rejects_empty_column_lists() {
        let err = WriteOperation::new("grades", Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, Error::NoColumns(_)));
    }

    #[test]
    fn checks_record_arity() {
        let op = WriteOperation::new("grades", ["student_id", "course_id"]).unwrap();
        assert!(op.check(&record![1_i64, 2_i64]).is_ok());
        let err = op.check(&record![1_i64]).unwrap_err();
        assert!(matches!(
            err,
            Error::ArityMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn renders_records_for_logs() {
        let record = record![3_i64, "databases", None::<String>];
        assert_eq!(record.to_string(), "(3, 'databases', NULL)");
    }
}
