use serde::Serialize;

use crate::error::{Error, Result};
use crate::value::Value;

/// Equality restriction applied when reading a key population.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyFilter {
    pub column: String,
    pub equals: Value,
}

/// Where a key population is read from: a table and one or more key columns.
///
/// Multi-column sources yield tuples that are sampled together, e.g. the
/// `(course_id, professor_id)` pairs of an assignment table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeySource {
    pub table: String,
    pub columns: Vec<String>,
    pub filter: Option<KeyFilter>,
    pub distinct: bool,
    pub limit: Option<u64>,
}

impl KeySource {
    pub fn new<I, S>(table: &str, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(Error::NoColumns(table.to_string()));
        }
        Ok(Self {
            table: table.to_string(),
            columns,
            filter: None,
            distinct: false,
            limit: None,
        })
    }

    /// Single-column source, the common primary-key case.
    pub fn column(table: &str, column: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: vec![column.to_string()],
            filter: None,
            distinct: false,
            limit: None,
        }
    }

    pub fn filter_eq(mut self, column: &str, equals: impl Into<Value>) -> Self {
        self.filter = Some(KeyFilter {
            column: column.to_string(),
            equals: equals.into(),
        });
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// `table(col_a, col_b)` label for logs and errors.
    pub fn describe(&self) -> String {
        format!("{}({})", self.table, self.columns.join(", "))
    }
}
