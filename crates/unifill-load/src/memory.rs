//! In-memory [`Session`] used for dry runs and tests.
//!
//! Mirrors the transactional behavior the loader relies on: writes stay
//! pending until `commit`, `rollback` discards them, and a failing bulk insert
//! leaves nothing behind. Unique, foreign-key and custom row rules can be
//! declared to make specific records fail, and whole statements can be made to
//! fail without touching the connection.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;

use unifill_core::{KeySource, Record, Value, WriteOperation};

use crate::session::{Session, SessionError};

type Row = HashMap<String, Value>;
type RowRule = Box<dyn Fn(&Record) -> bool + Send + Sync>;
type StatementRule = Box<dyn Fn(&[Record]) -> bool + Send + Sync>;

/// Call counters, inspected by tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub bulk_calls: u64,
    /// Size of every bulk call, in order.
    pub bulk_sizes: Vec<usize>,
    pub single_calls: u64,
    pub commits: u64,
    pub rollbacks: u64,
}

struct UniqueRule {
    table: String,
    columns: Vec<String>,
}

struct ForeignRule {
    table: String,
    column: String,
    parent_table: String,
    parent_column: String,
}

struct RejectRule {
    table: String,
    name: String,
    rejects: RowRule,
}

struct FailingStatement {
    table: String,
    fails: StatementRule,
}

#[derive(Default)]
pub struct MemorySession {
    committed: BTreeMap<String, Vec<Row>>,
    pending: Vec<(String, Row)>,
    serials: HashMap<String, (String, i64)>,
    uniques: Vec<UniqueRule>,
    foreign: Vec<ForeignRule>,
    rejects: Vec<RejectRule>,
    failing: Vec<FailingStatement>,
    remaining_writes: Option<u64>,
    stats: MemoryStats,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `column` from an increasing sequence when an insert leaves it out.
    pub fn with_serial(mut self, table: &str, column: &str) -> Self {
        self.serials
            .insert(table.to_string(), (column.to_string(), 1));
        self
    }

    pub fn with_unique<I, S>(mut self, table: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uniques.push(UniqueRule {
            table: table.to_string(),
            columns: columns.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn with_foreign_key(
        mut self,
        table: &str,
        column: &str,
        parent_table: &str,
        parent_column: &str,
    ) -> Self {
        self.foreign.push(ForeignRule {
            table: table.to_string(),
            column: column.to_string(),
            parent_table: parent_table.to_string(),
            parent_column: parent_column.to_string(),
        });
        self
    }

    /// Reject every record of `table` matching `rejects`, like a CHECK constraint.
    pub fn with_check<F>(mut self, table: &str, name: &str, rejects: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.rejects.push(RejectRule {
            table: table.to_string(),
            name: name.to_string(),
            rejects: Box::new(rejects),
        });
        self
    }

    /// Fail every insert statement on `table` whose records match `fails`
    /// with a statement-level error. The connection stays usable.
    pub fn with_failing_statement<F>(mut self, table: &str, fails: F) -> Self
    where
        F: Fn(&[Record]) -> bool + Send + Sync + 'static,
    {
        self.failing.push(FailingStatement {
            table: table.to_string(),
            fails: Box::new(fails),
        });
        self
    }

    /// Simulate a lost connection after `writes` successful insert statements.
    pub fn fail_after_writes(mut self, writes: u64) -> Self {
        self.remaining_writes = Some(writes);
        self
    }

    /// Seed committed rows directly, bypassing every rule.
    pub fn seed<I>(&mut self, table: &str, rows: I)
    where
        I: IntoIterator<Item = Vec<(&'static str, Value)>>,
    {
        let entry = self.committed.entry(table.to_string()).or_default();
        for row in rows {
            entry.push(
                row.into_iter()
                    .map(|(column, value)| (column.to_string(), value))
                    .collect(),
            );
        }
    }

    pub fn stats(&self) -> &MemoryStats {
        &self.stats
    }

    /// Committed rows of a table, projected onto `columns`.
    pub fn rows(&self, table: &str, columns: &[&str]) -> Vec<Vec<Value>> {
        self.committed
            .get(table)
            .map(|rows| rows.iter().map(|row| project(row, columns)).collect())
            .unwrap_or_default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.committed.get(table).map(Vec::len).unwrap_or(0)
    }

    fn visible_rows<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a Row> + 'a {
        let committed = self.committed.get(table).into_iter().flatten();
        let pending = self
            .pending
            .iter()
            .filter(move |(name, _)| name == table)
            .map(|(_, row)| row);
        committed.chain(pending)
    }

    fn consume_write(&mut self) -> Result<(), SessionError> {
        match self.remaining_writes.as_mut() {
            Some(0) => Err(SessionError::connection("connection reset by peer")),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn check_statement(&self, op: &WriteOperation, records: &[Record]) -> Result<(), SessionError> {
        let table = op.table();
        if self
            .failing
            .iter()
            .any(|rule| rule.table == table && (rule.fails)(records))
        {
            return Err(SessionError::statement(format!(
                "statement on \"{table}\" too complex"
            ))
            .with_code("54001"));
        }
        Ok(())
    }

    /// Validate a statement's records and turn them into rows, without side effects.
    ///
    /// Returns the rows plus the serial value to continue from.
    fn prepare(
        &self,
        op: &WriteOperation,
        records: &[Record],
    ) -> Result<(Vec<Row>, Option<i64>), SessionError> {
        let table = op.table();
        let serial = self.serials.get(table);
        let mut next_serial = serial.map(|(_, next)| *next);
        let mut seen: Vec<HashSet<Vec<String>>> = self
            .uniques
            .iter()
            .map(|rule| {
                if rule.table != table {
                    return HashSet::new();
                }
                self.visible_rows(table)
                    .filter_map(|row| composite_key(row, &rule.columns))
                    .collect()
            })
            .collect();
        let parents: Vec<HashSet<String>> = self
            .foreign
            .iter()
            .map(|rule| {
                if rule.table != table {
                    return HashSet::new();
                }
                self.visible_rows(&rule.parent_table)
                    .filter_map(|row| row.get(&rule.parent_column).map(Value::key_part))
                    .collect()
            })
            .collect();

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            op.check(record)
                .map_err(|err| SessionError::statement(err.to_string()))?;

            if let Some(rule) = self
                .rejects
                .iter()
                .find(|rule| rule.table == table && (rule.rejects)(record))
            {
                return Err(SessionError::row(format!(
                    "new row for relation \"{table}\" violates check constraint \"{}\"",
                    rule.name
                ))
                .with_code("23514"));
            }

            let mut row: Row = op
                .columns()
                .iter()
                .cloned()
                .zip(record.values().iter().cloned())
                .collect();
            if let (Some((column, _)), Some(next)) = (serial, next_serial.as_mut())
                && !row.contains_key(column)
            {
                row.insert(column.clone(), Value::Int(*next));
                *next += 1;
            }

            for (rule, parent_keys) in self.foreign.iter().zip(&parents) {
                if rule.table != table {
                    continue;
                }
                let value = row.get(&rule.column).cloned().unwrap_or(Value::Null);
                if !value.is_null() && !parent_keys.contains(&value.key_part()) {
                    return Err(SessionError::row(format!(
                        "insert on \"{table}\" violates foreign key: {}={} not present in \"{}\"",
                        rule.column, value, rule.parent_table
                    ))
                    .with_code("23503"));
                }
            }

            for (rule, seen) in self.uniques.iter().zip(seen.iter_mut()) {
                if rule.table != table {
                    continue;
                }
                if let Some(key) = composite_key(&row, &rule.columns)
                    && !seen.insert(key)
                {
                    return Err(SessionError::row(format!(
                        "duplicate key value violates unique constraint on \"{table}\" ({})",
                        rule.columns.join(", ")
                    ))
                    .with_code("23505"));
                }
            }

            rows.push(row);
        }
        Ok((rows, next_serial))
    }

    fn stage(&mut self, op: &WriteOperation, rows: Vec<Row>, next_serial: Option<i64>) {
        if let (Some((_, next)), Some(value)) = (self.serials.get_mut(op.table()), next_serial) {
            *next = value;
        }
        self.pending
            .extend(rows.into_iter().map(|row| (op.table().to_string(), row)));
    }
}

#[async_trait]
impl Session for MemorySession {
    fn engine(&self) -> &'static str {
        "memory"
    }

    async fn insert_many(
        &mut self,
        op: &WriteOperation,
        records: &[Record],
    ) -> Result<u64, SessionError> {
        self.stats.bulk_calls += 1;
        self.stats.bulk_sizes.push(records.len());
        self.consume_write()?;
        self.check_statement(op, records)?;
        let (rows, next_serial) = self.prepare(op, records)?;
        self.stage(op, rows, next_serial);
        Ok(records.len() as u64)
    }

    async fn insert_one(
        &mut self,
        op: &WriteOperation,
        record: &Record,
    ) -> Result<(), SessionError> {
        self.stats.single_calls += 1;
        self.consume_write()?;
        self.check_statement(op, std::slice::from_ref(record))?;
        let (rows, next_serial) = self.prepare(op, std::slice::from_ref(record))?;
        self.stage(op, rows, next_serial);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SessionError> {
        self.stats.commits += 1;
        for (table, row) in self.pending.drain(..) {
            self.committed.entry(table).or_default().push(row);
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), SessionError> {
        self.stats.rollbacks += 1;
        self.pending.clear();
        Ok(())
    }

    async fn fetch_keys(&mut self, source: &KeySource) -> Result<Vec<Vec<Value>>, SessionError> {
        let columns: Vec<&str> = source.columns.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        let mut keys = Vec::new();

        for row in self.visible_rows(&source.table) {
            if let Some(filter) = &source.filter
                && row.get(&filter.column) != Some(&filter.equals)
            {
                continue;
            }
            let key = project(row, &columns);
            if source.distinct && !seen.insert(key.iter().map(Value::key_part).collect::<Vec<_>>())
            {
                continue;
            }
            keys.push(key);
        }
        keys.sort_by(|left, right| compare_keys(left, right));
        if let Some(limit) = source.limit {
            keys.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(keys)
    }
}

fn project(row: &Row, columns: &[&str]) -> Vec<Value> {
    columns
        .iter()
        .map(|column| row.get(*column).cloned().unwrap_or(Value::Null))
        .collect()
}

/// Column-by-column order of `ORDER BY` with ascending NULLS LAST.
fn compare_keys(left: &[Value], right: &[Value]) -> Ordering {
    left.iter()
        .zip(right)
        .map(|(left, right)| compare_values(left, right))
        .find(|order| order.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Int(left), Value::Int(right)) => left.cmp(right),
        (Value::Float(left), Value::Float(right)) => left.total_cmp(right),
        (Value::Text(left), Value::Text(right)) => left.cmp(right),
        (Value::Bool(left), Value::Bool(right)) => left.cmp(right),
        (Value::Date(left), Value::Date(right)) => left.cmp(right),
        (Value::Time(left), Value::Time(right)) => left.cmp(right),
        (Value::Timestamp(left), Value::Timestamp(right)) => left.cmp(right),
        (left, right) => left.key_part().cmp(&right.key_part()),
    }
}

/// `None` when any part is NULL: NULLs never collide in a unique constraint.
fn composite_key(row: &Row, columns: &[String]) -> Option<Vec<String>> {
    columns
        .iter()
        .map(|column| {
            row.get(column)
                .filter(|value| !value.is_null())
                .map(Value::key_part)
        })
        .collect()
}
