use std::collections::HashSet;

use unifill_core::{KeySource, Record, Value, WriteOperation};
use unifill_load::{Session, SessionError};

/// Composite keys already taken in a uniqueness-constrained table.
///
/// Seeded from what is stored, then grown with every accepted record. A key
/// with a NULL part never collides and is never tracked.
#[derive(Debug, Clone)]
pub struct UniquenessTracker {
    table: String,
    columns: Vec<String>,
    positions: Vec<usize>,
    seen: HashSet<Vec<String>>,
    seeded: usize,
}

impl UniquenessTracker {
    pub fn new(op: &WriteOperation, columns: &[String]) -> unifill_core::Result<Self> {
        if columns.is_empty() {
            return Err(unifill_core::Error::NoColumns(op.table().to_string()));
        }
        let positions = columns
            .iter()
            .map(|column| op.position(column))
            .collect::<unifill_core::Result<Vec<_>>>()?;
        Ok(Self {
            table: op.table().to_string(),
            columns: columns.to_vec(),
            positions,
            seen: HashSet::new(),
            seeded: 0,
        })
    }

    /// Load the combinations already stored. Returns how many were added.
    pub async fn seed<S>(&mut self, session: &mut S) -> Result<usize, SessionError>
    where
        S: Session + ?Sized,
    {
        let source = KeySource {
            table: self.table.clone(),
            columns: self.columns.clone(),
            filter: None,
            distinct: true,
            limit: None,
        };
        let before = self.seen.len();
        for key in session.fetch_keys(&source).await? {
            if let Some(key) = canonical(key.iter()) {
                self.seen.insert(key);
            }
        }
        let added = self.seen.len() - before;
        self.seeded += added;
        Ok(added)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Keys loaded from storage by [`Self::seed`].
    pub fn seeded(&self) -> usize {
        self.seeded
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn contains(&self, record: &Record) -> bool {
        self.key_of(record)
            .is_some_and(|key| self.seen.contains(&key))
    }

    /// Accept the record's key if it is unused, remembering it.
    pub fn admit(&mut self, record: &Record) -> bool {
        match self.key_of(record) {
            Some(key) => self.seen.insert(key),
            None => true,
        }
    }

    fn key_of(&self, record: &Record) -> Option<Vec<String>> {
        canonical(
            self.positions
                .iter()
                .map(|position| record.get(*position).unwrap_or(&Value::Null)),
        )
    }
}

fn canonical<'a>(parts: impl Iterator<Item = &'a Value>) -> Option<Vec<String>> {
    parts
        .map(|value| (!value.is_null()).then(|| value.key_part()))
        .collect()
}

#[cfg(test)]
mod tests {
    use unifill_core::record;

    use super::*;

    fn op() -> WriteOperation {
        WriteOperation::new("resource_keywords", ["resource_id", "keyword"]).unwrap()
    }

    #[test]
    fn admits_each_combination_once() {
        let columns = vec!["resource_id".to_string(), "keyword".to_string()];
        let mut tracker = UniquenessTracker::new(&op(), &columns).unwrap();

        assert!(tracker.admit(&record![1_i64, "databases"]));
        assert!(!tracker.admit(&record![1_i64, "databases"]));
        assert!(tracker.admit(&record![2_i64, "databases"]));
        assert!(tracker.contains(&record![2_i64, "databases"]));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn null_parts_never_collide() {
        let columns = vec!["resource_id".to_string(), "keyword".to_string()];
        let mut tracker = UniquenessTracker::new(&op(), &columns).unwrap();

        assert!(tracker.admit(&record![1_i64, None::<String>]));
        assert!(tracker.admit(&record![1_i64, None::<String>]));
        assert!(tracker.is_empty());
    }

    #[test]
    fn rejects_unknown_columns() {
        let columns = vec!["resource_id".to_string(), "weight".to_string()];
        let err = UniquenessTracker::new(&op(), &columns).unwrap_err();
        assert!(matches!(err, unifill_core::Error::UnknownColumn { .. }));
    }
}
