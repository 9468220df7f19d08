//! Table jobs for the university schema.
//!
//! [`catalog`] lists every job parents first, so running them in order never
//! reads an empty parent population that an earlier job would have filled.

/// `ForeignKey` literal, usable in `'static` slices.
macro_rules! fk {
    ($column:literal, $parent_table:literal, $parent_column:literal) => {
        $crate::university::ForeignKey {
            column: $column,
            parent_table: $parent_table,
            parent_column: $parent_column,
        }
    };
}

mod academic;
mod activity;
mod people;
pub mod vocab;

use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use unifill_core::{Record, WriteOperation};
use unifill_load::MemorySession;

use crate::errors::GenerationError;
use crate::model::{GenerationRequest, Reference, Target};
use crate::synth::Draw;

/// Record synthesizer of a catalog job.
pub type Synth = fn(&Draw<'_>, &mut ChaCha8Rng) -> Record;

/// Column of a job that points at a parent table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub column: &'static str,
    pub parent_table: &'static str,
    pub parent_column: &'static str,
}

#[derive(Debug, Clone)]
pub struct TableJob {
    pub table: &'static str,
    pub columns: &'static [&'static str],
    /// Primary key filled in by the database.
    pub serial_key: Option<&'static str>,
    pub references: Vec<Reference>,
    pub foreign_keys: &'static [ForeignKey],
    pub unique: Option<&'static [&'static str]>,
    /// Default size of the job.
    pub target: Target,
    pub synth: Synth,
}

impl TableJob {
    pub fn operation(&self) -> unifill_core::Result<WriteOperation> {
        WriteOperation::new(self.table, self.columns.iter().copied())
    }

    /// Target with `count` replacing the default row count, or the per-key
    /// count for fan-out jobs.
    pub fn target_with(&self, count: Option<u64>) -> Target {
        match (self.target, count) {
            (target, None) => target,
            (Target::Rows(_), Some(count)) => Target::Rows(count),
            (Target::PerKey { reference, .. }, Some(count)) => Target::PerKey {
                reference,
                per_key: count,
            },
        }
    }

    pub fn request(&self, seed: u64, count: Option<u64>) -> Result<GenerationRequest, GenerationError> {
        let mut request = GenerationRequest::new(self.operation()?, self.target_with(count)).seed(seed);
        request.references = self.references.clone();
        if let Some(columns) = self.unique {
            request = request.unique(columns.iter().copied());
        }
        Ok(request)
    }

    /// Parent tables, in declaration order and without repeats.
    pub fn parents(&self) -> Vec<&'static str> {
        let mut parents = Vec::new();
        for key in self.foreign_keys {
            if !parents.contains(&key.parent_table) {
                parents.push(key.parent_table);
            }
        }
        parents
    }

    /// `500000 rows` or `4 per universities`.
    pub fn describe_target(&self) -> String {
        match self.target {
            Target::Rows(count) => format!("{count} rows"),
            Target::PerKey { reference, per_key } => {
                let parent = self
                    .references
                    .get(reference)
                    .map(|reference| reference.source.table.as_str())
                    .unwrap_or("?");
                format!("{per_key} per {parent}")
            }
        }
    }
}

/// Every job, parents before children.
pub fn catalog() -> Vec<TableJob> {
    vec![
        academic::semesters(),
        academic::universities(),
        academic::faculties(),
        academic::departments(),
        academic::study_programs(),
        academic::courses(),
        people::students(),
        people::professors(),
        academic::classrooms(),
        academic::student_groups(),
        activity::research_projects(),
        activity::library_resources(),
        activity::international_partnerships(),
        people::professor_course_assignments(),
        people::student_course_enrollments(),
        people::grades(),
        people::scholarships(),
        academic::schedules(),
        activity::equipment_requests(),
        activity::university_events(),
        people::student_exchange_programs(),
        people::professor_research_interests(),
        activity::project_funding_sources(),
        people::student_extracurricular_activities(),
        activity::resource_keywords(),
        academic::course_prerequisites(),
    ]
}

pub fn find<'a>(jobs: &'a [TableJob], table: &str) -> Option<&'a TableJob> {
    jobs.iter().find(|job| job.table == table)
}

/// In-memory stand-in for the university database: serial keys, foreign keys
/// and unique groups of `jobs` are enforced.
pub fn memory_session(jobs: &[TableJob]) -> MemorySession {
    let mut session = MemorySession::new();
    for job in jobs {
        if let Some(serial) = job.serial_key {
            session = session.with_serial(job.table, serial);
        }
        for key in job.foreign_keys {
            session = session.with_foreign_key(job.table, key.column, key.parent_table, key.parent_column);
        }
        if let Some(columns) = job.unique {
            session = session.with_unique(job.table, columns.iter().copied());
        }
    }
    session
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn parents_come_before_children() {
        let jobs = catalog();
        let mut seen = HashSet::new();
        for job in &jobs {
            for parent in job.parents() {
                assert!(
                    seen.contains(parent),
                    "{} runs before its parent {parent}",
                    job.table
                );
            }
            for reference in &job.references {
                assert!(
                    seen.contains(reference.source.table.as_str()),
                    "{} reads {} before it is filled",
                    job.table,
                    reference.source.table
                );
            }
            assert!(seen.insert(job.table), "duplicate job {}", job.table);
        }
        assert_eq!(jobs.len(), 26);
    }

    #[test]
    fn declared_columns_exist() {
        for job in catalog() {
            let op = job.operation().unwrap();
            for key in job.foreign_keys {
                op.position(key.column).unwrap();
            }
            for column in job.unique.unwrap_or(&[]) {
                op.position(column).unwrap();
            }
        }
    }

    #[test]
    fn count_override_follows_target_kind() {
        let jobs = catalog();
        let faculties = find(&jobs, "faculties").unwrap();
        assert_eq!(
            faculties.target_with(Some(2)),
            Target::PerKey {
                reference: 0,
                per_key: 2
            }
        );
        assert_eq!(faculties.describe_target(), "4 per universities");

        let students = find(&jobs, "students").unwrap();
        assert_eq!(students.target_with(Some(10)), Target::Rows(10));
        assert_eq!(students.target_with(None), Target::Rows(500_000));
    }
}
