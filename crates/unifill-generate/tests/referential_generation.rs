use std::collections::{HashMap, HashSet};

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use unifill_core::{KeySource, Record, Value, WriteOperation, record};
use unifill_generate::{
    Draw, GenerationError, GenerationRequest, Reference, ReferentialGenerator, Target,
};
use unifill_load::MemorySession;

fn ids(column: &'static str, range: std::ops::RangeInclusive<i64>) -> Vec<Vec<(&'static str, Value)>> {
    range.map(|id| vec![(column, Value::Int(id))]).collect()
}

/// Students 1..=students and courses 1..=courses, with enrollments keyed on
/// the (student_id, course_id) pair.
fn university(students: i64, courses: i64) -> MemorySession {
    let mut session = MemorySession::new()
        .with_foreign_key("enrollments", "student_id", "students", "student_id")
        .with_foreign_key("enrollments", "course_id", "courses", "course_id")
        .with_unique("enrollments", ["student_id", "course_id"]);
    session.seed("students", ids("student_id", 1..=students));
    session.seed("courses", ids("course_id", 1..=courses));
    session
}

fn enrollments(target: Target) -> GenerationRequest {
    let op = WriteOperation::new("enrollments", ["student_id", "course_id", "status"]).unwrap();
    GenerationRequest::new(op, target)
        .reference(Reference::required(KeySource::column("students", "student_id")))
        .reference(Reference::required(KeySource::column("courses", "course_id")))
        .seed(42)
}

fn enroll(draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
    let status = if rng.random_bool(0.8) { "active" } else { "dropped" };
    record![draw.key(0).clone(), draw.key(1).clone(), status]
}

fn pairs(session: &MemorySession) -> Vec<(i64, i64)> {
    session
        .rows("enrollments", &["student_id", "course_id"])
        .into_iter()
        .map(|row| (row[0].as_i64().unwrap(), row[1].as_i64().unwrap()))
        .collect()
}

#[tokio::test]
async fn foreign_keys_come_from_the_populations() {
    let mut session = university(20, 10);
    let request = enrollments(Target::Rows(200));

    let outcome = ReferentialGenerator::default()
        .run(&mut session, &request, &mut enroll)
        .await
        .unwrap();

    assert_eq!(outcome.requested, 200);
    assert_eq!(outcome.generated, 200);
    // No unique group declared on the request: repeated pairs reach the
    // database and the loader skips them.
    assert_eq!(outcome.attempts, 200);
    assert_eq!(outcome.written() + outcome.skipped(), 200);

    let stored = pairs(&session);
    let distinct: HashSet<(i64, i64)> = stored.iter().copied().collect();
    assert_eq!(distinct.len(), stored.len());
    assert_eq!(stored.len() as u64, outcome.written());
    for (student, course) in stored {
        assert!((1..=20).contains(&student));
        assert!((1..=10).contains(&course));
    }
}

#[tokio::test]
async fn unique_group_accounts_for_existing_rows() {
    let mut session = university(10, 10);
    session.seed(
        "enrollments",
        (1..=10).map(|course| {
            vec![
                ("student_id", Value::Int(1)),
                ("course_id", Value::Int(course)),
                ("status", Value::from("active")),
            ]
        }),
    );
    let request = enrollments(Target::Rows(50)).unique(["student_id", "course_id"]);

    let outcome = ReferentialGenerator::default()
        .run(&mut session, &request, &mut enroll)
        .await
        .unwrap();

    assert_eq!(outcome.generated, 50);
    assert_eq!(outcome.skipped(), 0, "the database never sees a duplicate");
    let all = pairs(&session);
    let distinct: HashSet<_> = all.iter().copied().collect();
    assert_eq!(all.len(), 60);
    assert_eq!(distinct.len(), 60);
}

#[tokio::test]
async fn rerun_never_repeats_a_pair() {
    let mut session = university(20, 20);
    let request = enrollments(Target::Rows(30)).unique(["student_id", "course_id"]);
    let generator = ReferentialGenerator::default();

    let first = generator
        .run(&mut session, &request, &mut enroll)
        .await
        .unwrap();
    let second = generator
        .run(&mut session, &request, &mut enroll)
        .await
        .unwrap();

    assert_eq!(first.written(), 30);
    assert_eq!(second.written(), 30);
    // Same seed, so the second run first replays the pairs of the first.
    assert!(second.rejected >= 30);
    let all = pairs(&session);
    let distinct: HashSet<_> = all.iter().copied().collect();
    assert_eq!(distinct.len(), 60);
}

#[tokio::test]
async fn exhausted_key_space_reports_a_shortfall() {
    let mut session = university(90, 100);
    let request = enrollments(Target::Rows(10_000)).unique(["student_id", "course_id"]);

    let outcome = ReferentialGenerator::default()
        .run(&mut session, &request, &mut enroll)
        .await
        .unwrap();

    assert_eq!(outcome.requested, 10_000);
    assert_eq!(outcome.attempts, 50_000);
    assert!(outcome.generated <= 9_000);
    assert!(outcome.shortfall() >= 1_000);
    assert_eq!(outcome.generated + outcome.rejected, outcome.attempts);
    assert_eq!(outcome.written(), outcome.generated);
    assert_eq!(outcome.skipped(), 0);
}

#[tokio::test]
async fn empty_required_population_writes_nothing() {
    let mut session = MemorySession::new();
    session.seed("courses", ids("course_id", 1..=5));
    let request = enrollments(Target::Rows(10));

    let err = ReferentialGenerator::default()
        .run(&mut session, &request, &mut enroll)
        .await
        .unwrap_err();

    match err {
        GenerationError::EmptyPopulation { table, keys } => {
            assert_eq!(table, "enrollments");
            assert!(keys.contains("students"), "{keys}");
        }
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(session.stats().bulk_calls, 0);
    assert_eq!(session.row_count("enrollments"), 0);
}

#[tokio::test]
async fn empty_optional_population_yields_nulls() {
    let mut session = MemorySession::new()
        .with_foreign_key("groups", "curator_id", "professors", "professor_id");
    session.seed("programs", ids("program_id", 1..=3));
    let op = WriteOperation::new("groups", ["program_id", "curator_id"]).unwrap();
    let request = GenerationRequest::new(op, Target::Rows(6))
        .reference(Reference::required(KeySource::column("programs", "program_id")))
        .reference(Reference::optional(KeySource::column("professors", "professor_id")));

    let outcome = ReferentialGenerator::default()
        .run(&mut session, &request, &mut |draw: &Draw<'_>, _rng: &mut ChaCha8Rng| {
            record![draw.key(0).clone(), draw.key(1).clone()]
        })
        .await
        .unwrap();

    assert_eq!(outcome.written(), 6);
    for row in session.rows("groups", &["curator_id"]) {
        assert_eq!(row, vec![Value::Null]);
    }
}

#[tokio::test]
async fn per_key_target_fans_out_over_every_parent() {
    let mut session = MemorySession::new();
    session.seed("universities", ids("university_id", 1..=3));
    let op = WriteOperation::new("faculties", ["university_id", "slot"]).unwrap();
    let request = GenerationRequest::new(op, Target::PerKey {
        reference: 0,
        per_key: 4,
    })
    .reference(Reference::required(KeySource::column(
        "universities",
        "university_id",
    )));

    let outcome = ReferentialGenerator::default()
        .run(&mut session, &request, &mut |draw: &Draw<'_>, _rng: &mut ChaCha8Rng| {
            record![draw.key(0).clone(), draw.slot as i64]
        })
        .await
        .unwrap();

    assert_eq!(outcome.requested, 12);
    assert_eq!(outcome.written(), 12);
    let mut per_parent: HashMap<i64, Vec<i64>> = HashMap::new();
    for row in session.rows("faculties", &["university_id", "slot"]) {
        per_parent
            .entry(row[0].as_i64().unwrap())
            .or_default()
            .push(row[1].as_i64().unwrap());
    }
    assert_eq!(per_parent.len(), 3);
    for slots in per_parent.values() {
        assert_eq!(slots, &vec![0, 1, 2, 3]);
    }
}

#[tokio::test]
async fn fan_out_over_a_missing_reference_is_rejected() {
    let mut session = MemorySession::new();
    let op = WriteOperation::new("faculties", ["university_id"]).unwrap();
    let request = GenerationRequest::new(op, Target::PerKey {
        reference: 2,
        per_key: 1,
    });

    let err = ReferentialGenerator::default()
        .run(&mut session, &request, &mut enroll)
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::InvalidRequest(_)));
}

#[tokio::test]
async fn same_seed_same_records() {
    let request = enrollments(Target::Rows(100));
    let mut first = university(15, 15);
    let mut second = university(15, 15);

    let generator = ReferentialGenerator::default();
    generator.run(&mut first, &request, &mut enroll).await.unwrap();
    generator.run(&mut second, &request, &mut enroll).await.unwrap();

    let columns = ["student_id", "course_id", "status"];
    assert_eq!(
        first.rows("enrollments", &columns),
        second.rows("enrollments", &columns)
    );

    let mut third = university(15, 15);
    generator
        .run(&mut third, &request.clone().seed(7), &mut enroll)
        .await
        .unwrap();
    assert_ne!(
        first.rows("enrollments", &columns),
        third.rows("enrollments", &columns)
    );
}
