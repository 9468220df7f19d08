use unifill_core::{Record, Value, WriteOperation, record};
use unifill_load::{BatchBound, BatchedLoader, FailureKind, LoadError, MemorySession};

fn grades_op() -> WriteOperation {
    WriteOperation::new("grades", ["grade_id", "grade_value"]).unwrap()
}

fn numbered(count: i64) -> Vec<Record> {
    (1..=count).map(|id| record![id, 80_i64]).collect()
}

fn loader(bound: usize) -> BatchedLoader {
    BatchedLoader::new(BatchBound::new(bound).unwrap())
}

fn rejects_id(id: i64) -> impl Fn(&Record) -> bool + Send + Sync + 'static {
    move |record: &Record| record.get(0) == Some(&Value::Int(id))
}

#[tokio::test]
async fn bad_record_only_costs_itself() {
    let mut session = MemorySession::new().with_check("grades", "grade_not_five", rejects_id(5));
    let op = grades_op();

    let report = loader(3)
        .load(&mut session, &op, &numbered(7))
        .await
        .unwrap();

    assert_eq!(report.submitted, 7);
    assert_eq!(report.written, 6);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.chunks, 3);
    assert_eq!(report.fallback_chunks, 1);
    assert!(report.is_conserved());
    assert_eq!(report.skipped_samples.len(), 1);
    assert_eq!(report.skipped_samples[0].index, 4);
    assert_eq!(report.skipped_samples[0].record, "(5, 80)");
    assert!(report.skipped_samples[0].cause.contains("23514"));

    let stats = session.stats();
    assert_eq!(stats.bulk_sizes, vec![3, 3, 1]);
    // Only the failing chunk is retried per record.
    assert_eq!(stats.single_calls, 3);
    assert_eq!(stats.rollbacks, 2);

    let ids: Vec<Value> = session
        .rows("grades", &["grade_id"])
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(
        ids,
        [1, 2, 3, 4, 6, 7].map(Value::Int).to_vec(),
        "record 5 must be the only one missing"
    );
}

#[tokio::test]
async fn chunk_boundaries_follow_the_bound() {
    let mut session = MemorySession::new();
    let op = grades_op();

    let report = loader(4)
        .load(&mut session, &op, &numbered(10))
        .await
        .unwrap();

    assert_eq!(session.stats().bulk_sizes, vec![4, 4, 2]);
    assert_eq!(session.stats().commits, 3);
    assert_eq!(report.written, 10);
    assert_eq!(report.fallback_chunks, 0);
    assert_eq!(session.row_count("grades"), 10);
}

#[tokio::test]
async fn empty_sequence_writes_nothing() {
    let mut session = MemorySession::new();
    let report = loader(3).load(&mut session, &grades_op(), &[]).await.unwrap();

    assert_eq!(report.submitted, 0);
    assert_eq!(report.chunks, 0);
    assert_eq!(session.stats().bulk_calls, 0);
    assert_eq!(session.stats().commits, 0);
}

#[tokio::test]
async fn duplicates_inside_a_chunk_keep_the_first() {
    let mut session = MemorySession::new().with_unique("grades", ["grade_id"]);
    let op = grades_op();
    let records = vec![
        record![1_i64, 70_i64],
        record![2_i64, 71_i64],
        record![1_i64, 72_i64],
    ];

    let report = loader(10).load(&mut session, &op, &records).await.unwrap();

    assert_eq!(report.written, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.skipped_samples[0].index, 2);
    assert_eq!(
        session.rows("grades", &["grade_value"]),
        vec![vec![Value::Int(70)], vec![Value::Int(71)]]
    );
}

#[tokio::test]
async fn every_record_failing_still_completes() {
    let mut session =
        MemorySession::new().with_check("grades", "always", |_: &Record| true);
    let report = loader(2)
        .load(&mut session, &grades_op(), &numbered(5))
        .await
        .unwrap();

    assert_eq!(report.written, 0);
    assert_eq!(report.skipped, 5);
    assert_eq!(report.fallback_chunks, 3);
    assert!(report.is_conserved());
    assert_eq!(session.row_count("grades"), 0);
}

#[tokio::test]
async fn arity_errors_fail_before_any_write() {
    let mut session = MemorySession::new();
    let mut records = numbered(4);
    records.push(record![5_i64]);

    let err = loader(2)
        .load(&mut session, &grades_op(), &records)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LoadError::Record(unifill_core::Error::ArityMismatch {
            expected: 2,
            actual: 1,
            ..
        })
    ));
    assert_eq!(session.stats().bulk_calls, 0);
    assert_eq!(session.row_count("grades"), 0);
}

#[tokio::test]
async fn lost_connection_aborts_and_keeps_committed_chunks() {
    let mut session = MemorySession::new().fail_after_writes(1);

    let err = loader(3)
        .load(&mut session, &grades_op(), &numbered(7))
        .await
        .unwrap_err();

    match err {
        LoadError::Session(err) => assert_eq!(err.kind, FailureKind::Connection),
        other => panic!("expected a session error, got {other:?}"),
    }
    assert_eq!(session.row_count("grades"), 3);
    // No per-record retry after a fatal error.
    assert_eq!(session.stats().single_calls, 0);
}

#[tokio::test]
async fn lost_connection_during_fallback_aborts() {
    let mut session = MemorySession::new()
        .with_check("grades", "grade_not_two", rejects_id(2))
        .fail_after_writes(2);

    let err = loader(3)
        .load(&mut session, &grades_op(), &numbered(3))
        .await
        .unwrap_err();

    assert!(matches!(err, LoadError::Session(ref err) if err.is_fatal()));
    assert_eq!(session.rows("grades", &["grade_id"]), vec![vec![Value::Int(1)]]);
}

#[tokio::test]
async fn statement_failure_on_a_chunk_is_demoted() {
    let mut session =
        MemorySession::new().with_failing_statement("grades", |records| records.len() > 1);

    let report = loader(3)
        .load(&mut session, &grades_op(), &numbered(4))
        .await
        .unwrap();

    assert_eq!(report.written, 4);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.fallback_chunks, 1);
    assert_eq!(session.stats().bulk_sizes, vec![3, 1]);
    assert_eq!(session.stats().single_calls, 3);
    assert_eq!(session.row_count("grades"), 4);
}

#[tokio::test]
async fn statement_failure_on_a_single_record_aborts() {
    let mut session = MemorySession::new().with_failing_statement("grades", |records| {
        records.iter().any(|record| record.get(0) == Some(&Value::Int(5)))
    });

    let err = loader(3)
        .load(&mut session, &grades_op(), &numbered(7))
        .await
        .unwrap_err();

    match err {
        LoadError::Session(err) => assert_eq!(err.kind, FailureKind::Statement),
        other => panic!("expected a session error, got {other:?}"),
    }
    let ids: Vec<Value> = session
        .rows("grades", &["grade_id"])
        .into_iter()
        .flatten()
        .collect();
    // First chunk committed in bulk, record 4 through the fallback.
    assert_eq!(ids, [1, 2, 3, 4].map(Value::Int).to_vec());
    assert_eq!(session.stats().bulk_sizes, vec![3, 3]);
    assert_eq!(session.stats().single_calls, 2);
}

#[tokio::test]
async fn sink_flushes_at_the_bound() {
    let mut session = MemorySession::new().with_check("grades", "grade_not_five", rejects_id(5));
    let op = grades_op();
    let loader = loader(3);
    let mut sink = loader.sink(&mut session, &op);

    for record in numbered(7) {
        sink.push(record).await.unwrap();
    }
    assert_eq!(sink.pending(), 1);
    assert_eq!(sink.report().written, 5);

    let report = sink.finish().await.unwrap();
    assert_eq!(report.written, 6);
    assert_eq!(report.skipped, 1);
    assert_eq!(session.stats().bulk_sizes, vec![3, 3, 1]);
}

#[tokio::test]
async fn skipped_samples_are_capped() {
    let mut session =
        MemorySession::new().with_check("grades", "always", |_: &Record| true);
    let report = loader(50)
        .load(&mut session, &grades_op(), &numbered(150))
        .await
        .unwrap();

    assert_eq!(report.skipped, 150);
    assert_eq!(
        report.skipped_samples.len(),
        unifill_load::MAX_SKIPPED_SAMPLES
    );
}

#[tokio::test]
async fn report_serializes_for_run_summaries() {
    let mut session = MemorySession::new();
    let report = loader(3)
        .load(&mut session, &grades_op(), &numbered(2))
        .await
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["table"], "grades");
    assert_eq!(json["written"], 2);
    assert_eq!(json["skipped_samples"], serde_json::json!([]));
}
