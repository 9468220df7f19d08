use unifill_generate::university::{catalog, find, memory_session};
use unifill_generate::{GenerateOptions, ReferentialGenerator};
use unifill_load::BatchBound;

#[tokio::test]
async fn full_catalog_dry_run_respects_every_constraint() {
    let jobs = catalog();
    let mut session = memory_session(&jobs);
    let generator = ReferentialGenerator::new(GenerateOptions {
        batch: BatchBound::new(7).unwrap(),
        ..GenerateOptions::default()
    });

    for job in &jobs {
        let request = job.request(2024, Some(3)).unwrap();
        let mut synth = job.synth;
        let outcome = generator
            .run(&mut session, &request, &mut synth)
            .await
            .unwrap_or_else(|err| panic!("{}: {err}", job.table));

        assert!(outcome.written() > 0, "{} wrote nothing", job.table);
        assert_eq!(outcome.skipped(), 0, "{}: {:?}", job.table, outcome.load.skipped_samples);
        assert!(outcome.load.is_conserved());
    }

    assert_eq!(session.row_count("universities"), 3);
    assert_eq!(session.row_count("faculties"), 9);
    assert_eq!(session.row_count("departments"), 27);
}

#[tokio::test]
async fn children_of_an_empty_catalog_fail_before_writing() {
    let jobs = catalog();
    let mut session = memory_session(&jobs);
    let grades = find(&jobs, "grades").unwrap();
    let mut synth = grades.synth;

    let err = ReferentialGenerator::default()
        .run(&mut session, &grades.request(1, Some(1)).unwrap(), &mut synth)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("students"), "{err}");
    assert_eq!(session.stats().bulk_calls, 0);
}
