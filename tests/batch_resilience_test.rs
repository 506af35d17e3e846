//! Batch resilience integration tests
//!
//! A batch must always complete with a full accounting: per-item
//! failures are recorded, never propagated, and combined statistics are
//! the sum of the successful items' statistics.

use tokio::sync::watch;
use veil::core::batch::result::ItemOutcome;
use veil::core::batch::{BatchOrchestrator, DeidentifyStatistics};
use veil::deidentify::options::DeidentifyOptions;

const GOOD: &str = "MSH|^~\\&|SEND|FAC|RECV|FAC|20240115103000||ADT^A01|MSG001|P|2.5\rPID|1||MR000123||SMITH^JOHN||19850315|M\r";
const GOOD_OTHER: &str = "MSH|^~\\&|SEND|FAC|RECV|FAC|20240116090000||ADT^A01|MSG002|P|2.5\rPID|1||MR000456||JONES^ALICE||19781122|F\r";

fn options() -> DeidentifyOptions {
    DeidentifyOptions {
        salt: Some("resilience-test".to_string()),
        ..Default::default()
    }
}

fn orchestrator() -> BatchOrchestrator {
    let (_tx, rx) = watch::channel(false);
    BatchOrchestrator::new(options(), rx).unwrap()
}

#[tokio::test]
async fn corrupt_file_does_not_abort_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let in_dir = dir.path().join("in");
    std::fs::create_dir_all(&in_dir).unwrap();
    std::fs::write(in_dir.join("a.hl7"), GOOD).unwrap();
    std::fs::write(in_dir.join("b.hl7"), "").unwrap(); // unreadable content
    std::fs::write(in_dir.join("c.hl7"), GOOD_OTHER).unwrap();
    let out_dir = dir.path().join("out");

    let batch = orchestrator()
        .process_directory(&in_dir, &out_dir)
        .await
        .unwrap();

    assert_eq!(batch.items.len(), 3);
    assert_eq!(batch.successes(), 2);
    assert_eq!(batch.failures(), 1);
    assert_eq!(batch.items.len(), batch.successes() + batch.failures());

    // The failed item names its error
    let failed = batch
        .items
        .iter()
        .find(|i| i.source.ends_with("b.hl7"))
        .unwrap();
    match &failed.outcome {
        ItemOutcome::Failed { error } => assert!(error.contains("empty")),
        ItemOutcome::Success { .. } => panic!("empty file must fail"),
    }

    // The good files still produced output
    assert!(out_dir.join("a.hl7").exists());
    assert!(out_dir.join("c.hl7").exists());
    assert!(!out_dir.join("b.hl7").exists());
}

#[tokio::test]
async fn failed_items_contribute_nothing_to_statistics() {
    let dir = tempfile::tempdir().unwrap();
    let in_dir = dir.path().join("in");
    std::fs::create_dir_all(&in_dir).unwrap();
    std::fs::write(in_dir.join("good.hl7"), GOOD).unwrap();
    std::fs::write(in_dir.join("bad.hl7"), "   \n").unwrap();
    let out_dir = dir.path().join("out");

    let batch = orchestrator()
        .process_directory(&in_dir, &out_dir)
        .await
        .unwrap();

    assert_eq!(batch.statistics.items_processed, 1);
    let mut expected = DeidentifyStatistics::default();
    for item in &batch.items {
        if let ItemOutcome::Success { result } = &item.outcome {
            expected.merge(&result.statistics);
        }
    }
    assert_eq!(
        batch.statistics.identifiers_processed,
        expected.identifiers_processed
    );
    assert_eq!(batch.statistics.by_category, expected.by_category);
}

#[tokio::test]
async fn missing_input_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = orchestrator()
        .process_directory(&dir.path().join("nope"), &dir.path().join("out"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Input"));
}

#[tokio::test]
async fn malformed_segments_are_warnings_not_failures() {
    let dir = tempfile::tempdir().unwrap();
    let in_dir = dir.path().join("in");
    std::fs::create_dir_all(&in_dir).unwrap();
    let with_garbage = format!("{GOOD}this line is not a segment\r");
    std::fs::write(in_dir.join("odd.hl7"), with_garbage).unwrap();
    let out_dir = dir.path().join("out");

    let batch = orchestrator()
        .process_directory(&in_dir, &out_dir)
        .await
        .unwrap();

    assert_eq!(batch.successes(), 1);
    assert_eq!(batch.statistics.warnings, 1);
    let item = &batch.items[0];
    if let ItemOutcome::Success { result } = &item.outcome {
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Malformed segment"));
    } else {
        panic!("item should succeed with warnings");
    }
}

#[tokio::test]
async fn large_batch_full_accounting() {
    let dir = tempfile::tempdir().unwrap();
    let in_dir = dir.path().join("in");
    std::fs::create_dir_all(&in_dir).unwrap();
    for i in 0..25 {
        let content = if i % 5 == 4 {
            String::new() // every fifth file is empty and fails
        } else {
            GOOD.replace("MR000123", &format!("MR{i:06}"))
        };
        std::fs::write(in_dir.join(format!("m{i:02}.hl7")), content).unwrap();
    }
    let out_dir = dir.path().join("out");

    let batch = orchestrator()
        .process_directory(&in_dir, &out_dir)
        .await
        .unwrap();

    assert_eq!(batch.items.len(), 25);
    assert_eq!(batch.successes(), 20);
    assert_eq!(batch.failures(), 5);
    assert_eq!(batch.statistics.items_processed, 20);
    // Twenty distinct subjects across the successful items
    assert_eq!(batch.statistics.unique_subjects(), 20);
}
