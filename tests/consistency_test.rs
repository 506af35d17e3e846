//! Session consistency integration tests
//!
//! The central guarantee: within one session, the same original value
//! always maps to the same replacement, across messages and across
//! files processed concurrently.

use tokio::sync::watch;
use veil::core::batch::BatchOrchestrator;
use veil::deidentify::options::DeidentifyOptions;
use veil::domain::message::{FieldLocation, Hl7Message};

fn options() -> DeidentifyOptions {
    DeidentifyOptions {
        salt: Some("consistency-test".to_string()),
        ..Default::default()
    }
}

fn orchestrator() -> BatchOrchestrator {
    let (_tx, rx) = watch::channel(false);
    BatchOrchestrator::new(options(), rx).unwrap()
}

fn message_for(mrn: &str, name: &str, msg_id: &str) -> String {
    format!(
        "MSH|^~\\&|SEND|FAC|RECV|FAC|20240115103000||ADT^A01|{msg_id}|P|2.5\rPID|1||{mrn}||{name}||19850315|M\r"
    )
}

fn pid_field(content: &str, field: usize) -> String {
    Hl7Message::parse(content)
        .field(&FieldLocation::new("PID", 0, field))
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn same_id_in_two_files_gets_identical_replacement() {
    let dir = tempfile::tempdir().unwrap();
    let in_dir = dir.path().join("in");
    std::fs::create_dir_all(&in_dir).unwrap();
    std::fs::write(
        in_dir.join("visit1.hl7"),
        message_for("MR000123", "SMITH^JOHN", "MSG001"),
    )
    .unwrap();
    std::fs::write(
        in_dir.join("visit2.hl7"),
        message_for("MR000123", "SMITH^JOHN", "MSG002"),
    )
    .unwrap();
    let out_dir = dir.path().join("out");

    let batch = orchestrator()
        .process_directory(&in_dir, &out_dir)
        .await
        .unwrap();
    assert_eq!(batch.successes(), 2);

    let a = std::fs::read_to_string(out_dir.join("visit1.hl7")).unwrap();
    let b = std::fs::read_to_string(out_dir.join("visit2.hl7")).unwrap();

    let mrn_a = pid_field(&a, 3);
    let mrn_b = pid_field(&b, 3);
    assert_eq!(mrn_a, mrn_b);
    assert_ne!(mrn_a, "MR000123");

    let name_a = pid_field(&a, 5);
    let name_b = pid_field(&b, 5);
    assert_eq!(name_a, name_b);
    assert_ne!(name_a, "SMITH^JOHN");

    // The combined mapping table carries exactly one record per distinct
    // (category, original) pair even though both files contributed it
    let mrn_records: Vec<_> = batch
        .mapping_records
        .iter()
        .filter(|r| r.replacement == mrn_a)
        .collect();
    assert_eq!(mrn_records.len(), 1);
}

#[tokio::test]
async fn different_ids_never_share_a_replacement() {
    let dir = tempfile::tempdir().unwrap();
    let in_dir = dir.path().join("in");
    std::fs::create_dir_all(&in_dir).unwrap();
    for i in 0..20 {
        std::fs::write(
            in_dir.join(format!("p{i:02}.hl7")),
            message_for(&format!("MR{i:06}"), "SMITH^JOHN", &format!("MSG{i:03}")),
        )
        .unwrap();
    }
    let out_dir = dir.path().join("out");

    let batch = orchestrator()
        .process_directory(&in_dir, &out_dir)
        .await
        .unwrap();
    assert_eq!(batch.successes(), 20);

    let mut replacements = std::collections::BTreeSet::new();
    for i in 0..20 {
        let content = std::fs::read_to_string(out_dir.join(format!("p{i:02}.hl7"))).unwrap();
        replacements.insert(pid_field(&content, 3));
    }
    // 20 distinct originals must yield 20 distinct replacements
    assert_eq!(replacements.len(), 20);
}

#[tokio::test]
async fn case_and_whitespace_variants_map_together() {
    let dir = tempfile::tempdir().unwrap();
    let in_dir = dir.path().join("in");
    std::fs::create_dir_all(&in_dir).unwrap();
    std::fs::write(
        in_dir.join("a.hl7"),
        message_for("MR000123", "SMITH^JOHN", "MSG001"),
    )
    .unwrap();
    std::fs::write(
        in_dir.join("b.hl7"),
        message_for("MR000123", "smith^john", "MSG002"),
    )
    .unwrap();
    let out_dir = dir.path().join("out");

    orchestrator()
        .process_directory(&in_dir, &out_dir)
        .await
        .unwrap();

    let a = std::fs::read_to_string(out_dir.join("a.hl7")).unwrap();
    let b = std::fs::read_to_string(out_dir.join("b.hl7")).unwrap();
    assert_eq!(pid_field(&a, 5), pid_field(&b, 5));
}

#[tokio::test]
async fn reprocessing_clean_output_stays_clean() {
    // Idempotent validation: de-identifying already de-identified content
    // introduces no new findings.
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("a.hl7");
    std::fs::write(&input, message_for("MR000123", "SMITH^JOHN", "MSG001")).unwrap();

    let first = orchestrator().process_file(&input, None).await.unwrap();
    assert!(first.validation.passed_validation);
    let clean = first.transformed_content.unwrap();

    let second_input = dir.path().join("b.hl7");
    std::fs::write(&second_input, &clean).unwrap();
    let second = orchestrator()
        .process_file(&second_input, None)
        .await
        .unwrap();
    assert!(second.validation.passed_validation);
    assert!(second.compliance.findings.is_empty());
}
