//! Compliance integration tests
//!
//! End-to-end verification of the categorical removal contract: the
//! regulated identifiers present in the input must all be gone from the
//! output, and the checklist must say so.

use regex::Regex;
use tokio::sync::watch;
use veil::core::batch::BatchOrchestrator;
use veil::deidentify::compliance::ComplianceStatus;
use veil::deidentify::options::{DeidentifyMethod, DeidentifyOptions};
use veil::deidentify::taxonomy::IdentifierCategory;
use veil::domain::message::{FieldLocation, Hl7Message};

const ADMIT: &str = "MSH|^~\\&|SEND|FAC|RECV|FAC|20240115103000||ADT^A01|MSG001|P|2.5\rPID|1||MR000123||SMITH^JOHN||19850315|M|||123 MAIN ST^^SPRINGFIELD^IL^62701||(555)123-4567|||||ACCT9988|123-45-6789\rPV1|1|I|ICU^201^A||||^HOUSE^GREGORY\rNTE|1||Spouse reachable at 555-987-6543 or jane.smith@example.com\r";

fn options() -> DeidentifyOptions {
    DeidentifyOptions {
        salt: Some("compliance-test".to_string()),
        ..Default::default()
    }
}

fn orchestrator(options: DeidentifyOptions) -> BatchOrchestrator {
    let (_tx, rx) = watch::channel(false);
    BatchOrchestrator::new(options, rx).unwrap()
}

#[tokio::test]
async fn safe_harbor_scenario_name_and_ssn() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("admit.hl7");
    std::fs::write(&input, ADMIT).unwrap();

    let result = orchestrator(options())
        .process_file(&input, None)
        .await
        .unwrap();
    let content = result.transformed_content.as_ref().unwrap();

    // A synthetic name replaced the original
    let msg = Hl7Message::parse(content);
    let name = msg.field(&FieldLocation::new("PID", 0, 5)).unwrap();
    assert_ne!(name, "SMITH^JOHN");
    assert!(!name.is_empty());

    // No SSN-shaped value survives anywhere in the output
    assert!(!content.contains("123-45-6789"));
    let ssn_pattern = Regex::new(r"\d{3}-\d{2}-\d{4}").unwrap();
    assert!(!ssn_pattern.is_match(content));

    // Checklist entries for the exercised categories are satisfied
    assert_eq!(result.compliance.status, ComplianceStatus::Compliant);
    assert!(result.compliance.checklist[&IdentifierCategory::PatientName]);
    assert!(result.compliance.checklist[&IdentifierCategory::Ssn]);
    assert!(result.compliance.checklist[&IdentifierCategory::Phone]);
    assert!(result.compliance.checklist[&IdentifierCategory::Address]);
}

#[tokio::test]
async fn free_text_identifiers_are_cleaned() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("admit.hl7");
    std::fs::write(&input, ADMIT).unwrap();

    let result = orchestrator(options())
        .process_file(&input, None)
        .await
        .unwrap();
    let content = result.transformed_content.unwrap();

    // The NTE free-text phone and email were replaced via the pattern
    // fallback
    assert!(!content.contains("555-987-6543"));
    assert!(!content.contains("jane.smith@example.com"));
    // The narrative text around them survives
    assert!(content.contains("Spouse reachable at"));
}

#[tokio::test]
async fn address_generalizes_to_state() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("admit.hl7");
    std::fs::write(&input, ADMIT).unwrap();

    let result = orchestrator(options())
        .process_file(&input, None)
        .await
        .unwrap();
    let content = result.transformed_content.unwrap();
    let msg = Hl7Message::parse(&content);
    assert_eq!(
        msg.field(&FieldLocation::new("PID", 0, 11)).unwrap(),
        "^^^IL"
    );
    assert!(!content.contains("SPRINGFIELD"));
    assert!(!content.contains("62701"));
}

#[tokio::test]
async fn preserve_list_yields_noncompliant_verdict() {
    let mut opts = options();
    opts.preserve.insert(IdentifierCategory::ProviderName);

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("admit.hl7");
    std::fs::write(&input, ADMIT).unwrap();

    let result = orchestrator(opts).process_file(&input, None).await.unwrap();
    let content = result.transformed_content.as_ref().unwrap();

    // The provider stayed verbatim, and the verdict says so honestly
    assert!(content.contains("^HOUSE^GREGORY"));
    assert_eq!(result.compliance.status, ComplianceStatus::NonCompliant);
    assert!(!result.compliance.checklist[&IdentifierCategory::ProviderName]);
    // Everything else still transformed
    assert!(!content.contains("SMITH^JOHN"));
}

#[tokio::test]
async fn advisory_risk_attached_in_statistical_mode() {
    let mut opts = options();
    opts.method = DeidentifyMethod::StatisticalAdvisory;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("admit.hl7");
    std::fs::write(&input, ADMIT).unwrap();

    let result = orchestrator(opts).process_file(&input, None).await.unwrap();
    let risk = result.compliance.risk.expect("risk estimate");
    // A single subject is a singleton equivalence class
    assert_eq!(risk.equivalence_classes, 1);
    assert_eq!(risk.smallest_class_size, 1);
    assert!(risk.advisory.contains("advisory"));
    // Advisory only: the verdict is still driven by the checklist
    assert_eq!(result.compliance.status, ComplianceStatus::Compliant);
}

#[tokio::test]
async fn safe_harbor_mode_attaches_no_risk_estimate() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("admit.hl7");
    std::fs::write(&input, ADMIT).unwrap();

    let result = orchestrator(options())
        .process_file(&input, None)
        .await
        .unwrap();
    assert!(result.compliance.risk.is_none());
}
