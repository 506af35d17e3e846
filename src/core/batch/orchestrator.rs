//! Batch orchestrator
//!
//! Drives per-file and per-directory processing through the pipeline
//! (scan, anonymize, validate, verify). The orchestrator owns the
//! session lifetime: one [`SessionMappingStore`] spans the whole batch,
//! so the same subject appearing in multiple files receives identical
//! replacement values.
//!
//! Per-item failures are recorded and never abort the batch; statistics
//! fold additively at a single accumulation point. Cancellation (via the
//! shutdown watch channel) stops dispatching new items but lets
//! in-flight items finish and be recorded.

use crate::core::batch::result::{
    BatchDeidentifyResult, BatchItemReport, DeidentifyResult, ItemOutcome, PreviewChange,
    PreviewReport, ProcessingMetadata,
};
use crate::core::batch::statistics::DeidentifyStatistics;
use crate::deidentify::compliance::{
    ComplianceValidator, ComplianceVerification, QuasiRecord, RiskAssessment,
};
use crate::deidentify::engine::AnonymizationEngine;
use crate::deidentify::options::{DeidentifyMethod, DeidentifyOptions};
use crate::deidentify::scanner::{extract_subject_id, PhiScanner};
use crate::deidentify::session::SessionMappingStore;
use crate::deidentify::taxonomy::IdentifierCategory;
use crate::domain::message::Hl7Message;
use crate::domain::{Result, VeilError};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use uuid::Uuid;
use walkdir::WalkDir;

/// File name of the optional mapping export, written into the output dir
const MAPPING_EXPORT_FILE: &str = "veil_mappings.json";

/// Batch orchestrator owning the session lifetime
pub struct BatchOrchestrator {
    options: DeidentifyOptions,
    scanner: Arc<PhiScanner>,
    engine: Arc<AnonymizationEngine>,
    validator: ComplianceValidator,
    store: Arc<SessionMappingStore>,
    shutdown: watch::Receiver<bool>,
}

impl BatchOrchestrator {
    /// Create an orchestrator and its session
    pub fn new(options: DeidentifyOptions, shutdown: watch::Receiver<bool>) -> Result<Self> {
        options
            .validate()
            .map_err(VeilError::Configuration)?;
        let scanner = Arc::new(
            PhiScanner::new(&options).map_err(|e| VeilError::Configuration(e.to_string()))?,
        );
        let engine = Arc::new(AnonymizationEngine::new(options.clone()));
        let validator = ComplianceValidator::new(options.clone());
        let store = Arc::new(SessionMappingStore::new(options.salt.clone()));

        tracing::info!(
            session_id = %store.session_id(),
            method = ?options.method,
            date_shift = ?options.date_shift,
            "De-identification session started"
        );

        Ok(Self {
            options,
            scanner,
            engine,
            validator,
            store,
            shutdown,
        })
    }

    /// The session mapping store (shared across the whole batch)
    pub fn store(&self) -> &Arc<SessionMappingStore> {
        &self.store
    }

    /// De-identify a single file
    ///
    /// With an output directory the transformed content is written to a
    /// file of the same name; without one it stays in the result.
    pub async fn process_file(
        &self,
        input: &Path,
        output_dir: Option<&Path>,
    ) -> Result<DeidentifyResult> {
        let content = read_input_file(input)?;
        let output_path = match output_dir {
            Some(dir) => {
                ensure_output_dir(dir)?;
                Some(dir.join(input.file_name().ok_or_else(|| {
                    VeilError::Input(format!("Input path has no file name: {}", input.display()))
                })?))
            }
            None => None,
        };

        let (mut result, quasi) =
            self.process_content(&input.display().to_string(), &content, output_path)?;

        if self.options.method == DeidentifyMethod::StatisticalAdvisory {
            let records: Vec<QuasiRecord> = quasi.into_iter().collect();
            result.compliance.risk = Some(RiskAssessment::estimate(&records));
        }

        if self.options.export_mappings {
            if let Some(dir) = output_dir {
                self.store
                    .export_mappings(&dir.join(MAPPING_EXPORT_FILE))
                    .map_err(VeilError::Deidentify)?;
            }
        }

        Ok(result)
    }

    /// De-identify every eligible file under a directory
    ///
    /// Items process independently with bounded parallelism; one item's
    /// failure never aborts the batch. The returned result accounts for
    /// every dispatched item: total == successes + failures.
    pub async fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<BatchDeidentifyResult> {
        let started_at = Utc::now();
        let start = Instant::now();

        if !input_dir.is_dir() {
            return Err(VeilError::Input(format!(
                "Input directory not found: {}",
                input_dir.display()
            )));
        }
        // Output directory creation is mandatory; failure aborts the batch
        ensure_output_dir(output_dir)?;

        let files = enumerate_input_files(input_dir);
        tracing::info!(
            input_dir = %input_dir.display(),
            file_count = files.len(),
            parallelism = self.options.parallelism,
            "Starting batch de-identification"
        );

        let mut cancelled = false;
        let mut dispatched = Vec::new();
        for file in files {
            if *self.shutdown.borrow() {
                tracing::warn!("Cancellation requested; no further items will be dispatched");
                cancelled = true;
                break;
            }
            dispatched.push(file);
        }

        let output_dir = output_dir.to_path_buf();
        let mut outcomes = stream::iter(dispatched)
            .map(|file| {
                let orchestrator = self.clone();
                let output_dir = output_dir.clone();
                let shutdown = self.shutdown.clone();
                async move {
                    // Re-check at dispatch time: items not yet started when
                    // cancellation lands are skipped, in-flight ones finish.
                    if *shutdown.borrow() {
                        return None;
                    }
                    let source = file.display().to_string();
                    let outcome = tokio::task::spawn_blocking(move || {
                        orchestrator.process_one(&file, &output_dir)
                    })
                    .await;
                    let report = match outcome {
                        Ok(Ok((result, quasi))) => (
                            BatchItemReport {
                                source,
                                outcome: ItemOutcome::Success {
                                    result: Box::new(result),
                                },
                            },
                            quasi,
                        ),
                        Ok(Err(e)) => (
                            BatchItemReport {
                                source,
                                outcome: ItemOutcome::Failed {
                                    error: e.to_string(),
                                },
                            },
                            None,
                        ),
                        Err(e) => (
                            BatchItemReport {
                                source,
                                outcome: ItemOutcome::Failed {
                                    error: format!("worker panicked: {e}"),
                                },
                            },
                            None,
                        ),
                    };
                    Some(report)
                }
            })
            .buffer_unordered(self.options.parallelism)
            .collect::<Vec<_>>()
            .await;

        if outcomes.iter().any(|o| o.is_none()) {
            cancelled = true;
        }

        // Single accumulation point: fold statistics and compliance
        let mut items = Vec::new();
        let mut statistics = DeidentifyStatistics::default();
        let mut compliance: Option<ComplianceVerification> = None;
        let mut quasi_records = Vec::new();

        outcomes.sort_by(|a, b| {
            let key = |o: &Option<(BatchItemReport, Option<QuasiRecord>)>| {
                o.as_ref().map(|(r, _)| r.source.clone()).unwrap_or_default()
            };
            key(a).cmp(&key(b))
        });

        for outcome in outcomes.into_iter().flatten() {
            let (report, quasi) = outcome;
            if let ItemOutcome::Success { ref result } = report.outcome {
                statistics.merge(&result.statistics);
                match compliance {
                    Some(ref mut combined) => combined.merge(&result.compliance),
                    None => compliance = Some(result.compliance.clone()),
                }
            }
            if let Some(record) = quasi {
                quasi_records.push(record);
            }
            items.push(report);
        }

        let mut compliance = compliance.unwrap_or_else(ComplianceVerification::unknown);
        if self.options.method == DeidentifyMethod::StatisticalAdvisory {
            compliance.risk = Some(RiskAssessment::estimate(&quasi_records));
        }

        if self.options.export_mappings {
            self.store
                .export_mappings(&output_dir.join(MAPPING_EXPORT_FILE))
                .map_err(VeilError::Deidentify)?;
        }

        let batch = BatchDeidentifyResult {
            batch_id: Uuid::new_v4(),
            session_id: self.store.session_id(),
            items,
            statistics,
            mapping_records: self.store.snapshot(),
            compliance,
            cancelled,
            metadata: ProcessingMetadata::new(started_at, start.elapsed().as_millis() as u64),
        };
        batch.log_summary();
        Ok(batch)
    }

    /// Wrap a single-file result in the batch shape
    ///
    /// Lets single-item runs share the report and persistence paths of
    /// batch runs.
    pub fn wrap_single(&self, result: DeidentifyResult) -> BatchDeidentifyResult {
        let compliance = result.compliance.clone();
        let statistics = result.statistics.clone();
        let started_at = result.metadata.started_at;
        let duration_ms = result.metadata.duration_ms;
        let source = result.source.clone();
        BatchDeidentifyResult {
            batch_id: Uuid::new_v4(),
            session_id: self.store.session_id(),
            items: vec![BatchItemReport {
                source,
                outcome: ItemOutcome::Success {
                    result: Box::new(result),
                },
            }],
            statistics,
            mapping_records: self.store.snapshot(),
            compliance,
            cancelled: false,
            metadata: ProcessingMetadata::new(started_at, duration_ms),
        }
    }

    /// Dry-run: a bounded sample of proposed changes plus extrapolated
    /// statistics, with nothing written and the session store untouched
    pub async fn preview_changes(&self, input: &Path) -> Result<PreviewReport> {
        let files = if input.is_dir() {
            enumerate_input_files(input)
        } else if input.is_file() {
            vec![input.to_path_buf()]
        } else {
            return Err(VeilError::Input(format!(
                "Input not found: {}",
                input.display()
            )));
        };

        let total_files = files.len();
        let sample: Vec<PathBuf> = files.into_iter().take(self.options.sample_files).collect();
        let sampled_files = sample.len();

        // Previews run against a throwaway store so a later real run
        // starts from a clean session.
        let preview_store = SessionMappingStore::new(self.options.salt.clone());

        let mut changes = Vec::new();
        let mut truncated = false;
        let mut sampled_stats = DeidentifyStatistics::default();

        for file in &sample {
            let content = read_input_file(file)?;
            let mut message = Hl7Message::parse(&content);
            let findings = self.scanner.scan(&message);
            let warnings = findings.iter().filter(|f| f.is_warning()).count();
            let subject_hash = extract_subject_id(&message)
                .map(|s| preview_store.hash_original(&s));

            let applied = self
                .engine
                .apply(&mut message, &findings, &preview_store)
                .map_err(VeilError::Deidentify)?;

            for entry in &applied.ledger {
                if changes.len() >= self.options.sample_changes {
                    truncated = true;
                    break;
                }
                changes.push(PreviewChange {
                    source: file.display().to_string(),
                    location: entry.location.clone(),
                    category: entry.category,
                    action: entry.action,
                    original_hash: entry.original_hash.clone(),
                    replacement: entry.replacement.clone(),
                });
            }

            sampled_stats.merge(&DeidentifyStatistics::from_changes(
                &applied,
                warnings,
                subject_hash,
                0,
            ));
        }

        let factor = if sampled_files == 0 {
            0.0
        } else {
            total_files as f64 / sampled_files as f64
        };

        Ok(PreviewReport {
            total_files,
            sampled_files,
            changes,
            truncated,
            extrapolated_statistics: sampled_stats.extrapolate(factor),
        })
    }

    /// Process one file inside a worker (blocking context)
    fn process_one(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> Result<(DeidentifyResult, Option<QuasiRecord>)> {
        let content = read_input_file(input)?;
        let file_name = input.file_name().ok_or_else(|| {
            VeilError::Input(format!("Input path has no file name: {}", input.display()))
        })?;
        self.process_content(
            &input.display().to_string(),
            &content,
            Some(output_dir.join(file_name)),
        )
    }

    /// The per-item pipeline: scan, anonymize, validate, verify
    fn process_content(
        &self,
        source: &str,
        content: &str,
        output_path: Option<PathBuf>,
    ) -> Result<(DeidentifyResult, Option<QuasiRecord>)> {
        let started_at = Utc::now();
        let start = Instant::now();

        let mut message = Hl7Message::parse(content);
        if message.is_empty() {
            return Err(VeilError::Input(format!("Empty input: {source}")));
        }

        let findings = self.scanner.scan(&message);
        let warnings: Vec<String> = findings
            .iter()
            .filter(|f| f.is_warning())
            .map(|f| format!("Malformed segment reported at {}", f.location))
            .collect();
        let subject_hash =
            extract_subject_id(&message).map(|s| self.store.hash_original(&s));

        let mut input_by_category: BTreeMap<IdentifierCategory, usize> = BTreeMap::new();
        for finding in findings.iter().filter(|f| !f.is_warning()) {
            *input_by_category.entry(finding.category).or_insert(0) += 1;
        }

        // Classification errors fail the item here; the batch continues.
        let applied = self
            .engine
            .apply(&mut message, &findings, &self.store)
            .map_err(VeilError::Deidentify)?;

        let transformed = message.render();
        let validation = self.scanner.validate(
            &transformed,
            self.options.validation_threshold,
            Some(self.store.as_ref()),
        );
        if !validation.passed_validation {
            tracing::warn!(
                source = %source,
                residual = validation.residual_findings.len(),
                "Residual findings detected after transformation"
            );
        }

        let compliance = self.validator.verify(&input_by_category, &validation);
        let quasi = {
            let record = QuasiRecord::from_message(&message);
            (!record.is_empty()).then_some(record)
        };

        let transformed_content = match output_path {
            Some(ref path) => {
                std::fs::write(path, &transformed).map_err(|e| {
                    VeilError::Io(format!("Failed to write {}: {e}", path.display()))
                })?;
                None
            }
            None => Some(transformed),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let statistics = DeidentifyStatistics::from_changes(
            &applied,
            warnings.len(),
            subject_hash,
            duration_ms,
        );

        tracing::debug!(
            source = %source,
            identifiers = statistics.identifiers_processed,
            fields_modified = statistics.fields_modified,
            compliance = %compliance.status,
            "Item processed"
        );

        Ok((
            DeidentifyResult {
                source: source.to_string(),
                output_path,
                transformed_content,
                statistics,
                ledger: applied.ledger,
                validation,
                compliance,
                warnings,
                metadata: ProcessingMetadata::new(started_at, duration_ms),
            },
            quasi,
        ))
    }

}

// Workers share the scanner, engine, and session store; only the
// validator is rebuilt (it holds no state beyond the options).
impl Clone for BatchOrchestrator {
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
            scanner: Arc::clone(&self.scanner),
            engine: Arc::clone(&self.engine),
            validator: ComplianceValidator::new(self.options.clone()),
            store: Arc::clone(&self.store),
            shutdown: self.shutdown.clone(),
        }
    }
}

/// Enumerate eligible input files under a directory, sorted for
/// deterministic dispatch order
fn enumerate_input_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("hl7") | Some("txt")
            )
        })
        .collect();
    files.sort();
    files
}

fn read_input_file(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(VeilError::Input(format!(
            "Input file not found: {}",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| VeilError::Input(format!("Failed to read {}: {e}", path.display())))?;
    if content.trim().is_empty() {
        return Err(VeilError::Input(format!(
            "Input file is empty: {}",
            path.display()
        )));
    }
    Ok(content)
}

fn ensure_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        VeilError::Io(format!(
            "Failed to create output directory {}: {e}",
            dir.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deidentify::compliance::ComplianceStatus;

    const MESSAGE_A: &str = "MSH|^~\\&|SEND|FAC|RECV|FAC|20240115103000||ADT^A01|MSG001|P|2.5\rPID|1||MR000123||SMITH^JOHN||19850315|M||||||||||ACCT9988|123-45-6789\r";
    const MESSAGE_B: &str = "MSH|^~\\&|SEND|FAC|RECV|FAC|20240116090000||ORU^R01|MSG002|P|2.5\rPID|1||MR000123||SMITH^JOHN||19850315|M\rOBR|1|||CBC|||20240116083000\r";

    fn orchestrator(options: DeidentifyOptions) -> BatchOrchestrator {
        let (_tx, rx) = watch::channel(false);
        BatchOrchestrator::new(options, rx).unwrap()
    }

    fn salted_options() -> DeidentifyOptions {
        DeidentifyOptions {
            salt: Some("test-salt".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_process_file_transforms_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.hl7");
        std::fs::write(&input, MESSAGE_A).unwrap();
        let out_dir = dir.path().join("out");

        let orch = orchestrator(salted_options());
        let result = orch.process_file(&input, Some(&out_dir)).await.unwrap();

        let written = std::fs::read_to_string(out_dir.join("a.hl7")).unwrap();
        assert!(!written.contains("SMITH^JOHN"));
        assert!(!written.contains("123-45-6789"));
        assert!(result.validation.passed_validation);
        assert_eq!(result.compliance.status, ComplianceStatus::Compliant);
        assert_eq!(result.statistics.items_processed, 1);
    }

    #[tokio::test]
    async fn test_process_file_keeps_content_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.hl7");
        std::fs::write(&input, MESSAGE_A).unwrap();

        let orch = orchestrator(salted_options());
        let result = orch.process_file(&input, None).await.unwrap();
        let content = result.transformed_content.unwrap();
        assert!(!content.contains("SMITH^JOHN"));
    }

    #[tokio::test]
    async fn test_missing_input_is_input_error() {
        let orch = orchestrator(salted_options());
        let err = orch
            .process_file(Path::new("/nonexistent/x.hl7"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, VeilError::Input(_)));
    }

    #[tokio::test]
    async fn test_batch_shares_session_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let in_dir = dir.path().join("in");
        std::fs::create_dir_all(&in_dir).unwrap();
        std::fs::write(in_dir.join("a.hl7"), MESSAGE_A).unwrap();
        std::fs::write(in_dir.join("b.hl7"), MESSAGE_B).unwrap();
        let out_dir = dir.path().join("out");

        let orch = orchestrator(salted_options());
        let batch = orch.process_directory(&in_dir, &out_dir).await.unwrap();

        assert_eq!(batch.items.len(), 2);
        assert_eq!(batch.successes(), 2);

        // Same MRN in both files must map to the identical replacement
        let a = std::fs::read_to_string(out_dir.join("a.hl7")).unwrap();
        let b = std::fs::read_to_string(out_dir.join("b.hl7")).unwrap();
        let mrn_of = |content: &str| {
            content
                .lines()
                .find(|l| l.starts_with("PID"))
                .unwrap()
                .split('|')
                .nth(3)
                .unwrap()
                .to_string()
        };
        assert_eq!(mrn_of(&a), mrn_of(&b));
        assert_ne!(mrn_of(&a), "MR000123");
        // Both files share one subject
        assert_eq!(batch.statistics.unique_subjects(), 1);
    }

    #[tokio::test]
    async fn test_batch_partial_failure_resilience() {
        let dir = tempfile::tempdir().unwrap();
        let in_dir = dir.path().join("in");
        std::fs::create_dir_all(&in_dir).unwrap();
        std::fs::write(in_dir.join("good.hl7"), MESSAGE_A).unwrap();
        std::fs::write(in_dir.join("empty.hl7"), "   ").unwrap();
        let out_dir = dir.path().join("out");

        let orch = orchestrator(salted_options());
        let batch = orch.process_directory(&in_dir, &out_dir).await.unwrap();

        assert_eq!(batch.items.len(), 2);
        assert_eq!(batch.successes(), 1);
        assert_eq!(batch.failures(), 1);
        assert_eq!(batch.items.len(), batch.successes() + batch.failures());
        // Failed item contributes only its failure record, not statistics
        assert_eq!(batch.statistics.items_processed, 1);
        assert!(out_dir.join("good.hl7").exists());
    }

    #[tokio::test]
    async fn test_batch_statistics_additivity() {
        let dir = tempfile::tempdir().unwrap();
        let in_dir = dir.path().join("in");
        std::fs::create_dir_all(&in_dir).unwrap();
        std::fs::write(in_dir.join("a.hl7"), MESSAGE_A).unwrap();
        std::fs::write(in_dir.join("b.hl7"), MESSAGE_B).unwrap();
        let out_dir = dir.path().join("out");

        let orch = orchestrator(salted_options());
        let batch = orch.process_directory(&in_dir, &out_dir).await.unwrap();

        let mut expected = DeidentifyStatistics::default();
        for item in &batch.items {
            if let ItemOutcome::Success { ref result } = item.outcome {
                expected.merge(&result.statistics);
            }
        }
        assert_eq!(
            batch.statistics.identifiers_processed,
            expected.identifiers_processed
        );
        assert_eq!(batch.statistics.by_category, expected.by_category);
        assert_eq!(batch.statistics.fields_modified, expected.fields_modified);
    }

    #[tokio::test]
    async fn test_cancellation_stops_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let in_dir = dir.path().join("in");
        std::fs::create_dir_all(&in_dir).unwrap();
        for i in 0..8 {
            std::fs::write(in_dir.join(format!("m{i}.hl7")), MESSAGE_A).unwrap();
        }
        let out_dir = dir.path().join("out");

        let (tx, rx) = watch::channel(false);
        let orch = BatchOrchestrator::new(salted_options(), rx).unwrap();
        // Cancel before dispatch begins
        tx.send(true).unwrap();

        let batch = orch.process_directory(&in_dir, &out_dir).await.unwrap();
        assert!(batch.cancelled);
        assert!(batch.items.is_empty());
    }

    #[tokio::test]
    async fn test_preview_writes_nothing_and_redacts_originals() {
        let dir = tempfile::tempdir().unwrap();
        let in_dir = dir.path().join("in");
        std::fs::create_dir_all(&in_dir).unwrap();
        std::fs::write(in_dir.join("a.hl7"), MESSAGE_A).unwrap();

        let orch = orchestrator(salted_options());
        let preview = orch.preview_changes(&in_dir).await.unwrap();

        assert_eq!(preview.total_files, 1);
        assert!(!preview.changes.is_empty());
        // The preview never carries plaintext originals
        let json = serde_json::to_string(&preview).unwrap();
        assert!(!json.contains("SMITH^JOHN"));
        assert!(!json.contains("123-45-6789"));
        // Input untouched, no outputs created
        assert_eq!(
            std::fs::read_to_string(in_dir.join("a.hl7")).unwrap(),
            MESSAGE_A
        );
        // The session store stays clean for a subsequent real run
        assert!(orch.store().is_empty());
    }

    #[tokio::test]
    async fn test_mapping_export_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        let in_dir = dir.path().join("in");
        std::fs::create_dir_all(&in_dir).unwrap();
        std::fs::write(in_dir.join("a.hl7"), MESSAGE_A).unwrap();
        let out_dir = dir.path().join("out");

        let options = DeidentifyOptions {
            export_mappings: true,
            ..salted_options()
        };
        let orch = orchestrator(options);
        orch.process_directory(&in_dir, &out_dir).await.unwrap();

        let export = std::fs::read_to_string(out_dir.join(MAPPING_EXPORT_FILE)).unwrap();
        assert!(!export.contains("MR000123"));
        assert!(export.contains("original_hash"));
    }
}
