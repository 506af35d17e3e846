//! Audit reporting
//!
//! Renders completed de-identification results into durable, reviewable
//! artifacts: a processing summary, the compliance checklist, per-category
//! identifier counts, and (on request) the field-level change ledger.
//! Rendering is a pure function of the result; detection never re-runs
//! here. Ledger entries carry only SHA-256 hashes of original values, so
//! no report format can leak plaintext PHI.

use crate::core::batch::result::{BatchDeidentifyResult, ItemOutcome};
use crate::domain::{Result, VeilError};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Self-contained HTML document
    Html,
    /// Pretty-printed JSON
    Json,
    /// Comma-separated tables
    Csv,
    /// XML document
    Xml,
    /// Degrades to HTML with a note
    Pdf,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "xml" => Ok(Self::Xml),
            "pdf" => Ok(Self::Pdf),
            other => Err(format!("Unknown report format: {other}")),
        }
    }
}

/// A rendered report artifact
#[derive(Debug, Clone)]
pub struct RenderedReport {
    /// Rendered content
    pub content: String,
    /// Format actually produced (PDF requests produce HTML)
    pub format: ReportFormat,
    /// Degradation note, when the requested format wasn't available
    pub note: Option<String>,
}

impl RenderedReport {
    /// Conventional file extension for the produced format
    pub fn extension(&self) -> &'static str {
        match self.format {
            ReportFormat::Html | ReportFormat::Pdf => "html",
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
            ReportFormat::Xml => "xml",
        }
    }
}

/// JSON document shape shared by the structured formats
#[derive(Debug, Serialize)]
struct ReportDocument<'a> {
    batch: &'a BatchDeidentifyResult,
    successes: usize,
    failures: usize,
    include_ledger: bool,
}

/// Audit reporter
///
/// `include_ledger` controls whether the field-level change ledger is
/// rendered; it defaults to off, keeping reports at summary level.
pub struct AuditReporter {
    include_ledger: bool,
}

impl AuditReporter {
    /// Reporter with ledger rendering disabled
    pub fn new() -> Self {
        Self {
            include_ledger: false,
        }
    }

    /// Enable the field-level change ledger in rendered output
    pub fn with_ledger(mut self) -> Self {
        self.include_ledger = true;
        self
    }

    /// Render a batch result in the requested format
    pub fn render(
        &self,
        batch: &BatchDeidentifyResult,
        format: ReportFormat,
    ) -> Result<RenderedReport> {
        match format {
            ReportFormat::Json => Ok(RenderedReport {
                content: self.render_json(batch)?,
                format,
                note: None,
            }),
            ReportFormat::Csv => Ok(RenderedReport {
                content: self.render_csv(batch),
                format,
                note: None,
            }),
            ReportFormat::Xml => Ok(RenderedReport {
                content: self.render_xml(batch),
                format,
                note: None,
            }),
            ReportFormat::Html => Ok(RenderedReport {
                content: self.render_html(batch),
                format,
                note: None,
            }),
            ReportFormat::Pdf => Ok(RenderedReport {
                content: self.render_html(batch),
                format: ReportFormat::Pdf,
                note: Some(
                    "PDF rendering is not available; an HTML report was produced instead"
                        .to_string(),
                ),
            }),
        }
    }

    fn render_json(&self, batch: &BatchDeidentifyResult) -> Result<String> {
        let document = ReportDocument {
            batch,
            successes: batch.successes(),
            failures: batch.failures(),
            include_ledger: self.include_ledger,
        };
        serde_json::to_string_pretty(&document).map_err(VeilError::from)
    }

    fn render_csv(&self, batch: &BatchDeidentifyResult) -> String {
        let mut out = String::new();
        out.push_str("source,status,identifiers,fields_modified,dates_shifted,compliance\n");
        for item in &batch.items {
            match &item.outcome {
                ItemOutcome::Success { result } => {
                    let _ = writeln!(
                        out,
                        "{},success,{},{},{},{}",
                        csv_escape(&item.source),
                        result.statistics.identifiers_processed,
                        result.statistics.fields_modified,
                        result.statistics.dates_shifted,
                        result.compliance.status
                    );
                }
                ItemOutcome::Failed { error } => {
                    let _ = writeln!(
                        out,
                        "{},failed:{},0,0,0,unknown",
                        csv_escape(&item.source),
                        csv_escape(error)
                    );
                }
            }
        }

        out.push('\n');
        out.push_str("category,safe_harbor_number,count,satisfied\n");
        for (category, satisfied) in &batch.compliance.checklist {
            let count = batch
                .statistics
                .by_category
                .get(category)
                .copied()
                .unwrap_or(0);
            let _ = writeln!(
                out,
                "{},{},{},{}",
                category.label(),
                category.safe_harbor_number(),
                count,
                satisfied
            );
        }

        if self.include_ledger {
            out.push('\n');
            out.push_str("item,location,category,action,original_hash,replacement\n");
            for item in &batch.items {
                if let ItemOutcome::Success { result } = &item.outcome {
                    for entry in &result.ledger {
                        let _ = writeln!(
                            out,
                            "{},{},{},{:?},{},{}",
                            csv_escape(&item.source),
                            entry.location,
                            entry.category.label(),
                            entry.action,
                            entry.original_hash,
                            csv_escape(entry.replacement.as_deref().unwrap_or(""))
                        );
                    }
                }
            }
        }

        out
    }

    fn render_xml(&self, batch: &BatchDeidentifyResult) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(
            out,
            "<deidentification_report batch_id=\"{}\" session_id=\"{}\">",
            batch.batch_id, batch.session_id
        );
        let _ = writeln!(
            out,
            "  <summary items=\"{}\" successes=\"{}\" failures=\"{}\" identifiers=\"{}\" unique_subjects=\"{}\" cancelled=\"{}\" duration_ms=\"{}\"/>",
            batch.items.len(),
            batch.successes(),
            batch.failures(),
            batch.statistics.identifiers_processed,
            batch.statistics.unique_subjects(),
            batch.cancelled,
            batch.metadata.duration_ms
        );
        let _ = writeln!(
            out,
            "  <compliance status=\"{}\">",
            batch.compliance.status
        );
        for (category, satisfied) in &batch.compliance.checklist {
            let _ = writeln!(
                out,
                "    <entry category=\"{}\" safe_harbor_number=\"{}\" satisfied=\"{}\"/>",
                category.label(),
                category.safe_harbor_number(),
                satisfied
            );
        }
        for finding in &batch.compliance.findings {
            let _ = writeln!(out, "    <finding>{}</finding>", xml_escape(finding));
        }
        out.push_str("  </compliance>\n");

        out.push_str("  <categories>\n");
        for (category, count) in &batch.statistics.by_category {
            let _ = writeln!(
                out,
                "    <category name=\"{}\" count=\"{}\"/>",
                category.label(),
                count
            );
        }
        out.push_str("  </categories>\n");

        if self.include_ledger {
            out.push_str("  <ledger>\n");
            for item in &batch.items {
                if let ItemOutcome::Success { result } = &item.outcome {
                    for entry in &result.ledger {
                        let _ = writeln!(
                            out,
                            "    <change item=\"{}\" location=\"{}\" category=\"{}\" action=\"{:?}\" original_hash=\"{}\"/>",
                            xml_escape(&item.source),
                            entry.location,
                            entry.category.label(),
                            entry.action,
                            entry.original_hash
                        );
                    }
                }
            }
            out.push_str("  </ledger>\n");
        }

        out.push_str("</deidentification_report>\n");
        out
    }

    fn render_html(&self, batch: &BatchDeidentifyResult) -> String {
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        out.push_str("<meta charset=\"utf-8\">\n<title>De-identification Report</title>\n");
        out.push_str("<style>body{font-family:sans-serif;margin:2em}table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:4px 8px}th{background:#f0f0f0}.pass{color:#080}.fail{color:#b00}</style>\n");
        out.push_str("</head>\n<body>\n");
        let _ = writeln!(out, "<h1>De-identification Report</h1>");
        let _ = writeln!(
            out,
            "<p>Batch <code>{}</code> &middot; session <code>{}</code> &middot; {}</p>",
            batch.batch_id,
            batch.session_id,
            batch.metadata.started_at.to_rfc3339()
        );

        let _ = writeln!(out, "<h2>Processing Summary</h2>\n<ul>");
        let _ = writeln!(out, "<li>Items: {}</li>", batch.items.len());
        let _ = writeln!(out, "<li>Successes: {}</li>", batch.successes());
        let _ = writeln!(out, "<li>Failures: {}</li>", batch.failures());
        let _ = writeln!(
            out,
            "<li>Identifiers processed: {}</li>",
            batch.statistics.identifiers_processed
        );
        let _ = writeln!(
            out,
            "<li>Fields modified: {}</li>",
            batch.statistics.fields_modified
        );
        let _ = writeln!(
            out,
            "<li>Dates shifted: {}</li>",
            batch.statistics.dates_shifted
        );
        let _ = writeln!(
            out,
            "<li>Unique subjects: {}</li>",
            batch.statistics.unique_subjects()
        );
        let _ = writeln!(
            out,
            "<li>Duration: {} ms</li>",
            batch.metadata.duration_ms
        );
        if batch.cancelled {
            let _ = writeln!(out, "<li><strong>Batch was cancelled mid-run</strong></li>");
        }
        out.push_str("</ul>\n");

        let _ = writeln!(
            out,
            "<h2>Compliance Checklist ({})</h2>",
            batch.compliance.status
        );
        out.push_str("<table>\n<tr><th>Category</th><th>Safe Harbor #</th><th>Occurrences</th><th>Satisfied</th></tr>\n");
        for (category, satisfied) in &batch.compliance.checklist {
            let count = batch
                .statistics
                .by_category
                .get(category)
                .copied()
                .unwrap_or(0);
            let (class, text) = if *satisfied {
                ("pass", "yes")
            } else {
                ("fail", "NO")
            };
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"{}\">{}</td></tr>",
                category.label(),
                category.safe_harbor_number(),
                count,
                class,
                text
            );
        }
        out.push_str("</table>\n");

        if !batch.compliance.findings.is_empty() {
            out.push_str("<h3>Findings</h3>\n<ul>\n");
            for finding in &batch.compliance.findings {
                let _ = writeln!(out, "<li>{}</li>", html_escape(finding));
            }
            out.push_str("</ul>\n");
        }

        if let Some(ref risk) = batch.compliance.risk {
            out.push_str("<h2>Risk Estimate (advisory)</h2>\n<ul>\n");
            let _ = writeln!(out, "<li>Risk score: {:.3}</li>", risk.risk_score);
            let _ = writeln!(
                out,
                "<li>Equivalence classes: {}</li>",
                risk.equivalence_classes
            );
            let _ = writeln!(
                out,
                "<li>Smallest class size: {}</li>",
                risk.smallest_class_size
            );
            let _ = writeln!(out, "<li>{}</li>", html_escape(&risk.advisory));
            out.push_str("</ul>\n");
        }

        if self.include_ledger {
            out.push_str("<h2>Change Ledger</h2>\n");
            out.push_str("<table>\n<tr><th>Item</th><th>Location</th><th>Category</th><th>Action</th><th>Original (SHA-256)</th></tr>\n");
            for item in &batch.items {
                if let ItemOutcome::Success { result } = &item.outcome {
                    for entry in &result.ledger {
                        let _ = writeln!(
                            out,
                            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:?}</td><td><code>{}</code></td></tr>",
                            html_escape(&item.source),
                            entry.location,
                            entry.category.label(),
                            entry.action,
                            &entry.original_hash[..16.min(entry.original_hash.len())]
                        );
                    }
                }
            }
            out.push_str("</table>\n");
        }

        out.push_str("</body>\n</html>\n");
        out
    }
}

impl Default for AuditReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn xml_escape(value: &str) -> String {
    html_escape(value).replace('"', "&quot;")
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
