//! Rendering run reports: human-readable text, JSON and JUnit XML.

use crate::case::Verdict;
use crate::runner::RunReport;
use std::borrow::Cow;
use std::fmt::Write as _;
use std::io::{self, Write};
use thiserror::Error;

/// Default number of characters of captured output shown per failure.
pub const DEFAULT_TRUNCATE: usize = 200;

/// Appended to diagnostics that were cut short.
pub const TRUNCATION_MARKER: &str = "...";

const BANNER_WIDTH: usize = 60;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(
        "report totals ({passed} passed, {failed} failed) do not match the per-category sums ({category_passed} passed, {category_failed} failed)"
    )]
    TotalsMismatch {
        passed: usize,
        failed: usize,
        category_passed: usize,
        category_failed: usize,
    },
    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Cut `text` to at most `max` characters, appending the truncation marker
/// when anything was removed.
pub fn truncate(text: &str, max: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max) {
        None => Cow::Borrowed(text),
        Some((cut, _)) => Cow::Owned(format!("{}{TRUNCATION_MARKER}", &text[..cut])),
    }
}

/// Renders a [`RunReport`] in one of the supported formats.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    truncate_at: usize,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(DEFAULT_TRUNCATE)
    }
}

impl Reporter {
    pub fn new(truncate_at: usize) -> Self {
        Self { truncate_at }
    }

    /// Category-grouped pass/fail lines followed by a summary.
    pub fn human(&self, report: &RunReport, out: &mut dyn Write) -> Result<(), ReportError> {
        report.verify_totals()?;

        if let Some(setup) = report.setup_error() {
            writeln!(out, "Error: {setup}")?;
            writeln!(out, "No test cases were run.")?;
            return Ok(());
        }

        let banner = "=".repeat(BANNER_WIDTH);
        for category in report.categories() {
            writeln!(out, "\n{banner}")?;
            writeln!(out, "{}", category.name)?;
            writeln!(out, "{banner}")?;

            for case in &category.cases {
                match &case.verdict {
                    Verdict::Pass => writeln!(out, "  [PASS] {}", case.name)?,
                    Verdict::Fail { expected, actual } => {
                        writeln!(out, "  [FAIL] {}", case.name)?;
                        if let Some(expected) = expected {
                            writeln!(out, "      Expected: {expected}")?;
                        }
                        if let Some(actual) = actual {
                            writeln!(out, "      Actual: {}", truncate(actual, self.truncate_at))?;
                        }
                    }
                    Verdict::Errored { message } => {
                        writeln!(out, "  [FAIL] {}", case.name)?;
                        writeln!(out, "      Error: {}", truncate(message, self.truncate_at))?;
                    }
                }
            }
        }

        writeln!(out, "\n{banner}")?;
        writeln!(out, "SUMMARY")?;
        writeln!(out, "{banner}")?;
        writeln!(out, "  Total:  {}", report.total())?;
        writeln!(out, "  Passed: {}", report.passed())?;
        writeln!(out, "  Failed: {}", report.failed())?;

        if report.success() {
            writeln!(out, "\nAll tests passed!")?;
        } else {
            writeln!(out, "\nSome tests failed. Please review the output above.")?;
        }
        Ok(())
    }

    /// Machine-readable JSON. Captured output is kept whole.
    pub fn json(&self, report: &RunReport) -> Result<String, ReportError> {
        report.verify_totals()?;

        let categories: Vec<_> = report
            .categories()
            .iter()
            .map(|category| {
                serde_json::json!({
                    "name": category.name,
                    "passed": category.passed(),
                    "failed": category.failed(),
                    "cases": category.cases,
                })
            })
            .collect();

        let output = serde_json::json!({
            "started_at": report.started_at().to_rfc3339(),
            "passed": report.passed(),
            "failed": report.failed(),
            "total": report.total(),
            "setup_error": report.setup_error(),
            "categories": categories,
        });
        Ok(serde_json::to_string_pretty(&output)?)
    }

    /// JUnit XML for CI systems: one `<testsuite>` per category.
    pub fn junit(&self, report: &RunReport) -> Result<String, ReportError> {
        report.verify_totals()?;

        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

        let total_time: f64 = report
            .categories()
            .iter()
            .flat_map(|c| &c.cases)
            .map(|c| c.duration.as_secs_f64())
            .sum();
        let total_errors = report
            .categories()
            .iter()
            .flat_map(|c| &c.cases)
            .filter(|c| matches!(c.verdict, Verdict::Errored { .. }))
            .count();
        // A run that never started shows up as one failed pseudo-suite.
        let setup_failures = usize::from(report.setup_error().is_some());

        let _ = writeln!(
            xml,
            "<testsuites tests=\"{}\" failures=\"{}\" errors=\"{total_errors}\" time=\"{total_time:.3}\" timestamp=\"{}\">",
            report.total() + setup_failures,
            report.failed() - total_errors + setup_failures,
            report.started_at().format("%Y-%m-%dT%H:%M:%S"),
        );

        if let Some(setup) = report.setup_error() {
            xml.push_str("  <testsuite name=\"setup\" tests=\"1\" failures=\"1\" errors=\"0\">\n");
            xml.push_str("    <testcase name=\"&lt;setup&gt;\">\n");
            let _ = writeln!(xml, "      <failure message=\"{}\"/>", escape_xml(setup));
            xml.push_str("    </testcase>\n");
            xml.push_str("  </testsuite>\n");
        }

        for category in report.categories() {
            let errors = category
                .cases
                .iter()
                .filter(|c| matches!(c.verdict, Verdict::Errored { .. }))
                .count();
            let time: f64 = category.cases.iter().map(|c| c.duration.as_secs_f64()).sum();
            let _ = writeln!(
                xml,
                "  <testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"{errors}\" time=\"{time:.3}\">",
                escape_xml(&category.name),
                category.cases.len(),
                category.failed() - errors,
            );

            for case in &category.cases {
                let _ = writeln!(
                    xml,
                    "    <testcase name=\"{}\" classname=\"{}\" time=\"{:.3}\">",
                    escape_xml(&case.name),
                    escape_xml(&category.name),
                    case.duration.as_secs_f64()
                );
                match &case.verdict {
                    Verdict::Pass => {}
                    Verdict::Fail { expected, actual } => {
                        let message = expected.as_deref().unwrap_or("assertion failed");
                        let _ = writeln!(
                            xml,
                            "      <failure message=\"{}\">",
                            escape_xml(&format!("expected: {message}"))
                        );
                        if let Some(actual) = actual {
                            let _ = writeln!(xml, "{}", escape_xml(actual));
                        }
                        xml.push_str("      </failure>\n");
                    }
                    Verdict::Errored { message } => {
                        let _ = writeln!(
                            xml,
                            "      <error message=\"{}\"/>",
                            escape_xml(message)
                        );
                    }
                }
                xml.push_str("    </testcase>\n");
            }

            xml.push_str("  </testsuite>\n");
        }

        xml.push_str("</testsuites>\n");
        Ok(xml)
    }
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
