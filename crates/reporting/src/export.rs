//! Report serialization: JSON, CSV, HTML and JUnit XML.

use std::fmt::Write as _;
use std::str::FromStr;

use tracing::info;
use webprobe_core::{EngineError, EngineResult, ExecutionStatus};

use crate::performance::PerformanceReport;
use crate::record::RunRecord;

pub const CSV_HEADER: [&str; 5] = ["Test Name", "Status", "Duration (ms)", "Errors", "Timestamp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Html,
    Junit,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Html => "html",
            Self::Junit => "xml",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "html" => Ok(Self::Html),
            "junit" => Ok(Self::Junit),
            _ => Err(EngineError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Render `report` in the named format.
pub fn export(report: &PerformanceReport, format: &str) -> EngineResult<String> {
    let format: ExportFormat = format.parse()?;
    let output = match format {
        ExportFormat::Json => serde_json::to_string_pretty(report)?,
        ExportFormat::Csv => to_csv(report),
        ExportFormat::Html => to_html(report),
        ExportFormat::Junit => to_junit(report),
    };
    info!(
        format = format.extension(),
        results = report.test_results.len(),
        bytes = output.len(),
        "Report exported"
    );
    Ok(output)
}

fn csv_row<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|f| format!("\"{}\"", f.as_ref().replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}

/// One row per leaf (test case or step), every field quoted.
pub fn to_csv(report: &PerformanceReport) -> String {
    let mut rows = vec![csv_row(CSV_HEADER)];
    for record in &report.test_results {
        for leaf in record.leaves() {
            rows.push(csv_row([
                leaf.name,
                leaf.status.to_string(),
                leaf.timing.duration_ms.to_string(),
                leaf.errors,
                report
                    .wall_time(leaf.timing.start_ms)
                    .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            ]));
        }
    }
    rows.join("\n")
}

/// Escape text for XML/HTML content and attribute values.
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

fn seconds(ms: u64) -> String {
    format!("{:.3}", ms as f64 / 1000.0)
}

/// Each run becomes a `<testsuite>`; its leaves become `<testcase>`s.
pub fn to_junit(report: &PerformanceReport) -> String {
    let total_tests: usize = report.test_results.iter().map(|r| r.leaves().len()).sum();
    let total_failures: usize = report
        .test_results
        .iter()
        .map(|r| r.leaves().iter().filter(|l| l.is_failed()).count())
        .sum();
    let total_ms: u64 = report
        .test_results
        .iter()
        .map(|r| r.timing().duration_ms)
        .sum();

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        xml,
        "<testsuites name=\"webprobe\" tests=\"{total_tests}\" failures=\"{total_failures}\" time=\"{}\">",
        seconds(total_ms)
    );

    for record in &report.test_results {
        let leaves = record.leaves();
        let failures = leaves.iter().filter(|l| l.is_failed()).count();
        let suite = escape_markup(record.title());
        let _ = writeln!(
            xml,
            "  <testsuite name=\"{suite}\" tests=\"{}\" failures=\"{failures}\" time=\"{}\">",
            leaves.len(),
            seconds(record.timing().duration_ms)
        );
        for leaf in &leaves {
            let _ = writeln!(
                xml,
                "    <testcase name=\"{}\" classname=\"{suite}\" time=\"{}\">",
                escape_markup(&leaf.name),
                seconds(leaf.timing.duration_ms)
            );
            if leaf.is_failed() {
                let message = if leaf.errors.is_empty() {
                    "Test failed"
                } else {
                    leaf.errors.as_str()
                };
                let _ = writeln!(xml, "      <failure message=\"{}\"></failure>", escape_markup(message));
            }
            xml.push_str("    </testcase>\n");
        }
        xml.push_str("  </testsuite>\n");
    }

    xml.push_str("</testsuites>");
    xml
}

const HTML_STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 20px; }
.header { text-align: center; margin-bottom: 30px; }
.section { margin: 20px 0; }
.test-result { margin: 10px 0; padding: 10px; border-left: 4px solid #ccc; }
.status-completed { border-left-color: #4CAF50; }
.status-failed { border-left-color: #f44336; }
table { width: 100%; border-collapse: collapse; margin: 15px 0; }
th, td { padding: 10px; text-align: left; border-bottom: 1px solid #ddd; }
th { background-color: #f2f2f2; }
.metrics { display: flex; justify-content: space-around; margin: 20px 0; }
.metric { text-align: center; padding: 15px; background: #f8f9fa; border-radius: 5px; }";

/// Self-contained HTML summary with per-run breakdown.
pub fn to_html(report: &PerformanceReport) -> String {
    let results = &report.test_results;
    let completed = results
        .iter()
        .filter(|r| r.status() == ExecutionStatus::Completed)
        .count();
    let failed = results
        .iter()
        .filter(|r| r.status() == ExecutionStatus::Failed)
        .count();
    let stats = &report.network_stats;

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>webprobe test report</title>\n");
    let _ = writeln!(html, "<style>\n{HTML_STYLE}\n</style>\n</head>\n<body>");
    let _ = writeln!(
        html,
        "<div class=\"header\"><h1>webprobe test report</h1><p>Generated: {}</p></div>",
        report.generated_at.to_rfc3339()
    );

    html.push_str("<div class=\"metrics\">\n");
    for (value, label) in [
        (results.len().to_string(), "Total Runs"),
        (completed.to_string(), "Completed"),
        (failed.to_string(), "Failed"),
        (format!("{:.0}ms", report.summary.average_duration), "Avg Step Duration"),
        (format!("{:.0}ms", stats.average_duration), "Avg Response Time"),
    ] {
        let _ = writeln!(html, "<div class=\"metric\"><h3>{value}</h3><p>{label}</p></div>");
    }
    html.push_str("</div>\n");

    html.push_str("<div class=\"section\">\n<h2>Test Results</h2>\n");
    for record in results {
        write_record(&mut html, record);
    }
    html.push_str("</div>\n");

    html.push_str("<div class=\"section\">\n<h2>Network Performance</h2>\n<table>\n");
    html.push_str("<tr><th>Metric</th><th>Value</th></tr>\n");
    for (label, value) in [
        ("Total Requests", stats.total.to_string()),
        ("Successful", stats.successful.to_string()),
        ("Failed", stats.failed.to_string()),
        ("Average Response Time", format!("{:.0}ms", stats.average_duration)),
    ] {
        let _ = writeln!(html, "<tr><td>{label}</td><td>{value}</td></tr>");
    }
    html.push_str("</table>\n</div>\n</body>\n</html>\n");
    html
}

fn write_record(html: &mut String, record: &RunRecord) {
    let status = record.status();
    let _ = writeln!(html, "<div class=\"test-result status-{status}\">");
    let _ = writeln!(
        html,
        "<h3>{} <small>({})</small></h3>",
        escape_markup(record.title()),
        record.kind()
    );
    let _ = writeln!(html, "<p><strong>Status:</strong> {status}</p>");
    let _ = writeln!(
        html,
        "<p><strong>Duration:</strong> {}ms</p>",
        record.timing().duration_ms
    );
    let errors = record.errors();
    if !errors.is_empty() {
        let _ = writeln!(
            html,
            "<p><strong>Errors:</strong> {}</p>",
            escape_markup(&errors.join(", "))
        );
    }

    let leaves = record.leaves();
    if !leaves.is_empty() {
        html.push_str("<table>\n<tr><th>Name</th><th>Status</th><th>Duration (ms)</th><th>Errors</th></tr>\n");
        for leaf in leaves {
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_markup(&leaf.name),
                leaf.status,
                leaf.timing.duration_ms,
                escape_markup(&leaf.errors)
            );
        }
        html.push_str("</table>\n");
    }
    html.push_str("</div>\n");
}
