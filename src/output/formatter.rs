//! Output formatters for run summaries
//!
//! Provides JSON, Table, CSV and summary output formats.

use std::io::Write;

use crate::models::{NodeResult, NodeStatus, RunSummary};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Format a single node result
    pub fn format_result(&self, result: &NodeResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string(result).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Csv => self.format_result_csv(result),
            _ => self.format_result_line(result),
        }
    }

    fn format_result_line(&self, result: &NodeResult) -> String {
        let status_str = if self.colorize {
            match result.status {
                NodeStatus::Passed => "\x1b[32m✓ PASS\x1b[0m",
                NodeStatus::Failed => "\x1b[31m✗ FAIL\x1b[0m",
                NodeStatus::Skipped => "\x1b[33m○ SKIP\x1b[0m",
            }
        } else {
            match result.status {
                NodeStatus::Passed => "✓ PASS",
                NodeStatus::Failed => "✗ FAIL",
                NodeStatus::Skipped => "○ SKIP",
            }
        };

        let mut line = format!(
            "{:40} {} [{:>6}ms]",
            result.path, status_str, result.duration_ms
        );
        if let Some(msg) = &result.message {
            line.push_str(&format!(" - {msg}"));
        }
        line
    }

    fn format_result_csv(&self, result: &NodeResult) -> String {
        format!(
            "\"{}\",{},{},\"{}\"",
            result.path.replace('"', "\"\""),
            result.status,
            result.duration_ms,
            result.message.as_deref().unwrap_or("").replace('"', "\"\"")
        )
    }

    /// Format a whole run summary
    pub fn format_summary(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Table => self.format_summary_table(summary),
            OutputFormat::Json => serde_json::to_string(summary).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(summary).unwrap_or_default(),
            OutputFormat::Csv => self.format_summary_csv(summary),
            OutputFormat::Summary => self.format_summary_brief(summary),
        }
    }

    fn format_summary_table(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        output.push_str("\n══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(" Run: {}\n", summary.name));
        output.push_str("──────────────────────────────────────────────────────────────\n");

        for result in &summary.results {
            output.push_str(&format!(" {}\n", self.format_result_line(result)));
        }

        output.push_str("──────────────────────────────────────────────────────────────\n");

        let pass_str = if self.colorize {
            format!("\x1b[32m{}\x1b[0m", summary.passed)
        } else {
            summary.passed.to_string()
        };
        let fail_str = if self.colorize && summary.failed > 0 {
            format!("\x1b[31m{}\x1b[0m", summary.failed)
        } else {
            summary.failed.to_string()
        };

        output.push_str(&format!(
            " Total: {} | Pass: {} | Fail: {} | Skip: {}\n",
            summary.total, pass_str, fail_str, summary.skipped
        ));
        output.push_str(&format!(
            " Pass Rate: {:.1}% | Duration: {}ms{}\n",
            summary.pass_rate(),
            summary.duration_ms,
            if summary.cancelled { " | CANCELLED" } else { "" }
        ));
        output.push_str("══════════════════════════════════════════════════════════════\n");

        output
    }

    fn format_summary_csv(&self, summary: &RunSummary) -> String {
        let mut output = String::new();
        output.push_str("path,status,duration_ms,message\n");
        for result in &summary.results {
            output.push_str(&self.format_result_csv(result));
            output.push('\n');
        }
        output
    }

    fn format_summary_brief(&self, summary: &RunSummary) -> String {
        format!(
            "{}: {}/{} passed ({:.1}%) in {}ms{}",
            summary.name,
            summary.passed,
            summary.total,
            summary.pass_rate(),
            summary.duration_ms,
            if summary.cancelled { " [cancelled]" } else { "" }
        )
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// Write a formatted summary to a file
pub fn write_summary_to_file(
    path: &str,
    summary: &RunSummary,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let formatter = ResultFormatter::new(format).no_color();
    let content = formatter.format_summary(summary);

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
