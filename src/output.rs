use std::io::{self, Write};

use serde::Serialize;

use crate::app::{BatchReport, FileStatus, ProgressEvent, ProgressSink};
use crate::info::InfoReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

const RULE: &str = "======================================================================";

/// Prints progress lines to stdout as they happen.
pub struct ConsoleOutput;

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => println!("{} in {:.1}s", event.message, elapsed.as_secs_f64()),
            None => println!("{}", event.message),
        }
    }
}

impl ConsoleOutput {
    pub fn print_info(report: &InfoReport) {
        print!("{}", render_info(report));
    }

    pub fn print_batch_summary(report: &BatchReport) {
        print!("{}", render_batch_summary(report));
    }
}

pub fn render_info(report: &InfoReport) -> String {
    let mut out = format!("\n📄 GEO Information for {}\n{RULE}\n", report.accession);
    if report.fields.is_empty() {
        out.push_str("⚠️ No structured GEO description fields found.\n");
    }
    for field in &report.fields {
        out.push_str(&format!("\n🔹 {}\n{}\n", field.key, field.value));
    }
    out.push_str(RULE);
    out.push('\n');
    out
}

pub fn render_batch_summary(report: &BatchReport) -> String {
    let mut downloaded = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;
    let mut fallbacks = 0usize;
    for series in &report.series {
        for section in &series.sections {
            if section.mirror_error.is_some() {
                failed += 1;
            }
            if section.listing_error.is_some() {
                fallbacks += 1;
            }
            for file in &section.files {
                match file.status {
                    FileStatus::Downloaded { .. } => downloaded += 1,
                    FileStatus::SkippedExisting => skipped += 1,
                    FileStatus::Failed { .. } => failed += 1,
                }
            }
        }
    }

    let mut out = format!(
        "\n📦 Processed {} series: {downloaded} downloaded, {skipped} already present, {failed} failed, {fallbacks} fallback(s)\n",
        report.series.len()
    );
    for input in &report.skipped {
        out.push_str(&format!("⚠️ Skipped {}: {}\n", input.input.trim(), input.reason));
    }
    out.push_str("✅ All downloads finished.\n");
    out
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_batch(result: &BatchReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_info(result: &[InfoReport]) -> io::Result<()> {
        Self::print_json(&result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// Progress is dropped in JSON mode so stdout carries only the document.
impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::InfoField;

    #[test]
    fn render_info_without_fields() {
        let report = InfoReport {
            accession: "GSE1".to_string(),
            source_url: "https://example.org".to_string(),
            fields: Vec::new(),
        };
        assert!(render_info(&report).contains("No structured GEO description fields found."));
    }

    #[test]
    fn render_info_lists_pairs() {
        let report = InfoReport {
            accession: "GSE76275".to_string(),
            source_url: "https://example.org".to_string(),
            fields: vec![InfoField {
                key: "Title".to_string(),
                value: "Triple negative breast cancer".to_string(),
            }],
        };
        let rendered = render_info(&report);
        assert!(rendered.contains("🔹 Title\nTriple negative breast cancer"));
        assert!(!rendered.contains("No structured"));
    }
}
