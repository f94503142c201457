use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write as _;

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_summary(&self, report: &benchttp_core::Report) -> anyhow::Result<()> {
        let line = build_summary_line(report);
        emit_json_line(&line)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine<'a> {
    pub kind: &'static str,
    pub duration_secs: f64,

    pub requests_total: u64,
    pub requests_per_sec: f64,
    pub responses_total: u64,
    pub responses_per_sec: f64,
    pub errors_total: u64,
    pub error_rate_pct: f64,
    pub late_arrivals_total: u64,

    pub status_counts: &'a BTreeMap<u16, u64>,
    pub error_counts: &'a BTreeMap<String, u64>,
}

fn build_summary_line(report: &benchttp_core::Report) -> JsonSummaryLine<'_> {
    JsonSummaryLine {
        kind: "summary",
        duration_secs: report.elapsed.as_secs_f64(),

        requests_total: report.requests_total,
        requests_per_sec: report.requests_per_sec(),
        responses_total: report.responses_total(),
        responses_per_sec: report.responses_per_sec(),
        errors_total: report.errors_total,
        error_rate_pct: report.error_rate_pct(),
        late_arrivals_total: report.late_arrivals_total,

        status_counts: &report.status_counts,
        error_counts: &report.error_counts,
    }
}

fn emit_json_line<T: Serialize>(line: &T) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, line)?;
    stdout.write_all(b"\n")?;
    stdout.flush()?;
    Ok(())
}
