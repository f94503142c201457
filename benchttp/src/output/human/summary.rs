use std::fmt::Write as _;

use super::format::*;

pub(crate) fn render(report: &benchttp_core::Report, verbose: bool) -> String {
    let mut out = String::new();

    writeln!(&mut out, " Duration: {}", format_secs(report.elapsed)).ok();
    writeln!(
        &mut out,
        " Requests: {} ({})",
        report.requests_total,
        format_rate(report.requests_per_sec())
    )
    .ok();

    if verbose || report.errors_total > 0 {
        writeln!(
            &mut out,
            "   Errors: {} ({})",
            report.errors_total,
            format_pct(report.error_rate_pct())
        )
        .ok();
    }

    if verbose && report.late_arrivals_total > 0 {
        writeln!(
            &mut out,
            "  Ignored: {} (completed after the deadline)",
            report.late_arrivals_total
        )
        .ok();
    }

    writeln!(
        &mut out,
        "Responses: {} ({})",
        report.responses_total(),
        format_rate(report.responses_per_sec())
    )
    .ok();

    for (status, count) in &report.status_counts {
        writeln!(&mut out, "    [{status}]: {count}").ok();
    }

    if verbose {
        for (description, count) in report.errors_by_frequency() {
            writeln!(&mut out, "\n{count} times:\n{description}").ok();
        }
    }

    out
}
