use std::time::Duration;

pub(crate) fn format_secs(d: Duration) -> String {
    format!("{:.3}s", d.as_secs_f64())
}

pub(crate) fn format_rate(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.1}/s")
    } else {
        "0.0/s".to_string()
    }
}

pub(crate) fn format_pct(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.1}%")
    } else {
        "0.0%".to_string()
    }
}
