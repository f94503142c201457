use benchttp_core::BasicAuth;
use clap::Parser;
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        ));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"))?;

    let unit = unit_str.trim();
    match unit {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Ok(Duration::from_secs(value)),
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => {
            Ok(Duration::from_millis(value))
        }
        "us" | "µs" | "usec" | "usecs" | "microsecond" | "microseconds" => {
            Ok(Duration::from_micros(value))
        }
        "ns" | "nsec" | "nsecs" | "nanosecond" | "nanoseconds" => Ok(Duration::from_nanos(value)),
        "m" | "min" | "mins" | "minute" | "minutes" => {
            let secs = value
                .checked_mul(60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        "h" | "hr" | "hrs" | "hour" | "hours" => {
            let secs = value
                .checked_mul(60)
                .and_then(|v| v.checked_mul(60))
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        _ => Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        )),
    }
}

fn parse_header(input: &str) -> Result<(String, String), String> {
    let Some((key, value)) = input.split_once(':') else {
        return Err(format!("invalid header '{input}' (expected 'Key: Value')"));
    };

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid header '{input}' (empty header name)"));
    }

    Ok((key.to_string(), value.trim().to_string()))
}

fn parse_auth(input: &str) -> Result<BasicAuth, String> {
    let Some((username, password)) = input.split_once(':') else {
        return Err("invalid credentials (expected 'user:pass')".to_string());
    };

    Ok(BasicAuth {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Prepends `http://` when the target has no http(s) scheme.
pub fn normalize_url(input: &str) -> String {
    if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else {
        format!("http://{input}")
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    HumanReadable,
    /// Emit a single JSON summary line to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "benchttp",
    version,
    about = "Simple HTTP benchmarking tool",
    long_about = "benchttp sends the same HTTP request repeatedly with a bounded number of concurrent requests, then reports throughput, status codes and errors.\n\nThe run stops after a number of requests (-n) or after a duration (-d), never both. Without either, 1000 requests are sent.\n\nTLS certificates are not verified and redirects are not followed.",
    after_help = "Examples:\n  benchttp -n 1000 -c 10 http://localhost:8080/\n  benchttp -d 30s -c 100 -H 'Accept: application/json' https://example.com/api\n  benchttp -i -u user:pass -v localhost:8080/health\n\nSet RUST_LOG=benchttp_core=debug for run diagnostics on stderr."
)]
pub struct Cli {
    /// Target URL (http:// is assumed when no scheme is given)
    pub url: String,

    /// Number of requests to send
    #[arg(short = 'n', long = "requests")]
    pub requests: Option<u64>,

    /// Benchmark duration (e.g. 10s, 250ms, 1m)
    #[arg(short = 'd', long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Maximum number of concurrent requests
    #[arg(short = 'c', long, default_value_t = 1, env = "BENCHTTP_CONCURRENCY")]
    pub concurrency: usize,

    /// Print errors and their frequencies
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Send HEAD requests instead of GET
    #[arg(short = 'i', long)]
    pub head: bool,

    /// Custom header (repeatable)
    #[arg(short = 'H', long = "header", value_name = "KEY: VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Basic auth credentials
    #[arg(short = 'u', long = "auth", value_name = "USER:PASS", value_parser = parse_auth)]
    pub auth: Option<BasicAuth>,

    /// TCP connect timeout per connection
    #[arg(
        long,
        value_parser = parse_duration,
        default_value = "3s",
        env = "BENCHTTP_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: Duration,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}
