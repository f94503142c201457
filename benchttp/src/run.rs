use anyhow::Context as _;
use benchttp_core::{ClientOptions, Method, RequestTemplate, RunConfig};

use crate::cli::{Cli, normalize_url};
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;

pub async fn run(cli: Cli) -> Result<ExitCode, RunError> {
    let cfg = RunConfig::resolve(cli.concurrency, cli.requests, cli.duration)?;
    let template = request_template(&cli).map_err(RunError::InvalidInput)?;
    let opts = ClientOptions {
        connect_timeout: Some(cli.connect_timeout),
    };

    tracing::debug!(
        method = %template.method(),
        url = %template.url(),
        concurrency = cfg.concurrency,
        stop = ?cfg.stop,
        "benchmark configured"
    );

    let out = output::formatter(cli.output, cli.verbose);

    let report = benchttp_core::run(template, &opts, cfg).await?;

    out.print_summary(&report).map_err(RunError::RuntimeError)?;

    Ok(ExitCode::Success)
}

fn request_template(cli: &Cli) -> anyhow::Result<RequestTemplate> {
    let method = if cli.head { Method::Head } else { Method::Get };
    let url = normalize_url(&cli.url);

    let mut template =
        RequestTemplate::new(method, &url).with_context(|| format!("invalid target: {url}"))?;

    for (name, value) in &cli.headers {
        template = template
            .with_header(name, value)
            .with_context(|| format!("invalid header `{name}: {value}`"))?;
    }

    if let Some(auth) = &cli.auth {
        template = template
            .with_basic_auth(auth.clone())
            .context("invalid basic auth credentials")?;
    }

    Ok(template)
}
