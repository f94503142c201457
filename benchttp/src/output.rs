use crate::cli::OutputFormat;

mod human;
mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_summary(&self, report: &benchttp_core::Report) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat, verbose: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new(verbose)),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
