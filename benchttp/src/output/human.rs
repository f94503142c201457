mod format;
mod summary;

use summary::render;

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    verbose: bool,
}

impl HumanReadableOutput {
    pub(crate) fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_summary(&self, report: &benchttp_core::Report) -> anyhow::Result<()> {
        print!("{}", render(report, self.verbose));
        Ok(())
    }
}
