//! Suite result reporting
//!
//! Three output artifacts: a console summary for humans, a self-contained
//! HTML page, and JUnit-style XML for CI systems.

mod console;
mod html;
mod junit;

use anyhow::Result;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::runner::SuiteResults;

pub use console::ConsoleReporter;
pub use html::HtmlReporter;
pub use junit::JunitReporter;

/// Output format for suite results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Console,
    Html,
    Junit,
}

/// Reporter for suite results
pub struct Reporter {
    format: OutputFormat,
}

impl Reporter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Report results to stdout
    pub fn report(&self, results: &SuiteResults) -> Result<()> {
        let output = self.format_results(results)?;
        print!("{}", output);
        io::stdout().flush()?;
        Ok(())
    }

    /// Write results to a file, creating parent directories as needed
    pub fn write_to_file<P: AsRef<Path>>(&self, results: &SuiteResults, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.format_results(results)?)?;
        Ok(())
    }

    /// Format results as a string
    pub fn format_results(&self, results: &SuiteResults) -> Result<String> {
        match self.format {
            OutputFormat::Console => ConsoleReporter::format(results),
            OutputFormat::Html => HtmlReporter::format(results),
            OutputFormat::Junit => JunitReporter::format(results),
        }
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(OutputFormat::default())
    }
}
