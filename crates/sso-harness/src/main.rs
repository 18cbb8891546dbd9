//! Suite entry point
//!
//! Runs the scenario registry against the configured environment and writes
//! the console, HTML, and JUnit report artifacts.
//!
//! Exit codes: 0 all scenarios passed, 1 scenario failures, 2 configuration
//! error.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use regex::Regex;
use tracing::error;
use tracing_subscriber::EnvFilter;

use sso_harness::config::SuiteConfig;
use sso_harness::reporter::{OutputFormat, Reporter};
use sso_harness::runner::{scenarios, RunPlan, SuiteRunner};

#[derive(Parser, Debug)]
#[command(name = "sso-harness", about = "End-to-end SSO identity suite")]
struct Args {
    /// Only run scenarios whose title or @tag matches this regex
    #[arg(long, short = 'g')]
    grep: Option<String>,

    /// CI mode: retry failing scenarios twice and forbid focused scenarios
    #[arg(long, env = "CI")]
    ci: bool,

    /// Directory for the HTML and JUnit report artifacts
    #[arg(long, default_value = "test-results")]
    output_dir: PathBuf,

    /// List the registered scenarios and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if args.list {
        for def in scenarios() {
            let tags = def.tags.iter().map(|t| format!("@{t}")).collect::<Vec<_>>().join(" ");
            println!("{} {tags}", def.name);
        }
        return ExitCode::SUCCESS;
    }

    let filter = match args.grep.as_deref().map(Regex::new).transpose() {
        Ok(filter) => filter,
        Err(err) => {
            error!("invalid --grep pattern: {err}");
            return ExitCode::from(2);
        }
    };

    let config = match SuiteConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return ExitCode::from(2);
        }
    };

    let plan = RunPlan {
        filter,
        retries: if args.ci { 2 } else { 1 },
        ci: args.ci,
    };

    let runner = match SuiteRunner::launch(config).await {
        Ok(runner) => runner,
        Err(err) => {
            error!("could not launch browser: {err:#}");
            return ExitCode::from(2);
        }
    };

    let results = match runner.run(&plan).await {
        Ok(results) => results,
        Err(err) => {
            error!("suite run aborted: {err:#}");
            return ExitCode::from(2);
        }
    };

    if let Err(err) = Reporter::new(OutputFormat::Console).report(&results) {
        error!("console report failed: {err:#}");
    }
    for (format, file) in [(OutputFormat::Html, "report.html"), (OutputFormat::Junit, "junit.xml")] {
        let path = args.output_dir.join(file);
        if let Err(err) = Reporter::new(format).write_to_file(&results, &path) {
            error!("could not write {}: {err:#}", path.display());
        }
    }

    if results.passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
