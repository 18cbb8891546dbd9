//! Human-readable console output

use anyhow::Result;
use std::fmt::Write;

use crate::runner::SuiteResults;

pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn format(results: &SuiteResults) -> Result<String> {
        let mut out = String::new();

        writeln!(out, "{}", results.suite_name)?;
        writeln!(out, "IdP: {}  started: {}", results.idp_host, results.started_at)?;
        writeln!(out)?;

        for outcome in &results.scenario_results {
            let status = if outcome.passed { "PASS" } else { "FAIL" };
            let tags = outcome
                .tags
                .iter()
                .map(|t| format!("@{t}"))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(
                out,
                "  [{status}] {} {tags}  ({:.1}s, {} attempt{})",
                outcome.name,
                outcome.duration_ms as f64 / 1000.0,
                outcome.attempts,
                if outcome.attempts == 1 { "" } else { "s" },
            )?;
            if let Some(failure) = &outcome.failure {
                writeln!(out, "         {failure}")?;
            }
        }

        let passed = results.scenario_results.iter().filter(|o| o.passed).count();
        let failed = results.scenario_results.len() - passed;
        writeln!(out)?;
        writeln!(
            out,
            "{} passed, {} failed in {:.1}s",
            passed,
            failed,
            results.total_duration_ms as f64 / 1000.0
        )?;

        Ok(out)
    }
}
