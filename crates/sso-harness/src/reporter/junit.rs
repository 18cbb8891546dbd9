//! JUnit-style XML output for CI systems

use anyhow::Result;
use std::fmt::Write;

use crate::runner::SuiteResults;

pub struct JunitReporter;

impl JunitReporter {
    pub fn format(results: &SuiteResults) -> Result<String> {
        let tests = results.scenario_results.len();
        let failures = results.scenario_results.iter().filter(|o| !o.passed).count();
        let time = results.total_duration_ms as f64 / 1000.0;

        let mut out = String::new();
        writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(
            out,
            r#"<testsuites name="{}" tests="{tests}" failures="{failures}" time="{time:.3}">"#,
            escape(&results.suite_name)
        )?;
        writeln!(
            out,
            r#"  <testsuite name="{}" tests="{tests}" failures="{failures}" time="{time:.3}" timestamp="{}">"#,
            escape(&results.suite_name),
            escape(&results.started_at)
        )?;

        for outcome in &results.scenario_results {
            let case_time = outcome.duration_ms as f64 / 1000.0;
            if let Some(failure) = &outcome.failure {
                writeln!(
                    out,
                    r#"    <testcase name="{}" time="{case_time:.3}">"#,
                    escape(&outcome.name)
                )?;
                writeln!(out, r#"      <failure message="{}"/>"#, escape(failure))?;
                writeln!(out, "    </testcase>")?;
            } else {
                writeln!(
                    out,
                    r#"    <testcase name="{}" time="{case_time:.3}"/>"#,
                    escape(&outcome.name)
                )?;
            }
        }

        writeln!(out, "  </testsuite>")?;
        writeln!(out, "</testsuites>")?;
        Ok(out)
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
