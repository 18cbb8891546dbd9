//! Self-contained HTML report

use anyhow::Result;
use std::fmt::Write;

use crate::runner::SuiteResults;

pub struct HtmlReporter;

impl HtmlReporter {
    pub fn format(results: &SuiteResults) -> Result<String> {
        let mut rows = String::new();
        for outcome in &results.scenario_results {
            let class = if outcome.passed { "pass" } else { "fail" };
            let status = if outcome.passed { "PASS" } else { "FAIL" };
            let tags = outcome
                .tags
                .iter()
                .map(|t| format!("@{}", escape(t)))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(
                rows,
                "      <tr class=\"{class}\"><td>{status}</td><td>{}</td><td>{tags}</td>\
                 <td>{:.1}s</td><td>{}</td><td>{}</td></tr>",
                escape(&outcome.name),
                outcome.duration_ms as f64 / 1000.0,
                outcome.attempts,
                escape(outcome.failure.as_deref().unwrap_or("")),
            )?;
        }

        let verdict = if results.passed { "passed" } else { "FAILED" };
        Ok(format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <style>
    body {{ font-family: system-ui, sans-serif; margin: 2rem; }}
    table {{ border-collapse: collapse; width: 100%; }}
    th, td {{ border: 1px solid #ccc; padding: 0.4rem 0.6rem; text-align: left; }}
    tr.pass td:first-child {{ color: #1a7f37; font-weight: bold; }}
    tr.fail td:first-child {{ color: #cf222e; font-weight: bold; }}
  </style>
</head>
<body>
  <h1>{title}</h1>
  <p>IdP: {idp} &middot; started {started} &middot; run {verdict} in {total:.1}s</p>
  <table>
    <thead>
      <tr><th>Status</th><th>Scenario</th><th>Tags</th><th>Duration</th><th>Attempts</th><th>Failure</th></tr>
    </thead>
    <tbody>
{rows}    </tbody>
  </table>
</body>
</html>
"#,
            title = escape(&results.suite_name),
            idp = escape(&results.idp_host),
            started = escape(&results.started_at),
            total = results.total_duration_ms as f64 / 1000.0,
        ))
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
