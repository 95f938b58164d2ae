//! Rendering a [`RunReport`] for the terminal.

use std::fmt::Write;

use contend_types::RunReport;

const VALUE_PREVIEW_CHARS: usize = 48;

/// One row per scenario, then a summary line.
pub fn render_table(report: &RunReport) -> String {
    let name_width = report
        .outcomes
        .iter()
        .map(|outcome| outcome.name.len())
        .max()
        .unwrap_or(0)
        .max("scenario".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3}  {:<name_width$}  {:>9}  result",
        "#", "scenario", "elapsed"
    );

    for outcome in &report.outcomes {
        let result = match &outcome.result {
            Ok(value) => format!("ok     {}", preview(value)),
            Err(failure) => format!("FAILED {failure}"),
        };
        let _ = writeln!(
            out,
            "{:>3}  {:<name_width$}  {:>7}ms  {result}",
            outcome.scenario,
            outcome.name,
            outcome.elapsed.as_millis(),
        );
    }

    let total = report.outcomes.len();
    let _ = writeln!(
        out,
        "\n{}/{total} scenarios succeeded in {}ms against {}",
        total - report.failed(),
        report.elapsed.as_millis(),
        report.base_url,
    );
    out
}

pub fn render_json(report: &RunReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

fn preview(value: &str) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    if flat.chars().count() <= VALUE_PREVIEW_CHARS {
        return format!("{flat:?}");
    }
    let head: String = flat.chars().take(VALUE_PREVIEW_CHARS).collect();
    format!("{head:?}...")
}
