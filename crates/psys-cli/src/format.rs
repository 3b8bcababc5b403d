// SPDX-License-Identifier: MIT OR Apache-2.0
//! Output formatting: the default summary line and the `--report` Markdown renderer.

use psys_eval::{EvaluationReport, ReportEntry};

/// The default single-line summary: `PASS|FAIL errors=N warnings=N`.
#[must_use]
pub fn summary_line(ok: bool, errors: usize, warnings: usize) -> String {
    let verdict = if ok { "PASS" } else { "FAIL" };
    format!("{verdict} errors={errors} warnings={warnings}")
}

/// Renders a Markdown summary of `report`: verdict, then one bulleted section per non-empty
/// entry list.
#[must_use]
pub fn render_markdown(report: &EvaluationReport) -> String {
    let mut out = String::new();
    out.push_str("# Evaluation Report\n\n");
    out.push_str(&format!(
        "**Result:** {}\n\n",
        if report.ok { "PASS" } else { "FAIL" }
    ));
    out.push_str(&format!(
        "- Errors: {}\n- Warnings: {}\n",
        report.errors.len(),
        report.warnings.len()
    ));

    render_section(&mut out, "Errors", &report.errors);
    render_section(&mut out, "Warnings", &report.warnings);

    out
}

fn render_section(out: &mut String, title: &str, entries: &[ReportEntry]) {
    if entries.is_empty() {
        return;
    }
    out.push_str(&format!("\n## {title}\n\n"));
    for entry in entries {
        out.push_str(&format!("- `{}` — {}\n", entry.code(), entry.message()));
    }
}
