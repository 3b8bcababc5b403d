// SPDX-License-Identifier: MIT OR Apache-2.0
//! The final shape a run returns to its caller: pass/fail, every error/warning in whichever of
//! the two native shapes produced it, and the optional trace views and receipt.

use serde::Serialize;

use psys_error::{Severity, Violation};
use psys_receipt::Receipt;
use psys_trace::TraceEntry;

use crate::trace::TraceViews;

/// One reported error or warning: either a rule outcome (carrying its `atom`/`remediation`) or a
/// structural violation (schema, reference, domain-federation, negative-example).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReportEntry {
    /// A triggered bond rule's trace entry.
    Rule(TraceEntry),
    /// A structural violation raised outside the rule engine.
    Structural(Violation),
}

impl ReportEntry {
    /// The severity `partition` sorts this entry by. A rule entry a live waiver suppressed reports
    /// `Ignore` here regardless of the rule's own severity — it still appears in `--trace`'s full
    /// entry list with `waived: true`, just not in `errors`/`warnings`.
    fn severity(&self) -> Severity {
        match self {
            ReportEntry::Rule(entry) if entry.waived => Severity::Ignore,
            ReportEntry::Rule(entry) => entry.severity,
            ReportEntry::Structural(violation) => violation.severity,
        }
    }

    /// A short identifier for this entry: the rule id for a triggered rule, or the error code for
    /// a structural violation.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            ReportEntry::Rule(entry) => entry.rule_id.clone(),
            ReportEntry::Structural(violation) => violation.code.to_string(),
        }
    }

    /// The human-readable message carried by either variant.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            ReportEntry::Rule(entry) => &entry.message,
            ReportEntry::Structural(violation) => &violation.message,
        }
    }
}

/// The outcome of one evaluation run.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    /// `true` if nothing at `Error` severity fired, and (under strict mode) nothing at `Warn`
    /// severity fired either.
    pub ok: bool,
    /// Every entry at `Error` severity.
    pub errors: Vec<ReportEntry>,
    /// Every entry at `Warn` severity.
    pub warnings: Vec<ReportEntry>,
    /// Explain-trace views, proof graph, and safety envelope, present only when tracing was
    /// requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceViews>,
    /// The assembled (and, if a signing key was supplied, DSSE-signed) receipt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<Receipt>,
}

/// Partitions `entries` into `(ok, errors, warnings)` per `strict`: `Ignore` never blocks `ok`;
/// `Warn` blocks it only when `strict` is set; any `Error` always blocks it.
#[must_use]
pub fn partition(entries: Vec<ReportEntry>, strict: bool) -> (bool, Vec<ReportEntry>, Vec<ReportEntry>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for entry in entries {
        match entry.severity() {
            Severity::Error => errors.push(entry),
            Severity::Warn => warnings.push(entry),
            Severity::Ignore => {}
        }
    }

    let ok = errors.is_empty() && (!strict || warnings.is_empty());
    (ok, errors, warnings)
}
