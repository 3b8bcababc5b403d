// SPDX-License-Identifier: MIT OR Apache-2.0
//! Run configuration for one evaluation pass.
//!
//! Held by value and passed by shared reference into every stage below; nothing in this crate
//! reaches for an ambient global or a `static` to recover the active profile or strictness level.

use chrono::NaiveDate;

/// Everything a run needs to know about itself, independent of the loaded corpus.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    /// Profile name to select from `profiles.v1.json`. `None` falls back to the loader's own
    /// default (`"ship"`).
    pub profile_name: Option<String>,
    /// Whether warnings block `ok` and whether strict-only gates (domain completion) run.
    pub strict: bool,
    /// The date used to resolve waiver expiry.
    pub as_of: NaiveDate,
    /// Whether to build and attach the full explain-trace views and proof graph.
    pub trace: bool,
}

impl EvaluationContext {
    /// A context defaulting to the `ship` profile, non-strict, no trace, evaluated as of `as_of`.
    #[must_use]
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            profile_name: None,
            strict: false,
            as_of,
            trace: false,
        }
    }
}
