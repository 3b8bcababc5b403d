// SPDX-License-Identifier: MIT OR Apache-2.0
//! psys-negative
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Negative-example purity checking (§4.9) and the domain-completion gate (§4.10): confirms a
//! negative-example case fires the rules it claims to, that strict runs fire only those rules,
//! and that every pack declared `complete` meets its positive/negative example quorum.

/// Pack-completeness quorum gate over the global golden and negative-example corpora (§4.10).
pub mod domain_completion;
/// Case-local fired-id buffer and expectation matching for a single negative example (§4.9).
pub mod runner;

pub use domain_completion::check as check_domain_completion;
pub use runner::{check_case, CaseBuffer};
