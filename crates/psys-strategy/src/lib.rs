// SPDX-License-Identifier: MIT OR Apache-2.0
//! psys-strategy
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Strategy Registry Check (§4.18): the four built-in combining algorithms
//! (`deny_overrides`/`permit_overrides`/`first_applicable`/`only_one_applicable`), generalized
//! from the donor `abp-policy::compose::PolicyPrecedence` enum, plus canonical-semantics hash
//! verification and counterexample fixture conformance for a loaded strategy registry.

/// The four combining algorithms and their resolution rules.
pub mod combining;
/// Hash and fixture conformance checking over a loaded registry.
pub mod conformance;

pub use combining::{order_links, Algorithm, Decision, Link};
pub use conformance::check;
