// SPDX-License-Identifier: MIT OR Apache-2.0
//! Unified error taxonomy with stable machine-readable codes for the provenance evaluator.
//!
//! Every error raised anywhere in this workspace carries an [`ErrorCode`] (a stable,
//! `SCREAMING_SNAKE_CASE`-serializing tag), a human-readable message, an optional cause chain, and
//! arbitrary key-value context. Use the builder returned by [`PsysError::new`] to construct errors
//! fluently.
//!
//! The Loader raises [`PsysError`] as a fatal [`Result::Err`]; every other component instead wraps
//! it into a [`Violation`] and pushes it onto the run's violation collector rather than returning
//! early.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to, mirroring the taxonomy's top-level prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Closed-key schema violations, missing required fields, document I/O.
    Schema,
    /// Duplicate or malformed ids.
    Id,
    /// Unknown element/tag/table/domain/pack reference.
    Reference,
    /// Malformed `when{}`/`require{}` rule bodies.
    Rule,
    /// Waiver lifecycle and target/mitigation validity.
    Waiver,
    /// Domain federation: declared/inferred mismatch, immiscibility.
    Domain,
    /// Pack-to-domain and profile-to-pack enforcement.
    PacksProfile,
    /// Flow/workshop pairing.
    Pairing,
    /// System graph link/endorsement/waiver validation.
    System,
    /// Strict-mode domain-completion quorum checks.
    DomainCompletion,
    /// Strategy registry entry and fixture conformance.
    StrategyRegistry,
    /// Negative-example case expectations and purity.
    NegativeExamples,
    /// Receipt composition and DSSE signing/verification.
    Receipt,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Schema => "schema",
            Self::Id => "id",
            Self::Reference => "reference",
            Self::Rule => "rule",
            Self::Waiver => "waiver",
            Self::Domain => "domain",
            Self::PacksProfile => "packs_profile",
            Self::Pairing => "pairing",
            Self::System => "system",
            Self::DomainCompletion => "domain_completion",
            Self::StrategyRegistry => "strategy_registry",
            Self::NegativeExamples => "negative_examples",
            Self::Receipt => "receipt",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serializes to a `SCREAMING_SNAKE_CASE` string guaranteed not to change across
/// patch releases; the string form (not the variant name) is what appears in receipts and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- Schema --
    /// Document failed to open or parse; the offending path is in the message.
    SchemaIo,
    /// Document's `schema` field did not equal the expected `periodic.<kind>.v<n>`.
    SchemaWrongId,
    /// Object carries a key outside the closed allowed set (and not an `x_`/`x.` extension).
    SchemaUnknownKey,
    /// A required field is absent.
    SchemaMissingField,
    /// A list that should be sorted by its natural key is not (warning-severity).
    SchemaNotSorted,

    // -- Id --
    /// An id does not match the required identifier grammar.
    IdInvalid,
    /// An id that must be unique (element/rule/pack/domain/negative-case) appears more than once.
    IdDuplicate,

    // -- Reference --
    /// A referenced element id does not resolve in the element index.
    ReferenceUnknownElement,
    /// A referenced tag does not appear on any element.
    ReferenceUnknownTag,
    /// A referenced table name is not one of the five known tables.
    ReferenceUnknownTable,
    /// A referenced domain id does not resolve in the domain registry.
    ReferenceUnknownDomain,
    /// A referenced pack id does not resolve in the pack registry.
    ReferenceUnknownPack,

    // -- Rule --
    /// A rule's `when{}` is empty.
    RuleEmptyWhen,
    /// A rule's `require{}` is empty.
    RuleEmptyRequire,
    /// A rule field has the wrong JSON type for its position.
    RuleTypeMismatch,
    /// `evidence_binding_mode = explicit_only` and an obligated evidence element is unbound.
    RuleEvidenceBindingMissing,

    // -- Waiver --
    /// Waiver's `expires_on` is before the run's `as_of` date.
    WaiverExpired,
    /// Waiver's `target` does not resolve to a real compound/system/link.
    WaiverInvalidTarget,
    /// Waiver's `mitigations[]` contains an entry that does not resolve.
    WaiverInvalidMitigation,

    // -- Domain --
    /// Compound's declared domain disagrees with its unambiguous inferred domain.
    DomainDeclaredMismatch,
    /// Compound's inferred domain is ambiguous (more than one non-neutral domain) yet `domain` is
    /// declared, or required to be declared and omitted.
    DomainDeclaredAmbiguous,
    /// Compound mixes two domains listed as an immiscible pair.
    DomainImmiscible,

    // -- Packs / Profile --
    /// A non-neutral domain is used but no pack with that id exists.
    PacksMissingForDomain,
    /// A non-neutral domain is used but its pack is not enabled under the active profile.
    ProfilePackMissingForDomain,
    /// An `enabled_packs[]` entry does not resolve to a known pack id.
    ProfileUnknownPack,

    // -- Pairing --
    /// Compound contains a flow element without its paired workshop element.
    PairFlowWorkshopMissing,

    // -- System --
    /// A system link references a compound alias that is not declared.
    SystemLinkMissingEndpoint,
    /// A system link's `via.cap` is not a neutral-domain capability.
    SystemLinkNonMembraneCap,
    /// A system link's `via.cap` is absent from one or both endpoints' element lists.
    SystemLinkMissingCap,
    /// A `(from, to, cap)` group has more than one link under `meaning_preserving` semantics.
    SystemLinkAmbiguousEndorsement,
    /// An `identity_bearing` link group member is missing a non-empty `via.endorsement_id`.
    SystemLinkEndorsementIdRequired,
    /// Two links in the same `identity_bearing` group share an `endorsement_id`.
    SystemLinkEndorsementIdDuplicate,
    /// A system waiver's target is neither `"system"` nor a resolvable `"link:<from>-><to>"`.
    SystemWaiverInvalidTarget,
    /// A system waiver's mitigation is not a resolvable `"compound:<alias>"` or link reference.
    SystemWaiverInvalidMitigation,

    // -- Domain completion --
    /// `domain_completion.v1` has no entry for an enabled pack declared `complete`.
    DomainCompletionMissingEntry,
    /// A pack declared `complete` has an empty rule list.
    DomainCompletionMissingRules,
    /// Fewer positive examples than `min_positive_examples` for a `complete` pack.
    DomainCompletionInsufficientPositive,
    /// Fewer negative examples than `min_negative_examples` for a `complete` pack.
    DomainCompletionInsufficientNegative,

    // -- Strategy registry --
    /// Strategy registry entry is missing its `strategy_id`.
    StrategyRegistryMissingDocId,
    /// Strategy registry entry's `combining.algorithm` is not one of the four known algorithms.
    StrategyRegistryBadAlgorithm,
    /// Strategy registry entry's `canonical_semantics_hash_sha256` does not match the recomputed
    /// hash.
    StrategyRegistryHashMismatch,
    /// A strategy's attached counterexample fixture resolved to a different decision than expected.
    StrategyRegistryFixtureMismatch,

    // -- Negative examples --
    /// An expected rule id did not fire for a negative case.
    NegativeExampleRuleNotFound,
    /// An unexpected rule id fired for a negative case under strict purity.
    NegativeExampleUnexpectedRuleFired,
    /// A negative case produced zero errors/warnings (expected at least one).
    NegativeExampleExpectedFailureButPassed,

    // -- Receipt / DSSE --
    /// A caller-supplied `keyid` does not match the signing key's derived keyid.
    ReceiptKeyidMismatch,
    /// The receipt's `verifier.keyid` does not match the signing key's derived keyid.
    ReceiptVerifierKeyidMismatch,
    /// Self-verification of a freshly produced DSSE envelope failed (strict mode: fatal).
    ReceiptSelfVerifyFailed,
    /// A DSSE envelope's `payloadType` or `payload` could not be decoded for verification.
    ReceiptEnvelopeMalformed,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::SchemaIo
            | Self::SchemaWrongId
            | Self::SchemaUnknownKey
            | Self::SchemaMissingField
            | Self::SchemaNotSorted => ErrorCategory::Schema,

            Self::IdInvalid | Self::IdDuplicate => ErrorCategory::Id,

            Self::ReferenceUnknownElement
            | Self::ReferenceUnknownTag
            | Self::ReferenceUnknownTable
            | Self::ReferenceUnknownDomain
            | Self::ReferenceUnknownPack => ErrorCategory::Reference,

            Self::RuleEmptyWhen
            | Self::RuleEmptyRequire
            | Self::RuleTypeMismatch
            | Self::RuleEvidenceBindingMissing => ErrorCategory::Rule,

            Self::WaiverExpired | Self::WaiverInvalidTarget | Self::WaiverInvalidMitigation => {
                ErrorCategory::Waiver
            }

            Self::DomainDeclaredMismatch
            | Self::DomainDeclaredAmbiguous
            | Self::DomainImmiscible => ErrorCategory::Domain,

            Self::PacksMissingForDomain
            | Self::ProfilePackMissingForDomain
            | Self::ProfileUnknownPack => ErrorCategory::PacksProfile,

            Self::PairFlowWorkshopMissing => ErrorCategory::Pairing,

            Self::SystemLinkMissingEndpoint
            | Self::SystemLinkNonMembraneCap
            | Self::SystemLinkMissingCap
            | Self::SystemLinkAmbiguousEndorsement
            | Self::SystemLinkEndorsementIdRequired
            | Self::SystemLinkEndorsementIdDuplicate
            | Self::SystemWaiverInvalidTarget
            | Self::SystemWaiverInvalidMitigation => ErrorCategory::System,

            Self::DomainCompletionMissingEntry
            | Self::DomainCompletionMissingRules
            | Self::DomainCompletionInsufficientPositive
            | Self::DomainCompletionInsufficientNegative => ErrorCategory::DomainCompletion,

            Self::StrategyRegistryMissingDocId
            | Self::StrategyRegistryBadAlgorithm
            | Self::StrategyRegistryHashMismatch
            | Self::StrategyRegistryFixtureMismatch => ErrorCategory::StrategyRegistry,

            Self::NegativeExampleRuleNotFound
            | Self::NegativeExampleUnexpectedRuleFired
            | Self::NegativeExampleExpectedFailureButPassed => ErrorCategory::NegativeExamples,

            Self::ReceiptKeyidMismatch
            | Self::ReceiptVerifierKeyidMismatch
            | Self::ReceiptSelfVerifyFailed
            | Self::ReceiptEnvelopeMalformed => ErrorCategory::Receipt,
        }
    }

    /// Stable `&'static str` representation of the code (e.g. `"DOMAIN_IMMISCIBLE"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SchemaIo => "SCHEMA_IO",
            Self::SchemaWrongId => "SCHEMA_WRONG_ID",
            Self::SchemaUnknownKey => "SCHEMA_UNKNOWN_KEY",
            Self::SchemaMissingField => "SCHEMA_MISSING_FIELD",
            Self::SchemaNotSorted => "SCHEMA_NOT_SORTED",
            Self::IdInvalid => "ID_INVALID",
            Self::IdDuplicate => "ID_DUPLICATE",
            Self::ReferenceUnknownElement => "REFERENCE_UNKNOWN_ELEMENT",
            Self::ReferenceUnknownTag => "REFERENCE_UNKNOWN_TAG",
            Self::ReferenceUnknownTable => "REFERENCE_UNKNOWN_TABLE",
            Self::ReferenceUnknownDomain => "REFERENCE_UNKNOWN_DOMAIN",
            Self::ReferenceUnknownPack => "REFERENCE_UNKNOWN_PACK",
            Self::RuleEmptyWhen => "RULE_EMPTY_WHEN",
            Self::RuleEmptyRequire => "RULE_EMPTY_REQUIRE",
            Self::RuleTypeMismatch => "RULE_TYPE_MISMATCH",
            Self::RuleEvidenceBindingMissing => "RULE_EVIDENCE_BINDING_MISSING",
            Self::WaiverExpired => "WAIVER_EXPIRED",
            Self::WaiverInvalidTarget => "WAIVER_INVALID_TARGET",
            Self::WaiverInvalidMitigation => "WAIVER_INVALID_MITIGATION",
            Self::DomainDeclaredMismatch => "DOMAIN_DECLARED_MISMATCH",
            Self::DomainDeclaredAmbiguous => "DOMAIN_DECLARED_AMBIGUOUS",
            Self::DomainImmiscible => "DOMAIN_IMMISCIBLE",
            Self::PacksMissingForDomain => "PACKS_MISSING_FOR_DOMAIN",
            Self::ProfilePackMissingForDomain => "PROFILE_PACK_MISSING_FOR_DOMAIN",
            Self::ProfileUnknownPack => "PROFILE_UNKNOWN_PACK",
            Self::PairFlowWorkshopMissing => "PAIR_FLOW_WORKSHOP_MISSING",
            Self::SystemLinkMissingEndpoint => "SYSTEM_LINK_MISSING_ENDPOINT",
            Self::SystemLinkNonMembraneCap => "SYSTEM_LINK_NON_MEMBRANE_CAP",
            Self::SystemLinkMissingCap => "SYSTEM_LINK_MISSING_CAP",
            Self::SystemLinkAmbiguousEndorsement => "SYSTEM_LINK_AMBIGUOUS_ENDORSEMENT",
            Self::SystemLinkEndorsementIdRequired => "SYSTEM_LINK_ENDORSEMENT_ID_REQUIRED",
            Self::SystemLinkEndorsementIdDuplicate => "SYSTEM_LINK_ENDORSEMENT_ID_DUPLICATE",
            Self::SystemWaiverInvalidTarget => "SYSTEM_WAIVER_INVALID_TARGET",
            Self::SystemWaiverInvalidMitigation => "SYSTEM_WAIVER_INVALID_MITIGATION",
            Self::DomainCompletionMissingEntry => "DOMAIN_COMPLETION_MISSING_ENTRY",
            Self::DomainCompletionMissingRules => "DOMAIN_COMPLETION_MISSING_RULES",
            Self::DomainCompletionInsufficientPositive => "DOMAIN_COMPLETION_INSUFFICIENT_POSITIVE",
            Self::DomainCompletionInsufficientNegative => "DOMAIN_COMPLETION_INSUFFICIENT_NEGATIVE",
            Self::StrategyRegistryMissingDocId => "STRATEGY_REGISTRY_MISSING_DOC_ID",
            Self::StrategyRegistryBadAlgorithm => "STRATEGY_REGISTRY_BAD_ALGORITHM",
            Self::StrategyRegistryHashMismatch => "STRATEGY_REGISTRY_HASH_MISMATCH",
            Self::StrategyRegistryFixtureMismatch => "STRATEGY_REGISTRY_FIXTURE_MISMATCH",
            Self::NegativeExampleRuleNotFound => "NEGATIVE_EXAMPLE_RULE_NOT_FOUND",
            Self::NegativeExampleUnexpectedRuleFired => "NEGATIVE_EXAMPLE_UNEXPECTED_RULE_FIRED",
            Self::NegativeExampleExpectedFailureButPassed => {
                "NEGATIVE_EXAMPLE_EXPECTED_FAILURE_BUT_PASSED"
            }
            Self::ReceiptKeyidMismatch => "RECEIPT_KEYID_MISMATCH",
            Self::ReceiptVerifierKeyidMismatch => "RECEIPT_VERIFIER_KEYID_MISMATCH",
            Self::ReceiptSelfVerifyFailed => "RECEIPT_SELF_VERIFY_FAILED",
            Self::ReceiptEnvelopeMalformed => "RECEIPT_ENVELOPE_MALFORMED",
        }
    }

    /// `true` for codes that are warning-severity by default (may still be promoted to an error
    /// under strict mode or a profile's severity override).
    #[must_use]
    pub fn is_default_warning(&self) -> bool {
        matches!(self, Self::SchemaNotSorted)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PsysError
// ---------------------------------------------------------------------------

/// Unified evaluator error.
///
/// Carries a stable [`ErrorCode`], a human-readable message, an optional source error for
/// cause-chaining, and arbitrary structured context.
///
/// # Builder usage
///
/// ```
/// use psys_error::{PsysError, ErrorCode};
///
/// let err = PsysError::new(ErrorCode::WaiverExpired, "waiver for r.require_b expired")
///     .with_context("rule_id", "r.require_b")
///     .with_context("expires_on", "2000-01-01");
/// ```
pub struct PsysError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics.
    pub context: BTreeMap<String, serde_json::Value>,
}

impl PsysError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if serialization fails, the entry is
    /// silently skipped.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.code.category()`.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Build a fatal loader error bound to a source path, per the Loader's propagation policy:
    /// file open/parse failures abort the run with the offending path in the message.
    pub fn fatal_at_path(
        code: ErrorCode,
        message: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        let path = path.into();
        let message = message.into();
        Self::new(code, format!("{message} ({path})")).with_context("path", path)
    }
}

impl fmt::Debug for PsysError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("PsysError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for PsysError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if !self.context.is_empty() {
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for PsysError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<serde_json::Error> for PsysError {
    fn from(err: serde_json::Error) -> Self {
        PsysError::new(ErrorCode::SchemaIo, err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Serialization support
// ---------------------------------------------------------------------------

/// Serializable snapshot of a [`PsysError`] (without the opaque source), embedded in trace entries
/// and reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PsysErrorDto {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Structured context.
    pub context: BTreeMap<String, serde_json::Value>,
    /// String representation of the source error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_message: Option<String>,
}

impl From<&PsysError> for PsysErrorDto {
    fn from(err: &PsysError) -> Self {
        Self {
            code: err.code,
            message: err.message.clone(),
            context: err.context.clone(),
            source_message: err.source.as_ref().map(std::string::ToString::to_string),
        }
    }
}

impl From<PsysErrorDto> for PsysError {
    fn from(dto: PsysErrorDto) -> Self {
        Self {
            code: dto.code,
            message: dto.message,
            source: None,
            context: dto.context,
        }
    }
}

/// Severity a collected violation carries before waiver suppression and profile overrides are
/// applied (see the obligation engine's severity resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Blocks `ok` unconditionally.
    Error,
    /// Blocks `ok` only under strict mode.
    Warn,
    /// Never blocks `ok`; still recorded in trace when tracing is enabled.
    Ignore,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Ignore => "ignore",
        };
        f.write_str(s)
    }
}

/// A single violation pushed onto the top-level evaluator's violation collector.
///
/// Unlike [`PsysError`], a `Violation` never aborts a run: it is an entry in the collected
/// errors/warnings list, carrying the code that produced it and its resolved severity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Violation {
    /// Error code identifying the kind of violation.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Resolved severity after profile overrides.
    pub severity: Severity,
    /// Arbitrary structured context (rule id, compound id, etc.).
    pub context: BTreeMap<String, serde_json::Value>,
}

impl Violation {
    /// Construct a violation at the given severity.
    pub fn new(code: ErrorCode, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            code,
            message: message.into(),
            severity,
            context: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }
}

impl From<PsysError> for Violation {
    fn from(err: PsysError) -> Self {
        let severity = if err.code.is_default_warning() {
            Severity::Warn
        } else {
            Severity::Error
        };
        Self {
            code: err.code,
            message: err.message,
            severity,
            context: err.context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ALL_CODES: &[ErrorCode] = &[
        ErrorCode::SchemaIo,
        ErrorCode::SchemaWrongId,
        ErrorCode::SchemaUnknownKey,
        ErrorCode::SchemaMissingField,
        ErrorCode::SchemaNotSorted,
        ErrorCode::IdInvalid,
        ErrorCode::IdDuplicate,
        ErrorCode::ReferenceUnknownElement,
        ErrorCode::ReferenceUnknownTag,
        ErrorCode::ReferenceUnknownTable,
        ErrorCode::ReferenceUnknownDomain,
        ErrorCode::ReferenceUnknownPack,
        ErrorCode::RuleEmptyWhen,
        ErrorCode::RuleEmptyRequire,
        ErrorCode::RuleTypeMismatch,
        ErrorCode::RuleEvidenceBindingMissing,
        ErrorCode::WaiverExpired,
        ErrorCode::WaiverInvalidTarget,
        ErrorCode::WaiverInvalidMitigation,
        ErrorCode::DomainDeclaredMismatch,
        ErrorCode::DomainDeclaredAmbiguous,
        ErrorCode::DomainImmiscible,
        ErrorCode::PacksMissingForDomain,
        ErrorCode::ProfilePackMissingForDomain,
        ErrorCode::ProfileUnknownPack,
        ErrorCode::PairFlowWorkshopMissing,
        ErrorCode::SystemLinkMissingEndpoint,
        ErrorCode::SystemLinkNonMembraneCap,
        ErrorCode::SystemLinkMissingCap,
        ErrorCode::SystemLinkAmbiguousEndorsement,
        ErrorCode::SystemLinkEndorsementIdRequired,
        ErrorCode::SystemLinkEndorsementIdDuplicate,
        ErrorCode::SystemWaiverInvalidTarget,
        ErrorCode::SystemWaiverInvalidMitigation,
        ErrorCode::DomainCompletionMissingEntry,
        ErrorCode::DomainCompletionMissingRules,
        ErrorCode::DomainCompletionInsufficientPositive,
        ErrorCode::DomainCompletionInsufficientNegative,
        ErrorCode::StrategyRegistryMissingDocId,
        ErrorCode::StrategyRegistryBadAlgorithm,
        ErrorCode::StrategyRegistryHashMismatch,
        ErrorCode::StrategyRegistryFixtureMismatch,
        ErrorCode::NegativeExampleRuleNotFound,
        ErrorCode::NegativeExampleUnexpectedRuleFired,
        ErrorCode::NegativeExampleExpectedFailureButPassed,
        ErrorCode::ReceiptKeyidMismatch,
        ErrorCode::ReceiptVerifierKeyidMismatch,
        ErrorCode::ReceiptSelfVerifyFailed,
        ErrorCode::ReceiptEnvelopeMalformed,
    ];

    #[test]
    fn every_code_has_a_category() {
        for code in ALL_CODES {
            let _ = code.category();
        }
    }

    #[test]
    fn code_strings_are_unique() {
        let set: HashSet<&'static str> = ALL_CODES.iter().map(ErrorCode::as_str).collect();
        assert_eq!(set.len(), ALL_CODES.len());
    }

    #[test]
    fn code_strings_are_screaming_snake_case() {
        for code in ALL_CODES {
            let s = code.as_str();
            assert!(s.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn builder_attaches_context_and_source() {
        let io_err = std::io::Error::other("boom");
        let err = PsysError::new(ErrorCode::DomainImmiscible, "bad pair")
            .with_context("pair", vec!["a", "b"])
            .with_source(io_err);
        assert_eq!(
            err.context.get("pair").unwrap(),
            &serde_json::json!(["a", "b"])
        );
        assert!(err.source.is_some());
        assert_eq!(err.category(), ErrorCategory::Domain);
    }

    #[test]
    fn display_includes_code_and_context() {
        let err = PsysError::new(ErrorCode::WaiverExpired, "expired").with_context("rule_id", "r.x");
        let rendered = err.to_string();
        assert!(rendered.starts_with("[WAIVER_EXPIRED] expired"));
        assert!(rendered.contains("r.x"));
    }

    #[test]
    fn dto_roundtrip_drops_opaque_source_but_keeps_message() {
        let err = PsysError::new(ErrorCode::RuleTypeMismatch, "bad type")
            .with_source(std::io::Error::other("cause"));
        let dto = PsysErrorDto::from(&err);
        assert_eq!(dto.source_message.as_deref(), Some("cause"));
        let restored: PsysError = dto.into();
        assert!(restored.source.is_none());
        assert_eq!(restored.message, "bad type");
    }

    #[test]
    fn violation_from_error_defaults_to_error_severity() {
        let v: Violation = PsysError::new(ErrorCode::DomainImmiscible, "x").into();
        assert_eq!(v.severity, Severity::Error);
    }

    #[test]
    fn violation_from_not_sorted_defaults_to_warn_severity() {
        let v: Violation = PsysError::new(ErrorCode::SchemaNotSorted, "x").into();
        assert_eq!(v.severity, Severity::Warn);
    }

    #[test]
    fn fatal_at_path_embeds_path_in_message_and_context() {
        let err = PsysError::fatal_at_path(ErrorCode::SchemaIo, "cannot open", "/tmp/x.json");
        assert!(err.message.contains("/tmp/x.json"));
        assert_eq!(
            err.context.get("path").unwrap(),
            &serde_json::json!("/tmp/x.json")
        );
    }
}
