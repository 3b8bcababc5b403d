// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wires the parsed [`Cli`] to `psys_eval::evaluate`, finalizes and signs the receipt, and writes
//! every requested output artifact.

use std::fs;
use std::io::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use ed25519_dalek::pkcs8::DecodePublicKey;
use ed25519_dalek::VerifyingKey;
use serde::Serialize;

use psys_eval::EvaluationContext;
use psys_receipt::Receipt;

use crate::format;
use crate::Cli;

const DEFAULT_PAYLOAD_TYPE: &str = "application/vnd.psys.receipt+json";

/// Runs one evaluation per `cli` and writes every requested output. Returns whether the run
/// passed (after folding in a failed `--receipt-dsse-verify`, if requested).
///
/// # Errors
///
/// Propagates corpus-loading/evaluation failures and any I/O or signing error encountered while
/// producing an output artifact.
pub fn run(cli: &Cli) -> Result<bool> {
    let as_of = cli.as_of.unwrap_or_else(|| chrono::Local::now().date_naive());
    let mut ctx = EvaluationContext::new(as_of);
    ctx.strict = cli.strict;
    ctx.profile_name = cli.profile.clone();
    ctx.trace = cli.trace || cli.trace_hash_only;

    let canonical_path = cli.index_path.canonicalize().unwrap_or_else(|_| cli.index_path.clone());
    let profile_uri = format!("file://{}", canonical_path.display());

    let mut report = psys_eval::evaluate(&cli.index_path, &ctx, &profile_uri)
        .with_context(|| format!("evaluate corpus at {}", cli.index_path.display()))?;
    let mut ok = report.ok;

    let mut dsse_envelope = None;
    let mut public_key_pem = None;

    if let Some(receipt) = report.receipt.take() {
        let signed = finalize_receipt(cli, receipt)?;
        if let Some(verified) = signed.dsse_verified {
            ok &= verified;
        }
        dsse_envelope = signed.dsse_envelope;
        public_key_pem = signed.public_key_pem;
        report.receipt = Some(signed.receipt);
    }

    if let Some(path) = &cli.receipt_out {
        let receipt = report.receipt.as_ref().context("no receipt was produced to write")?;
        write_canonical(path, receipt)?;
    }
    if let Some(path) = &cli.receipt_dsse_out {
        let envelope = dsse_envelope.as_ref().context("no DSSE envelope was produced to write")?;
        write_canonical(path, envelope)?;
    }
    if let Some(path) = &cli.receipt_bundle_out {
        write_bundle(cli, &report, dsse_envelope.as_ref(), public_key_pem.as_deref(), path)?;
    }

    if let Some(path) = &cli.out_json {
        let value = report_json(&report, cli.trace_hash_only)?;
        write_text(path, &(psys_core::stable_stringify_value(&value) + "\n"))?;
    }
    if cli.stdout_json {
        let value = report_json(&report, cli.trace_hash_only)?;
        write_stdout(&(psys_core::stable_stringify_value(&value) + "\n"))?;
    }
    if let Some(path) = &cli.report {
        write_text(path, &format::render_markdown(&report))?;
    }

    if !cli.quiet {
        let line = format::summary_line(report.ok, report.errors.len(), report.warnings.len());
        if cli.stdout_json {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }

    Ok(ok)
}

/// Result of finalizing a receipt: its hash filled in and, if requested, signed.
struct SignedReceipt {
    receipt: Receipt,
    dsse_envelope: Option<psys_receipt::DsseEnvelope>,
    dsse_verified: Option<bool>,
    public_key_pem: Option<String>,
}

fn finalize_receipt(cli: &Cli, mut receipt: Receipt) -> Result<SignedReceipt> {
    let Some(key_path) = &cli.receipt_dsse_key else {
        let receipt = psys_receipt::compute_hash(&receipt)?;
        return Ok(SignedReceipt { receipt, dsse_envelope: None, dsse_verified: None, public_key_pem: None });
    };

    let pem = fs::read_to_string(key_path).with_context(|| format!("read signing key {}", key_path.display()))?;
    let signing_key =
        psys_receipt::signing_key_from_pem(&pem).with_context(|| format!("parse signing key {}", key_path.display()))?;
    receipt.verifier.keyid = Some(psys_receipt::derive_keyid(&signing_key.verifying_key())?);
    let receipt = psys_receipt::compute_hash(&receipt)?;

    let payload_type = cli.receipt_dsse_payload_type.clone().unwrap_or_else(|| DEFAULT_PAYLOAD_TYPE.to_string());
    let payload = format!("{}\n", psys_core::stable_stringify(&receipt)?);
    let envelope = psys_receipt::dsse_sign(
        &payload_type,
        payload.as_bytes(),
        &signing_key,
        cli.receipt_dsse_keyid.as_deref(),
        receipt.verifier.keyid.as_deref(),
    )?;

    let mut dsse_verified = None;
    let mut public_key_pem = None;
    if cli.receipt_dsse_verify {
        let (verifying_key, pem) = match &cli.receipt_dsse_pub {
            Some(pub_path) => {
                let pem =
                    fs::read_to_string(pub_path).with_context(|| format!("read public key {}", pub_path.display()))?;
                let key = VerifyingKey::from_public_key_pem(&pem)
                    .map_err(|e| anyhow::anyhow!("parse public key {}: {e}", pub_path.display()))?;
                (key, pem)
            }
            None => {
                let key = signing_key.verifying_key();
                let pem = psys_receipt::public_key_to_pem(&key)?;
                (key, pem)
            }
        };
        dsse_verified = Some(psys_receipt::dsse_verify(&envelope, &verifying_key).is_ok());
        public_key_pem = Some(pem);
    } else if cli.receipt_bundle_out.is_some() {
        public_key_pem = Some(psys_receipt::public_key_to_pem(&signing_key.verifying_key())?);
    }

    Ok(SignedReceipt { receipt, dsse_envelope: Some(envelope), dsse_verified, public_key_pem })
}

fn write_bundle(
    cli: &Cli,
    report: &psys_eval::EvaluationReport,
    dsse_envelope: Option<&psys_receipt::DsseEnvelope>,
    public_key_pem: Option<&str>,
    path: &Path,
) -> Result<()> {
    let views = report.trace.as_ref().context("`--receipt-bundle-out` requires `--trace`")?;
    let envelope = dsse_envelope.context("`--receipt-bundle-out` requires `--receipt-dsse-out`")?;
    let receipt = report.receipt.as_ref().context("no receipt was produced to bundle")?;
    let public_key_pem = public_key_pem.context("no public key available to embed in the bundle")?;
    let profile_name = cli.profile.clone().unwrap_or_else(|| "ship".to_string());

    let bundle = psys_receipt::export_bundle(
        profile_name,
        receipt.receipt_hash_sha256.clone().unwrap_or_default(),
        receipt.policy.semantics_digest.sha256.clone(),
        views.safety_envelope.envelope.clone(),
        views.safety_envelope.hash_sha256.clone(),
        receipt.policy.digest.sha256.clone(),
        receipt.clone(),
        envelope.clone(),
        public_key_pem,
    )?;
    write_canonical(path, &bundle.bundle)
}

/// Serializes `report` to a JSON value, trimming the trace section down to just its hashes when
/// `trace_hash_only` is set.
fn report_json(report: &psys_eval::EvaluationReport, trace_hash_only: bool) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(report).context("serialize report")?;
    if trace_hash_only {
        if let Some(trace) = value.get_mut("trace").and_then(|t| t.as_object_mut()) {
            trace.retain(|k, _| k.ends_with("_hash_sha256"));
        }
    }
    Ok(value)
}

fn write_canonical<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = psys_core::stable_stringify(value)?;
    write_text(path, &(text + "\n"))
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
        }
    }
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

fn write_stdout(contents: &str) -> Result<()> {
    let mut out = std::io::stdout().lock();
    out.write_all(contents.as_bytes())?;
    out.flush()?;
    Ok(())
}
