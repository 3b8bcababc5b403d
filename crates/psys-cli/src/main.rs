// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

mod commands;
mod format;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Exit code for a passing evaluation.
const EXIT_OK: i32 = 0;
/// Exit code reserved for usage / argument errors.
const EXIT_USAGE_ERROR: i32 = 1;
/// Exit code for a failing evaluation (errors, or warnings under `--strict`).
const EXIT_FAIL: i32 = 2;

/// One-pass deterministic evaluation of a policy/contracts corpus, with an optional signed
/// receipt.
#[derive(Parser, Debug)]
#[command(name = "psys", version, about = "Deterministic policy/contracts evaluator")]
pub struct Cli {
    /// Path to the corpus index document.
    pub index_path: PathBuf,

    /// Promote warnings to failures and run the strict-only domain-completion gate.
    #[arg(long)]
    pub strict: bool,

    /// Profile to select from `profiles.v1.json`. Defaults to the profile the document declares.
    #[arg(long)]
    pub profile: Option<String>,

    /// Date used to resolve waiver expiry, as `YYYY-MM-DD`. Defaults to today.
    #[arg(long = "as_of", value_name = "YYYY-MM-DD", value_parser = parse_as_of)]
    pub as_of: Option<NaiveDate>,

    /// Build and attach the full explain-trace views, proof graph, and safety envelope.
    #[arg(long)]
    pub trace: bool,

    /// Like `--trace`, but the report's trace section retains only view hashes, not the bodies.
    #[arg(
        long = "trace_hash_only",
        conflicts_with_all = [
            "receipt_out", "receipt_dsse_out", "receipt_dsse_key", "receipt_dsse_payload_type",
            "receipt_dsse_keyid", "receipt_dsse_verify", "receipt_dsse_pub", "receipt_bundle_out",
        ],
    )]
    pub trace_hash_only: bool,

    /// Write a Markdown summary to this path.
    #[arg(long, value_name = "md-path")]
    pub report: Option<PathBuf>,

    /// Write the full report JSON to this path.
    #[arg(long = "out-json", value_name = "path")]
    pub out_json: Option<PathBuf>,

    /// Write the full report JSON to stdout.
    #[arg(long = "stdout-json")]
    pub stdout_json: bool,

    /// Suppress the default `PASS|FAIL errors=N warnings=N` summary line.
    #[arg(long)]
    pub quiet: bool,

    /// Write the assembled receipt JSON to this path.
    #[arg(long = "receipt-out", value_name = "path")]
    pub receipt_out: Option<PathBuf>,

    /// Write a DSSE envelope wrapping the receipt to this path. Requires `--receipt-dsse-key`.
    #[arg(long = "receipt-dsse-out", value_name = "path", requires = "receipt_dsse_key")]
    pub receipt_dsse_out: Option<PathBuf>,

    /// PKCS#8 PEM-encoded Ed25519 private key to sign the receipt with.
    #[arg(long = "receipt-dsse-key", value_name = "pem")]
    pub receipt_dsse_key: Option<PathBuf>,

    /// DSSE `payloadType` to embed in the envelope. Defaults to `application/vnd.psys.receipt+json`.
    #[arg(long = "receipt-dsse-payloadType", value_name = "media-type", requires = "receipt_dsse_out")]
    pub receipt_dsse_payload_type: Option<String>,

    /// Expected signing-key id (`sha256:...`); the run fails if it does not match the key's
    /// derived keyid.
    #[arg(long = "receipt-dsse-keyid", value_name = "sha256:...", requires = "receipt_dsse_out")]
    pub receipt_dsse_keyid: Option<String>,

    /// Self-verify the DSSE envelope immediately after signing.
    #[arg(long = "receipt-dsse-verify", requires = "receipt_dsse_out")]
    pub receipt_dsse_verify: bool,

    /// Public key to self-verify against. Defaults to the public half of `--receipt-dsse-key`.
    #[arg(long = "receipt-dsse-pub", value_name = "pem", requires = "receipt_dsse_verify")]
    pub receipt_dsse_pub: Option<PathBuf>,

    /// Write a single-file proof bundle (receipt, DSSE envelope, safety envelope, public key) to
    /// this path. Requires `--trace` and `--receipt-dsse-out`.
    #[arg(long = "receipt-bundle-out", value_name = "path", requires_all = ["trace", "receipt_dsse_out"])]
    pub receipt_bundle_out: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,
}

fn parse_as_of(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid --as_of date {s:?}: {e}"))
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            e.print().ok();
            std::process::exit(if e.use_stderr() { EXIT_USAGE_ERROR } else { EXIT_OK });
        }
    };

    let filter = if cli.debug {
        EnvFilter::new("psys=debug")
    } else {
        EnvFilter::new("psys=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let code = match commands::run(&cli) {
        Ok(true) => EXIT_OK,
        Ok(false) => EXIT_FAIL,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_FAIL
        }
    };
    std::process::exit(code);
}
