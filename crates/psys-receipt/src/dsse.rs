// SPDX-License-Identifier: MIT OR Apache-2.0
//! DSSE signing and verification (§4.16): PAE encoding, Ed25519 over the raw PAE bytes (no
//! intermediate hash), and keyid derivation from the SPKI DER of the public key.
//!
//! Grounded on the `GlobalSushrut-PARVYOM-metanode` example repo's `crypto-primitives` crate,
//! which signs/verifies with the same `ed25519_dalek::{SigningKey, VerifyingKey, Signer,
//! Verifier}` shape; PEM/DER key encoding uses `ed25519-dalek`'s `pkcs8` feature rather than a
//! hand-rolled ASN.1 writer, since the donor crate has no real Ed25519 dependency to copy that
//! part from.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ed25519_dalek::pkcs8::{DecodePrivateKey, EncodePublicKey, LineEnding};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use psys_error::{ErrorCode, PsysError};
use serde::{Deserialize, Serialize};

/// One DSSE signature entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DsseSignature {
    /// `"sha256:" + hex(sha256(spki_der(public_key)))`.
    pub keyid: String,
    /// Base64 of the raw Ed25519 signature bytes.
    pub sig: String,
}

/// A signed DSSE envelope wrapping the receipt bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DsseEnvelope {
    /// Media type of the wrapped payload.
    #[serde(rename = "payloadType")]
    pub payload_type: String,
    /// Base64 of the raw payload bytes.
    pub payload: String,
    /// Signatures over the PAE encoding of `(payloadType, payload)`.
    pub signatures: Vec<DsseSignature>,
}

/// Builds the DSSE v1 Pre-Authentication Encoding of `(payload_type, payload)`:
/// `"DSSEv1 " || len(payloadType) || " " || payloadType || " " || len(payload) || " " || payload`,
/// all lengths ASCII decimal and the payload included byte-exact (no re-encoding).
#[must_use]
pub fn pae(payload_type: &str, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload_type.len() + payload.len() + 32);
    out.extend_from_slice(b"DSSEv1 ");
    out.extend_from_slice(payload_type.len().to_string().as_bytes());
    out.push(b' ');
    out.extend_from_slice(payload_type.as_bytes());
    out.push(b' ');
    out.extend_from_slice(payload.len().to_string().as_bytes());
    out.push(b' ');
    out.extend_from_slice(payload);
    out
}

/// Derives `"sha256:" + hex(sha256(spki_der(public_key)))`.
///
/// # Errors
///
/// Returns [`PsysError`] if the public key cannot be encoded to SPKI DER (never happens for a
/// valid [`VerifyingKey`]).
pub fn derive_keyid(public_key: &VerifyingKey) -> Result<String, PsysError> {
    let der = public_key
        .to_public_key_der()
        .map_err(|e| PsysError::new(ErrorCode::ReceiptEnvelopeMalformed, format!("cannot encode public key to SPKI DER: {e}")))?;
    Ok(format!("sha256:{}", psys_core::sha256_hex(der.as_bytes())))
}

/// Parses a PKCS#8 PEM-encoded Ed25519 private key.
///
/// # Errors
///
/// Returns [`PsysError`] if `pem` is not a valid PKCS#8 Ed25519 private key.
pub fn signing_key_from_pem(pem: &str) -> Result<SigningKey, PsysError> {
    SigningKey::from_pkcs8_pem(pem)
        .map_err(|e| PsysError::new(ErrorCode::ReceiptEnvelopeMalformed, format!("invalid PKCS#8 Ed25519 private key: {e}")))
}

/// Renders a public key as PKCS#8 SPKI PEM, for embedding in a proof bundle.
///
/// # Errors
///
/// Returns [`PsysError`] if PEM encoding fails.
pub fn public_key_to_pem(public_key: &VerifyingKey) -> Result<String, PsysError> {
    public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| PsysError::new(ErrorCode::ReceiptEnvelopeMalformed, format!("cannot encode public key to PEM: {e}")))
}

/// Signs `payload` under `payload_type`, producing a single-signature DSSE envelope.
///
/// `caller_keyid`, if given, must equal the signing key's derived keyid
/// ([`ErrorCode::ReceiptKeyidMismatch`] otherwise). `receipt_verifier_keyid`, if the receipt being
/// signed carries a `verifier.keyid`, must likewise match
/// ([`ErrorCode::ReceiptVerifierKeyidMismatch`] otherwise).
///
/// # Errors
///
/// Returns [`PsysError`] on a keyid mismatch or SPKI DER encoding failure.
pub fn sign(
    payload_type: &str,
    payload: &[u8],
    signing_key: &SigningKey,
    caller_keyid: Option<&str>,
    receipt_verifier_keyid: Option<&str>,
) -> Result<DsseEnvelope, PsysError> {
    let derived = derive_keyid(&signing_key.verifying_key())?;
    if let Some(supplied) = caller_keyid {
        if supplied != derived {
            return Err(PsysError::new(ErrorCode::ReceiptKeyidMismatch, "supplied keyid does not match the signing key's derived keyid")
                .with_context("supplied", supplied)
                .with_context("derived", &derived));
        }
    }
    if let Some(expected) = receipt_verifier_keyid {
        if expected != derived {
            return Err(PsysError::new(
                ErrorCode::ReceiptVerifierKeyidMismatch,
                "receipt verifier.keyid does not match the signing key's derived keyid",
            )
            .with_context("verifier_keyid", expected)
            .with_context("derived", &derived));
        }
    }

    let pae_bytes = pae(payload_type, payload);
    let signature: Signature = signing_key.sign(&pae_bytes);
    Ok(DsseEnvelope {
        payload_type: payload_type.to_string(),
        payload: BASE64.encode(payload),
        signatures: vec![DsseSignature { keyid: derived, sig: BASE64.encode(signature.to_bytes()) }],
    })
}

/// Recomputes the PAE from `envelope` and verifies every attached signature against
/// `public_key`. Fails closed: any signature that fails to verify is an error, not a partial
/// success.
///
/// # Errors
///
/// Returns [`PsysError`] with [`ErrorCode::ReceiptEnvelopeMalformed`] if `payload`/`sig` is not
/// valid base64 or the wrong length, or [`ErrorCode::ReceiptSelfVerifyFailed`] if a signature does
/// not verify.
pub fn verify(envelope: &DsseEnvelope, public_key: &VerifyingKey) -> Result<(), PsysError> {
    let payload = BASE64
        .decode(&envelope.payload)
        .map_err(|e| PsysError::new(ErrorCode::ReceiptEnvelopeMalformed, format!("payload is not valid base64: {e}")))?;
    let pae_bytes = pae(&envelope.payload_type, &payload);

    if envelope.signatures.is_empty() {
        return Err(PsysError::new(ErrorCode::ReceiptSelfVerifyFailed, "envelope carries no signatures"));
    }
    for sig in &envelope.signatures {
        let raw = BASE64
            .decode(&sig.sig)
            .map_err(|e| PsysError::new(ErrorCode::ReceiptEnvelopeMalformed, format!("signature is not valid base64: {e}")))?;
        let signature = Signature::from_slice(&raw)
            .map_err(|e| PsysError::new(ErrorCode::ReceiptEnvelopeMalformed, format!("signature is not 64 bytes: {e}")))?;
        public_key
            .verify(&pae_bytes, &signature)
            .map_err(|e| PsysError::new(ErrorCode::ReceiptSelfVerifyFailed, format!("signature {} did not verify: {e}", sig.keyid)).with_context("keyid", &sig.keyid))?;
    }
    Ok(())
}
