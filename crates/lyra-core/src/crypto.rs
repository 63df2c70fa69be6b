//! Canonical signer for gateway field sets.
//!
//! Signing string: the values of every `vads_*` field, in lexicographic key
//! order, each followed by `+`, then the secret key.
//! - SHA-1: lowercase hex digest of the signing string.
//! - HMAC-SHA-256: base64 of the HMAC of the signing string keyed with the
//!   same secret.
//!
//! The field set cannot hold a null value, so a missing value is always
//! signed as the empty string. Producers coerce nulls before inserting.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{CoreError, CoreResult};
use crate::types::{FieldSet, SignAlgorithm};

type HmacSha256 = Hmac<Sha256>;

/// Build the string the signature is computed over.
pub fn canonical_string(fields: &FieldSet, secret: &str) -> String {
    let mut out = String::new();
    for (_, value) in fields.signed_fields() {
        out.push_str(value);
        out.push('+');
    }
    out.push_str(secret);
    out
}

/// Sign a field set. Only `vads_*` keys take part; insertion order is irrelevant.
pub fn sign(fields: &FieldSet, algorithm: SignAlgorithm, secret: &str) -> CoreResult<String> {
    let payload = canonical_string(fields, secret);

    match algorithm {
        SignAlgorithm::Sha1 => Ok(hex::encode(Sha1::digest(payload.as_bytes()))),
        SignAlgorithm::HmacSha256 => {
            let digest = hmac_sha256(secret.as_bytes(), payload.as_bytes())?;
            Ok(BASE64.encode(digest))
        }
    }
}

/// Recompute the signature and compare it with `expected` in constant time.
///
/// SHA-1 digests are hex, so the comparison ignores case for that algorithm.
pub fn verify(
    fields: &FieldSet,
    expected: &str,
    algorithm: SignAlgorithm,
    secret: &str,
) -> CoreResult<bool> {
    let computed = sign(fields, algorithm, secret)?;
    Ok(match algorithm {
        SignAlgorithm::Sha1 => constant_time_eq(
            computed.as_bytes(),
            expected.trim().to_ascii_lowercase().as_bytes(),
        ),
        SignAlgorithm::HmacSha256 => constant_time_eq(computed.as_bytes(), expected.as_bytes()),
    })
}

/// Lowercase hex HMAC-SHA-256 of `message`, as used by REST envelopes.
pub fn hmac_sha256_hex(key: &str, message: &str) -> CoreResult<String> {
    Ok(hex::encode(hmac_sha256(key.as_bytes(), message.as_bytes())?))
}

/// Constant-time comparison of two byte slices.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> CoreResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|_| CoreError::Crypto("invalid HMAC key length".into()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}
