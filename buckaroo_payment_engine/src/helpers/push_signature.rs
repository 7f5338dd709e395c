//! # Callback signature verification
//!
//! Buckaroo signs redirect/push form payloads with a SHA1 digest over the signed fields plus the merchant secret.
//! The canonical string is built from every field whose key starts with `BRQ_`, `ADD_` or `CUST_` (excluding the
//! signature field itself), sorted by key and concatenated as `key=value` pairs with no separator. The merchant
//! secret is appended, the whole string is percent-decoded, and the SHA1 hex digest must equal the payload's
//! `BRQ_SIGNATURE` field exactly.

use std::collections::{BTreeMap, HashMap};

use sha1::{Digest, Sha1};

pub const SIGNATURE_FIELD: &str = "BRQ_SIGNATURE";

const SIGNED_PREFIXES: [&str; 3] = ["BRQ_", "ADD_", "CUST_"];

/// Verify the SHA1 signature of a callback payload against a merchant secret.
///
/// Returns `false` when the signature field is absent, or when the digest does not match exactly. Fields outside
/// the signed prefixes are ignored regardless of value.
pub fn verify_callback_signature(data: &HashMap<String, String>, secret: &str) -> bool {
    let provided = match data.get(SIGNATURE_FIELD) {
        Some(sig) => sig,
        None => return false,
    };
    expected_signature(data, secret) == *provided
}

/// The digest the gateway should have computed for this payload.
pub fn expected_signature(data: &HashMap<String, String>, secret: &str) -> String {
    // BTreeMap gives the byte-wise key ordering the signature scheme requires
    let signed: BTreeMap<&str, &str> = data
        .iter()
        .filter(|(k, _)| is_signed_field(k))
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let mut canonical = signed.into_iter().fold(String::new(), |mut acc, (k, v)| {
        acc.push_str(k);
        acc.push('=');
        acc.push_str(v);
        acc
    });
    canonical.push_str(secret);
    // Invalid percent escapes decode to replacement characters, matching the gateway's reference decoder
    let raw = String::from_utf8_lossy(&urlencoding::decode_binary(canonical.as_bytes())).into_owned();
    let digest = Sha1::digest(raw.as_bytes());
    digest.iter().fold(String::with_capacity(40), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

fn is_signed_field(key: &str) -> bool {
    SIGNED_PREFIXES.iter().any(|p| key.starts_with(p)) && !key.starts_with(SIGNATURE_FIELD)
}
