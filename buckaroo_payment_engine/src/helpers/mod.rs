mod auth_header;
mod push_signature;

pub use auth_header::{body_digest, canonical_url, generate_nonce, AuthHeader};
pub use push_signature::{expected_signature, verify_callback_signature, SIGNATURE_FIELD};
