//! CSRF state values for the authorization redirect

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;

/// Number of random bytes behind each state value.
pub const STATE_BYTES: usize = 16;

/// Generate an opaque, URL-safe state value from 16 random bytes.
///
/// The value is bound to a browser session on `/login` and must come back
/// unchanged on `/callback`.
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_is_url_safe_base64() {
        let state = generate_state();
        // 16 bytes -> 22 base64url chars without padding
        assert_eq!(state.len(), 22);
        assert!(
            state
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "state must be URL-safe: {state}"
        );
    }

    #[test]
    fn states_are_unique() {
        let a = generate_state();
        let b = generate_state();
        assert_ne!(a, b, "two states must not collide");
    }

    #[test]
    fn state_decodes_to_full_entropy() {
        let decoded = URL_SAFE_NO_PAD.decode(generate_state()).unwrap();
        assert_eq!(decoded.len(), STATE_BYTES);
    }
}
