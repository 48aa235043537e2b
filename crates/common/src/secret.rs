//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for bearer tokens and any other
//! credential material that passes through the services.
//!
//! `SecretString` implements `Debug` with redaction, so a struct that derives
//! `Debug` while holding one can be logged safely. The inner value is
//! zeroized on drop and is only reachable through `expose_secret()`.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct Presented {
//!     scheme: String,
//!     credential: SecretString,
//! }
//!
//! let presented = Presented {
//!     scheme: "Bearer".to_string(),
//!     credential: SecretString::from("eyJhbGciOi..."),
//! };
//!
//! assert!(!format!("{presented:?}").contains("eyJhbGciOi"));
//! assert_eq!(presented.credential.expose_secret(), "eyJhbGciOi...");
//! ```

pub use secrecy::{ExposeSecret, SecretString};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::from("eyJ.payload.sig");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("payload"));
    }

    #[test]
    fn test_expose_secret_returns_inner_value() {
        let secret = SecretString::from("header.payload.signature");
        assert_eq!(secret.expose_secret(), "header.payload.signature");
    }

    #[test]
    fn test_clone_keeps_value() {
        let secret = SecretString::from("cloneable");
        let cloned = secret.clone();
        assert_eq!(cloned.expose_secret(), "cloneable");
    }
}
