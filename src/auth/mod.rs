//! Authentication for descriptor and resource requests
//!
//! Covers credential resolution plus the message formats for the supported
//! schemes: HTTP Basic (handled by reqwest), Digest, NTLMv2 and plain
//! session cookies.

pub mod cookie;
pub mod credentials;
pub mod digest;
pub mod ntlm;

pub use cookie::CookieSet;
pub use credentials::{resolve_password, resolve_password_with, AuthMode, Credentials};
pub use digest::{DigestChallenge, DigestState};
pub use ntlm::{ChallengeMessage, NtlmAccount};
