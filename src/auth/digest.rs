//! HTTP Digest access authentication (RFC 2617, MD5 and MD5-sess, qop=auth)
//!
//! The first challenge received is kept so later requests can authorize
//! preemptively; the nonce count increases with every use of the same nonce.

use md5::{Digest, Md5};

use crate::errors::{AuthError, AuthResult};

const SCHEME: &str = "Digest";

/// Hash variant requested by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Md5,
    Md5Sess,
}

impl DigestAlgorithm {
    fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Md5Sess => "MD5-sess",
        }
    }
}

/// Parsed `WWW-Authenticate: Digest ...` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    pub algorithm: DigestAlgorithm,
    /// Whether the server offered `qop=auth`; `false` means legacy RFC 2069 digest
    pub qop_auth: bool,
}

impl DigestChallenge {
    /// Parses a full header value, including the leading `Digest` token
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the header is not a Digest challenge, lacks a
    /// nonce, or asks for an algorithm or qop other than MD5/auth.
    pub fn parse(header: &str) -> AuthResult<Self> {
        let header = header.trim();
        let params = header
            .get(..SCHEME.len())
            .filter(|scheme| scheme.eq_ignore_ascii_case(SCHEME))
            .map(|_| &header[SCHEME.len()..])
            .ok_or_else(|| malformed("not a Digest challenge"))?;

        let mut realm = None;
        let mut nonce = None;
        let mut opaque = None;
        let mut algorithm = DigestAlgorithm::Md5;
        let mut qop = None;

        for (key, value) in parse_auth_params(params) {
            match key.as_str() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "opaque" => opaque = Some(value),
                "qop" => qop = Some(value),
                "algorithm" => {
                    algorithm = match value.to_ascii_lowercase().as_str() {
                        "md5" => DigestAlgorithm::Md5,
                        "md5-sess" => DigestAlgorithm::Md5Sess,
                        _ => {
                            return Err(AuthError::UnsupportedDigest {
                                what: "algorithm",
                                value,
                            })
                        }
                    }
                }
                _ => {}
            }
        }

        let qop_auth = match qop {
            None => false,
            Some(options) => {
                if options
                    .split(',')
                    .any(|option| option.trim().eq_ignore_ascii_case("auth"))
                {
                    true
                } else {
                    return Err(AuthError::UnsupportedDigest {
                        what: "qop",
                        value: options,
                    });
                }
            }
        };

        Ok(Self {
            realm: realm.unwrap_or_default(),
            nonce: nonce.ok_or_else(|| malformed("missing nonce"))?,
            opaque,
            algorithm,
            qop_auth,
        })
    }
}

fn malformed(reason: &str) -> AuthError {
    AuthError::MalformedChallenge {
        scheme: SCHEME,
        reason: reason.to_string(),
    }
}

/// A challenge plus the nonce count used against it
#[derive(Debug, Clone)]
pub struct DigestState {
    challenge: DigestChallenge,
    nonce_count: u32,
}

impl DigestState {
    pub fn new(challenge: DigestChallenge) -> Self {
        Self {
            challenge,
            nonce_count: 0,
        }
    }

    /// Builds the next `Authorization` header value for a request
    pub fn authorization(&mut self, username: &str, password: &str, method: &str, uri: &str) -> String {
        self.nonce_count += 1;
        let cnonce = format!("{:016x}", rand::random::<u64>());
        self.authorization_with_cnonce(username, password, method, uri, &cnonce)
    }

    fn authorization_with_cnonce(
        &self,
        username: &str,
        password: &str,
        method: &str,
        uri: &str,
        cnonce: &str,
    ) -> String {
        let challenge = &self.challenge;
        let nc = format!("{:08x}", self.nonce_count);

        let mut ha1 = md5_hex(&format!("{}:{}:{}", username, challenge.realm, password));
        if challenge.algorithm == DigestAlgorithm::Md5Sess {
            ha1 = md5_hex(&format!("{}:{}:{}", ha1, challenge.nonce, cnonce));
        }
        let ha2 = md5_hex(&format!("{}:{}", method, uri));

        let response = if challenge.qop_auth {
            md5_hex(&format!(
                "{}:{}:{}:{}:auth:{}",
                ha1, challenge.nonce, nc, cnonce, ha2
            ))
        } else {
            md5_hex(&format!("{}:{}:{}", ha1, challenge.nonce, ha2))
        };

        let mut header = format!(
            r#"Digest username="{}", realm="{}", nonce="{}", uri="{}", response="{}", algorithm={}"#,
            username,
            challenge.realm,
            challenge.nonce,
            uri,
            response,
            challenge.algorithm.as_str()
        );
        if let Some(opaque) = &challenge.opaque {
            header.push_str(&format!(r#", opaque="{}""#, opaque));
        }
        if challenge.qop_auth {
            header.push_str(&format!(r#", qop=auth, nc={}, cnonce="{}""#, nc, cnonce));
        }
        header
    }
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", Md5::digest(input.as_bytes()))
}

/// Splits `key=value, key="quoted, value"` lists; keys are lowercased
pub(crate) fn parse_auth_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}
        let key: String = std::iter::from_fn(|| chars.next_if(|c| *c != '=' && *c != ','))
            .collect();
        if key.trim().is_empty() {
            if chars.next().is_none() {
                break;
            }
            continue;
        }
        if chars.next_if_eq(&'=').is_none() {
            continue;
        }
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let mut value = String::new();
        if chars.next_if_eq(&'"').is_some() {
            while let Some(c) = chars.next() {
                match c {
                    '\\' => value.extend(chars.next()),
                    '"' => break,
                    _ => value.push(c),
                }
            }
        } else {
            value.extend(std::iter::from_fn(|| chars.next_if(|c| *c != ',')));
            value = value.trim().to_string();
        }
        params.push((key.trim().to_ascii_lowercase(), value));
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 2617 section 3.5
    const RFC_CHALLENGE: &str = r#"Digest realm="testrealm@host.com", qop="auth,auth-int", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c403ebaf9f0171e9517f40e41""#;

    #[test]
    fn test_parse_rfc_challenge() {
        let challenge = DigestChallenge::parse(RFC_CHALLENGE).unwrap();
        assert_eq!(challenge.realm, "testrealm@host.com");
        assert_eq!(challenge.nonce, "dcd98b7102dd2f0e8b11d0f600bfb0c093");
        assert_eq!(
            challenge.opaque.as_deref(),
            Some("5ccc069c403ebaf9f0171e9517f40e41")
        );
        assert_eq!(challenge.algorithm, DigestAlgorithm::Md5);
        assert!(challenge.qop_auth);
    }

    #[test]
    fn test_rfc_response_value() {
        let mut state = DigestState::new(DigestChallenge::parse(RFC_CHALLENGE).unwrap());
        state.nonce_count = 1;
        let header = state.authorization_with_cnonce(
            "Mufasa",
            "Circle Of Life",
            "GET",
            "/dir/index.html",
            "0a4f113b",
        );
        assert!(header.contains(r#"response="6629fae49393a05397450978507c4ef1""#));
        assert!(header.contains("nc=00000001"));
        assert!(header.contains(r#"cnonce="0a4f113b""#));
        assert!(header.contains(r#"opaque="5ccc069c403ebaf9f0171e9517f40e41""#));
    }

    #[test]
    fn test_nonce_count_increments() {
        let mut state = DigestState::new(DigestChallenge::parse(RFC_CHALLENGE).unwrap());
        let first = state.authorization("u", "p", "GET", "/a");
        let second = state.authorization("u", "p", "GET", "/a");
        assert!(first.contains("nc=00000001"));
        assert!(second.contains("nc=00000002"));
    }

    #[test]
    fn test_legacy_challenge_without_qop() {
        let challenge = DigestChallenge::parse(r#"digest realm="r", nonce="n""#).unwrap();
        assert!(!challenge.qop_auth);
        let mut state = DigestState::new(challenge);
        let header = state.authorization("u", "p", "GET", "/x");
        assert!(!header.contains("qop="));
        assert!(!header.contains("cnonce"));
    }

    #[test]
    fn test_rejects_unsupported_parameters() {
        assert!(matches!(
            DigestChallenge::parse(r#"Digest realm="r", nonce="n", algorithm=SHA-256"#),
            Err(AuthError::UnsupportedDigest { what: "algorithm", .. })
        ));
        assert!(matches!(
            DigestChallenge::parse(r#"Digest realm="r", nonce="n", qop="auth-int""#),
            Err(AuthError::UnsupportedDigest { what: "qop", .. })
        ));
        assert!(matches!(
            DigestChallenge::parse(r#"Digest realm="r""#),
            Err(AuthError::MalformedChallenge { .. })
        ));
        assert!(DigestChallenge::parse(r#"Basic realm="r""#).is_err());
    }

    #[test]
    fn test_parse_auth_params_handles_quotes_and_escapes() {
        let params = parse_auth_params(r#" Realm="a, b", nonce=xyz ,opaque="q\"t""#);
        assert_eq!(
            params,
            vec![
                ("realm".to_string(), "a, b".to_string()),
                ("nonce".to_string(), "xyz".to_string()),
                ("opaque".to_string(), "q\"t".to_string()),
            ]
        );
    }
}
