//! NTLMv2 message construction (MS-NLMP)
//!
//! Only the client side of connection-oriented NTLM over HTTP is covered:
//! a NEGOTIATE message, decoding the server CHALLENGE, and an AUTHENTICATE
//! message carrying NTLMv2 and LMv2 responses. No signing or sealing.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use md4::{Digest, Md4};
use md5::Md5;

use crate::errors::{AuthError, AuthResult};

type HmacMd5 = Hmac<Md5>;

const SCHEME: &str = "NTLM";
const SIGNATURE: &[u8; 8] = b"NTLMSSP\0";

const NEGOTIATE_UNICODE: u32 = 0x0000_0001;
const REQUEST_TARGET: u32 = 0x0000_0004;
const NEGOTIATE_NTLM: u32 = 0x0000_0200;
const NEGOTIATE_ALWAYS_SIGN: u32 = 0x0000_8000;
const NEGOTIATE_EXTENDED_SESSIONSECURITY: u32 = 0x0008_0000;
const NEGOTIATE_TARGET_INFO: u32 = 0x0080_0000;
const NEGOTIATE_128: u32 = 0x2000_0000;
const NEGOTIATE_56: u32 = 0x8000_0000;

const CLIENT_FLAGS: u32 = NEGOTIATE_UNICODE
    | REQUEST_TARGET
    | NEGOTIATE_NTLM
    | NEGOTIATE_ALWAYS_SIGN
    | NEGOTIATE_EXTENDED_SESSIONSECURITY
    | NEGOTIATE_TARGET_INFO
    | NEGOTIATE_128
    | NEGOTIATE_56;

/// AV pair id of the server timestamp in the target info block
const MSV_AV_TIMESTAMP: u16 = 7;
const MSV_AV_EOL: u16 = 0;

/// Seconds between 1601-01-01 and 1970-01-01
const FILETIME_EPOCH_OFFSET_SECS: u64 = 11_644_473_600;

const AUTHENTICATE_HEADER_LEN: usize = 64;

/// Account used for the handshake, split from `DOMAIN\user`
#[derive(Clone, PartialEq, Eq)]
pub struct NtlmAccount {
    pub domain: String,
    pub user: String,
    password: String,
}

impl NtlmAccount {
    pub fn new(qualified_user: &str, password: &str) -> Self {
        let (domain, user) = match qualified_user.split_once('\\') {
            Some((domain, user)) => (domain.to_string(), user.to_string()),
            None => (String::new(), qualified_user.to_string()),
        };
        Self {
            domain,
            user,
            password: password.to_string(),
        }
    }
}

impl std::fmt::Debug for NtlmAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NtlmAccount")
            .field("domain", &self.domain)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Decoded CHALLENGE message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeMessage {
    pub flags: u32,
    pub server_challenge: [u8; 8],
    pub target_info: Vec<u8>,
}

impl ChallengeMessage {
    /// Decodes the base64 payload of a `WWW-Authenticate: NTLM <payload>` header
    pub fn from_base64(payload: &str) -> AuthResult<Self> {
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| malformed(format!("invalid base64: {}", e)))?;
        Self::decode(&bytes)
    }

    pub fn decode(bytes: &[u8]) -> AuthResult<Self> {
        if bytes.len() < 32 || &bytes[..8] != SIGNATURE {
            return Err(malformed("not an NTLMSSP message".to_string()));
        }
        if read_u32(bytes, 8) != Some(2) {
            return Err(malformed("expected a CHALLENGE message".to_string()));
        }
        let flags = read_u32(bytes, 20).unwrap_or_default();
        let mut server_challenge = [0u8; 8];
        server_challenge.copy_from_slice(&bytes[24..32]);

        let target_info = match (read_u16(bytes, 40), read_u32(bytes, 44)) {
            (Some(len), Some(offset)) if len > 0 => {
                let start = offset as usize;
                bytes
                    .get(start..start + len as usize)
                    .ok_or_else(|| malformed("target info out of bounds".to_string()))?
                    .to_vec()
            }
            _ => Vec::new(),
        };

        Ok(Self {
            flags,
            server_challenge,
            target_info,
        })
    }

    /// Server-supplied timestamp from the target info, if any
    fn timestamp(&self) -> Option<u64> {
        let info = &self.target_info;
        let mut offset = 0;
        while let (Some(id), Some(len)) = (read_u16(info, offset), read_u16(info, offset + 2)) {
            let value = info.get(offset + 4..offset + 4 + len as usize)?;
            match id {
                MSV_AV_EOL => return None,
                MSV_AV_TIMESTAMP if value.len() == 8 => {
                    return value.try_into().ok().map(u64::from_le_bytes)
                }
                _ => offset += 4 + len as usize,
            }
        }
        None
    }
}

fn malformed(reason: String) -> AuthError {
    AuthError::MalformedChallenge {
        scheme: SCHEME,
        reason,
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    bytes
        .get(offset..offset + 2)
        .and_then(|b| b.try_into().ok())
        .map(u16::from_le_bytes)
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    bytes
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
}

/// NEGOTIATE message announcing the flags we support
pub fn negotiate_message() -> Vec<u8> {
    let mut message = Vec::with_capacity(32);
    message.extend_from_slice(SIGNATURE);
    message.extend_from_slice(&1u32.to_le_bytes());
    message.extend_from_slice(&CLIENT_FLAGS.to_le_bytes());
    // empty domain and workstation security buffers
    message.extend_from_slice(&[0u8; 16]);
    message
}

/// AUTHENTICATE message answering `challenge` with a fresh client challenge
pub fn authenticate_message(account: &NtlmAccount, challenge: &ChallengeMessage) -> AuthResult<Vec<u8>> {
    let client_challenge = rand::random::<[u8; 8]>();
    let timestamp = challenge.timestamp().unwrap_or_else(filetime_now);
    build_authenticate(account, challenge, client_challenge, timestamp)
}

fn build_authenticate(
    account: &NtlmAccount,
    challenge: &ChallengeMessage,
    client_challenge: [u8; 8],
    timestamp: u64,
) -> AuthResult<Vec<u8>> {
    let response_key = ntowf_v2(account)?;

    let mut blob = Vec::with_capacity(32 + challenge.target_info.len());
    blob.extend_from_slice(&[0x01, 0x01, 0x00, 0x00]);
    blob.extend_from_slice(&[0u8; 4]);
    blob.extend_from_slice(&timestamp.to_le_bytes());
    blob.extend_from_slice(&client_challenge);
    blob.extend_from_slice(&[0u8; 4]);
    blob.extend_from_slice(&challenge.target_info);
    blob.extend_from_slice(&[0u8; 4]);

    let nt_proof = hmac_md5(&response_key, &[&challenge.server_challenge, &blob])?;
    let mut nt_response = nt_proof.to_vec();
    nt_response.extend_from_slice(&blob);

    let lm_response = lmv2_response(&response_key, &challenge.server_challenge, &client_challenge)?;

    let domain = utf16le(&account.domain);
    let user = utf16le(&account.user);
    let workstation: Vec<u8> = Vec::new();
    let session_key: Vec<u8> = Vec::new();

    let flags = (challenge.flags & CLIENT_FLAGS) | NEGOTIATE_UNICODE | NEGOTIATE_NTLM;

    let payloads: [&[u8]; 6] = [
        &lm_response,
        &nt_response,
        &domain,
        &user,
        &workstation,
        &session_key,
    ];

    let mut header = Vec::with_capacity(AUTHENTICATE_HEADER_LEN);
    header.extend_from_slice(SIGNATURE);
    header.extend_from_slice(&3u32.to_le_bytes());

    let mut payload = Vec::new();
    for field in payloads {
        let offset = AUTHENTICATE_HEADER_LEN + payload.len();
        let len = u16::try_from(field.len())
            .map_err(|_| malformed("authenticate field too large".to_string()))?;
        header.extend_from_slice(&len.to_le_bytes());
        header.extend_from_slice(&len.to_le_bytes());
        header.extend_from_slice(&(offset as u32).to_le_bytes());
        payload.extend_from_slice(field);
    }
    header.extend_from_slice(&flags.to_le_bytes());

    header.extend_from_slice(&payload);
    Ok(header)
}

fn filetime_now() -> u64 {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (since_epoch.as_secs() + FILETIME_EPOCH_OFFSET_SECS) * 10_000_000
        + u64::from(since_epoch.subsec_nanos() / 100)
}

fn utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// NTOWFv1: MD4 of the UTF-16LE password
fn nt_hash(password: &str) -> [u8; 16] {
    Md4::digest(utf16le(password)).into()
}

/// NTOWFv2: HMAC-MD5 keyed by the NT hash over upper(user) + domain
fn ntowf_v2(account: &NtlmAccount) -> AuthResult<[u8; 16]> {
    let identity = utf16le(&format!("{}{}", account.user.to_uppercase(), account.domain));
    hmac_md5(&nt_hash(&account.password), &[&identity])
}

fn lmv2_response(
    response_key: &[u8; 16],
    server_challenge: &[u8; 8],
    client_challenge: &[u8; 8],
) -> AuthResult<Vec<u8>> {
    let mut response = hmac_md5(response_key, &[server_challenge, client_challenge])?.to_vec();
    response.extend_from_slice(client_challenge);
    Ok(response)
}

fn hmac_md5(key: &[u8], parts: &[&[u8]]) -> AuthResult<[u8; 16]> {
    let mut mac = HmacMd5::new_from_slice(key)
        .map_err(|e| malformed(format!("HMAC key rejected: {}", e)))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().into())
}

/// `Authorization` header value for an NTLM message
pub fn header_value(message: &[u8]) -> String {
    format!("{} {}", SCHEME, STANDARD.encode(message))
}

/// Base64 payload of an `NTLM <payload>` challenge header, if this is one
pub fn challenge_payload(header: &str) -> Option<&str> {
    let header = header.trim();
    let scheme = header.get(..SCHEME.len())?;
    if !scheme.eq_ignore_ascii_case(SCHEME) {
        return None;
    }
    let payload = header[SCHEME.len()..].trim();
    (!payload.is_empty()).then_some(payload)
}
