//! HTTP Basic credentials.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Parse an `Authorization: Basic <base64(user:pass)>` header value.
    ///
    /// Returns `None` for any other scheme or a malformed payload.
    pub fn from_basic_header(value: &str) -> Option<Self> {
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// Configured username → password table.
#[derive(Debug, Clone, Default)]
pub struct UserTable {
    users: FxHashMap<String, String>,
}

impl UserTable {
    pub fn new(users: FxHashMap<String, String>) -> Self {
        Self { users }
    }

    pub fn verify(&self, credentials: &Credentials) -> bool {
        self.users
            .get(&credentials.username)
            .is_some_and(|expected| {
                constant_time_eq(credentials.password.as_bytes(), expected.as_bytes())
            })
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (&left, &right) in a.iter().zip(b.iter()) {
        diff |= left ^ right;
    }
    diff == 0
}
