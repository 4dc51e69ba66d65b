/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 8/10/26
******************************************************************************/
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque signed credential.
///
/// The client only checks presence, and where the token happens to be a JWT it reads the
/// `exp` claim. `Debug` and `Display` never print the secret.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Token(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Expiry embedded in a JWT payload, if the token is one and carries `exp`.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let payload = self.0.split('.').nth(1)?;
        let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        let claim: ExpiryClaim = serde_json::from_slice(&decoded).ok()?;
        Utc.timestamp_opt(claim.exp?, 0).single()
    }

    /// `true` only when the expiry is known and already past.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token([REDACTED])")
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Access and refresh credentials. Always replaced as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access: Token,
    pub refresh: Token,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: Token::new(access),
            refresh: Token::new(refresh),
        }
    }

    /// Structural validation applied to anything read back from storage.
    pub fn is_well_formed(&self) -> bool {
        !self.access.is_blank() && !self.refresh.is_blank()
    }
}

/// Authentication flags derived from the current pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Session {
    pub is_authenticated: bool,
    pub access_expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn derive(pair: Option<&CredentialPair>, now: DateTime<Utc>) -> Self {
        match pair {
            Some(pair) => Session {
                is_authenticated: !pair.refresh.is_expired_at(now),
                access_expires_at: pair.access.expires_at(),
            },
            None => Session::anonymous(),
        }
    }
}

#[cfg(test)]
pub(crate) fn jwt_with_exp(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"token_type":"access","exp":{exp},"user_id":1}}"#));
    format!("{header}.{payload}.signature")
}
