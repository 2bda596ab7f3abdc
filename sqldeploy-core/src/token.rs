//! Access token acquisition and transport encoding.
//!
//! Tokens are exchanged for the database resource scope and packed into the
//! layout SQL Server drivers accept for the access-token connection
//! attribute: a 4-byte little-endian byte count followed by the secret as
//! UTF-16LE.
//!
//! # Security
//! - Secrets live in `Zeroizing` buffers and are wiped on drop
//! - `Debug` output never includes the secret or the encoded payload
//! - Tokens are never logged

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::error::{DeployError, Result};

/// Resource scope identifying Azure SQL Database.
pub const DATABASE_SCOPE: &str = "https://database.windows.net/.default";

/// Driver connection attribute key for a pre-acquired access token.
pub const SQL_COPT_SS_ACCESS_TOKEN: i32 = 1256;

const LENGTH_PREFIX_BYTES: usize = 4;

/// Errors raised by credential providers and token encoding.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The provider could not be reached or started
    #[error("credential provider unavailable: {0}")]
    Unavailable(String),

    /// The ambient identity is not signed in
    #[error("not authenticated: {0}")]
    NotAuthenticated(String),

    /// The provider answered with something that is not a token
    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    /// An encoded payload does not follow the length-prefixed layout
    #[error("malformed token payload: {0}")]
    MalformedPayload(&'static str),
}

/// A bearer token for one connection attempt.
pub struct AccessToken {
    secret: Zeroizing<String>,
    expires_on: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Wraps a token secret and its optional expiry.
    pub fn new(secret: impl Into<String>, expires_on: Option<DateTime<Utc>>) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
            expires_on,
        }
    }

    /// Token secret. Never log this value.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Expiry reported by the provider, if any.
    pub fn expires_on(&self) -> Option<DateTime<Utc>> {
        self.expires_on
    }

    /// True when the provider-reported expiry is at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_on.is_some_and(|expiry| expiry <= now)
    }

    /// Packs the secret into the driver attribute layout.
    ///
    /// # Errors
    /// Returns [`CredentialError::MalformedPayload`] if the secret is too
    /// large for a 32-bit length prefix.
    pub fn encode(&self) -> std::result::Result<EncodedToken, CredentialError> {
        EncodedToken::encode(&self.secret)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Length-prefixed UTF-16LE token payload.
#[derive(Clone)]
pub struct EncodedToken {
    payload: Zeroizing<Vec<u8>>,
}

impl EncodedToken {
    /// Encodes `secret` as `LE u32 byte count || UTF-16LE bytes`.
    ///
    /// For a secret of `n` UTF-16 code units the payload is `4 + 2n` bytes
    /// and the prefix holds `2n`.
    ///
    /// # Example
    /// ```rust
    /// use sqldeploy_core::token::EncodedToken;
    ///
    /// let encoded = EncodedToken::encode("ab").unwrap();
    /// assert_eq!(encoded.as_bytes(), &[4, 0, 0, 0, b'a', 0, b'b', 0]);
    /// ```
    pub fn encode(secret: &str) -> std::result::Result<Self, CredentialError> {
        let units: Zeroizing<Vec<u16>> = Zeroizing::new(secret.encode_utf16().collect());
        let byte_len = units
            .len()
            .checked_mul(2)
            .ok_or(CredentialError::MalformedPayload("token too large"))?;
        let prefix = u32::try_from(byte_len)
            .map_err(|_| CredentialError::MalformedPayload("token too large"))?;

        let mut payload = Zeroizing::new(Vec::with_capacity(
            byte_len.saturating_add(LENGTH_PREFIX_BYTES),
        ));
        payload.extend_from_slice(&prefix.to_le_bytes());
        for unit in units.iter() {
            payload.extend_from_slice(&unit.to_le_bytes());
        }

        Ok(Self { payload })
    }

    /// Raw payload bytes for the driver attribute.
    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    /// Payload length in bytes, prefix included.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Never true for payloads produced by [`EncodedToken::encode`].
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Attribute key the payload is passed under.
    pub const fn attribute(&self) -> i32 {
        SQL_COPT_SS_ACCESS_TOKEN
    }

    /// Recovers the secret for drivers that take the token as text.
    ///
    /// # Errors
    /// Returns [`CredentialError::MalformedPayload`] when the prefix does not
    /// match the body or the body is not valid UTF-16.
    pub fn decode_secret(&self) -> std::result::Result<Zeroizing<String>, CredentialError> {
        let (prefix, body) = self
            .payload
            .split_first_chunk::<LENGTH_PREFIX_BYTES>()
            .ok_or(CredentialError::MalformedPayload("missing length prefix"))?;

        let declared = usize::try_from(u32::from_le_bytes(*prefix))
            .map_err(|_| CredentialError::MalformedPayload("length prefix overflow"))?;
        if declared != body.len() || body.len() % 2 != 0 {
            return Err(CredentialError::MalformedPayload(
                "length prefix does not match body",
            ));
        }

        let units: Zeroizing<Vec<u16>> = Zeroizing::new(
            body.chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect(),
        );
        String::from_utf16(&units)
            .map(Zeroizing::new)
            .map_err(|_| CredentialError::MalformedPayload("body is not UTF-16LE"))
    }
}

impl std::fmt::Debug for EncodedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedToken")
            .field("attribute", &SQL_COPT_SS_ACCESS_TOKEN)
            .field("len", &self.payload.len())
            .finish()
    }
}

/// Source of bearer tokens for a resource scope.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Requests a token for `scope`.
    async fn get_token(&self, scope: &str) -> std::result::Result<AccessToken, CredentialError>;

    /// Short provider name for logs.
    fn name(&self) -> &'static str;
}

/// Exchanges ambient identity for an encoded database token.
pub struct TokenBroker<'a> {
    provider: &'a dyn TokenProvider,
    scope: &'a str,
}

impl<'a> TokenBroker<'a> {
    /// Broker requesting [`DATABASE_SCOPE`] from `provider`.
    pub fn new(provider: &'a dyn TokenProvider) -> Self {
        Self {
            provider,
            scope: DATABASE_SCOPE,
        }
    }

    /// Overrides the requested scope.
    #[must_use]
    pub fn with_scope(mut self, scope: &'a str) -> Self {
        self.scope = scope;
        self
    }

    /// Acquires and encodes a token. Failures are never retried.
    ///
    /// # Errors
    /// Returns [`DeployError::Authentication`] when the provider fails, the
    /// token is already expired, or it cannot be encoded.
    pub async fn acquire(&self) -> Result<EncodedToken> {
        tracing::debug!(
            "Requesting access token from {} for scope {}",
            self.provider.name(),
            self.scope
        );

        let token = self.provider.get_token(self.scope).await.map_err(|e| {
            DeployError::authentication(
                format!("{} could not provide a token", self.provider.name()),
                e,
            )
        })?;

        if token.is_expired_at(Utc::now()) {
            return Err(DeployError::authentication_rejected(format!(
                "{} returned an expired token",
                self.provider.name()
            )));
        }

        let encoded = token
            .encode()
            .map_err(|e| DeployError::authentication("Token could not be encoded", e))?;

        if let Some(expiry) = token.expires_on() {
            tracing::debug!("Access token valid until {}", expiry);
        }

        Ok(encoded)
    }
}
