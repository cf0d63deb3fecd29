//! Grant state types.
//!
//! Each grant comes in two shapes:
//!
//! - A *record* (`AuthorizationRecord`, `AccessRecord`) is what a backend
//!   persists. References to other records are plain keys.
//! - A *grant* (`AuthorizationGrant`, `AccessGrant`) is what a load returns.
//!   References are resolved into owned values at load time.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Drops sub-microsecond precision, the finest `timestamptz` resolution.
///
/// Records are always built through this so every backend stores the same
/// instant.
#[must_use]
pub fn truncate_to_micros(at: OffsetDateTime) -> OffsetDateTime {
    at - Duration::nanoseconds(i64::from(at.nanosecond() % 1_000))
}

// =============================================================================
// Client
// =============================================================================

/// A registered OAuth client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Client identifier (primary key).
    pub id: String,
    /// Client secret as stored. Verification policy lives with the caller.
    pub secret: String,
    /// Registered redirect URI.
    pub redirect_uri: String,
}

impl Client {
    pub fn new(
        id: impl Into<String>,
        secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
            redirect_uri: redirect_uri.into(),
        }
    }
}

// =============================================================================
// Authorization Codes
// =============================================================================

/// Persisted authorization code row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRecord {
    pub code: String,
    pub client_id: String,
    /// Lifetime in seconds, counted from `created_at`.
    pub expires_in: i32,
    pub scope: String,
    pub redirect_uri: String,
    pub state: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// An authorization code with its client resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationGrant {
    pub code: String,
    pub client: Client,
    pub expires_in: i32,
    pub scope: String,
    pub redirect_uri: String,
    pub state: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl AuthorizationGrant {
    /// Builds the grant from its stored row and the resolved client.
    #[must_use]
    pub fn from_record(record: AuthorizationRecord, client: Client) -> Self {
        Self {
            code: record.code,
            client,
            expires_in: record.expires_in,
            scope: record.scope,
            redirect_uri: record.redirect_uri,
            state: record.state,
            created_at: record.created_at,
        }
    }

    /// The row to persist for this grant.
    #[must_use]
    pub fn to_record(&self) -> AuthorizationRecord {
        AuthorizationRecord {
            code: self.code.clone(),
            client_id: self.client.id.clone(),
            expires_in: self.expires_in,
            scope: self.scope.clone(),
            redirect_uri: self.redirect_uri.clone(),
            state: self.state.clone(),
            created_at: truncate_to_micros(self.created_at),
        }
    }

    /// Point in time after which the code should no longer be redeemed.
    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        self.created_at + Duration::seconds(i64::from(self.expires_in))
    }

    /// Advisory expiry check. The store never enforces it.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at()
    }
}

// =============================================================================
// Access Grants
// =============================================================================

/// Persisted access grant row.
///
/// `previous_access_token` and `refresh_token` are empty strings when absent,
/// matching the column layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRecord {
    pub access_token: String,
    pub client_id: String,
    pub authorization_code: String,
    pub previous_access_token: String,
    pub refresh_token: String,
    pub expires_in: i32,
    pub scope: String,
    pub redirect_uri: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl AccessRecord {
    /// Predecessor token, if this grant was produced by a rotation.
    #[must_use]
    pub fn previous(&self) -> Option<&str> {
        Some(self.previous_access_token.as_str()).filter(|token| !token.is_empty())
    }

    /// Refresh token issued alongside this grant, if any.
    #[must_use]
    pub fn refresh(&self) -> Option<&str> {
        Some(self.refresh_token.as_str()).filter(|token| !token.is_empty())
    }
}

/// An access grant with its client, authorization code and rotation chain
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub access_token: String,
    pub client: Client,
    /// The authorization code this grant was redeemed from.
    pub authorization: AuthorizationGrant,
    /// The grant this one replaced, fully resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<Box<AccessGrant>>,
    /// Empty when no refresh token was issued.
    #[serde(default)]
    pub refresh_token: String,
    pub expires_in: i32,
    pub scope: String,
    pub redirect_uri: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl AccessGrant {
    /// Builds the grant from its stored row and resolved references.
    #[must_use]
    pub fn from_record(
        record: AccessRecord,
        client: Client,
        authorization: AuthorizationGrant,
        previous: Option<AccessGrant>,
    ) -> Self {
        Self {
            access_token: record.access_token,
            client,
            authorization,
            previous: previous.map(Box::new),
            refresh_token: record.refresh_token,
            expires_in: record.expires_in,
            scope: record.scope,
            redirect_uri: record.redirect_uri,
            created_at: record.created_at,
        }
    }

    /// The row to persist for this grant.
    ///
    /// The predecessor link is taken from `previous`; the store never
    /// computes it.
    #[must_use]
    pub fn to_record(&self) -> AccessRecord {
        AccessRecord {
            access_token: self.access_token.clone(),
            client_id: self.client.id.clone(),
            authorization_code: self.authorization.code.clone(),
            previous_access_token: self
                .previous_access_token()
                .unwrap_or_default()
                .to_string(),
            refresh_token: self.refresh_token.clone(),
            expires_in: self.expires_in,
            scope: self.scope.clone(),
            redirect_uri: self.redirect_uri.clone(),
            created_at: truncate_to_micros(self.created_at),
        }
    }

    /// Token of the grant this one replaced.
    #[must_use]
    pub fn previous_access_token(&self) -> Option<&str> {
        self.previous.as_deref().map(|prev| prev.access_token.as_str())
    }

    /// Refresh token issued with this grant, if any.
    #[must_use]
    pub fn refresh(&self) -> Option<&str> {
        Some(self.refresh_token.as_str()).filter(|token| !token.is_empty())
    }

    /// Iterates the resolved predecessors, newest first.
    pub fn lineage(&self) -> Lineage<'_> {
        Lineage {
            next: self.previous.as_deref(),
        }
    }

    /// Number of grants in the chain, this one included.
    #[must_use]
    pub fn chain_len(&self) -> usize {
        1 + self.lineage().count()
    }

    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        self.created_at + Duration::seconds(i64::from(self.expires_in))
    }

    /// Advisory expiry check. The store never enforces it.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at()
    }
}

/// Iterator over an access grant's predecessors.
pub struct Lineage<'a> {
    next: Option<&'a AccessGrant>,
}

impl<'a> Iterator for Lineage<'a> {
    type Item = &'a AccessGrant;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.previous.as_deref();
        Some(current)
    }
}
