use serde::{Deserialize, Serialize};

/// Bearer token claims.
///
/// The minimal set the services rely on: who (`sub`), who minted it (`iss`),
/// who it is for (`aud`), and the validity window (`iat`/`exp`, seconds since
/// the Unix epoch, as standard JWT registered claims).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject / principal identifier.
    pub sub: String,

    /// Issuer.
    pub iss: String,

    /// Audience.
    pub aud: String,

    /// Issued-at (Unix seconds).
    pub iat: i64,

    /// Expiration (Unix seconds).
    pub exp: i64,
}
