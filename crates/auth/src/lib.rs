//! `stockline-auth` — the trust boundary.
//!
//! Issues and validates HS256 bearer tokens carrying an identity, issuer,
//! audience and expiry. Intentionally decoupled from HTTP: the API layer
//! extracts the bearer string, this crate decides whether it is trustworthy.

pub mod claims;
pub mod token;

pub use claims::Claims;
pub use token::{TokenError, TokenService};
