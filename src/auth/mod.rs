//! Bearer-token authentication and refresh session management.
//!
//! Dual-token system: short-lived access tokens (15 min, stateless, RS256)
//! sent as `Authorization: Bearer`, and opaque refresh tokens (14 days,
//! database-tracked by hash) carried in an HttpOnly cookie scoped to
//! `/api/auth`. Refresh tokens rotate on every use.

mod cookie;
mod errors;
mod extractors;
mod ip;
mod service;
mod state;
mod types;

pub use cookie::{REFRESH_COOKIE_NAME, clear_refresh_cookie, get_cookie, refresh_cookie};
pub use errors::{ApiAuthError, AuthError};
pub use extractors::{Auth, ClientInfo};
pub use ip::{HasHeadersAndExtensions, extract_client_ip};
pub use service::{AuthService, unix_now};
pub use state::HasAuthBackend;
pub use types::{AuthenticatedUser, ClientMeta, IssuedTokens, RegisteredUser, TokenEnvelope};
