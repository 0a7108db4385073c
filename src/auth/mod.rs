//! JWT cookie authentication for the three conference roles.
//!
//! Dual-token system: short-lived access tokens (15 min, stateless) and
//! long-lived refresh tokens (7 days, one hashed record per email). Refresh
//! rotates both tokens; replaying a rotated-away refresh token revokes the
//! session.

mod cookie;
mod errors;
mod extractors;
mod ip;
pub mod session;
mod state;
mod types;

pub use cookie::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, SessionCookies, append_cleared_session,
    auth_cookie, clear_cookie, get_cookie,
};
pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::{AnyRoleAuth, ChairAuth, UserAuth};
pub use ip::{ClientIpSource, extract_client_ip};
pub use session::{SessionError, end_session, issue_session, refresh_session};
pub use state::HasAuthBackend;
pub use types::{IdentityStore, Principal, Role};
