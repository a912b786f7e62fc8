//! GitHub login, signed sessions and the admin gate.

pub mod bootstrap;
pub mod extract;
pub mod github;
pub mod redirect;
pub mod session;

pub use extract::{AdminUser, SessionUser};
pub use github::{GithubOAuth, OAuthError, OAuthProvider};
pub use session::SessionKeys;
