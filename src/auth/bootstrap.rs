//! Owner bootstrap: the configured GitHub owner becomes admin on first login.

use crate::db::{models::AppUser, PortfolioStore, StoreResult};

pub const PROMOTE_ACTION: &str = "owner_bootstrap_promote";

/// Promote `user` when their login matches the configured owner. Roles are
/// only ever raised here, never lowered.
pub async fn ensure_owner_admin(
    store: &dyn PortfolioStore,
    user: AppUser,
    owner_username: Option<&str>,
) -> StoreResult<AppUser> {
    let Some(owner) = owner_username.map(str::trim).filter(|o| !o.is_empty()) else {
        return Ok(user);
    };
    if user.is_admin() || !user.login.eq_ignore_ascii_case(owner) {
        return Ok(user);
    }

    let promoted = store.promote_to_admin(user.id).await?;
    let detail = format!("promoted GitHub login '{}' to admin", promoted.login);
    store
        .record_audit_event(&promoted.github_id, PROMOTE_ACTION, &detail)
        .await?;

    tracing::info!(
        target: "audit",
        github_id = %promoted.github_id,
        login = %promoted.login,
        action = PROMOTE_ACTION,
        "owner promoted to admin"
    );

    Ok(promoted)
}
