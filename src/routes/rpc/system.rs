use axum::extract::State;

use super::{ok, Rpc, RpcInput};
use crate::auth::AdminUser;
use crate::error::AppError;
use crate::notify::{Delivery, Notification};
use crate::state::AppState;
use crate::validation::Validate;

/// system.notifyOwner
pub async fn notify_owner(
    State(state): State<AppState>,
    _admin: AdminUser,
    RpcInput(notification): RpcInput<Notification>,
) -> Result<Rpc<Delivery>, AppError> {
    notification.validate()?;
    Ok(ok(state.notifier.notify_owner(&notification).await))
}
