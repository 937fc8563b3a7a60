use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::UpdateUserRequest;
use crate::auth::password::{hash_password, MIN_PASSWORD_LEN};
use crate::auth::repo_types::User;
use crate::auth::services::is_valid_email;
use crate::error::{AppError, AppResult};
use crate::patch::{Patch, PatchValue};

const USER_NOT_FOUND: &str = "User not found";
const SELF_DEACTIVATION: &str = "Cannot deactivate your own account";

pub async fn list_users(db: &PgPool, limit: i64, offset: i64) -> AppResult<Vec<User>> {
    Ok(User::list(db, limit, offset).await?)
}

pub async fn get_user(db: &PgPool, id: Uuid) -> AppResult<User> {
    User::find_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))
}

/// Turns the request into column assignments, hashing a new password.
pub fn update_patch(req: UpdateUserRequest) -> AppResult<Patch> {
    let username = req
        .username
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    let email = req
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());
    if let Some(email) = &email {
        if !is_valid_email(email) {
            return Err(AppError::validation("Invalid email format"));
        }
    }

    let password_hash = match req.password.filter(|p| !p.is_empty()) {
        Some(p) if p.len() < MIN_PASSWORD_LEN => {
            return Err(AppError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long"
            )))
        }
        Some(p) => Some(hash_password(&p)?),
        None => None,
    };

    let mut patch = Patch::new();
    patch
        .set_opt("username", username)
        .set_opt("email", email)
        .set_opt("password_hash", password_hash)
        .set_opt("first_name", req.first_name)
        .set_opt("last_name", req.last_name)
        .set_opt("role", req.role)
        .set_opt("is_active", req.is_active)
        .set_opt("is_verified", req.is_verified);
    Ok(patch)
}

pub async fn update_user(
    db: &PgPool,
    id: Uuid,
    req: UpdateUserRequest,
    updated_by: Uuid,
) -> AppResult<User> {
    let mut patch = update_patch(req)?;
    if patch.is_empty() {
        return Err(AppError::validation("No fields to update"));
    }
    if id == updated_by && patch.get("is_active") == Some(&PatchValue::Bool(false)) {
        warn!(user_id = %id, "refused self-deactivation through update");
        return Err(AppError::validation(SELF_DEACTIVATION));
    }

    let username = match patch.get("username") {
        Some(PatchValue::Text(u)) => Some(u.clone()),
        _ => None,
    };
    let email = match patch.get("email") {
        Some(PatchValue::Text(e)) => Some(e.clone()),
        _ => None,
    };
    if (username.is_some() || email.is_some())
        && User::identity_taken(db, username.as_deref(), email.as_deref(), Some(id)).await?
    {
        return Err(AppError::validation("Username or email already exists"));
    }

    patch.set("updated_by", updated_by);
    let user = User::apply_patch(db, id, patch)
        .await?
        .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;
    info!(user_id = %id, %updated_by, "user updated");
    Ok(user)
}

pub async fn deactivate_user(db: &PgPool, id: Uuid, by: Uuid) -> AppResult<()> {
    if id == by {
        warn!(user_id = %id, "refused self-deactivation");
        return Err(AppError::validation(SELF_DEACTIVATION));
    }
    if !User::deactivate(db, id, Some(by)).await? {
        return Err(AppError::not_found(USER_NOT_FOUND));
    }
    info!(user_id = %id, deactivated_by = %by, "user deactivated");
    Ok(())
}
