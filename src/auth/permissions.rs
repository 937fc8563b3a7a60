use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::error::{AppError, AppResult};

/// Permissions known to the role mapping in `role_permissions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    UsersRead,
    UsersCreate,
    UsersUpdate,
    UsersDelete,
    ChatCreate,
    ChatRead,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::UsersRead => "users.read",
            Permission::UsersCreate => "users.create",
            Permission::UsersUpdate => "users.update",
            Permission::UsersDelete => "users.delete",
            Permission::ChatCreate => "chat.create",
            Permission::ChatRead => "chat.read",
        }
    }
}

pub async fn check_permission(db: &PgPool, user_id: Uuid, permission: Permission) -> AppResult<bool> {
    Ok(User::has_permission(db, user_id, permission.as_str()).await?)
}

/// Fails with 403 unless the user's role grants `permission`.
pub async fn require_permission(db: &PgPool, user: &User, permission: Permission) -> AppResult<()> {
    if check_permission(db, user.id, permission).await? {
        Ok(())
    } else {
        warn!(user_id = %user.id, permission = permission.as_str(), "permission denied");
        Err(AppError::Forbidden("Insufficient permissions".into()))
    }
}
