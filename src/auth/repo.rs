use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User, UserPermission};
use crate::patch::Patch;

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, role, \
     is_active, is_verified, last_login, intake_form_completed, intake_form_id, \
     created_at, updated_at";

impl User {
    /// Find an active user by username.
    pub async fn find_active_by_username(
        db: &PgPool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND is_active = true"
        ))
        .bind(username)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// True when another account already uses the username or the email.
    pub async fn identity_taken(
        db: &PgPool,
        username: Option<&str>,
        email: Option<&str>,
        exclude: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE (username = $1 OR email = $2)
                  AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(exclude)
        .fetch_one(db)
        .await
    }

    /// Create a new user with hashed password.
    pub async fn create(db: &PgPool, new: &NewUser<'_>) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name, role, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.username)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(new.role)
        .bind(new.created_by)
        .fetch_one(db)
        .await
    }

    pub async fn touch_last_login(db: &PgPool, id: Uuid) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET last_login = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(db)
        .await
    }

    pub async fn list(db: &PgPool, limit: i64, offset: i64) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    /// Applies the patch; `None` when no user has that id.
    pub async fn apply_patch(
        db: &PgPool,
        id: Uuid,
        patch: Patch,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut query = patch.into_update("users", "id", id);
        query.build_query_as::<User>().fetch_optional(db).await
    }

    /// Soft delete. Returns false when no row matched.
    pub async fn deactivate(
        db: &PgPool,
        id: Uuid,
        deactivated_by: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET is_active = false, updated_by = $1, updated_at = now() WHERE id = $2",
        )
        .bind(deactivated_by)
        .bind(id)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn has_permission(
        db: &PgPool,
        id: Uuid,
        permission: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM users u
                JOIN role_permissions rp ON rp.role = u.role
                WHERE u.id = $1 AND u.is_active = true AND rp.permission_name = $2
            )
            "#,
        )
        .bind(id)
        .bind(permission)
        .fetch_one(db)
        .await
    }

    pub async fn permissions(db: &PgPool, id: Uuid) -> Result<Vec<UserPermission>, sqlx::Error> {
        sqlx::query_as::<_, UserPermission>(
            r#"
            SELECT p.name AS permission_name, p.description AS permission_description
            FROM users u
            JOIN role_permissions rp ON rp.role = u.role
            JOIN permissions p ON p.name = rp.permission_name
            WHERE u.id = $1
            ORDER BY p.name
            "#,
        )
        .bind(id)
        .fetch_all(db)
        .await
    }
}
