pub(crate) use crate::auth::dto::{Claims, JwtKeys};
use crate::auth::password::{hash_password, verify_dummy, verify_password, MIN_PASSWORD_LEN};
use crate::auth::repo_types::{NewUser, Role, User};
use crate::config::JwtConfig;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use std::time::Duration;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from_config(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn from_config(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl: Duration::from_secs(config.ttl_secs.max(1)),
        }
    }

    pub fn sign(&self, user: &User) -> AppResult<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding).map_err(AppError::internal)?;
        debug!(user_id = %user.id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            AppError::Forbidden("Invalid or expired token".into())
        })?;
        debug!(user_id = %data.claims.id, "jwt verified");
        Ok(data.claims)
    }
}

/// Input for [`create_user`].
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
}

impl CreateUser {
    /// Trims identity fields, lowercases the email and checks the basic shape.
    pub fn normalized(mut self) -> AppResult<Self> {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        if self.username.is_empty() || self.email.is_empty() || self.password.is_empty() {
            return Err(AppError::validation(
                "Username, email, and password are required",
            ));
        }
        if !is_valid_email(&self.email) {
            return Err(AppError::validation("Invalid email format"));
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long"
            )));
        }
        Ok(self)
    }
}

pub async fn create_user(db: &PgPool, data: CreateUser, created_by: Option<Uuid>) -> AppResult<User> {
    let data = data.normalized()?;

    if User::identity_taken(db, Some(&data.username), Some(&data.email), None).await? {
        warn!(username = %data.username, "username or email already registered");
        return Err(AppError::validation("Username or email already exists"));
    }

    let hash = hash_password(&data.password)?;
    let user = User::create(
        db,
        &NewUser {
            username: &data.username,
            email: &data.email,
            password_hash: &hash,
            first_name: data.first_name.as_deref(),
            last_name: data.last_name.as_deref(),
            role: data.role,
            created_by,
        },
    )
    .await?;

    info!(user_id = %user.id, username = %user.username, "user created");
    Ok(user)
}

/// Checks credentials and returns the refreshed user with a fresh token.
pub async fn authenticate(
    db: &PgPool,
    keys: &JwtKeys,
    username: &str,
    password: &str,
) -> AppResult<(User, String)> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AppError::validation("Username and password are required"));
    }

    let Some(user) = User::find_active_by_username(db, username).await? else {
        verify_dummy(password);
        warn!(%username, "login for unknown or inactive user");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let user = User::touch_last_login(db, user.id).await?;
    let token = keys.sign(&user)?;
    info!(user_id = %user.id, "user logged in");
    Ok((user, token))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    fn sample_user() -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            username: "river".into(),
            email: "river@example.com".into(),
            password_hash: String::new(),
            first_name: None,
            last_name: None,
            role: Role::Moderator,
            is_active: true,
            is_verified: false,
            last_login: None,
            intake_form_completed: false,
            intake_form_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn sign_and_verify_carries_identity() {
        let keys = make_keys();
        let user = sample_user();
        let token = keys.sign(&user).expect("sign");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.id, user.id);
        assert_eq!(claims.username, "river");
        assert_eq!(claims.email, "river@example.com");
        assert_eq!(claims.role, Role::Moderator);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[tokio::test]
    async fn verify_rejects_foreign_signature() {
        let keys = make_keys();
        let mut other_cfg = AppState::test_config().jwt;
        other_cfg.secret = "another-secret".into();
        let other = JwtKeys::from_config(&other_cfg);
        let token = other.sign(&sample_user()).unwrap();
        let err = keys.verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn verify_rejects_expired_token() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
        let claims = Claims {
            id: Uuid::new_v4(),
            username: "old".into(),
            email: "old@example.com".into(),
            role: Role::User,
            iat: now - 7200,
            exp: now - 3600,
            iss: keys.issuer.clone(),
            aud: keys.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn token_lifetime_keeps_second_precision() {
        let mut cfg = AppState::test_config().jwt;
        cfg.ttl_secs = 30;
        let keys = JwtKeys::from_config(&cfg);
        let claims = keys.verify(&keys.sign(&sample_user()).unwrap()).unwrap();
        assert_eq!(claims.exp - claims.iat, 30);
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
    }

    fn registration(password: &str) -> CreateUser {
        CreateUser {
            username: "  sam ".into(),
            email: " Sam@Example.COM ".into(),
            password: password.into(),
            first_name: None,
            last_name: None,
            role: Role::User,
        }
    }

    #[test]
    fn normalization_trims_and_lowercases() {
        let data = registration("secret1").normalized().unwrap();
        assert_eq!(data.username, "sam");
        assert_eq!(data.email, "sam@example.com");
    }

    #[test]
    fn short_password_is_rejected() {
        let err = registration("12345").normalized().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    fn account(username: &str, email: &str) -> CreateUser {
        CreateUser {
            username: username.into(),
            email: email.into(),
            password: "secret1".into(),
            first_name: None,
            last_name: None,
            role: Role::User,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn login_token_identifies_the_new_user(db: PgPool) {
        let keys = make_keys();
        let created = create_user(&db, account("jordan", "jordan@example.com"), None)
            .await
            .unwrap();
        let (user, token) = authenticate(&db, &keys, "jordan", "secret1").await.unwrap();
        assert_eq!(user.id, created.id);
        assert!(user.last_login.is_some());
        assert_eq!(keys.verify(&token).unwrap().id, created.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn bad_password_and_unknown_user_look_the_same(db: PgPool) {
        let keys = make_keys();
        create_user(&db, account("jordan", "jordan@example.com"), None)
            .await
            .unwrap();
        let wrong = authenticate(&db, &keys, "jordan", "secret2").await.unwrap_err();
        let unknown = authenticate(&db, &keys, "nobody", "secret1").await.unwrap_err();
        assert!(matches!(wrong, AppError::Unauthorized(_)));
        assert!(matches!(unknown, AppError::Unauthorized(_)));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn duplicate_username_or_email_is_rejected(db: PgPool) {
        create_user(&db, account("jordan", "jordan@example.com"), None)
            .await
            .unwrap();
        let same_name = create_user(&db, account("jordan", "other@example.com"), None).await;
        assert!(matches!(same_name, Err(AppError::Validation(_))));
        let same_email = create_user(&db, account("jo", "Jordan@Example.com"), None).await;
        assert!(matches!(same_email, Err(AppError::Validation(_))));
    }

    #[test]
    fn missing_fields_are_rejected() {
        let mut data = registration("secret1");
        data.username = "   ".into();
        assert!(matches!(data.normalized(), Err(AppError::Validation(_))));
    }
}
