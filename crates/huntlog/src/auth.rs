use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    database::Database,
    errors::{AppError, validate_request},
    models::{User, UserSettings},
    types::UpdateSettingsRequest,
};

/// Token signing settings, shared with handlers through an `Extension`.
#[derive(Clone)]
pub struct AuthConfig {
    inner: Arc<AuthKeys>,
}

struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: Duration,
}

impl AuthConfig {
    pub fn new(secret: &str, expiry_minutes: i64) -> Self {
        Self {
            inner: Arc::new(AuthKeys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                expiry: Duration::minutes(expiry_minutes),
            }),
        }
    }

    pub fn expires_in_seconds(&self) -> i64 {
        self.inner.expiry.whole_seconds()
    }

    pub fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            exp: (now + self.inner.expiry).unix_timestamp(),
            iat: now.unix_timestamp(),
        };

        encode(&Header::default(), &claims, &self.inner.encoding).map_err(|e| {
            tracing::error!("Failed to sign token: {e}");
            AppError::Internal
        })
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(token, &self.inner.decoding, &Validation::default())
            .map_err(|_| AppError::Unauthorized)?;
        Ok(token_data.claims)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user id
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub settings: UserSettings,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            settings: user.settings,
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::InvalidInput(format!("Failed to hash password: {e}")))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::InvalidInput(format!("Invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Applies the fields present in `update` on top of `settings`.
pub fn merge_settings(mut settings: UserSettings, update: UpdateSettingsRequest) -> UserSettings {
    if let Some(theme) = update.theme {
        settings.theme = theme;
    }
    if let Some(language) = update.language {
        settings.language = language;
    }
    if let Some(units) = update.units {
        settings.units = units;
    }
    if let Some(map_style) = update.map_style {
        settings.map_style = map_style;
    }
    if let Some(auto_sync) = update.auto_sync_garmin {
        settings.auto_sync_garmin = auto_sync;
    }
    if let Some(prefs) = update.notification_preferences {
        let current = &mut settings.notification_preferences;
        if let Some(v) = prefs.email_summary {
            current.email_summary = v;
        }
        if let Some(v) = prefs.new_track_imported {
            current.new_track_imported = v;
        }
        if let Some(v) = prefs.backup_reminder {
            current.backup_reminder = v;
        }
    }
    settings
}

// Extractor for authenticated user
pub struct AuthUser(pub Claims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let config = parts
            .extensions
            .get::<AuthConfig>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("AuthConfig extension missing from router");
                AppError::Internal
            })?;

        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized)?;

        let claims = config.verify_token(token)?;
        Ok(AuthUser(claims))
    }
}

/// Register a new account.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    Extension(db): Extension<Database>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    validate_request(&req)?;

    let password_hash = hash_password(&req.password)?;
    let user = User::new(req.email.trim().to_lowercase(), req.name);

    db.create_user_with_password(&user, &password_hash).await?;
    tracing::info!("Registered user {}", user.id);

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Log in with email and password.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 401, description = "Wrong email or password")
    )
)]
pub async fn login(
    Extension(db): Extension<Database>,
    Extension(auth): Extension<AuthConfig>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    validate_request(&req)?;

    let (user, password_hash) = db
        .get_user_with_password(&req.email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let Some(hash) = password_hash else {
        return Err(AppError::Unauthorized);
    };

    if !verify_password(&req.password, &hash)? {
        return Err(AppError::Unauthorized);
    }

    let access_token = auth.create_token(&user)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: auth.expires_in_seconds(),
        user: user.into(),
    }))
}

/// The authenticated user.
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = db
        .get_user(claims.sub)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(user.into()))
}

/// Update user settings. Omitted fields keep their current value.
#[utoipa::path(
    put,
    path = "/auth/settings",
    tag = "auth",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_settings(
    Extension(db): Extension<Database>,
    AuthUser(claims): AuthUser,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = db
        .get_user(claims.sub)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let settings = merge_settings(user.settings, req);
    let user = db
        .update_user_settings(claims.sub, &settings)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NotificationPreferencesUpdate;

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("elgjakt2024").unwrap();
        assert!(verify_password("elgjakt2024", &hash).unwrap());
        assert!(!verify_password("rypejakt2024", &hash).unwrap());
    }

    #[test]
    fn test_token_round_trip() {
        let auth = AuthConfig::new("test-secret", 60);
        let user = User::new("jeger@example.no".into(), "Jeger".into());

        let token = auth.create_token(&user).unwrap();
        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "jeger@example.no");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(auth.expires_in_seconds(), 3600);
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let user = User::new("jeger@example.no".into(), "Jeger".into());
        let token = AuthConfig::new("one", 60).create_token(&user).unwrap();
        assert!(matches!(
            AuthConfig::new("two", 60).verify_token(&token),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_merge_settings_is_partial() {
        let merged = merge_settings(
            UserSettings::default(),
            UpdateSettingsRequest {
                theme: Some("light".into()),
                notification_preferences: Some(NotificationPreferencesUpdate {
                    backup_reminder: Some(false),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );

        assert_eq!(merged.theme, "light");
        assert_eq!(merged.language, "no");
        assert!(!merged.notification_preferences.backup_reminder);
        assert!(merged.notification_preferences.email_summary);
    }
}
