/*!
 * # Authentication and Authorization Module
 *
 * Guards the back office. Admins sign in with email and password and receive
 * an HS256 bearer token. Every gated request re-loads the admin record, so a
 * disabled account loses access immediately even with an unexpired token.
 *
 * - `password`: argon2id hashing on the blocking pool
 * - `rbac`: closed role set and the `authorize` check
 */

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

mod password;
mod rbac;

pub use password::{PasswordHashConfig, PasswordHasher};
pub use rbac::{authorize, ALL_ROLES, SUPER_ADMIN_ONLY};

use crate::config::AppConfig;
use crate::entities::admin::{self, AdminRole, AdminStatus, AdminView};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

pub const MIN_PASSWORD_LENGTH: usize = 6;

const TOKEN_AUDIENCE: &str = "uniform-store-admin";

/// Claim structure for JWT tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: AdminRole,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub iss: String,
    pub aud: String,
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub token_expiration: Duration,
    pub password_hash: PasswordHashConfig,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, jwt_issuer: String, token_expiration: Duration) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            jwt_audience: TOKEN_AUDIENCE.to_string(),
            token_expiration,
            password_hash: PasswordHashConfig::default(),
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            password_hash: PasswordHashConfig {
                memory_kib: cfg.password_hash_memory_kib,
                iterations: cfg.password_hash_iterations,
            },
            ..AuthConfig::new(
                cfg.jwt_secret.clone(),
                cfg.jwt_issuer.clone(),
                cfg.jwt_expiration(),
            )
        }
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not authorized, no token")]
    MissingToken,

    #[error("Not authorized, token failed")]
    InvalidToken,

    #[error("Not authorized, token failed")]
    TokenExpired,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not authorized, admin account is inactive")]
    InactiveAccount,

    #[error("Admin role {role} is not authorized to access this route; requires {required}")]
    Forbidden { role: AdminRole, required: String },

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken
            | AuthError::InvalidCredentials
            | AuthError::InactiveAccount => ServiceError::AuthError(err.to_string()),
            AuthError::InvalidToken | AuthError::TokenExpired => {
                ServiceError::JwtError(err.to_string())
            }
            AuthError::Forbidden { .. } => ServiceError::Forbidden(err.to_string()),
            AuthError::TokenCreation(msg) => ServiceError::InternalError(msg),
            AuthError::Hash(msg) => ServiceError::HashError(msg),
            AuthError::Database(db) => ServiceError::DatabaseError(db),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

/// Admin resolved by the auth middleware for the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedAdmin {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: AdminRole,
    pub admin: AdminView,
}

impl From<admin::Model> for AuthenticatedAdmin {
    fn from(model: admin::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            email: model.email.clone(),
            role: model.role,
            admin: AdminView::from(model),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedAdmin>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: AdminRole,
    pub token: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterAdminRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(default)]
    pub role: Option<AdminRole>,
}

/// Lowercased, trimmed email used for admin lookups
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Authentication service that handles credential checks and token issuance
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DatabaseConnection>,
    hasher: PasswordHasher,
    event_sender: Arc<EventSender>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("jwt_issuer", &self.config.jwt_issuer)
            .field("token_expiration", &self.config.token_expiration)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    pub fn new(
        config: AuthConfig,
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self, AuthError> {
        let hasher = PasswordHasher::new(config.password_hash)?;
        Ok(Self {
            config,
            db,
            hasher,
            event_sender,
        })
    }

    pub fn token_expiration(&self) -> Duration {
        self.config.token_expiration
    }

    /// Signs a bearer token for `admin`.
    pub fn issue_token(&self, admin: &admin::Model) -> Result<String, AuthError> {
        let now = Utc::now();
        let expires_at = now
            + ChronoDuration::from_std(self.config.token_expiration)
                .map_err(|_| AuthError::TokenCreation("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: admin.id.to_string(),
            role: admin.role,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Verifies signature, expiry, issuer and audience.
    pub fn decode_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    /// Email/password sign-in. Every failure reads as `InvalidCredentials`.
    #[instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        let (email, password) = match (request.email, request.password) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                (normalize_email(&email), password)
            }
            _ => {
                return Err(ServiceError::ValidationError(
                    "Please provide email and password".to_string(),
                ))
            }
        };

        let admin = admin::Entity::find()
            .filter(admin::Column::Email.eq(email.as_str()))
            .one(&*self.db)
            .await?;

        let verified = self
            .hasher
            .verify(&password, admin.as_ref().map(|a| a.password_hash.as_str()))
            .await?;

        let admin = match admin {
            Some(admin) if verified && admin.is_active() => admin,
            _ => {
                warn!("admin sign-in rejected");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        let token = self.issue_token(&admin)?;
        info!(admin_id = %admin.id, "admin signed in");

        Ok(LoginResponse {
            id: admin.id,
            name: admin.name,
            email: admin.email,
            role: admin.role,
            token,
            expires_in: self.config.token_expiration.as_secs(),
        })
    }

    /// Resolves a bearer token to a currently active admin.
    #[instrument(skip(self, token))]
    pub async fn authenticate(&self, token: &str) -> Result<admin::Model, AuthError> {
        let claims = self.decode_token(token)?;
        let admin_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        let admin = admin::Entity::find_by_id(admin_id)
            .one(&*self.db)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !admin.is_active() {
            return Err(AuthError::InactiveAccount);
        }
        Ok(admin)
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register_admin(
        &self,
        request: RegisterAdminRequest,
    ) -> Result<AdminView, ServiceError> {
        let request = RegisterAdminRequest {
            email: normalize_email(&request.email),
            ..request
        };
        request.validate()?;
        let email = request.email.clone();

        let existing = admin::Entity::find()
            .filter(admin::Column::Email.eq(email.as_str()))
            .count(&*self.db)
            .await?;
        if existing > 0 {
            return Err(ServiceError::Conflict("Admin already exists".to_string()));
        }

        let password_hash = self.hasher.hash(&request.password).await?;
        let now = Utc::now();
        let model = admin::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            email: Set(email),
            password_hash: Set(password_hash),
            role: Set(request.role.unwrap_or_default()),
            status: Set(AdminStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_write(e, "Admin already exists"))?;

        info!(admin_id = %model.id, role = %model.role, "admin registered");
        self.event_sender
            .send_or_log(Event::AdminRegistered(model.id))
            .await;

        Ok(AdminView::from(model))
    }

    #[instrument(skip(self))]
    pub async fn list_admins(&self) -> Result<Vec<AdminView>, ServiceError> {
        let admins = admin::Entity::find()
            .order_by_desc(admin::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(admins.into_iter().map(AdminView::from).collect())
    }

    pub fn me(&self, admin: &AuthenticatedAdmin) -> AdminView {
        admin.admin.clone()
    }

    /// Creates the first super-admin when the table is empty. Returns `None`
    /// when admins already exist.
    #[instrument(skip(self, password))]
    pub async fn bootstrap_super_admin(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<Option<AdminView>, ServiceError> {
        let existing = admin::Entity::find().count(&*self.db).await?;
        if existing > 0 {
            return Ok(None);
        }

        let created = self
            .register_admin(RegisterAdminRequest {
                name: name.unwrap_or("Super Admin").to_string(),
                email: email.to_string(),
                password: password.to_string(),
                role: Some(AdminRole::SuperAdmin),
            })
            .await?;
        info!(admin_id = %created.id, "bootstrap super-admin created");
        Ok(Some(created))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authenticates the bearer token and admits only `allowed` roles.
pub async fn auth_middleware(
    State(allowed): State<&'static [AdminRole]>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => Arc::clone(service),
        None => {
            return ServiceError::InternalError("Authentication service not available".into())
                .into_response();
        }
    };

    let token = match bearer_token(request.headers()) {
        Some(token) => token.to_owned(),
        None => return AuthError::MissingToken.into_response(),
    };

    let admin = match auth_service.authenticate(&token).await {
        Ok(admin) => admin,
        Err(e) => return e.into_response(),
    };

    if let Err(e) = authorize(admin.role, allowed) {
        return e.into_response();
    }

    request
        .extensions_mut()
        .insert(AuthenticatedAdmin::from(admin));
    next.run(request).await
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    /// Any active admin.
    fn with_auth(self) -> Self;
    /// Active admins whose role is in `roles`.
    fn with_roles(self, roles: &'static [AdminRole]) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.with_roles(ALL_ROLES)
    }

    fn with_roles(self, roles: &'static [AdminRole]) -> Self {
        self.route_layer(axum::middleware::from_fn_with_state(roles, auth_middleware))
    }
}
