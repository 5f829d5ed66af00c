// ABOUTME: Session subsystem: signed JWT credentials layered over revocable token records
// ABOUTME: Handles login, registration, logout, credential validation and token purging
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Authentication and Session Management
//!
//! A session is valid only while BOTH hold:
//!
//! - the HS256 credential verifies and has not expired, and
//! - a token record for exactly `(principal, credential)` exists.
//!
//! Deleting the record revokes the session immediately even though the
//! credential itself would still verify. A principal may hold any number of
//! records, one per login.

use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Duration, Utc};
use http::HeaderMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::constants::fields;
use crate::database_plugins::{Dao, Database, Filter};
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::models::{Entity, Owned, SessionToken, User};
use crate::security::cookies;

/// Field on a token record holding the raw credential string
const TOKEN_FIELD: &str = "token";

/// Credential decode failure; never escapes [`AuthManager::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token has expired
    TokenExpired {
        /// When the token expired
        expired_at: DateTime<Utc>,
        /// Current time for reference
        current_time: DateTime<Utc>,
    },
    /// Token signature or claims are invalid
    TokenInvalid {
        /// Reason for invalidity
        reason: String,
    },
    /// Token is malformed (not proper `JWT` format)
    TokenMalformed {
        /// Details about malformation
        details: String,
    },
}

impl Display for JwtValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::TokenExpired {
                expired_at,
                current_time,
            } => {
                let ago = current_time.signed_duration_since(*expired_at);
                write!(
                    f,
                    "JWT token expired {} seconds ago at {}",
                    ago.num_seconds(),
                    expired_at.format("%Y-%m-%d %H:%M:%S UTC")
                )
            }
            Self::TokenInvalid { reason } => write!(f, "JWT token is invalid: {reason}"),
            Self::TokenMalformed { details } => write!(f, "JWT token is malformed: {details}"),
        }
    }
}

impl std::error::Error for JwtValidationError {}

/// `JWT` claims carried by a session credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Principal id
    pub sub: String,
    /// Issued at (seconds since epoch)
    pub iat: i64,
    /// Expiration (seconds since epoch)
    pub exp: i64,
    /// Unique credential id, so two logins in the same second differ
    pub jti: String,
}

impl Claims {
    /// Principal id, if `sub` is a UUID
    #[must_use]
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// Registration input; the password is plaintext and hashed here
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    /// Unique login name
    pub username: String,
    /// Unique contact address
    pub email: String,
    /// Plaintext password
    pub password: String,
}

/// An issued session: the principal plus the credential to hand back
#[derive(Debug, Clone)]
pub struct UserSession {
    /// Authenticated principal
    pub user: User,
    /// Signed credential (also the token record's key)
    pub jwt_token: String,
    /// Credential expiry
    pub expires_at: DateTime<Utc>,
}

/// Authentication manager for signed credentials and token records
#[derive(Clone)]
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
    cookie_secure: bool,
    bcrypt_cost: u32,
}

impl AuthManager {
    /// Create a manager signing with `secret`, issuing credentials valid for
    /// `token_ttl_hours`
    #[must_use]
    pub fn new(secret: &[u8], token_ttl_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            token_ttl: Duration::hours(token_ttl_hours),
            cookie_secure: true,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Build from loaded configuration
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.jwt_secret.as_bytes(), config.token_ttl_hours)
            .with_cookie_secure(config.cookie_secure)
            .with_bcrypt_cost(config.bcrypt_cost)
    }

    /// Whether the session cookie carries `Secure`
    #[must_use]
    pub const fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// bcrypt work factor for new hashes
    #[must_use]
    pub const fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Lifetime of issued credentials
    #[must_use]
    pub const fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Sign a credential for `user` with the configured lifetime
    ///
    /// # Errors
    ///
    /// Returns an internal error if encoding fails
    pub fn generate_token(&self, user: &User) -> AppResult<String> {
        self.generate_token_with_ttl(user, self.token_ttl)
    }

    /// Sign a credential for `user` valid for `ttl` (negative values yield an
    /// already-expired credential)
    ///
    /// # Errors
    ///
    /// Returns an internal error if encoding fails
    pub fn generate_token_with_ttl(&self, user: &User, ttl: Duration) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign session token: {e}")))
    }

    /// Verify signature and expiry
    ///
    /// # Errors
    ///
    /// Returns a [`JwtValidationError`] describing why the credential is rejected
    pub fn decode_token(&self, token: &str) -> Result<Claims, JwtValidationError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| Self::convert_jwt_error(&e))?;

        let current_time = Utc::now();
        if current_time.timestamp() >= claims.exp {
            let expired_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or(current_time);
            return Err(JwtValidationError::TokenExpired {
                expired_at,
                current_time,
            });
        }
        Ok(claims)
    }

    /// Convert JWT library errors to detailed validation errors
    fn convert_jwt_error(e: &jsonwebtoken::errors::Error) -> JwtValidationError {
        use jsonwebtoken::errors::ErrorKind;

        match e.kind() {
            ErrorKind::InvalidSignature => JwtValidationError::TokenInvalid {
                reason: "Token signature verification failed".into(),
            },
            ErrorKind::InvalidToken => JwtValidationError::TokenMalformed {
                details: "Token format is invalid".into(),
            },
            ErrorKind::Base64(base64_err) => JwtValidationError::TokenMalformed {
                details: format!("Token contains invalid base64: {base64_err}"),
            },
            ErrorKind::Json(json_err) => JwtValidationError::TokenMalformed {
                details: format!("Token contains invalid JSON: {json_err}"),
            },
            ErrorKind::Utf8(utf8_err) => JwtValidationError::TokenMalformed {
                details: format!("Token contains invalid UTF-8: {utf8_err}"),
            },
            _ => JwtValidationError::TokenInvalid {
                reason: format!("Token validation failed: {e}"),
            },
        }
    }

    /// Append the session cookie for `token` to outgoing headers
    ///
    /// # Errors
    ///
    /// Returns an internal error if the header cannot be built
    pub fn attach_credential(&self, headers: &mut HeaderMap, token: &str) -> AppResult<()> {
        cookies::attach_session_cookie(
            headers,
            token,
            self.token_ttl.num_seconds(),
            self.cookie_secure,
        )
    }

    /// Append an expiring session cookie to outgoing headers
    ///
    /// # Errors
    ///
    /// Returns an internal error if the header cannot be built
    pub fn clear_credential(&self, headers: &mut HeaderMap) -> AppResult<()> {
        cookies::clear_session_cookie(headers, self.cookie_secure)
    }

    /// Resolve the acting principal of a request
    ///
    /// Missing, malformed, expired and revoked credentials all yield
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the token or user lookup fails in storage
    pub async fn validate(&self, headers: &HeaderMap, database: &Database) -> AppResult<Option<User>> {
        let Some(token) = cookies::extract_credential(headers) else {
            debug!("request carries no session credential");
            return Ok(None);
        };
        self.authenticate_token(token, database).await
    }

    /// Resolve the principal behind a raw credential string
    ///
    /// # Errors
    ///
    /// Returns an error only if the token or user lookup fails in storage
    pub async fn authenticate_token(&self, token: &str, database: &Database) -> AppResult<Option<User>> {
        let claims = match self.decode_token(token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(reason = %e, "session credential rejected");
                return Ok(None);
            }
        };
        let Some(user_id) = claims.user_id() else {
            warn!("session credential subject is not a user id");
            return Ok(None);
        };

        if database
            .tokens()
            .find_one(&Self::record_filter(user_id, token))
            .await?
            .is_none()
        {
            AppLogger::log_auth_event(&claims.sub, "validate", false, Some("token record revoked"));
            return Ok(None);
        }

        database.users().find_by_id(user_id).await
    }

    fn record_filter(user_id: Uuid, token: &str) -> Filter {
        Filter::eq(SessionToken::OWNER_FIELD, user_id).and(Filter::eq(TOKEN_FIELD, token))
    }

    /// Sign a credential for `user` and store its token record
    ///
    /// # Errors
    ///
    /// Returns an error if signing or the token record insert fails
    pub async fn issue_session(&self, database: &Database, user: User) -> AppResult<UserSession> {
        let jwt_token = self.generate_token(&user)?;
        database
            .tokens()
            .create(SessionToken::new(user.id, jwt_token.clone()))
            .await?;
        AppLogger::log_auth_event(&user.id.to_string(), "session_issued", true, None);
        Ok(UserSession {
            expires_at: Utc::now() + self.token_ttl,
            user,
            jwt_token,
        })
    }

    /// Check credentials and open a new session
    ///
    /// Unknown usernames and wrong passwords both yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error on storage or signing failure
    pub async fn login(
        &self,
        database: &Database,
        username: &str,
        password: &str,
    ) -> AppResult<Option<UserSession>> {
        let Some(user) = database
            .users()
            .find_one(&Filter::eq("username", username))
            .await?
        else {
            AppLogger::log_auth_event(username, "login", false, Some("unknown username"));
            return Ok(None);
        };

        if !verify_password(password, &user.password_hash).await {
            AppLogger::log_auth_event(&user.id.to_string(), "login", false, Some("wrong password"));
            return Ok(None);
        }

        self.issue_session(database, user).await.map(Some)
    }

    /// Create a principal and open its first session
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for blank fields, `ResourceAlreadyExists` when
    /// the username or email is taken, or a storage error
    pub async fn register(&self, database: &Database, new_user: NewUser) -> AppResult<UserSession> {
        let username = new_user.username.trim();
        let email = new_user.email.trim();
        if username.is_empty() || email.is_empty() || new_user.password.is_empty() {
            return Err(AppError::invalid_input(
                "Username, email and password are required",
            ));
        }

        let users = database.users();
        if users.count(&Filter::eq("username", username)).await? > 0 {
            return Err(AppError::already_exists(format!("Username '{username}'")));
        }
        if users.count(&Filter::eq("email", email)).await? > 0 {
            return Err(AppError::already_exists(format!("Email '{email}'")));
        }

        let password_hash = self.hash_password(&new_user.password).await?;
        let user = users.create(User::new(username, email, password_hash)).await?;
        info!(user.id = %user.id, "user registered");
        self.issue_session(database, user).await
    }

    /// Revoke exactly the session identified by `(user_id, token)`
    ///
    /// Returns whether a record was removed; other sessions stay valid.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure
    pub async fn logout(&self, database: &Database, user_id: Uuid, token: &str) -> AppResult<bool> {
        let removed = database
            .tokens()
            .delete(&Self::record_filter(user_id, token))
            .await?;
        AppLogger::log_auth_event(&user_id.to_string(), "logout", removed > 0, None);
        Ok(removed > 0)
    }

    /// Revoke every session of a principal
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure
    pub async fn revoke_all(&self, database: &Database, user_id: Uuid) -> AppResult<u64> {
        let removed = database
            .tokens()
            .delete(&Filter::eq(SessionToken::OWNER_FIELD, user_id))
            .await?;
        AppLogger::log_security_event(
            "sessions_revoked",
            &format!("{removed} session(s) revoked"),
            Some(&user_id.to_string()),
        );
        Ok(removed)
    }

    /// Delete token records whose credential has outlived the lifetime
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure
    pub async fn purge_expired(&self, database: &Database) -> AppResult<u64> {
        let cutoff = Utc::now() - self.token_ttl;
        let removed = database
            .tokens()
            .delete(&Filter::lt(fields::CREATED_AT, cutoff))
            .await?;
        AppLogger::log_database_operation("purge_expired", SessionToken::COLLECTION, removed);
        Ok(removed)
    }

    /// Hash a password with the configured bcrypt cost off the async executor
    ///
    /// # Errors
    ///
    /// Returns an internal error if hashing fails
    pub async fn hash_password(&self, password: &str) -> AppResult<String> {
        let password = password.to_owned();
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
            .map_err(|e| AppError::internal(format!("Failed to hash password: {e}")))
    }
}

/// Verify password against hash using bcrypt with `spawn_blocking`
pub async fn verify_password(password: &str, hash: &str) -> bool {
    let password = password.to_owned();
    let hash = hash.to_owned();

    tokio::task::spawn_blocking(move || bcrypt::verify(&password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}
