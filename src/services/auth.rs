//! Authentication: password hashing and session tokens
//!
//! Passwords are stored as Argon2id PHC strings. A successful login yields an
//! HS256 JWT valid for seven days plus a public summary of the account.

use crate::error::{PortalError, Result};
use crate::storage::StorageBackend;
use crate::types::{Role, UserSummary};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use rand::{distributions::Alphanumeric, Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Session tokens stay valid for a week
pub const SESSION_TTL_DAYS: i64 = 7;

/// Hash a plaintext password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| PortalError::PasswordHash(e.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PortalError::PasswordHash(e.to_string()))
}

/// Check a plaintext password against a stored PHC hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| PortalError::PasswordHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Checked when no account matches, so unknown identifiers cost the same
/// Argon2 pass as a wrong password
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("no such account").ok());

/// Run the Argon2 check on the blocking pool. `account` is the stored hash and
/// id of the matched record, or `None` when the identifier is unknown.
async fn password_matches(password: &str, account: Option<(&str, &str)>) -> Result<bool> {
    let (hash, user_id) = match account {
        Some((hash, id)) => (hash.to_string(), Some(id.to_string())),
        None => match DUMMY_HASH.as_ref() {
            Some(hash) => (hash.clone(), None),
            None => return Ok(false),
        },
    };

    let password = password.to_string();
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| PortalError::Other(format!("Password check failed: {}", e)))?;

    match (verified, user_id) {
        (Ok(matches), Some(_)) => Ok(matches),
        (Ok(_), None) => Ok(false),
        (Err(e), id) => {
            warn!(
                "Stored password hash for {} is unusable: {}",
                id.as_deref().unwrap_or("unknown account"),
                e
            );
            Ok(false)
        }
    }
}

/// Random secret used when none is configured
pub fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

/// JWT claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: String, role: Role, issued_at: DateTime<Utc>) -> Self {
        Self {
            sub: user_id,
            role,
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::days(SESSION_TTL_DAYS)).timestamp(),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Login request body; blank strings count as missing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub usn: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// Successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Authentication service
pub struct AuthService {
    storage: Arc<dyn StorageBackend>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(storage: Arc<dyn StorageBackend>, secret: &[u8]) -> Self {
        Self {
            storage,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verify credentials and issue a session token
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let (Some(password), Some(role)) = (
            request.password.as_deref().filter(|p| !p.is_empty()),
            present(&request.role),
        ) else {
            return Err(PortalError::InvalidInput("Missing password/role".to_string()));
        };
        let role: Role = role.parse()?;

        let user = match role {
            Role::Student => {
                let student = match (present(&request.email), present(&request.usn)) {
                    (Some(email), _) => self.storage.find_student_by_email(email).await?,
                    (None, Some(usn)) => self.storage.find_student_by_usn(usn).await?,
                    (None, None) => {
                        return Err(PortalError::InvalidInput(
                            "Provide email or usn".to_string(),
                        ))
                    }
                };
                let account = student.as_ref().map(|s| (s.password_hash.as_str(), s.id.as_str()));
                let matches = password_matches(password, account).await?;
                student
                    .filter(|_| matches)
                    .map(|s| UserSummary::Student(s.summary()))
            }
            Role::Faculty => {
                let Some(email) = present(&request.email) else {
                    return Err(PortalError::InvalidInput(
                        "Faculty login requires email".to_string(),
                    ));
                };
                let faculty = self.storage.find_faculty_by_email(email).await?;
                let account = faculty.as_ref().map(|f| (f.password_hash.as_str(), f.id.as_str()));
                let matches = password_matches(password, account).await?;
                faculty
                    .filter(|_| matches)
                    .map(|f| UserSummary::Faculty(f.summary()))
            }
        };

        let Some(user) = user else {
            debug!("Rejected {} login", role);
            return Err(PortalError::InvalidCredentials);
        };

        let token = self.issue_token(user.id(), role)?;
        info!("{} {} logged in", role, user.id());
        Ok(LoginResponse { token, user })
    }

    pub fn issue_token(&self, user_id: &str, role: Role) -> Result<String> {
        let claims = Claims::new(user_id.to_string(), role, Utc::now());
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// Decode a token, checking signature and expiry
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| PortalError::Unauthorized(e.to_string()))
    }

    /// Load the account a session token refers to
    pub async fn resolve_user(&self, claims: &Claims) -> Result<UserSummary> {
        let user = match claims.role {
            Role::Student => self
                .storage
                .get_student(&claims.sub)
                .await?
                .map(|s| UserSummary::Student(s.summary())),
            Role::Faculty => self
                .storage
                .get_faculty(&claims.sub)
                .await?
                .map(|f| UserSummary::Faculty(f.summary())),
        };

        user.ok_or_else(|| PortalError::Unauthorized("account no longer exists".to_string()))
    }
}
