use std::sync::Arc;
use std::time::Duration;

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::forms::{
    FieldErrors, LoginInput, SignupInput, validate_login, validate_signup,
};
use crate::application::repos::{
    CreateSessionParams, CreateUserParams, RepoError, SessionsRepo, UsersRepo,
};
use crate::domain::entities::UserRecord;

const MIN_TOKEN_LEN: usize = 32;
const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("invalid form: {0}")]
    Validation(FieldErrors),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A freshly issued session; `token` is only ever returned here and stored hashed.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user: UserRecord,
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        sessions: Arc<dyn SessionsRepo>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            session_ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub async fn signup(&self, input: SignupInput) -> Result<UserRecord, AccountError> {
        validate_signup(&input).map_err(AccountError::Validation)?;

        let username = input.username.trim().to_string();
        if self.users.find_by_username(&username).await?.is_some() {
            return Err(AccountError::Validation(FieldErrors::single(
                "username",
                "A user with that username already exists.",
            )));
        }

        let password_hash = hash_password(&input.password1)?;
        let created = self
            .users
            .create_user(CreateUserParams {
                username,
                first_name: input.first_name.trim().to_string(),
                last_name: input.last_name.trim().to_string(),
                email: input.email.trim().to_string(),
                password_hash,
            })
            .await;

        let user = match created {
            Ok(user) => user,
            Err(RepoError::Duplicate { .. }) => {
                return Err(AccountError::Validation(FieldErrors::single(
                    "username",
                    "A user with that username already exists.",
                )));
            }
            Err(err) => return Err(err.into()),
        };

        info!(
            target = "yatube::accounts",
            user_id = user.id,
            username = %user.username,
            "user registered"
        );
        Ok(user)
    }

    pub async fn login(&self, input: &LoginInput) -> Result<IssuedSession, AccountError> {
        validate_login(input).map_err(AccountError::Validation)?;

        let user = self
            .users
            .find_by_username(input.username.trim())
            .await?
            .filter(|user| verify_password(&input.password, &user.password_hash));

        let Some(user) = user else {
            let mut errors = FieldErrors::new();
            errors.add_non_field(INVALID_LOGIN);
            return Err(AccountError::Validation(errors));
        };

        self.issue_session(user).await
    }

    /// Create a session for an already authenticated user.
    pub async fn issue_session(&self, user: UserRecord) -> Result<IssuedSession, AccountError> {
        let token = generate_token();
        let expires_at = OffsetDateTime::now_utc() + self.session_ttl;
        self.sessions
            .create_session(CreateSessionParams {
                user_id: user.id,
                token_hash: hash_token(&token),
                expires_at,
            })
            .await?;

        info!(
            target = "yatube::accounts",
            user_id = user.id,
            "session issued"
        );
        Ok(IssuedSession {
            user,
            token,
            expires_at,
        })
    }

    /// Resolve a session token to its user. Unknown, malformed and expired tokens yield `None`.
    pub async fn authenticate(&self, token: &str) -> Result<Option<UserRecord>, AccountError> {
        if token.len() < MIN_TOKEN_LEN {
            return Ok(None);
        }
        let now = OffsetDateTime::now_utc();
        let Some(session) = self.sessions.find_active(&hash_token(token), now).await? else {
            return Ok(None);
        };
        Ok(self.users.find_by_id(session.user_id).await?)
    }

    pub async fn logout(&self, token: &str) -> Result<(), AccountError> {
        let now = OffsetDateTime::now_utc();
        if let Some(session) = self.sessions.find_active(&hash_token(token), now).await? {
            self.sessions.delete_session(session.id).await?;
            info!(
                target = "yatube::accounts",
                user_id = session.user_id,
                "session revoked"
            );
        }
        Ok(())
    }
}

pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AccountError::Hashing(err.to_string()))
}

/// Malformed stored hashes verify as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}
