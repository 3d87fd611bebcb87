use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password_blocking, verify_password_blocking, DUMMY_HASH},
        repo::AccountStore,
        repo_types::{NewUser, User},
    },
    error::{ApiError, StoreError},
    validation::{sanitize, validate_email, validate_password, validate_username},
};

const DUPLICATE_USER: &str = "user with this email or username already exists";
const BAD_CREDENTIALS: &str = "invalid email or password";

fn normalize_email(raw: &str) -> String {
    sanitize(raw).to_lowercase()
}

/// Validates the request, rejects taken emails/usernames and stores a new user
/// with an Argon2 hash of the password.
pub async fn register(accounts: &dyn AccountStore, req: RegisterRequest) -> Result<User, ApiError> {
    let username = sanitize(&req.username);
    let email = normalize_email(&req.email);

    validate_username(&username)?;
    validate_email(&email)?;
    validate_password(&req.password)?;

    // Fast path only; the unique constraint decides races.
    if accounts.exists(&email, &username).await? {
        warn!(%email, %username, "registration for existing account");
        return Err(ApiError::Conflict(DUPLICATE_USER.into()));
    }

    let password_hash = hash_password_blocking(req.password).await?;

    let user = accounts
        .create(NewUser {
            username,
            email,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict => {
                warn!("registration lost a uniqueness race");
                ApiError::Conflict(DUPLICATE_USER.into())
            }
            other => other.into(),
        })?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Checks credentials and issues a token. Unknown email and wrong password
/// produce the same error.
pub async fn login(
    accounts: &dyn AccountStore,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<(String, User), ApiError> {
    let email = normalize_email(&req.email);
    if validate_email(&email).is_err() {
        return Err(ApiError::Validation("invalid email format".into()));
    }
    if req.password.is_empty() {
        return Err(ApiError::Validation("password is required".into()));
    }

    let Some(user) = accounts.find_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        // Same Argon2 cost as a wrong password, so timing does not reveal the email.
        verify_password_blocking(req.password, DUMMY_HASH.to_string()).await?;
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.into()));
    };

    if !verify_password_blocking(req.password, user.password_hash.clone()).await? {
        warn!(user_id = user.id, "login invalid password");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.into()));
    }

    let token = keys
        .issue(user.id, &user.username)
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?;

    info!(user_id = user.id, "user logged in");
    Ok((token, user))
}
