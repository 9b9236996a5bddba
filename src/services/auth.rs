use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::db::{User, UserRepository};
use crate::error::{AppError, AppResult};
use crate::AppState;

/// bcrypt only looks at the first 72 bytes of its input.
const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

pub struct AuthService;

impl AuthService {
    /// Register a new user. Fields must already be present; this checks the
    /// password length and uniqueness, hashes the password and stores the user.
    pub async fn register(
        state: &Arc<AppState>,
        username: &str,
        email: &str,
        password: &str,
    ) -> AppResult<User> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(AppError::Validation(format!(
                "Password must be at most {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }

        if UserRepository::exists_by_username_or_email(&state.db, username, email).await? {
            return Err(AppError::Conflict("User already exists".to_string()));
        }

        let password_hash =
            Self::hash_password(password.to_string(), state.config.password.bcrypt_cost).await?;

        match UserRepository::create(&state.db, username, email, &password_hash).await {
            Ok(user) => {
                tracing::info!("Registered user {}", user.id);
                Ok(user)
            }
            // Lost a race with a concurrent registration of the same name or email
            Err(e) if e.is_unique_violation() => {
                Err(AppError::Conflict("User already exists".to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Verify email + password and issue an access token.
    pub async fn authenticate(
        state: &Arc<AppState>,
        email: &str,
        password: &str,
    ) -> AppResult<String> {
        // No registered password is this long; bcrypt would compare only its prefix.
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(AppError::InvalidCredentials);
        }

        let user = UserRepository::find_by_email(&state.db, email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !Self::verify_password(password.to_string(), user.password_hash.clone()).await? {
            tracing::debug!("Password mismatch for user {}", user.id);
            return Err(AppError::InvalidCredentials);
        }

        Self::create_jwt(state, user.id)
    }

    /// Verify a token and return the user id it was issued for.
    pub fn identify(state: &Arc<AppState>, token: &str) -> AppResult<i64> {
        let claims = Self::decode_jwt(state, token)?;
        claims.sub.parse::<i64>().map_err(|_| {
            tracing::debug!("Token subject is not a user id: {}", claims.sub);
            AppError::Unauthorized
        })
    }

    /// Get user from JWT token
    pub async fn get_user_from_token(state: &Arc<AppState>, token: &str) -> AppResult<User> {
        let user_id = Self::identify(state, token)?;
        let user = UserRepository::find_by_id(&state.db, user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        Ok(user)
    }

    /// Create a signed JWT for a user id
    pub fn create_jwt(state: &Arc<AppState>, user_id: i64) -> AppResult<String> {
        let now = Utc::now();
        let exp = Duration::try_minutes(state.config.jwt.expiration_minutes)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "JWT expiration of {} minutes is out of range",
                    state.config.jwt.expiration_minutes
                ))
            })?;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(state.config.jwt.secret.as_bytes()),
        )?;
        Ok(token)
    }

    /// Decode and validate a JWT, returning the claims
    pub fn decode_jwt(state: &Arc<AppState>, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt.secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    async fn hash_password(password: String, cost: u32) -> AppResult<String> {
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
            .map_err(|e| AppError::Internal(e.into()))
    }

    async fn verify_password(password: String, hash: String) -> AppResult<bool> {
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
            .map_err(|e| AppError::Internal(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::tests::test_state;

    #[tokio::test]
    async fn register_same_email_twice_conflicts_regardless_of_username() {
        let state = test_state().await;
        AuthService::register(&state, "alice", "alice@x.com", "pw123")
            .await
            .unwrap();

        let res = AuthService::register(&state, "someone_else", "alice@x.com", "pw456").await;
        assert!(matches!(res, Err(AppError::Conflict(_))));

        let res = AuthService::register(&state, "alice", "new@x.com", "pw456").await;
        assert!(matches!(res, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn password_is_stored_hashed() {
        let state = test_state().await;
        let user = AuthService::register(&state, "alice", "alice@x.com", "pw123")
            .await
            .unwrap();

        assert_ne!(user.password_hash, "pw123");
        assert!(user.password_hash.starts_with("$2"));
        assert!(bcrypt::verify("pw123", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn authenticate_rejects_near_miss_passwords() {
        let state = test_state().await;
        AuthService::register(&state, "alice", "alice@x.com", "pw123")
            .await
            .unwrap();

        for wrong in ["pw12", "pw1234", "pw124", "Pw123", "pw123 ", ""] {
            let res = AuthService::authenticate(&state, "alice@x.com", wrong).await;
            assert!(
                matches!(res, Err(AppError::InvalidCredentials)),
                "password {:?} must not authenticate",
                wrong
            );
        }

        let res = AuthService::authenticate(&state, "nobody@x.com", "pw123").await;
        assert!(matches!(res, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn authenticate_rejects_suffix_past_bcrypt_limit() {
        let state = test_state().await;
        let password = "a".repeat(MAX_PASSWORD_BYTES);
        AuthService::register(&state, "alice", "alice@x.com", &password)
            .await
            .unwrap();

        assert!(AuthService::authenticate(&state, "alice@x.com", &password)
            .await
            .is_ok());

        let longer = format!("{}X", password);
        let res = AuthService::authenticate(&state, "alice@x.com", &longer).await;
        assert!(matches!(res, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn overlong_password_is_rejected() {
        let state = test_state().await;
        let long = "a".repeat(MAX_PASSWORD_BYTES + 1);
        let res = AuthService::register(&state, "alice", "alice@x.com", &long).await;
        assert!(matches!(res, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn token_round_trips_to_user_id() {
        let state = test_state().await;
        let user = AuthService::register(&state, "alice", "alice@x.com", "pw123")
            .await
            .unwrap();

        let token = AuthService::authenticate(&state, "alice@x.com", "pw123")
            .await
            .unwrap();
        assert_eq!(AuthService::identify(&state, &token).unwrap(), user.id);

        let loaded = AuthService::get_user_from_token(&state, &token).await.unwrap();
        assert_eq!(loaded.username, "alice");
    }

    #[tokio::test]
    async fn out_of_range_expiration_is_an_error_not_a_panic() {
        let base = test_state().await;
        let mut config = base.config.clone();
        config.jwt.expiration_minutes = i64::MAX;
        let state = Arc::new(AppState {
            db: base.db.clone(),
            config,
            events: base.events.clone(),
        });

        let res = AuthService::create_jwt(&state, 1);
        assert!(matches!(res, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn identify_rejects_tampered_and_expired_tokens() {
        let state = test_state().await;

        let token = AuthService::create_jwt(&state, 1).unwrap();
        let tampered = format!("{}x", token);
        assert!(matches!(
            AuthService::identify(&state, &tampered),
            Err(AppError::Jwt(_))
        ));

        let past = (Utc::now() - Duration::hours(2)).timestamp() as usize;
        let expired = encode(
            &Header::default(),
            &Claims {
                sub: "1".to_string(),
                iat: past,
                exp: past,
            },
            &EncodingKey::from_secret(state.config.jwt.secret.as_bytes()),
        )
        .unwrap();
        assert!(matches!(
            AuthService::identify(&state, &expired),
            Err(AppError::Jwt(_))
        ));

        let foreign = encode(
            &Header::default(),
            &Claims {
                sub: "1".to_string(),
                iat: Utc::now().timestamp() as usize,
                exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
            },
            &EncodingKey::from_secret(b"some-other-secret"),
        )
        .unwrap();
        assert!(AuthService::identify(&state, &foreign).is_err());
    }
}
