//! Authentication service for customer registration, login, and token management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::error::{map_unique_violation, AppError, AppResult};
use shared::{
    default_role_permissions, validate_email, validate_password, validate_phone, ROLE_ADMIN,
    ROLE_CUSTOMER, ROLE_SELLER,
};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// Input for registering a storefront customer
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterCustomerInput {
    #[validate(length(min = 2, max = 120))]
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    #[validate(length(min = 5, max = 20))]
    pub document_number: Option<String>,
}

/// Response after successful registration
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub client_id: Uuid,
    #[serde(flatten)]
    pub tokens: AuthTokens,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub client_id: Option<String>,
    pub role: String,
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Profile of the logged-in user
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Me {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub client_id: Option<Uuid>,
    #[sqlx(skip)]
    pub permissions: Vec<String>,
}

/// User info from database
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    password_hash: String,
    is_active: bool,
}

/// Identity carried into tokens
#[derive(Debug, sqlx::FromRow)]
struct Identity {
    role: String,
    client_id: Option<Uuid>,
}

/// Decode and validate an access token
pub fn decode_access_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

/// Sign an access token
pub fn encode_access_token(claims: &Claims, secret: &str) -> AppResult<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Register a customer account together with its client profile
    pub async fn register_customer(
        &self,
        input: RegisterCustomerInput,
    ) -> AppResult<RegisterResponse> {
        input.validate()?;
        let email = input.email.trim().to_lowercase();
        validate_email(&email)
            .map_err(|m| AppError::invalid("email", m, "Correo electrónico inválido"))?;
        validate_password(&input.password)
            .map_err(|m| AppError::invalid("password", m, "La contraseña es muy débil"))?;
        if let Some(phone) = &input.phone {
            validate_phone(phone)
                .map_err(|m| AppError::invalid("phone", m, "Número de teléfono inválido"))?;
        }

        // Hash password
        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let mut tx = self.db.begin().await?;

        let role_id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM roles WHERE name = $1")
            .bind(ROLE_CUSTOMER)
            .fetch_one(&mut *tx)
            .await?;

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (role_id, email, password_hash, name)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(role_id)
        .bind(&email)
        .bind(&password_hash)
        .bind(&input.name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "email"))?;

        let client_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO clients (user_id, name, document_number, phone, email)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(&input.name)
        .bind(&input.document_number)
        .bind(&input.phone)
        .bind(&email)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%user_id, %client_id, "Registered customer");

        let tokens = self.issue_tokens(user_id).await?;

        Ok(RegisterResponse {
            user_id,
            client_id,
            tokens,
        })
    }

    /// Grant the seeded roles any default permission they are missing
    pub async fn sync_role_permissions(&self) -> AppResult<u64> {
        let mut tx = self.db.begin().await?;
        let mut granted = 0;

        for role in [ROLE_ADMIN, ROLE_SELLER] {
            for key in default_role_permissions(role) {
                let Some((resource, action)) = key.split_once(':') else {
                    continue;
                };

                sqlx::query(
                    r#"
                    INSERT INTO permissions (resource, action) VALUES ($1, $2)
                    ON CONFLICT (resource, action) DO NOTHING
                    "#,
                )
                .bind(resource)
                .bind(action)
                .execute(&mut *tx)
                .await?;

                granted += sqlx::query(
                    r#"
                    INSERT INTO role_permissions (role_id, permission_id)
                    SELECT ro.id, p.id
                    FROM roles ro, permissions p
                    WHERE ro.name = $1 AND p.resource = $2 AND p.action = $3
                    ON CONFLICT DO NOTHING
                    "#,
                )
                .bind(role)
                .bind(resource)
                .bind(action)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            }
        }

        tx.commit().await?;
        if granted > 0 {
            tracing::info!(granted, "Granted missing role permissions");
        }
        Ok(granted)
    }

    /// Create the first back office administrator if no user has that email yet
    pub async fn ensure_admin(&self, email: &str, password: &str, name: &str) -> AppResult<bool> {
        let email = email.trim().to_lowercase();
        validate_email(&email)
            .map_err(|m| AppError::invalid("admin.email", m, "Correo electrónico inválido"))?;
        validate_password(password)
            .map_err(|m| AppError::invalid("admin.password", m, "La contraseña es muy débil"))?;

        let password_hash = hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let created = sqlx::query(
            r#"
            INSERT INTO users (role_id, email, password_hash, name)
            SELECT id, $2, $3, $4 FROM roles WHERE name = $1
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(ROLE_ADMIN)
        .bind(&email)
        .bind(&password_hash)
        .bind(name)
        .execute(&self.db)
        .await?
        .rows_affected()
            > 0;

        if created {
            tracing::info!(%email, "Created administrator account");
        }
        Ok(created)
    }

    /// Authenticate user with email and password
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthTokens> {
        let user = sqlx::query_as::<_, UserRow>(
            "SELECT id, password_hash, is_active FROM users WHERE email = $1",
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AppError::InvalidCredentials);
        }

        let valid = verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(&self.db)
            .await?;

        self.issue_tokens(user.id).await
    }

    /// Refresh access token using refresh token
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let token_hash = Self::hash_token(refresh_token);

        // Revoke and look up in one statement so a token is only ever used once
        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE refresh_tokens rt
            SET revoked_at = NOW()
            FROM users u
            WHERE rt.token_hash = $1
              AND u.id = rt.user_id
              AND rt.expires_at > NOW()
              AND rt.revoked_at IS NULL
              AND u.is_active = true
            RETURNING rt.user_id
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidToken)?;

        self.issue_tokens(user_id).await
    }

    /// Profile of the current user
    pub async fn me(&self, user_id: Uuid) -> AppResult<Me> {
        let mut me = sqlx::query_as::<_, Me>(
            r#"
            SELECT u.id, u.email, u.name, r.name AS role, c.id AS client_id
            FROM users u
            JOIN roles r ON r.id = u.role_id
            LEFT JOIN clients c ON c.user_id = u.id
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        me.permissions = self.get_user_permissions(user_id).await?;
        Ok(me)
    }

    /// Build and persist a fresh token pair for a user
    async fn issue_tokens(&self, user_id: Uuid) -> AppResult<AuthTokens> {
        let identity = sqlx::query_as::<_, Identity>(
            r#"
            SELECT r.name AS role, c.id AS client_id
            FROM users u
            JOIN roles r ON r.id = u.role_id
            LEFT JOIN clients c ON c.user_id = u.id
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let permissions = self.get_user_permissions(user_id).await?;
        let tokens = self.generate_tokens(user_id, identity, permissions)?;
        self.store_refresh_token(user_id, &tokens.refresh_token).await?;

        Ok(tokens)
    }

    /// Get user permissions from database
    async fn get_user_permissions(&self, user_id: Uuid) -> AppResult<Vec<String>> {
        let permissions = sqlx::query_scalar::<_, String>(
            r#"
            SELECT CONCAT(p.resource, ':', p.action)
            FROM users u
            JOIN role_permissions rp ON rp.role_id = u.role_id
            JOIN permissions p ON p.id = rp.permission_id
            WHERE u.id = $1
            ORDER BY p.resource, p.action
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    /// Generate access and refresh tokens
    fn generate_tokens(
        &self,
        user_id: Uuid,
        identity: Identity,
        permissions: Vec<String>,
    ) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let access_exp = now + Duration::seconds(self.access_token_expiry);

        let access_claims = Claims {
            sub: user_id.to_string(),
            client_id: identity.client_id.map(|id| id.to_string()),
            role: identity.role,
            permissions,
            exp: access_exp.timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode_access_token(&access_claims, &self.jwt_secret)?;

        // Refresh token is opaque; only its hash is stored
        let refresh_token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    /// Store refresh token in database
    async fn store_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        let token_hash = Self::hash_token(token);
        let expires_at = Utc::now() + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(&token_hash)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Hash a token for storage
    fn hash_token(token: &str) -> String {
        let digest = Sha256::digest(token.as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(exp_offset: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: Uuid::new_v4().to_string(),
            client_id: Some(Uuid::new_v4().to_string()),
            role: ROLE_CUSTOMER.to_string(),
            permissions: vec![],
            exp: now + exp_offset,
            iat: now,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let original = claims(3600);
        let token = encode_access_token(&original, "secret").unwrap();
        let decoded = decode_access_token(&token, "secret").unwrap();
        assert_eq!(decoded.sub, original.sub);
        assert_eq!(decoded.client_id, original.client_id);
        assert_eq!(decoded.role, ROLE_CUSTOMER);
    }

    #[test]
    fn test_token_wrong_secret() {
        let token = encode_access_token(&claims(3600), "secret").unwrap();
        assert!(matches!(
            decode_access_token(&token, "other"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token() {
        // well past the default 60s leeway
        let token = encode_access_token(&claims(-600), "secret").unwrap();
        assert!(matches!(
            decode_access_token(&token, "secret"),
            Err(AppError::TokenExpired)
        ));
    }

    #[test]
    fn test_hash_token_is_stable_hex() {
        let a = AuthService::hash_token("abc");
        assert_eq!(a, AuthService::hash_token("abc"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, AuthService::hash_token("abd"));
    }
}
