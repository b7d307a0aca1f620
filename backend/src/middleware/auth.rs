//! Authentication middleware
//!
//! JWT authentication and permission checks

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, ErrorDetail, ErrorResponse};
use crate::services::auth::decode_access_token;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    /// Client profile of a storefront customer
    pub client_id: Option<Uuid>,
    pub role: String,
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Check if user has a specific permission
    pub fn has_permission(&self, resource: &str, action: &str) -> bool {
        let permission = format!("{}:{}", resource, action);
        self.permissions.contains(&permission)
    }

    /// Fail with `InsufficientPermissions` unless the user holds `resource:action`
    pub fn require(&self, resource: &str, action: &str) -> Result<(), AppError> {
        if self.has_permission(resource, action) {
            Ok(())
        } else {
            Err(AppError::InsufficientPermissions)
        }
    }

    /// Client profile of the caller, required by storefront endpoints
    pub fn require_client(&self) -> Result<Uuid, AppError> {
        self.client_id.ok_or(AppError::InsufficientPermissions)
    }
}

/// Authentication middleware that validates JWT access tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    // Extract Authorization header
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => {
            return unauthorized_response("Missing or invalid Authorization header");
        }
    };

    let claims = match decode_access_token(token, &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(AppError::TokenExpired) => return unauthorized_response("Token has expired"),
        Err(_) => return unauthorized_response("Invalid token"),
    };

    let user_id = match Uuid::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => return unauthorized_response("Invalid user ID in token"),
    };

    let client_id = match claims.client_id.as_deref().map(Uuid::parse_str).transpose() {
        Ok(id) => id,
        Err(_) => return unauthorized_response("Invalid client ID in token"),
    };

    let auth_user = AuthUser {
        user_id,
        client_id,
        role: claims.role,
        permissions: claims.permissions,
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// Create unauthorized response
fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message_en: message.to_string(),
            message_es: "No autorizado".to_string(),
            field: None,
        },
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: ErrorDetail {
                        code: "UNAUTHORIZED".to_string(),
                        message_en: "Authentication required".to_string(),
                        message_es: "Debe iniciar sesión".to_string(),
                        field: None,
                    },
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(permissions: &[&str], client_id: Option<Uuid>) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            client_id,
            role: "seller".to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_permission_checks() {
        let seller = user(&["sale:view", "sale:create"], None);
        assert!(seller.has_permission("sale", "view"));
        assert!(seller.require("sale", "create").is_ok());
        assert!(matches!(
            seller.require("product", "delete"),
            Err(AppError::InsufficientPermissions)
        ));
    }

    #[test]
    fn test_require_client() {
        let client_id = Uuid::new_v4();
        assert_eq!(user(&[], Some(client_id)).require_client().ok(), Some(client_id));
        assert!(user(&[], None).require_client().is_err());
    }
}
