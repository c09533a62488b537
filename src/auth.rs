/// Actor authentication
use crate::{account::Role, context::AppContext, error::ModError};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Verified identity of the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorIdentity {
    pub username: String,
    pub role: Role,
}

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    pub role: String,
    /// Expiry, seconds since the epoch
    pub exp: usize,
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

/// Verify the caller's access token.
///
/// With `require_privileged` the token's role must also be allowed to
/// moderate; otherwise any valid role is accepted.
pub fn verify_actor(
    headers: &HeaderMap,
    require_privileged: bool,
    jwt_secret: &str,
) -> Result<ActorIdentity, ModError> {
    let token = extract_bearer_token(headers)
        .ok_or_else(|| ModError::Authentication("Missing authorization header".to_string()))?;

    let claims = verify_access_token(&token, jwt_secret)?;
    let role = claims
        .role
        .parse::<Role>()
        .map_err(|e| ModError::Authentication(format!("Invalid token: {}", e)))?;

    if require_privileged && !role.is_privileged() {
        tracing::warn!("Actor {} with role {} attempted a privileged call", claims.sub, role);
        return Err(ModError::Authorization("Admin role required".to_string()));
    }

    Ok(ActorIdentity {
        username: claims.sub,
        role,
    })
}

/// Verify a JWT token's signature and expiry
pub fn verify_access_token(token: &str, jwt_secret: &str) -> Result<Claims, ModError> {
    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    // Allow some clock skew (5 minutes)
    validation.leeway = 300;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("JWT verification failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ModError::Authentication("Token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    ModError::Authentication("Invalid token signature".to_string())
                }
                _ => ModError::Authentication(format!("Invalid token: {}", e)),
            }
        })
}

/// Issue an access token for `username`, valid for `ttl`
pub fn issue_access_token(
    username: &str,
    role: Role,
    ttl: chrono::Duration,
    jwt_secret: &str,
) -> Result<String, ModError> {
    let exp = (chrono::Utc::now() + ttl).timestamp().max(0) as usize;
    let claims = Claims {
        sub: username.to_string(),
        role: role.as_str().to_string(),
        exp,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| ModError::Internal(format!("Failed to sign token: {}", e)))
}

/// Privileged actor extractor for moderation routes
#[derive(Debug, Clone)]
pub struct AdminActor(pub ActorIdentity);

#[async_trait]
impl FromRequestParts<AppContext> for AdminActor {
    type Rejection = ModError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let actor = verify_actor(&parts.headers, true, &state.config.authentication.jwt_secret)?;
        tracing::debug!("Verified moderator {}", actor.username);
        Ok(AdminActor(actor))
    }
}
