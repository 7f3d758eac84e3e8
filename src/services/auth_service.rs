use std::collections::HashMap;

use tracing::info;
use axum::extract::Query;
use axum::http::{self};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation, TokenData};

use crate::auth::{AuthUser, UserCtxCache};
use crate::config::Config;

// Get the auth token from a request
pub fn get_auth_token<B>(req: &http::Request<B>) -> Result<String, String> {
    // 1. Try to get token from Authorization header
    if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
        let auth_str = auth_header.to_str().map_err(|_| "Invalid Authorization header".to_string())?;
        return Ok(auth_str
            .strip_prefix("Bearer ")
            .unwrap_or(auth_str)
            .to_string());
    }

    // 2. Try to get token from cookies
    if let Some(cookie_header) = req.headers().get(http::header::COOKIE) {
        let cookie_str = cookie_header.to_str().map_err(|_| "Invalid Cookie header".to_string())?;
        for c in cookie::Cookie::split_parse(cookie_str).flatten() {
            if c.name() == "auth_token" {
                return Ok(c.value().to_string());
            }
        }
    }

    // 3. Browsers can't set headers on websocket upgrades, so accept a query parameter
    if let Some(token) = query_param(req.uri(), "token") {
        return Ok(token);
    }

    Err("Missing Authorization header, auth_token cookie or token parameter".to_string())
}

/// Resolve the caller of a request.
///
/// Without a configured JWT secret, development setups may name the user with
/// a `user` query parameter.
pub fn authenticate<B>(req: &http::Request<B>, config: &Config, cache: &UserCtxCache) -> Result<AuthUser, String> {
    let Some(secret) = &config.cloud_auth_jwt_secret else {
        if config.is_development() {
            if let Some(user_id) = query_param(req.uri(), "user") {
                return Ok(AuthUser::new(user_id, Vec::new()));
            }
        }
        return Err("No JWT secret configured!".to_string());
    };

    let token = get_auth_token(req)?;
    if let Some(user) = cache.get(&token) {
        return Ok(user);
    }

    let token_data = validate_jwt(&token, secret).map_err(|e| format!("JWT validation failed: {}", e))?;
    let user = user_from_claims(&token_data.claims)?;
    info!("JWT token validated successfully for user: {}", user.user_id);
    cache.insert(&token, user.clone());
    Ok(user)
}

fn user_from_claims(claims: &serde_json::Value) -> Result<AuthUser, String> {
    let uid = claims
        .get("sub")
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| "Can't extract a UID from the JWT token".to_string())?;

    // Get roles from the token claims
    let roles = match claims.get("roles").and_then(|v| v.as_array()) {
        Some(roles_array) => roles_array.iter().filter_map(|r| r.as_str().map(|s| s.to_string())).collect::<Vec<String>>(),
        None => Vec::new(),
    };
    Ok(AuthUser::new(uid, roles))
}

// Percent-decoded value of a query parameter; empty values count as absent
fn query_param(uri: &http::Uri, name: &str) -> Option<String> {
    let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    params.remove(name).filter(|value| !value.is_empty())
}

// Validate a JWT token and return the token data
pub fn validate_jwt(token: &str, secret: &str) -> Result<TokenData<serde_json::Value>, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<serde_json::Value>(token, &decoding_key, &validation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "test-secret";

    fn token_for(sub: &str) -> String {
        let claims = json!({
            "sub": sub,
            "roles": ["Colabri-CloudAdmin"],
            "exp": chrono::Utc::now().timestamp() + 600,
        });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }

    fn config_with_secret() -> Config {
        Config {
            cloud_auth_jwt_secret: Some(SECRET.to_string()),
            ..Config::default()
        }
    }

    fn request(uri: &str) -> http::request::Builder {
        http::Request::builder().uri(uri)
    }

    #[test]
    fn token_is_taken_from_header_cookie_or_query() {
        let req = request("/").header("Authorization", "Bearer abc").body(()).unwrap();
        assert_eq!(get_auth_token(&req).unwrap(), "abc");

        let req = request("/").header("Cookie", "theme=dark; auth_token=def").body(()).unwrap();
        assert_eq!(get_auth_token(&req).unwrap(), "def");

        let req = request("/ws/doc-1?token=ghi").body(()).unwrap();
        assert_eq!(get_auth_token(&req).unwrap(), "ghi");

        let req = request("/").body(()).unwrap();
        assert!(get_auth_token(&req).is_err());
    }

    #[test]
    fn valid_jwt_resolves_user_and_is_cached() {
        let config = config_with_secret();
        let cache = UserCtxCache::new();
        let token = token_for("u1");
        let req = request("/").header("Authorization", format!("Bearer {}", token)).body(()).unwrap();

        let user = authenticate(&req, &config, &cache).unwrap();
        assert_eq!(user.user_id, "u1");
        assert_eq!(user.roles, vec!["Colabri-CloudAdmin"]);
        assert_eq!(cache.get(&token), Some(user));
    }

    #[test]
    fn bad_signature_is_rejected() {
        let config = Config {
            cloud_auth_jwt_secret: Some("other-secret".to_string()),
            ..Config::default()
        };
        let req = request("/").header("Authorization", format!("Bearer {}", token_for("u1"))).body(()).unwrap();
        assert!(authenticate(&req, &config, &UserCtxCache::new()).is_err());
    }

    #[test]
    fn development_accepts_user_parameter_without_secret() {
        let req = request("/ws/doc-1?user=u7").body(()).unwrap();
        let user = authenticate(&req, &Config::default(), &UserCtxCache::new()).unwrap();
        assert_eq!(user.user_id, "u7");

        let production = Config {
            environment: "production".to_string(),
            ..Config::default()
        };
        assert!(authenticate(&req, &production, &UserCtxCache::new()).is_err());
    }

    #[test]
    fn query_parameters_are_percent_decoded() {
        let req = request("/ws/doc-1?user=alice%40example.com&other=x").body(()).unwrap();
        let user = authenticate(&req, &Config::default(), &UserCtxCache::new()).unwrap();
        assert_eq!(user.user_id, "alice@example.com");

        let req = request("/ws/doc-1?token=a%2Bb+c").body(()).unwrap();
        assert_eq!(get_auth_token(&req).unwrap(), "a+b c");

        let req = request("/ws/doc-1?user=").body(()).unwrap();
        assert!(authenticate(&req, &Config::default(), &UserCtxCache::new()).is_err());
    }
}
