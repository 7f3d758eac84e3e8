use axum::{http::StatusCode, Json};
use crate::models::ErrorResponse;

const CLOUD_ADMIN_ROLE: &str = "Colabri-CloudAdmin";

/// Identity of an authenticated caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn new(user_id: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            user_id: user_id.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

pub fn is_cloud_admin(user: &AuthUser) -> bool {
    user.has_role(CLOUD_ADMIN_ROLE)
}

pub fn ensure_cloud_admin(user: &AuthUser) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    if is_cloud_admin(user) {
        return Ok(());
    }
    Err(ErrorResponse::with_status(
        StatusCode::FORBIDDEN,
        format!("User '{}' is not a cloud admin", user.user_id),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_cloud_admins_pass() {
        let admin = AuthUser::new("u1", vec![CLOUD_ADMIN_ROLE.to_string()]);
        let member = AuthUser::new("u2", vec!["Member".to_string()]);
        assert!(ensure_cloud_admin(&admin).is_ok());

        let (status, body) = ensure_cloud_admin(&member).unwrap_err();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.code, 403);
    }
}
