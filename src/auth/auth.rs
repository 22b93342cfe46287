use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::PortalError;
use crate::model::role::Role;
use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};
use tracing::debug;

/// Authenticated caller, taken from the bearer token rather than the body.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    /// Resolve the caller from an `Authorization: Bearer <jwt>` header.
    pub fn from_headers(headers: &HeaderMap, secret: &str) -> Result<Self, PortalError> {
        let header = headers
            .get(AUTHORIZATION)
            .ok_or_else(|| PortalError::Unauthorized("Missing Authorization header".into()))?
            .to_str()
            .map_err(|_| {
                PortalError::Unauthorized("Invalid Authorization header encoding".into())
            })?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            PortalError::Unauthorized("Authorization header must start with Bearer".into())
        })?;

        let claims = verify_token(token, secret).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            PortalError::Unauthorized("Invalid or expired token".into())
        })?;

        Ok(Self {
            user_id: claims.user_id,
            username: claims.sub,
            role: claims.role,
        })
    }
}

impl FromRequest for AuthUser {
    type Error = PortalError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected routes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let Some(config) = req.app_data::<Data<Config>>() else {
            return ready(Err(PortalError::Unauthorized("Config missing".into())));
        };
        ready(Self::from_headers(req.headers(), &config.jwt_secret))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), PortalError> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(PortalError::Forbidden("Admin only".into()))
        }
    }

    pub fn require_sadmin(&self) -> Result<(), PortalError> {
        if self.role == Role::Sadmin {
            Ok(())
        } else {
            Err(PortalError::Forbidden("Super admin only".into()))
        }
    }

    /// Interns may only act on their own records; admins on anyone's.
    pub fn require_self_or_admin(&self, user_id: u64) -> Result<(), PortalError> {
        if self.user_id == user_id || self.role.is_admin() {
            Ok(())
        } else {
            Err(PortalError::Forbidden(
                "Not allowed to act for another user".into(),
            ))
        }
    }
}
