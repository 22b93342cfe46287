use crate::{
    auth::{auth::AuthUser, jwt::generate_access_token},
    config::Config,
    error::PortalError,
    model::role::Role,
    models::{CreateUserReq, LoginReqDto, LoginResponse, RegisterReq},
    service::{TaskService, UserDirectory},
};
use actix_web::{HttpResponse, web};
use serde_json::json;
use tracing::{error, info, instrument, warn};

/// Intern self-registration. Template tasks created after signup are
/// allocated straight away; a failed allocation does not undo the signup.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Intern registered", body = Object, example = json!({
            "message": "User registered successfully",
            "userId": 7,
            "allocated": 0
        })),
        (status = 400, description = "Empty username or password"),
        (status = 409, description = "Username already exists")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(users, tasks, body), fields(username = %body.username))]
pub async fn register(
    body: web::Json<RegisterReq>,
    users: web::Data<UserDirectory>,
    tasks: web::Data<TaskService>,
) -> Result<HttpResponse, PortalError> {
    let user = users
        .register(&body.username, &body.password, Role::Intern)
        .await?;

    let allocated = match tasks.allocate_for_intern(user.id, false).await {
        Ok(claimed) => claimed.len(),
        Err(e) => {
            warn!(error = %e, user_id = user.id, "Allocation at signup failed");
            0
        }
    };

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "userId": user.id,
        "allocated": allocated
    })))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Access token issued", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Token could not be signed")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(users, config, body), fields(username = %body.username))]
pub async fn login(
    body: web::Json<LoginReqDto>,
    users: web::Data<UserDirectory>,
    config: web::Data<Config>,
) -> Result<HttpResponse, PortalError> {
    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(PortalError::Validation("Username or password required".into()));
    }

    let user = users.authenticate(&body.username, &body.password).await?;

    let access_token = generate_access_token(
        user.id,
        user.username.clone(),
        user.role,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, user_id = user.id, "Failed to sign access token");
        PortalError::Internal("Could not issue token".into())
    })?;

    info!(user_id = user.id, "Login successful");
    Ok(HttpResponse::Ok().json(LoginResponse { access_token }))
}

/// Super admin creates an account with any role.
#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "User created", body = crate::model::user::User),
        (status = 403, description = "Super admin only"),
        (status = 409, description = "Username already exists")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn create_user(
    auth: AuthUser,
    body: web::Json<CreateUserReq>,
    users: web::Data<UserDirectory>,
) -> Result<HttpResponse, PortalError> {
    auth.require_sadmin()?;

    let user = users
        .register(&body.username, &body.password, body.role)
        .await?;
    info!(created_by = auth.user_id, user_id = user.id, role = %user.role, "Account created");
    Ok(HttpResponse::Created().json(user))
}
