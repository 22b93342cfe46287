use crate::auth::auth::AuthUser;
use crate::error::PortalError;
use crate::model::attendance::AttendanceSession;
use crate::service::AttendanceService;
use crate::service::aggregate::DailyAttendance;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClockInReq {
    #[schema(example = 7)]
    pub user_id: Option<u64>,
    /// Epoch milliseconds or ISO-8601; server time when absent.
    #[schema(example = "1767258000000")]
    pub client_time: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClockOutReq {
    #[schema(example = 12)]
    pub attendance_id: Option<u64>,
    #[schema(example = "1767272400000")]
    pub client_time: Option<String>,
}

/// Clock in
#[utoipa::path(
    post,
    path = "/api/attendance/login",
    request_body = ClockInReq,
    responses(
        (status = 200, description = "Session opened; earlier open sessions were closed", body = AttendanceSession),
        (status = 400, description = "userId missing", body = Object, example = json!({
            "message": "userId is required"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_in(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    body: web::Json<ClockInReq>,
) -> Result<HttpResponse, PortalError> {
    let user_id = body
        .user_id
        .ok_or_else(|| PortalError::Validation("userId is required".into()))?;
    auth.require_self_or_admin(user_id)?;

    let session = service
        .record_login(user_id, body.client_time.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(session))
}

/// Clock out
#[utoipa::path(
    post,
    path = "/api/attendance/logout",
    request_body = ClockOutReq,
    responses(
        (status = 200, description = "Session closed, or returned unchanged if already closed", body = AttendanceSession),
        (status = 400, description = "attendanceId missing", body = Object, example = json!({
            "message": "attendanceId is required"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Storage failure or unknown attendance id", body = Object, example = json!({
            "message": "Attendance record 12 not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_out(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    body: web::Json<ClockOutReq>,
) -> Result<HttpResponse, PortalError> {
    let attendance_id = body
        .attendance_id
        .ok_or_else(|| PortalError::Validation("attendanceId is required".into()))?;

    let result: Result<AttendanceSession, PortalError> = async {
        let session = service.find(attendance_id).await?;
        auth.require_self_or_admin(session.user_id)?;
        service
            .record_logout(attendance_id, body.client_time.as_deref())
            .await
    }
    .await;

    match result {
        Ok(session) => Ok(HttpResponse::Ok().json(session)),
        // unknown ids are reported as a server failure on this endpoint
        Err(PortalError::NotFound(message)) => {
            error!(attendance_id, "Logout for unknown attendance record");
            Ok(HttpResponse::InternalServerError().json(json!({ "message": message })))
        }
        Err(e) => Err(e),
    }
}

/// Attendance history of one user, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/{user_id}",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "All sessions of the user", body = [AttendanceSession]),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn user_history(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    path: web::Path<u64>,
) -> Result<HttpResponse, PortalError> {
    let user_id = path.into_inner();
    auth.require_self_or_admin(user_id)?;

    Ok(HttpResponse::Ok().json(service.history(user_id).await?))
}

/// Currently open session of one user, or null
#[utoipa::path(
    get,
    path = "/api/attendance/{user_id}/active",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Open session or null", body = Option<AttendanceSession>),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn active_session(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    path: web::Path<u64>,
) -> Result<HttpResponse, PortalError> {
    let user_id = path.into_inner();
    auth.require_self_or_admin(user_id)?;

    Ok(HttpResponse::Ok().json(service.active_session(user_id).await?))
}

/// Per-day totals of one user, newest day first
#[utoipa::path(
    get,
    path = "/api/attendance/{user_id}/summary",
    params(
        ("user_id" = u64, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Daily rollup", body = [DailyAttendance]),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn daily_summary(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    path: web::Path<u64>,
) -> Result<HttpResponse, PortalError> {
    let user_id = path.into_inner();
    auth.require_self_or_admin(user_id)?;

    Ok(HttpResponse::Ok().json(service.daily_summary(user_id).await?))
}
