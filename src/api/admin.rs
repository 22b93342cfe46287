use crate::auth::auth::AuthUser;
use crate::error::PortalError;
use crate::model::attendance::AttendanceSession;
use crate::model::task::Task;
use crate::model::user::User;
use crate::service::aggregate::DailyAttendance;
use crate::service::{AttendanceService, TaskService, UserDirectory};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DetailsQuery {
    #[param(example = 7)]
    pub user_id: Option<u64>,
    /// Calendar day as YYYY-MM-DD.
    #[param(example = "2026-01-01")]
    pub date: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkAssignReq {
    #[schema(example = json!([31, 32]))]
    pub task_ids: Vec<u64>,
    #[schema(example = json!([7, 8]))]
    pub intern_ids: Vec<u64>,
}

/// Attendance of every user grouped by day, newest day first
#[utoipa::path(
    get,
    path = "/api/admin/attendance/grouped",
    responses(
        (status = 200, description = "One row per user and day", body = [DailyAttendance]),
        (status = 403, description = "Admin only"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn grouped_attendance(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, PortalError> {
    auth.require_admin()?;
    Ok(HttpResponse::Ok().json(service.grouped().await?))
}

/// Individual sessions of one user on one day
#[utoipa::path(
    get,
    path = "/api/admin/attendance/details",
    params(DetailsQuery),
    responses(
        (status = 200, description = "Sessions, earliest login first", body = [AttendanceSession]),
        (status = 400, description = "userId or date missing or malformed"),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn attendance_details(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    query: web::Query<DetailsQuery>,
) -> Result<HttpResponse, PortalError> {
    auth.require_admin()?;

    let (Some(user_id), Some(raw_date)) = (query.user_id, query.date.as_deref()) else {
        return Err(PortalError::Validation("userId and date are required".into()));
    };
    let date = NaiveDate::parse_from_str(raw_date.trim(), "%Y-%m-%d")
        .map_err(|_| PortalError::Validation(format!("Invalid date `{raw_date}`")))?;

    Ok(HttpResponse::Ok().json(service.day_details(user_id, date).await?))
}

/// Unassigned tasks that serve as templates
#[utoipa::path(
    get,
    path = "/api/admin/task-templates",
    responses(
        (status = 200, description = "Template tasks, oldest first", body = [Task]),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn task_templates(
    auth: AuthUser,
    tasks: web::Data<TaskService>,
) -> Result<HttpResponse, PortalError> {
    auth.require_admin()?;
    Ok(HttpResponse::Ok().json(tasks.templates().await?))
}

/// Interns that have no task at all
#[utoipa::path(
    get,
    path = "/api/admin/interns-without-tasks",
    responses(
        (status = 200, description = "Interns without tasks", body = [User]),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn interns_without_tasks(
    auth: AuthUser,
    users: web::Data<UserDirectory>,
) -> Result<HttpResponse, PortalError> {
    auth.require_admin()?;
    Ok(HttpResponse::Ok().json(users.interns_without_tasks().await?))
}

/// Copy each listed template to each listed intern
#[utoipa::path(
    post,
    path = "/api/admin/tasks/bulk-assign",
    request_body = BulkAssignReq,
    responses(
        (status = 201, description = "Created tasks, one per template and intern", body = [Task]),
        (status = 400, description = "Empty list, non-intern, or a task that is not a template"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Task or intern not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn bulk_assign(
    auth: AuthUser,
    tasks: web::Data<TaskService>,
    body: web::Json<BulkAssignReq>,
) -> Result<HttpResponse, PortalError> {
    auth.require_admin()?;

    let created = tasks
        .manual_bulk_assign(&body.task_ids, &body.intern_ids)
        .await?;
    Ok(HttpResponse::Created().json(created))
}
