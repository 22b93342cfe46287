use crate::auth::auth::AuthUser;
use crate::error::PortalError;
use crate::model::task::{Task, TaskProgress, TaskTemplate};
use crate::service::TaskService;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AllocateQuery {
    /// Back-fill templates created at or before the intern's signup instead.
    #[serde(default)]
    pub include_old: bool,
}

#[derive(Serialize, ToSchema)]
pub struct AllocationResponse {
    #[schema(example = "Allocated 2 task(s)")]
    pub message: String,
    pub tasks: Vec<Task>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkCreateReq {
    pub task: TaskTemplate,
    #[schema(example = json!([7, 8]))]
    pub intern_ids: Vec<u64>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskReq {
    #[serde(flatten)]
    pub task: TaskTemplate,
    /// Leave empty to create an unassigned template.
    #[schema(example = 7)]
    pub intern_id: Option<u64>,
}

/// Allocate template tasks to one intern
#[utoipa::path(
    post,
    path = "/api/tasks/allocate/{intern_id}",
    params(
        ("intern_id" = u64, Path, description = "Intern user ID"),
        AllocateQuery
    ),
    responses(
        (status = 200, description = "Tasks claimed for the intern (possibly none)", body = AllocationResponse),
        (status = 400, description = "User is not an intern"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Intern not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Task"
)]
pub async fn allocate(
    auth: AuthUser,
    tasks: web::Data<TaskService>,
    path: web::Path<u64>,
    query: web::Query<AllocateQuery>,
) -> Result<HttpResponse, PortalError> {
    auth.require_admin()?;
    let intern_id = path.into_inner();

    let claimed = tasks.allocate_for_intern(intern_id, query.include_old).await?;
    let message = if claimed.is_empty() {
        "No tasks to allocate".to_string()
    } else {
        format!("Allocated {} task(s)", claimed.len())
    };

    Ok(HttpResponse::Ok().json(AllocationResponse {
        message,
        tasks: claimed,
    }))
}

/// Create one copy of a task for each listed intern
#[utoipa::path(
    post,
    path = "/api/tasks/bulk",
    request_body = BulkCreateReq,
    responses(
        (status = 201, description = "One task per intern", body = [Task]),
        (status = 400, description = "Empty title or intern list"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Intern not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Task"
)]
pub async fn create_bulk(
    auth: AuthUser,
    tasks: web::Data<TaskService>,
    body: web::Json<BulkCreateReq>,
) -> Result<HttpResponse, PortalError> {
    auth.require_admin()?;
    let body = body.into_inner();

    let created = tasks.create_bulk_tasks(body.task, &body.intern_ids).await?;
    Ok(HttpResponse::Created().json(created))
}

/// Create a single task or template
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTaskReq,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Empty title"),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Task"
)]
pub async fn create_task(
    auth: AuthUser,
    tasks: web::Data<TaskService>,
    body: web::Json<CreateTaskReq>,
) -> Result<HttpResponse, PortalError> {
    auth.require_admin()?;
    let body = body.into_inner();

    let task = tasks.create_task(body.task, body.intern_id).await?;
    Ok(HttpResponse::Created().json(task))
}

/// Tasks assigned to one intern, newest first
#[utoipa::path(
    get,
    path = "/api/tasks/intern/{intern_id}",
    params(
        ("intern_id" = u64, Path, description = "Intern user ID")
    ),
    responses(
        (status = 200, description = "Intern tasks", body = [Task]),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Task"
)]
pub async fn intern_tasks(
    auth: AuthUser,
    tasks: web::Data<TaskService>,
    path: web::Path<u64>,
) -> Result<HttpResponse, PortalError> {
    let intern_id = path.into_inner();
    auth.require_self_or_admin(intern_id)?;

    Ok(HttpResponse::Ok().json(tasks.tasks_for_intern(intern_id).await?))
}

/// Update progress on a task
#[utoipa::path(
    put,
    path = "/api/tasks/{task_id}/progress",
    params(
        ("task_id" = u64, Path, description = "Task ID")
    ),
    request_body = TaskProgress,
    responses(
        (status = 200, description = "Updated task", body = Task),
        (status = 400, description = "No fields provided"),
        (status = 403, description = "Not the task owner"),
        (status = 404, description = "Task not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Task"
)]
pub async fn update_progress(
    auth: AuthUser,
    tasks: web::Data<TaskService>,
    path: web::Path<u64>,
    body: web::Json<TaskProgress>,
) -> Result<HttpResponse, PortalError> {
    let task_id = path.into_inner();

    let task = tasks.find(task_id).await?;
    if !auth.role.is_admin() && task.intern_id != Some(auth.user_id) {
        return Err(PortalError::Forbidden("Not your task".into()));
    }

    Ok(HttpResponse::Ok().json(tasks.update_progress(task_id, &body).await?))
}

/// Delete a task
#[utoipa::path(
    delete,
    path = "/api/tasks/{task_id}",
    params(
        ("task_id" = u64, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Task not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Task"
)]
pub async fn delete_task(
    auth: AuthUser,
    tasks: web::Data<TaskService>,
    path: web::Path<u64>,
) -> Result<HttpResponse, PortalError> {
    auth.require_admin()?;
    tasks.delete(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}
