use crate::api::admin::{BulkAssignReq, DetailsQuery};
use crate::api::attendance::{ClockInReq, ClockOutReq};
use crate::api::task::{AllocateQuery, AllocationResponse, BulkCreateReq, CreateTaskReq};
use crate::model::attendance::{AttendanceSession, SessionStatus};
use crate::model::role::Role;
use crate::model::task::{Priority, Task, TaskProgress, TaskStatus, TaskTemplate};
use crate::model::user::User;
use crate::models::{CreateUserReq, LoginReqDto, LoginResponse, RegisterReq};
use crate::service::aggregate::{DailyAttendance, DayStatus};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Intern Portal API",
        version = "1.0.0",
        description = r#"
## Intern Portal

Backend for an internship program: interns clock in and out and work through
tasks, admins watch attendance and hand out work.

### 🔹 Key Features
- **Attendance**
  - Clock in and out with client-supplied timestamps
  - Working hours and half-day status computed on clock-out
  - Per-day rollups for every user
- **Tasks**
  - Unassigned tasks act as templates
  - New interns receive templates created after they signed up
  - Bulk creation and bulk assignment of templates

### 🔐 Security
Everything under `/api` requires a **JWT Bearer** token from `/auth/login`.
Interns may only act for themselves; **admin** and **sadmin** may act for anyone.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::create_user,

        crate::api::attendance::clock_in,
        crate::api::attendance::clock_out,
        crate::api::attendance::user_history,
        crate::api::attendance::active_session,
        crate::api::attendance::daily_summary,

        crate::api::task::allocate,
        crate::api::task::create_bulk,
        crate::api::task::create_task,
        crate::api::task::intern_tasks,
        crate::api::task::update_progress,
        crate::api::task::delete_task,

        crate::api::admin::grouped_attendance,
        crate::api::admin::attendance_details,
        crate::api::admin::task_templates,
        crate::api::admin::interns_without_tasks,
        crate::api::admin::bulk_assign
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            LoginResponse,
            CreateUserReq,
            Role,
            User,
            ClockInReq,
            ClockOutReq,
            AttendanceSession,
            SessionStatus,
            DailyAttendance,
            DayStatus,
            DetailsQuery,
            Task,
            TaskStatus,
            Priority,
            TaskTemplate,
            TaskProgress,
            AllocateQuery,
            AllocationResponse,
            BulkCreateReq,
            CreateTaskReq,
            BulkAssignReq
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and account management"),
        (name = "Attendance", description = "Clock-in/clock-out and attendance history"),
        (name = "Task", description = "Task creation, allocation and progress"),
        (name = "Admin", description = "Admin dashboards and bulk operations"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/register",
            "/api/attendance/login",
            "/api/attendance/logout",
            "/api/tasks/allocate/{intern_id}",
            "/api/admin/tasks/bulk-assign",
            "/api/admin/attendance/details",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
