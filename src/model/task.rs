use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Default,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Assigned,
    InProgress,
    Completed,
}

#[derive(
    Debug,
    Copy,
    Clone,
    Default,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// A task row. `intern_id == None` marks a template that is still
/// available for allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[schema(example = 31)]
    pub id: u64,
    #[schema(example = 7, nullable = true)]
    pub intern_id: Option<u64>,
    #[schema(example = "Set up the dev environment")]
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    #[schema(example = "2026-01-15", format = "date", value_type = Option<String>)]
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub today_progress: Option<String>,
    pub submission_link: Option<String>,
    pub remarks: Option<String>,
    #[schema(example = "2026-01-01T09:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn is_template(&self) -> bool {
        self.intern_id.is_none()
    }
}

/// Admin-authored task fields, shared by single, bulk and template creation.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskTemplate {
    #[schema(example = "Write the onboarding report")]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[schema(example = "2026-01-15", format = "date", value_type = Option<String>)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Priority,
    pub today_progress: Option<String>,
    pub submission_link: Option<String>,
    pub remarks: Option<String>,
}

impl TaskTemplate {
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            due_date: task.due_date,
            priority: task.priority,
            today_progress: task.today_progress.clone(),
            submission_link: task.submission_link.clone(),
            remarks: task.remarks.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub intern_id: Option<u64>,
    pub template: TaskTemplate,
    pub created_at: DateTime<Utc>,
}

/// Intern-side progress update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskProgress {
    pub status: Option<TaskStatus>,
    pub today_progress: Option<String>,
    pub submission_link: Option<String>,
    pub remarks: Option<String>,
}

impl TaskProgress {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.today_progress.is_none()
            && self.submission_link.is_none()
            && self.remarks.is_none()
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(progress) = &self.today_progress {
            task.today_progress = Some(progress.clone());
        }
        if let Some(link) = &self.submission_link {
            task.submission_link = Some(link.clone());
        }
        if let Some(remarks) = &self.remarks {
            task.remarks = Some(remarks.clone());
        }
    }
}
