use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::error::PortalError;
use crate::model::task::{NewTask, Task, TaskProgress, TaskTemplate};
use crate::service::users::UserDirectory;
use crate::store::TaskStore;

/// Whether `task` may be claimed by an intern who signed up at `signup`.
///
/// The default pass takes templates created after signup; the `include_old`
/// pass takes the complement. Together they cover every template exactly once.
pub fn is_candidate(task: &Task, signup: DateTime<Utc>, include_old: bool) -> bool {
    task.is_template()
        && if include_old {
            task.created_at <= signup
        } else {
            task.created_at > signup
        }
}

/// Template allocation and admin task management.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    users: UserDirectory,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, users: UserDirectory) -> Self {
        Self { store, users }
    }

    /// Claim eligible template tasks for one intern. An empty result is normal.
    pub async fn allocate_for_intern(
        &self,
        intern_id: u64,
        include_old: bool,
    ) -> Result<Vec<Task>, PortalError> {
        let intern = self.users.require_intern(intern_id).await?;

        let templates = self.store.template_tasks().await.map_err(|e| {
            error!(error = %e, intern_id, "Failed to list template tasks");
            PortalError::from(e)
        })?;

        let mut claimed = Vec::new();
        for task in templates
            .iter()
            .filter(|t| is_candidate(t, intern.created_at, include_old))
        {
            match self.store.claim_task(task.id, intern_id).await {
                Ok(Some(task)) => claimed.push(task),
                // lost the race to another allocation
                Ok(None) => continue,
                Err(e) => {
                    error!(
                        error = %e,
                        intern_id,
                        task_id = task.id,
                        claimed = claimed.len(),
                        "Allocation stopped part way"
                    );
                    return Err(e.into());
                }
            }
        }

        info!(intern_id, include_old, count = claimed.len(), "Allocated template tasks");
        Ok(claimed)
    }

    /// One independent copy of `template` per intern, all inserted together.
    pub async fn create_bulk_tasks(
        &self,
        template: TaskTemplate,
        intern_ids: &[u64],
    ) -> Result<Vec<Task>, PortalError> {
        validate_template(&template)?;
        let intern_ids = self.checked_interns(intern_ids).await?;

        let now = Utc::now();
        let rows = intern_ids
            .iter()
            .map(|&intern_id| NewTask {
                intern_id: Some(intern_id),
                template: template.clone(),
                created_at: now,
            })
            .collect();

        let created = self.insert(rows).await?;
        info!(count = created.len(), title = %template.title, "Created bulk tasks");
        Ok(created)
    }

    /// Cross product of templates × interns. Templates stay unassigned.
    pub async fn manual_bulk_assign(
        &self,
        task_ids: &[u64],
        intern_ids: &[u64],
    ) -> Result<Vec<Task>, PortalError> {
        let task_ids = dedup(task_ids);
        if task_ids.is_empty() {
            return Err(PortalError::Validation("taskIds must not be empty".into()));
        }
        let intern_ids = self.checked_interns(intern_ids).await?;

        let found = self.store.find_tasks(&task_ids).await.map_err(|e| {
            error!(error = %e, "Failed to load tasks for bulk assignment");
            PortalError::from(e)
        })?;

        let mut templates = Vec::with_capacity(task_ids.len());
        for id in &task_ids {
            let task = found
                .iter()
                .find(|t| t.id == *id)
                .ok_or_else(|| PortalError::NotFound(format!("Task {id} not found")))?;
            if !task.is_template() {
                return Err(PortalError::Validation(format!(
                    "Task {id} is already assigned and cannot be used as a template"
                )));
            }
            templates.push(TaskTemplate::from_task(task));
        }

        let now = Utc::now();
        let rows = templates
            .iter()
            .flat_map(|template| {
                intern_ids.iter().map(move |&intern_id| NewTask {
                    intern_id: Some(intern_id),
                    template: template.clone(),
                    created_at: now,
                })
            })
            .collect();

        let created = self.insert(rows).await?;
        info!(
            templates = task_ids.len(),
            interns = intern_ids.len(),
            count = created.len(),
            "Bulk assigned template tasks"
        );
        Ok(created)
    }

    /// Create one task; with no intern it becomes a template.
    pub async fn create_task(
        &self,
        template: TaskTemplate,
        intern_id: Option<u64>,
    ) -> Result<Task, PortalError> {
        validate_template(&template)?;
        if let Some(id) = intern_id {
            self.users.require_intern(id).await?;
        }

        let mut created = self
            .insert(vec![NewTask {
                intern_id,
                template,
                created_at: Utc::now(),
            }])
            .await?;
        created
            .pop()
            .ok_or_else(|| PortalError::Validation("Task was not created".into()))
    }

    /// Unassigned tasks, oldest first.
    pub async fn templates(&self) -> Result<Vec<Task>, PortalError> {
        self.store.template_tasks().await.map_err(|e| {
            error!(error = %e, "Failed to list template tasks");
            PortalError::from(e)
        })
    }

    /// Tasks of one intern, newest first.
    pub async fn tasks_for_intern(&self, intern_id: u64) -> Result<Vec<Task>, PortalError> {
        let mut tasks = self.store.tasks_for_intern(intern_id).await.map_err(|e| {
            error!(error = %e, intern_id, "Failed to list intern tasks");
            PortalError::from(e)
        })?;
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tasks)
    }

    pub async fn find(&self, task_id: u64) -> Result<Task, PortalError> {
        self.store
            .find_task(task_id)
            .await
            .map_err(|e| {
                error!(error = %e, task_id, "Failed to fetch task");
                PortalError::from(e)
            })?
            .ok_or_else(|| PortalError::NotFound(format!("Task {task_id} not found")))
    }

    pub async fn update_progress(
        &self,
        task_id: u64,
        progress: &TaskProgress,
    ) -> Result<Task, PortalError> {
        if progress.is_empty() {
            return Err(PortalError::Validation("No fields provided for update".into()));
        }
        self.store
            .update_progress(task_id, progress)
            .await
            .map_err(|e| {
                error!(error = %e, task_id, "Failed to update task progress");
                PortalError::from(e)
            })?
            .ok_or_else(|| PortalError::NotFound(format!("Task {task_id} not found")))
    }

    pub async fn delete(&self, task_id: u64) -> Result<(), PortalError> {
        let deleted = self.store.delete_task(task_id).await.map_err(|e| {
            error!(error = %e, task_id, "Failed to delete task");
            PortalError::from(e)
        })?;
        if !deleted {
            return Err(PortalError::NotFound(format!("Task {task_id} not found")));
        }
        info!(task_id, "Deleted task");
        Ok(())
    }

    async fn checked_interns(&self, intern_ids: &[u64]) -> Result<Vec<u64>, PortalError> {
        let intern_ids = dedup(intern_ids);
        if intern_ids.is_empty() {
            return Err(PortalError::Validation("internIds must not be empty".into()));
        }
        for id in &intern_ids {
            self.users.require_intern(*id).await?;
        }
        Ok(intern_ids)
    }

    async fn insert(&self, rows: Vec<NewTask>) -> Result<Vec<Task>, PortalError> {
        let count = rows.len();
        self.store.insert_tasks(rows).await.map_err(|e| {
            error!(error = %e, count, "Failed to insert tasks, nothing was created");
            PortalError::from(e)
        })
    }
}

fn validate_template(template: &TaskTemplate) -> Result<(), PortalError> {
    if template.title.trim().is_empty() {
        return Err(PortalError::Validation("Task title must not be empty".into()));
    }
    Ok(())
}

/// Drop repeated ids, keeping first-seen order.
fn dedup(ids: &[u64]) -> Vec<u64> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}
