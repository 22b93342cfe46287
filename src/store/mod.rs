//! Persistence seam. Services hold `Arc<dyn …Store>` and never see SQL.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::StoreResult;
use crate::model::attendance::{AttendanceSession, NewSession, SessionClose};
use crate::model::task::{NewTask, Task, TaskProgress};
use crate::model::user::{NewUser, User, UserCredentials};

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn insert_session(&self, session: NewSession) -> StoreResult<AttendanceSession>;

    async fn find_session(&self, id: u64) -> StoreResult<Option<AttendanceSession>>;

    /// Sessions of `user_id` whose logout time is absent.
    async fn open_sessions(&self, user_id: u64) -> StoreResult<Vec<AttendanceSession>>;

    /// Write the close values if the session is still open, then return the
    /// row as stored. A session that was already closed comes back unchanged.
    async fn close_session(
        &self,
        id: u64,
        close: &SessionClose,
    ) -> StoreResult<Option<AttendanceSession>>;

    async fn sessions_for_user(&self, user_id: u64) -> StoreResult<Vec<AttendanceSession>>;

    async fn sessions_for_day(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> StoreResult<Vec<AttendanceSession>>;

    async fn all_sessions(&self) -> StoreResult<Vec<AttendanceSession>>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert every row or none of them.
    async fn insert_tasks(&self, tasks: Vec<NewTask>) -> StoreResult<Vec<Task>>;

    async fn find_task(&self, id: u64) -> StoreResult<Option<Task>>;

    async fn find_tasks(&self, ids: &[u64]) -> StoreResult<Vec<Task>>;

    /// Tasks with no intern, oldest first.
    async fn template_tasks(&self) -> StoreResult<Vec<Task>>;

    async fn tasks_for_intern(&self, intern_id: u64) -> StoreResult<Vec<Task>>;

    /// Assign `task_id` to `intern_id` only while it is still a template.
    /// `None` means somebody else claimed it first (or it is gone).
    async fn claim_task(&self, task_id: u64, intern_id: u64) -> StoreResult<Option<Task>>;

    async fn update_progress(
        &self,
        task_id: u64,
        progress: &TaskProgress,
    ) -> StoreResult<Option<Task>>;

    async fn delete_task(&self, task_id: u64) -> StoreResult<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `StoreError::Conflict` when the username is taken.
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_user(&self, id: u64) -> StoreResult<Option<User>>;

    async fn find_credentials(&self, username: &str) -> StoreResult<Option<UserCredentials>>;

    async fn interns_without_tasks(&self) -> StoreResult<Vec<User>>;
}
