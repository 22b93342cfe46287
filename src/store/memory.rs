use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{StoreError, StoreResult};
use crate::model::attendance::{AttendanceSession, NewSession, SessionClose};
use crate::model::role::Role;
use crate::model::task::{NewTask, Task, TaskProgress};
use crate::model::user::{NewUser, User, UserCredentials};

use super::{AttendanceStore, TaskStore, UserStore};

#[derive(Default)]
struct State {
    next_id: u64,
    users: Vec<UserCredentials>,
    sessions: Vec<AttendanceSession>,
    tasks: Vec<Task>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local store for demos (`STORE_BACKEND=memory`) and tests.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().expect("memory store poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().expect("memory store poisoned")
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn insert_session(&self, session: NewSession) -> StoreResult<AttendanceSession> {
        let mut state = self.write();
        let row = AttendanceSession {
            id: state.next_id(),
            user_id: session.user_id,
            login_time: Some(session.login_time),
            logout_time: None,
            status: session.status,
            date: session.date,
            working_hours: None,
            created_at: session.created_at,
        };
        state.sessions.push(row.clone());
        Ok(row)
    }

    async fn find_session(&self, id: u64) -> StoreResult<Option<AttendanceSession>> {
        Ok(self.read().sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn open_sessions(&self, user_id: u64) -> StoreResult<Vec<AttendanceSession>> {
        Ok(self
            .read()
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.is_open())
            .cloned()
            .collect())
    }

    async fn close_session(
        &self,
        id: u64,
        close: &SessionClose,
    ) -> StoreResult<Option<AttendanceSession>> {
        let mut state = self.write();
        let Some(row) = state.sessions.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        if row.is_open() {
            row.logout_time = Some(close.logout_time.clone());
            row.working_hours = Some(close.working_hours);
            row.status = close.status;
        }
        Ok(Some(row.clone()))
    }

    async fn sessions_for_user(&self, user_id: u64) -> StoreResult<Vec<AttendanceSession>> {
        Ok(self
            .read()
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn sessions_for_day(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> StoreResult<Vec<AttendanceSession>> {
        Ok(self
            .read()
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.date == date)
            .cloned()
            .collect())
    }

    async fn all_sessions(&self) -> StoreResult<Vec<AttendanceSession>> {
        Ok(self.read().sessions.clone())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_tasks(&self, tasks: Vec<NewTask>) -> StoreResult<Vec<Task>> {
        let mut state = self.write();
        let mut created = Vec::with_capacity(tasks.len());
        for new in tasks {
            let t = new.template;
            created.push(Task {
                id: state.next_id(),
                intern_id: new.intern_id,
                title: t.title,
                description: t.description,
                status: t.status,
                due_date: t.due_date,
                priority: t.priority,
                today_progress: t.today_progress,
                submission_link: t.submission_link,
                remarks: t.remarks,
                created_at: new.created_at,
            });
        }
        state.tasks.extend(created.iter().cloned());
        Ok(created)
    }

    async fn find_task(&self, id: u64) -> StoreResult<Option<Task>> {
        Ok(self.read().tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn find_tasks(&self, ids: &[u64]) -> StoreResult<Vec<Task>> {
        Ok(self
            .read()
            .tasks
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn template_tasks(&self) -> StoreResult<Vec<Task>> {
        let mut templates: Vec<Task> = self
            .read()
            .tasks
            .iter()
            .filter(|t| t.is_template())
            .cloned()
            .collect();
        templates.sort_by_key(|t| (t.created_at, t.id));
        Ok(templates)
    }

    async fn tasks_for_intern(&self, intern_id: u64) -> StoreResult<Vec<Task>> {
        Ok(self
            .read()
            .tasks
            .iter()
            .filter(|t| t.intern_id == Some(intern_id))
            .cloned()
            .collect())
    }

    async fn claim_task(&self, task_id: u64, intern_id: u64) -> StoreResult<Option<Task>> {
        let mut state = self.write();
        match state
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id && t.is_template())
        {
            Some(task) => {
                task.intern_id = Some(intern_id);
                Ok(Some(task.clone()))
            }
            None => Ok(None),
        }
    }

    async fn update_progress(
        &self,
        task_id: u64,
        progress: &TaskProgress,
    ) -> StoreResult<Option<Task>> {
        let mut state = self.write();
        Ok(state.tasks.iter_mut().find(|t| t.id == task_id).map(|task| {
            progress.apply(task);
            task.clone()
        }))
    }

    async fn delete_task(&self, task_id: u64) -> StoreResult<bool> {
        let mut state = self.write();
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != task_id);
        Ok(state.tasks.len() != before)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut state = self.write();
        if state
            .users
            .iter()
            .any(|c| c.user.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(StoreError::Conflict("Username already exists".into()));
        }
        let row = User {
            id: state.next_id(),
            username: user.username,
            role: user.role,
            created_at: user.created_at,
        };
        state.users.push(UserCredentials {
            user: row.clone(),
            password_hash: user.password_hash,
        });
        Ok(row)
    }

    async fn find_user(&self, id: u64) -> StoreResult<Option<User>> {
        Ok(self
            .read()
            .users
            .iter()
            .find(|c| c.user.id == id)
            .map(|c| c.user.clone()))
    }

    async fn find_credentials(&self, username: &str) -> StoreResult<Option<UserCredentials>> {
        Ok(self
            .read()
            .users
            .iter()
            .find(|c| c.user.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn interns_without_tasks(&self) -> StoreResult<Vec<User>> {
        let state = self.read();
        let mut idle: Vec<User> = state
            .users
            .iter()
            .map(|c| &c.user)
            .filter(|u| u.role == Role::Intern)
            .filter(|u| !state.tasks.iter().any(|t| t.intern_id == Some(u.id)))
            .cloned()
            .collect();
        // newest signup first
        idle.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(idle)
    }
}
