use std::sync::Arc;
use std::time::Duration;

use actix_web::web::{self, Data};

use crate::service::{AttendanceService, TaskService, UserDirectory};
use crate::store::{AttendanceStore, TaskStore, UserStore};

/// Shared services handed to every worker through `app_data`.
#[derive(Clone)]
pub struct AppState {
    pub users: Data<UserDirectory>,
    pub attendance: Data<AttendanceService>,
    pub tasks: Data<TaskService>,
}

impl AppState {
    /// Wire all services to one backend that implements every store.
    pub fn new<S>(store: Arc<S>, user_cache_ttl: Duration) -> Self
    where
        S: AttendanceStore + TaskStore + UserStore + 'static,
    {
        let user_store: Arc<dyn UserStore> = store.clone();
        let task_store: Arc<dyn TaskStore> = store.clone();
        let attendance_store: Arc<dyn AttendanceStore> = store;

        let users = UserDirectory::new(user_store, user_cache_ttl);
        let tasks = TaskService::new(task_store, users.clone());

        Self {
            users: Data::new(users),
            attendance: Data::new(AttendanceService::new(attendance_store)),
            tasks: Data::new(tasks),
        }
    }

    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.users.clone())
            .app_data(self.attendance.clone())
            .app_data(self.tasks.clone());
    }
}
