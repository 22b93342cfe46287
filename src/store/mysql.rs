use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySqlPool};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::model::attendance::{AttendanceSession, NewSession, SessionClose, SessionStatus};
use crate::model::role::Role;
use crate::model::task::{NewTask, Priority, Task, TaskProgress, TaskStatus};
use crate::model::user::{NewUser, User, UserCredentials};

use super::{AttendanceStore, TaskStore, UserStore};

const SESSION_COLUMNS: &str =
    "id, user_id, login_time, logout_time, status, `date`, working_hours, created_at";

const TASK_COLUMNS: &str = "id, intern_id, title, description, status, due_date, priority, \
     today_progress, submission_link, remarks, created_at";

const USER_COLUMNS: &str = "id, username, password, role, created_at";

#[derive(FromRow)]
struct SessionRow {
    id: u64,
    user_id: u64,
    login_time: Option<String>,
    logout_time: Option<String>,
    status: String,
    date: NaiveDate,
    working_hours: Option<f64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for AttendanceSession {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(AttendanceSession {
            id: row.id,
            user_id: row.user_id,
            login_time: row.login_time,
            logout_time: row.logout_time,
            status: parse_column("attendance.status", &row.status)?,
            date: row.date,
            working_hours: row.working_hours,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct TaskRow {
    id: u64,
    intern_id: Option<u64>,
    title: String,
    description: Option<String>,
    status: String,
    due_date: Option<NaiveDate>,
    priority: String,
    today_progress: Option<String>,
    submission_link: Option<String>,
    remarks: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            intern_id: row.intern_id,
            title: row.title,
            description: row.description,
            status: parse_column::<TaskStatus>("tasks.status", &row.status)?,
            due_date: row.due_date,
            priority: parse_column::<Priority>("tasks.priority", &row.priority)?,
            today_progress: row.today_progress,
            submission_link: row.submission_link,
            remarks: row.remarks,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: u64,
    username: String,
    password: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserCredentials {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserCredentials {
            user: User {
                id: row.id,
                username: row.username,
                role: parse_column::<Role>("users.role", &row.role)?,
                created_at: row.created_at,
            },
            password_hash: row.password,
        })
    }
}

fn parse_column<T: FromStr>(column: &str, value: &str) -> StoreResult<T> {
    T::from_str(value).map_err(|_| StoreError::Corrupt(format!("{column} = {value:?}")))
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// MySQL-backed implementation of every store trait.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Apply pending versioned migrations from `migrations/`.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn insert_session(&self, session: NewSession) -> StoreResult<AttendanceSession> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance (user_id, login_time, status, `date`, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.user_id)
        .bind(&session.login_time)
        .bind(session.status.as_ref())
        .bind(session.date)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;

        Ok(AttendanceSession {
            id: result.last_insert_id(),
            user_id: session.user_id,
            login_time: Some(session.login_time),
            logout_time: None,
            status: session.status,
            date: session.date,
            working_hours: None,
            created_at: session.created_at,
        })
    }

    async fn find_session(&self, id: u64) -> StoreResult<Option<AttendanceSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM attendance WHERE id = ?");
        sqlx::query_as::<_, SessionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceSession::try_from)
            .transpose()
    }

    async fn open_sessions(&self, user_id: u64) -> StoreResult<Vec<AttendanceSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM attendance WHERE user_id = ? AND logout_time IS NULL"
        );
        let rows = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn close_session(
        &self,
        id: u64,
        close: &SessionClose,
    ) -> StoreResult<Option<AttendanceSession>> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET logout_time = ?, working_hours = ?, status = ?
            WHERE id = ?
            AND logout_time IS NULL
            "#,
        )
        .bind(&close.logout_time)
        .bind(close.working_hours)
        .bind(close.status.as_ref())
        .bind(id)
        .execute(&self.pool)
        .await?;

        debug!(attendance_id = id, rows = result.rows_affected(), "Close session");

        self.find_session(id).await
    }

    async fn sessions_for_user(&self, user_id: u64) -> StoreResult<Vec<AttendanceSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM attendance WHERE user_id = ?");
        let rows = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn sessions_for_day(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> StoreResult<Vec<AttendanceSession>> {
        let sql =
            format!("SELECT {SESSION_COLUMNS} FROM attendance WHERE user_id = ? AND `date` = ?");
        let rows = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(user_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn all_sessions(&self) -> StoreResult<Vec<AttendanceSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM attendance");
        let rows = sqlx::query_as::<_, SessionRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }
}

#[async_trait]
impl TaskStore for MySqlStore {
    async fn insert_tasks(&self, tasks: Vec<NewTask>) -> StoreResult<Vec<Task>> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(tasks.len());

        for new in tasks {
            let t = new.template;
            let result = sqlx::query(
                r#"
                INSERT INTO tasks
                    (intern_id, title, description, status, due_date, priority,
                     today_progress, submission_link, remarks, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(new.intern_id)
            .bind(&t.title)
            .bind(&t.description)
            .bind(t.status.as_ref())
            .bind(t.due_date)
            .bind(t.priority.as_ref())
            .bind(&t.today_progress)
            .bind(&t.submission_link)
            .bind(&t.remarks)
            .bind(new.created_at)
            .execute(&mut *tx)
            .await?;

            created.push(Task {
                id: result.last_insert_id(),
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

        tx.commit().await?;
        Ok(created)
    }

    async fn find_task(&self, id: u64) -> StoreResult<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?");
        sqlx::query_as::<_, TaskRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Task::try_from)
            .transpose()
    }

    async fn find_tasks(&self, ids: &[u64]) -> StoreResult<Vec<Task>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query_as::<_, TaskRow>(&sql);
        for id in ids {
            query = query.bind(*id);
        }
        convert_all(query.fetch_all(&self.pool).await?)
    }

    async fn template_tasks(&self) -> StoreResult<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE intern_id IS NULL ORDER BY created_at, id"
        );
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn tasks_for_intern(&self, intern_id: u64) -> StoreResult<Vec<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE intern_id = ?");
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(intern_id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn claim_task(&self, task_id: u64, intern_id: u64) -> StoreResult<Option<Task>> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET intern_id = ?
            WHERE id = ?
            AND intern_id IS NULL
            "#,
        )
        .bind(intern_id)
        .bind(task_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_task(task_id).await
    }

    async fn update_progress(
        &self,
        task_id: u64,
        progress: &TaskProgress,
    ) -> StoreResult<Option<Task>> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = COALESCE(?, status),
                today_progress = COALESCE(?, today_progress),
                submission_link = COALESCE(?, submission_link),
                remarks = COALESCE(?, remarks)
            WHERE id = ?
            "#,
        )
        .bind(progress.status.map(|s| s.as_ref().to_string()))
        .bind(&progress.today_progress)
        .bind(&progress.submission_link)
        .bind(&progress.remarks)
        .bind(task_id)
        .execute(&self.pool)
        .await?;

        debug!(task_id, rows = result.rows_affected(), "Update task progress");

        self.find_task(task_id).await
    }

    async fn delete_task(&self, task_id: u64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserStore for MySqlStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let result = sqlx::query(
            r#"INSERT INTO users (username, password, role, created_at) VALUES (?, ?, ?, ?)"#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_ref())
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(User {
                id: done.last_insert_id(),
                username: user.username,
                role: user.role,
                created_at: user.created_at,
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
                Err(StoreError::Conflict("Username already exists".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user(&self, id: u64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| UserCredentials::try_from(row).map(|c| c.user))
            .transpose()
    }

    async fn find_credentials(&self, username: &str) -> StoreResult<Option<UserCredentials>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .map(UserCredentials::try_from)
            .transpose()
    }

    async fn interns_without_tasks(&self) -> StoreResult<Vec<User>> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users u
            WHERE u.role = 'intern'
            AND NOT EXISTS (SELECT 1 FROM tasks t WHERE t.intern_id = u.id)
            ORDER BY u.created_at DESC, u.id DESC
            "#
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(convert_all::<_, UserCredentials>(rows)?
            .into_iter()
            .map(|c| c.user)
            .collect())
    }
}
