use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, error, info, warn};

use crate::error::PortalError;
use crate::model::attendance::{AttendanceSession, NewSession, SessionClose, SessionStatus};
use crate::service::aggregate::{DailyAttendance, group_by_date};
use crate::service::time::{encode_millis, parse_instant, parse_stored};
use crate::store::AttendanceStore;

/// Hours at or above which a session (or a day) counts as present.
pub const FULL_DAY_HOURS: f64 = 4.0;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Width of the `login_time` / `logout_time` columns.
pub const MAX_TIME_LEN: usize = 64;

pub fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

/// Hours between two instants, clamped at zero and rounded to two decimals.
pub fn working_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let millis = (end - start).num_milliseconds().max(0);
    round_hours(millis as f64 / MILLIS_PER_HOUR)
}

/// Status stamped on a session at logout. A zero-length session stays `present`.
pub fn session_status(hours: f64) -> SessionStatus {
    if hours > 0.0 && hours < FULL_DAY_HOURS {
        SessionStatus::HalfDay
    } else {
        SessionStatus::Present
    }
}

/// Keep a parseable client-supplied time verbatim, otherwise stamp server time.
pub fn resolve_time(client_time: Option<&str>, now: DateTime<Utc>) -> String {
    match client_time.map(str::trim).filter(|t| !t.is_empty()) {
        Some(raw) if raw.len() > MAX_TIME_LEN => {
            warn!(len = raw.len(), "Client time too long to store, using server time");
            encode_millis(now)
        }
        Some(raw) if parse_instant(raw).is_some() => raw.to_string(),
        Some(raw) => {
            warn!(client_time = raw, "Ignoring unparseable client time");
            encode_millis(now)
        }
        None => encode_millis(now),
    }
}

/// Values to write when `session` is closed at `logout_time`.
///
/// The start falls back to the row's creation time when the stored login
/// text is missing or unreadable; a missing start is never an error.
pub fn close_values(
    session: &AttendanceSession,
    logout_time: &str,
    now: DateTime<Utc>,
) -> SessionClose {
    let end = parse_instant(logout_time).unwrap_or(now);
    let start = parse_stored(session.login_time.as_deref()).unwrap_or(session.created_at);
    let hours = working_hours(start, end);

    SessionClose {
        logout_time: logout_time.to_string(),
        working_hours: hours,
        status: session_status(hours),
    }
}

fn login_instant(session: &AttendanceSession) -> DateTime<Utc> {
    parse_stored(session.login_time.as_deref()).unwrap_or(session.created_at)
}

/// Clock-in / clock-out state machine over an [`AttendanceStore`].
#[derive(Clone)]
pub struct AttendanceService {
    store: Arc<dyn AttendanceStore>,
}

impl AttendanceService {
    pub fn new(store: Arc<dyn AttendanceStore>) -> Self {
        Self { store }
    }

    pub async fn record_login(
        &self,
        user_id: u64,
        client_time: Option<&str>,
    ) -> Result<AttendanceSession, PortalError> {
        self.record_login_at(user_id, client_time, Utc::now()).await
    }

    /// Close whatever the user left open, then open a fresh session.
    ///
    /// Check-then-insert is not atomic; two concurrent logins for one user
    /// can both succeed and the next login heals the leftover.
    pub async fn record_login_at(
        &self,
        user_id: u64,
        client_time: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AttendanceSession, PortalError> {
        let login_time = resolve_time(client_time, now);

        self.close_stale_sessions(user_id, &login_time, now).await;

        let session = self
            .store
            .insert_session(NewSession {
                user_id,
                login_time,
                status: SessionStatus::Present,
                date: now.date_naive(),
                created_at: now,
            })
            .await
            .map_err(|e| {
                error!(error = %e, user_id, "Failed to create attendance session");
                PortalError::from(e)
            })?;

        info!(user_id, attendance_id = session.id, "Clocked in");
        Ok(session)
    }

    /// Self-healing step of login. Failures are logged and swallowed.
    async fn close_stale_sessions(&self, user_id: u64, logout_time: &str, now: DateTime<Utc>) {
        let stale = match self.store.open_sessions(user_id).await {
            Ok(stale) => stale,
            Err(e) => {
                warn!(error = %e, user_id, "Could not look up open sessions before login");
                return;
            }
        };

        for session in stale {
            let close = close_values(&session, logout_time, now);
            match self.store.close_session(session.id, &close).await {
                Ok(_) => info!(
                    user_id,
                    attendance_id = session.id,
                    working_hours = close.working_hours,
                    "Auto-closed stale session"
                ),
                Err(e) => warn!(
                    error = %e,
                    user_id,
                    attendance_id = session.id,
                    "Failed to auto-close stale session"
                ),
            }
        }
    }

    pub async fn record_logout(
        &self,
        attendance_id: u64,
        client_time: Option<&str>,
    ) -> Result<AttendanceSession, PortalError> {
        self.record_logout_at(attendance_id, client_time, Utc::now())
            .await
    }

    /// Close a session. Closing an already closed session returns it unchanged.
    pub async fn record_logout_at(
        &self,
        attendance_id: u64,
        client_time: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AttendanceSession, PortalError> {
        let session = self.find(attendance_id).await?;

        if !session.is_open() {
            debug!(attendance_id, "Session already closed");
            return Ok(session);
        }

        let logout_time = resolve_time(client_time, now);
        let close = close_values(&session, &logout_time, now);

        let updated = self
            .store
            .close_session(attendance_id, &close)
            .await
            .map_err(|e| {
                error!(error = %e, attendance_id, "Failed to close attendance session");
                PortalError::from(e)
            })?
            .ok_or_else(|| not_found(attendance_id))?;

        info!(
            user_id = updated.user_id,
            attendance_id,
            working_hours = close.working_hours,
            status = %close.status,
            "Clocked out"
        );
        Ok(updated)
    }

    pub async fn find(&self, attendance_id: u64) -> Result<AttendanceSession, PortalError> {
        self.store
            .find_session(attendance_id)
            .await
            .map_err(|e| {
                error!(error = %e, attendance_id, "Failed to fetch attendance session");
                PortalError::from(e)
            })?
            .ok_or_else(|| not_found(attendance_id))
    }

    /// All sessions of a user, newest login first.
    pub async fn history(&self, user_id: u64) -> Result<Vec<AttendanceSession>, PortalError> {
        let mut sessions = self.store.sessions_for_user(user_id).await.map_err(|e| {
            error!(error = %e, user_id, "Failed to fetch attendance history");
            PortalError::from(e)
        })?;
        sessions.sort_by(|a, b| {
            login_instant(b)
                .cmp(&login_instant(a))
                .then(b.id.cmp(&a.id))
        });
        Ok(sessions)
    }

    /// The session the user is currently clocked into, if any.
    pub async fn active_session(
        &self,
        user_id: u64,
    ) -> Result<Option<AttendanceSession>, PortalError> {
        let open = self.store.open_sessions(user_id).await.map_err(|e| {
            error!(error = %e, user_id, "Failed to fetch open sessions");
            PortalError::from(e)
        })?;
        Ok(open
            .into_iter()
            .max_by(|a, b| login_instant(a).cmp(&login_instant(b)).then(a.id.cmp(&b.id))))
    }

    /// Per-day rollup for one user.
    pub async fn daily_summary(&self, user_id: u64) -> Result<Vec<DailyAttendance>, PortalError> {
        let sessions = self.store.sessions_for_user(user_id).await.map_err(|e| {
            error!(error = %e, user_id, "Failed to fetch attendance for summary");
            PortalError::from(e)
        })?;
        Ok(group_by_date(&sessions))
    }

    /// Per-(user, day) rollup across everyone.
    pub async fn grouped(&self) -> Result<Vec<DailyAttendance>, PortalError> {
        let sessions = self.store.all_sessions().await.map_err(|e| {
            error!(error = %e, "Failed to fetch attendance for grouping");
            PortalError::from(e)
        })?;
        Ok(group_by_date(&sessions))
    }

    /// Raw sessions of one user on one day, earliest login first.
    pub async fn day_details(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceSession>, PortalError> {
        let mut sessions = self
            .store
            .sessions_for_day(user_id, date)
            .await
            .map_err(|e| {
                error!(error = %e, user_id, %date, "Failed to fetch attendance details");
                PortalError::from(e)
            })?;
        sessions.sort_by(|a, b| {
            login_instant(a)
                .cmp(&login_instant(b))
                .then(a.id.cmp(&b.id))
        });
        Ok(sessions)
    }
}

fn not_found(attendance_id: u64) -> PortalError {
    PortalError::NotFound(format!("Attendance record {attendance_id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, StoreResult};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};

    fn service() -> (AttendanceService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (AttendanceService::new(store.clone()), store)
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    #[test]
    fn hours_clamp_and_round() {
        assert_eq!(working_hours(at(9, 0), at(13, 0)), 4.0);
        assert_eq!(working_hours(at(9, 0), at(9, 20)), 0.33);
        assert_eq!(working_hours(at(13, 0), at(9, 0)), 0.0);
        assert_eq!(working_hours(at(9, 0), at(9, 0) + Duration::seconds(1)), 0.0);
    }

    #[test]
    fn session_status_thresholds() {
        assert_eq!(session_status(4.0), SessionStatus::Present);
        assert_eq!(session_status(8.5), SessionStatus::Present);
        assert_eq!(session_status(3.99), SessionStatus::HalfDay);
        assert_eq!(session_status(0.01), SessionStatus::HalfDay);
        assert_eq!(session_status(0.0), SessionStatus::Present);
    }

    #[test]
    fn resolve_time_prefers_parseable_client_value() {
        let now = at(9, 0);
        assert_eq!(resolve_time(Some("2026-03-02T08:00:00Z"), now), "2026-03-02T08:00:00Z");
        assert_eq!(resolve_time(None, now), encode_millis(now));
        assert_eq!(resolve_time(Some("  "), now), encode_millis(now));
        assert_eq!(resolve_time(Some("not a time"), now), encode_millis(now));
    }

    #[test]
    fn overlong_client_time_falls_back_to_server_time() {
        let now = at(9, 0);
        let padded = format!("{:0>73}", encode_millis(at(8, 0)));
        assert!(parse_instant(&padded).is_some());
        assert_eq!(resolve_time(Some(&padded), now), encode_millis(now));

        let long_fraction = format!("2026-03-02T08:00:00.{}Z", "1".repeat(60));
        assert_eq!(resolve_time(Some(&long_fraction), now), encode_millis(now));

        let exact = format!("{:0>64}", encode_millis(at(8, 0)));
        assert_eq!(resolve_time(Some(&exact), now), exact);
    }

    /// Delegates to a [`MemoryStore`] but cannot list open sessions.
    struct OpenLookupFails(MemoryStore);

    #[async_trait]
    impl AttendanceStore for OpenLookupFails {
        async fn insert_session(&self, session: NewSession) -> StoreResult<AttendanceSession> {
            self.0.insert_session(session).await
        }

        async fn find_session(&self, id: u64) -> StoreResult<Option<AttendanceSession>> {
            self.0.find_session(id).await
        }

        async fn open_sessions(&self, _user_id: u64) -> StoreResult<Vec<AttendanceSession>> {
            Err(StoreError::Corrupt("status column holds `late`".into()))
        }

        async fn close_session(
            &self,
            id: u64,
            close: &SessionClose,
        ) -> StoreResult<Option<AttendanceSession>> {
            self.0.close_session(id, close).await
        }

        async fn sessions_for_user(&self, user_id: u64) -> StoreResult<Vec<AttendanceSession>> {
            self.0.sessions_for_user(user_id).await
        }

        async fn sessions_for_day(
            &self,
            user_id: u64,
            date: NaiveDate,
        ) -> StoreResult<Vec<AttendanceSession>> {
            self.0.sessions_for_day(user_id, date).await
        }

        async fn all_sessions(&self) -> StoreResult<Vec<AttendanceSession>> {
            self.0.all_sessions().await
        }
    }

    #[actix_web::test]
    async fn failed_cleanup_does_not_block_login() {
        let svc = AttendanceService::new(Arc::new(OpenLookupFails(MemoryStore::new())));

        let first = svc.record_login_at(7, None, at(9, 0)).await.unwrap();
        let second = svc.record_login_at(7, None, at(10, 0)).await.unwrap();
        assert_ne!(first.id, second.id);
        assert!(second.is_open());

        // nothing was auto-closed, so both stay open until the next healthy login
        let history = svc.history(7).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(AttendanceSession::is_open));
    }

    #[actix_web::test]
    async fn login_then_logout_computes_hours() {
        let (svc, _) = service();
        let login = svc
            .record_login_at(7, Some(&encode_millis(at(9, 0))), at(9, 0))
            .await
            .unwrap();
        assert!(login.is_open());
        assert_eq!(login.status, SessionStatus::Present);
        assert_eq!(login.date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());

        let closed = svc
            .record_logout_at(login.id, None, at(11, 30))
            .await
            .unwrap();
        assert_eq!(closed.working_hours, Some(2.5));
        assert_eq!(closed.status, SessionStatus::HalfDay);
        assert_eq!(closed.logout_time, Some(encode_millis(at(11, 30))));
        assert_eq!(closed.date, login.date);
    }

    #[actix_web::test]
    async fn logout_is_idempotent() {
        let (svc, _) = service();
        let login = svc.record_login_at(7, None, at(9, 0)).await.unwrap();

        let first = svc.record_logout_at(login.id, None, at(14, 0)).await.unwrap();
        let second = svc.record_logout_at(login.id, None, at(18, 0)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.working_hours, Some(5.0));
        assert_eq!(second.status, SessionStatus::Present);
    }

    #[actix_web::test]
    async fn logout_of_unknown_session_is_not_found() {
        let (svc, _) = service();
        let err = svc.record_logout(404, None).await.unwrap_err();
        assert!(matches!(err, PortalError::NotFound(_)));
    }

    #[actix_web::test]
    async fn repeated_logins_leave_one_open_session() {
        let (svc, store) = service();
        let mut last = None;
        for i in 0..4 {
            last = Some(svc.record_login_at(7, None, at(9 + i, 0)).await.unwrap());
        }
        let last = last.unwrap();

        let open = store.open_sessions(7).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, last.id);

        let history = svc.history(7).await.unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].id, last.id);
        // each stale session was closed at the next login
        assert!(history[1..].iter().all(|s| s.working_hours == Some(1.0)));
    }

    #[actix_web::test]
    async fn logins_of_other_users_are_untouched() {
        let (svc, store) = service();
        svc.record_login_at(7, None, at(9, 0)).await.unwrap();
        svc.record_login_at(8, None, at(9, 5)).await.unwrap();
        assert_eq!(store.open_sessions(7).await.unwrap().len(), 1);
        assert_eq!(store.open_sessions(8).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn clock_skew_never_goes_negative() {
        let (svc, _) = service();
        let login = svc
            .record_login_at(7, Some("2026-03-02T12:00:00Z"), at(12, 0))
            .await
            .unwrap();
        let closed = svc
            .record_logout_at(login.id, Some("2026-03-02T11:00:00Z"), at(12, 1))
            .await
            .unwrap();
        assert_eq!(closed.working_hours, Some(0.0));
        assert_eq!(closed.status, SessionStatus::Present);
    }

    #[actix_web::test]
    async fn same_instant_login_and_logout_is_zero_and_present() {
        let (svc, _) = service();
        let login = svc.record_login_at(7, Some("1000"), at(9, 0)).await.unwrap();
        assert_eq!(login.login_time.as_deref(), Some("1000"));

        let closed = svc
            .record_logout_at(login.id, Some("1000"), at(9, 0))
            .await
            .unwrap();
        assert_eq!(closed.working_hours, Some(0.0));
        assert_eq!(closed.status, SessionStatus::Present);
        assert_eq!(
            serde_json::to_value(&closed).unwrap()["workingHours"],
            "0.00"
        );
    }

    #[actix_web::test]
    async fn unreadable_login_time_falls_back_to_creation() {
        let (svc, store) = service();
        let session = store
            .insert_session(NewSession {
                user_id: 7,
                login_time: "garbage".into(),
                status: SessionStatus::Present,
                date: at(9, 0).date_naive(),
                created_at: at(9, 0),
            })
            .await
            .unwrap();

        let closed = svc
            .record_logout_at(session.id, None, at(13, 15))
            .await
            .unwrap();
        assert_eq!(closed.working_hours, Some(4.25));
        assert_eq!(closed.status, SessionStatus::Present);
    }

    #[actix_web::test]
    async fn active_session_and_day_details() {
        let (svc, _) = service();
        assert!(svc.active_session(7).await.unwrap().is_none());

        let first = svc.record_login_at(7, None, at(9, 0)).await.unwrap();
        let second = svc.record_login_at(7, None, at(10, 0)).await.unwrap();

        let active = svc.active_session(7).await.unwrap().unwrap();
        assert_eq!(active.id, second.id);

        let details = svc
            .day_details(7, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap())
            .await
            .unwrap();
        assert_eq!(
            details.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );

        let grouped = svc.grouped().await.unwrap();
        assert_eq!(grouped.len(), 1);
        assert!(grouped[0].has_open);
        assert_eq!(grouped[0].total_hours, 1.0);
    }
}
