//! Per-day rollups of attendance sessions for the reporting views.
//!
//! Day status is its own derivation, separate from the per-session status
//! written at logout: a day with zero closed hours and nothing open is
//! `absent`, while a zero-length session on its own is `present`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

use crate::model::attendance::AttendanceSession;
use crate::service::attendance::{FULL_DAY_HOURS, round_hours};
use crate::service::time::parse_stored;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Display, AsRefStr, ToSchema)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DayStatus {
    Present,
    HalfDay,
    Active,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyAttendance {
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = 5.5)]
    pub total_hours: f64,
    #[schema(example = 2)]
    pub session_count: usize,
    pub has_open: bool,
    pub status: DayStatus,
    /// Earliest login of the day, as stored.
    pub first_login: Option<String>,
    /// Latest logout of the day, as stored.
    pub last_logout: Option<String>,
}

pub fn day_status(total_hours: f64, has_open: bool) -> DayStatus {
    if has_open {
        DayStatus::Active
    } else if total_hours >= FULL_DAY_HOURS {
        DayStatus::Present
    } else if total_hours > 0.0 {
        DayStatus::HalfDay
    } else {
        DayStatus::Absent
    }
}

/// Group sessions by (user, calendar day), newest day first.
pub fn group_by_date(sessions: &[AttendanceSession]) -> Vec<DailyAttendance> {
    let mut groups: BTreeMap<(NaiveDate, u64), Vec<&AttendanceSession>> = BTreeMap::new();
    for s in sessions {
        groups.entry((s.date, s.user_id)).or_default().push(s);
    }

    let mut days: Vec<DailyAttendance> = groups
        .into_iter()
        .map(|((date, user_id), group)| summarize(user_id, date, &group))
        .collect();

    days.sort_by(|a, b| b.date.cmp(&a.date).then(a.user_id.cmp(&b.user_id)));
    days
}

fn summarize(user_id: u64, date: NaiveDate, group: &[&AttendanceSession]) -> DailyAttendance {
    let has_open = group.iter().any(|s| s.is_open());

    let total: f64 = group
        .iter()
        .filter(|s| s.login_time.is_some() && s.logout_time.is_some())
        .map(|s| s.working_hours.unwrap_or(0.0))
        .sum();

    let first_login = group
        .iter()
        .filter_map(|s| {
            let raw = s.login_time.as_deref()?;
            Some((parse_stored(Some(raw)).unwrap_or(s.created_at), raw))
        })
        .min_by_key(|(at, _)| *at)
        .map(|(_, raw)| raw.to_string());

    let last_logout = group
        .iter()
        .filter_map(|s| {
            let raw = s.logout_time.as_deref()?;
            Some((parse_stored(Some(raw))?, raw))
        })
        .max_by_key(|(at, _)| *at)
        .map(|(_, raw)| raw.to_string());

    let total_hours = round_hours(total);
    DailyAttendance {
        user_id,
        date,
        total_hours,
        session_count: group.len(),
        has_open,
        status: day_status(total_hours, has_open),
        first_login,
        last_logout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::SessionStatus;
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    fn closed(id: u64, user_id: u64, date: NaiveDate, hours: f64) -> AttendanceSession {
        AttendanceSession {
            id,
            user_id,
            login_time: Some(format!("{}", 1_767_000_000_000u64 + id * 1000)),
            logout_time: Some(format!("{}", 1_767_000_000_000u64 + id * 1000 + 500)),
            status: SessionStatus::Present,
            date,
            working_hours: Some(hours),
            created_at: Utc.timestamp_millis_opt(0).unwrap(),
        }
    }

    fn open(id: u64, user_id: u64, date: NaiveDate) -> AttendanceSession {
        AttendanceSession {
            logout_time: None,
            working_hours: None,
            ..closed(id, user_id, date, 0.0)
        }
    }

    #[test]
    fn status_thresholds_for_a_day() {
        assert_eq!(day_status(4.0, false), DayStatus::Present);
        assert_eq!(day_status(3.99, false), DayStatus::HalfDay);
        assert_eq!(day_status(0.0, false), DayStatus::Absent);
        assert_eq!(day_status(9.0, true), DayStatus::Active);
    }

    #[test]
    fn sums_closed_sessions_per_user_and_day() {
        let sessions = vec![
            closed(1, 7, day(3), 2.5),
            closed(2, 7, day(3), 1.75),
            closed(3, 8, day(3), 1.0),
            closed(4, 7, day(4), 0.0),
        ];

        let days = group_by_date(&sessions);
        assert_eq!(days.len(), 3);

        // newest date first, then by user
        assert_eq!((days[0].date, days[0].user_id), (day(4), 7));
        assert_eq!(days[0].status, DayStatus::Absent);

        assert_eq!((days[1].date, days[1].user_id), (day(3), 7));
        assert_eq!(days[1].total_hours, 4.25);
        assert_eq!(days[1].session_count, 2);
        assert_eq!(days[1].status, DayStatus::Present);

        assert_eq!((days[2].date, days[2].user_id), (day(3), 8));
        assert_eq!(days[2].status, DayStatus::HalfDay);
    }

    #[test]
    fn open_session_marks_the_day_active_and_adds_nothing() {
        let sessions = vec![closed(1, 7, day(5), 1.5), open(2, 7, day(5))];

        let days = group_by_date(&sessions);
        assert_eq!(days.len(), 1);
        assert!(days[0].has_open);
        assert_eq!(days[0].total_hours, 1.5);
        assert_eq!(days[0].status, DayStatus::Active);
        assert_eq!(days[0].first_login.as_deref(), Some("1767000001000"));
        assert_eq!(days[0].last_logout.as_deref(), Some("1767000001500"));
    }

    #[test]
    fn empty_input_gives_no_days() {
        assert!(group_by_date(&[]).is_empty());
    }
}
