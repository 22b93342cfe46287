use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Status written onto a single session when it is closed.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SessionStatus {
    Present,
    HalfDay,
    Absent,
}

/// One clock-in/clock-out interval.
///
/// `login_time` and `logout_time` keep the stored text verbatim: either an
/// epoch-millisecond string or an ISO-8601 string. Read them through
/// [`crate::service::time::parse_instant`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": 12,
    "userId": 7,
    "loginTime": "1767258000000",
    "logoutTime": "1767272400000",
    "status": "present",
    "date": "2026-01-01",
    "workingHours": "4.00",
    "createdAt": "2026-01-01T09:00:00Z"
}))]
pub struct AttendanceSession {
    pub id: u64,
    pub user_id: u64,
    #[schema(example = "1767258000000", nullable = true)]
    pub login_time: Option<String>,
    #[schema(example = "1767272400000", nullable = true)]
    pub logout_time: Option<String>,
    pub status: SessionStatus,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[serde(with = "hours", default)]
    #[schema(example = "4.00", value_type = Option<String>)]
    pub working_hours: Option<f64>,
    #[schema(example = "2026-01-01T09:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl AttendanceSession {
    pub fn is_open(&self) -> bool {
        self.logout_time.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: u64,
    pub login_time: String,
    pub status: SessionStatus,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Values written exactly once when a session is closed.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionClose {
    pub logout_time: String,
    pub working_hours: f64,
    pub status: SessionStatus,
}

/// Working hours travel as two-decimal strings ("4.25").
pub mod hours {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(h) => s.serialize_str(&format!("{:.2}", h)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(f64),
        }

        match Option::<Raw>::deserialize(d)? {
            None => Ok(None),
            Some(Raw::Number(n)) => Ok(Some(n)),
            Some(Raw::Text(t)) => t
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session(hours: Option<f64>) -> AttendanceSession {
        AttendanceSession {
            id: 1,
            user_id: 2,
            login_time: Some("1000".into()),
            logout_time: hours.map(|_| "1000".into()),
            status: SessionStatus::HalfDay,
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            working_hours: hours,
            created_at: Utc.timestamp_millis_opt(0).unwrap(),
        }
    }

    #[test]
    fn working_hours_serialize_with_two_decimals() {
        let json = serde_json::to_value(session(Some(0.0))).unwrap();
        assert_eq!(json["workingHours"], "0.00");
        assert_eq!(json["status"], "half-day");
        assert_eq!(json["userId"], 2);

        let open = serde_json::to_value(session(None)).unwrap();
        assert!(open["workingHours"].is_null());
        assert!(open["logoutTime"].is_null());
    }

    #[test]
    fn working_hours_accept_text_or_number() {
        let mut json = serde_json::to_value(session(Some(3.5))).unwrap();
        let back: AttendanceSession = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back.working_hours, Some(3.5));

        json["workingHours"] = serde_json::json!(6.25);
        let back: AttendanceSession = serde_json::from_value(json).unwrap();
        assert_eq!(back.working_hours, Some(6.25));
    }
}
