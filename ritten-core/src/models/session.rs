use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use super::trip::TripRecord;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 50;

/// One uploaded dataset held in memory.
#[derive(Debug, Clone)]
pub struct Session {
    pub filename: String,
    pub upload_time: NaiveDateTime,
    pub records: Arc<Vec<TripRecord>>,
    /// Record count captured at upload; never recomputed.
    pub total_records: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub filename: String,
    #[serde(with = "iso_local")]
    pub upload_time: NaiveDateTime,
    pub total_records: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub filename: String,
    #[serde(with = "iso_local")]
    pub upload_time: NaiveDateTime,
    pub total_records: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    /// Count after search filtering
    pub total: usize,
    pub pages: i64,
}

/// Caller-supplied window and filter for a data read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub page: i64,
    pub per_page: i64,
    pub search: String,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
            search: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DataPage {
    pub data: Vec<TripRecord>,
    pub pagination: Pagination,
    pub session_info: SessionInfo,
}

/// Read-only view handed to the exporter.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub filename: String,
    pub records: Arc<Vec<TripRecord>>,
}

/// Local timestamps rendered as `YYYY-MM-DDTHH:MM:SS[.ffffff]`, no offset.
/// The fraction is left out when the microseconds are zero.
mod iso_local {
    use chrono::{NaiveDateTime, Timelike};
    use serde::Serializer;

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
    const FORMAT_MICROS: &str = "%Y-%m-%dT%H:%M:%S%.6f";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        let format = if value.nanosecond() / 1_000 == 0 {
            FORMAT
        } else {
            FORMAT_MICROS
        };
        serializer.collect_str(&value.format(format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_page_query_defaults() {
        let q = PageQuery::default();
        assert_eq!(q.page, 1);
        assert_eq!(q.per_page, 50);
        assert!(q.search.is_empty());
    }

    #[test]
    fn test_upload_time_serializes_with_microseconds() {
        let upload_time = NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_micro_opt(9, 26, 53, 589_793)
            .unwrap();
        let info = SessionInfo {
            filename: "ritten.xml".to_string(),
            upload_time,
            total_records: 3,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["upload_time"], "2026-03-14T09:26:53.589793");
        assert_eq!(json["total_records"], 3);
    }

    #[test]
    fn test_upload_time_omits_zero_microseconds() {
        let upload_time = NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(9, 26, 53)
            .unwrap();
        let info = SessionInfo {
            filename: "ritten.xml".to_string(),
            upload_time,
            total_records: 0,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["upload_time"], "2026-03-14T09:26:53");
    }
}
