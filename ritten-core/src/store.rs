//! In-memory session store
//!
//! Holds every uploaded dataset behind a single lock, keyed by a random
//! UUID v4. Nothing is persisted and nothing expires: a session lives until
//! it is deleted or the process exits.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Local;
use uuid::Uuid;

use crate::error::{Result, RittenError};
use crate::models::{
    DataPage, PageQuery, Pagination, Session, SessionInfo, SessionSnapshot, SessionSummary,
    TripRecord,
};

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a freshly mapped dataset and return its new session id.
    pub fn create(&self, filename: impl Into<String>, records: Vec<TripRecord>) -> Uuid {
        let session = Session {
            filename: filename.into(),
            upload_time: Local::now().naive_local(),
            total_records: records.len(),
            records: Arc::new(records),
        };

        let mut sessions = self.write();
        let mut id = Uuid::new_v4();
        while sessions.contains_key(&id) {
            id = Uuid::new_v4();
        }
        sessions.insert(id, session);
        id
    }

    /// Filtered, paginated read of one session.
    pub fn query(&self, id: &Uuid, query: &PageQuery) -> Result<DataPage> {
        let sessions = self.read();
        let session = sessions
            .get(id)
            .ok_or_else(|| RittenError::NotFound(id.to_string()))?;

        let needle = query.search.to_lowercase();
        let filtered: Vec<&TripRecord> = if needle.is_empty() {
            session.records.iter().collect()
        } else {
            session.records.iter().filter(|r| r.matches(&needle)).collect()
        };

        let total = filtered.len();
        let (start, end) = window(query.page, query.per_page, total);
        let data = filtered[start..end].iter().map(|r| (*r).clone()).collect();

        Ok(DataPage {
            data,
            pagination: Pagination {
                page: query.page,
                per_page: query.per_page,
                total,
                pages: page_count(total, query.per_page),
            },
            session_info: SessionInfo {
                filename: session.filename.clone(),
                upload_time: session.upload_time,
                total_records: session.total_records,
            },
        })
    }

    /// Summaries of every live session, in map order.
    pub fn list(&self) -> Vec<SessionSummary> {
        self.read()
            .iter()
            .map(|(id, session)| SessionSummary {
                session_id: *id,
                filename: session.filename.clone(),
                upload_time: session.upload_time,
                total_records: session.total_records,
            })
            .collect()
    }

    pub fn delete(&self, id: &Uuid) -> Result<()> {
        self.write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RittenError::NotFound(id.to_string()))
    }

    /// Filename and shared record list for export; the lock is released on return.
    pub fn records(&self, id: &Uuid) -> Result<SessionSnapshot> {
        self.read()
            .get(id)
            .map(|session| SessionSnapshot {
                filename: session.filename.clone(),
                records: Arc::clone(&session.records),
            })
            .ok_or_else(|| RittenError::NotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Every mutation is a single insert/remove, so a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, Session>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, Session>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Slice bounds for `page`/`per_page` over `len` items.
///
/// Offsets are `start = (page-1)*per_page`, `end = start+per_page`. Negative
/// offsets count back from the end of the list before clipping, so
/// non-positive inputs produce degenerate (often empty) windows, never errors.
pub fn window(page: i64, per_page: i64, len: usize) -> (usize, usize) {
    let start = page.saturating_sub(1).saturating_mul(per_page);
    let end = start.saturating_add(per_page);

    let start = clip_index(start, len);
    let end = clip_index(end, len);
    if start >= end {
        (start, start)
    } else {
        (start, end)
    }
}

fn clip_index(index: i64, len: usize) -> usize {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let resolved = if index < 0 {
        index.saturating_add(len_i).max(0)
    } else {
        index.min(len_i)
    };
    // resolved is within 0..=len
    resolved as usize
}

/// `ceil(total / per_page)`; zero when `per_page` is not positive.
pub fn page_count(total: usize, per_page: i64) -> i64 {
    if per_page <= 0 {
        return 0;
    }
    let total = i64::try_from(total).unwrap_or(i64::MAX);
    total / per_page + i64::from(total % per_page != 0)
}
