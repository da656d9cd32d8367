//! Mock calendar provider.
//!
//! Returns a placeholder video-meeting link for every request and keeps the
//! created meetings for inspection.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::error::{AdapterError, Result};
use crate::traits::{Calendar, Meeting};

/// Used when the caller passes an empty time.
pub const DEFAULT_MEETING_TIME: &str = "Tomorrow 10:00 AM";

/// [`Calendar`] that fabricates meeting links.
pub struct MockCalendar {
    link_base: String,
    created: Mutex<Vec<(String, Meeting)>>,
    counter: AtomicU64,
}

impl MockCalendar {
    pub fn new() -> Self {
        Self::with_link_base("https://meet.google.com/mock-link-")
    }

    pub fn with_link_base(link_base: impl Into<String>) -> Self {
        Self {
            link_base: link_base.into(),
            created: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// `(attendee, meeting)` pairs in creation order.
    pub fn meetings(&self) -> Vec<(String, Meeting)> {
        self.created.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for MockCalendar {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Calendar for MockCalendar {
    async fn schedule_meeting(&self, attendee: &str, when: &str) -> Result<Meeting> {
        if attendee.trim().is_empty() {
            return Err(AdapterError::InvalidInput("attendee is empty".into()));
        }

        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let when = if when.trim().is_empty() {
            DEFAULT_MEETING_TIME
        } else {
            when.trim()
        };
        let meeting = Meeting {
            meeting_link: format!("{}{}-{n}", self.link_base, Utc::now().timestamp_millis()),
            scheduled_time: when.to_string(),
        };
        info!(attendee, when, link = %meeting.meeting_link, "mock meeting scheduled");

        self.created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((attendee.to_string(), meeting.clone()));
        Ok(meeting)
    }
}
