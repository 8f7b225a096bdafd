use crate::error::{ApiError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity collections exposed by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Event,
    User,
    EventAttendance,
    EventReview,
    Album,
}

impl EntityKind {
    /// Collection name in API paths.
    pub fn api_name(&self) -> &'static str {
        match self {
            EntityKind::Event => "Event",
            EntityKind::User => "User",
            EntityKind::EventAttendance => "EventAttendance",
            EntityKind::EventReview => "EventReview",
            EntityKind::Album => "Album",
        }
    }

    /// Leading segment of cache keys for this kind.
    pub fn key_kind(&self) -> &'static str {
        match self {
            EntityKind::Event => "event",
            EntityKind::User => "user",
            EntityKind::EventAttendance => "attendance",
            EntityKind::EventReview => "review",
            EntityKind::Album => "album",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    pub organizer_id: String,
    /// Maximum number of `going` RSVPs. `None` means unlimited.
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Going,
    Interested,
    NotGoing,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Going => "going",
            AttendanceStatus::Interested => "interested",
            AttendanceStatus::NotGoing => "not_going",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "going" | "yes" => Ok(AttendanceStatus::Going),
            "interested" | "maybe" => Ok(AttendanceStatus::Interested),
            "not_going" | "not-going" | "no" => Ok(AttendanceStatus::NotGoing),
            other => Err(ApiError::Validation(format!(
                "unknown attendance status: {other}"
            ))),
        }
    }
}

/// One user's RSVP to one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAttendance {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub event_id: String,
    pub user_email: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventReview {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub event_id: String,
    pub author_email: String,
    /// 1 to 5 stars.
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl EventReview {
    pub fn validate(&self) -> Result<()> {
        if !(1..=5).contains(&self.rating) {
            return Err(ApiError::Validation(format!(
                "rating must be between 1 and 5, got {}",
                self.rating
            )));
        }

        if self.event_id.is_empty() || self.author_email.is_empty() {
            return Err(ApiError::Validation(
                "review needs an event_id and an author_email".into(),
            ));
        }

        Ok(())
    }
}

/// Photo album on a user's profile, optionally tied to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    #[serde(default)]
    pub event_id: Option<String>,
}
