use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::limits::Quota;

// User as returned by the managed auth service
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Started,
    #[serde(alias = "completed")]
    Finished,
}

// The columns the join flow needs from an event row
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct EventRow {
    pub id: String,
    pub status: EventStatus,
    pub event_date: DateTime<Utc>,
}

impl EventRow {
    /// Why this event can't be joined right now, if anything.
    pub fn join_blocker(&self, now: DateTime<Utc>) -> Option<&'static str> {
        match self.status {
            EventStatus::Finished => Some("Cannot join finished events"),
            EventStatus::Started => Some("Cannot join events that have already started"),
            EventStatus::Upcoming if self.event_date < now => Some("Cannot join past events"),
            EventStatus::Upcoming => None,
        }
    }
}

// Body of POST /api/events
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct NewEvent {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub event_date: DateTime<Utc>,
    #[serde(default)]
    pub image_url: Vec<String>,
}

impl NewEvent {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ApiError> {
        let title_len = self.title.trim().chars().count();
        if title_len == 0 {
            return Err(ApiError::BadRequest("Title is required".into()));
        }
        if self.title.chars().count() > 100 {
            return Err(ApiError::BadRequest("Title must be less than 100 characters".into()));
        }
        if self.description.as_deref().is_some_and(|d| d.chars().count() > 1000) {
            return Err(ApiError::BadRequest(
                "Description must be less than 1000 characters".into(),
            ));
        }
        if self.location.as_deref().is_some_and(|l| l.chars().count() > 200) {
            return Err(ApiError::BadRequest("Location must be less than 200 characters".into()));
        }
        if self.event_date <= now {
            return Err(ApiError::BadRequest("Event date must be in the future".into()));
        }
        if self.image_url.len() > 1 {
            return Err(ApiError::BadRequest("Only 1 image allowed".into()));
        }
        if self
            .image_url
            .iter()
            .any(|url| !(url.starts_with("https://") || url.starts_with("http://")))
        {
            return Err(ApiError::BadRequest("Invalid image URL".into()));
        }
        Ok(())
    }
}

// Row inserted into the events table
#[derive(Serialize, Debug)]
pub struct EventInsert<'a> {
    #[serde(flatten)]
    pub event: &'a NewEvent,
    pub creator_id: &'a str,
}

#[derive(Serialize, Debug)]
pub struct ParticipantInsert<'a> {
    pub event_id: &'a str,
    pub user_id: &'a str,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Serialize, Debug)]
pub struct CreatedEvent {
    pub event: serde_json::Value,
}

#[derive(Serialize, Debug)]
pub struct LimitsResponse {
    pub user_id: String,
    pub limits: Vec<Quota>,
}
