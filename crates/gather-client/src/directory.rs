//! Cached reads and invalidating writes for the event, profile, review and
//! RSVP flows.
//!
//! Every read goes through one shared [`RequestCache`] keyed by convention:
//!
//! | read | key |
//! |---|---|
//! | event | `event-<id>` |
//! | reviews of an event | `event-<id>-reviews` |
//! | attendees of an event | `event-<id>-attendees` |
//! | a viewer's RSVP | `event-<id>-attendance-<viewer>` |
//! | profile | `user-<id>` |
//! | albums of a user | `user-<id>-albums` |
//!
//! Every write drops the keys it could have made stale. The cache can't see
//! writes made elsewhere, so this is the only thing keeping it honest.

use crate::api::{filter, EntityApi, Filter};
use crate::entities::*;
use crate::error::{ApiError, Result};
use gather_cache::{CacheKey, RequestCache};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Cache shared by every caller of one [`EventDirectory`].
pub type EntityCache = RequestCache<Value, ApiError>;

/// Everything the event page shows.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPage {
    pub event: Event,
    pub reviews: Vec<EventReview>,
    pub attendees: Vec<EventAttendance>,
    /// The viewer's own RSVP, if there is a viewer and they responded.
    pub viewer_attendance: Option<EventAttendance>,
}

impl EventPage {
    pub fn going_count(&self) -> usize {
        count_going(&self.attendees)
    }

    pub fn average_rating(&self) -> Option<f32> {
        if self.reviews.is_empty() {
            return None;
        }
        let total: u32 = self.reviews.iter().map(|r| u32::from(r.rating)).sum();
        Some(total as f32 / self.reviews.len() as f32)
    }

    /// Whether the event has no `going` spot left.
    pub fn is_full(&self) -> bool {
        self.event
            .capacity
            .is_some_and(|capacity| self.going_count() >= capacity as usize)
    }
}

fn count_going(attendees: &[EventAttendance]) -> usize {
    attendees
        .iter()
        .filter(|a| a.status == AttendanceStatus::Going)
        .count()
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

fn event_key(event_id: &str) -> CacheKey {
    CacheKey::new(EntityKind::Event.key_kind(), event_id)
}

fn user_key(user_id: &str) -> CacheKey {
    CacheKey::new(EntityKind::User.key_kind(), user_id)
}

pub struct EventDirectory<A> {
    api: Arc<A>,
    cache: EntityCache,
}

impl<A> Clone for EventDirectory<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            cache: self.cache.clone(),
        }
    }
}

impl<A: EntityApi + 'static> EventDirectory<A> {
    pub fn new(api: Arc<A>, cache: EntityCache) -> Self {
        Self { api, cache }
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    async fn fetch_one(&self, key: CacheKey, kind: EntityKind, id: &str) -> Result<Value> {
        let api = Arc::clone(&self.api);
        let id = id.to_string();
        self.cache
            .throttled_request(key, move || async move { api.get(kind, &id).await })
            .await
    }

    async fn fetch_many(&self, key: CacheKey, kind: EntityKind, filter: Filter) -> Result<Value> {
        let api = Arc::clone(&self.api);
        self.cache
            .throttled_request(key, move || async move {
                api.filter(kind, &filter).await.map(Value::Array)
            })
            .await
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    pub async fn event(&self, event_id: &str) -> Result<Event> {
        let value = self
            .fetch_one(event_key(event_id), EntityKind::Event, event_id)
            .await?;
        decode(value)
    }

    pub async fn event_reviews(&self, event_id: &str) -> Result<Vec<EventReview>> {
        let value = self
            .fetch_many(
                event_key(event_id).with("reviews"),
                EntityKind::EventReview,
                filter([("event_id", event_id)]),
            )
            .await?;
        decode(value)
    }

    pub async fn attendees(&self, event_id: &str) -> Result<Vec<EventAttendance>> {
        let value = self
            .fetch_many(
                event_key(event_id).with("attendees"),
                EntityKind::EventAttendance,
                filter([("event_id", event_id)]),
            )
            .await?;
        decode(value)
    }

    /// The viewer's RSVP to an event, `None` if they haven't responded.
    pub async fn attendance(&self, event_id: &str, viewer: &str) -> Result<Option<EventAttendance>> {
        let value = self
            .fetch_many(
                event_key(event_id).with("attendance").with(viewer),
                EntityKind::EventAttendance,
                filter([("event_id", event_id), ("user_email", viewer)]),
            )
            .await?;
        let mut found: Vec<EventAttendance> = decode(value)?;
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.swap_remove(0))
        })
    }

    /// Load the event page: event, reviews, attendees and the viewer's RSVP,
    /// fetched concurrently.
    pub async fn event_page(&self, event_id: &str, viewer: Option<&str>) -> Result<EventPage> {
        let viewer_attendance = async {
            match viewer {
                Some(viewer) => self.attendance(event_id, viewer).await,
                None => Ok(None),
            }
        };

        let (event, reviews, attendees, viewer_attendance) = futures::try_join!(
            self.event(event_id),
            self.event_reviews(event_id),
            self.attendees(event_id),
            viewer_attendance,
        )?;

        Ok(EventPage {
            event,
            reviews,
            attendees,
            viewer_attendance,
        })
    }

    pub async fn profile(&self, user_id: &str) -> Result<User> {
        let value = self
            .fetch_one(user_key(user_id), EntityKind::User, user_id)
            .await?;
        decode(value)
    }

    pub async fn user_albums(&self, user_id: &str) -> Result<Vec<Album>> {
        let value = self
            .fetch_many(
                user_key(user_id).with("albums"),
                EntityKind::Album,
                filter([("owner_id", user_id)]),
            )
            .await?;
        decode(value)
    }

    // ── Writes ───────────────────────────────────────────────────────────────

    pub async fn update_event(&self, event_id: &str, patch: Value) -> Result<Event> {
        let updated = self.api.update(EntityKind::Event, event_id, patch).await;
        self.forget_event(event_id);
        decode(updated?)
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<()> {
        let deleted = self.api.delete(EntityKind::Event, event_id).await;
        self.forget_event(event_id);
        deleted
    }

    /// Set the viewer's RSVP. Creates the attendance on first response,
    /// updates it afterwards; answering with the current status writes
    /// nothing. Switching to `going` fails when the event is full.
    pub async fn rsvp(
        &self,
        event_id: &str,
        viewer: &str,
        status: AttendanceStatus,
    ) -> Result<EventAttendance> {
        let existing: Vec<EventAttendance> = self
            .api
            .filter(
                EntityKind::EventAttendance,
                &filter([("event_id", event_id), ("user_email", viewer)]),
            )
            .await?
            .into_iter()
            .map(decode)
            .collect::<Result<_>>()?;
        let existing = existing.into_iter().next();

        if let Some(current) = &existing {
            if current.status == status {
                return Ok(current.clone());
            }
        }

        if status == AttendanceStatus::Going {
            let (event, attendees) =
                futures::try_join!(self.event(event_id), self.attendees(event_id))?;
            if let Some(capacity) = event.capacity {
                if count_going(&attendees) >= capacity as usize {
                    return Err(ApiError::Validation(format!(
                        "event {event_id} is full ({capacity} going)"
                    )));
                }
            }
        }

        let written = match existing {
            Some(current) => {
                log::info!(
                    "{} changes RSVP to event {}: {} -> {}",
                    viewer,
                    event_id,
                    current.status,
                    status
                );
                self.api
                    .update(
                        EntityKind::EventAttendance,
                        &current.id,
                        serde_json::json!({ "status": status }),
                    )
                    .await
            }
            None => {
                log::info!("{} RSVPs to event {}: {}", viewer, event_id, status);
                let attendance = EventAttendance {
                    id: String::new(),
                    event_id: event_id.to_string(),
                    user_email: viewer.to_string(),
                    status,
                };
                self.api
                    .create(EntityKind::EventAttendance, serde_json::to_value(&attendance)?)
                    .await
            }
        };

        self.forget_event(event_id);
        decode(written?)
    }

    /// Post a review. One review per author per event.
    pub async fn submit_review(&self, review: EventReview) -> Result<EventReview> {
        review.validate()?;

        let reviews = self.event_reviews(&review.event_id).await?;
        if reviews.iter().any(|r| r.author_email == review.author_email) {
            return Err(ApiError::Validation(format!(
                "{} already reviewed event {}",
                review.author_email, review.event_id
            )));
        }

        let created = self
            .api
            .create(EntityKind::EventReview, serde_json::to_value(&review)?)
            .await;
        self.cache
            .invalidate(event_key(&review.event_id).with("reviews").as_str());
        decode(created?)
    }

    pub async fn update_profile(&self, user_id: &str, patch: Value) -> Result<User> {
        let updated = self.api.update(EntityKind::User, user_id, patch).await;
        self.cache.invalidate_matching(user_key(user_id).as_str());
        decode(updated?)
    }

    pub async fn create_album(&self, album: Album) -> Result<Album> {
        if album.owner_id.is_empty() || album.title.trim().is_empty() {
            return Err(ApiError::Validation(
                "album needs an owner_id and a title".into(),
            ));
        }

        let created = self
            .api
            .create(EntityKind::Album, serde_json::to_value(&album)?)
            .await;
        self.cache
            .invalidate(user_key(&album.owner_id).with("albums").as_str());
        decode(created?)
    }

    /// Drop every cached fact about an event. Also runs after a failed write,
    /// since the write may have landed before the error.
    fn forget_event(&self, event_id: &str) {
        let dropped = self.cache.invalidate_matching(event_key(event_id).as_str());
        log::debug!("dropped {} cached keys for event {}", dropped, event_id);
    }
}
