//! Client for the gather entity API.
//!
//! [`EventDirectory`] is what callers use: cached reads of events, profiles,
//! reviews, RSVPs and albums, and writes that invalidate what they touch.
//! It talks to the backend through [`EntityApi`]; [`HttpEntityApi`] is the
//! HTTP implementation.
//!
//! # Example
//! ```rust,no_run
//! use gather_client::{EntityCache, EventDirectory, HttpEntityApi};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> gather_client::Result<()> {
//! let api = HttpEntityApi::new("https://api.example.com", Duration::from_secs(10))?
//!     .with_token("secret");
//! let directory = EventDirectory::new(Arc::new(api), EntityCache::default());
//!
//! let page = directory.event_page("123", Some("ana@example.com")).await?;
//! println!("{} ({} going)", page.event.title, page.going_count());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod directory;
pub mod entities;
pub mod error;
pub mod http;

pub use api::{filter, EntityApi, Filter};
pub use directory::{EntityCache, EventDirectory, EventPage};
pub use entities::{
    Album, AttendanceStatus, EntityKind, Event, EventAttendance, EventReview, User,
};
pub use error::{ApiError, Result};
pub use http::HttpEntityApi;
