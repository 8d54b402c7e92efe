use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SiagaError;

// --- Constants ---

/// Geohash length persisted on every report. Matches the precision the mobile
/// clients have always written, so range bounds stay comparable across data.
pub const GEOHASH_PRECISION: usize = 10;

/// Supported proximity-query radius, inclusive on both ends.
pub const MIN_RADIUS_KM: f64 = 1.0;
pub const MAX_RADIUS_KM: f64 = 50.0;

/// Page size for the cursor-paginated latest/popular feeds.
pub const FEED_PAGE_SIZE: usize = 10;

/// Attempt budget for the vote commit loop. Every failed attempt implies
/// some other writer committed in between.
pub const VOTE_COMMIT_ATTEMPTS: u32 = 25;

// --- Geo Types ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Reject non-finite or out-of-range coordinates before they reach a
    /// query or a persisted document.
    pub fn validate(&self) -> Result<(), SiagaError> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(SiagaError::InvalidInput(
                "coordinates must be finite numbers".to_string(),
            ));
        }
        if self.lat < -90.0 || self.lat > 90.0 {
            return Err(SiagaError::InvalidInput(format!(
                "latitude {} out of range [-90, 90]",
                self.lat
            )));
        }
        if self.lng < -180.0 || self.lng > 180.0 {
            return Err(SiagaError::InvalidInput(format!(
                "longitude {} out of range [-180, 180]",
                self.lng
            )));
        }
        Ok(())
    }
}

/// Haversine great-circle distance between two lat/lng points in kilometers.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// UTC day bounds for a calendar-day feed filter: `[00:00:00, 23:59:59.999999]`.
pub fn day_window(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).expect("midnight is valid"));
    let end = Utc.from_utc_datetime(
        &day.and_hms_micro_opt(23, 59, 59, 999_999)
            .expect("end of day is valid"),
    );
    (start, end)
}

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Photo => write!(f, "photo"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// A vote as recorded on a report. Absence of a record means "has not voted".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn value(&self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }
}

/// A vote decision as submitted: up, down, or "ensure I have no vote".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VoteValue {
    Up,
    Down,
    Retract,
}

impl VoteValue {
    pub fn delta(&self) -> i64 {
        match self {
            VoteValue::Up => 1,
            VoteValue::Down => -1,
            VoteValue::Retract => 0,
        }
    }

    pub fn direction(&self) -> Option<VoteDirection> {
        match self {
            VoteValue::Up => Some(VoteDirection::Up),
            VoteValue::Down => Some(VoteDirection::Down),
            VoteValue::Retract => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VoteStatus {
    Upvoted,
    Downvoted,
    None,
}

impl std::fmt::Display for VoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteStatus::Upvoted => write!(f, "upvoted"),
            VoteStatus::Downvoted => write!(f, "downvoted"),
            VoteStatus::None => write!(f, "none"),
        }
    }
}

// --- Address ---

/// Reverse-geocoded address breakdown captured at submission time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Address {
    pub street: String,
    pub subdistrict: String,
    pub district: String,
    pub city: String,
    pub county: String,
}

// --- Report ---

/// A single accident report document.
///
/// `latitude`/`longitude`/`geohash` and the media references are write-once;
/// `vote_tally` and `voter_record` are mutated only through the vote engine,
/// `archived_by` only through archive toggling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub author_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    /// Range-query sharding key derived from the coordinates. Never displayed.
    pub geohash: String,
    /// Store-assigned persistence timestamp.
    pub created_at: DateTime<Utc>,
    /// Device-asserted incident timestamp. May differ from `created_at`.
    pub occurred_at: DateTime<Utc>,
    pub description: String,
    pub address: Address,
    pub media_kind: MediaKind,
    pub media_ref: String,
    pub thumbnail_ref: Option<String>,
    pub vote_tally: i64,
    pub voter_record: HashMap<Uuid, VoteDirection>,
    pub archived_by: BTreeSet<Uuid>,
}

impl Report {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// The tally invariant: `vote_tally` equals the sum of the recorded votes.
    pub fn tally_consistent(&self) -> bool {
        self.vote_tally == self.voter_record.values().map(VoteDirection::value).sum::<i64>()
    }
}

// --- User profile ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    /// Reports this user authored, in document-id order.
    pub report_history: BTreeSet<Uuid>,
    /// Reports this user archived for later.
    pub archived_reports: BTreeSet<Uuid>,
}

impl UserProfile {
    pub fn empty(id: Uuid) -> Self {
        Self {
            id,
            display_name: String::new(),
            created_at: Utc::now(),
            report_history: BTreeSet::new(),
            archived_reports: BTreeSet::new(),
        }
    }
}

// --- Display helpers ---

/// Compact tally rendering for feed cards: 1532 -> "1.5K", 2100000 -> "2.1M".
pub fn format_tally(count: i64) -> String {
    let magnitude = count.unsigned_abs();
    let sign = if count < 0 { "-" } else { "" };

    if magnitude >= 1_000_000 {
        let millions = magnitude / 1_000_000;
        let remainder = (magnitude % 1_000_000) / 100_000;
        format!("{sign}{millions}.{remainder}M")
    } else if magnitude >= 1_000 {
        let thousands = magnitude / 1_000;
        let remainder = (magnitude % 1_000) / 100;
        format!("{sign}{thousands}.{remainder}K")
    } else {
        count.to_string()
    }
}
