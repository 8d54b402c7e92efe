//! DocStore — the document database, modeled explicitly.
//!
//! Versioned report documents with a lexicographic geohash index, inclusive
//! range scans, compare-and-swap conditional writes, and multi-document
//! atomic commits (report + author history, archive both sides). Consistency
//! lives here: every mutating method takes the write lock once, so documents
//! touched in one call commit or fail together.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::ops::Bound::Included;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use siaga_common::{Report, UserProfile};

use crate::error::StoreError;

/// Per-document version counter; bumped on every committed write.
pub type Version = u64;

#[derive(Debug, Clone)]
struct VersionedReport {
    doc: Report,
    version: Version,
}

/// Sort order for the cursor-paginated feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOrder {
    /// Most recent `occurred_at` first.
    Recency,
    /// Highest `vote_tally` first.
    Votes,
}

/// Opaque resume point for feed pagination. Carries both sort keys of the
/// last item so the same cursor works for either order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCursor {
    pub occurred_at: DateTime<Utc>,
    pub vote_tally: i64,
    pub id: Uuid,
}

impl FeedCursor {
    fn from_report(r: &Report) -> Self {
        Self {
            occurred_at: r.occurred_at,
            vote_tally: r.vote_tally,
            id: r.id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedPage {
    pub reports: Vec<Report>,
    /// Present only when the page filled; `None` means the feed is exhausted.
    pub next_cursor: Option<FeedCursor>,
}

#[derive(Default)]
struct Inner {
    reports: HashMap<Uuid, VersionedReport>,
    /// Lexicographic index over `(geohash, id)` backing the range scans.
    geo_index: BTreeSet<(String, Uuid)>,
    profiles: HashMap<Uuid, UserProfile>,
    #[cfg(feature = "test-utils")]
    range_fault: Option<String>,
}

/// Cloneable handle to the store. All methods are suspension points, as they
/// would be against the real backend.
#[derive(Clone, Default)]
pub struct DocStore {
    inner: Arc<RwLock<Inner>>,
}

impl DocStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a new report and append it to the author's history in one
    /// commit. `id` and `created_at` are store-assigned; whatever the draft
    /// carries for them is replaced.
    pub async fn insert_report(&self, mut draft: Report) -> Result<Report, StoreError> {
        let mut inner = self.inner.write().await;

        draft.id = Uuid::new_v4();
        draft.created_at = Utc::now();

        inner.geo_index.insert((draft.geohash.clone(), draft.id));
        inner
            .profiles
            .entry(draft.author_id)
            .or_insert_with(|| UserProfile::empty(draft.author_id))
            .report_history
            .insert(draft.id);
        inner.reports.insert(
            draft.id,
            VersionedReport {
                doc: draft.clone(),
                version: 1,
            },
        );

        debug!(report = %draft.id, geohash = %draft.geohash, "report inserted");
        Ok(draft)
    }

    pub async fn get_report(&self, id: Uuid) -> Result<Option<(Report, Version)>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .reports
            .get(&id)
            .map(|v| (v.doc.clone(), v.version)))
    }

    /// Conditional write: commits only if the document is still at
    /// `expected`. Write-once fields are rejected rather than silently
    /// drifting between reader and writer.
    pub async fn try_update_report(
        &self,
        id: Uuid,
        expected: Version,
        doc: Report,
    ) -> Result<Version, StoreError> {
        let mut inner = self.inner.write().await;
        let current = inner.reports.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if current.version != expected {
            return Err(StoreError::Conflict(id));
        }
        if let Some(field) = changed_write_once_field(&current.doc, &doc) {
            return Err(StoreError::ImmutableField(field));
        }

        current.doc = doc;
        current.version += 1;
        Ok(current.version)
    }

    /// All reports whose geohash falls lexicographically in `[lo, hi]`
    /// (inclusive), optionally constrained to an `occurred_at` window.
    pub async fn range_by_geohash(
        &self,
        lo: &str,
        hi: &str,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<Report>, StoreError> {
        let inner = self.inner.read().await;

        #[cfg(feature = "test-utils")]
        if let Some(reason) = &inner.range_fault {
            return Err(StoreError::Unavailable(reason.clone()));
        }

        let lower = (lo.to_string(), Uuid::nil());
        let upper = (hi.to_string(), Uuid::max());

        let mut out = Vec::new();
        for (_, id) in inner.geo_index.range((Included(lower), Included(upper))) {
            let Some(versioned) = inner.reports.get(id) else {
                continue;
            };
            if let Some((start, end)) = window {
                if versioned.doc.occurred_at < start || versioned.doc.occurred_at > end {
                    continue;
                }
            }
            out.push(versioned.doc.clone());
        }

        debug!(lo, hi, hits = out.len(), "geohash range scan");
        Ok(out)
    }

    /// One page of the global feed in the given order, resuming after
    /// `cursor` when present.
    pub async fn page(
        &self,
        order: FeedOrder,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
        cursor: Option<FeedCursor>,
        limit: usize,
    ) -> Result<FeedPage, StoreError> {
        let inner = self.inner.read().await;

        let mut reports: Vec<Report> = inner
            .reports
            .values()
            .map(|v| v.doc.clone())
            .filter(|r| match window {
                Some((start, end)) => r.occurred_at >= start && r.occurred_at <= end,
                None => true,
            })
            .filter(|r| match cursor {
                Some(c) => sort_key(order, r) > cursor_key(order, &c),
                None => true,
            })
            .collect();

        reports.sort_by_key(|r| sort_key(order, r));
        reports.truncate(limit);

        let next_cursor = if reports.len() == limit {
            reports.last().map(FeedCursor::from_report)
        } else {
            None
        };

        Ok(FeedPage {
            reports,
            next_cursor,
        })
    }

    /// Toggle a report's archived state for a user: the report's
    /// `archived_by` and the user's `archived_reports` move together in one
    /// commit. Idempotent in both directions.
    pub async fn set_archived(
        &self,
        report_id: Uuid,
        user_id: Uuid,
        archived: bool,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;

        let versioned = inner
            .reports
            .get_mut(&report_id)
            .ok_or(StoreError::NotFound(report_id))?;
        if archived {
            versioned.doc.archived_by.insert(user_id);
        } else {
            versioned.doc.archived_by.remove(&user_id);
        }
        versioned.version += 1;

        let profile = inner
            .profiles
            .entry(user_id)
            .or_insert_with(|| UserProfile::empty(user_id));
        if archived {
            profile.archived_reports.insert(report_id);
        } else {
            profile.archived_reports.remove(&report_id);
        }

        Ok(())
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.profiles.get(&user_id).cloned())
    }

    pub async fn put_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.profiles.insert(profile.id, profile);
        Ok(())
    }

    /// Hydrate a set of report ids (archive, history). Missing ids are
    /// skipped, matching the backend's batched-get behavior.
    pub async fn reports_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Report>, StoreError> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.reports.get(id).map(|v| v.doc.clone()))
            .collect())
    }

    /// Make every subsequent range query fail, or clear the fault with
    /// `None`. Exercises the resolver's all-or-nothing policy.
    #[cfg(feature = "test-utils")]
    pub async fn fail_range_queries(&self, reason: Option<&str>) {
        let mut inner = self.inner.write().await;
        inner.range_fault = reason.map(str::to_string);
    }
}

type FeedKey = (Reverse<i64>, Uuid);

/// Total order per feed: primary key descending, id ascending for
/// deterministic ties. Timestamps compare by their micros to keep one key
/// type for both orders.
fn sort_key(order: FeedOrder, r: &Report) -> FeedKey {
    match order {
        FeedOrder::Recency => (Reverse(r.occurred_at.timestamp_micros()), r.id),
        FeedOrder::Votes => (Reverse(r.vote_tally), r.id),
    }
}

fn cursor_key(order: FeedOrder, c: &FeedCursor) -> FeedKey {
    match order {
        FeedOrder::Recency => (Reverse(c.occurred_at.timestamp_micros()), c.id),
        FeedOrder::Votes => (Reverse(c.vote_tally), c.id),
    }
}

fn changed_write_once_field(old: &Report, new: &Report) -> Option<&'static str> {
    if new.id != old.id {
        return Some("id");
    }
    if new.author_id != old.author_id {
        return Some("author_id");
    }
    if new.latitude != old.latitude || new.longitude != old.longitude {
        return Some("coordinates");
    }
    if new.geohash != old.geohash {
        return Some("geohash");
    }
    if new.created_at != old.created_at {
        return Some("created_at");
    }
    if new.occurred_at != old.occurred_at {
        return Some("occurred_at");
    }
    if new.description != old.description {
        return Some("description");
    }
    if new.media_kind != old.media_kind
        || new.media_ref != old.media_ref
        || new.thumbnail_ref != old.thumbnail_ref
    {
        return Some("media");
    }
    None
}
