//! Read-side operations: the proximity resolver and the paginated feeds.

use std::collections::HashSet;

use chrono::NaiveDate;
use futures::future::try_join_all;
use tracing::debug;
use uuid::Uuid;

use siaga_common::{
    day_window, haversine_km, GeoPoint, Report, SiagaError, UserProfile, FEED_PAGE_SIZE,
    MAX_RADIUS_KM, MIN_RADIUS_KM,
};
use siaga_geo::{cover, Geocoder};
use siaga_store::{DocStore, FeedCursor, FeedOrder, FeedPage};

/// A report matched by a proximity query, with its true distance from the
/// query center.
#[derive(Debug, Clone)]
pub struct ReportHit {
    pub report: Report,
    pub distance_km: f64,
}

/// Read-only access to the report collection.
pub struct FeedReader {
    store: DocStore,
}

impl FeedReader {
    pub fn new(store: DocStore) -> Self {
        Self { store }
    }

    /// All reports within `radius_km` of `center`, most recent incident
    /// first, optionally restricted to one UTC calendar day.
    ///
    /// The geohash cover over-approximates the disk, so candidates are
    /// re-filtered by true great-circle distance (inclusive of the radius).
    /// The cover's range queries run concurrently; if any of them fails the
    /// whole call fails rather than returning an artificially sparse feed.
    /// No pagination: callers wanting less shrink the radius or add a date.
    pub async fn find_nearby(
        &self,
        center: GeoPoint,
        radius_km: f64,
        date: Option<NaiveDate>,
    ) -> Result<Vec<ReportHit>, SiagaError> {
        center.validate()?;
        if !radius_km.is_finite() || !(MIN_RADIUS_KM..=MAX_RADIUS_KM).contains(&radius_km) {
            return Err(SiagaError::InvalidInput(format!(
                "radius {radius_km}km outside supported range [{MIN_RADIUS_KM}, {MAX_RADIUS_KM}]"
            )));
        }

        let window = date.map(day_window);
        let bounds = cover::query_bounds(center, radius_km * 1000.0)?;
        debug!(
            lat = center.lat,
            lng = center.lng,
            radius_km,
            bounds = bounds.len(),
            "resolving proximity feed"
        );

        let queries = bounds
            .iter()
            .map(|b| self.store.range_by_geohash(&b.start, &b.end, window));
        let snapshots = try_join_all(queries).await.map_err(SiagaError::from)?;

        // Bounds are disjoint by construction, but merge defensively by id
        // since their construction is a separate concern.
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut hits: Vec<ReportHit> = Vec::new();
        for report in snapshots.into_iter().flatten() {
            if !seen.insert(report.id) {
                continue;
            }
            let distance_km =
                haversine_km(center.lat, center.lng, report.latitude, report.longitude);
            if distance_km <= radius_km {
                hits.push(ReportHit {
                    report,
                    distance_km,
                });
            }
        }

        hits.sort_by(|a, b| {
            b.report
                .occurred_at
                .cmp(&a.report.occurred_at)
                .then(a.report.id.cmp(&b.report.id))
        });

        debug!(matches = hits.len(), "proximity feed resolved");
        Ok(hits)
    }

    /// `find_nearby` centered on a free-text location, resolved through the
    /// geocoding collaborator. Geocoding failures propagate untouched.
    pub async fn find_nearby_at(
        &self,
        geocoder: &dyn Geocoder,
        place: &str,
        radius_km: f64,
        date: Option<NaiveDate>,
    ) -> Result<Vec<ReportHit>, SiagaError> {
        let resolved = geocoder.forward(place).await?;
        self.find_nearby(resolved.point, radius_km, date).await
    }

    /// Newest-first page of all reports, optionally filtered to one UTC day.
    pub async fn latest(
        &self,
        date: Option<NaiveDate>,
        cursor: Option<FeedCursor>,
    ) -> Result<FeedPage, SiagaError> {
        let window = date.map(day_window);
        self.store
            .page(FeedOrder::Recency, window, cursor, FEED_PAGE_SIZE)
            .await
            .map_err(SiagaError::from)
    }

    /// Highest-tally page of all reports.
    pub async fn popular(&self, cursor: Option<FeedCursor>) -> Result<FeedPage, SiagaError> {
        self.store
            .page(FeedOrder::Votes, None, cursor, FEED_PAGE_SIZE)
            .await
            .map_err(SiagaError::from)
    }

    pub async fn report_detail(&self, id: Uuid) -> Result<Option<Report>, SiagaError> {
        let found = self.store.get_report(id).await.map_err(SiagaError::from)?;
        Ok(found.map(|(report, _)| report))
    }

    /// Reports the user archived, hydrated from their profile.
    pub async fn archived_reports(&self, user_id: Uuid) -> Result<Vec<Report>, SiagaError> {
        let profile = self.profile_or_not_found(user_id).await?;
        let ids: Vec<Uuid> = profile.archived_reports.into_iter().collect();
        self.store
            .reports_by_ids(&ids)
            .await
            .map_err(SiagaError::from)
    }

    /// Reports the user authored.
    pub async fn report_history(&self, user_id: Uuid) -> Result<Vec<Report>, SiagaError> {
        let profile = self.profile_or_not_found(user_id).await?;
        let ids: Vec<Uuid> = profile.report_history.into_iter().collect();
        self.store
            .reports_by_ids(&ids)
            .await
            .map_err(SiagaError::from)
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, SiagaError> {
        self.store
            .get_profile(user_id)
            .await
            .map_err(SiagaError::from)
    }

    async fn profile_or_not_found(&self, user_id: Uuid) -> Result<UserProfile, SiagaError> {
        self.store
            .get_profile(user_id)
            .await
            .map_err(SiagaError::from)?
            .ok_or(SiagaError::NotFound(user_id))
    }
}
