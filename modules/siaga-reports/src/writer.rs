//! Write-side operations: report submission and archive toggling.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::info;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use siaga_common::{Address, GeoPoint, MediaKind, Report, SiagaError, GEOHASH_PRECISION};
use siaga_geo::cover;
use siaga_store::DocStore;

/// Input for a report submission. Media bytes are already uploaded by the
/// capture pipeline; only their storage references arrive here.
#[derive(Debug, Clone, TypedBuilder)]
pub struct NewReport {
    pub author_id: Uuid,
    pub point: GeoPoint,
    pub address: Address,
    /// Device-asserted incident time, usually from capture metadata.
    pub occurred_at: DateTime<Utc>,
    pub description: String,
    pub media_kind: MediaKind,
    pub media_ref: String,
    #[builder(default)]
    pub thumbnail_ref: Option<String>,
}

pub struct ReportWriter {
    store: DocStore,
}

impl ReportWriter {
    pub fn new(store: DocStore) -> Self {
        Self { store }
    }

    /// Validate and persist a new report. The geohash sharding key is derived
    /// here, once, so reader and writer can never disagree on precision. The
    /// report and the author's history entry commit together.
    pub async fn submit(&self, new: NewReport) -> Result<Report, SiagaError> {
        if new.author_id.is_nil() {
            return Err(SiagaError::InvalidInput("nil author id".to_string()));
        }
        if new.description.trim().is_empty() {
            return Err(SiagaError::InvalidInput(
                "description must not be empty".to_string(),
            ));
        }
        if new.media_ref.trim().is_empty() {
            return Err(SiagaError::InvalidInput(
                "media reference must not be empty".to_string(),
            ));
        }
        new.point.validate()?;

        let geohash = cover::encode_cell(new.point, GEOHASH_PRECISION)?;

        let draft = Report {
            // Store-assigned on insert.
            id: Uuid::nil(),
            created_at: Utc::now(),
            author_id: new.author_id,
            latitude: new.point.lat,
            longitude: new.point.lng,
            geohash,
            occurred_at: new.occurred_at,
            description: new.description,
            address: new.address,
            media_kind: new.media_kind,
            media_ref: new.media_ref,
            thumbnail_ref: new.thumbnail_ref,
            vote_tally: 0,
            voter_record: HashMap::new(),
            archived_by: BTreeSet::new(),
        };

        let stored = self
            .store
            .insert_report(draft)
            .await
            .map_err(SiagaError::from)?;
        info!(report = %stored.id, author = %stored.author_id, kind = %stored.media_kind, "report submitted");
        Ok(stored)
    }

    /// Archive or unarchive a report for a user. Idempotent either way; does
    /// not touch the vote tally.
    pub async fn set_archived(
        &self,
        report_id: Uuid,
        user_id: Uuid,
        archive: bool,
    ) -> Result<(), SiagaError> {
        if user_id.is_nil() {
            return Err(SiagaError::InvalidInput("nil user id".to_string()));
        }
        self.store
            .set_archived(report_id, user_id, archive)
            .await
            .map_err(SiagaError::from)
    }
}
