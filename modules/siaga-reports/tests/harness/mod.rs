//! Shared fixtures for the integration tests.
#![allow(dead_code)] // each test binary uses a different slice of the harness

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use siaga_common::{Address, GeoPoint, MediaKind, SiagaError};
use siaga_geo::{Geocoder, Place, Suggestion};
use siaga_reports::{FeedReader, NewReport, ReportWriter, VoteEngine};
use siaga_store::DocStore;

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct World {
    pub store: DocStore,
    pub reader: FeedReader,
    pub writer: ReportWriter,
    pub votes: VoteEngine,
}

pub fn world() -> World {
    init_tracing();
    let store = DocStore::new();
    World {
        reader: FeedReader::new(store.clone()),
        writer: ReportWriter::new(store.clone()),
        votes: VoteEngine::new(store.clone()),
        store,
    }
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

pub fn draft(lat: f64, lng: f64, occurred_at: DateTime<Utc>) -> NewReport {
    NewReport::builder()
        .author_id(Uuid::new_v4())
        .point(GeoPoint::new(lat, lng))
        .address(Address {
            street: "Jalan Sudirman".to_string(),
            subdistrict: "Karet".to_string(),
            district: "Setiabudi".to_string(),
            city: "Jakarta Selatan".to_string(),
            county: "Jakarta".to_string(),
        })
        .occurred_at(occurred_at)
        .description("tabrakan motor di lampu merah".to_string())
        .media_kind(MediaKind::Photo)
        .media_ref("reports/images/report-001.jpg".to_string())
        .build()
}

/// Geocoder stub: resolves every query to a fixed point, or fails when
/// constructed unresolvable.
pub struct StubGeocoder {
    pub point: Option<GeoPoint>,
}

#[async_trait::async_trait]
impl Geocoder for StubGeocoder {
    async fn reverse(&self, _point: GeoPoint) -> Result<Place, SiagaError> {
        self.place()
    }

    async fn forward(&self, _query: &str) -> Result<Place, SiagaError> {
        self.place()
    }

    async fn suggest(&self, _query: &str, _near: GeoPoint) -> Result<Vec<Suggestion>, SiagaError> {
        Ok(vec![])
    }
}

impl StubGeocoder {
    fn place(&self) -> Result<Place, SiagaError> {
        match self.point {
            Some(point) => Ok(Place {
                title: "stub".to_string(),
                point,
                address: Address::default(),
            }),
            None => Err(SiagaError::LocationUnavailable(
                "no geocoder match".to_string(),
            )),
        }
    }
}
