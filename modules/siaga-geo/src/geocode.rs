//! Geocoding collaborator: free text or device coordinates in, a center
//! point and address breakdown out. Only used to resolve the proximity
//! query's center; never part of the radius math itself.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use siaga_common::{Address, Config, GeoPoint, SiagaError};

/// A resolved place: coordinates plus the address breakdown persisted on
/// reports.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub title: String,
    pub point: GeoPoint,
    pub address: Address,
}

/// A search-box suggestion. Query-type suggestions carry no coordinates and
/// must be resolved through `forward` before use.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub title: String,
    pub lookup_id: Option<String>,
    pub point: Option<GeoPoint>,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve device coordinates to the nearest street address.
    async fn reverse(&self, point: GeoPoint) -> Result<Place, SiagaError>;

    /// Resolve a free-text location (or a `here:` lookup id from a prior
    /// suggestion) to coordinates.
    async fn forward(&self, query: &str) -> Result<Place, SiagaError>;

    /// Up to five search suggestions biased toward `near`.
    async fn suggest(&self, query: &str, near: GeoPoint) -> Result<Vec<Suggestion>, SiagaError>;
}

const REVGEOCODE_URL: &str = "https://revgeocode.search.hereapi.com/v1/revgeocode";
const GEOCODE_URL: &str = "https://geocode.search.hereapi.com/v1/geocode";
const LOOKUP_URL: &str = "https://lookup.search.hereapi.com/v1/lookup";
const AUTOSUGGEST_URL: &str = "https://autosuggest.search.hereapi.com/v1/autosuggest";

/// HERE-backed geocoder.
pub struct HereGeocoder {
    http: reqwest::Client,
    api_key: String,
    lang: String,
}

impl HereGeocoder {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.here_api_key.clone(),
            lang: config.here_lang.clone(),
        }
    }

    async fn fetch(&self, url: String) -> Result<HereResponse, SiagaError> {
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SiagaError::LocationUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SiagaError::LocationUnavailable(format!(
                "geocoder returned HTTP {status}"
            )));
        }

        response
            .json::<HereResponse>()
            .await
            .map_err(|e| SiagaError::LocationUnavailable(format!("malformed geocoder payload: {e}")))
    }
}

#[async_trait]
impl Geocoder for HereGeocoder {
    async fn reverse(&self, point: GeoPoint) -> Result<Place, SiagaError> {
        point.validate()?;
        let url = format!(
            "{REVGEOCODE_URL}?apiKey={}&at={},{}&types=street&lang={}",
            self.api_key, point.lat, point.lng, self.lang
        );
        let data = self.fetch(url).await?;
        debug!(lat = point.lat, lng = point.lng, items = data.items.len(), "reverse geocoded");
        first_place(data)
    }

    async fn forward(&self, query: &str) -> Result<Place, SiagaError> {
        if query.trim().is_empty() {
            return Err(SiagaError::InvalidInput("empty location query".to_string()));
        }

        // Suggestions hand back opaque `here:`-prefixed ids that resolve
        // through the lookup endpoint instead of a fresh geocode.
        let url = if query.starts_with("here:") {
            format!(
                "{LOOKUP_URL}?id={}&apiKey={}",
                urlencoding::encode(query),
                self.api_key
            )
        } else {
            format!(
                "{GEOCODE_URL}?q={}&apiKey={}",
                urlencoding::encode(query),
                self.api_key
            )
        };
        let data = self.fetch(url).await?;
        first_place(data)
    }

    async fn suggest(&self, query: &str, near: GeoPoint) -> Result<Vec<Suggestion>, SiagaError> {
        near.validate()?;
        let url = format!(
            "{AUTOSUGGEST_URL}?q={}&at={},{}&lang={}&limit=5&apiKey={}",
            urlencoding::encode(query),
            near.lat,
            near.lng,
            self.lang,
            self.api_key
        );
        let data = self.fetch(url).await?;
        Ok(data.items.into_iter().map(item_to_suggestion).collect())
    }
}

// --- HERE response shapes ---

#[derive(Debug, Deserialize)]
struct HereResponse {
    #[serde(default)]
    items: Vec<HereItem>,
}

#[derive(Debug, Deserialize)]
struct HereItem {
    #[serde(default)]
    title: String,
    id: Option<String>,
    address: Option<HereAddress>,
    position: Option<HerePosition>,
}

#[derive(Debug, Deserialize)]
struct HereAddress {
    label: Option<String>,
    street: Option<String>,
    subdistrict: Option<String>,
    district: Option<String>,
    city: Option<String>,
    county: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HerePosition {
    lat: f64,
    lng: f64,
}

fn first_place(data: HereResponse) -> Result<Place, SiagaError> {
    data.items
        .into_iter()
        .find_map(item_to_place)
        .ok_or_else(|| SiagaError::LocationUnavailable("no geocoder match".to_string()))
}

fn item_to_place(item: HereItem) -> Option<Place> {
    let position = item.position?;
    let address = item.address.unwrap_or(HereAddress {
        label: None,
        street: None,
        subdistrict: None,
        district: None,
        city: None,
        county: None,
    });

    Some(Place {
        title: item.title,
        point: GeoPoint::new(position.lat, position.lng),
        address: Address {
            street: address.street.or(address.label).unwrap_or_default(),
            subdistrict: address.subdistrict.unwrap_or_default(),
            district: address.district.unwrap_or_default(),
            city: address.city.unwrap_or_default(),
            county: address.county.unwrap_or_default(),
        },
    })
}

fn item_to_suggestion(item: HereItem) -> Suggestion {
    Suggestion {
        title: item.title,
        lookup_id: item.id,
        point: item.position.map(|p| GeoPoint::new(p.lat, p.lng)),
    }
}
