//! Bounded-time geolocation: device position, then reverse geocoding.
//!
//! Two independent sub-steps, each with its own timeout:
//!
//! 1. [`PositionSource::current_position`] — no coordinates means no fix.
//! 2. [`ReverseGeocoder::reverse`] — only attempted with coordinates in
//!    hand. Any failure (timeout, non-2xx, network, empty address) degrades
//!    to a coordinates-only fix.
//!
//! Both steps are also capped by the caller's overall deadline, so a slow
//! geocode can never hold coordinates back past it. Expired lookups are
//! cancelled by dropping their futures, which aborts the in-flight request.

use crate::config::StampConfig;
use crate::types::{AddressDetails, Coordinates, GeolocationFix};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

#[derive(Error, Debug)]
pub enum PositionError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("geocoder returned status {0}")]
    Status(u16),
    #[error("geocoder returned no address")]
    NoAddress,
}

/// Source of the device's current position.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, PositionError>;
}

/// Coordinates → structured address lookup.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, coords: &Coordinates) -> Result<AddressDetails, GeocodeError>;
}

// ============================================================================
// Position sources
// ============================================================================

/// A position known up front (e.g. passed on the command line).
pub struct FixedPosition(pub Coordinates);

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<Coordinates, PositionError> {
        Ok(self.0)
    }
}

/// No positioning hardware or permission.
pub struct NoPosition;

#[async_trait]
impl PositionSource for NoPosition {
    async fn current_position(&self) -> Result<Coordinates, PositionError> {
        Err(PositionError::Unavailable("no position source".into()))
    }
}

// ============================================================================
// Nominatim reverse geocoder
// ============================================================================

/// Reverse geocoding against a Nominatim-compatible `/reverse` endpoint.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    #[serde(default)]
    address: Option<NominatimAddress>,
}

/// Nominatim spreads the same concept over several keys depending on the
/// place type; each is folded into one [`AddressDetails`] field.
#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    road: Option<String>,
    village: Option<String>,
    suburb: Option<String>,
    city_district: Option<String>,
    county: Option<String>,
    city: Option<String>,
    town: Option<String>,
    municipality: Option<String>,
    postcode: Option<String>,
}

impl From<NominatimAddress> for AddressDetails {
    fn from(a: NominatimAddress) -> Self {
        Self {
            road: a.road,
            village: a.village,
            suburb: a.suburb,
            district: a.city_district.or(a.county),
            city: a.city.or(a.town).or(a.municipality),
            postcode: a.postcode,
        }
    }
}

impl NominatimGeocoder {
    pub fn new(endpoint: impl Into<String>, user_agent: &str) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(&self, coords: &Coordinates) -> Result<AddressDetails, GeocodeError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", coords.latitude.to_string()),
                ("lon", coords.longitude.to_string()),
                ("addressdetails", "1".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body: NominatimResponse = response.json().await?;
        let address: AddressDetails = body.address.unwrap_or_default().into();
        if address.is_empty() {
            return Err(GeocodeError::NoAddress);
        }
        Ok(address)
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Result of a bounded resolution attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub fix: Option<GeolocationFix>,
    /// Why the fix is missing or lacks an address, when it does.
    pub degraded: Option<String>,
    /// True when a step was cut short by the caller's deadline rather than
    /// by its own timeout.
    pub deadline_reached: bool,
}

/// Device position + optional reverse geocode, each individually bounded.
pub struct GeolocationResolver {
    position: Arc<dyn PositionSource>,
    geocoder: Option<Arc<dyn ReverseGeocoder>>,
    position_timeout: Duration,
    geocode_timeout: Duration,
}

impl GeolocationResolver {
    pub fn new(
        position: Arc<dyn PositionSource>,
        geocoder: Option<Arc<dyn ReverseGeocoder>>,
        position_timeout: Duration,
        geocode_timeout: Duration,
    ) -> Self {
        Self {
            position,
            geocoder,
            position_timeout,
            geocode_timeout,
        }
    }

    /// Build a resolver from config, using Nominatim when geocoding is enabled.
    pub fn from_config(
        config: &StampConfig,
        position: Arc<dyn PositionSource>,
    ) -> Result<Self, GeocodeError> {
        let geocoder: Option<Arc<dyn ReverseGeocoder>> = if config.geocoding.enabled {
            Some(Arc::new(NominatimGeocoder::new(
                config.geocoding.endpoint.clone(),
                &config.geocoding.user_agent,
            )?))
        } else {
            None
        };
        Ok(Self::new(
            position,
            geocoder,
            config.timeouts.position(),
            config.timeouts.geocode(),
        ))
    }

    /// Resolve a fix using only the resolver's own timeouts.
    pub async fn resolve(&self) -> Option<GeolocationFix> {
        let deadline = Instant::now() + self.position_timeout + self.geocode_timeout;
        self.resolve_by(deadline).await.fix
    }

    /// Resolve a fix, never waiting past `deadline`.
    pub async fn resolve_by(&self, deadline: Instant) -> Resolution {
        let (budget, capped) = step_budget(self.position_timeout, deadline);
        let coordinates =
            match tokio::time::timeout(budget, self.position.current_position()).await {
                Ok(Ok(coords)) => coords,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "no device position");
                    return Resolution {
                        fix: None,
                        degraded: Some(e.to_string()),
                        deadline_reached: false,
                    };
                }
                Err(_) => {
                    tracing::warn!(
                        timeout_ms = budget.as_millis() as u64,
                        capped,
                        "position query timed out"
                    );
                    return Resolution {
                        fix: None,
                        degraded: Some("position query timed out".into()),
                        deadline_reached: capped,
                    };
                }
            };

        let Some(geocoder) = &self.geocoder else {
            return Resolution {
                fix: Some(GeolocationFix {
                    coordinates,
                    address: None,
                }),
                degraded: None,
                deadline_reached: false,
            };
        };

        let (budget, capped) = step_budget(self.geocode_timeout, deadline);
        let (address, degraded, deadline_reached) =
            match tokio::time::timeout(budget, geocoder.reverse(&coordinates)).await {
                Ok(Ok(address)) => (Some(address), None, false),
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "reverse geocode failed, keeping coordinates");
                    (None, Some(format!("reverse geocode failed: {e}")), false)
                }
                Err(_) => {
                    tracing::warn!(
                        timeout_ms = budget.as_millis() as u64,
                        capped,
                        "reverse geocode timed out, keeping coordinates"
                    );
                    (None, Some("reverse geocode timed out".to_string()), capped)
                }
            };

        Resolution {
            fix: Some(GeolocationFix {
                coordinates,
                address,
            }),
            degraded,
            deadline_reached,
        }
    }
}

/// Time allowed for one step, and whether `deadline` is what limits it.
fn step_budget(own: Duration, deadline: Instant) -> (Duration, bool) {
    let left = remaining(deadline);
    if left < own { (left, true) } else { (own, false) }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}
