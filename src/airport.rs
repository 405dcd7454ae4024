//! Airport resolution
//!
//! Codes are resolved against a static table of well-known airports first,
//! then against the external lookup service. Every lookup failure collapses
//! to "not found" so callers have a single failure path.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Resolved airport metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirportInfo {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

struct KnownAirport {
    code: &'static str,
    name: &'static str,
    city: &'static str,
    country: &'static str,
}

const KNOWN_AIRPORTS: &[KnownAirport] = &[
    KnownAirport { code: "SYD", name: "Sydney Kingsford Smith International Airport", city: "Sydney", country: "Australia" },
    KnownAirport { code: "MEL", name: "Melbourne Airport", city: "Melbourne", country: "Australia" },
    KnownAirport { code: "BNE", name: "Brisbane Airport", city: "Brisbane", country: "Australia" },
    KnownAirport { code: "PER", name: "Perth Airport", city: "Perth", country: "Australia" },
    KnownAirport { code: "ADL", name: "Adelaide Airport", city: "Adelaide", country: "Australia" },
    KnownAirport { code: "CNS", name: "Cairns Airport", city: "Cairns", country: "Australia" },
    KnownAirport { code: "OOL", name: "Gold Coast Airport", city: "Gold Coast", country: "Australia" },
    KnownAirport { code: "CBR", name: "Canberra Airport", city: "Canberra", country: "Australia" },
    KnownAirport { code: "DRW", name: "Darwin International Airport", city: "Darwin", country: "Australia" },
    KnownAirport { code: "HBA", name: "Hobart Airport", city: "Hobart", country: "Australia" },
    KnownAirport { code: "LST", name: "Launceston Airport", city: "Launceston", country: "Australia" },
    KnownAirport { code: "ASP", name: "Alice Springs Airport", city: "Alice Springs", country: "Australia" },
    KnownAirport { code: "LHR", name: "London Heathrow Airport", city: "London", country: "United Kingdom" },
    KnownAirport { code: "LAX", name: "Los Angeles International Airport", city: "Los Angeles", country: "United States" },
    KnownAirport { code: "JFK", name: "John F. Kennedy International Airport", city: "New York", country: "United States" },
    KnownAirport { code: "SIN", name: "Singapore Changi Airport", city: "Singapore", country: "Singapore" },
    KnownAirport { code: "DXB", name: "Dubai International Airport", city: "Dubai", country: "United Arab Emirates" },
    KnownAirport { code: "HKG", name: "Hong Kong International Airport", city: "Hong Kong", country: "Hong Kong" },
    KnownAirport { code: "NRT", name: "Narita International Airport", city: "Tokyo", country: "Japan" },
    KnownAirport { code: "AKL", name: "Auckland Airport", city: "Auckland", country: "New Zealand" },
    KnownAirport { code: "CHC", name: "Christchurch Airport", city: "Christchurch", country: "New Zealand" },
    KnownAirport { code: "WLG", name: "Wellington Airport", city: "Wellington", country: "New Zealand" },
];

/// Look up a code in the static table (expects an uppercase code)
pub fn known_airport(code: &str) -> Option<AirportInfo> {
    KNOWN_AIRPORTS
        .iter()
        .find(|airport| airport.code == code)
        .map(|airport| AirportInfo {
            code: airport.code.to_string(),
            name: airport.name.to_string(),
            city: Some(airport.city.to_string()),
            country: Some(airport.country.to_string()),
        })
}

/// Failure talking to the lookup service
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("airport lookup request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("airport lookup returned HTTP {0}")]
    Status(u16),
}

/// External airport lookup service
#[async_trait]
pub trait AirportLookup: Send + Sync {
    /// Look up a code; `Ok(None)` means the service answered but knows no such airport
    async fn lookup(&self, code: &str) -> Result<Option<AirportInfo>, LookupError>;
}

#[async_trait]
impl<T: AirportLookup + ?Sized> AirportLookup for Arc<T> {
    async fn lookup(&self, code: &str) -> Result<Option<AirportInfo>, LookupError> {
        (**self).lookup(code).await
    }
}

/// Lookup backed by an AirLabs-style HTTP endpoint
pub struct HttpAirportLookup {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpAirportLookup {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LookupError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    response: Vec<LookupCandidate>,
}

#[derive(Debug, Deserialize)]
struct LookupCandidate {
    name: Option<String>,
    city: Option<String>,
    country_code: Option<String>,
}

impl LookupCandidate {
    fn into_airport(self, code: &str) -> AirportInfo {
        AirportInfo {
            code: code.to_string(),
            name: non_empty(self.name).unwrap_or_else(|| "Unknown Airport".to_string()),
            city: non_empty(self.city),
            country: non_empty(self.country_code),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[async_trait]
impl AirportLookup for HttpAirportLookup {
    async fn lookup(&self, code: &str) -> Result<Option<AirportInfo>, LookupError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("iata_code", code), ("api_key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LookupError::Status(response.status().as_u16()));
        }

        let body: LookupResponse = response.json().await?;
        Ok(body
            .response
            .into_iter()
            .next()
            .map(|candidate| candidate.into_airport(code)))
    }
}

/// Table-first resolver over an external lookup
pub struct AirportResolver<L: AirportLookup> {
    lookup: L,
}

impl<L: AirportLookup> AirportResolver<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }

    /// Resolve a code to airport metadata; `None` covers both unknown codes
    /// and lookup failures.
    pub async fn resolve(&self, code: &str) -> Option<AirportInfo> {
        let code = code.to_ascii_uppercase();
        if let Some(airport) = known_airport(&code) {
            return Some(airport);
        }

        let start = std::time::Instant::now();
        match self.lookup.lookup(&code).await {
            Ok(found) => {
                tracing::info!(
                    code = %code,
                    found = found.is_some(),
                    duration_ms = %start.elapsed().as_millis(),
                    "Airport lookup completed"
                );
                found
            }
            Err(e) => {
                tracing::warn!(
                    code = %code,
                    duration_ms = %start.elapsed().as_millis(),
                    error = %e,
                    "Airport lookup failed, treating as not found"
                );
                None
            }
        }
    }
}
