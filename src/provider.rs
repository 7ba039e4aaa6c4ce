//! Geolocation lookup capability.
//!
//! [`GeoProvider`] is the only component performing outbound network I/O. The
//! production implementation calls the ipgeolocation.io HTTP API; tests
//! substitute stubs. A failed lookup is never retried within a run.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error_handling::ProviderError;
use crate::models::GeoRecord;

/// Capability: resolve one client address to a geolocation record.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    async fn fetch(&self, address: &str) -> Result<GeoRecord, ProviderError>;
}

/// Currency sub-object of the lookup response.
#[derive(Debug, Deserialize)]
struct CurrencyInfo {
    code: Option<String>,
    name: Option<String>,
    symbol: Option<String>,
}

/// Timezone sub-object of the lookup response.
#[derive(Debug, Deserialize)]
struct TimeZoneInfo {
    name: Option<String>,
    offset: Option<f64>,
    offset_with_dst: Option<f64>,
    current_time: Option<String>,
    current_time_unix: Option<f64>,
    is_dst: Option<bool>,
    dst_savings: Option<f64>,
}

/// Raw ipgeolocation.io response shape.
///
/// Kept private to this module; the nested currency/timezone objects are
/// flattened into [`GeoRecord`] exactly once, here at the boundary.
#[derive(Debug, Deserialize)]
struct GeoResponse {
    ip: Option<String>,
    continent_code: Option<String>,
    continent_name: Option<String>,
    country_code2: Option<String>,
    country_code3: Option<String>,
    country_name: Option<String>,
    country_name_official: Option<String>,
    country_capital: Option<String>,
    state_prov: Option<String>,
    state_code: Option<String>,
    district: Option<String>,
    city: Option<String>,
    zipcode: Option<String>,
    latitude: Option<String>,
    longitude: Option<String>,
    is_eu: Option<bool>,
    calling_code: Option<String>,
    country_tld: Option<String>,
    languages: Option<String>,
    country_flag: Option<String>,
    geoname_id: Option<String>,
    isp: Option<String>,
    connection_type: Option<String>,
    organization: Option<String>,
    currency: Option<CurrencyInfo>,
    time_zone: Option<TimeZoneInfo>,
}

impl GeoResponse {
    /// Flattens the nested response into the flat record schema.
    ///
    /// `requested` fills the key when the response omits its `ip` field, so a
    /// record can never be stored under an empty address.
    fn into_record(self, requested: &str) -> GeoRecord {
        let currency = self.currency;
        let time_zone = self.time_zone;
        GeoRecord {
            ip: self.ip.unwrap_or_else(|| requested.to_string()),
            continent_code: self.continent_code,
            continent_name: self.continent_name,
            country_code2: self.country_code2,
            country_code3: self.country_code3,
            country_name: self.country_name,
            country_name_official: self.country_name_official,
            country_capital: self.country_capital,
            state_prov: self.state_prov,
            state_code: self.state_code,
            district: self.district,
            city: self.city,
            zipcode: self.zipcode,
            latitude: self.latitude,
            longitude: self.longitude,
            is_eu: self.is_eu,
            calling_code: self.calling_code,
            country_tld: self.country_tld,
            languages: self.languages,
            country_flag: self.country_flag,
            geoname_id: self.geoname_id,
            isp: self.isp,
            connection_type: self.connection_type,
            organization: self.organization,
            currency_code: currency.as_ref().and_then(|c| c.code.clone()),
            currency_name: currency.as_ref().and_then(|c| c.name.clone()),
            currency_symbol: currency.and_then(|c| c.symbol),
            time_zone_name: time_zone.as_ref().and_then(|t| t.name.clone()),
            time_zone_offset: time_zone.as_ref().and_then(|t| t.offset),
            time_zone_offset_with_dst: time_zone.as_ref().and_then(|t| t.offset_with_dst),
            time_zone_current_time: time_zone.as_ref().and_then(|t| t.current_time.clone()),
            time_zone_current_time_unix: time_zone.as_ref().and_then(|t| t.current_time_unix),
            time_zone_is_dst: time_zone.as_ref().and_then(|t| t.is_dst),
            time_zone_dst_savings: time_zone.and_then(|t| t.dst_savings),
        }
    }
}

/// ipgeolocation.io lookup client.
///
/// One GET per cache miss: `<base>/ipgeo?apiKey=<key>&ip=<address>`. The
/// client's request timeout doubles as the per-lookup timeout; expiry surfaces
/// as [`ProviderError::Timeout`].
pub struct IpGeolocationClient {
    client: Arc<reqwest::Client>,
    api_key: String,
    base_url: String,
}

impl IpGeolocationClient {
    pub fn new(
        client: Arc<reqwest::Client>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        IpGeolocationClient {
            client,
            api_key: api_key.into(),
            base_url,
        }
    }
}

#[async_trait]
impl GeoProvider for IpGeolocationClient {
    async fn fetch(&self, address: &str) -> Result<GeoRecord, ProviderError> {
        let response = self
            .client
            .get(format!("{}/ipgeo", self.base_url))
            .query(&[("apiKey", self.api_key.as_str()), ("ip", address)])
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let body: GeoResponse = response.json().await?;
                Ok(body.into_record(address))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited),
            // 423 is what ipgeolocation.io returns for bogon/private addresses
            StatusCode::NOT_FOUND | StatusCode::LOCKED => Err(ProviderError::NotFound),
            status => Err(ProviderError::Status(status.as_u16())),
        }
    }
}
