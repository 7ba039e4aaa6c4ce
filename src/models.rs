//! Geolocation record shape.

use serde::{Deserialize, Serialize};

/// The flattened geolocation profile stored for one client address.
///
/// `ip` is the natural primary key; a record is written once, on the first
/// successful lookup for its address, and never updated afterward. The nested
/// currency and timezone objects of the provider response are flattened into
/// the `currency_*` and `time_zone_*` columns when the record is built at the
/// provider boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GeoRecord {
    pub ip: String,
    pub continent_code: Option<String>,
    pub continent_name: Option<String>,
    pub country_code2: Option<String>,
    pub country_code3: Option<String>,
    pub country_name: Option<String>,
    pub country_name_official: Option<String>,
    pub country_capital: Option<String>,
    pub state_prov: Option<String>,
    pub state_code: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub zipcode: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub is_eu: Option<bool>,
    pub calling_code: Option<String>,
    pub country_tld: Option<String>,
    pub languages: Option<String>,
    pub country_flag: Option<String>,
    pub geoname_id: Option<String>,
    pub isp: Option<String>,
    pub connection_type: Option<String>,
    pub organization: Option<String>,
    pub currency_code: Option<String>,
    pub currency_name: Option<String>,
    pub currency_symbol: Option<String>,
    pub time_zone_name: Option<String>,
    pub time_zone_offset: Option<f64>,
    pub time_zone_offset_with_dst: Option<f64>,
    pub time_zone_current_time: Option<String>,
    pub time_zone_current_time_unix: Option<f64>,
    pub time_zone_is_dst: Option<bool>,
    pub time_zone_dst_savings: Option<f64>,
}
