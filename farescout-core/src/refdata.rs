//! Reference data: airports, airlines, and daily FX rates.
//!
//! Normalizers resolve local times and convert currencies against these
//! tables. A built-in seed covers the route network; deployments overlay
//! it from persistent storage at startup.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Airports
// ============================================================================

/// One airport row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirportInfo {
    /// IATA-3 code.
    pub iata: &'static str,
    /// City name.
    pub city: &'static str,
    /// ISO country code.
    pub country: &'static str,
    /// Standard UTC offset in minutes.
    ///
    /// Schedule feeds on this network publish local standard time; the
    /// offset table is what converts them to UTC.
    pub utc_offset_min: i32,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

/// Lookup table over airports.
#[derive(Debug, Clone)]
pub struct AirportTable {
    by_iata: HashMap<&'static str, AirportInfo>,
}

impl AirportTable {
    /// Builds the table from the built-in seed.
    pub fn builtin() -> Self {
        let by_iata = AIRPORT_SEED.iter().map(|a| (a.iata, a.clone())).collect();
        Self { by_iata }
    }

    /// Looks up an airport by IATA code.
    pub fn get(&self, iata: &str) -> Option<&AirportInfo> {
        self.by_iata.get(iata)
    }

    /// UTC offset in minutes for an airport, when known.
    pub fn utc_offset_min(&self, iata: &str) -> Option<i32> {
        self.get(iata).map(|a| a.utc_offset_min)
    }

    /// Region grouping used by the route-coverage table.
    pub fn region(&self, iata: &str) -> Region {
        self.get(iata).map_or(Region::Other, |a| match a.country {
            "KR" => Region::Korea,
            "JP" => Region::Japan,
            "CN" | "HK" | "TW" | "MO" => Region::GreaterChina,
            "TH" | "VN" | "PH" | "MY" | "SG" | "ID" => Region::SoutheastAsia,
            "US" | "CA" => Region::NorthAmerica,
            "GB" | "FR" | "DE" | "NL" | "IT" | "ES" | "AT" | "CH" | "PL" | "TR" => Region::Europe,
            "AU" | "NZ" => Region::Oceania,
            _ => Region::Other,
        })
    }

    /// Number of seeded airports.
    pub fn len(&self) -> usize {
        self.by_iata.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.by_iata.is_empty()
    }
}

/// Geographic region for routing purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    /// South Korea.
    Korea,
    /// Japan.
    Japan,
    /// China, Hong Kong, Taiwan, Macau.
    GreaterChina,
    /// Southeast Asia.
    SoutheastAsia,
    /// United States and Canada.
    NorthAmerica,
    /// Europe including Turkey.
    Europe,
    /// Australia and New Zealand.
    Oceania,
    /// Everything else.
    Other,
}

const AIRPORT_SEED: &[AirportInfo] = &[
    AirportInfo { iata: "ICN", city: "Seoul", country: "KR", utc_offset_min: 540, lat: 37.469, lon: 126.451 },
    AirportInfo { iata: "GMP", city: "Seoul", country: "KR", utc_offset_min: 540, lat: 37.558, lon: 126.791 },
    AirportInfo { iata: "PUS", city: "Busan", country: "KR", utc_offset_min: 540, lat: 35.179, lon: 128.938 },
    AirportInfo { iata: "CJU", city: "Jeju", country: "KR", utc_offset_min: 540, lat: 33.511, lon: 126.493 },
    AirportInfo { iata: "NRT", city: "Tokyo", country: "JP", utc_offset_min: 540, lat: 35.772, lon: 140.393 },
    AirportInfo { iata: "HND", city: "Tokyo", country: "JP", utc_offset_min: 540, lat: 35.549, lon: 139.785 },
    AirportInfo { iata: "KIX", city: "Osaka", country: "JP", utc_offset_min: 540, lat: 34.434, lon: 135.244 },
    AirportInfo { iata: "NGO", city: "Nagoya", country: "JP", utc_offset_min: 540, lat: 34.858, lon: 136.805 },
    AirportInfo { iata: "FUK", city: "Fukuoka", country: "JP", utc_offset_min: 540, lat: 33.586, lon: 130.451 },
    AirportInfo { iata: "CTS", city: "Sapporo", country: "JP", utc_offset_min: 540, lat: 42.775, lon: 141.692 },
    AirportInfo { iata: "OKA", city: "Okinawa", country: "JP", utc_offset_min: 540, lat: 26.196, lon: 127.646 },
    AirportInfo { iata: "PVG", city: "Shanghai", country: "CN", utc_offset_min: 480, lat: 31.143, lon: 121.805 },
    AirportInfo { iata: "PEK", city: "Beijing", country: "CN", utc_offset_min: 480, lat: 40.08, lon: 116.585 },
    AirportInfo { iata: "HKG", city: "Hong Kong", country: "HK", utc_offset_min: 480, lat: 22.308, lon: 113.918 },
    AirportInfo { iata: "TPE", city: "Taipei", country: "TW", utc_offset_min: 480, lat: 25.078, lon: 121.233 },
    AirportInfo { iata: "BKK", city: "Bangkok", country: "TH", utc_offset_min: 420, lat: 13.69, lon: 100.75 },
    AirportInfo { iata: "CNX", city: "Chiang Mai", country: "TH", utc_offset_min: 420, lat: 18.767, lon: 98.963 },
    AirportInfo { iata: "SGN", city: "Ho Chi Minh City", country: "VN", utc_offset_min: 420, lat: 10.819, lon: 106.652 },
    AirportInfo { iata: "HAN", city: "Hanoi", country: "VN", utc_offset_min: 420, lat: 21.214, lon: 105.803 },
    AirportInfo { iata: "DAD", city: "Da Nang", country: "VN", utc_offset_min: 420, lat: 16.044, lon: 108.199 },
    AirportInfo { iata: "MNL", city: "Manila", country: "PH", utc_offset_min: 480, lat: 14.509, lon: 121.02 },
    AirportInfo { iata: "CEB", city: "Cebu", country: "PH", utc_offset_min: 480, lat: 10.308, lon: 123.979 },
    AirportInfo { iata: "SIN", city: "Singapore", country: "SG", utc_offset_min: 480, lat: 1.364, lon: 103.991 },
    AirportInfo { iata: "KUL", city: "Kuala Lumpur", country: "MY", utc_offset_min: 480, lat: 2.746, lon: 101.71 },
    AirportInfo { iata: "DPS", city: "Denpasar", country: "ID", utc_offset_min: 480, lat: -8.748, lon: 115.167 },
    AirportInfo { iata: "LAX", city: "Los Angeles", country: "US", utc_offset_min: -480, lat: 33.942, lon: -118.408 },
    AirportInfo { iata: "SFO", city: "San Francisco", country: "US", utc_offset_min: -480, lat: 37.619, lon: -122.375 },
    AirportInfo { iata: "JFK", city: "New York", country: "US", utc_offset_min: -300, lat: 40.64, lon: -73.779 },
    AirportInfo { iata: "LHR", city: "London", country: "GB", utc_offset_min: 0, lat: 51.47, lon: -0.454 },
    AirportInfo { iata: "CDG", city: "Paris", country: "FR", utc_offset_min: 60, lat: 49.01, lon: 2.55 },
    AirportInfo { iata: "AMS", city: "Amsterdam", country: "NL", utc_offset_min: 60, lat: 52.31, lon: 4.768 },
    AirportInfo { iata: "FRA", city: "Frankfurt", country: "DE", utc_offset_min: 60, lat: 50.038, lon: 8.562 },
    AirportInfo { iata: "MUC", city: "Munich", country: "DE", utc_offset_min: 60, lat: 48.354, lon: 11.786 },
    AirportInfo { iata: "ZRH", city: "Zurich", country: "CH", utc_offset_min: 60, lat: 47.465, lon: 8.549 },
    AirportInfo { iata: "VIE", city: "Vienna", country: "AT", utc_offset_min: 60, lat: 48.11, lon: 16.57 },
    AirportInfo { iata: "IST", city: "Istanbul", country: "TR", utc_offset_min: 180, lat: 41.275, lon: 28.752 },
    AirportInfo { iata: "SYD", city: "Sydney", country: "AU", utc_offset_min: 600, lat: -33.946, lon: 151.177 },
    AirportInfo { iata: "AKL", city: "Auckland", country: "NZ", utc_offset_min: 720, lat: -37.008, lon: 174.792 },
];

// ============================================================================
// Airlines
// ============================================================================

/// One airline row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AirlineInfo {
    /// IATA-2 code.
    pub iata: &'static str,
    /// Airline name.
    pub name: &'static str,
    /// Alliance, when a member.
    pub alliance: Option<&'static str>,
    /// Full-service or low-cost.
    pub low_cost: bool,
}

/// Lookup table over airlines.
#[derive(Debug, Clone)]
pub struct AirlineTable {
    by_iata: HashMap<&'static str, AirlineInfo>,
}

impl AirlineTable {
    /// Builds the table from the built-in seed.
    pub fn builtin() -> Self {
        let by_iata = AIRLINE_SEED.iter().map(|a| (a.iata, a.clone())).collect();
        Self { by_iata }
    }

    /// Looks up an airline by IATA code.
    pub fn get(&self, iata: &str) -> Option<&AirlineInfo> {
        self.by_iata.get(iata)
    }

    /// Airline display name, or the code itself when unknown.
    pub fn name_or_code<'a>(&'a self, iata: &'a str) -> &'a str {
        self.get(iata).map_or(iata, |a| a.name)
    }
}

const AIRLINE_SEED: &[AirlineInfo] = &[
    AirlineInfo { iata: "KE", name: "Korean Air", alliance: Some("SkyTeam"), low_cost: false },
    AirlineInfo { iata: "OZ", name: "Asiana Airlines", alliance: Some("Star Alliance"), low_cost: false },
    AirlineInfo { iata: "7C", name: "Jeju Air", alliance: None, low_cost: true },
    AirlineInfo { iata: "TW", name: "T'way Air", alliance: None, low_cost: true },
    AirlineInfo { iata: "LJ", name: "Jin Air", alliance: None, low_cost: true },
    AirlineInfo { iata: "ZE", name: "Eastar Jet", alliance: None, low_cost: true },
    AirlineInfo { iata: "BX", name: "Air Busan", alliance: None, low_cost: true },
    AirlineInfo { iata: "RS", name: "Air Seoul", alliance: None, low_cost: true },
    AirlineInfo { iata: "NH", name: "All Nippon Airways", alliance: Some("Star Alliance"), low_cost: false },
    AirlineInfo { iata: "JL", name: "Japan Airlines", alliance: Some("oneworld"), low_cost: false },
    AirlineInfo { iata: "CX", name: "Cathay Pacific", alliance: Some("oneworld"), low_cost: false },
    AirlineInfo { iata: "SQ", name: "Singapore Airlines", alliance: Some("Star Alliance"), low_cost: false },
    AirlineInfo { iata: "TG", name: "Thai Airways", alliance: Some("Star Alliance"), low_cost: false },
    AirlineInfo { iata: "VN", name: "Vietnam Airlines", alliance: Some("SkyTeam"), low_cost: false },
    AirlineInfo { iata: "TK", name: "Turkish Airlines", alliance: Some("Star Alliance"), low_cost: false },
    AirlineInfo { iata: "AF", name: "Air France", alliance: Some("SkyTeam"), low_cost: false },
    AirlineInfo { iata: "KL", name: "KLM", alliance: Some("SkyTeam"), low_cost: false },
    AirlineInfo { iata: "LH", name: "Lufthansa", alliance: Some("Star Alliance"), low_cost: false },
    AirlineInfo { iata: "LX", name: "Swiss International Air Lines", alliance: Some("Star Alliance"), low_cost: false },
    AirlineInfo { iata: "OS", name: "Austrian Airlines", alliance: Some("Star Alliance"), low_cost: false },
    AirlineInfo { iata: "SN", name: "Brussels Airlines", alliance: Some("Star Alliance"), low_cost: false },
    AirlineInfo { iata: "EN", name: "Air Dolomiti", alliance: None, low_cost: false },
    AirlineInfo { iata: "WK", name: "Edelweiss Air", alliance: None, low_cost: false },
    AirlineInfo { iata: "4Y", name: "Eurowings Discover", alliance: None, low_cost: true },
    AirlineInfo { iata: "EK", name: "Emirates", alliance: None, low_cost: false },
    AirlineInfo { iata: "QR", name: "Qatar Airways", alliance: Some("oneworld"), low_cost: false },
];

// ============================================================================
// FX Rates
// ============================================================================

/// Daily FX table with a stamped rate date.
///
/// Rates are expressed as KRW per one unit of each currency; conversion
/// between any pair routes through KRW. The stamp makes conversions
/// reproducible: the same inputs and table always give the same output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FxTable {
    /// The day these rates were stamped.
    pub rate_date: NaiveDate,
    krw_per_unit: HashMap<String, f64>,
}

impl FxTable {
    /// Builds a table from explicit rates.
    pub fn new(rate_date: NaiveDate, krw_per_unit: HashMap<String, f64>) -> Self {
        Self {
            rate_date,
            krw_per_unit,
        }
    }

    /// Built-in seed rates.
    pub fn builtin() -> Self {
        let rates = [
            ("KRW", 1.0),
            ("USD", 1390.0),
            ("EUR", 1510.0),
            ("JPY", 9.3),
            ("CNY", 192.0),
            ("HKD", 178.0),
            ("TWD", 43.5),
            ("THB", 40.2),
            ("VND", 0.055),
            ("PHP", 24.1),
            ("SGD", 1030.0),
            ("MYR", 312.0),
            ("IDR", 0.085),
            ("GBP", 1760.0),
            ("TRY", 42.0),
            ("AUD", 905.0),
            ("NZD", 830.0),
        ];
        Self {
            rate_date: NaiveDate::from_ymd_opt(2026, 8, 1).expect("valid seed date"),
            krw_per_unit: rates
                .iter()
                .map(|(c, r)| ((*c).to_string(), *r))
                .collect(),
        }
    }

    /// Converts an amount between currencies at the stamped rate.
    ///
    /// Returns `None` when either currency is not in the table.
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Option<f64> {
        if from == to {
            return Some(amount);
        }
        let from_rate = self.krw_per_unit.get(from)?;
        let to_rate = self.krw_per_unit.get(to)?;
        Some(amount * from_rate / to_rate)
    }

    /// Whether a currency is known.
    pub fn knows(&self, currency: &str) -> bool {
        self.krw_per_unit.contains_key(currency)
    }
}

// ============================================================================
// Tests
// ============================================================================
