//! Search query types.
//!
//! A [`Query`] is the immutable descriptor of one search request. Its
//! [`QueryKey`] is the canonical cache key: passenger counts are excluded
//! because they only scale the final price, not availability.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

// ============================================================================
// Cabin Class
// ============================================================================

/// Cabin class for the flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CabinClass {
    /// Economy cabin.
    Economy,
    /// Premium economy cabin.
    PremiumEconomy,
    /// Business cabin.
    Business,
    /// First class cabin.
    First,
}

impl CabinClass {
    /// Canonical wire name (matches the serialized form).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Economy => "ECONOMY",
            Self::PremiumEconomy => "PREMIUM_ECONOMY",
            Self::Business => "BUSINESS",
            Self::First => "FIRST",
        }
    }

    /// Parses a cabin-class string as used by most upstream APIs.
    ///
    /// Accepts a few common spellings beyond the canonical form.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "ECONOMY" | "M" | "Y" => Some(Self::Economy),
            "PREMIUM_ECONOMY" | "W" => Some(Self::PremiumEconomy),
            "BUSINESS" | "C" | "J" => Some(Self::Business),
            "FIRST" | "F" => Some(Self::First),
            _ => None,
        }
    }
}

impl fmt::Display for CabinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Trip Type
// ============================================================================

/// Trip type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripType {
    /// Single outbound leg.
    OneWay,
    /// Outbound plus return leg.
    RoundTrip,
    /// Arbitrary leg sequence.
    MultiCity,
}

impl TripType {
    /// Canonical wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneWay => "ONE_WAY",
            Self::RoundTrip => "ROUND_TRIP",
            Self::MultiCity => "MULTI_CITY",
        }
    }
}

impl fmt::Display for TripType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Passenger Count
// ============================================================================

/// Number of passengers by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassengerCount {
    /// Adult passengers (12+).
    pub adults: u8,
    /// Child passengers (2-11).
    pub children: u8,
    /// Infants occupying a seat.
    pub infants_in_seat: u8,
    /// Infants travelling on an adult's lap.
    pub infants_on_lap: u8,
}

impl Default for PassengerCount {
    fn default() -> Self {
        Self {
            adults: 1,
            children: 0,
            infants_in_seat: 0,
            infants_on_lap: 0,
        }
    }
}

impl PassengerCount {
    /// Maximum total passengers per booking.
    pub const MAX_TOTAL: u8 = 9;

    /// Total passenger count across all types.
    pub fn total(&self) -> u8 {
        self.adults + self.children + self.infants_in_seat + self.infants_on_lap
    }

    /// Validates passenger count constraints.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.adults < 1 {
            return Err(CoreError::InvalidQuery(
                "At least one adult passenger is required".to_string(),
            ));
        }
        if self.total() > Self::MAX_TOTAL {
            return Err(CoreError::InvalidQuery(format!(
                "Total passengers ({}) exceeds maximum of {}",
                self.total(),
                Self::MAX_TOTAL
            )));
        }
        if self.infants_on_lap > self.adults {
            return Err(CoreError::InvalidQuery(
                "Each infant on lap requires an adult".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Query Mode
// ============================================================================

/// How a search request should be executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryMode {
    /// Interactive: first-response-wins, short deadline.
    #[default]
    Interactive,
    /// Background refresh: wait for all sources, long deadline.
    Background,
}

// ============================================================================
// Query
// ============================================================================

/// Flight search parameters.
///
/// Construct via [`Query::one_way`] and the `with_*` builders; the
/// engine validates every query on entry and rejects violations as
/// `INVALID_QUERY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Origin airport (IATA-3).
    pub origin: String,
    /// Destination airport (IATA-3).
    pub destination: String,
    /// Outbound date.
    pub departure_date: NaiveDate,
    /// Return date (required for round trips).
    pub return_date: Option<NaiveDate>,
    /// Cabin class.
    pub cabin: CabinClass,
    /// Trip type.
    pub trip_type: TripType,
    /// Passenger counts.
    pub passengers: PassengerCount,
    /// ISO-4217 currency for returned prices.
    pub currency: String,
}

impl Query {
    /// Creates a one-way economy query with defaults.
    pub fn one_way(
        origin: impl Into<String>,
        destination: impl Into<String>,
        departure_date: NaiveDate,
    ) -> Self {
        Self {
            origin: origin.into().to_ascii_uppercase(),
            destination: destination.into().to_ascii_uppercase(),
            departure_date,
            return_date: None,
            cabin: CabinClass::Economy,
            trip_type: TripType::OneWay,
            passengers: PassengerCount::default(),
            currency: "KRW".to_string(),
        }
    }

    /// Sets the cabin class.
    pub fn with_cabin(mut self, cabin: CabinClass) -> Self {
        self.cabin = cabin;
        self
    }

    /// Sets the result currency.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into().to_ascii_uppercase();
        self
    }

    /// Sets the return date and switches to a round trip.
    pub fn with_return(mut self, return_date: NaiveDate) -> Self {
        self.return_date = Some(return_date);
        self.trip_type = TripType::RoundTrip;
        self
    }

    /// Sets passenger counts.
    pub fn with_passengers(mut self, passengers: PassengerCount) -> Self {
        self.passengers = passengers;
        self
    }

    /// Validates the query against all invariants.
    ///
    /// Checks IATA code shape, currency shape, date ordering, the
    /// departure-not-in-the-past rule, and passenger constraints.
    pub fn validate(&self) -> Result<(), CoreError> {
        fn is_iata(code: &str) -> bool {
            code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
        }

        if !is_iata(&self.origin) {
            return Err(CoreError::InvalidQuery(format!(
                "Origin must be an IATA-3 code, got '{}'",
                self.origin
            )));
        }
        if !is_iata(&self.destination) {
            return Err(CoreError::InvalidQuery(format!(
                "Destination must be an IATA-3 code, got '{}'",
                self.destination
            )));
        }
        if self.origin == self.destination {
            return Err(CoreError::InvalidQuery(
                "Origin and destination must differ".to_string(),
            ));
        }
        if self.currency.len() != 3 || !self.currency.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(CoreError::InvalidQuery(format!(
                "Currency must be an ISO-4217 code, got '{}'",
                self.currency
            )));
        }
        if self.departure_date < Utc::now().date_naive() {
            return Err(CoreError::InvalidQuery(
                "Departure date is in the past".to_string(),
            ));
        }
        match (self.trip_type, self.return_date) {
            (TripType::RoundTrip, None) => {
                return Err(CoreError::InvalidQuery(
                    "return_date is required for round trips".to_string(),
                ));
            }
            (_, Some(ret)) if ret < self.departure_date => {
                return Err(CoreError::InvalidQuery(
                    "return_date must not precede departure_date".to_string(),
                ));
            }
            _ => {}
        }
        self.passengers.validate()
    }

    /// Canonical cache key for this query.
    pub fn key(&self) -> QueryKey {
        QueryKey::from_query(self)
    }
}

// ============================================================================
// Query Key
// ============================================================================

/// Canonical serialization of a [`Query`] minus passenger counts.
///
/// Passenger counts only affect the final price multiplier, not which
/// flights exist, so searches differing only in counts share cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey(String);

impl QueryKey {
    /// Builds the key from a query.
    pub fn from_query(query: &Query) -> Self {
        let ret = query
            .return_date
            .map_or_else(|| "-".to_string(), |d| d.to_string());
        Self(format!(
            "{}:{}:{}:{}:{}:{}:{}",
            query.origin,
            query.destination,
            query.departure_date,
            ret,
            query.cabin,
            query.trip_type,
            query.currency,
        ))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
