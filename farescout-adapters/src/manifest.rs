//! Static endpoint manifest.
//!
//! Every upstream endpoint this crate talks to, documented or
//! reverse-engineered, lives here in one place. Adapters read their
//! entries instead of scattering URL literals through clients.

/// Binary metasearch (Google Flights).
pub mod google {
    /// Search page; the query rides in the `tfs` parameter.
    pub const FLIGHTS_URL: &str = "https://www.google.com/travel/flights";
    /// Static feature flags blob sent alongside the query.
    pub const TFU: &str = "EgQIABABIgA";
    /// EU consent cookie pre-seeded to skip the consent interstitial.
    pub const CONSENT_COOKIE: &str = "CONSENT=PENDING+987; SOCS=CAESHAgBEhJnd3NfMjAyMzA4MTAtMF9SQzIaAmRlIAEaBgiA_LyaBg";
}

/// Aggregator search API (Kiwi Tequila).
pub mod kiwi {
    /// Search endpoint.
    pub const SEARCH_URL: &str = "https://api.tequila.kiwi.com/v2/search";
    /// API key header name.
    pub const API_KEY_HEADER: &str = "apikey";
}

/// Shared-tenant fare platform (EveryMundo airTrfx "Sputnik").
///
/// One endpoint serves every airline tenant; the tenant id rides in the
/// path and the public key is shared across tenants.
pub mod sputnik {
    /// Fare search URL; `{tenant}` is the airline tenant id.
    pub const FARE_SEARCH_URL: &str =
        "https://openair-california.airtrfx.com/airfare-sputnik-service/v3/{tenant}/fares/search";
    /// Shared public API key header.
    pub const API_KEY_HEADER: &str = "em-api-key";
    /// Airline tenants served by the platform.
    pub const TENANTS: &[(&str, &str)] = &[
        ("af", "AF"),
        ("kl", "KL"),
        ("lx", "LX"),
        ("os", "OS"),
        ("sn", "SN"),
        ("en", "EN"),
        ("wk", "WK"),
        ("4y", "4Y"),
    ];
    /// Referer required by the platform's CORS policy, per tenant site.
    pub const REFERER: &str = "https://www.airfrance.com/";
}

/// Air Busan booking API.
///
/// The WAF allowlists the Naver search-crawler User-Agent; requests with
/// that UA skip the JS challenge entirely.
pub mod airbusan {
    /// Site origin.
    pub const ORIGIN: &str = "https://www.airbusan.com";
    /// Availability endpoint (form POST).
    pub const AVAIL_PATH: &str = "/web/bookingApi/flightsAvail";
    /// Referer the endpoint expects.
    pub const REFERER: &str = "https://www.airbusan.com/web/individual/booking/international";
}

/// Eastar Jet booking engine (dotRez).
pub mod eastar {
    /// API origin.
    pub const API_ORIGIN: &str = "https://kraken.eastarjet.com";
    /// Warm-up GET creating an anonymous session.
    pub const SESSION_PATH: &str = "/passport/v1/session/create";
    /// Availability search.
    pub const AVAIL_PATH: &str = "/passport/v1/booking/availability";
    /// Web origin sent as Origin/Referer.
    pub const WEB_ORIGIN: &str = "https://main.eastarjet.com";
    /// Sales channel code the web client sends.
    pub const CHANNEL_CODE: &str = "IWE";
    /// Header carrying the session token.
    pub const SESSION_HEADER: &str = "x-session-token";
}

/// Amadeus self-service GDS API.
pub mod amadeus {
    /// OAuth2 token endpoint (test environment).
    pub const TOKEN_URL: &str = "https://test.api.amadeus.com/v1/security/oauth2/token";
    /// Flight offers search.
    pub const OFFERS_URL: &str = "https://test.api.amadeus.com/v2/shopping/flight-offers";
    /// Requests per hour allowed on the free tier.
    pub const HOURLY_CAP: u32 = 1000;
}

/// Lufthansa Group open API.
pub mod lufthansa {
    /// OAuth2 token endpoint.
    pub const TOKEN_URL: &str = "https://api.lufthansa.com/v1/oauth/token";
    /// Schedules endpoint; origin/destination/date ride in the path.
    pub const SCHEDULES_URL: &str = "https://api.lufthansa.com/v1/operations/schedules";
    /// Group carriers served by the API.
    pub const GROUP_AIRLINES: &[&str] = &["LH", "LX", "OS", "4U", "SN", "EN", "WK", "4Y"];
}

/// Turkish Airlines booking SPA (browser automation).
pub mod turkish {
    /// Booking page the browser drives.
    pub const BOOKING_URL: &str = "https://www.turkishairlines.com/en-int/flights/booking/";
    /// Internal API paths the capture hook watches for.
    pub const CAPTURE_PATTERNS: &[&str] = &[
        "/api/v1/availability/flight-matrix",
        "/api/v1/availability/cheapest-prices",
    ];
}
