//! Browser-automation adapter.
//!
//! The carrier's site blocks non-browser TLS fingerprints on its POST
//! endpoints, so this adapter drives a pooled headless Chrome through the
//! booking SPA: install a capture hook before navigation, fill the form,
//! click search, and read the availability JSON the SPA fetched itself.
//! A single call runs 60-90 s; the router only schedules this source
//! when cheaper paths cannot cover the route.

pub(crate) mod normalize;
pub mod parser;

use async_trait::async_trait;
use farescout_core::{FailureKind, Query, SourceId, SourceVariant};
use farescout_fetch::{
    AdapterContext, BrowserError, BucketConfig, Deadline, EvasionLadder, EvasionStrategy,
    FetchError,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::adapter::Adapter;
use crate::descriptor::{SourceCredentials, SourceDescriptor};
use crate::manifest;
use crate::raw::{RawOffer, RawPayload};

pub use parser::{TurkishFlight, TurkishSegment};

/// How often the capture slot is polled after the search is submitted.
const CAPTURE_POLL: Duration = Duration::from_millis(500);

/// Hook installed before navigation: wraps `fetch` and `XMLHttpRequest`
/// and stores the first matching availability response on the window.
const CAPTURE_HOOK: &str = r#"
(() => {
  window.__fsCaptured = null;
  const patterns = ['/api/v1/availability/flight-matrix', '/api/v1/availability/cheapest-prices'];
  const matches = (url) => patterns.some((p) => String(url).includes(p));
  const origFetch = window.fetch;
  window.fetch = async (...args) => {
    const res = await origFetch(...args);
    try {
      const url = typeof args[0] === 'string' ? args[0] : args[0].url;
      if (!window.__fsCaptured && matches(url) && res.ok) {
        window.__fsCaptured = await res.clone().json();
      }
    } catch (e) {}
    return res;
  };
  const origOpen = XMLHttpRequest.prototype.open;
  XMLHttpRequest.prototype.open = function (method, url) {
    this.__fsUrl = url;
    return origOpen.apply(this, arguments);
  };
  const origSend = XMLHttpRequest.prototype.send;
  XMLHttpRequest.prototype.send = function () {
    this.addEventListener('load', () => {
      try {
        if (!window.__fsCaptured && matches(this.__fsUrl) && this.status === 200) {
          window.__fsCaptured = JSON.parse(this.responseText);
        }
      } catch (e) {}
    });
    return origSend.apply(this, arguments);
  };
})();
"#;

/// Removes automation tells before the site's scripts run.
const STEALTH_SCRIPT: &str = r#"
(() => {
  try { Object.defineProperty(navigator, 'webdriver', {get: () => undefined}); } catch (e) {}
  try { window.chrome = window.chrome || {}; window.chrome.runtime = window.chrome.runtime || {}; } catch (e) {}
  try { Object.defineProperty(navigator, 'plugins', {get: () => [1, 2, 3, 4, 5]}); } catch (e) {}
  try { Object.defineProperty(navigator, 'languages', {get: () => ['en-US', 'en']}); } catch (e) {}
})();
"#;

/// Neutralizes the consent overlay and accepts cookies.
///
/// The overlay must stay in the DOM (removing it crashes the SPA); only
/// its pointer events are disabled.
const DISMISS_CONSENT: &str = r#"
(() => {
  document.querySelectorAll('[class*="overlay"]').forEach((el) => {
    const s = getComputedStyle(el);
    if (s.position === 'fixed' && parseInt(s.zIndex) > 100) {
      el.style.pointerEvents = 'none';
    }
  });
  const btn = document.getElementById('allowCookiesButton');
  if (btn) btn.click();
})();
"#;

// ============================================================================
// Adapter
// ============================================================================

/// Browser-automation availability adapter.
#[derive(Debug, Default)]
pub struct TurkishAdapter;

impl TurkishAdapter {
    /// Creates the adapter.
    pub fn new() -> Self {
        Self
    }

    fn fill_form_script(query: &Query) -> String {
        // The SPA widget reacts to native setters plus input events; the
        // date is selected straight from the calendar tiles by aria-label.
        let date_label = query.departure_date.format("%B %-d").to_string();
        format!(
            r#"
(async () => {{
  const type = (sel, value) => {{
    const el = document.querySelector(sel);
    if (!el) throw new Error('missing ' + sel);
    const setter = Object.getOwnPropertyDescriptor(window.HTMLInputElement.prototype, 'value').set;
    setter.call(el, value);
    el.dispatchEvent(new Event('input', {{bubbles: true}}));
  }};
  const pick = async () => {{
    await new Promise((r) => setTimeout(r, 1500));
    const opt = document.querySelector('[role="option"]');
    if (opt) opt.click();
  }};
  const oneWay = document.querySelector('#one-way');
  if (oneWay) oneWay.click();
  type('#fromPort', '{origin}');
  await pick();
  type('#toPort', '{destination}');
  await pick();
  await new Promise((r) => setTimeout(r, 1500));
  for (let i = 0; i < 8; i++) {{
    const tile = document.querySelector(
      '.react-calendar__tile abbr[aria-label*="{date_label}"]'
    );
    if (tile) {{ tile.closest('button').click(); return true; }}
    const next = document.querySelector('.react-calendar__navigation__next-button');
    if (!next) break;
    next.click();
    await new Promise((r) => setTimeout(r, 400));
  }}
  return false;
}})()
"#,
            origin = query.origin,
            destination = query.destination,
        )
    }

    async fn run_session(
        &self,
        query: &Query,
        ctx: &AdapterContext,
        deadline: Deadline,
    ) -> Result<String, FetchError> {
        let mut lease = ctx.browser.lease(deadline).await?;

        let result = async {
            let page = lease.new_page("about:blank").await?;

            page.evaluate_on_new_document(STEALTH_SCRIPT.to_string())
                .await
                .map_err(|e| BrowserError::Cdp(e.to_string()))?;
            page.evaluate_on_new_document(CAPTURE_HOOK.to_string())
                .await
                .map_err(|e| BrowserError::Cdp(e.to_string()))?;

            page.goto(manifest::turkish::BOOKING_URL)
                .await
                .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;

            // Challenge pages bounce the browser off the booking host.
            let url = page
                .url()
                .await
                .map_err(|e| BrowserError::Cdp(e.to_string()))?
                .unwrap_or_default();
            if !url.contains("turkishairlines.com") {
                return Err(FetchError::Browser(BrowserError::ChallengeRedirect(url)));
            }

            // Give the bot sensor and the booking widget time to settle.
            tokio::time::sleep(Duration::from_secs(5)).await;
            deadline.checked_remaining()?;

            page.evaluate(DISMISS_CONSENT)
                .await
                .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?;

            let filled = page
                .evaluate(Self::fill_form_script(query))
                .await
                .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?
                .into_value::<bool>()
                .unwrap_or(false);
            if !filled {
                return Err(FetchError::Browser(BrowserError::ElementNotFound(
                    "departure date tile".to_string(),
                )));
            }

            page.evaluate(
                r#"(() => {
                    const btn = [...document.querySelectorAll('button')]
                        .find((b) => /search/i.test(b.textContent));
                    if (btn) btn.click();
                })()"#,
            )
            .await
            .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?;

            // Poll the capture slot until the SPA's own API call lands.
            loop {
                deadline.checked_remaining()?;
                tokio::time::sleep(CAPTURE_POLL).await;
                let captured = page
                    .evaluate("window.__fsCaptured ? JSON.stringify(window.__fsCaptured) : null")
                    .await
                    .map_err(|e| BrowserError::EvaluationFailed(e.to_string()))?
                    .into_value::<Option<String>>()
                    .unwrap_or(None);
                if let Some(body) = captured {
                    debug!("Availability response captured");
                    let _ = page.close().await;
                    return Ok(body);
                }
            }
        }
        .await;

        if matches!(
            result,
            Err(FetchError::Browser(BrowserError::NavigationFailed(_) | BrowserError::Cdp(_)))
        ) {
            // Instance is likely wedged; replace it rather than pooling it.
            warn!("Browser session failed at CDP level, replacing instance");
            lease.mark_broken();
        }
        result
    }
}

#[async_trait]
impl Adapter for TurkishAdapter {
    fn id(&self) -> SourceId {
        SourceId::Turkish
    }

    fn deadline_floor(&self) -> Duration {
        // A full form-drive takes the better part of a minute.
        Duration::from_secs(30)
    }

    #[instrument(skip(self, query, ctx), fields(source = "turkish"))]
    async fn search(
        &self,
        query: &Query,
        ctx: &AdapterContext,
        deadline: Deadline,
        _evasion: EvasionStrategy,
    ) -> Result<Vec<RawOffer>, FetchError> {
        let body = self.run_session(query, ctx, deadline).await?;
        let flights = parser::parse_captured(&body)?;
        Ok(flights
            .into_iter()
            .map(|flight| RawOffer::new(SourceId::Turkish, RawPayload::Turkish(flight)))
            .collect())
    }

    async fn health_check(&self, ctx: &AdapterContext) -> bool {
        // The pool being alive is the health signal; a full drive is too
        // expensive for a probe.
        ctx.browser.size() > 0
    }

    fn classify_failure(&self, error: &FetchError) -> FailureKind {
        match error {
            FetchError::Browser(BrowserError::ElementNotFound(_)) => FailureKind::ParseUnusable,
            other => other.classify(),
        }
    }
}

// ============================================================================
// Descriptor
// ============================================================================

/// Descriptor for the browser-automation source.
pub fn turkish_descriptor() -> SourceDescriptor {
    SourceDescriptor {
        id: SourceId::Turkish,
        variant: SourceVariant::BrowserAutomation,
        credentials: farescout_core::CredentialsKind::None,
        rate_limit: BucketConfig::new(1.0, 0.02),
        timeout: Duration::from_secs(90),
        deadline_floor: Duration::from_secs(30),
        evasion: || EvasionLadder::single(EvasionStrategy::BrowserSession),
        carriers: &["TK"],
        build: |_creds: &SourceCredentials| Arc::new(TurkishAdapter::new()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_form_script_embeds_query() {
        let query = Query::one_way("IST", "ICN", NaiveDate::from_ymd_opt(2026, 4, 15).unwrap());
        let script = TurkishAdapter::fill_form_script(&query);
        assert!(script.contains("'IST'"));
        assert!(script.contains("'ICN'"));
        assert!(script.contains("April 15"));
    }

    #[test]
    fn test_element_not_found_is_structural() {
        let adapter = TurkishAdapter::new();
        let err = FetchError::Browser(BrowserError::ElementNotFound("#fromPort".to_string()));
        assert_eq!(adapter.classify_failure(&err), FailureKind::ParseUnusable);
    }

    #[test]
    fn test_deadline_floor_is_generous() {
        let adapter = TurkishAdapter::new();
        assert!(adapter.deadline_floor() >= Duration::from_secs(30));
    }
}
