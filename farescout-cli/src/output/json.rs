//! JSON output for scripting.

use anyhow::Result;
use farescout_engine::SearchResponse;

/// Prints a search response as JSON.
pub fn print_search(response: &SearchResponse, pretty: bool) -> Result<()> {
    let body = serde_json::json!({
        "cache_state": response.cache_state,
        "partial": response.partial,
        "source_mix": response.source_mix,
        "offers": response.offers,
    });
    if pretty {
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("{body}");
    }
    Ok(())
}
