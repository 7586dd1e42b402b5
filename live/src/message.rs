use passvote_types::LiveSnapshot;

use crate::error::LiveError;

/// Parse the `data` of one results-stream event.
pub fn parse_live_message(data: &str) -> Result<LiveSnapshot, LiveError> {
    Ok(serde_json::from_str(data)?)
}
