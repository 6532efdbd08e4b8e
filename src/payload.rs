//! Payload loading: one JSON object from an explicit argument or from a
//! single blocking read of stdin. No streaming, no partial reads — the
//! whole payload is in hand before dispatch proceeds.

use std::io::{self, IsTerminal, Read};

use serde_json::{Map, Value};

use crate::error::BridgeError;

/// Obtain the request payload. A non-empty explicit argument wins.
/// Without one, an interactive stdin yields `{}` without blocking;
/// otherwise stdin is read to EOF and parsed.
pub fn load(explicit: Option<&str>) -> Result<Value, BridgeError> {
    if let Some(raw) = explicit
        && !raw.trim().is_empty()
    {
        return parse(raw);
    }

    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(Value::Object(Map::new()));
    }

    let mut raw = String::new();
    stdin
        .read_to_string(&mut raw)
        .map_err(anyhow::Error::from)?;
    from_input(&raw)
}

/// Parse fully-read input. Empty or whitespace-only input is an empty
/// payload, not an error.
pub fn from_input(raw: &str) -> Result<Value, BridgeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    parse(trimmed)
}

fn parse(raw: &str) -> Result<Value, BridgeError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| BridgeError::MalformedPayload(format!("payload is not valid JSON: {e}")))?;
    if !value.is_object() {
        return Err(BridgeError::MalformedPayload(
            "payload must be a JSON object".to_string(),
        ));
    }
    Ok(value)
}
