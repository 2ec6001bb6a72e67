//! Typed decoding of feed payloads with shape-drift degradation.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::DecodeError;

/// Decodes `value` as `T`.
///
/// # Errors
///
/// Returns a `DecodeError` naming `feed` when the payload has the wrong shape.
pub fn decode<T: DeserializeOwned>(feed: &str, value: Value) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|e| DecodeError {
        feed: feed.to_string(),
        message: e.to_string(),
    })
}

/// Decodes `value` as `T`, substituting `empty()` when the shape is wrong.
///
/// Schema drift on the service side must not take the dashboard down, so the
/// failure is logged and swallowed.
pub fn decode_or_else<T: DeserializeOwned>(
    feed: &str,
    value: Value,
    empty: impl FnOnce() -> T,
) -> T {
    match decode(feed, value) {
        Ok(decoded) => decoded,
        Err(err) => {
            warn!(feed, error = %err.message, "unexpected payload shape; treating as empty");
            empty()
        }
    }
}

/// Decodes a list payload item by item.
///
/// A payload that is not an array yields an empty list. Items that fail to
/// decode are dropped and logged by index; the rest are kept in order.
pub fn decode_list<T: DeserializeOwned>(feed: &str, value: Value) -> Vec<T> {
    let Value::Array(items) = value else {
        warn!(feed, "expected a list payload; treating as empty");
        return Vec::new();
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match decode(feed, item) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(feed, index, error = %err.message, "dropping malformed list item");
                None
            }
        })
        .collect()
}
