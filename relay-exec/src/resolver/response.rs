use serde_json::Value as JsonValue;

use crate::connector::PartialFailureIndexMap;

/// Extract per-record errors from a `partialFailureError` response body.
///
/// A missing error object or a `code` of 0 means the call had no partial
/// failure. Errors without a locatable record index are logged and skipped.
/// Several errors for the same index are joined with `"; "`.
pub fn partial_failure_index_map(response: &JsonValue) -> PartialFailureIndexMap {
    let mut map = PartialFailureIndexMap::new();

    let Some(error) = response.get("partialFailureError") else {
        return map;
    };
    if error.get("code").and_then(JsonValue::as_i64).unwrap_or(0) == 0 {
        return map;
    }

    let details = error
        .get("details")
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for detail in details {
        let errors = detail
            .get("errors")
            .and_then(JsonValue::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for err in errors {
            let fragment = format!(
                "Code: {}, Error: {}",
                render_code(err.get("errorCode")),
                err.get("message").and_then(JsonValue::as_str).unwrap_or("")
            );
            match record_index(err) {
                Some(idx) => {
                    map.entry(idx)
                        .and_modify(|existing: &mut String| {
                            existing.push_str("; ");
                            existing.push_str(&fragment);
                        })
                        .or_insert(fragment);
                }
                None => tracing::warn!(error = %fragment, "partial failure without record index"),
            }
        }
    }

    map
}

fn record_index(err: &JsonValue) -> Option<usize> {
    err.pointer("/location/fieldPathElements")?
        .as_array()?
        .iter()
        .find_map(|el| el.get("index")?.as_u64())
        .and_then(|i| usize::try_from(i).ok())
}

/// `{"conversionUploadError": "TOO_RECENT"}` renders as `conversionUploadError.TOO_RECENT`.
fn render_code(code: Option<&JsonValue>) -> String {
    match code {
        None | Some(JsonValue::Null) => "UNKNOWN".to_string(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Object(map)) => map
            .iter()
            .map(|(k, v)| match v {
                JsonValue::String(s) => format!("{k}.{s}"),
                other => format!("{k}.{other}"),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(other) => other.to_string(),
    }
}
