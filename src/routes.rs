//! Path-template helpers shared by routing and the request layer.

use urlencoding::{decode, encode};

/// Encode a collection path for use as a single route parameter.
///
/// The leading slash is dropped before encoding so `/pets` becomes `pets`.
pub fn encode_collection_path(path: &str) -> String {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    encode(trimmed).into_owned()
}

/// Decode a route parameter back into a collection path, restoring the
/// leading slash.
pub fn decode_collection_path(param: &str) -> Option<String> {
    if param.is_empty() {
        return None;
    }
    let decoded = decode(param).ok()?.into_owned();
    if decoded.starts_with('/') {
        Some(decoded)
    } else {
        Some(format!("/{decoded}"))
    }
}

/// Substitute the first `{param}` segment of a resource path template with a
/// percent-encoded id.
pub fn fill_template(template: &str, id: &str) -> String {
    let Some(start) = template.find('{') else {
        return template.to_string();
    };
    let Some(len) = template[start..].find('}') else {
        return template.to_string();
    };
    let mut filled = String::with_capacity(template.len() + id.len());
    filled.push_str(&template[..start]);
    filled.push_str(&encode(id));
    filled.push_str(&template[start + len + 1..]);
    filled
}
