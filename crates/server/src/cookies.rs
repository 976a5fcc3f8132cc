//! Minimal cookie helpers for the login hand-off and the pending action.

use axum::http::{header, HeaderMap, HeaderValue};

pub const USER_COOKIE: &str = "user_name";
pub const PENDING_ACTION_COOKIE: &str = "pending_action";

/// Browsers cap a cookie at about 4 KiB including its attributes.
pub const MAX_COOKIE_VALUE_BYTES: usize = 3_800;

pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| decode(value))
        .filter(|value| !value.is_empty())
}

/// Builds a `Set-Cookie` value. Returns `None` when the encoded value is too
/// large to be stored by a browser.
pub fn set_cookie(name: &str, value: &str) -> Option<HeaderValue> {
    let encoded = encode(value);
    if encoded.len() > MAX_COOKIE_VALUE_BYTES {
        return None;
    }
    HeaderValue::from_str(&format!(
        "{name}={encoded}; Path=/; HttpOnly; SameSite=Lax"
    ))
    .ok()
}

pub fn clear_cookie(name: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("{name}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax"))
        .unwrap_or_else(|_| HeaderValue::from_static("invalid=; Max-Age=0"))
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn decode(value: &str) -> String {
    url::form_urlencoded::parse(format!("v={value}").as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}
