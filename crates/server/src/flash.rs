use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies};
use tracing::warn;

pub const FLASH_COOKIE_NAME: &str = "_flash";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}

pub type RedirectResponse = (StatusCode, HeaderMap);

/// Reads the pending flash message, if any, and clears it so it shows once.
pub fn take_flash(cookies: &Cookies) -> Option<Flash> {
    let raw = cookies.get(FLASH_COOKIE_NAME)?;
    let flash = serde_json::from_str(raw.value()).ok();
    cookies.remove(flash_cookie(String::new()));
    flash
}

/// Stores `flash` and redirects the browser back to the listing.
pub fn redirect_with_flash(cookies: &Cookies, flash: Flash) -> RedirectResponse {
    match serde_json::to_string(&flash) {
        Ok(value) => cookies.add(flash_cookie(value)),
        Err(error) => warn!(%error, "dropping unserializable flash message"),
    }

    let mut headers = HeaderMap::new();
    headers.insert(header::LOCATION, HeaderValue::from_static("/"));
    (StatusCode::SEE_OTHER, headers)
}

fn flash_cookie(value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(FLASH_COOKIE_NAME, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie
}
