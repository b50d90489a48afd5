//! Output formats.
//!
//! Each handler resolves the caller through [`IdentityService`] and only
//! decides how to present the result.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::http::request::Peer;
use crate::http::server::AppState;
use crate::http::templates::{RenderError, CLEAN_TEMPLATE, HTML_TEMPLATE, XML_TEMPLATE};
use crate::identity::client::client_address;
use crate::identity::IdentityRecord;
use crate::security::headers::apply_page_security;

/// Headers never echoed back by `/headers`. `host` and `x-request-id` are
/// transport or server-added and not part of what the client sent as headers.
const HIDDEN_HEADERS: [&str; 6] = [
    "x-forwarded-for",
    "x-real-ip",
    "cookie",
    "authorization",
    "host",
    "x-request-id",
];

/// Flat view shared by the JSON and YAML endpoints.
#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    pub ip_address: &'a str,
    pub location: &'a str,
    pub hostname: &'a str,
    pub isp: &'a str,
    pub city: &'a str,
    pub country: &'a str,
    pub country_code: &'a str,
}

impl<'a> From<&'a IdentityRecord> for Summary<'a> {
    fn from(record: &'a IdentityRecord) -> Self {
        Self {
            ip_address: &record.address,
            location: &record.geo,
            hostname: &record.hostname,
            isp: &record.isp,
            city: &record.city,
            country: &record.country,
            country_code: &record.country_code,
        }
    }
}

fn is_command_line_client(headers: &HeaderMap) -> bool {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ua| ua.contains("curl") || ua.contains("HTTPie"))
}

/// `GET /`: HTML for browsers, bare address for curl and HTTPie.
pub async fn index(State(state): State<AppState>, Peer(peer): Peer, headers: HeaderMap) -> Response {
    let mut response = if is_command_line_client(&headers) {
        text_response(&headers, &peer)
    } else {
        let record = state.identity.resolve(&headers, &peer).await;
        if state.templates.contains(HTML_TEMPLATE) {
            match state.templates.render(HTML_TEMPLATE, &record) {
                Ok(page) => Html(page).into_response(),
                Err(e) => e.into_response(),
            }
        } else {
            format!("IP: {}", record.address).into_response()
        }
    };

    apply_page_security(response.headers_mut());
    response
}

/// `/json`
pub async fn json(State(state): State<AppState>, Peer(peer): Peer, headers: HeaderMap) -> Response {
    let record = state.identity.resolve(&headers, &peer).await;
    Json(Summary::from(&record)).into_response()
}

/// `/yaml`
pub async fn yaml(
    State(state): State<AppState>,
    Peer(peer): Peer,
    headers: HeaderMap,
) -> Result<Response, RenderError> {
    let record = state.identity.resolve(&headers, &peer).await;
    let body = serde_yaml::to_string(&Summary::from(&record))?;
    Ok(([(header::CONTENT_TYPE, "text/yaml")], body).into_response())
}

/// `/xml`
pub async fn xml(
    State(state): State<AppState>,
    Peer(peer): Peer,
    headers: HeaderMap,
) -> Result<Response, RenderError> {
    let record = state.identity.resolve(&headers, &peer).await;
    let body = state.templates.render(XML_TEMPLATE, &record)?;
    Ok(([(header::CONTENT_TYPE, "application/xml")], body).into_response())
}

/// `/clean`
pub async fn clean(
    State(state): State<AppState>,
    Peer(peer): Peer,
    headers: HeaderMap,
) -> Result<Response, RenderError> {
    let record = state.identity.resolve(&headers, &peer).await;
    let body = state.templates.render(CLEAN_TEMPLATE, &record)?;
    Ok((
        [(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"))],
        body,
    )
        .into_response())
}

/// `/text`: just the address; skips the geo and DNS work.
pub async fn text(Peer(peer): Peer, headers: HeaderMap) -> Response {
    text_response(&headers, &peer)
}

fn text_response(headers: &HeaderMap, peer: &str) -> Response {
    format!("{}\n", client_address(headers, peer)).into_response()
}

/// `/headers`: request headers minus the ones that reveal proxies or credentials.
pub async fn headers(headers: HeaderMap) -> Response {
    let mut body = String::new();
    for (name, value) in &headers {
        if HIDDEN_HEADERS.contains(&name.as_str()) {
            continue;
        }
        body.push_str(&canonical_header_name(name.as_str()));
        body.push_str(": ");
        body.push_str(&String::from_utf8_lossy(value.as_bytes()));
        body.push('\n');
    }

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

/// `user-agent` → `User-Agent`.
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
