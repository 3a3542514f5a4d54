// ──────────────────────────────────────────────────────────────────────────────
// sorng-sharepoint · client
// ──────────────────────────────────────────────────────────────────────────────
// Low-level HTTP client for the SharePoint REST (`_api`) surface covering:
//  • Cookie + `Accept: application/json;odata=verbose` injection
//  • `X-RequestDigest` on state-mutating calls
//  • OData verbose envelope unwrapping
//  • Status → SharePointError classification
//  • Raw POSTs for the sign-in handshake (no redirect following)
//
// No retries: every failure is returned to the caller as-is.
// ──────────────────────────────────────────────────────────────────────────────

use crate::config::SharePointConfig;
use crate::error::{SharePointError, SharePointResult};
use crate::types::ODataVerbose;
use log::debug;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{redirect, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// `Accept` / `Content-Type` for OData verbose JSON.
pub const ODATA_VERBOSE: &str = "application/json;odata=verbose";

/// Low-level SharePoint HTTP client.
#[derive(Debug, Clone)]
pub struct SharePointApiClient {
    http: Client,
    /// Site URL without trailing slash.
    site_url: String,
}

impl SharePointApiClient {
    pub fn new(config: &SharePointConfig) -> SharePointResult<Self> {
        config.validate()?;

        // Redirects are not followed: the sign-in endpoint sets its cookies on
        // a 302, and an expired session shows up as a redirect to the login page.
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .redirect(redirect::Policy::none())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                SharePointError::transport(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            site_url: config.site_url(),
        })
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    /// Full URL for an `_api` path, e.g. `web` → `{site}/_api/web`.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/_api/{}", self.site_url, path.trim_start_matches('/'))
    }

    // ── Request building ─────────────────────────────────────────────────

    fn request(&self, method: Method, path: &str, cookie: &str) -> RequestBuilder {
        self.http
            .request(method, self.api_url(path))
            .header(header::COOKIE, cookie)
            .header(header::ACCEPT, ODATA_VERBOSE)
    }

    fn with_digest(builder: RequestBuilder, digest: Option<&str>) -> RequestBuilder {
        match digest {
            Some(d) => builder.header("X-RequestDigest", d),
            None => builder,
        }
    }

    /// The headers replayed on every authenticated call.
    pub fn session_headers(cookie: &str) -> SharePointResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let cookie = HeaderValue::from_str(cookie)
            .map_err(|e| SharePointError::auth(format!("Cookie is not a valid header: {}", e)))?;
        headers.insert(header::COOKIE, cookie);
        headers.insert(header::ACCEPT, HeaderValue::from_static(ODATA_VERBOSE));
        Ok(headers)
    }

    // ── REST methods ─────────────────────────────────────────────────────

    /// GET returning the unwrapped `d` payload.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        cookie: &str,
        query: &[(String, String)],
    ) -> SharePointResult<T> {
        let req = self.request(Method::GET, path, cookie).query(query);
        let resp = self.send(req).await?;
        parse_verbose(resp).await
    }

    /// GET raw bytes (`…/$value`).
    pub async fn get_bytes(
        &self,
        path: &str,
        cookie: &str,
        query: &[(String, String)],
    ) -> SharePointResult<Vec<u8>> {
        let req = self.request(Method::GET, path, cookie).query(query);
        let resp = self.send(req).await?;
        let resp = check_status(resp).await?;
        let bytes = resp.bytes().await?;
        debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }

    /// POST with an empty body returning the unwrapped `d` payload.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        cookie: &str,
        digest: Option<&str>,
        query: &[(String, String)],
    ) -> SharePointResult<T> {
        let req = Self::with_digest(self.request(Method::POST, path, cookie), digest)
            .query(query)
            .header(header::CONTENT_TYPE, ODATA_VERBOSE)
            .body("");
        let resp = self.send(req).await?;
        parse_verbose(resp).await
    }

    /// POST a raw payload (file upload) returning the unwrapped `d` payload.
    pub async fn post_bytes<T: DeserializeOwned>(
        &self,
        path: &str,
        cookie: &str,
        digest: Option<&str>,
        query: &[(String, String)],
        data: Vec<u8>,
        content_type: &str,
    ) -> SharePointResult<T> {
        debug!("POST (bytes) {} ({} bytes)", path, data.len());
        let req = Self::with_digest(self.request(Method::POST, path, cookie), digest)
            .query(query)
            .header(header::CONTENT_TYPE, content_type)
            .body(data);
        let resp = self.send(req).await?;
        parse_verbose(resp).await
    }

    /// POST tunnelling another verb via `X-HTTP-Method` (e.g. `DELETE`).
    /// `IF-MATCH: *` skips the etag check.
    pub async fn post_method_override(
        &self,
        path: &str,
        cookie: &str,
        digest: Option<&str>,
        query: &[(String, String)],
        verb: &str,
    ) -> SharePointResult<()> {
        let req = Self::with_digest(self.request(Method::POST, path, cookie), digest)
            .query(query)
            .header("X-HTTP-Method", verb)
            .header(header::IF_MATCH, "*")
            .body("");
        let resp = self.send(req).await?;
        check_status(resp).await.map(|_| ())
    }

    // ── Sign-in transport ────────────────────────────────────────────────

    /// POST a SOAP envelope to the security token service. Returns the
    /// status and the body; faults arrive as 500 with a SOAP body, so the
    /// caller interprets both.
    pub async fn post_soap(&self, url: &str, envelope: String) -> SharePointResult<(u16, String)> {
        debug!("POST (soap) {}", url);
        let resp = self
            .http
            .post(url)
            .header(header::CONTENT_TYPE, "application/soap+xml; charset=utf-8")
            .body(envelope)
            .send()
            .await
            .map_err(|e| SharePointError::auth(format!("Security token service unreachable: {}", e)))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| SharePointError::auth(format!("read STS body: {}", e)))?;
        Ok((status, body))
    }

    /// POST the security token to the sign-in endpoint, returning the raw
    /// response so the caller can harvest `Set-Cookie`.
    pub async fn post_signin(&self, url: &str, token: String) -> SharePointResult<Response> {
        debug!("POST (sign-in) {}", url);
        self.http
            .post(url)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(token)
            .send()
            .await
            .map_err(|e| SharePointError::auth(format!("Sign-in endpoint unreachable: {}", e)))
    }

    // ── Internal ─────────────────────────────────────────────────────────

    async fn send(&self, req: RequestBuilder) -> SharePointResult<Response> {
        let resp = req.send().await?;
        debug!("{} → {}", resp.url(), resp.status());
        Ok(resp)
    }
}

// ── Free-standing helpers ────────────────────────────────────────────────────

/// Map a non-success response to an error, passing successes through.
async fn check_status(resp: Response) -> SharePointResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status.is_redirection() {
        let location = resp
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let mut err = SharePointError::auth(format!(
            "Redirected to {}; session cookie missing or expired",
            if location.is_empty() { "<unknown>" } else { location.as_str() }
        ));
        err.status = Some(status.as_u16());
        return Err(err);
    }
    Err(rest_error(status.as_u16(), resp.text().await))
}

/// Classify a failed `_api` response. An unreadable body still yields the
/// status-based error, with the read failure kept in the message.
fn rest_error<E: std::fmt::Display>(status: u16, body: Result<String, E>) -> SharePointError {
    match body {
        Ok(text) => SharePointError::from_rest_response(status, &text),
        Err(e) => {
            debug!("Failed to read error body for HTTP {}: {}", status, e);
            let mut err = SharePointError::from_rest_response(status, "");
            err.message = format!("{} (response body unreadable: {})", err.message, e);
            err
        }
    }
}

/// Parse a `{ "d": … }` body, mapping failures to `SharePointError`.
async fn parse_verbose<T: DeserializeOwned>(resp: Response) -> SharePointResult<T> {
    let resp = check_status(resp).await?;
    let text = resp.text().await?;
    let envelope: ODataVerbose<T> = serde_json::from_str(&text).map_err(|e| {
        SharePointError::parse(format!(
            "OData parse error: {} – body: {}",
            e,
            text.chars().take(300).collect::<String>()
        ))
    })?;
    Ok(envelope.d)
}

/// Quote a string as an OData literal: `it's` → `'it''s'`.
pub fn odata_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Query pairs binding OData parameter aliases, e.g. `@p='…'`.
pub fn alias_query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(alias, value)| (format!("@{}", alias), odata_literal(value)))
        .collect()
}

/// Join a server-relative folder and a child name with exactly one `/`.
pub fn join_server_relative(parent: &str, name: &str) -> String {
    let parent = parent.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if parent.is_empty() {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Pull `name=value` out of the response's `Set-Cookie` headers.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|raw| raw.split(';').next())
        .map(str::trim)
        .find(|pair| {
            pair.split_once('=')
                .map(|(k, v)| k.trim() == name && !v.is_empty())
                .unwrap_or(false)
        })
        .map(String::from)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
