//! Error types for the SharePoint REST integration.
//!
//! All public API surfaces in this crate return `SharePointResult<T>`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Convenience alias.
pub type SharePointResult<T> = Result<T, SharePointError>;

/// SharePoint error codes that mean "the file or folder does not exist".
const NOT_FOUND_CODES: &[&str] = &["-2147024894", "-2130575338"];

/// SharePoint error codes raised on a name collision.
const CONFLICT_CODES: &[&str] = &["-2130575257", "-2147024713"];

/// Error kinds surfaced by the SharePoint client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SharePointErrorKind {
    /// Bad credentials, STS fault, or a missing / expired session or digest.
    Authentication,
    /// The `_api/web` metadata fetch failed.
    SiteResolution,
    /// Path absent on list, delete or download.
    NotFound,
    /// Duplicate create.
    Conflict,
    /// Network failure or any non-2xx not otherwise classified.
    Transport,
    /// Malformed URL or unusable configuration.
    InvalidConfig,
    /// JSON / XML body could not be decoded.
    Parse,
}

impl fmt::Display for SharePointErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Structured error returned by every public function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharePointError {
    pub kind: SharePointErrorKind,
    pub message: String,
    /// HTTP status, when the error came from a response.
    pub status: Option<u16>,
    /// SharePoint error code, e.g. `-2147024894, System.IO.FileNotFoundException`.
    pub sp_error_code: Option<String>,
}

impl fmt::Display for SharePointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)?;
        if let Some(status) = self.status {
            write!(f, " (HTTP {})", status)?;
        }
        if let Some(ref code) = self.sp_error_code {
            write!(f, " (sharepoint: {})", code)?;
        }
        Ok(())
    }
}

impl std::error::Error for SharePointError {}

impl From<SharePointError> for String {
    fn from(e: SharePointError) -> String {
        e.to_string()
    }
}

impl SharePointError {
    /// Create from a kind + message.
    pub fn new(kind: SharePointErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            status: None,
            sp_error_code: None,
        }
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(SharePointErrorKind::Authentication, msg)
    }

    pub fn site_resolution(msg: impl Into<String>) -> Self {
        Self::new(SharePointErrorKind::SiteResolution, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(SharePointErrorKind::NotFound, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(SharePointErrorKind::Conflict, msg)
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::new(SharePointErrorKind::Transport, msg)
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(SharePointErrorKind::InvalidConfig, msg)
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(SharePointErrorKind::Parse, msg)
    }

    /// Not authenticated yet (no FedAuth cookie).
    pub fn not_authenticated() -> Self {
        Self::auth("Not authenticated: call authenticate() first")
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == SharePointErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == SharePointErrorKind::Conflict
    }

    /// Re-tag an error as a site-resolution failure, keeping status and code.
    pub fn into_site_resolution(mut self) -> Self {
        self.kind = SharePointErrorKind::SiteResolution;
        self
    }

    /// Build an error from a non-success `_api` response.
    ///
    /// The kind is chosen from the HTTP status first, then from the
    /// SharePoint error code / message in the body, since SharePoint often
    /// reports a missing path or a name collision as a plain 500.
    pub fn from_rest_response(status: u16, body: &str) -> Self {
        let (sp_code, sp_message) = Self::parse_rest_error_body(body);

        let kind = match status {
            401 | 403 => SharePointErrorKind::Authentication,
            404 => SharePointErrorKind::NotFound,
            409 => SharePointErrorKind::Conflict,
            _ => Self::classify_body(sp_code.as_deref(), sp_message.as_deref()),
        };

        let message = sp_message.unwrap_or_else(|| {
            let snippet: String = body.chars().take(200).collect();
            if snippet.is_empty() {
                format!("SharePoint REST error (HTTP {})", status)
            } else {
                format!("SharePoint REST error (HTTP {}): {}", status, snippet)
            }
        });

        Self {
            kind,
            message,
            status: Some(status),
            sp_error_code: sp_code,
        }
    }

    fn classify_body(code: Option<&str>, message: Option<&str>) -> SharePointErrorKind {
        let code_matches = |table: &[&str]| {
            code.map(|c| table.iter().any(|t| c.starts_with(t)))
                .unwrap_or(false)
        };
        let lowered = message.map(|m| m.to_ascii_lowercase()).unwrap_or_default();

        if code_matches(NOT_FOUND_CODES)
            || lowered.contains("does not exist")
            || lowered.contains("file not found")
        {
            SharePointErrorKind::NotFound
        } else if code_matches(CONFLICT_CODES) || lowered.contains("already exists") {
            SharePointErrorKind::Conflict
        } else {
            SharePointErrorKind::Transport
        }
    }

    /// Extract `{ "error": { "code": "...", "message": { "value": "..." } } }`
    /// (verbose) or the `odata.error` variant (minimal / nometadata).
    fn parse_rest_error_body(body: &str) -> (Option<String>, Option<String>) {
        let Ok(v) = serde_json::from_str::<serde_json::Value>(body) else {
            return (None, None);
        };
        let err = if v.get("error").is_some() {
            &v["error"]
        } else {
            &v["odata.error"]
        };
        let code = err["code"].as_str().map(String::from);
        let msg = err["message"]["value"]
            .as_str()
            .or_else(|| err["message"].as_str())
            .map(String::from);
        (code, msg)
    }
}

impl From<reqwest::Error> for SharePointError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::transport(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            Self::transport(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            Self::parse(format!("Response decode failed: {}", err))
        } else {
            Self::transport(format!("HTTP error: {}", err))
        }
    }
}

impl From<serde_json::Error> for SharePointError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(format!("JSON error: {}", err))
    }
}

impl From<url::ParseError> for SharePointError {
    fn from(err: url::ParseError) -> Self {
        Self::invalid_config(format!("URL parse error: {}", err))
    }
}

impl From<quick_xml::Error> for SharePointError {
    fn from(err: quick_xml::Error) -> Self {
        Self::parse(format!("XML error: {}", err))
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
