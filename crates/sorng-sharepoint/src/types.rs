// ──────────────────────────────────────────────────────────────────────────────
// sorng-sharepoint · types
// ──────────────────────────────────────────────────────────────────────────────
// Type catalogue for the SharePoint integration crate covering:
//  • Credentials & sign-in state
//  • Session (FedAuth cookie + form digest)
//  • Site metadata
//  • Directory listing entries & upload payloads
//  • OData verbose wire envelopes
// ──────────────────────────────────────────────────────────────────────────────

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Credentials ──────────────────────────────────────────────────────────────

/// Username / password pair exchanged at the security token service.
#[derive(Clone, Serialize, Deserialize)]
pub struct SharePointCredentials {
    pub username: String,
    pub password: String,
}

impl SharePointCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn masked_password(&self) -> String {
        if self.password.len() <= 4 {
            return "****".to_string();
        }
        let prefix: String = self.password.chars().take(4).collect();
        format!("{}****", prefix)
    }
}

impl fmt::Debug for SharePointCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharePointCredentials")
            .field("username", &self.username)
            .field("password", &self.masked_password())
            .finish()
    }
}

// ── Sign-in state ────────────────────────────────────────────────────────────

/// Where the two-phase sign-in currently stands.
///
/// `Unauthenticated -> TokenObtained -> SessionEstablished`; any failure
/// drops back to `Unauthenticated`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthStage {
    #[default]
    Unauthenticated,
    /// The STS issued a security token; it has not been traded for cookies yet.
    TokenObtained { security_token: String },
    /// FedAuth / rtFa cookies are held.
    SessionEstablished { cookie: String },
}

impl AuthStage {
    pub fn is_established(&self) -> bool {
        matches!(self, AuthStage::SessionEstablished { .. })
    }

    pub fn cookie(&self) -> Option<&str> {
        match self {
            AuthStage::SessionEstablished { cookie } => Some(cookie),
            _ => None,
        }
    }
}

// ── Session ──────────────────────────────────────────────────────────────────

/// Anti-forgery token required on every state-mutating `_api` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDigest {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl FormDigest {
    /// `timeout_secs` is the server's `FormDigestTimeoutSeconds`; values
    /// beyond chrono's range saturate instead of overflowing.
    pub fn new(value: impl Into<String>, timeout_secs: i64) -> Self {
        let now = Utc::now();
        let expires_at = TimeDelta::try_seconds(timeout_secs)
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(if timeout_secs >= 0 {
                DateTime::<Utc>::MAX_UTC
            } else {
                DateTime::<Utc>::MIN_UTC
            });
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Whether the digest has expired or will within `margin_secs`.
    pub fn is_expired(&self, margin_secs: i64) -> bool {
        match TimeDelta::try_seconds(margin_secs).and_then(|m| self.expires_at.checked_sub_signed(m)) {
            Some(threshold) => Utc::now() >= threshold,
            // A margin reaching past the start of time covers every expiry.
            None => margin_secs > 0,
        }
    }
}

/// Snapshot of the client's session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// `Cookie` header value (`FedAuth=…; rtFa=…`).
    pub cookie: String,
    pub digest: Option<FormDigest>,
    pub established_at: DateTime<Utc>,
}

impl Session {
    pub fn new(cookie: impl Into<String>) -> Self {
        Self {
            cookie: cookie.into(),
            digest: None,
            established_at: Utc::now(),
        }
    }

    pub fn digest_value(&self) -> Option<&str> {
        self.digest.as_ref().map(|d| d.value.as_str())
    }

    pub fn digest_expiry(&self) -> Option<DateTime<Utc>> {
        self.digest.as_ref().map(|d| d.expires_at)
    }
}

// ── Conflict policy ──────────────────────────────────────────────────────────

/// What a create does when the target name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Surface a `Conflict` error.
    Fail,
    /// Replace the existing item.
    Overwrite,
}

impl ConflictPolicy {
    pub fn overwrite(self) -> bool {
        self == ConflictPolicy::Overwrite
    }
}

// ── Site metadata ────────────────────────────────────────────────────────────

/// Immutable snapshot of `/_api/web`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    pub title: Option<String>,
    pub description: String,
    pub created: DateTime<Utc>,
    pub server_relative_url: String,
    pub last_modified: DateTime<Utc>,
    pub url: Option<String>,
}

// ── Directory listing ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

/// One immediate child of a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: EntryKind,
    pub server_relative_url: String,
    /// Byte length (files only).
    pub size: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
}

impl DirectoryEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

// ── Upload payload ───────────────────────────────────────────────────────────

/// Body of a file upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Binary(Vec<u8>),
}

impl FileContent {
    pub fn len(&self) -> usize {
        match self {
            FileContent::Text(s) => s.len(),
            FileContent::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FileContent::Text(_) => "text/plain; charset=utf-8",
            FileContent::Binary(_) => "application/octet-stream",
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            FileContent::Text(s) => s.into_bytes(),
            FileContent::Binary(b) => b,
        }
    }
}

impl From<String> for FileContent {
    fn from(s: String) -> Self {
        FileContent::Text(s)
    }
}

impl From<&str> for FileContent {
    fn from(s: &str) -> Self {
        FileContent::Text(s.to_string())
    }
}

impl From<Vec<u8>> for FileContent {
    fn from(b: Vec<u8>) -> Self {
        FileContent::Binary(b)
    }
}

impl From<&[u8]> for FileContent {
    fn from(b: &[u8]) -> Self {
        FileContent::Binary(b.to_vec())
    }
}

// ── OData verbose envelopes ──────────────────────────────────────────────────

/// `{ "d": … }` wrapper used by `Accept: application/json;odata=verbose`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ODataVerbose<T> {
    pub d: T,
}

/// `{ "results": [ … ] }` collection body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ODataResults<T> {
    pub results: Vec<T>,
}

/// `/_api/web` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebInfo {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub created: String,
    pub server_relative_url: String,
    pub last_item_modified_date: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// `/_api/contextinfo` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextInfoEnvelope {
    #[serde(rename = "GetContextWebInformation")]
    pub info: ContextWebInformation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContextWebInformation {
    pub form_digest_value: String,
    pub form_digest_timeout_seconds: i64,
    #[serde(default)]
    pub web_full_url: Option<String>,
    #[serde(default)]
    pub site_full_url: Option<String>,
}

/// `SP.Folder` as returned by `…/Folders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpFolder {
    pub name: String,
    pub server_relative_url: String,
    #[serde(default)]
    pub time_last_modified: Option<String>,
}

/// `SP.File` as returned by `…/Files`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpFile {
    pub name: String,
    pub server_relative_url: String,
    /// `Edm.Int64`, serialised as a string in verbose mode.
    #[serde(default)]
    pub length: Option<serde_json::Value>,
    #[serde(default)]
    pub time_last_modified: Option<String>,
}

impl From<SpFolder> for DirectoryEntry {
    fn from(f: SpFolder) -> Self {
        Self {
            modified: f.time_last_modified.as_deref().and_then(parse_sp_datetime),
            name: f.name,
            kind: EntryKind::Folder,
            server_relative_url: f.server_relative_url,
            size: None,
        }
    }
}

impl From<SpFile> for DirectoryEntry {
    fn from(f: SpFile) -> Self {
        let size = match f.length {
            Some(serde_json::Value::String(ref s)) => s.parse().ok(),
            Some(serde_json::Value::Number(ref n)) => n.as_u64(),
            _ => None,
        };
        Self {
            modified: f.time_last_modified.as_deref().and_then(parse_sp_datetime),
            name: f.name,
            kind: EntryKind::File,
            server_relative_url: f.server_relative_url,
            size,
        }
    }
}

/// Parse a SharePoint timestamp. Accepts RFC 3339 and the zone-less
/// `2019-03-12T10:21:24.537` form (interpreted as UTC).
pub fn parse_sp_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
