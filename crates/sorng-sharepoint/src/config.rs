//! Connection configuration for a SharePoint site.
//!
//! Only `url` is required; everything else has a default that matches
//! SharePoint Online.

use crate::error::{SharePointError, SharePointResult};
use crate::types::ConflictPolicy;
use serde::{Deserialize, Serialize};
use url::Url;

/// Microsoft's extended security token service for SharePoint Online.
pub const DEFAULT_STS_URL: &str = "https://login.microsoftonline.com/extSTS.srf";

/// Environment variable holding the site URL.
pub const ENV_URL: &str = "SHAREPOINT_URL";
/// Optional override for the security token service.
pub const ENV_STS_URL: &str = "SHAREPOINT_STS_URL";

/// Upper bound for `digest_refresh_margin_secs`; digests live far less than a day.
pub const MAX_DIGEST_REFRESH_MARGIN_SECS: i64 = 86_400;

/// Configuration for one SharePoint site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SharePointConfig {
    /// Site URL, e.g. `https://contoso.sharepoint.com/sites/team`.
    pub url: String,
    /// Security token service endpoint used for the SAML exchange.
    pub sts_url: String,
    /// Timeout in seconds for every HTTP call.  Default: 30.
    pub timeout_secs: u64,
    /// Whether to verify TLS certificates.
    pub verify_tls: bool,
    pub user_agent: String,
    /// Refresh the form digest before writes when it is missing or stale.
    pub auto_refresh_digest: bool,
    /// Seconds before the server-given expiry at which a digest counts as stale.
    pub digest_refresh_margin_secs: i64,
    /// Behaviour of `create_folder` on a name collision.
    pub folder_conflict: ConflictPolicy,
    /// Behaviour of `create_file` on a name collision.
    pub file_conflict: ConflictPolicy,
}

impl Default for SharePointConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            sts_url: DEFAULT_STS_URL.into(),
            timeout_secs: 30,
            verify_tls: true,
            user_agent: concat!("sorng-sharepoint/", env!("CARGO_PKG_VERSION")).into(),
            auto_refresh_digest: true,
            digest_refresh_margin_secs: 60,
            folder_conflict: ConflictPolicy::Fail,
            file_conflict: ConflictPolicy::Overwrite,
        }
    }
}

impl SharePointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Build from `SHAREPOINT_URL` (and optionally `SHAREPOINT_STS_URL`).
    /// Returns `None` when the site URL is not set.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var(ENV_URL).ok().filter(|v| !v.trim().is_empty())?;
        let mut config = Self::new(url);
        if let Some(sts) = std::env::var(ENV_STS_URL).ok().filter(|v| !v.trim().is_empty()) {
            config.sts_url = sts;
        }
        Some(config)
    }

    /// Check the configuration and return the parsed site URL.
    pub fn validate(&self) -> SharePointResult<Url> {
        if self.url.trim().is_empty() {
            return Err(SharePointError::invalid_config("Site URL is empty"));
        }
        let site = Url::parse(self.url.trim().trim_end_matches('/'))?;
        if !matches!(site.scheme(), "http" | "https") || site.host_str().is_none() {
            return Err(SharePointError::invalid_config(format!(
                "Site URL must be an absolute http(s) URL: {}",
                self.url
            )));
        }
        let sts = Url::parse(&self.sts_url)?;
        if !matches!(sts.scheme(), "http" | "https") {
            return Err(SharePointError::invalid_config(format!(
                "STS URL must be an absolute http(s) URL: {}",
                self.sts_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(SharePointError::invalid_config("timeout_secs must be > 0"));
        }
        if !(0..=MAX_DIGEST_REFRESH_MARGIN_SECS).contains(&self.digest_refresh_margin_secs) {
            return Err(SharePointError::invalid_config(format!(
                "digest_refresh_margin_secs must be between 0 and {}",
                MAX_DIGEST_REFRESH_MARGIN_SECS
            )));
        }
        Ok(site)
    }

    /// Site URL without a trailing slash.
    pub fn site_url(&self) -> String {
        self.url.trim().trim_end_matches('/').to_string()
    }

    /// `scheme://host[:port]` of the site; the sign-in endpoint lives here.
    pub fn origin(&self) -> SharePointResult<String> {
        let site = self.validate()?;
        Ok(site.origin().ascii_serialization())
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
