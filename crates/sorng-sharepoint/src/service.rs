// ──────────────────────────────────────────────────────────────────────────────
// sorng-sharepoint · service
// ──────────────────────────────────────────────────────────────────────────────
// `SharePointClient` is the public entry point. It owns the configuration, the
// HTTP client, the session (behind an async mutex) and the cached site record.
// Each method is a single request/response round-trip apart from the digest
// refresh that may precede a write.
// ──────────────────────────────────────────────────────────────────────────────

use crate::client::SharePointApiClient;
use crate::config::SharePointConfig;
use crate::error::{SharePointError, SharePointResult};
use crate::session::SessionManager;
use crate::types::*;
use crate::{files, folders, site};
use log::info;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Shared handle for hosts that hand the client to several tasks.
pub type SharePointClientState = Arc<SharePointClient>;

/// Client for one SharePoint site.
#[derive(Debug)]
pub struct SharePointClient {
    config: SharePointConfig,
    api: SharePointApiClient,
    session: Mutex<SessionManager>,
    site: RwLock<Option<Site>>,
}

impl SharePointClient {
    /// Validate `config` and build an unauthenticated client.
    pub fn new(config: SharePointConfig) -> SharePointResult<Self> {
        let api = SharePointApiClient::new(&config)?;
        info!("SharePoint client created for {}", api.site_url());
        Ok(Self {
            config,
            api,
            session: Mutex::new(SessionManager::new()),
            site: RwLock::new(None),
        })
    }

    /// Shorthand for `SharePointClient::new(SharePointConfig::new(url))`.
    pub fn with_url(url: impl Into<String>) -> SharePointResult<Self> {
        Self::new(SharePointConfig::new(url))
    }

    // ━━━━━━━━━━━━━━  Accessors  ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// The configured site URL, without trailing slash.
    pub fn url(&self) -> &str {
        self.api.site_url()
    }

    pub fn config(&self) -> &SharePointConfig {
        &self.config
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.lock().await.is_authenticated()
    }

    /// Snapshot of the current session, if signed in.
    pub async fn session(&self) -> Option<Session> {
        self.session.lock().await.session().cloned()
    }

    /// Last site record fetched by `get_web_endpoint`.
    pub async fn site(&self) -> Option<Site> {
        self.site.read().await.clone()
    }

    /// `Cookie`, `Accept` and (once fetched) `X-RequestDigest`.
    pub async fn request_headers(&self) -> SharePointResult<HeaderMap> {
        self.session.lock().await.request_headers()
    }

    // ━━━━━━━━━━━━━━  Session  ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Sign in with a username and password. Replaces any previous session
    /// and drops the cached site record.
    pub async fn authenticate(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> SharePointResult<Session> {
        let credentials = SharePointCredentials::new(username, password);
        let mut session = self.session.lock().await;
        *self.site.write().await = None;
        session
            .authenticate(&self.api, &self.config, &credentials)
            .await?;
        session.session().cloned().ok_or_else(SharePointError::not_authenticated)
    }

    /// Fetch a fresh form digest and store it for later writes.
    pub async fn get_form_digest_value(&self) -> SharePointResult<String> {
        let mut session = self.session.lock().await;
        Ok(session.refresh_digest(&self.api).await?.value)
    }

    /// Forget cookies, digest and the cached site record.
    pub async fn sign_out(&self) {
        let mut session = self.session.lock().await;
        session.sign_out();
        *self.site.write().await = None;
        drop(session);
        info!("Signed out of {}", self.url());
    }

    // ━━━━━━━━━━━━━━  Site  ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Fetch `/_api/web` and cache the result.
    ///
    /// Holds the session lock until the cache is written. Lock order is
    /// always session, then site.
    pub async fn get_web_endpoint(&self) -> SharePointResult<Site> {
        let session = self.session.lock().await;
        let cookie = session.cookie().ok();
        let resolved = site::get_web_endpoint(&self.api, cookie).await?;
        *self.site.write().await = Some(resolved.clone());
        drop(session);
        Ok(resolved)
    }

    // ━━━━━━━━━━━━━━  Content  ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Immediate children of `path`, folders first.
    pub async fn get_contents(&self, path: &str) -> SharePointResult<Vec<DirectoryEntry>> {
        let cookie = self.cookie().await?;
        folders::get_contents(&self.api, &cookie, path).await
    }

    pub async fn create_folder(&self, path: &str, name: &str) -> SharePointResult<DirectoryEntry> {
        let mut session = self.session.lock().await;
        let digest = session.ensure_digest(&self.api, &self.config).await?;
        let cookie = session.cookie()?;
        folders::create_folder(
            &self.api,
            cookie,
            &digest,
            path,
            name,
            self.config.folder_conflict,
        )
        .await
    }

    /// Upload text or binary content as `path/name`.
    pub async fn create_file(
        &self,
        path: &str,
        name: &str,
        content: impl Into<FileContent>,
    ) -> SharePointResult<DirectoryEntry> {
        let content = content.into();
        let mut session = self.session.lock().await;
        let digest = session.ensure_digest(&self.api, &self.config).await?;
        let cookie = session.cookie()?;
        files::create_file(
            &self.api,
            cookie,
            &digest,
            path,
            name,
            content,
            self.config.file_conflict,
        )
        .await
    }

    pub async fn download_file(&self, path: &str, name: &str) -> SharePointResult<Vec<u8>> {
        let cookie = self.cookie().await?;
        files::download_file(&self.api, &cookie, path, name).await
    }

    pub async fn delete_file(&self, path: &str, name: &str) -> SharePointResult<()> {
        let mut session = self.session.lock().await;
        let digest = session.ensure_digest(&self.api, &self.config).await?;
        let cookie = session.cookie()?;
        files::delete_file(&self.api, cookie, &digest, path, name).await
    }

    /// Delete a folder and everything under it.
    pub async fn delete_folder(&self, path: &str, name: &str) -> SharePointResult<()> {
        let mut session = self.session.lock().await;
        let digest = session.ensure_digest(&self.api, &self.config).await?;
        let cookie = session.cookie()?;
        folders::delete_folder(&self.api, cookie, &digest, path, name).await
    }

    // ━━━━━━━━━━━━━━  Internal  ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    async fn cookie(&self) -> SharePointResult<String> {
        self.session.lock().await.cookie().map(String::from)
    }
}
