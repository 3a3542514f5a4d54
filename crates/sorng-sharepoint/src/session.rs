// ──────────────────────────────────────────────────────────────────────────────
// sorng-sharepoint · session
// ──────────────────────────────────────────────────────────────────────────────
// Owns the sign-in state machine and the form digest:
//  • Unauthenticated → TokenObtained → SessionEstablished
//  • `_api/contextinfo` digest retrieval with a tracked expiry
//  • Proactive digest refresh ahead of writes
// ──────────────────────────────────────────────────────────────────────────────

use crate::auth;
use crate::client::SharePointApiClient;
use crate::config::SharePointConfig;
use crate::error::{SharePointError, SharePointResult};
use crate::types::{AuthStage, ContextInfoEnvelope, FormDigest, Session, SharePointCredentials};
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderValue};

/// Per-client authentication state.
#[derive(Debug, Default)]
pub struct SessionManager {
    stage: AuthStage,
    session: Option<Session>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> &AuthStage {
        &self.stage
    }

    pub fn is_authenticated(&self) -> bool {
        self.stage.is_established()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The `Cookie` header value, or an `Authentication` error before sign-in.
    pub fn cookie(&self) -> SharePointResult<&str> {
        self.stage.cookie().ok_or_else(SharePointError::not_authenticated)
    }

    /// Run both sign-in legs. Any failure leaves the manager unauthenticated.
    pub async fn authenticate(
        &mut self,
        api: &SharePointApiClient,
        config: &SharePointConfig,
        credentials: &SharePointCredentials,
    ) -> SharePointResult<()> {
        self.sign_out();
        let origin = config.origin()?;

        let token = auth::request_security_token(api, config, credentials).await?;
        self.stage = AuthStage::TokenObtained {
            security_token: token.clone(),
        };
        debug!("Security token obtained for {}", credentials.username);

        match auth::exchange_token_for_cookie(api, &origin, token).await {
            Ok(cookie) => {
                self.stage = AuthStage::SessionEstablished {
                    cookie: cookie.clone(),
                };
                self.session = Some(Session::new(cookie));
                info!("Authenticated to {} as {}", api.site_url(), credentials.username);
                Ok(())
            }
            Err(e) => {
                self.sign_out();
                Err(e)
            }
        }
    }

    /// Fetch a fresh form digest and store it with its expiry.
    pub async fn refresh_digest(&mut self, api: &SharePointApiClient) -> SharePointResult<FormDigest> {
        let cookie = self.cookie()?.to_string();
        let envelope: ContextInfoEnvelope = api.post_json("contextinfo", &cookie, None, &[]).await?;
        let info = envelope.info;
        let digest = FormDigest::new(info.form_digest_value, info.form_digest_timeout_seconds);
        debug!(
            "Form digest refreshed, valid for {}s",
            info.form_digest_timeout_seconds
        );
        if let Some(session) = self.session.as_mut() {
            session.digest = Some(digest.clone());
        }
        Ok(digest)
    }

    /// A digest usable for the next write.
    ///
    /// A stored digest is reused until it is within the refresh margin of its
    /// expiry. With auto-refresh off, a missing or expired digest is an error.
    pub async fn ensure_digest(
        &mut self,
        api: &SharePointApiClient,
        config: &SharePointConfig,
    ) -> SharePointResult<String> {
        let session = self.session.as_ref().ok_or_else(SharePointError::not_authenticated)?;

        if config.auto_refresh_digest {
            if let Some(d) = session.digest.as_ref() {
                if !d.is_expired(config.digest_refresh_margin_secs) {
                    return Ok(d.value.clone());
                }
                debug!("Form digest near expiry, refreshing");
            }
            return Ok(self.refresh_digest(api).await?.value);
        }

        match session.digest.as_ref() {
            Some(d) if !d.is_expired(0) => Ok(d.value.clone()),
            Some(_) => {
                warn!("Form digest expired and auto refresh is disabled");
                Err(SharePointError::auth(
                    "Form digest expired: call get_form_digest_value() first",
                ))
            }
            None => Err(SharePointError::auth(
                "No form digest: call get_form_digest_value() first",
            )),
        }
    }

    /// Headers replayed on every call: `Cookie`, `Accept` and, once fetched,
    /// `X-RequestDigest`.
    pub fn request_headers(&self) -> SharePointResult<HeaderMap> {
        let mut headers = SharePointApiClient::session_headers(self.cookie()?)?;
        if let Some(value) = self.session.as_ref().and_then(Session::digest_value) {
            let value = HeaderValue::from_str(value)
                .map_err(|e| SharePointError::auth(format!("Digest is not a valid header: {}", e)))?;
            headers.insert("X-RequestDigest", value);
        }
        Ok(headers)
    }

    /// Forget cookies and digest.
    pub fn sign_out(&mut self) {
        self.stage = AuthStage::Unauthenticated;
        self.session = None;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
