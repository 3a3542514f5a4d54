//! Claims-based sign-in for SharePoint Online.
//!
//! Two legs:
//!
//! 1. **Security token**: a WS-Trust `RequestSecurityToken` envelope carrying
//!    the username and password is POSTed to the security token service. The
//!    response holds either a `BinarySecurityToken` or a SOAP fault.
//! 2. **Session cookies**: the token is POSTed to
//!    `{origin}/_forms/default.aspx?wa=wsignin1.0`, which answers with
//!    `FedAuth` / `rtFa` cookies. Those become the `Cookie` header replayed on
//!    every REST call.

use crate::client::{extract_cookie, SharePointApiClient};
use crate::config::SharePointConfig;
use crate::error::{SharePointError, SharePointErrorKind, SharePointResult};
use crate::types::SharePointCredentials;
use log::{debug, info, warn};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Sign-in endpoint path, relative to the site origin.
pub const SIGNIN_PATH: &str = "/_forms/default.aspx?wa=wsignin1.0";

/// Primary session cookie.
pub const FEDAUTH_COOKIE: &str = "FedAuth";
/// Refresh cookie issued alongside `FedAuth` by SharePoint Online.
pub const RTFA_COOKIE: &str = "rtFa";

// ═══════════════════════════════════════════════════════════════════════
//  Public API
// ═══════════════════════════════════════════════════════════════════════

/// Build the WS-Trust request for a SAML 1.0 token scoped to `endpoint`.
pub fn build_saml_request(
    credentials: &SharePointCredentials,
    endpoint: &str,
    sts_url: &str,
) -> String {
    format!(
        r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:a="http://www.w3.org/2005/08/addressing" xmlns:u="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd">
  <s:Header>
    <a:Action s:mustUnderstand="1">http://schemas.xmlsoap.org/ws/2005/02/trust/RST/Issue</a:Action>
    <a:ReplyTo><a:Address>http://www.w3.org/2005/08/addressing/anonymous</a:Address></a:ReplyTo>
    <a:To s:mustUnderstand="1">{sts}</a:To>
    <o:Security s:mustUnderstand="1" xmlns:o="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd">
      <o:UsernameToken>
        <o:Username>{username}</o:Username>
        <o:Password>{password}</o:Password>
      </o:UsernameToken>
    </o:Security>
  </s:Header>
  <s:Body>
    <t:RequestSecurityToken xmlns:t="http://schemas.xmlsoap.org/ws/2005/02/trust">
      <wsp:AppliesTo xmlns:wsp="http://schemas.xmlsoap.org/ws/2004/09/policy">
        <a:EndpointReference><a:Address>{endpoint}</a:Address></a:EndpointReference>
      </wsp:AppliesTo>
      <t:KeyType>http://schemas.xmlsoap.org/ws/2005/05/identity/NoProofKey</t:KeyType>
      <t:RequestType>http://schemas.xmlsoap.org/ws/2005/02/trust/Issue</t:RequestType>
      <t:TokenType>urn:oasis:names:tc:SAML:1.0:assertion</t:TokenType>
    </t:RequestSecurityToken>
  </s:Body>
</s:Envelope>"#,
        sts = escape(sts_url),
        username = escape(credentials.username.as_str()),
        password = escape(credentials.password.as_str()),
        endpoint = escape(endpoint),
    )
}

/// Extract the security token from an STS response.
///
/// A SOAP fault becomes an `Authentication` error carrying the most specific
/// text available (`psf:text` beats `S:Text`).
pub fn parse_sts_response(xml: &str) -> SharePointResult<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current = String::new();
    let mut token: Option<String> = None;
    let mut in_fault = false;
    let mut fault_reason: Option<String> = None;
    let mut fault_detail: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                current = local_name(e.local_name().as_ref());
                if current == "Fault" {
                    in_fault = true;
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| SharePointError::parse(format!("STS response: {}", err)))?
                    .trim()
                    .to_string();
                if text.is_empty() {
                    continue;
                }
                match current.as_str() {
                    "BinarySecurityToken" => token = Some(text),
                    "text" if in_fault => fault_detail = Some(text),
                    "Text" if in_fault => fault_reason = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current.clear(),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SharePointError::parse(format!(
                    "STS response is not valid XML at {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    if let Some(token) = token {
        return Ok(token);
    }
    if in_fault {
        let reason = fault_detail
            .or(fault_reason)
            .unwrap_or_else(|| "security token service returned a fault".into());
        return Err(SharePointError::auth(reason));
    }
    Err(SharePointError::auth(
        "Security token service response carried no BinarySecurityToken",
    ))
}

/// Leg 1: obtain a security token for the configured site.
pub async fn request_security_token(
    api: &SharePointApiClient,
    config: &SharePointConfig,
    credentials: &SharePointCredentials,
) -> SharePointResult<String> {
    let endpoint = format!("{}/", config.origin()?);
    debug!(
        "Requesting security token for {} as {:?}",
        endpoint, credentials
    );
    let envelope = build_saml_request(credentials, &endpoint, &config.sts_url);
    let (status, body) = api.post_soap(&config.sts_url, envelope).await?;

    parse_sts_response(&body).map_err(|e| sign_in_failure(status, e))
}

/// Map a failed STS exchange to the error returned from sign-in. A body
/// that is not valid XML is a sign-in failure whatever the status.
fn sign_in_failure(status: u16, e: SharePointError) -> SharePointError {
    let mut e = if e.kind == SharePointErrorKind::Parse {
        SharePointError::auth(format!(
            "Security token service returned an unreadable response: {}",
            e.message
        ))
    } else {
        e
    };
    e.status = Some(status);
    warn!("Security token request failed: {}", e);
    e
}

/// The sign-in endpoint for a site origin.
pub fn signin_url(origin: &str) -> String {
    format!("{}{}", origin.trim_end_matches('/'), SIGNIN_PATH)
}

/// Leg 2: trade the security token for session cookies.
///
/// Returns the `Cookie` header value, `FedAuth=…; rtFa=…`. `rtFa` is only
/// included when the server sets it.
pub async fn exchange_token_for_cookie(
    api: &SharePointApiClient,
    origin: &str,
    token: String,
) -> SharePointResult<String> {
    let resp = api.post_signin(&signin_url(origin), token).await?;
    let status = resp.status().as_u16();
    let headers = resp.headers().clone();

    let fed_auth = extract_cookie(&headers, FEDAUTH_COOKIE).ok_or_else(|| {
        let mut e = SharePointError::auth("Sign-in endpoint did not set the FedAuth cookie");
        e.status = Some(status);
        e
    })?;

    let cookie = match extract_cookie(&headers, RTFA_COOKIE) {
        Some(rt_fa) => format!("{}; {}", fed_auth, rt_fa),
        None => {
            debug!("Sign-in response has no rtFa cookie; using FedAuth only");
            fed_auth
        }
    };
    info!("SharePoint session cookies obtained from {}", origin);
    Ok(cookie)
}

// ═══════════════════════════════════════════════════════════════════════
//  Internal helpers
// ═══════════════════════════════════════════════════════════════════════

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
