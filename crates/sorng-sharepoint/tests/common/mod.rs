//! In-process stand-in for SharePoint Online: STS, sign-in endpoint and the
//! handful of `_api` calls the client makes.

#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::{json, Value};
use sorng_sharepoint::SharePointConfig;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub const SITE_PATH: &str = "/sites/dev";
pub const DOCS: &str = "/sites/dev/Shared Documents";
pub const USERNAME: &str = "alice@contoso.com";
pub const PASSWORD: &str = "correct horse";
pub const TOKEN: &str = "t=fake-token&p=";
pub const FEDAUTH: &str = "FedAuth=fake-fedauth";
pub const RTFA: &str = "rtFa=fake-rtfa";
pub const FOLDER_NAME: &str = "TestFolder";
pub const FILE_NAME: &str = "Test.txt";

const MODIFIED: &str = "2026-10-18T10:00:00Z";

/// How `_api` answers once the session cookies have gone stale.
#[derive(Debug, Clone, Copy)]
pub enum SessionExpiry {
    /// 302 to the sign-in page.
    Redirect,
    /// 403 with SharePoint's access-denied body.
    Forbidden,
}

pub struct FakeState {
    /// Server-relative folder paths, in creation order.
    pub folders: Vec<String>,
    /// Server-relative file paths with content, in creation order.
    pub files: Vec<(String, Vec<u8>)>,
    pub digests_issued: u32,
    pub current_digest: Option<String>,
    pub digest_timeout_secs: i64,
    pub omit_rtfa: bool,
    pub expire_session: Option<SessionExpiry>,
    /// Held before answering `GET _api/web`.
    pub web_delay: Option<Duration>,
    /// `METHOD path` for every request received.
    pub requests: Vec<String>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            folders: vec![DOCS.to_string()],
            files: Vec::new(),
            digests_issued: 0,
            current_digest: None,
            digest_timeout_secs: 1800,
            omit_rtfa: false,
            expire_session: None,
            web_delay: None,
            requests: Vec::new(),
        }
    }
}

type Shared = Arc<Mutex<FakeState>>;

pub struct FakeSharePoint {
    pub base: String,
    state: Shared,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl FakeSharePoint {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let state: Shared = Arc::new(Mutex::new(FakeState::default()));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = Router::new().fallback(dispatch).with_state(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Self {
            base: format!("http://127.0.0.1:{}", port),
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn site_url(&self) -> String {
        format!("{}{}", self.base, SITE_PATH)
    }

    pub fn config(&self) -> SharePointConfig {
        let mut config = SharePointConfig::new(self.site_url());
        config.sts_url = format!("{}/extSTS.srf", self.base);
        config
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn digests_issued(&self) -> u32 {
        self.state().digests_issued
    }
}

impl Drop for FakeSharePoint {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

// ── Dispatch ─────────────────────────────────────────────────────────────────

async fn dispatch(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == Method::GET && uri.path() == "/sites/dev/_api/web" {
        let delay = state.lock().unwrap().web_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
    let mut st = state.lock().unwrap();
    handle(&mut st, &method, &uri, &headers, &body)
}

fn handle(st: &mut FakeState, method: &Method, uri: &Uri, headers: &HeaderMap, body: &[u8]) -> Response {
    let path = uri.path().to_string();
    st.requests.push(format!("{} {}", method, path));

    if path == "/extSTS.srf" {
        return sts(body);
    }
    if path == "/_forms/default.aspx" {
        return signin(st, body);
    }

    let Some(api) = path.strip_prefix("/sites/dev/_api/") else {
        return (StatusCode::NOT_FOUND, "no such page").into_response();
    };

    match st.expire_session {
        Some(SessionExpiry::Redirect) => {
            let location = format!("/_forms/default.aspx?ReturnUrl=%2fsites%2fdev%2f_api%2f{}", api);
            return (StatusCode::FOUND, [(header::LOCATION, location)]).into_response();
        }
        Some(SessionExpiry::Forbidden) => {
            return sp_error(
                StatusCode::FORBIDDEN,
                "-2147024891, System.UnauthorizedAccessException",
                "Access denied. You do not have permission to perform this action or access this resource.",
            );
        }
        None => {}
    }

    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !cookie.contains(FEDAUTH) {
        return sp_error(
            StatusCode::FORBIDDEN,
            "-2147024891, System.UnauthorizedAccessException",
            "Access denied.",
        );
    }

    let aliases = parse_aliases(uri.query().unwrap_or(""));
    let p = aliases.get("@p").cloned().unwrap_or_default();
    let n = aliases.get("@n").cloned().unwrap_or_default();

    if *method == Method::POST && api != "contextinfo" {
        let sent = headers.get("X-RequestDigest").and_then(|v| v.to_str().ok());
        if sent.is_none() || sent != st.current_digest.as_deref() {
            return sp_error(
                StatusCode::FORBIDDEN,
                "-2130575252, Microsoft.SharePoint.SPException",
                "The security validation for this page is invalid and might be corrupted.",
            );
        }
    }

    let folder_api = "web/GetFolderByServerRelativeUrl(@p)";
    let file_api = "web/GetFileByServerRelativeUrl(@p)";

    match (method.as_str(), api) {
        ("POST", "contextinfo") => {
            st.digests_issued += 1;
            let digest = format!("0xFAKEDIGEST{},18 Oct 2026 10:00:00 -0000", st.digests_issued);
            st.current_digest = Some(digest.clone());
            verbose(json!({
                "GetContextWebInformation": {
                    "__metadata": { "type": "SP.ContextWebInformation" },
                    "FormDigestTimeoutSeconds": st.digest_timeout_secs,
                    "FormDigestValue": digest,
                    "LibraryVersion": "16.0.0.0",
                    "WebFullUrl": "http://placeholder/sites/dev"
                }
            }))
        }
        ("GET", "web") => verbose(json!({
            "__metadata": { "type": "SP.Web" },
            "Id": "6f1c0b57-7d4d-4c55-9a53-3a1b6a2f0c11",
            "Title": "Dev",
            "Description": "Development site",
            "Created": "2019-03-12T10:21:24.537",
            "ServerRelativeUrl": SITE_PATH,
            "LastItemModifiedDate": MODIFIED,
            "Url": null
        })),
        ("GET", a) if a == format!("{}/Folders", folder_api) => {
            if !st.folders.contains(&p) {
                return file_not_found();
            }
            let results: Vec<Value> = st
                .folders
                .iter()
                .filter(|f| parent_of(f) == p)
                .map(|f| folder_json(f))
                .collect();
            verbose(json!({ "results": results }))
        }
        ("GET", a) if a == format!("{}/Files", folder_api) => {
            if !st.folders.contains(&p) {
                return file_not_found();
            }
            let results: Vec<Value> = st
                .files
                .iter()
                .filter(|(f, _)| parent_of(f) == p)
                .map(|(f, data)| file_json(f, data.len()))
                .collect();
            verbose(json!({ "results": results }))
        }
        ("POST", a) if a.starts_with(&format!("{}/Folders/AddUsingPath(", folder_api)) => {
            if !st.folders.contains(&p) {
                return file_not_found();
            }
            let full = format!("{}/{}", p, n);
            if st.folders.contains(&full) && !a.contains("Overwrite=true") {
                return sp_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "-2147024713, Microsoft.SharePoint.SPException",
                    &format!("A file or folder with the name {} already exists.", full),
                );
            }
            if !st.folders.contains(&full) {
                st.folders.push(full.clone());
            }
            verbose(folder_json(&full))
        }
        ("POST", a) if a.starts_with(&format!("{}/Files/add(", folder_api)) => {
            if !st.folders.contains(&p) {
                return file_not_found();
            }
            let full = format!("{}/{}", p, n);
            match st.files.iter().position(|(f, _)| *f == full) {
                Some(_) if !a.contains("overwrite=true") => {
                    return sp_error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "-2130575257, Microsoft.SharePoint.SPException",
                        &format!("A file with the name {} already exists.", full),
                    );
                }
                Some(i) => st.files[i].1 = body.to_vec(),
                None => st.files.push((full.clone(), body.to_vec())),
            }
            verbose(file_json(&full, body.len()))
        }
        ("POST", a) if a == file_api => {
            if !is_delete(headers) {
                return sp_error(StatusCode::BAD_REQUEST, "-1, Unsupported", "Unsupported verb.");
            }
            match st.files.iter().position(|(f, _)| *f == p) {
                Some(i) => {
                    st.files.remove(i);
                    StatusCode::OK.into_response()
                }
                None => file_not_found(),
            }
        }
        ("POST", a) if a == folder_api => {
            if !is_delete(headers) {
                return sp_error(StatusCode::BAD_REQUEST, "-1, Unsupported", "Unsupported verb.");
            }
            if !st.folders.contains(&p) {
                return file_not_found();
            }
            let prefix = format!("{}/", p);
            st.folders.retain(|f| *f != p && !f.starts_with(&prefix));
            st.files.retain(|(f, _)| !f.starts_with(&prefix));
            StatusCode::OK.into_response()
        }
        ("GET", a) if a == format!("{}/$value", file_api) => {
            match st.files.iter().find(|(f, _)| *f == p) {
                Some((_, data)) => (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "application/octet-stream")],
                    data.clone(),
                )
                    .into_response(),
                None => file_not_found(),
            }
        }
        _ => sp_error(
            StatusCode::BAD_REQUEST,
            "-1, Microsoft.SharePoint.Client.InvalidClientQueryException",
            "The expression is not valid.",
        ),
    }
}

// ── Sign-in legs ─────────────────────────────────────────────────────────────

fn sts(body: &[u8]) -> Response {
    let envelope = String::from_utf8_lossy(body);
    let valid = envelope.contains(&format!("<o:Username>{}</o:Username>", USERNAME))
        && envelope.contains(&format!("<o:Password>{}</o:Password>", PASSWORD));
    let xml = if valid {
        r#"<?xml version="1.0" encoding="utf-8"?><S:Envelope xmlns:S="http://www.w3.org/2003/05/soap-envelope" xmlns:wsse="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd" xmlns:wst="http://schemas.xmlsoap.org/ws/2005/02/trust"><S:Body><wst:RequestSecurityTokenResponse><wst:RequestedSecurityToken><wsse:BinarySecurityToken Id="Compact0">t=fake-token&amp;p=</wsse:BinarySecurityToken></wst:RequestedSecurityToken></wst:RequestSecurityTokenResponse></S:Body></S:Envelope>"#
    } else {
        r#"<?xml version="1.0" encoding="utf-8"?><S:Envelope xmlns:S="http://www.w3.org/2003/05/soap-envelope" xmlns:psf="http://schemas.microsoft.com/Passport/SoapServices/SOAPFault"><S:Body><S:Fault><S:Code><S:Value>S:Sender</S:Value></S:Code><S:Reason><S:Text xml:lang="en-US">Authentication Failure</S:Text></S:Reason><S:Detail><psf:error><psf:value>0x80048821</psf:value><psf:internalerror><psf:code>0x80041012</psf:code><psf:text>AADSTS50126: Error validating credentials due to invalid username or password.</psf:text></psf:internalerror></psf:error></S:Detail></S:Fault></S:Body></S:Envelope>"#
    };
    let status = if valid {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, [(header::CONTENT_TYPE, "application/soap+xml; charset=utf-8")], xml).into_response()
}

fn signin(st: &FakeState, body: &[u8]) -> Response {
    if body != TOKEN.as_bytes() {
        return (StatusCode::FORBIDDEN, "<html>sign-in failed</html>").into_response();
    }
    let mut builder = Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, "/_layouts/15/landing.aspx")
        .header(header::SET_COOKIE, "RpsContextCookie=; path=/")
        .header(header::SET_COOKIE, format!("{}; path=/; secure; HttpOnly", FEDAUTH));
    if !st.omit_rtfa {
        builder = builder.header(header::SET_COOKIE, format!("{}; path=/; secure; HttpOnly", RTFA));
    }
    builder.body(Body::empty()).unwrap()
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn parse_aliases(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| {
            let quoted = v.strip_prefix('\'').and_then(|s| s.strip_suffix('\''));
            let v = quoted.unwrap_or(&v).replace("''", "'");
            (k.into_owned(), v)
        })
        .collect()
}

fn parent_of(path: &str) -> String {
    path.rsplit_once('/').map(|(p, _)| p.to_string()).unwrap_or_default()
}

fn name_of(path: &str) -> String {
    path.rsplit_once('/').map(|(_, n)| n.to_string()).unwrap_or_default()
}

fn is_delete(headers: &HeaderMap) -> bool {
    headers.get("X-HTTP-Method").map(|v| v == "DELETE").unwrap_or(false)
        && headers.get(header::IF_MATCH).map(|v| v == "*").unwrap_or(false)
}

fn folder_json(path: &str) -> Value {
    json!({
        "__metadata": { "type": "SP.Folder" },
        "Name": name_of(path),
        "ServerRelativeUrl": path,
        "TimeLastModified": MODIFIED
    })
}

fn file_json(path: &str, len: usize) -> Value {
    json!({
        "__metadata": { "type": "SP.File" },
        "Name": name_of(path),
        "ServerRelativeUrl": path,
        "Length": len.to_string(),
        "TimeLastModified": MODIFIED
    })
}

fn verbose(d: Value) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json;odata=verbose;charset=utf-8")],
        json!({ "d": d }).to_string(),
    )
        .into_response()
}

fn sp_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json;odata=verbose;charset=utf-8")],
        json!({ "error": { "code": code, "message": { "lang": "en-US", "value": message } } })
            .to_string(),
    )
        .into_response()
}

fn file_not_found() -> Response {
    sp_error(
        StatusCode::NOT_FOUND,
        "-2147024894, System.IO.FileNotFoundException",
        "File Not Found.",
    )
}
