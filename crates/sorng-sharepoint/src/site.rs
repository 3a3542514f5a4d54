//! Site metadata from `/_api/web`.

use crate::client::SharePointApiClient;
use crate::error::{SharePointError, SharePointResult};
use crate::types::{parse_sp_datetime, Site, WebInfo};
use log::{debug, warn};

/// Fetch and normalise the site record.
///
/// Every failure, including a missing session, surfaces as `SiteResolution`.
pub async fn get_web_endpoint(
    api: &SharePointApiClient,
    cookie: Option<&str>,
) -> SharePointResult<Site> {
    let cookie = cookie.ok_or_else(|| {
        SharePointError::site_resolution("Not authenticated: call authenticate() first")
    })?;
    let web: WebInfo = api
        .get_json("web", cookie, &[])
        .await
        .map_err(SharePointError::into_site_resolution)?;
    let site = site_from_web(web)?;

    if let Some(url) = site.url.as_deref() {
        if !url.trim_end_matches('/').eq_ignore_ascii_case(api.site_url()) {
            warn!(
                "Configured URL {} differs from the site's own URL {}",
                api.site_url(),
                url
            );
        }
    }
    debug!("Resolved site {} ({})", site.server_relative_url, site.id);
    Ok(site)
}

/// Map the wire record to `Site`, rejecting unparseable timestamps.
pub fn site_from_web(web: WebInfo) -> SharePointResult<Site> {
    let created = parse_sp_datetime(&web.created).ok_or_else(|| {
        SharePointError::site_resolution(format!("Unparseable Created: {}", web.created))
    })?;
    let last_modified = parse_sp_datetime(&web.last_item_modified_date).ok_or_else(|| {
        SharePointError::site_resolution(format!(
            "Unparseable LastItemModifiedDate: {}",
            web.last_item_modified_date
        ))
    })?;
    Ok(Site {
        id: web.id,
        title: web.title,
        description: web.description.unwrap_or_default(),
        created,
        server_relative_url: web.server_relative_url,
        last_modified,
        url: web.url,
    })
}
