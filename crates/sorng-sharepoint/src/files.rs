// ──────────────────────────────────────────────────────────────────────────────
// sorng-sharepoint · files
// ──────────────────────────────────────────────────────────────────────────────
// File operations:
//  • Upload (Files/add)
//  • Download ($value)
//  • Delete (X-HTTP-Method: DELETE)
// ──────────────────────────────────────────────────────────────────────────────

use crate::client::{alias_query, join_server_relative, SharePointApiClient};
use crate::error::SharePointResult;
use crate::types::*;
use log::info;

const FILE_BY_PATH: &str = "web/GetFileByServerRelativeUrl(@p)";

/// Upload `content` as `parent/name`. With `ConflictPolicy::Fail` an
/// existing file surfaces as `Conflict`.
pub async fn create_file(
    api: &SharePointApiClient,
    cookie: &str,
    digest: &str,
    parent: &str,
    name: &str,
    content: FileContent,
    policy: ConflictPolicy,
) -> SharePointResult<DirectoryEntry> {
    let path = format!(
        "web/GetFolderByServerRelativeUrl(@p)/Files/add(url=@n,overwrite={})",
        policy.overwrite()
    );
    let query = alias_query(&[("p", parent), ("n", name)]);
    let content_type = content.content_type();
    let len = content.len();
    let file: SpFile = api
        .post_bytes(&path, cookie, Some(digest), &query, content.into_bytes(), content_type)
        .await?;
    info!("Uploaded {} ({} bytes)", file.server_relative_url, len);
    Ok(file.into())
}

/// Raw bytes of `parent/name`.
pub async fn download_file(
    api: &SharePointApiClient,
    cookie: &str,
    parent: &str,
    name: &str,
) -> SharePointResult<Vec<u8>> {
    let target = join_server_relative(parent, name);
    let query = alias_query(&[("p", &target)]);
    api.get_bytes(&format!("{}/$value", FILE_BY_PATH), cookie, &query)
        .await
}

pub async fn delete_file(
    api: &SharePointApiClient,
    cookie: &str,
    digest: &str,
    parent: &str,
    name: &str,
) -> SharePointResult<()> {
    let target = join_server_relative(parent, name);
    let query = alias_query(&[("p", &target)]);
    api.post_method_override(FILE_BY_PATH, cookie, Some(digest), &query, "DELETE")
        .await?;
    info!("Deleted file {}", target);
    Ok(())
}
