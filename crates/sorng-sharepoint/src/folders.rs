// ──────────────────────────────────────────────────────────────────────────────
// sorng-sharepoint · folders
// ──────────────────────────────────────────────────────────────────────────────
// Folder operations over `GetFolderByServerRelativeUrl`:
//  • Immediate-children listing (folders, then files)
//  • Create (AddUsingPath)
//  • Delete (X-HTTP-Method: DELETE)
// ──────────────────────────────────────────────────────────────────────────────

use crate::client::{alias_query, join_server_relative, SharePointApiClient};
use crate::error::SharePointResult;
use crate::types::*;
use log::{debug, info};

const FOLDER_BY_PATH: &str = "web/GetFolderByServerRelativeUrl(@p)";

// ── List ─────────────────────────────────────────────────────────────────────

/// Immediate children of `path`: every folder first, then every file,
/// each group in server order.
pub async fn get_contents(
    api: &SharePointApiClient,
    cookie: &str,
    path: &str,
) -> SharePointResult<Vec<DirectoryEntry>> {
    let query = alias_query(&[("p", path)]);

    let folders: ODataResults<SpFolder> = api
        .get_json(&format!("{}/Folders", FOLDER_BY_PATH), cookie, &query)
        .await?;
    let files: ODataResults<SpFile> = api
        .get_json(&format!("{}/Files", FOLDER_BY_PATH), cookie, &query)
        .await?;

    let entries = merge_listing(folders.results, files.results);
    debug!("Listed {} entries under {}", entries.len(), path);
    Ok(entries)
}

/// Folders followed by files, preserving the order within each group.
pub fn merge_listing(folders: Vec<SpFolder>, files: Vec<SpFile>) -> Vec<DirectoryEntry> {
    folders
        .into_iter()
        .map(DirectoryEntry::from)
        .chain(files.into_iter().map(DirectoryEntry::from))
        .collect()
}

// ── Create ───────────────────────────────────────────────────────────────────

/// Create `name` under `parent`. With `ConflictPolicy::Fail` an existing
/// folder surfaces as `Conflict`.
pub async fn create_folder(
    api: &SharePointApiClient,
    cookie: &str,
    digest: &str,
    parent: &str,
    name: &str,
    policy: ConflictPolicy,
) -> SharePointResult<DirectoryEntry> {
    let path = format!(
        "{}/Folders/AddUsingPath(DecodedUrl=@n,Overwrite={})",
        FOLDER_BY_PATH,
        policy.overwrite()
    );
    let query = alias_query(&[("p", parent), ("n", name)]);
    let folder: SpFolder = api.post_json(&path, cookie, Some(digest), &query).await?;
    info!("Created folder {}", folder.server_relative_url);
    Ok(folder.into())
}

// ── Delete ───────────────────────────────────────────────────────────────────

/// Delete `name` under `parent`, including everything beneath it.
pub async fn delete_folder(
    api: &SharePointApiClient,
    cookie: &str,
    digest: &str,
    parent: &str,
    name: &str,
) -> SharePointResult<()> {
    let target = join_server_relative(parent, name);
    let query = alias_query(&[("p", &target)]);
    api.post_method_override(FOLDER_BY_PATH, cookie, Some(digest), &query, "DELETE")
        .await?;
    info!("Deleted folder {}", target);
    Ok(())
}
