//! # SortOfRemote NG – SharePoint Integration
//!
//! Username/password access to a SharePoint Online site over the `_api` REST
//! surface:
//!
//! - **Auth**: SAML security token exchange and FedAuth/rtFa session cookies
//! - **Session**: Form digest retrieval, expiry tracking and refresh before writes
//! - **Site**: `/_api/web` metadata
//! - **Folders**: List immediate children, create, delete
//! - **Files**: Upload text or binary content, download, delete
//!
//! ```no_run
//! # async fn run() -> sorng_sharepoint::SharePointResult<()> {
//! use sorng_sharepoint::SharePointClient;
//!
//! let client = SharePointClient::with_url("https://contoso.sharepoint.com/sites/team")?;
//! client.authenticate("alice@contoso.com", "secret").await?;
//! client.create_file("/sites/team/Shared Documents", "hello.txt", "Hello").await?;
//! for entry in client.get_contents("/sites/team/Shared Documents").await? {
//!     println!("{:?} {}", entry.kind, entry.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod client;
pub mod auth;
pub mod session;
pub mod site;
pub mod folders;
pub mod files;
pub mod service;

pub use config::SharePointConfig;
pub use error::{SharePointError, SharePointErrorKind, SharePointResult};
pub use service::{SharePointClient, SharePointClientState};
pub use types::{
    AuthStage, ConflictPolicy, DirectoryEntry, EntryKind, FileContent, FormDigest, Session,
    SharePointCredentials, Site,
};
