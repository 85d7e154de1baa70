//! Deposit workflow: discover → select → deposit one file or a directory of archives.
//!
//! This module drives a run end to end against a [`SwordTransport`] and a
//! [`Prompter`]:
//!   - Assembles credentials from the loaded [`ServerConfig`], optionally
//!     asking for an SSO token
//!   - Lists the collections of the service document and lets the user pick one
//!   - Deposits a single package, or every `.zip` of a directory
//!   - Returns receipts (and, for batches, per-file failures) for reporting
//!
//! # Error Handling
//! Discovery, selection and single deposits fail fast with the first
//! [`SwordError`]. A batch records each file's failure in its
//! [`BatchReport`] and carries on with the next file; only a directory that
//! cannot be listed aborts it.

use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::config::{AuthCredentials, ServerConfig};
use crate::contract::{
    Collection, Deposit, DepositOptions, DepositReceipt, DepositRequest, Prompter, SwordTransport,
};
use crate::error::{Result, SwordError};
use crate::report;

/// Packaging identifier sent with every deposit: DSpace Simple Archive Format.
pub const PACKAGE_DSPACE_SAF: &str = "http://purl.org/net/sword/package/SimpleDSpaceSAF";

/// Extension (compared case-insensitively) of the files picked up in batch mode.
pub const ARCHIVE_EXTENSION: &str = "zip";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositTarget {
    File(PathBuf),
    Directory(PathBuf),
}

/// Everything a run needs besides the server config.
#[derive(Debug, Clone)]
pub struct DepositPlan {
    pub target: DepositTarget,
    pub options: DepositOptions,
    /// Ask for an SSO token before contacting the server.
    pub ask_sso_token: bool,
}

#[derive(Debug)]
pub struct DepositOutcome {
    pub path: PathBuf,
    pub receipt: DepositReceipt,
}

#[derive(Debug)]
pub struct DepositFailure {
    pub path: PathBuf,
    pub error: SwordError,
}

/// Result of a directory deposit, in processing order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<DepositOutcome>,
    pub failed: Vec<DepositFailure>,
}

impl BatchReport {
    pub fn imported(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    fn record(mut self, path: PathBuf, result: Result<DepositReceipt>) -> Self {
        match result {
            Ok(receipt) => self.succeeded.push(DepositOutcome { path, receipt }),
            Err(error) => {
                error!(file = %path.display(), error = %error, "There is a problem with file");
                self.failed.push(DepositFailure { path, error });
            }
        }
        self
    }
}

#[derive(Debug)]
pub enum RunReport {
    Single(DepositReceipt),
    Batch(BatchReport),
}

/// Credentials for the run. With `ask_sso_token`, a token entered at the
/// prompt replaces the configured one; an empty answer keeps it.
pub fn assemble_credentials<P>(
    config: &ServerConfig,
    prompter: &P,
    ask_sso_token: bool,
) -> Result<AuthCredentials>
where
    P: Prompter + ?Sized,
{
    let credentials = config.credentials();
    if !ask_sso_token {
        debug!("SSO prompt skipped");
        return Ok(credentials);
    }
    let token = prompter.sso_token()?.filter(|t| !t.trim().is_empty());
    info!(sso_token_entered = token.is_some(), "SSO prompt answered");
    Ok(credentials.with_sso_token(token))
}

/// All collections of the service document, workspaces flattened in document order.
pub async fn discover_collections<T>(
    transport: &T,
    config: &ServerConfig,
    credentials: &AuthCredentials,
) -> Result<Vec<Collection>>
where
    T: SwordTransport + ?Sized,
{
    info!(sd_iri = %config.sd_iri, "Fetching service document");
    let service_document = transport
        .get_service_document(&config.sd_iri, credentials)
        .await
        .map_err(|e| {
            error!(sd_iri = %config.sd_iri, error = %e, "Service document retrieval failed");
            e
        })?;

    let collections: Vec<Collection> = service_document
        .workspaces
        .into_iter()
        .flat_map(|w| w.collections)
        .collect();
    if collections.is_empty() {
        error!(sd_iri = %config.sd_iri, "Service document lists no collections");
        return Err(SwordError::Protocol(format!(
            "service document at {} lists no collections, we cannot continue",
            config.sd_iri
        )));
    }
    info!(count = collections.len(), "Discovered collections");
    Ok(collections)
}

pub fn select_collection(collections: &[Collection], index: usize) -> Result<&Collection> {
    collections.get(index).ok_or(SwordError::Selection {
        index,
        count: collections.len(),
    })
}

/// Show the collection listing through `prompter` and return the chosen one.
pub fn choose_collection<'c, P>(prompter: &P, collections: &'c [Collection]) -> Result<&'c Collection>
where
    P: Prompter + ?Sized,
{
    let listing = report::format_collections(collections);
    let index = prompter.collection_index(&listing)?;
    let collection = select_collection(collections, index).map_err(|e| {
        error!(index, count = collections.len(), "The target collection does not exist");
        e
    })?;
    info!(title = %collection.title, href = %collection.href, "The selected target collection is");
    Ok(collection)
}

/// Read the file named by `request` and turn it into a transport payload.
/// The file handle does not outlive this call.
pub async fn prepare_deposit(request: &DepositRequest) -> Result<Deposit> {
    let path = &request.file_path;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            SwordError::io(
                path.clone(),
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no usable file name"),
            )
        })?
        .to_string();

    let content = tokio::fs::read(path).await.map_err(|e| {
        error!(file = %path.display(), error = %e, "Unable to open archive file");
        SwordError::io(path.clone(), e)
    })?;

    let md5 = request
        .options
        .compute_md5
        .then(|| format!("{:x}", md5::compute(&content)));

    debug!(file = %path.display(), size = content.len(), md5 = ?md5, "Prepared deposit payload");
    Ok(Deposit {
        filename,
        mime_type: request.options.mime_type.clone(),
        packaging: PACKAGE_DSPACE_SAF.to_string(),
        slug: request.options.slug.clone(),
        in_progress: request.options.in_progress,
        md5,
        content,
    })
}

pub async fn deposit_single<T>(
    transport: &T,
    collection: &Collection,
    request: &DepositRequest,
    credentials: &AuthCredentials,
) -> Result<DepositReceipt>
where
    T: SwordTransport + ?Sized,
{
    info!(file = %request.file_path.display(), collection = %collection.title, "Uploading file");
    let deposit = prepare_deposit(request).await?;

    // The server has the final say; a mismatch is only worth a warning.
    if !collection.accepted_packaging.is_empty() && !collection.accepts_packaging(&deposit.packaging) {
        warn!(
            collection = %collection.title,
            packaging = %deposit.packaging,
            "Collection does not advertise the packaging format, depositing anyway"
        );
    }

    let receipt = transport
        .deposit(collection, deposit, credentials)
        .await
        .map_err(|e| {
            error!(file = %request.file_path.display(), error = %e, status = ?e.status(), "Deposit failed");
            e
        })?;

    info!(
        file = %request.file_path.display(),
        status = receipt.status_code,
        location = receipt.location.as_deref().unwrap_or("-"),
        "Deposit accepted"
    );
    match serde_json::to_string_pretty(&receipt) {
        Ok(json) => debug!(json = %json, "Deposit receipt as JSON"),
        Err(e) => error!(error = ?e, "Failed to serialize deposit receipt as JSON"),
    }
    Ok(receipt)
}

pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

/// Regular files in `directory` with the archive extension, sorted by path.
pub async fn list_archives(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(directory).await.map_err(|e| {
        error!(directory = %directory.display(), error = %e, "Unable to list directory");
        SwordError::io(directory, e)
    })?;

    let mut archives = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| SwordError::io(directory, e))?
    {
        let path = entry.path();
        // Follows symlinks, like `Path::is_file`.
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if is_file && is_archive(&path) {
            archives.push(path);
        } else {
            debug!(path = %path.display(), "Skipping non-archive entry");
        }
    }
    archives.sort();
    Ok(archives)
}

/// Deposit every archive of `directory`, one after the other. A failing file
/// is recorded and never stops the rest.
pub async fn deposit_batch<T>(
    transport: &T,
    collection: &Collection,
    directory: &Path,
    template: &DepositOptions,
    credentials: &AuthCredentials,
) -> Result<BatchReport>
where
    T: SwordTransport + ?Sized,
{
    let archives = list_archives(directory).await?;
    info!(directory = %directory.display(), count = archives.len(), "Found archives to deposit");

    let mut report = BatchReport::default();
    for path in archives {
        let request = DepositRequest::new(path.clone(), template.clone());
        let result = deposit_single(transport, collection, &request, credentials).await;
        report = report.record(path, result);
    }

    info!(
        imported = report.imported(),
        failed = report.failed_count(),
        "{}",
        report::format_batch_summary(&report)
    );
    Ok(report)
}

/// Run the whole workflow for `plan`.
pub async fn run_deposit<T, P>(
    transport: &T,
    prompter: &P,
    config: &ServerConfig,
    plan: &DepositPlan,
) -> Result<RunReport>
where
    T: SwordTransport + ?Sized,
    P: Prompter + ?Sized,
{
    let credentials = assemble_credentials(config, prompter, plan.ask_sso_token)?;
    let collections = discover_collections(transport, config, &credentials).await?;
    let collection = choose_collection(prompter, &collections)?;

    match &plan.target {
        DepositTarget::File(path) => {
            let request = DepositRequest::new(path.clone(), plan.options.clone());
            deposit_single(transport, collection, &request, &credentials)
                .await
                .map(RunReport::Single)
        }
        DepositTarget::Directory(directory) => {
            deposit_batch(transport, collection, directory, &plan.options, &credentials)
                .await
                .map(RunReport::Batch)
        }
    }
}
