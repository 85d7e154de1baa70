#![allow(unused)]

//! # contract: the collaborators of the deposit workflow
//!
//! This module defines the two capabilities the orchestrator depends on, plus
//! the plain data exchanged with them:
//!
//! - [`SwordTransport`]: the SWORD v2 protocol operations ("get service
//!   document" and "deposit"). The CLI crate implements it over HTTP.
//! - [`Prompter`]: interactive answers (SSO token, collection index). The CLI
//!   crate implements it on the terminal.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`; `MockSwordTransport` and
//!   `MockPrompter` are exported under the `test-export-mocks` feature so
//!   dependent crates can drive the workflow without a server or a terminal.

use async_trait::async_trait;
use mockall::{automock, predicate::*};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::config::AuthCredentials;
use crate::error::SwordError;

pub const REL_EDIT: &str = "edit";
pub const REL_EDIT_MEDIA: &str = "edit-media";
pub const REL_ALTERNATE: &str = "alternate";
pub const REL_SWORD_EDIT: &str = "http://purl.org/net/sword/terms/add";
pub const REL_ORIGINAL_DEPOSIT: &str = "http://purl.org/net/sword/terms/originalDeposit";
pub const REL_STATEMENT: &str = "http://purl.org/net/sword/terms/statement";

pub const STATEMENT_ATOM: &str = "application/atom+xml;type=feed";
pub const STATEMENT_ORE: &str = "application/rdf+xml";

/// A deposit target advertised by the service document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collection {
    /// Collection IRI the package is POSTed to.
    pub href: String,
    pub title: String,
    /// `dcterms:abstract`, when the server supplies one.
    pub description: Option<String>,
    /// MIME types accepted (`app:accept`).
    pub accept: Vec<String>,
    /// Packaging formats accepted (`sword:acceptPackaging`).
    pub accepted_packaging: BTreeSet<String>,
}

impl Collection {
    pub fn accepts_packaging(&self, packaging: &str) -> bool {
        self.accepted_packaging.contains(packaging)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workspace {
    pub title: String,
    pub collections: Vec<Collection>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceDocument {
    pub workspaces: Vec<Workspace>,
}

/// What to send for a file; shared by every file of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositOptions {
    pub mime_type: String,
    /// Suggested identifier (`Slug` header).
    pub slug: Option<String>,
    pub in_progress: bool,
    /// Send a `Content-MD5` digest of the package.
    pub compute_md5: bool,
}

impl DepositOptions {
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            slug: None,
            in_progress: false,
            compute_md5: false,
        }
    }
}

/// One file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositRequest {
    pub file_path: PathBuf,
    pub options: DepositOptions,
}

impl DepositRequest {
    pub fn new(file_path: impl Into<PathBuf>, options: DepositOptions) -> Self {
        Self {
            file_path: file_path.into(),
            options,
        }
    }
}

/// The package as handed to the transport.
#[derive(Clone, PartialEq, Eq)]
pub struct Deposit {
    pub filename: String,
    pub mime_type: String,
    pub packaging: String,
    pub slug: Option<String>,
    pub in_progress: bool,
    /// Hex MD5 of `content`.
    pub md5: Option<String>,
    pub content: Vec<u8>,
}

impl std::fmt::Debug for Deposit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deposit")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("packaging", &self.packaging)
            .field("slug", &self.slug)
            .field("in_progress", &self.in_progress)
            .field("md5", &self.md5)
            .field("content_len", &self.content.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    pub media_type: Option<String>,
}

/// The server's acknowledgement of a deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositReceipt {
    pub status_code: u16,
    /// `Location` header, or the edit link when the header is absent.
    pub location: Option<String>,
    pub links: Vec<Link>,
    /// `atom:content@src`; `rel` is always `content`.
    pub content_link: Option<Link>,
    pub packaging: Vec<String>,
    /// `sword:treatment`: the server's description of what it did.
    pub treatment: Option<String>,
}

impl DepositReceipt {
    pub fn link(&self, rel: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.rel == rel)
    }

    pub fn edit_link(&self) -> Option<&Link> {
        self.link(REL_EDIT)
    }

    pub fn edit_media_link(&self) -> Option<&Link> {
        self.link(REL_EDIT_MEDIA)
    }

    pub fn sword_edit_link(&self) -> Option<&Link> {
        self.link(REL_SWORD_EDIT)
    }

    pub fn original_deposit_link(&self) -> Option<&Link> {
        self.link(REL_ORIGINAL_DEPOSIT)
    }

    pub fn splash_page_link(&self) -> Option<&Link> {
        self.link(REL_ALTERNATE)
    }

    pub fn statement_links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|l| l.rel == REL_STATEMENT)
    }

    /// Statement link of the given content type. Whitespace inside the
    /// media type parameters is ignored.
    pub fn statement_link(&self, media_type: &str) -> Option<&Link> {
        let wanted = normalise_media_type(media_type);
        self.statement_links().find(|l| {
            l.media_type
                .as_deref()
                .is_some_and(|t| normalise_media_type(t) == wanted)
        })
    }
}

pub(crate) fn normalise_media_type(media_type: &str) -> String {
    media_type
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// SWORD v2 protocol operations used by the deposit workflow.
///
/// Implementors own the transport (HTTP client, timeouts); the trait carries
/// no retry or connection-reuse semantics of its own.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SwordTransport: Send + Sync {
    /// Fetch and parse the service document at `sd_iri`.
    ///
    /// `SwordError::Connection` when it cannot be fetched, `SwordError::Protocol`
    /// when the body is not a service document.
    async fn get_service_document(
        &self,
        sd_iri: &str,
        credentials: &AuthCredentials,
    ) -> Result<ServiceDocument, SwordError>;

    /// Deposit a package into `collection`.
    ///
    /// `SwordError::Deposit` when the server rejects it, `SwordError::Protocol`
    /// when the receipt is malformed or incomplete.
    async fn deposit(
        &self,
        collection: &Collection,
        deposit: Deposit,
        credentials: &AuthCredentials,
    ) -> Result<DepositReceipt, SwordError>;
}

/// Interactive answers needed during a run. Calls block until answered.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Prompter {
    /// Ask for an optional SSO token; `None` when the user skips it.
    fn sso_token(&self) -> Result<Option<String>, SwordError>;

    /// Show `listing` and ask for the index of the target collection.
    fn collection_index(&self, listing: &str) -> Result<usize, SwordError>;
}
