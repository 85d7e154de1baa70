#![doc = "HTTP implementation of the SWORD v2 transport used by the CLI."]
//
//! # SWORD v2 client (CLI <-> Core)
//!
//! This module wires the [`SwordTransport`] trait from
//! `sword-deposit-core::contract` to a real repository over HTTP(S) with
//! `reqwest`. Documents are parsed by [`crate::atom`].
//!
//! - Credentials travel as HTTP basic auth; a mediated deposit adds
//!   `On-Behalf-Of`, an OpenAM session adds the `iPlanetDirectoryPro` cookie.
//! - The client is built once per run and holds no per-request state. No
//!   retries; the only timeout is the optional one given to [`SwordClient::new`].

use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, COOKIE, LOCATION};
use reqwest::{RequestBuilder, StatusCode, Url};
use std::time::Duration;

use sword_deposit_core::config::AuthCredentials;
use sword_deposit_core::contract::{Collection, Deposit, DepositReceipt, ServiceDocument, SwordTransport};
use sword_deposit_core::SwordError;

use crate::atom;

/// Cookie carrying an OpenAM single-sign-on session.
pub const OPENAM_SSO_COOKIE: &str = "iPlanetDirectoryPro";

pub const HEADER_PACKAGING: &str = "Packaging";
pub const HEADER_IN_PROGRESS: &str = "In-Progress";
pub const HEADER_SLUG: &str = "Slug";
pub const HEADER_CONTENT_MD5: &str = "Content-MD5";
pub const HEADER_ON_BEHALF_OF: &str = "On-Behalf-Of";

pub struct SwordClient {
    http: reqwest::Client,
}

impl SwordClient {
    pub fn new(timeout: Option<Duration>) -> reqwest::Result<Self> {
        let mut builder =
            reqwest::Client::builder().user_agent(concat!("sword-deposit/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        tracing::info!(timeout = ?timeout, "Initialized SWORD client");
        Ok(SwordClient { http })
    }

    fn authorise(builder: RequestBuilder, credentials: &AuthCredentials) -> RequestBuilder {
        let mut builder = builder.basic_auth(&credentials.user, Some(&credentials.pass));
        if let Some(obo) = &credentials.on_behalf_of {
            builder = builder.header(HEADER_ON_BEHALF_OF, obo);
        }
        if let Some(token) = &credentials.sso_token {
            builder = builder.header(COOKIE, format!("{OPENAM_SSO_COOKIE}={token}"));
        }
        builder
    }
}

fn parse_url(iri: &str) -> Result<Url, SwordError> {
    Url::parse(iri).map_err(|e| SwordError::Connection {
        url: iri.to_string(),
        reason: format!("invalid URL: {e}"),
    })
}

fn connection_error(url: &Url, e: reqwest::Error) -> SwordError {
    SwordError::Connection {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

/// `attachment; filename=<name>`, quoting the name unless it is a plain token.
pub fn content_disposition(filename: &str) -> String {
    if !filename.is_empty() && filename.chars().all(is_token_char) {
        format!("attachment; filename={filename}")
    } else {
        let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");
        format!("attachment; filename=\"{escaped}\"")
    }
}

fn reason_phrase(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("unknown status").to_string()
}

#[async_trait]
impl SwordTransport for SwordClient {
    async fn get_service_document(
        &self,
        sd_iri: &str,
        credentials: &AuthCredentials,
    ) -> Result<ServiceDocument, SwordError> {
        let url = parse_url(sd_iri)?;
        tracing::info!(url = %url, user = %credentials.user, "Requesting service document");

        let response = Self::authorise(self.http.get(url.clone()), credentials)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, url = %url, "Service document request failed");
                connection_error(&url, e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| connection_error(&url, e))?;
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), url = %url, "Service document request was refused");
            let detail = atom::parse_error_summary(&body).unwrap_or_else(|| reason_phrase(status));
            return Err(SwordError::Connection {
                url: url.to_string(),
                reason: format!("server answered {}: {detail}", status.as_u16()),
            });
        }

        let document = atom::parse_service_document(&body, &url)?;
        tracing::info!(workspaces = document.workspaces.len(), "Fetched service document");
        Ok(document)
    }

    async fn deposit(
        &self,
        collection: &Collection,
        deposit: Deposit,
        credentials: &AuthCredentials,
    ) -> Result<DepositReceipt, SwordError> {
        let url = parse_url(&collection.href)?;
        tracing::info!(
            url = %url,
            filename = %deposit.filename,
            size = deposit.content.len(),
            packaging = %deposit.packaging,
            in_progress = deposit.in_progress,
            "Posting deposit"
        );

        let mut request = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, &deposit.mime_type)
            .header(CONTENT_DISPOSITION, content_disposition(&deposit.filename))
            .header(HEADER_PACKAGING, &deposit.packaging)
            .header(HEADER_IN_PROGRESS, if deposit.in_progress { "true" } else { "false" });
        if let Some(slug) = &deposit.slug {
            request = request.header(HEADER_SLUG, slug);
        }
        if let Some(md5) = &deposit.md5 {
            request = request.header(HEADER_CONTENT_MD5, md5);
        }

        let response = Self::authorise(request, credentials)
            .body(deposit.content)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, url = %url, "Deposit request failed");
                connection_error(&url, e)
            })?;

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(|e| connection_error(&url, e))?;

        if !status.is_success() {
            let summary = atom::parse_error_summary(&body).unwrap_or_else(|| reason_phrase(status));
            tracing::error!(status = status.as_u16(), summary = %summary, "Deposit rejected by server");
            return Err(SwordError::Deposit {
                status: status.as_u16(),
                summary,
            });
        }

        atom::parse_deposit_receipt(status.as_u16(), location, &body)
    }
}
