//! Atom/AtomPub documents of SWORD v2: service documents, deposit receipts
//! and `sword:error` bodies.

use reqwest::Url;
use roxmltree::{Document, Node};
use std::collections::BTreeSet;
use sword_deposit_core::contract::{Collection, DepositReceipt, Link, ServiceDocument, Workspace, REL_EDIT};
use sword_deposit_core::SwordError;
use tracing::{debug, warn};

pub const NS_APP: &str = "http://www.w3.org/2007/app";
pub const NS_ATOM: &str = "http://www.w3.org/2005/Atom";
pub const NS_SWORD: &str = "http://purl.org/net/sword/terms/";
pub const NS_DCTERMS: &str = "http://purl.org/dc/terms/";

fn parse_xml<'a>(xml: &'a str, what: &str) -> Result<Document<'a>, SwordError> {
    Document::parse(xml).map_err(|e| SwordError::Protocol(format!("{what} is not well-formed XML: {e}")))
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    ns: &'static str,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |n| n.has_tag_name((ns, name)))
}

/// Trimmed text of the first `ns:name` child, if non-empty.
fn child_text(node: Node<'_, '_>, ns: &'static str, name: &'static str) -> Option<String> {
    children(node, ns, name)
        .next()
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn all_text(node: Node<'_, '_>, ns: &'static str, name: &'static str) -> Vec<String> {
    children(node, ns, name)
        .filter_map(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn resolve(base: &Url, href: &str) -> Result<String, SwordError> {
    base.join(href)
        .map(String::from)
        .map_err(|e| SwordError::Protocol(format!("invalid IRI `{href}`: {e}")))
}

/// Parse an AtomPub service document. Relative collection IRIs are resolved
/// against `base`, the IRI the document was fetched from.
pub fn parse_service_document(xml: &str, base: &Url) -> Result<ServiceDocument, SwordError> {
    let doc = parse_xml(xml, "service document")?;
    let root = doc.root_element();
    if !root.has_tag_name((NS_APP, "service")) {
        return Err(SwordError::Protocol(format!(
            "expected an app:service document, found <{}>",
            root.tag_name().name()
        )));
    }

    let mut workspaces = Vec::new();
    for workspace in children(root, NS_APP, "workspace") {
        let mut collections = Vec::new();
        for node in children(workspace, NS_APP, "collection") {
            let href = node.attribute("href").ok_or_else(|| {
                SwordError::Protocol("app:collection without an href attribute".to_string())
            })?;
            collections.push(Collection {
                href: resolve(base, href)?,
                title: child_text(node, NS_ATOM, "title").unwrap_or_default(),
                description: child_text(node, NS_DCTERMS, "abstract"),
                accept: all_text(node, NS_APP, "accept"),
                accepted_packaging: all_text(node, NS_SWORD, "acceptPackaging")
                    .into_iter()
                    .collect::<BTreeSet<_>>(),
            });
        }
        workspaces.push(Workspace {
            title: child_text(workspace, NS_ATOM, "title").unwrap_or_default(),
            collections,
        });
    }

    debug!(workspaces = workspaces.len(), "Parsed service document");
    Ok(ServiceDocument { workspaces })
}

/// Build a receipt from a deposit response. An empty body is accepted when
/// the server sent a `Location` header; otherwise the entry must at least
/// carry an edit link to stand in for it.
pub fn parse_deposit_receipt(
    status_code: u16,
    location: Option<String>,
    body: &str,
) -> Result<DepositReceipt, SwordError> {
    if body.trim().is_empty() {
        return match location {
            Some(location) => {
                warn!(status_code, "Deposit response has no receipt body, using Location header only");
                Ok(DepositReceipt {
                    status_code,
                    location: Some(location),
                    links: Vec::new(),
                    content_link: None,
                    packaging: Vec::new(),
                    treatment: None,
                })
            }
            None => Err(SwordError::Protocol(
                "deposit response carries neither a receipt nor a Location header".to_string(),
            )),
        };
    }

    let doc = parse_xml(body, "deposit receipt")?;
    let entry = doc.root_element();
    if !entry.has_tag_name((NS_ATOM, "entry")) {
        return Err(SwordError::Protocol(format!(
            "expected an atom:entry deposit receipt, found <{}>",
            entry.tag_name().name()
        )));
    }

    let links: Vec<Link> = children(entry, NS_ATOM, "link")
        .filter_map(|n| {
            Some(Link {
                rel: n.attribute("rel").unwrap_or("alternate").to_string(),
                href: n.attribute("href")?.to_string(),
                media_type: n.attribute("type").map(str::to_string),
            })
        })
        .collect();

    let content_link = children(entry, NS_ATOM, "content").next().and_then(|n| {
        Some(Link {
            rel: "content".to_string(),
            href: n.attribute("src")?.to_string(),
            media_type: n.attribute("type").map(str::to_string),
        })
    });

    let location = location.or_else(|| {
        links
            .iter()
            .find(|l| l.rel == REL_EDIT)
            .map(|l| l.href.clone())
    });
    if location.is_none() {
        return Err(SwordError::Protocol(
            "deposit receipt has no Location header and no edit link".to_string(),
        ));
    }

    Ok(DepositReceipt {
        status_code,
        location,
        packaging: all_text(entry, NS_SWORD, "packaging"),
        treatment: child_text(entry, NS_SWORD, "treatment"),
        links,
        content_link,
    })
}

/// Human-readable description from a `sword:error` document, if `body` is one.
pub fn parse_error_summary(body: &str) -> Option<String> {
    let doc = Document::parse(body).ok()?;
    let root = doc.root_element();
    if !root.has_tag_name((NS_SWORD, "error")) {
        return None;
    }
    let summary = child_text(root, NS_ATOM, "summary")
        .or_else(|| child_text(root, NS_SWORD, "verboseDescription"))
        .or_else(|| child_text(root, NS_ATOM, "title"));
    match (root.attribute("href"), summary) {
        (Some(href), Some(summary)) => Some(format!("{summary} [{href}]")),
        (Some(href), None) => Some(href.to_string()),
        (None, summary) => summary,
    }
}
