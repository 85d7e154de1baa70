//! Human-readable text for receipts, collection listings and batch results.
//!
//! Everything here is pure formatting; callers decide whether to print or log.

use crate::contract::{Collection, DepositReceipt, Link, STATEMENT_ATOM, STATEMENT_ORE};
use crate::contract::normalise_media_type;
use crate::deposit::BatchReport;

fn title(title: &str) -> String {
    format!("\n*************** {title} ***************\n")
}

fn push_line(out: &mut String, label: &str, value: &str) {
    out.push_str(label);
    out.push_str(": ");
    out.push_str(value);
    out.push('\n');
}

fn push_link(out: &mut String, label: &str, link: Option<&Link>) {
    if let Some(link) = link {
        push_line(out, label, &link.href);
    }
}

/// Summary of a deposit receipt. Links the receipt does not carry are left out.
pub fn format_report(receipt: &DepositReceipt) -> String {
    let mut out = title("RECEIPT REPORT");
    push_line(&mut out, "Status code", &receipt.status_code.to_string());
    push_line(
        &mut out,
        "Location",
        receipt.location.as_deref().unwrap_or("(not provided)"),
    );
    push_link(&mut out, "Original Deposit link", receipt.original_deposit_link());
    push_link(&mut out, "Edit media link", receipt.edit_media_link());
    push_link(&mut out, "Atom statement link", receipt.statement_link(STATEMENT_ATOM));
    push_link(&mut out, "ORE statement link", receipt.statement_link(STATEMENT_ORE));

    let known = [
        normalise_media_type(STATEMENT_ATOM),
        normalise_media_type(STATEMENT_ORE),
    ];
    for link in receipt.statement_links() {
        let media_type = link.media_type.as_deref().unwrap_or("unknown type");
        if !known.contains(&normalise_media_type(media_type)) {
            push_line(&mut out, &format!("Statement link ({media_type})"), &link.href);
        }
    }

    push_link(&mut out, "Content link", receipt.content_link.as_ref());
    push_link(&mut out, "Edit link", receipt.edit_link());
    push_link(&mut out, "SWORD edit link", receipt.sword_edit_link());
    push_link(&mut out, "Splash page link", receipt.splash_page_link());
    if !receipt.packaging.is_empty() {
        push_line(&mut out, "Packaging", &receipt.packaging.join(", "));
    }
    if let Some(treatment) = &receipt.treatment {
        push_line(&mut out, "Status description", treatment);
    }
    out
}

/// Numbered listing shown before asking for a collection index.
pub fn format_collections(collections: &[Collection]) -> String {
    let mut out =
        String::from("The available collections and their allowed package types are:\n");
    for (index, collection) in collections.iter().enumerate() {
        let packaging = collection
            .accepted_packaging
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!(
            "{index}: {} - {} ({packaging})\n",
            collection.title,
            collection.description.as_deref().unwrap_or(""),
        ));
    }
    out
}

pub fn format_batch_summary(report: &BatchReport) -> String {
    format!(
        "Successfully imported {} files and encountered {} failures",
        report.imported(),
        report.failed_count()
    )
}
