//! Identifier extraction from captured script output.
//!
//! The step scripts report results as free-form text, so extraction is a
//! best-effort scan: line-label matches for values the scripts print
//! deliberately, token regexes for identifiers with a known shape. Absence
//! is always `None`, never an error; callers decide whether a missing value
//! aborts their step.

use regex::Regex;
use std::sync::LazyLock;

static OFFER_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"offer-[a-z0-9]+").expect("regex for offer ids"));
static OPPORTUNITY_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"O\d+").expect("regex for opportunity ids"));
static SOLUTION_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"S-\d+").expect("regex for solution ids"));
static OFFER_ARN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"arn:aws:aws-marketplace:[^"\s]+"#).expect("regex for offer arns")
});

/// First line containing `label`, returning the trimmed remainder after the
/// label (with a leading `:` stripped). Empty remainders count as absent.
pub fn labeled_value(text: &str, label: &str) -> Option<String> {
    for line in text.lines() {
        if let Some(idx) = line.find(label) {
            let rest = line[idx + label.len()..].trim_start_matches(':').trim();
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
        }
    }
    None
}

fn regex_on_marked_lines(text: &str, markers: &[&str], regex: &Regex) -> Option<String> {
    for line in text.lines() {
        if markers.iter().any(|marker| line.contains(marker)) {
            if let Some(found) = regex.find(line) {
                return Some(found.as_str().to_string());
            }
        }
    }
    None
}

/// Changeset id as printed by the start-changeset scripts.
pub fn changeset_id(text: &str) -> Option<String> {
    labeled_value(text, "ChangeSet ID:").or_else(|| labeled_value(text, "CHANGESET_ID"))
}

/// Product id from describe output; only `prod-` values qualify.
pub fn product_id(text: &str) -> Option<String> {
    labeled_value(text, "Product ID:")
        .or_else(|| labeled_value(text, "PRODUCT_ID"))
        .filter(|value| value.starts_with("prod-"))
}

/// Offer id token on lines that mention an offer.
pub fn offer_id(text: &str) -> Option<String> {
    regex_on_marked_lines(text, &["Offer ID:", "offer-"], &OFFER_ID_RE)
}

/// Opportunity id on the create-opportunity response lines.
pub fn opportunity_id(text: &str) -> Option<String> {
    regex_on_marked_lines(text, &["\"Id\":", "Opportunity ID:"], &OPPORTUNITY_ID_RE)
}

/// Solution id as reported by the list-solutions script.
pub fn solution_id(text: &str) -> Option<String> {
    regex_on_marked_lines(text, &["SOLUTION_ID", "Solution ID:"], &SOLUTION_ID_RE)
}

/// Marketplace offer ARN from describe-offer output.
pub fn offer_arn(text: &str) -> Option<String> {
    regex_on_marked_lines(text, &["EntityArn", "OfferArn"], &OFFER_ARN_RE)
}

/// Changeset status token from describe output.
pub fn status(text: &str) -> Option<String> {
    labeled_value(text, "Status:")
}
