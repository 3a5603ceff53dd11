//! Structured-identifier scrub patterns
//!
//! Pass 1 of the anonymization pipeline: every match of a configured
//! pattern is replaced with a fixed category placeholder. Total and
//! deterministic. Placeholders themselves never re-match any pattern, so
//! the pass is idempotent.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder for Salesforce record identifiers
pub const RECORD_ID_PLACEHOLDER: &str = "[RECORD_ID]";
pub const EMAIL_PLACEHOLDER: &str = "[EMAIL]";
pub const URL_PLACEHOLDER: &str = "[URL]";
pub const IP_PLACEHOLDER: &str = "[IP]";
pub const PHONE_PLACEHOLDER: &str = "[PHONE]";
pub const AMOUNT_PLACEHOLDER: &str = "[AMOUNT]";
pub const DATE_PLACEHOLDER: &str = "[DATE]";

/// Attribute keys whose values are free-form content: reduced to a
/// length-preserving placeholder instead of being carried through
pub static CONTENT_KEYS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "errorMessage",
        "description",
        "label",
        "helpText",
        "inputText",
        "outputText",
        "choiceText",
        "interviewLabel",
    ]
    .into_iter()
    .collect()
});

/// Candidate record IDs: 15 or 18 alphanumeric chars (prefix-checked below)
static RECORD_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[a-zA-Z0-9]{15}(?:[a-zA-Z0-9]{3})?\b").expect("record id regex"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("email regex")
});

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)https?://[^\s<>"']+"#).expect("url regex"));

static IP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").expect("ip regex"));

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\+?1[-. ])?\(?\d{3}\)?[-. ]\d{3}[-. ]\d{4}\b").expect("phone regex")
});

static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$[\d,]+\.?\d*").expect("amount regex"));

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{4}-\d{2}-\d{2}(?:T\d{2}:\d{2}:\d{2}(?:\.\d+)?Z?)?\b").expect("date regex")
});

/// Record ID key prefixes (standard object key spaces plus custom-object a0..a3)
static RECORD_ID_PREFIXES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "001", "003", "005", "006", "00Q", "00D", "00e", "00G", "00I", "012", "015", "01I", "01p",
        "01q", "01s", "01t", "01Z", "02i", "02s", "035", "03d", "04t", "050", "058", "068", "069",
        "07M", "08s", "0Af", "0AP", "500", "570", "701", "800", "801",
    ]
    .into_iter()
    .collect()
});

/// Check whether a candidate string is shaped like a record identifier
pub fn looks_like_record_id(value: &str) -> bool {
    if value.len() != 15 && value.len() != 18 {
        return false;
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    let prefix = &value[..3];
    RECORD_ID_PREFIXES.contains(prefix)
        || matches!(&prefix[..2], "a0" | "a1" | "a2" | "a3")
}

/// Apply every structured-identifier pattern to a string
///
/// Returns the scrubbed string and how many replacements were made.
pub fn scrub_identifiers(value: &str) -> (String, usize) {
    if value.len() < 3 {
        return (value.to_string(), 0);
    }

    let mut changes = 0usize;

    // Record IDs need the prefix check, so the candidate regex alone
    // cannot decide
    let result = RECORD_ID_RE.replace_all(value, |caps: &regex::Captures| {
        let candidate = &caps[0];
        if looks_like_record_id(candidate) {
            changes += 1;
            RECORD_ID_PLACEHOLDER.to_string()
        } else {
            candidate.to_string()
        }
    });

    let mut result = result.into_owned();
    for (re, placeholder) in [
        (&*EMAIL_RE, EMAIL_PLACEHOLDER),
        (&*URL_RE, URL_PLACEHOLDER),
        (&*IP_RE, IP_PLACEHOLDER),
        (&*PHONE_RE, PHONE_PLACEHOLDER),
        (&*AMOUNT_RE, AMOUNT_PLACEHOLDER),
        (&*DATE_RE, DATE_PLACEHOLDER),
    ] {
        let replaced = re.replace_all(&result, placeholder);
        if let std::borrow::Cow::Owned(owned) = replaced {
            changes += re.find_iter(&result).count();
            result = owned;
        }
    }

    (result, changes)
}

/// Check whether a string still contains any scrubbable identifier
///
/// Used by the post-pipeline contract check.
pub fn has_residue(value: &str) -> bool {
    if EMAIL_RE.is_match(value)
        || URL_RE.is_match(value)
        || IP_RE.is_match(value)
        || PHONE_RE.is_match(value)
        || AMOUNT_RE.is_match(value)
        || DATE_RE.is_match(value)
    {
        return true;
    }
    RECORD_ID_RE
        .find_iter(value)
        .any(|m| looks_like_record_id(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_prefix_check() {
        assert!(looks_like_record_id("0012w00001abcDE"));
        assert!(looks_like_record_id("a0B2w00000xyzKLMNO"));
        // Right length, unknown prefix
        assert!(!looks_like_record_id("zzz2w00001abcDE"));
        assert!(!looks_like_record_id("short"));
    }

    #[test]
    fn test_scrub_replaces_all_categories() {
        let (out, changes) = scrub_identifiers(
            "Contact ops@example.com or https://internal.example.com, ship by 2024-03-01 for $1,200.50",
        );
        assert!(out.contains(EMAIL_PLACEHOLDER));
        assert!(out.contains(URL_PLACEHOLDER));
        assert!(out.contains(DATE_PLACEHOLDER));
        assert!(out.contains(AMOUNT_PLACEHOLDER));
        assert!(!out.contains("example.com"));
        assert!(changes >= 4);
    }

    #[test]
    fn test_scrub_record_id_in_text() {
        let (out, _) = scrub_identifiers("owner 0052w00000AbCdE escalated");
        assert_eq!(out, format!("owner {RECORD_ID_PLACEHOLDER} escalated"));
    }

    #[test]
    fn test_scrub_is_idempotent() {
        let (first, _) = scrub_identifiers("mail ops@example.com on 2024-01-15");
        let (second, changes) = scrub_identifiers(&first);
        assert_eq!(first, second);
        assert_eq!(changes, 0);
    }

    #[test]
    fn test_phone_scrubbed() {
        let (out, _) = scrub_identifiers("call 415-555-0143 today");
        assert!(out.contains(PHONE_PLACEHOLDER), "{out}");
    }

    #[test]
    fn test_field_names_untouched() {
        let (out, changes) = scrub_identifiers("AcmeCloud_Customer_Status__c");
        assert_eq!(out, "AcmeCloud_Customer_Status__c");
        assert_eq!(changes, 0);
    }

    #[test]
    fn test_residue_detection() {
        assert!(has_residue("leftover ops@example.com"));
        assert!(!has_residue("clean [EMAIL] text"));
    }
}
