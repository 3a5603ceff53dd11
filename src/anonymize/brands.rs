//! Brand detection and aliasing
//!
//! Passes 2 and 3 of the anonymization pipeline. Organization-specific
//! tokens are replaced with sequential generic aliases (`Brand_A`,
//! `Brand_B`, ...). The alias table is keyed by the raw token (case
//! folded), assigned in first-seen order, and lives for one ingestion run:
//! the same raw token always maps to the same alias within a run, and runs
//! make no cross-run stability promise.
//!
//! Detection is best-effort by design. The casing heuristic flags tokens
//! that look like product or company names (inner capitals, ALLCAPS runs,
//! letter+digit mixes) and the dictionary pass catches known organization
//! names that the heuristic misses. Ecosystem product names are exempt.

use once_cell::sync::Lazy;
use regex::Regex;

use super::dictionary::is_known_organization;
use super::ecosystem::is_ecosystem_term;

/// Identifier-shaped tokens within a string
pub static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z][A-Za-z0-9]*").expect("token regex"));

static INNER_CAMEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z][A-Z]").expect("camel regex"));
static ALLCAPS_LOWER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Z]{2,}[a-z]").expect("allcaps regex"));
static NAMESPACE_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+?)__(\w+)__[cr]$").expect("namespace regex"));

/// How a token came to be aliased
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasSource {
    /// Seeded explicitly by the caller
    Custom,
    /// Flagged by the casing heuristic
    Heuristic,
    /// Matched the known-organization dictionary
    Dictionary,
}

/// Insertion-ordered alias table: raw token -> generic label
#[derive(Debug, Default)]
pub struct AliasTable {
    /// (lowercased raw token, alias), in assignment order
    entries: Vec<(String, String)>,
}

impl AliasTable {
    /// Look up the alias for a token, if one was assigned
    pub fn get(&self, token: &str) -> Option<&str> {
        let lower = token.to_lowercase();
        self.entries
            .iter()
            .find(|(raw, _)| *raw == lower)
            .map(|(_, alias)| alias.as_str())
    }

    /// Assign the next sequential alias to a token, or return the existing
    /// one. Assignment order is strictly first-seen.
    pub fn assign(&mut self, token: &str) -> String {
        let lower = token.to_lowercase();
        if let Some((_, alias)) = self.entries.iter().find(|(raw, _)| *raw == lower) {
            return alias.clone();
        }
        let alias = generic_label(self.entries.len() + 1);
        self.entries.push((lower, alias.clone()));
        alias
    }

    /// Number of aliased tokens
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of (raw token, alias) pairs in assignment order
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }
}

/// Generate a generic label: Brand_A .. Brand_Z, then Brand_27, Brand_28, ...
pub fn generic_label(n: usize) -> String {
    if (1..=26).contains(&n) {
        format!("Brand_{}", (b'@' + n as u8) as char)
    } else {
        format!("Brand_{n}")
    }
}

/// Check if a token looks like a product/company name rather than a
/// descriptive field name
///
/// Conservative: flags only tokens with clear brand indicators (inner
/// capitals, ALLCAPS-to-lowercase, letters mixed with digits), then rejects
/// compounds that decompose entirely into common vocabulary (so
/// `IsAPastUser` and `CreatedById` survive while `AcmeCloud` is flagged).
pub fn looks_like_brand(token: &str) -> bool {
    // Aliases themselves are not candidates
    if token.starts_with("Brand_") {
        return false;
    }

    let has_camel = INNER_CAMEL_RE.is_match(token);
    let has_allcaps_lower = ALLCAPS_LOWER_RE.is_match(token) && token.len() >= 6;
    let has_mixed_digits = token.chars().any(|c| c.is_ascii_alphabetic())
        && token.chars().any(|c| c.is_ascii_digit());

    if !(has_camel || has_allcaps_lower || has_mixed_digits) {
        return false;
    }

    if has_camel || has_allcaps_lower {
        let parts = camel_parts(token);
        if parts.len() >= 2 {
            let common = parts
                .iter()
                .filter(|p| p.len() <= 1 || is_common_word(&p.to_lowercase()))
                .count();
            if common == parts.len() {
                return false;
            }
        }
    }

    true
}

/// Split a CamelCase token into its sub-words
///
/// `CreatedById` -> [Created, By, Id]; `ABCCorp` -> [ABC, Corp].
fn camel_parts(token: &str) -> Vec<String> {
    let chars: Vec<char> = token.chars().collect();
    let mut parts = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && !current.is_empty() {
            let prev_lower = chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit();
            let next_lower = i + 1 < chars.len() && chars[i + 1].is_ascii_lowercase();
            let prev_upper = chars[i - 1].is_ascii_uppercase();
            if prev_lower || (prev_upper && next_lower) {
                parts.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Decide whether (and why) a token should be aliased
///
/// The ecosystem allowlist exempts integration product names from both the
/// heuristic and the dictionary.
pub fn classify_token(token: &str) -> Option<AliasSource> {
    if token.len() < 4 || is_ecosystem_term(token) || is_common_word(&token.to_lowercase()) {
        return None;
    }
    if is_known_organization(token) {
        return Some(AliasSource::Dictionary);
    }
    if looks_like_brand(token) {
        return Some(AliasSource::Heuristic);
    }
    None
}

/// Extract the managed-package namespace from a field name like
/// `acme__Score__c`, if it is not an ecosystem namespace
pub fn namespace_of(field_name: &str) -> Option<String> {
    let caps = NAMESPACE_FIELD_RE.captures(field_name)?;
    let namespace = caps[1].to_string();
    if is_ecosystem_term(&namespace) || is_common_word(&namespace.to_lowercase()) {
        return None;
    }
    Some(namespace)
}

/// Common words that appear in field names; compounds of these are
/// descriptive, not brands
pub fn is_common_word(word: &str) -> bool {
    COMMON_FIELD_WORDS.contains(&word)
}

const COMMON_FIELD_WORDS: &[&str] = &[
    // Verbs
    "is", "has", "can", "do", "get", "set", "add", "run", "show", "hide", "send", "sync", "find",
    "check", "create", "update", "delete", "merge", "convert", "assign", "match", "evaluate",
    "calculate", "resolve", "start", "stop", "close", "open", "lock", "unlock", "submit",
    "approve", "reject", "cancel", "complete", "process", "handle", "trigger", "bypass",
    "override",
    // Adjectives / state
    "new", "old", "past", "current", "previous", "next", "prior", "last", "first", "active",
    "inactive", "primary", "secondary", "default", "custom", "standard", "manual", "auto", "mass",
    "bulk", "no", "longer", "within", "target", "matching", "linked", "related", "associated",
    "main", "won", "lost", "true", "false", "yes", "null", "blank", "empty",
    // Nouns common in field names
    "account", "contact", "lead", "opportunity", "case", "task", "event", "user", "role",
    "profile", "group", "team", "queue", "member", "company", "person", "persona", "firm", "org",
    "organization", "customer", "prospect", "partner", "vendor", "name", "date", "time", "type",
    "status", "stage", "step", "phase", "score", "rating", "tier", "level", "count", "total",
    "sum", "avg", "min", "max", "amount", "number", "record", "field", "value", "key", "index",
    "code", "email", "phone", "address", "city", "state", "country", "street", "zip", "postal",
    "job", "title", "department", "division", "region", "territory", "info", "data", "note",
    "notes", "detail", "details", "url", "link", "path", "source", "ref", "reference", "id",
    "ids", "by", "at", "to", "for", "of", "in", "on", "from", "with", "the", "and", "not",
    "parent", "child", "request", "response", "approval", "rejection", "exception", "error",
    "warning", "alert", "message", "notification",
    // Time-related
    "month", "year", "day", "week", "hour", "quarter", "annual", "monthly", "weekly", "daily",
    "quarterly", "created", "modified", "updated", "started", "ended", "closed",
    // Platform-specific
    "relationship", "lookup", "master", "detail", "junction", "rollup", "formula", "workflow",
    "permission", "sharing", "security", "owner", "manager", "admin", "system", "billing",
    "shipping", "mailing", "physical", "flow", "automation", "rule", "action", "validation",
    "summary", "report", "dashboard", "integration", "migration", "batch", "campaign",
    "contract", "order", "product", "quote", "revenue", "profit", "cost", "price", "discount",
    "marketing", "sales", "service", "support", "operations", "onboarding", "trial",
    "subscription", "license", "renewal", "enterprise", "professional", "basic", "premium",
    "insert", "upsert", "before", "after", "save", "self", "config", "setting", "boundary",
    "round", "robin", "software", "payments", "platform", "app", "application", "mql", "sql",
    "sal", "bdr", "sdr", "rep",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_labels() {
        assert_eq!(generic_label(1), "Brand_A");
        assert_eq!(generic_label(2), "Brand_B");
        assert_eq!(generic_label(26), "Brand_Z");
        assert_eq!(generic_label(27), "Brand_27");
    }

    #[test]
    fn test_alias_table_first_seen_order() {
        let mut table = AliasTable::default();
        assert_eq!(table.assign("AcmeCloud"), "Brand_A");
        assert_eq!(table.assign("WidgetCo"), "Brand_B");
        // Same raw token, same alias, any casing
        assert_eq!(table.assign("acmecloud"), "Brand_A");
        assert_eq!(table.get("ACMECLOUD"), Some("Brand_A"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_brand_heuristic_flags_camel_compounds() {
        assert!(looks_like_brand("AcmeCloud"));
        assert!(looks_like_brand("AffiniPay"));
        assert!(looks_like_brand("NovaTech"));
        assert!(looks_like_brand("bizible2"));
    }

    #[test]
    fn test_brand_heuristic_rejects_descriptive_names() {
        assert!(!looks_like_brand("IsAPastUser"));
        assert!(!looks_like_brand("CreatedById"));
        assert!(!looks_like_brand("PastAccount"));
        assert!(!looks_like_brand("customer"));
        // Aliases never re-trigger
        assert!(!looks_like_brand("Brand_A"));
    }

    #[test]
    fn test_classify_token_sources() {
        assert_eq!(classify_token("AcmeCloud"), Some(AliasSource::Heuristic));
        // Dictionary hit without brand casing
        assert_eq!(classify_token("snowflake"), Some(AliasSource::Dictionary));
        // Allowlisted ecosystem product
        assert_eq!(classify_token("Marketo"), None);
        assert_eq!(classify_token("BizibleId"), None);
        // Too short / common
        assert_eq!(classify_token("Sum"), None);
        assert_eq!(classify_token("Account"), None);
    }

    #[test]
    fn test_camel_parts() {
        assert_eq!(camel_parts("CreatedById"), vec!["Created", "By", "Id"]);
        assert_eq!(camel_parts("IsAPastUser"), vec!["Is", "A", "Past", "User"]);
        assert_eq!(camel_parts("ABCCorp"), vec!["ABC", "Corp"]);
        assert_eq!(camel_parts("simple"), vec!["simple"]);
    }

    #[test]
    fn test_namespace_extraction() {
        assert_eq!(namespace_of("acmeapp__Score__c"), Some("acmeapp".to_string()));
        assert_eq!(namespace_of("mkto_si__Lead_Score__c"), None);
        assert_eq!(namespace_of("Total__c"), None);
    }
}
