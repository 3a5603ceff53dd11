//! Known organization-name dictionary
//!
//! A maintained list of company and organization names that must be aliased
//! even when they do not trip the casing heuristic (e.g. all-lowercase
//! namespace-style tokens). The upstream corpus for a full deployment is a
//! company-name database (SEC filings, Fortune 1000, agencies); this module
//! ships a curated subset and the lookup used by the aliasing pass.

use std::collections::HashSet;

use once_cell::sync::Lazy;

/// Curated known-organization names (lowercase)
const KNOWN_ORGANIZATIONS: &[&str] = &[
    "affinipay", "accenture", "adobe", "airbnb", "allstate", "amazon", "amgen", "aramark",
    "atlassian", "autodesk", "blackrock", "boeing", "caterpillar", "chevron", "cigna", "cisco",
    "citigroup", "cloudflare", "comcast", "costco", "cummins", "deloitte", "disney", "doordash",
    "dropbox", "ebay", "equifax", "ericsson", "exxon", "fedex", "fidelity", "gartner",
    "genentech", "goldman", "google", "halliburton", "honeywell", "humana", "ibm", "instacart",
    "intuit", "kaiser", "kellogg", "kroger", "lockheed", "lyft", "mckesson", "mckinsey",
    "medtronic", "microsoft", "morganstanley", "nasdaq", "netflix", "nike", "nordstrom",
    "novartis", "nvidia", "oracle", "paypal", "pepsico", "pfizer", "progressive", "prudential",
    "qualcomm", "raytheon", "robinhood", "roche", "salesforce", "schwab", "shopify", "siemens",
    "snowflake", "spacex", "spotify", "squarespace", "staples", "starbucks", "statefarm",
    "stripe", "target", "tesla", "travelers", "uber", "unilever", "verizon", "visa", "walgreens",
    "walmart", "wayfair", "wellsfargo", "zillow", "zoom",
];

static LOOKUP: Lazy<HashSet<&'static str>> =
    Lazy::new(|| KNOWN_ORGANIZATIONS.iter().copied().collect());

/// Check whether a token is a known organization name
pub fn is_known_organization(token: &str) -> bool {
    LOOKUP.contains(token.to_lowercase().as_str())
}

/// All dictionary entries found as whole tokens inside a text
pub fn organization_matches(tokens: &[&str]) -> Vec<String> {
    tokens
        .iter()
        .filter(|t| is_known_organization(t))
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_organization_case_insensitive() {
        assert!(is_known_organization("AffiniPay"));
        assert!(is_known_organization("affinipay"));
        assert!(is_known_organization("Snowflake"));
        assert!(!is_known_organization("WidgetCo"));
    }

    #[test]
    fn test_matches_whole_tokens() {
        let tokens = vec!["Stripe", "Customer", "Status"];
        assert_eq!(organization_matches(&tokens), vec!["Stripe"]);
    }
}
