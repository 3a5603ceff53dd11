//! Ecosystem product allowlist
//!
//! Names of third-party integration products are exempt from brand aliasing:
//! their presence in field names signals an integration requirement, which
//! is transferable structural knowledge, not identifying information.

/// Known ecosystem / AppExchange product names (lowercase)
pub const ECOSYSTEM_PRODUCTS: &[&str] = &[
    // Marketing automation
    "marketo", "mkto", "pardot", "eloqua", "hubspot", "mailchimp", "exacttarget",
    // ABM / Intent
    "demandbase", "6sense", "bombora", "terminus", "rollworks", "triblio",
    // Data enrichment / Intelligence
    "zoominfo", "clearbit", "dnb", "hoovers", "leadiq", "lusha", "apollo", "cognism",
    "seamless", "slintel",
    // Sales engagement
    "outreach", "salesloft", "gong", "chorus", "clari", "groove", "xactly", "velocify",
    "ringdna", "orum",
    // CPQ / Billing / Documents
    "conga", "apttus", "docusign", "pandadoc", "zuora", "chargebee", "recurly", "avalara",
    "echosign", "hellosign", "formstack", "netdocuments",
    // Integration / iPaaS
    "mulesoft", "jitterbit", "informatica", "talend", "workato", "tray", "celigo", "boomi",
    "snaplogic",
    // Social / Communication
    "linkedin", "slack", "twilio", "sendgrid", "ringcentral", "vonage", "plivo", "talkdesk",
    // Support / Service
    "zendesk", "freshdesk", "intercom", "drift", "qualified", "livechat",
    // Analytics / BI
    "tableau", "domo", "looker", "powerbi", "qlik", "sisense",
    // Project / Collaboration
    "jira", "asana", "smartsheet", "wrike", "basecamp", "confluence", "notion",
    // ERP / Finance
    "netsuite", "quickbooks", "xero", "intacct", "workday", "coupa", "ariba", "expensify",
    // Data quality / Enablement
    "ringlead", "cloudingo", "validity", "showpad", "highspot", "seismic", "calendly",
    // Managed package namespace prefixes (namespace__Field__c)
    "npsp", "npe", "hed", "sfims", "dlrs", "bizible", "bizible2", "bizibleid", "mkto_si",
    "mkto71", "x6sense", "lsf", "sked", "cventsfdc", "rh2", "lnt", "dozisf", "zvc",
];

/// Check whether a token matches or contains a known ecosystem product
///
/// Matches `BizibleId` (contains "bizible"), `SyncToMarketo` (contains
/// "marketo"), `mkto_si` (exact), `X6sense` (contains "6sense"). Containment
/// requires the product name to be at least 4 characters so short prefixes
/// do not trigger false matches.
pub fn is_ecosystem_term(token: &str) -> bool {
    let lower = token.to_lowercase();
    if ECOSYSTEM_PRODUCTS.contains(&lower.as_str()) {
        return true;
    }
    ECOSYSTEM_PRODUCTS
        .iter()
        .any(|product| product.len() >= 4 && lower.contains(product))
}
