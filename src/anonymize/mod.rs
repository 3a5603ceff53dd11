//! Anonymization pipeline for normalized metadata trees
//!
//! A fixed ordered sequence of passes produces a new tree (input is never
//! mutated) plus a change log:
//!
//! 1. **Identifier scrub** — record IDs, emails, URLs, IPs, phone numbers,
//!    amounts and dates become fixed placeholders; free-form content
//!    attributes are reduced to length-preserving placeholders.
//! 2. **Heuristic brand aliasing** — tokens that look like product or
//!    company names get sequential `Brand_*` aliases in first-seen order.
//! 3. **Dictionary aliasing** — known organization names are aliased the
//!    same way even without brand casing.
//! 4. The **ecosystem allowlist** exempts integration product names from
//!    passes 2 and 3 throughout.
//!
//! The heuristic pass is best-effort, not a completeness guarantee: the
//! pipeline's contract is that no pass-1 pattern match and no
//! non-allowlisted dictionary entry survives, and [`Anonymizer::residue`]
//! reports anything that slipped through so callers can log it. Re-running
//! the pipeline on its own output records zero changes.

pub mod brands;
pub mod dictionary;
pub mod ecosystem;
pub mod patterns;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::MetaNode;

use brands::{classify_token, namespace_of, AliasSource, AliasTable, TOKEN_RE};
use dictionary::is_known_organization;
use ecosystem::is_ecosystem_term;
use patterns::{has_residue, scrub_identifiers, CONTENT_KEYS};

/// Which pass produced a change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrubPass {
    Identifier,
    ContentMask,
    HeuristicAlias,
    DictionaryAlias,
}

/// One recorded change, for diagnostics only (never persisted)
#[derive(Debug, Clone)]
pub struct ScrubChange {
    pub pass: ScrubPass,
    /// "<node kind>.<attribute>" where the change happened
    pub location: String,
    pub detail: String,
}

/// Values already reduced to a content mask, e.g. `[LABEL:12chars]`
static MASKED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[[A-Z]+:\d+chars\]$").expect("mask regex"));

/// Per-run anonymizer holding the alias table
///
/// One instance serves a whole ingestion run, so a raw token aliased in one
/// document keeps its alias in every later document of that run. Aliases
/// are not stable across runs.
#[derive(Debug, Default)]
pub struct Anonymizer {
    aliases: AliasTable,
}

impl Anonymizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the alias table with caller-provided terms
    pub fn with_terms(terms: &[String]) -> Self {
        let mut anonymizer = Self::new();
        for term in terms {
            let term = term.trim();
            if !term.is_empty() {
                anonymizer.aliases.assign(term);
            }
        }
        anonymizer
    }

    /// Auto-detect likely brand terms from custom field names and seed the
    /// alias table
    ///
    /// `field_names` entries look like `Account.AcmeCloud_Score__c` (or a
    /// bare field name). Three signals, mirroring the ingestion pre-scan:
    /// a candidate prefix seen on two or more objects, a managed-package
    /// namespace, or a dictionary hit on any segment.
    pub fn seed_from_field_names(&mut self, field_names: &[String]) -> Vec<String> {
        let mut prefix_objects: Vec<(String, Vec<String>)> = Vec::new();
        let mut namespaces: Vec<String> = Vec::new();
        let mut dict_matches: Vec<String> = Vec::new();

        for entry in field_names {
            let (object, field) = match entry.split_once('.') {
                Some((object, field)) => (object, field),
                None => ("Unknown", entry.as_str()),
            };
            if !field.ends_with("__c") && !field.ends_with("__r") {
                continue;
            }

            // Managed package namespace (acme__Score__c)
            if let Some(namespace) = namespace_of(field) {
                if brands::looks_like_brand(&namespace) && !namespaces.contains(&namespace) {
                    namespaces.push(namespace);
                }
                continue;
            }

            let bare = field.trim_end_matches("__c").trim_end_matches("__r");
            let segments: Vec<&str> = bare.split('_').filter(|s| !s.is_empty()).collect();

            for (i, segment) in segments.iter().enumerate() {
                let min_len = if i == 0 { 4 } else { 5 };
                if segment.len() >= min_len
                    && classify_token(segment) == Some(AliasSource::Heuristic)
                {
                    match prefix_objects.iter_mut().find(|(t, _)| t == segment) {
                        Some((_, objects)) => {
                            if !objects.iter().any(|o| o == object) {
                                objects.push(object.to_string());
                            }
                        }
                        None => {
                            prefix_objects.push((segment.to_string(), vec![object.to_string()]))
                        }
                    }
                }
                if is_known_organization(segment)
                    && !is_ecosystem_term(segment)
                    && !dict_matches.iter().any(|m| m == segment)
                {
                    dict_matches.push(segment.to_string());
                }
            }
        }

        let mut detected = Vec::new();
        // Heuristic prefixes need corroboration across objects
        for (term, objects) in &prefix_objects {
            if objects.len() >= 2 {
                detected.push(term.clone());
            }
        }
        detected.extend(namespaces);
        detected.extend(dict_matches);

        let mut seeded = Vec::new();
        for term in detected {
            if self.aliases.get(&term).is_none() {
                self.aliases.assign(&term);
                seeded.push(term);
            }
        }
        seeded
    }

    /// Number of alias assignments made so far in this run
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    /// Run the full pipeline over a tree
    ///
    /// Returns the anonymized tree and the change log. The input is left
    /// untouched.
    pub fn scrub_tree(&mut self, root: &MetaNode) -> (MetaNode, Vec<ScrubChange>) {
        let mut changes = Vec::new();

        // Pass 1: identifier scrub + content masking
        let scrubbed = self.pass_identifiers(root, true, &mut changes);

        // Pass 2: heuristic aliasing (also applies already-assigned aliases)
        let aliased = self.pass_alias(&scrubbed, AliasSource::Heuristic, &mut changes);

        // Pass 3: dictionary aliasing
        let result = self.pass_alias(&aliased, AliasSource::Dictionary, &mut changes);

        (result, changes)
    }

    fn pass_identifiers(
        &self,
        node: &MetaNode,
        is_root: bool,
        changes: &mut Vec<ScrubChange>,
    ) -> MetaNode {
        let mut out = MetaNode::new(node.kind.clone());

        for (key, value) in &node.attrs {
            // The root's label is the document's display name; it is
            // scrubbed and aliased rather than masked so the catalog keeps
            // a usable pattern name.
            let mask_content = CONTENT_KEYS.contains(key.as_str()) && !(is_root && key == "label");
            if mask_content {
                if MASKED_RE.is_match(value) {
                    out.attrs.insert(key.clone(), value.clone());
                } else {
                    let masked = format!("[{}:{}chars]", key.to_uppercase(), value.chars().count());
                    changes.push(ScrubChange {
                        pass: ScrubPass::ContentMask,
                        location: format!("{}.{}", node.kind, key),
                        detail: masked.clone(),
                    });
                    out.attrs.insert(key.clone(), masked);
                }
                continue;
            }

            let (scrubbed, count) = scrub_identifiers(value);
            if count > 0 {
                changes.push(ScrubChange {
                    pass: ScrubPass::Identifier,
                    location: format!("{}.{}", node.kind, key),
                    detail: format!("{count} identifier(s) replaced"),
                });
            }
            out.attrs.insert(key.clone(), scrubbed);
        }

        for child in &node.children {
            out.push_child(self.pass_identifiers(child, false, changes));
        }
        out
    }

    fn pass_alias(
        &mut self,
        node: &MetaNode,
        source: AliasSource,
        changes: &mut Vec<ScrubChange>,
    ) -> MetaNode {
        let mut out = MetaNode::new(node.kind.clone());

        for (key, value) in &node.attrs {
            let aliased = self.alias_string(value, source, &node.kind, key, changes);
            out.attrs.insert(key.clone(), aliased);
        }
        for child in &node.children {
            out.push_child(self.pass_alias(child, source, changes));
        }
        out
    }

    /// Replace aliasable tokens within one string
    ///
    /// A term already in the table is replaced wherever it appears. New
    /// heuristic assignments only happen inside custom-field identifiers
    /// (values carrying a `__c`/`__r` suffix), where mixed-case segments
    /// are org vocabulary rather than platform vocabulary; dictionary
    /// assignments apply anywhere.
    fn alias_string(
        &mut self,
        value: &str,
        source: AliasSource,
        kind: &str,
        key: &str,
        changes: &mut Vec<ScrubChange>,
    ) -> String {
        let field_context = value.contains("__c") || value.contains("__r");
        let mut result = String::with_capacity(value.len());
        let mut last = 0;

        for token_match in TOKEN_RE.find_iter(value) {
            result.push_str(&value[last..token_match.start()]);
            let token = token_match.as_str();

            let assignable = match source {
                AliasSource::Heuristic => field_context,
                _ => true,
            };
            let alias = if let Some(existing) = self.aliases.get(token) {
                // Known term (seeded or aliased earlier); applied in the
                // first alias pass that sees it
                Some(existing.to_string())
            } else if assignable && classify_token(token) == Some(source) {
                Some(self.aliases.assign(token))
            } else {
                None
            };

            match alias {
                Some(alias) => {
                    changes.push(ScrubChange {
                        pass: match source {
                            AliasSource::Dictionary => ScrubPass::DictionaryAlias,
                            _ => ScrubPass::HeuristicAlias,
                        },
                        location: format!("{kind}.{key}"),
                        detail: format!("{token} -> {alias}"),
                    });
                    result.push_str(&alias);
                }
                None => result.push_str(token),
            }
            last = token_match.end();
        }
        result.push_str(&value[last..]);
        result
    }

    /// Post-pipeline contract check: anything a pass should have removed
    ///
    /// Returns a description per offending attribute. Findings are logged
    /// by callers, never treated as fatal.
    pub fn residue(&self, root: &MetaNode) -> Vec<String> {
        let mut findings = Vec::new();
        root.walk(&mut |node| {
            for (key, value) in &node.attrs {
                if has_residue(value) {
                    findings.push(format!("{}.{}: unscrubbed identifier", node.kind, key));
                }
                for token_match in TOKEN_RE.find_iter(value) {
                    let token = token_match.as_str();
                    if is_known_organization(token) && !is_ecosystem_term(token) {
                        findings.push(format!(
                            "{}.{}: organization name \"{}\" survived",
                            node.kind, key, token
                        ));
                    }
                }
            }
        });
        findings
    }
}
