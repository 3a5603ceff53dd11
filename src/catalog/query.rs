//! Filtered, paginated, and ranked catalog queries
//!
//! Structured filters are ANDed in SQL. Free-text ranking is a contract:
//! exact matches on name/tags outrank prefix matches, which outrank
//! partial token matches; ties break by use count descending, then id
//! ascending. The FTS index widens partial-match recall beyond plain
//! substring containment.

use std::collections::HashSet;

use rusqlite::params;

use crate::error::{OrgMineError, Result};
use crate::schema::{Category, Pattern, PatternSummary};

use super::{row_to_pattern, CatalogStore, PATTERN_COLUMNS};

/// Page size ceiling, matching the external interface contract
pub const MAX_PAGE_SIZE: usize = 200;

/// Optional filters, combined with logical AND
#[derive(Debug, Clone)]
pub struct PatternFilter {
    pub category: Option<String>,
    pub pattern_type: Option<String>,
    pub source_object: Option<String>,
    pub min_complexity: Option<u8>,
    pub max_complexity: Option<u8>,
    pub favorited: Option<bool>,
    /// Free-text query over name/description/tags
    pub q: Option<String>,
    /// 1-based page number
    pub page: usize,
    pub page_size: usize,
}

impl Default for PatternFilter {
    fn default() -> Self {
        Self {
            category: None,
            pattern_type: None,
            source_object: None,
            min_complexity: None,
            max_complexity: None,
            favorited: None,
            q: None,
            page: 1,
            page_size: 50,
        }
    }
}

impl PatternFilter {
    /// Convenience constructor for a plain keyword search
    pub fn keyword(q: &str, page_size: usize) -> Self {
        Self {
            q: Some(q.to_string()),
            page_size,
            ..Self::default()
        }
    }

    /// Fail fast on malformed filters
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(OrgMineError::InvalidFilter { message });

        if self.page == 0 {
            return invalid("page must be >= 1".to_string());
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return invalid(format!("page_size must be 1..={MAX_PAGE_SIZE}"));
        }
        for (label, value) in [("min_complexity", self.min_complexity), ("max_complexity", self.max_complexity)] {
            if let Some(value) = value {
                if !(1..=5).contains(&value) {
                    return invalid(format!("{label} must be 1..=5, got {value}"));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min_complexity, self.max_complexity) {
            if min > max {
                return invalid(format!("complexity range {min}..{max} is inverted"));
            }
        }
        if let Some(category) = &self.category {
            if Category::from_label(category).is_none() {
                return invalid(format!("unknown category \"{category}\""));
            }
        }
        Ok(())
    }
}

/// One page of query results
#[derive(Debug, Clone, serde::Serialize)]
pub struct PatternPage {
    pub patterns: Vec<PatternSummary>,
    pub total: usize,
    pub page: usize,
    pub pages: usize,
}

/// Relevance tier for free-text ranking (higher is better)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchTier {
    None,
    Partial,
    Prefix,
    Exact,
}

impl CatalogStore {
    /// Run a filtered, paginated query
    pub fn query(&self, filter: &PatternFilter) -> Result<PatternPage> {
        filter.validate()?;

        let candidates = self.filtered_rows(filter)?;

        let ranked: Vec<&Pattern> = match filter.q.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => {
                let fts_hits = self.fts_ids(q)?;
                let mut scored: Vec<(MatchTier, &Pattern)> = candidates
                    .iter()
                    .filter_map(|p| {
                        let tier = match_tier(q, p, &fts_hits);
                        (tier != MatchTier::None).then_some((tier, p))
                    })
                    .collect();
                scored.sort_by(|(tier_a, a), (tier_b, b)| {
                    tier_b
                        .cmp(tier_a)
                        .then(b.use_count.cmp(&a.use_count))
                        .then(a.id.cmp(&b.id))
                });
                scored.into_iter().map(|(_, p)| p).collect()
            }
            _ => candidates.iter().collect(),
        };

        let total = ranked.len();
        let pages = total.div_ceil(filter.page_size).max(1);
        let start = (filter.page - 1) * filter.page_size;
        let patterns = ranked
            .into_iter()
            .skip(start)
            .take(filter.page_size)
            .map(|p| p.to_summary())
            .collect();

        Ok(PatternPage {
            patterns,
            total,
            page: filter.page,
            pages,
        })
    }

    /// Rows matching the structured (non-text) filters
    ///
    /// Default ordering, used when no free text is given: complexity
    /// descending, then name, then id.
    fn filtered_rows(&self, filter: &PatternFilter) -> Result<Vec<Pattern>> {
        let mut sql = format!("SELECT {PATTERN_COLUMNS} FROM patterns WHERE 1=1");
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(category) = &filter.category {
            let label = Category::from_label(category)
                .map(|c| c.label().to_string())
                .unwrap_or_else(|| category.clone());
            sql.push_str(" AND category = ?");
            args.push(Box::new(label));
        }
        if let Some(pattern_type) = &filter.pattern_type {
            sql.push_str(" AND pattern_type = ?");
            args.push(Box::new(pattern_type.clone()));
        }
        if let Some(source_object) = &filter.source_object {
            sql.push_str(" AND source_object = ?");
            args.push(Box::new(source_object.clone()));
        }
        if let Some(min) = filter.min_complexity {
            sql.push_str(" AND complexity_score >= ?");
            args.push(Box::new(min as i64));
        }
        if let Some(max) = filter.max_complexity {
            sql.push_str(" AND complexity_score <= ?");
            args.push(Box::new(max as i64));
        }
        if let Some(favorited) = filter.favorited {
            sql.push_str(" AND favorited = ?");
            args.push(Box::new(favorited));
        }
        sql.push_str(" ORDER BY complexity_score DESC, name ASC, id ASC");

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
            row_to_pattern,
        )?;
        let mut patterns = Vec::new();
        for row in rows {
            patterns.push(row?);
        }
        Ok(patterns)
    }

    /// Row ids matching the free-text query in the FTS index
    fn fts_ids(&self, q: &str) -> Result<HashSet<i64>> {
        let tokens: Vec<String> = q
            .split_whitespace()
            .map(|t| t.replace('"', ""))
            .filter(|t| !t.is_empty())
            .map(|t| format!("\"{t}\"*"))
            .collect();
        if tokens.is_empty() {
            return Ok(HashSet::new());
        }
        let match_expr = tokens.join(" OR ");

        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT row_id FROM patterns_fts WHERE patterns_fts MATCH ?1")?;
        // A syntactically hostile query just means no FTS recall
        let rows = match stmt.query_map(params![match_expr], |row| row.get::<_, i64>(0)) {
            Ok(rows) => rows,
            Err(_) => return Ok(HashSet::new()),
        };

        let mut ids = HashSet::new();
        for row in rows {
            ids.insert(row?);
        }
        Ok(ids)
    }
}

/// Classify how well a pattern matches a free-text query
fn match_tier(q: &str, pattern: &Pattern, fts_hits: &HashSet<i64>) -> MatchTier {
    let q_lower = q.to_lowercase();

    let name = pattern.name.to_lowercase();
    let description = pattern.description.to_lowercase();
    let tags: Vec<String> = pattern.tags.iter().map(|t| t.to_lowercase()).collect();

    // Exact match on name or a tag
    if name == q_lower || tags.iter().any(|t| *t == q_lower) {
        return MatchTier::Exact;
    }

    // Prefix match on name, description, or a tag
    if name.starts_with(&q_lower)
        || description.starts_with(&q_lower)
        || tags.iter().any(|t| t.starts_with(&q_lower))
    {
        return MatchTier::Prefix;
    }

    // Partial: any query token contained anywhere searchable, or FTS recall
    let haystacks = [
        &name,
        &description,
        &pattern.source_object.to_lowercase(),
        &pattern.pattern_type.to_lowercase(),
    ];
    let token_hit = q_lower.split_whitespace().any(|token| {
        haystacks.iter().any(|h| h.contains(token)) || tags.iter().any(|t| t.contains(token))
    });
    if token_hit || fts_hits.contains(&pattern.id) {
        return MatchTier::Partial;
    }

    MatchTier::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DedupOutcome;
    use crate::schema::{MetaNode, NewPattern};

    fn pattern(
        fingerprint: &str,
        name: &str,
        tags: &[&str],
        complexity: u8,
        category: Category,
    ) -> NewPattern {
        NewPattern {
            pattern_type: "flow_full".to_string(),
            category,
            name: name.to_string(),
            description: format!("{name} description"),
            source_object: "Lead".to_string(),
            source_file: "f.flow-meta.xml".to_string(),
            api_version: String::new(),
            complexity_score: complexity,
            field_references: vec![],
            tags: tags.iter().map(|t| t.to_string()).collect(),
            structure: MetaNode::new("flow"),
            fingerprint: fingerprint.to_string(),
        }
    }

    fn seeded_store() -> CatalogStore {
        let store = CatalogStore::open_in_memory().unwrap();
        store
            .insert_or_increment(&pattern(
                "f1",
                "approval routing",
                &["approval", "flow-logic"],
                4,
                Category::FlowLogic,
            ))
            .unwrap();
        store
            .insert_or_increment(&pattern(
                "f2",
                "approval",
                &["routing"],
                2,
                Category::FlowLogic,
            ))
            .unwrap();
        store
            .insert_or_increment(&pattern(
                "f3",
                "lead scoring with approval step",
                &["scoring"],
                3,
                Category::DataValidation,
            ))
            .unwrap();
        store
    }

    #[test]
    fn test_invalid_filters_fail_fast() {
        let store = CatalogStore::open_in_memory().unwrap();

        let mut inverted = PatternFilter::default();
        inverted.min_complexity = Some(4);
        inverted.max_complexity = Some(2);
        assert!(matches!(
            store.query(&inverted),
            Err(OrgMineError::InvalidFilter { .. })
        ));

        let mut zero_page = PatternFilter::default();
        zero_page.page = 0;
        assert!(store.query(&zero_page).is_err());

        let mut bad_category = PatternFilter::default();
        bad_category.category = Some("Nonsense".to_string());
        assert!(store.query(&bad_category).is_err());

        let mut out_of_range = PatternFilter::default();
        out_of_range.min_complexity = Some(9);
        assert!(store.query(&out_of_range).is_err());
    }

    #[test]
    fn test_structured_filters_and_combined() {
        let store = seeded_store();

        let mut filter = PatternFilter::default();
        filter.category = Some("Flow Logic".to_string());
        filter.min_complexity = Some(3);
        let page = store.query(&filter).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.patterns[0].name, "approval routing");
    }

    #[test]
    fn test_free_text_ranking_contract() {
        let store = seeded_store();

        // Bump use_count of the prefix-tier row to show tier outranks usage
        store
            .insert_or_increment(&pattern(
                "f1",
                "approval routing",
                &["approval", "flow-logic"],
                4,
                Category::FlowLogic,
            ))
            .unwrap();

        let page = store.query(&PatternFilter::keyword("approval", 50)).unwrap();
        assert_eq!(page.total, 3);
        // Exact name match first (also has an exact tag on f1; f1's tag
        // "approval" is exact too, so tie breaks by use_count desc)
        assert_eq!(page.patterns[0].name, "approval routing");
        assert_eq!(page.patterns[1].name, "approval");
        // Partial token match last
        assert_eq!(page.patterns[2].name, "lead scoring with approval step");
    }

    #[test]
    fn test_ranking_reproducible() {
        let store = seeded_store();
        let first = store.query(&PatternFilter::keyword("approval", 50)).unwrap();
        let second = store.query(&PatternFilter::keyword("approval", 50)).unwrap();
        let names = |page: &PatternPage| {
            page.patterns.iter().map(|p| p.name.clone()).collect::<Vec<_>>()
        };
        assert_eq!(names(&first), names(&second));
    }

    #[test]
    fn test_tie_breaks_by_id_ascending() {
        let store = CatalogStore::open_in_memory().unwrap();
        let DedupOutcome::Inserted { id: first_id } = store
            .insert_or_increment(&pattern("t1", "sync", &[], 2, Category::FlowLogic))
            .unwrap()
        else {
            panic!("expected insert")
        };
        store
            .insert_or_increment(&pattern("t2", "sync", &[], 2, Category::FlowLogic))
            .unwrap();

        let page = store.query(&PatternFilter::keyword("sync", 50)).unwrap();
        assert_eq!(page.patterns[0].id, first_id);
    }

    #[test]
    fn test_pagination() {
        let store = CatalogStore::open_in_memory().unwrap();
        for i in 0..7 {
            store
                .insert_or_increment(&pattern(
                    &format!("p{i}"),
                    &format!("pattern {i}"),
                    &[],
                    1,
                    Category::FlowLogic,
                ))
                .unwrap();
        }

        let mut filter = PatternFilter::default();
        filter.page_size = 3;
        filter.page = 3;
        let page = store.query(&filter).unwrap();
        assert_eq!(page.total, 7);
        assert_eq!(page.pages, 3);
        assert_eq!(page.patterns.len(), 1);
    }

    #[test]
    fn test_empty_catalog_empty_page() {
        let store = CatalogStore::open_in_memory().unwrap();
        let page = store.query(&PatternFilter::keyword("anything", 10)).unwrap();
        assert_eq!(page.total, 0);
        assert!(page.patterns.is_empty());
        assert_eq!(page.pages, 1);
    }
}
