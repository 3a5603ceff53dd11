//! Cost-bounded semantic search gateway
//!
//! Wraps the external ranking call with a response cache, the daily cost
//! ledger, and a guaranteed fallback to the catalog's native keyword
//! search. Per query:
//!
//! ```text
//! CHECK_CACHE -> hit -> RETURN
//!            -> miss -> CHECK_BUDGET -> over cap -> keyword fallback
//!                                    -> under cap -> CALL_EXTERNAL
//!                                       -> PARSE -> STORE_CACHE -> RETURN
//!                                       -> any failure -> refund -> keyword fallback
//! ```
//!
//! The caller always receives a result set with a method marker, never an
//! error from this path: a missing credential, an exhausted budget, a
//! timeout, or a malformed response all resolve to `method: "keyword"`.

pub mod cache;
pub mod client;
pub mod ledger;

use serde::{Deserialize, Serialize};

use crate::catalog::PatternFilter;
use crate::config::AppContext;
use crate::error::{OrgMineError, Result};
use crate::schema::PatternSummary;

use client::QueryClient;

/// How many results the keyword fallback returns
const FALLBACK_LIMIT: usize = 10;

/// Marker distinguishing a true semantic result from the keyword fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    Llm,
    Keyword,
}

/// Result of a semantic query
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<PatternSummary>,
    pub total: usize,
    pub query: String,
    pub method: SearchMethod,
}

/// Spend snapshot for the cost-inspection interface
#[derive(Debug, Clone, Serialize)]
pub struct CostReport {
    pub daily_cost: f64,
    pub limit: f64,
}

/// Answer a natural-language query over the catalog
///
/// Never returns an error for external-service conditions; those resolve
/// to the keyword fallback. Storage failures still propagate.
pub async fn semantic_search(ctx: &AppContext, query: &str) -> Result<SearchOutcome> {
    match semantic_search_inner(ctx, query).await {
        Ok(outcome) => Ok(outcome),
        Err(OrgMineError::CostLimitExceeded { limit }) => {
            tracing::info!(limit, "daily cost limit reached, using keyword search");
            keyword_fallback(ctx, query)
        }
        Err(OrgMineError::ExternalUnavailable { message }) => {
            tracing::warn!(%message, "semantic search unavailable, using keyword search");
            keyword_fallback(ctx, query)
        }
        Err(other) => Err(other),
    }
}

async fn semantic_search_inner(ctx: &AppContext, query: &str) -> Result<SearchOutcome> {
    let normalized = cache::normalize_query(query);
    let key = cache::cache_key(&normalized);

    // CHECK_CACHE
    if let Some(ids) =
        cache::lookup(&ctx.store, &key, ctx.config.cache_ttl_secs, cache::now_unix())?
    {
        tracing::debug!(%query, "cache hit");
        let results = ctx.store.patterns_by_ids(&ids)?;
        return Ok(outcome(results, query, SearchMethod::Llm));
    }

    let api_key = ctx.config.api_key.clone().ok_or_else(|| {
        OrgMineError::ExternalUnavailable {
            message: "no API credential configured".to_string(),
        }
    })?;

    let query_client = QueryClient::new(
        api_key,
        ctx.config.model.clone(),
        ctx.config.request_timeout_secs,
    )?;

    let candidates = ctx.store.summaries(client::MAX_CANDIDATES)?;
    let prompt = client::build_prompt(query, &candidates);
    let estimate = client::estimate_cost(&prompt);

    // CHECK_BUDGET: the reservation is atomic, so concurrent queries
    // cannot jointly overshoot the cap
    let day = ledger::today();
    if !ledger::try_charge(&ctx.store, &day, estimate, ctx.config.daily_cost_limit)? {
        return Err(OrgMineError::CostLimitExceeded {
            limit: ctx.config.daily_cost_limit,
        });
    }

    // CALL_EXTERNAL + PARSE_RESPONSE, bounded by the configured timeout
    let call = query_client.rank_patterns(query, &prompt);
    let ids = match tokio::time::timeout(
        std::time::Duration::from_secs(ctx.config.request_timeout_secs),
        call,
    )
    .await
    {
        Ok(Ok(ids)) => ids,
        Ok(Err(e)) => {
            ledger::refund(&ctx.store, &day, estimate)?;
            return Err(e);
        }
        Err(_) => {
            ledger::refund(&ctx.store, &day, estimate)?;
            return Err(OrgMineError::ExternalUnavailable {
                message: "external call timed out".to_string(),
            });
        }
    };

    // Drop ids the service hallucinated
    let known: std::collections::HashSet<i64> = candidates.iter().map(|c| c.id).collect();
    let ids: Vec<i64> = ids.into_iter().filter(|id| known.contains(id)).collect();

    // STORE_CACHE
    cache::put(&ctx.store, &key, &normalized, &ids, cache::now_unix())?;

    let results = ctx.store.patterns_by_ids(&ids)?;
    Ok(outcome(results, query, SearchMethod::Llm))
}

/// The catalog's native keyword search, tagged as such
pub fn keyword_fallback(ctx: &AppContext, query: &str) -> Result<SearchOutcome> {
    let page = ctx.store.query(&PatternFilter::keyword(query, FALLBACK_LIMIT))?;
    Ok(outcome(page.patterns, query, SearchMethod::Keyword))
}

/// Today's recorded spend against the configured cap
pub fn cost_report(ctx: &AppContext) -> Result<CostReport> {
    Ok(CostReport {
        daily_cost: ledger::daily_cost(&ctx.store, &ledger::today())?,
        limit: ctx.config.daily_cost_limit,
    })
}

fn outcome(results: Vec<PatternSummary>, query: &str, method: SearchMethod) -> SearchOutcome {
    SearchOutcome {
        total: results.len(),
        results,
        query: query.to_string(),
        method,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::schema::{Category, MetaNode, NewPattern};

    fn context(api_key: Option<String>) -> AppContext {
        let mut config = AppConfig::from_env(Some(std::env::temp_dir()));
        config.api_key = api_key;
        let ctx = AppContext::open_in_memory(config).unwrap();
        let pattern = NewPattern {
            pattern_type: "flow_full".to_string(),
            category: Category::FlowLogic,
            name: "approval routing".to_string(),
            description: "Approval flow on Lead.".to_string(),
            source_object: "Lead".to_string(),
            source_file: "f.flow-meta.xml".to_string(),
            api_version: String::new(),
            complexity_score: 3,
            field_references: vec![],
            tags: vec!["approval".to_string()],
            structure: MetaNode::new("flow"),
            fingerprint: "gw-test".to_string(),
        };
        ctx.store.insert_or_increment(&pattern).unwrap();
        ctx
    }

    #[tokio::test]
    async fn test_no_credential_falls_back_to_keyword() {
        let ctx = context(None);
        let out = semantic_search(&ctx, "approval").await.unwrap();
        assert_eq!(out.method, SearchMethod::Keyword);
        assert_eq!(out.total, 1);
        assert_eq!(out.results[0].name, "approval routing");
        // Nothing was charged
        assert_eq!(cost_report(&ctx).unwrap().daily_cost, 0.0);
    }

    #[tokio::test]
    async fn test_over_cap_falls_back_without_overshoot() {
        let ctx = context(Some("test-key".to_string()));
        // Exhaust today's budget
        let day = ledger::today();
        assert!(ledger::try_charge(&ctx.store, &day, 1.00, 1.00).unwrap());

        let out = semantic_search(&ctx, "approval").await.unwrap();
        assert_eq!(out.method, SearchMethod::Keyword);
        let cost = cost_report(&ctx).unwrap();
        assert!(cost.daily_cost <= cost.limit + 1e-9);
    }

    #[tokio::test]
    async fn test_cache_hit_returns_llm_method_without_charge() {
        let ctx = context(None);
        let normalized = cache::normalize_query("Approval  Routing");
        let key = cache::cache_key(&normalized);
        let id = ctx.store.summaries(10).unwrap()[0].id;
        cache::put(&ctx.store, &key, &normalized, &[id], cache::now_unix()).unwrap();

        // Different spacing/casing, same cache slot; no credential needed
        let out = semantic_search(&ctx, "approval routing").await.unwrap();
        assert_eq!(out.method, SearchMethod::Llm);
        assert_eq!(out.results[0].id, id);
        assert_eq!(cost_report(&ctx).unwrap().daily_cost, 0.0);
    }

    #[tokio::test]
    async fn test_failed_call_refunds_and_falls_back() {
        // A key is configured but the endpoint is unreachable in tests, so
        // the call fails; the reservation must be refunded
        let mut ctx = context(Some("test-key".to_string()));
        ctx.config.request_timeout_secs = 1;

        let out = semantic_search(&ctx, "approval").await.unwrap();
        assert_eq!(out.method, SearchMethod::Keyword);
        assert!(out.total >= 1);
        assert_eq!(cost_report(&ctx).unwrap().daily_cost, 0.0);
    }

    #[test]
    fn test_method_marker_serialization() {
        assert_eq!(serde_json::to_string(&SearchMethod::Llm).unwrap(), "\"llm\"");
        assert_eq!(serde_json::to_string(&SearchMethod::Keyword).unwrap(), "\"keyword\"");
    }
}
