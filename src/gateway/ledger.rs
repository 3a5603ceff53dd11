//! Daily cost ledger for the semantic search gateway
//!
//! One row per calendar day: cumulative spend and request count. The
//! charge is a single conditional upsert, so concurrent requests cannot
//! jointly push the day past the cap: a charge either fits under the cap
//! and lands atomically, or changes nothing. Charges are reserved before
//! the external call and refunded if the call fails, so recorded spend
//! reflects only completed calls.

use rusqlite::params;

use crate::catalog::CatalogStore;
use crate::error::Result;

/// Today's ledger key in the local calendar
pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Atomically charge an amount against a day's ledger if it fits under
/// the cap
///
/// Returns `true` when the charge was recorded. A `false` return means the
/// ledger is untouched and the caller must fall back.
pub fn try_charge(store: &CatalogStore, day: &str, amount: f64, cap: f64) -> Result<bool> {
    if amount > cap {
        return Ok(false);
    }

    let conn = store.conn();
    let changed = conn.execute(
        r#"
        INSERT INTO cost_ledger (day, cumulative_cost, request_count)
        VALUES (?1, ?2, 1)
        ON CONFLICT(day) DO UPDATE SET
            cumulative_cost = cumulative_cost + excluded.cumulative_cost,
            request_count = request_count + 1
        WHERE cumulative_cost + excluded.cumulative_cost <= ?3
        "#,
        params![day, amount, cap],
    )?;
    Ok(changed > 0)
}

/// Release a previously reserved charge after a failed external call
pub fn refund(store: &CatalogStore, day: &str, amount: f64) -> Result<()> {
    let conn = store.conn();
    conn.execute(
        r#"
        UPDATE cost_ledger SET
            cumulative_cost = MAX(cumulative_cost - ?2, 0.0),
            request_count = MAX(request_count - 1, 0)
        WHERE day = ?1
        "#,
        params![day, amount],
    )?;
    Ok(())
}

/// Cumulative recorded spend for a day
pub fn daily_cost(store: &CatalogStore, day: &str) -> Result<f64> {
    let conn = store.conn();
    let cost = conn
        .query_row(
            "SELECT cumulative_cost FROM cost_ledger WHERE day = ?1",
            params![day],
            |row| row.get::<_, f64>(0),
        )
        .unwrap_or(0.0);
    Ok(cost)
}
