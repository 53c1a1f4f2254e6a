use super::SimStore;
use crate::{
    error::SimResult,
    shopper::{Decision, Persona, TransactionRecord},
    types::{Iteration, ProductId},
};
use rusqlite::params;

fn persona_from_str(s: &str) -> Persona {
    match s {
        "impulsive" => Persona::Impulsive,
        "skeptical" => Persona::Skeptical,
        _ => Persona::Careful,
    }
}

fn decision_from_str(s: &str) -> Decision {
    if s == "buy" {
        Decision::Buy
    } else {
        Decision::NoBuy
    }
}

impl SimStore {
    // ── Transactions ──────────────────────────────────────────────

    pub fn insert_txn(&self, run_id: &str, t: &TransactionRecord) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO txn (
                txn_id, run_id, product_id, persona, decision,
                reviews_read, fake_in_sample, fake_fraction, rationale, iteration
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                &t.txn_id,
                run_id,
                t.product_id,
                t.persona.name(),
                t.decision.name(),
                t.reviews_read,
                t.fake_in_sample,
                t.fake_fraction,
                &t.rationale,
                t.iteration as i64,
            ],
        )?;
        Ok(())
    }

    /// Every transaction of the run, in recording order. The analysis
    /// engine partitions these by campaign phase in memory; at this
    /// scale one scan beats a query per cell.
    pub fn txns_for_run(&self, run_id: &str) -> SimResult<Vec<TransactionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT txn_id, product_id, persona, decision, reviews_read,
                    fake_in_sample, fake_fraction, rationale, iteration
             FROM txn WHERE run_id = ?1
             ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![run_id], txn_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// (buys, total) for one product over a contiguous iteration range.
    pub fn buy_counts(
        &self,
        run_id: &str,
        product_id: ProductId,
        from: Iteration,
        to: Iteration,
    ) -> SimResult<(u32, u32)> {
        let (buys, total) = self.conn.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN decision = 'buy' THEN 1 ELSE 0 END), 0),
                COUNT(*)
             FROM txn
             WHERE run_id = ?1 AND product_id = ?2
               AND iteration BETWEEN ?3 AND ?4",
            params![run_id, product_id, from as i64, to as i64],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;
        Ok((buys as u32, total as u32))
    }

    pub fn txn_count(&self, run_id: &str) -> SimResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM txn WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn txn_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TransactionRecord> {
    let persona: String = row.get(2)?;
    let decision: String = row.get(3)?;
    Ok(TransactionRecord {
        txn_id: row.get(0)?,
        product_id: row.get(1)?,
        persona: persona_from_str(&persona),
        decision: decision_from_str(&decision),
        reviews_read: row.get::<_, i64>(4)? as u32,
        fake_in_sample: row.get::<_, i64>(5)? as u32,
        fake_fraction: row.get(6)?,
        rationale: row.get(7)?,
        iteration: row.get::<_, i64>(8)? as Iteration,
    })
}
