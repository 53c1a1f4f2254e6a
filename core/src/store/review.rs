use super::SimStore;
use crate::{
    error::SimResult,
    reviewer::{AuthorKind, Personality, ReviewRecord},
    types::{Iteration, ProductId},
};
use rusqlite::params;

fn author_from_row(kind: &str, personality: Option<&str>) -> AuthorKind {
    match kind {
        "fake" => AuthorKind::Fake,
        _ => AuthorKind::Genuine(match personality {
            Some("critical") => Personality::Critical,
            Some("lenient") => Personality::Lenient,
            _ => Personality::Balanced,
        }),
    }
}

impl SimStore {
    // ── Review ────────────────────────────────────────────────────

    pub fn insert_review(&self, run_id: &str, r: &ReviewRecord) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO review (
                review_id, run_id, product_id, author_kind, personality,
                rating, text, is_fake, iteration
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                &r.review_id,
                run_id,
                r.product_id,
                r.author.kind_str(),
                r.author.personality().map(|p| p.name()),
                i64::from(r.rating),
                &r.text,
                if r.is_fake { 1 } else { 0 },
                r.iteration as i64,
            ],
        )?;
        Ok(())
    }

    /// The `limit` most recently posted reviews for one product,
    /// newest first. When fewer exist, the whole pool is returned.
    pub fn recent_reviews(
        &self,
        run_id: &str,
        product_id: ProductId,
        limit: u32,
    ) -> SimResult<Vec<ReviewRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT review_id, product_id, author_kind, personality,
                    rating, text, is_fake, iteration
             FROM review WHERE run_id = ?1 AND product_id = ?2
             ORDER BY rowid DESC LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![run_id, product_id, limit], review_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Every review posted against one product, in posting order.
    pub fn all_reviews(
        &self,
        run_id: &str,
        product_id: ProductId,
    ) -> SimResult<Vec<ReviewRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT review_id, product_id, author_kind, personality,
                    rating, text, is_fake, iteration
             FROM review WHERE run_id = ?1 AND product_id = ?2
             ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![run_id, product_id], review_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Every review of the run, in posting order. Used by replay
    /// comparisons and post-run inspection.
    pub fn reviews_for_run(&self, run_id: &str) -> SimResult<Vec<ReviewRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT review_id, product_id, author_kind, personality,
                    rating, text, is_fake, iteration
             FROM review WHERE run_id = ?1
             ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![run_id], review_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn review_count(&self, run_id: &str, product_id: ProductId) -> SimResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM review WHERE run_id = ?1 AND product_id = ?2",
            params![run_id, product_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn fake_review_count(&self, run_id: &str, product_id: ProductId) -> SimResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM review
             WHERE run_id = ?1 AND product_id = ?2 AND is_fake = 1",
            params![run_id, product_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn review_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReviewRecord> {
    let kind: String = row.get(2)?;
    let personality: Option<String> = row.get(3)?;
    Ok(ReviewRecord {
        review_id: row.get(0)?,
        product_id: row.get(1)?,
        author: author_from_row(&kind, personality.as_deref()),
        rating: row.get::<_, i64>(4)? as u8,
        text: row.get(5)?,
        is_fake: row.get::<_, i64>(6)? != 0,
        iteration: row.get::<_, i64>(7)? as Iteration,
    })
}
