//! PostgreSQL access for the enrichment pipeline.
//!
//! Three reads (buyers needing briefs, the cached-brief filter, per-buyer
//! award history) and one write (the chunked brief upsert). Queries go
//! through the same database functions the rest of the platform uses.

use std::collections::HashSet;

use chrono::Utc;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use thiserror::Error;
use tracing::{error, info, warn};

use super::briefs::BriefRow;
use super::history::AwardHistory;

/// Rows checked per round-trip in the cached-brief filter.
const CACHE_CHECK_BATCH: usize = 50;

/// Briefs written per transaction.
const UPSERT_BATCH: usize = 50;

const UPSERT_BRIEF_SQL: &str = r#"
INSERT INTO buyer_research_briefs (
    tenant_id, buyer_name, country, category, summary, procurement_intent,
    organizational_context, incumbent_landscape, risk_factors,
    opportunity_score, sources, model_used, tokens_used, research_cost_usd,
    status, expires_at
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
ON CONFLICT (tenant_id, buyer_name, country, category) DO UPDATE SET
    summary = EXCLUDED.summary,
    procurement_intent = EXCLUDED.procurement_intent,
    organizational_context = EXCLUDED.organizational_context,
    incumbent_landscape = EXCLUDED.incumbent_landscape,
    risk_factors = EXCLUDED.risk_factors,
    opportunity_score = EXCLUDED.opportunity_score,
    sources = EXCLUDED.sources,
    model_used = EXCLUDED.model_used,
    tokens_used = EXCLUDED.tokens_used,
    research_cost_usd = EXCLUDED.research_cost_usd,
    status = EXCLUDED.status,
    expires_at = EXCLUDED.expires_at,
    researched_at = NOW()
"#;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Connection to the database failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A buyer/country pair awaiting enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Buyer {
    pub buyer_name: String,
    pub country: String,
}

/// PostgreSQL client scoped to one tenant.
pub struct Database {
    pool: PgPool,
    tenant_id: String,
}

impl Database {
    /// Connect to the database.
    pub async fn connect(database_url: &str, tenant_id: &str) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(database_url)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        Ok(Self::from_pool(pool, tenant_id))
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool, tenant_id: &str) -> Self {
        Self {
            pool,
            tenant_id: tenant_id.to_string(),
        }
    }

    /// Unique buyers from predictions that need briefs.
    ///
    /// Prefers the `get_batch_enrichment_buyers` database function; when it
    /// is missing or returns nothing, falls back to a direct query on the
    /// predictions table.
    pub async fn fetch_buyers(&self, include_overdue: bool) -> Result<Vec<Buyer>, DatabaseError> {
        let mut urgencies = vec!["upcoming".to_string()];
        if include_overdue {
            urgencies.push("overdue".to_string());
        }

        let via_function =
            sqlx::query("SELECT buyer_name, country FROM get_batch_enrichment_buyers($1, $2)")
                .bind(&self.tenant_id)
                .bind(&urgencies)
                .fetch_all(&self.pool)
                .await;

        match via_function {
            Ok(rows) if !rows.is_empty() => return Ok(rows.iter().map(buyer_from_row).collect()),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "get_batch_enrichment_buyers unavailable"),
        }

        warn!("Using direct predictions query fallback");
        let statuses: Vec<String> = vec!["pending".to_string(), "confirmed".to_string()];
        let rows = sqlx::query(
            "SELECT DISTINCT buyer_name, country FROM predictions \
             WHERE tenant_id = $1 AND urgency = ANY($2) AND validation_status = ANY($3)",
        )
        .bind(&self.tenant_id)
        .bind(&urgencies)
        .bind(&statuses)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(buyer_from_row).collect())
    }

    /// Drop buyers that already hold an unexpired complete brief.
    pub async fn filter_already_cached(
        &self,
        buyers: Vec<Buyer>,
    ) -> Result<Vec<Buyer>, DatabaseError> {
        let cutoff = Utc::now();
        let mut cached: HashSet<Buyer> = HashSet::new();

        for chunk in buyers.chunks(CACHE_CHECK_BATCH) {
            let names: Vec<String> = chunk.iter().map(|b| b.buyer_name.clone()).collect();
            let rows = sqlx::query(
                "SELECT buyer_name, country FROM buyer_research_briefs \
                 WHERE tenant_id = $1 AND category = 'forecast' AND status = 'complete' \
                   AND expires_at > $2 AND buyer_name = ANY($3)",
            )
            .bind(&self.tenant_id)
            .bind(cutoff)
            .bind(&names)
            .fetch_all(&self.pool)
            .await?;

            for row in &rows {
                cached.insert(buyer_from_row(row));
            }
        }

        let remaining: Vec<Buyer> = buyers
            .into_iter()
            .filter(|buyer| !cached.contains(buyer))
            .collect();
        info!(
            cached = cached.len(),
            remaining = remaining.len(),
            "Cached-brief filter applied"
        );
        Ok(remaining)
    }

    /// Award history for one buyer.
    ///
    /// A per-buyer failure logs a warning and yields no history rather than
    /// aborting the whole submission.
    pub async fn fetch_award_history(&self, buyer_name: &str, country: &str) -> Option<AwardHistory> {
        let result = sqlx::query_scalar::<_, Value>("SELECT get_buyer_award_history($1, $2)")
            .bind(buyer_name)
            .bind(country)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(Value::Null) => None,
            Ok(document) => match serde_json::from_value(document) {
                Ok(history) => Some(history),
                Err(e) => {
                    warn!(buyer = buyer_name, error = %e, "Malformed award history document");
                    None
                }
            },
            Err(e) => {
                warn!(buyer = buyer_name, error = %e, "Award history lookup failed");
                None
            }
        }
    }

    /// Write briefs in chunks; a failing chunk is retried row-by-row so one
    /// bad row cannot sink the rest of its chunk.
    pub async fn upsert_briefs(&self, rows: &[BriefRow]) -> Result<usize, DatabaseError> {
        let mut upserted = 0;
        for chunk in rows.chunks(UPSERT_BATCH) {
            match self.upsert_chunk(chunk).await {
                Ok(()) => upserted += chunk.len(),
                Err(e) => {
                    warn!(error = %e, "Chunk upsert failed, retrying rows individually");
                    for row in chunk {
                        match upsert_row(row, &self.pool).await {
                            Ok(()) => upserted += 1,
                            Err(e) => {
                                error!(buyer = %row.buyer_name, error = %e, "Brief upsert failed")
                            }
                        }
                    }
                }
            }
        }
        Ok(upserted)
    }

    async fn upsert_chunk(&self, chunk: &[BriefRow]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for row in chunk {
            upsert_row(row, &mut *tx).await?;
        }
        tx.commit().await
    }
}

fn buyer_from_row(row: &sqlx::postgres::PgRow) -> Buyer {
    Buyer {
        buyer_name: row.get("buyer_name"),
        country: row.get("country"),
    }
}

async fn upsert_row<'e, E>(row: &BriefRow, executor: E) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(UPSERT_BRIEF_SQL)
        .bind(&row.tenant_id)
        .bind(&row.buyer_name)
        .bind(&row.country)
        .bind(&row.category)
        .bind(&row.summary)
        .bind(&row.procurement_intent)
        .bind(&row.organizational_context)
        .bind(&row.incumbent_landscape)
        .bind(&row.risk_factors)
        .bind(row.opportunity_score)
        .bind(&row.sources)
        .bind(&row.model_used)
        .bind(row.tokens_used)
        .bind(row.research_cost_usd)
        .bind(&row.status)
        .bind(row.expires_at)
        .execute(executor)
        .await
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buyer_serde_round_trip() {
        let buyer = Buyer {
            buyer_name: "Madrid City Council".to_string(),
            country: "ES".to_string(),
        };
        let raw = serde_json::to_string(&buyer).expect("serializable");
        assert_eq!(raw, r#"{"buyer_name":"Madrid City Council","country":"ES"}"#);
        let back: Buyer = serde_json::from_str(&raw).expect("deserializable");
        assert_eq!(back, buyer);
    }

    #[test]
    fn test_upsert_sql_binds_every_column_once() {
        // 16 insert columns, 16 placeholders.
        for n in 1..=16 {
            assert!(
                UPSERT_BRIEF_SQL.contains(&format!("${n}")),
                "missing placeholder ${n}"
            );
        }
        assert!(!UPSERT_BRIEF_SQL.contains("$17"));
    }
}
