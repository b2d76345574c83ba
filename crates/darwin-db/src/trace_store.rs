//! Trace and generation persistence.
//!
//! [`UniverseDb`] implements [`GenerationSink`], so an open
//! [`Trace`](darwin_trace::Trace) writes each generation here before it
//! becomes visible in memory.

use rusqlite::{Connection, OptionalExtension, Row, params};

use darwin_trace::{GenerationSink, SinkError};
use darwin_types::{GenerationRecord, TraceId, TraceRecord, VariationId};

use crate::error::DbError;
use crate::universe::{UniverseDb, now_timestamp};

const SELECT_TRACE: &str = "select id, comment, timestamp, variation_id, evolution_config from Trace";

struct TraceRow {
    id: i64,
    comment: Option<String>,
    timestamp: i64,
    variation_id: i64,
    evolution_config: String,
}

impl TraceRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            comment: row.get(1)?,
            timestamp: row.get(2)?,
            variation_id: row.get(3)?,
            evolution_config: row.get(4)?,
        })
    }

    fn into_record(self) -> Result<TraceRecord, DbError> {
        Ok(TraceRecord {
            id: TraceId(self.id),
            comment: self.comment,
            timestamp: self.timestamp,
            variation_id: VariationId(self.variation_id),
            evolution_config: serde_json::from_str(&self.evolution_config)?,
        })
    }
}

struct GenerationRow {
    generation: i64,
    timestamp: i64,
    summary: String,
    details: String,
    genotypes: String,
    profile: String,
}

impl GenerationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            generation: row.get(0)?,
            timestamp: row.get(1)?,
            summary: row.get(2)?,
            details: row.get(3)?,
            genotypes: row.get(4)?,
            profile: row.get(5)?,
        })
    }

    fn into_record(self) -> Result<GenerationRecord, DbError> {
        Ok(GenerationRecord {
            generation: usize::try_from(self.generation)
                .map_err(|err| DbError::OutOfRange(format!("generation {}: {err}", self.generation)))?,
            timestamp: self.timestamp,
            summary: serde_json::from_str(&self.summary)?,
            details: serde_json::from_str(&self.details)?,
            genotypes: serde_json::from_str(&self.genotypes)?,
            profile: serde_json::from_str(&self.profile)?,
        })
    }
}

/// Operations on the `Trace` and `Generation` tables.
pub struct TraceStore<'a> {
    db: &'a UniverseDb,
}

impl<'a> TraceStore<'a> {
    /// Create a new trace store bound to a universe.
    pub const fn new(db: &'a UniverseDb) -> Self {
        Self { db }
    }

    /// Insert a new trace for a variation.
    pub fn create(
        &self,
        variation_id: VariationId,
        evolution_config: &serde_json::Value,
    ) -> Result<TraceRecord, DbError> {
        let config = serde_json::to_string(evolution_config)?;
        let record = self.db.immediate(|tx| {
            let exists: Option<i64> = tx
                .query_row(
                    "select id from Variation where id = ?1",
                    params![variation_id.into_inner()],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                return Err(DbError::NotFound {
                    entity: "variation",
                    id: variation_id.into_inner(),
                });
            }
            tx.execute(
                "insert into Trace(timestamp, variation_id, evolution_config) values (?1, ?2, ?3)",
                params![now_timestamp(), variation_id.into_inner(), config],
            )?;
            load_trace(tx, TraceId(tx.last_insert_rowid()))
        })?;

        tracing::info!(trace_id = %record.id, variation_id = %variation_id, "Created trace");

        Ok(record)
    }

    /// Load a trace by id.
    pub fn load(&self, id: TraceId) -> Result<TraceRecord, DbError> {
        self.db.with_conn(|conn| load_trace(conn, id))
    }

    /// Every trace started from a variation, oldest first.
    pub fn for_variation(&self, variation_id: VariationId) -> Result<Vec<TraceRecord>, DbError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("{SELECT_TRACE} where variation_id = ?1 order by id"))?;
            let rows = stmt
                .query_map(params![variation_id.into_inner()], TraceRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(TraceRow::into_record).collect()
        })
    }

    /// Append one generation to a trace.
    ///
    /// # Errors
    ///
    /// Fails if the generation index is already recorded for the trace
    /// (the `(trace_id, generation)` pair is unique).
    pub fn insert_generation(&self, trace_id: TraceId, record: &GenerationRecord) -> Result<(), DbError> {
        let generation = i64::try_from(record.generation)
            .map_err(|err| DbError::OutOfRange(format!("generation {}: {err}", record.generation)))?;
        let summary = serde_json::to_string(&record.summary)?;
        let details = serde_json::to_string(&record.details)?;
        let genotypes = serde_json::to_string(&record.genotypes)?;
        let profile = serde_json::to_string(&record.profile)?;

        self.db.immediate(|tx| {
            tx.execute(
                r"insert into Generation(timestamp, trace_id, generation, summary, details, genotypes, profile)
                  values (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.timestamp,
                    trace_id.into_inner(),
                    generation,
                    summary,
                    details,
                    genotypes,
                    profile
                ],
            )?;
            Ok(())
        })?;

        tracing::debug!(trace_id = %trace_id, generation, "Persisted generation");

        Ok(())
    }

    /// All generations of a trace, in index order.
    pub fn generations(&self, trace_id: TraceId) -> Result<Vec<GenerationRecord>, DbError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r"select generation, timestamp, summary, details, genotypes, profile
                  from Generation where trace_id = ?1 order by generation",
            )?;
            let rows = stmt
                .query_map(params![trace_id.into_inner()], GenerationRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(GenerationRow::into_record).collect()
        })
    }
}

impl GenerationSink for UniverseDb {
    fn persist_generation(&self, trace: TraceId, record: &GenerationRecord) -> Result<(), SinkError> {
        TraceStore::new(self)
            .insert_generation(trace, record)
            .map_err(Into::into)
    }
}

fn load_trace(conn: &Connection, id: TraceId) -> Result<TraceRecord, DbError> {
    conn.query_row(
        &format!("{SELECT_TRACE} where id = ?1"),
        params![id.into_inner()],
        TraceRow::from_row,
    )
    .optional()?
    .ok_or(DbError::NotFound {
        entity: "trace",
        id: id.into_inner(),
    })?
    .into_record()
}
