//! Variation persistence and lineage queries.
//!
//! Variations form a forest: each row points at most at one parent
//! (`previous_id`) that was persisted before it, so the graph cannot
//! contain cycles. A variation whose parent belongs to another
//! experiment is a *fork*.

use rusqlite::{Connection, OptionalExtension, Row, params};

use darwin_types::{ExperimentId, VariationId, VariationRecord};

use crate::error::DbError;
use crate::universe::{UniverseDb, now_timestamp};

const SELECT_VARIATION: &str =
    "select id, comment, timestamp, previous_id, experiment_id, name, config from Variation";

/// Raw `Variation` row, before JSON decoding.
struct VariationRow {
    id: i64,
    comment: Option<String>,
    timestamp: i64,
    previous_id: Option<i64>,
    experiment_id: i64,
    name: Option<String>,
    config: String,
}

impl VariationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            comment: row.get(1)?,
            timestamp: row.get(2)?,
            previous_id: row.get(3)?,
            experiment_id: row.get(4)?,
            name: row.get(5)?,
            config: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<VariationRecord, DbError> {
        Ok(VariationRecord {
            id: VariationId(self.id),
            comment: self.comment,
            timestamp: self.timestamp,
            previous_id: self.previous_id.map(VariationId),
            experiment_id: ExperimentId(self.experiment_id),
            name: self.name,
            config: serde_json::from_str(&self.config)?,
        })
    }
}

/// Operations on the `Variation` table.
pub struct VariationStore<'a> {
    db: &'a UniverseDb,
}

impl<'a> VariationStore<'a> {
    /// Create a new variation store bound to a universe.
    pub const fn new(db: &'a UniverseDb) -> Self {
        Self { db }
    }

    /// Append a variation to an experiment's lineage.
    ///
    /// The new variation is parented to the experiment's current tip and
    /// becomes the new tip.
    pub fn create(
        &self,
        experiment_id: ExperimentId,
        config: &serde_json::Value,
    ) -> Result<VariationRecord, DbError> {
        let config = serde_json::to_string(config)?;
        let record = self.db.immediate(|tx| {
            let tip: Option<i64> = tx
                .query_row(
                    "select last_variation_id from Experiment where id = ?1",
                    params![experiment_id.into_inner()],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or(DbError::NotFound {
                    entity: "experiment",
                    id: experiment_id.into_inner(),
                })?;
            let id = insert_variation(tx, experiment_id, tip.map(VariationId), &config)?;
            load_variation(tx, id)
        })?;

        tracing::info!(
            variation_id = %record.id,
            experiment_id = %experiment_id,
            previous_id = ?record.previous_id,
            "Created variation"
        );

        Ok(record)
    }

    /// Load a variation by id.
    pub fn load(&self, id: VariationId) -> Result<VariationRecord, DbError> {
        self.db.with_conn(|conn| load_variation(conn, id))
    }

    /// The variation and all its ancestors, newest first.
    pub fn lineage(&self, id: VariationId) -> Result<Vec<VariationRecord>, DbError> {
        let lineage = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r"with recursive lineage(id, depth) as (
                      select ?1, 0
                      union all
                      select v.previous_id, l.depth + 1
                      from Variation v join lineage l on v.id = l.id
                      where v.previous_id is not null)
                  select v.id, v.comment, v.timestamp, v.previous_id, v.experiment_id, v.name, v.config
                  from Variation v join lineage l on v.id = l.id
                  order by l.depth",
            )?;
            let rows = stmt
                .query_map(params![id.into_inner()], VariationRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter()
                .map(VariationRow::into_record)
                .collect::<Result<Vec<_>, _>>()
        })?;
        if lineage.is_empty() {
            return Err(not_found(id));
        }
        Ok(lineage)
    }

    /// Direct children of a variation, oldest first.
    pub fn children(&self, id: VariationId) -> Result<Vec<VariationRecord>, DbError> {
        self.query_many(
            &format!("{SELECT_VARIATION} where previous_id = ?1 order by id"),
            id.into_inner(),
        )
    }

    /// Every variation recorded under an experiment, oldest first.
    pub fn for_experiment(&self, experiment_id: ExperimentId) -> Result<Vec<VariationRecord>, DbError> {
        self.query_many(
            &format!("{SELECT_VARIATION} where experiment_id = ?1 order by id"),
            experiment_id.into_inner(),
        )
    }

    /// Whether the variation's parent was recorded under another experiment.
    pub fn is_fork(&self, variation: &VariationRecord) -> Result<bool, DbError> {
        let Some(parent_id) = variation.previous_id else {
            return Ok(false);
        };
        let parent = self.load(parent_id)?;
        Ok(parent.experiment_id != variation.experiment_id)
    }

    fn query_many(&self, sql: &str, key: i64) -> Result<Vec<VariationRecord>, DbError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map(params![key], VariationRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(VariationRow::into_record).collect()
        })
    }
}

/// Insert a variation and make it the experiment's lineage tip.
///
/// Must run inside the caller's transaction.
pub(crate) fn insert_variation(
    conn: &Connection,
    experiment_id: ExperimentId,
    previous_id: Option<VariationId>,
    config: &str,
) -> Result<VariationId, DbError> {
    let now = now_timestamp();
    conn.execute(
        r"insert into Variation(timestamp, experiment_id, previous_id, config)
          values (?1, ?2, ?3, ?4)",
        params![
            now,
            experiment_id.into_inner(),
            previous_id.map(VariationId::into_inner),
            config
        ],
    )?;
    let id = VariationId(conn.last_insert_rowid());
    conn.execute(
        r"update Experiment set last_variation_id = ?1, last_activity_timestamp = ?2
          where id = ?3",
        params![id.into_inner(), now, experiment_id.into_inner()],
    )?;
    Ok(id)
}

pub(crate) fn load_variation(conn: &Connection, id: VariationId) -> Result<VariationRecord, DbError> {
    conn.query_row(
        &format!("{SELECT_VARIATION} where id = ?1"),
        params![id.into_inner()],
        VariationRow::from_row,
    )
    .optional()?
    .ok_or_else(|| not_found(id))?
    .into_record()
}

const fn not_found(id: VariationId) -> DbError {
    DbError::NotFound {
        entity: "variation",
        id: id.into_inner(),
    }
}
