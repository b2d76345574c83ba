//! Experiment persistence: creation (optionally forked), naming and setup.
//!
//! Experiment rows are the only mutable rows of a universe: their name,
//! setup and lineage tip change over the experiment's life. Everything
//! they point at (variations, traces, generations) is append-only.

use rusqlite::{Connection, OptionalExtension, Row, params};

use darwin_types::{ExperimentId, ExperimentRecord, ExperimentSetup, VariationId};

use crate::error::DbError;
use crate::universe::{UniverseDb, now_timestamp};
use crate::variation_store::{insert_variation, load_variation};

const SELECT_EXPERIMENT: &str = "select id, comment, timestamp, name, setup, last_variation_id, \
                                 last_activity_timestamp from Experiment";

/// Raw `Experiment` row, before JSON decoding.
struct ExperimentRow {
    id: i64,
    comment: Option<String>,
    timestamp: i64,
    name: Option<String>,
    setup: String,
    last_variation_id: Option<i64>,
    last_activity_timestamp: i64,
}

impl ExperimentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            comment: row.get(1)?,
            timestamp: row.get(2)?,
            name: row.get(3)?,
            setup: row.get(4)?,
            last_variation_id: row.get(5)?,
            last_activity_timestamp: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<ExperimentRecord, DbError> {
        Ok(ExperimentRecord {
            id: ExperimentId(self.id),
            comment: self.comment,
            timestamp: self.timestamp,
            name: self.name,
            setup: serde_json::from_str(&self.setup)?,
            last_variation_id: self.last_variation_id.map(VariationId),
            last_activity_timestamp: self.last_activity_timestamp,
        })
    }
}

/// Operations on the `Experiment` table.
pub struct ExperimentStore<'a> {
    db: &'a UniverseDb,
}

impl<'a> ExperimentStore<'a> {
    /// Create a new experiment store bound to a universe.
    pub const fn new(db: &'a UniverseDb) -> Self {
        Self { db }
    }

    /// Insert a new experiment.
    ///
    /// With a `base_variation`, the base configuration is cloned as the
    /// experiment's first variation, parented to the base (a fork). The
    /// experiment and its clone are created atomically.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::DuplicateName`] if `name` is taken and
    /// [`DbError::NotFound`] if the base variation does not exist.
    pub fn create(
        &self,
        name: Option<&str>,
        setup: &ExperimentSetup,
        base_variation: Option<VariationId>,
    ) -> Result<ExperimentRecord, DbError> {
        let setup_json = serde_json::to_string(setup)?;

        let record = self.db.immediate(|tx| {
            if let Some(name) = name {
                ensure_name_free(tx, name, None)?;
            }

            let now = now_timestamp();
            tx.execute(
                r"insert into Experiment(timestamp, name, last_variation_id, last_activity_timestamp, setup)
                  values (?1, ?2, null, ?1, ?3)",
                params![now, name, setup_json],
            )?;
            let id = ExperimentId(tx.last_insert_rowid());

            if let Some(base_id) = base_variation {
                let base = load_variation(tx, base_id)?;
                let config = serde_json::to_string(&base.config)?;
                insert_variation(tx, id, Some(base.id), &config)?;
            }

            load_experiment(tx, id)
        })?;

        tracing::info!(
            experiment_id = %record.id,
            name = record.name.as_deref().unwrap_or(""),
            base_variation = ?base_variation,
            "Created experiment"
        );

        Ok(record)
    }

    /// Load an experiment by id.
    pub fn load(&self, id: ExperimentId) -> Result<ExperimentRecord, DbError> {
        self.db.with_conn(|conn| load_experiment(conn, id))
    }

    /// Find an experiment by name.
    pub fn find_by_name(&self, name: &str) -> Result<Option<ExperimentRecord>, DbError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!("{SELECT_EXPERIMENT} where name = ?1"),
                params![name],
                ExperimentRow::from_row,
            )
            .optional()?
            .map(ExperimentRow::into_record)
            .transpose()
        })
    }

    /// List every experiment, oldest first.
    pub fn list(&self) -> Result<Vec<ExperimentRecord>, DbError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_EXPERIMENT} order by id"))?;
            let rows = stmt
                .query_map([], ExperimentRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(ExperimentRow::into_record).collect()
        })
    }

    /// Change (or clear) an experiment's name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::DuplicateName`] if another experiment holds the
    /// name. Keeping the current name is not a conflict.
    pub fn rename(&self, id: ExperimentId, name: Option<&str>) -> Result<(), DbError> {
        self.db.immediate(|tx| {
            if let Some(name) = name {
                ensure_name_free(tx, name, Some(id))?;
            }
            let changed = tx.execute(
                "update Experiment set name = ?1 where id = ?2",
                params![name, id.into_inner()],
            )?;
            if changed == 0 {
                return Err(not_found(id));
            }
            Ok(())
        })?;
        tracing::debug!(experiment_id = %id, name = name.unwrap_or(""), "Renamed experiment");
        Ok(())
    }

    /// Replace an experiment's setup document.
    pub fn update_setup(&self, id: ExperimentId, setup: &ExperimentSetup) -> Result<(), DbError> {
        let setup_json = serde_json::to_string(setup)?;
        self.db.immediate(|tx| {
            let changed = tx.execute(
                "update Experiment set setup = ?1 where id = ?2",
                params![setup_json, id.into_inner()],
            )?;
            if changed == 0 {
                return Err(not_found(id));
            }
            Ok(())
        })
    }
}

pub(crate) fn load_experiment(conn: &Connection, id: ExperimentId) -> Result<ExperimentRecord, DbError> {
    conn.query_row(
        &format!("{SELECT_EXPERIMENT} where id = ?1"),
        params![id.into_inner()],
        ExperimentRow::from_row,
    )
    .optional()?
    .ok_or_else(|| not_found(id))?
    .into_record()
}

fn ensure_name_free(conn: &Connection, name: &str, owner: Option<ExperimentId>) -> Result<(), DbError> {
    let holder: Option<i64> = conn
        .query_row(
            "select id from Experiment where name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    match holder {
        Some(holder) if Some(ExperimentId(holder)) != owner => {
            Err(DbError::DuplicateName(name.to_owned()))
        }
        _ => Ok(()),
    }
}

const fn not_found(id: ExperimentId) -> DbError {
    DbError::NotFound {
        entity: "experiment",
        id: id.into_inner(),
    }
}
