//! [`SqliteStore`], the SQLite implementation of [`SnapshotStore`].

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::OptionalExtension as _;

use quire_core::{
  entity::{Entity, Slug},
  store::{Locator, SnapshotStore},
  version::{Version, WriteOutcome},
};

use crate::{
  Result,
  encode::{RawLocator, RawVersion, decode_date, decode_dt, encode_date, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Quire snapshot store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Storage keys of every entity with at least one version.
  pub async fn list_entities(&self) -> Result<Vec<Entity>> {
    let keys: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT entity_key FROM entities ORDER BY entity_key")?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    keys
      .iter()
      .map(|k| Entity::from_storage_key(k).map_err(Into::into))
      .collect()
  }

  async fn query_versions(
    &self,
    entity: &Entity,
    date: Option<NaiveDate>,
    limit: Option<i64>,
  ) -> Result<Vec<Version>> {
    let key      = entity.storage_key().to_owned();
    let date_str = date.map(encode_date);
    let limit    = limit.unwrap_or(-1);

    let raws: Vec<RawVersion> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT entity_key, captured_on, content
           FROM versions
           WHERE entity_key = ?1
             AND (?2 IS NULL OR captured_on = ?2)
           ORDER BY captured_on DESC
           LIMIT ?3",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![key, date_str, limit], |row| {
            Ok(RawVersion {
              entity_key:  row.get(0)?,
              captured_on: row.get(1)?,
              content:     row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVersion::into_version).collect()
  }
}

// ─── SnapshotStore impl ──────────────────────────────────────────────────────

impl SnapshotStore for SqliteStore {
  type Error = crate::Error;

  // ── Versions ──────────────────────────────────────────────────────────────

  async fn latest(&self, entity: Entity) -> Result<Option<Version>> {
    let mut newest = self.query_versions(&entity, None, Some(1)).await?;
    Ok(newest.pop())
  }

  async fn all_versions(&self, entity: Entity) -> Result<Vec<Version>> {
    self.query_versions(&entity, None, None).await
  }

  async fn version_dates(&self, entity: Entity) -> Result<Vec<NaiveDate>> {
    let key = entity.storage_key().to_owned();

    let raws: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT captured_on FROM versions
           WHERE entity_key = ?1
           ORDER BY captured_on DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![key], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    raws.iter().map(|s| decode_date(s)).collect()
  }

  async fn get_version(
    &self,
    entity: Entity,
    date:   NaiveDate,
  ) -> Result<Option<Version>> {
    let mut found = self.query_versions(&entity, Some(date), Some(1)).await?;
    Ok(found.pop())
  }

  async fn write_if_changed(
    &self,
    entity:  Entity,
    date:    NaiveDate,
    content: String,
  ) -> Result<WriteOutcome> {
    let key      = entity.storage_key().to_owned();
    let date_str = encode_date(date);
    let now_str  = encode_dt(Utc::now());

    // Comparison and write share one transaction, so the version becomes
    // visible to readers only on commit.
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let current: Option<String> = tx
          .query_row(
            "SELECT content FROM versions
             WHERE entity_key = ?1
             ORDER BY captured_on DESC
             LIMIT 1",
            rusqlite::params![key],
            |row| row.get(0),
          )
          .optional()?;

        let outcome = match current {
          None => WriteOutcome::CreatedNew,
          Some(prev) if prev == content => WriteOutcome::Unchanged,
          Some(_) => WriteOutcome::Created,
        };

        if outcome == WriteOutcome::CreatedNew {
          tx.execute(
            "INSERT OR IGNORE INTO entities (entity_key, created_at) VALUES (?1, ?2)",
            rusqlite::params![key, now_str],
          )?;
        }

        if outcome.is_write() {
          tx.execute(
            "INSERT INTO versions (entity_key, captured_on, content, written_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (entity_key, captured_on)
             DO UPDATE SET content = excluded.content, written_at = excluded.written_at",
            rusqlite::params![key, date_str, content, now_str],
          )?;
        }

        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    Ok(outcome)
  }

  // ── Locators ──────────────────────────────────────────────────────────────

  async fn replace_locators(&self, locators: Vec<Locator>) -> Result<()> {
    let rows: Vec<(String, String, String)> = locators
      .into_iter()
      .map(|l| (l.slug.to_string(), l.name, l.locator))
      .collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM locators", [])?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO locators (slug, name, locator) VALUES (?1, ?2, ?3)",
          )?;
          for (slug, name, locator) in &rows {
            stmt.execute(rusqlite::params![slug, name, locator])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_locator(&self, slug: Slug) -> Result<Option<Locator>> {
    let slug_str = slug.to_string();

    let raw: Option<RawLocator> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT slug, name, locator FROM locators WHERE slug = ?1",
            rusqlite::params![slug_str],
            |row| {
              Ok(RawLocator {
                slug:    row.get(0)?,
                name:    row.get(1)?,
                locator: row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawLocator::into_locator).transpose()
  }

  async fn list_locators(&self) -> Result<Vec<Locator>> {
    let raws: Vec<RawLocator> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT slug, name, locator FROM locators ORDER BY name")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawLocator {
              slug:    row.get(0)?,
              name:    row.get(1)?,
              locator: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLocator::into_locator).collect()
  }

  // ── Cycle marker ──────────────────────────────────────────────────────────

  async fn last_cycle(&self) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = self
      .conn
      .call(|conn| {
        Ok(conn
          .query_row(
            "SELECT completed_at FROM cycle_marker WHERE id = 1",
            [],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    raw.as_deref().map(decode_dt).transpose()
  }

  async fn record_cycle(&self, at: DateTime<Utc>) -> Result<()> {
    let at_str = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO cycle_marker (id, completed_at) VALUES (1, ?1)
           ON CONFLICT (id) DO UPDATE SET completed_at = excluded.completed_at",
          rusqlite::params![at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
