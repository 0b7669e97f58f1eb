//! Snapshot repository.
//!
//! Snapshots are append-only. The run reads the latest snapshot of every job
//! in a single anti-join query, so the cost does not grow with the number of
//! jobs or with the length of their history.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::last_insert_id;
use super::models::{NewSnapshot, SnapshotRecord};
use super::pool::{DbError, DbPool};
use super::util::{format_date, format_datetime, format_time, parse_date, parse_datetime, parse_time};
use crate::models::Snapshot;
use crate::schema::snapshots;

impl From<SnapshotRecord> for Snapshot {
    fn from(record: SnapshotRecord) -> Self {
        Snapshot {
            id: record.id,
            document_instance_id: record.document_instance_id,
            date: parse_date(&record.date),
            time: parse_time(&record.time),
            datetime: parse_datetime(&record.datetime),
            text: record.text,
        }
    }
}

#[derive(Clone)]
pub struct SnapshotRepository {
    pool: DbPool,
}

impl SnapshotRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Latest snapshot of each given instance, keyed by instance id.
    ///
    /// The latest snapshot is the one with no sibling at a later datetime.
    /// Equal datetimes fall back to the higher id. Instances without any
    /// snapshot are absent from the map.
    pub async fn latest_for_instances(
        &self,
        instance_ids: &[i32],
    ) -> Result<HashMap<i32, Snapshot>, DbError> {
        if instance_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self.pool.get().await?;

        let id_list = instance_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let query = format!(
            r#"SELECT s.id AS id,
                      s.document_instance_id AS document_instance_id,
                      s.date AS date,
                      s.time AS time,
                      s.datetime AS datetime,
                      s.text AS text
               FROM snapshots s
               LEFT JOIN snapshots later
                 ON later.document_instance_id = s.document_instance_id
                AND (later.datetime > s.datetime
                     OR (later.datetime = s.datetime AND later.id > s.id))
               WHERE later.id IS NULL
                 AND s.document_instance_id IN ({})"#,
            id_list
        );

        let records: Vec<SnapshotRecord> = diesel::sql_query(&query).load(&mut conn).await?;

        Ok(records
            .into_iter()
            .map(|record| (record.document_instance_id, Snapshot::from(record)))
            .collect())
    }

    /// Append a snapshot captured at `at`.
    pub async fn insert(
        &self,
        instance_id: i32,
        text: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Snapshot, DbError> {
        let mut conn = self.pool.get().await?;

        let date = format_date(&at);
        let time = format_time(&at);
        let datetime = format_datetime(&at);

        diesel::insert_into(snapshots::table)
            .values(NewSnapshot {
                document_instance_id: instance_id,
                date: &date,
                time: &time,
                datetime: &datetime,
                text,
            })
            .execute(&mut conn)
            .await?;

        let id = last_insert_id(&mut conn).await?;

        Ok(Snapshot {
            id,
            document_instance_id: instance_id,
            date: at.date_naive(),
            time: at.time(),
            datetime: at,
            text: text.map(str::to_string),
        })
    }

    /// Every snapshot of one instance, oldest first.
    pub async fn history(&self, instance_id: i32) -> Result<Vec<Snapshot>, DbError> {
        let mut conn = self.pool.get().await?;

        snapshots::table
            .filter(snapshots::document_instance_id.eq(instance_id))
            .order((snapshots::datetime.asc(), snapshots::id.asc()))
            .select(SnapshotRecord::as_select())
            .load::<SnapshotRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(Snapshot::from).collect())
    }

    /// Number of snapshots stored for one instance.
    pub async fn count_for_instance(&self, instance_id: i32) -> Result<i64, DbError> {
        let mut conn = self.pool.get().await?;

        snapshots::table
            .filter(snapshots::document_instance_id.eq(instance_id))
            .count()
            .get_result(&mut conn)
            .await
    }
}
