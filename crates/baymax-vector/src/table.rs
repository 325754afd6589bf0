//! Store directory handling and the `meta` key/value table.
//!
//! Each collection gets one `build_info:<collection>` row holding the JSON of
//! its last [`BuildInfo`]. The row is upserted so rebuilds never accumulate
//! history.

use anyhow::{anyhow, Result};
use arrow_array::{RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};
use std::path::Path;
use std::sync::Arc;

use baymax_core::types::BuildInfo;
use crate::schema::build_meta_schema;

pub const META_TABLE: &str = "meta";

/// Connects to the LanceDB directory at `dir`, creating it first if needed.
pub async fn open_dir(dir: &Path) -> Result<Connection> {
	std::fs::create_dir_all(dir)?;
	Ok(connect(dir.to_string_lossy().as_ref()).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
	Ok(conn.table_names().execute().await?.iter().any(|n| n == name))
}

pub fn build_info_key(collection: &str) -> String {
	format!("build_info:{collection}")
}

pub async fn write_build_info(conn: &Connection, collection: &str, info: &BuildInfo) -> Result<()> {
	put_meta(conn, &build_info_key(collection), &serde_json::to_string(info)?).await
}

pub async fn read_build_info(conn: &Connection, collection: &str) -> Result<Option<BuildInfo>> {
	match fetch_meta(conn, &build_info_key(collection)).await? {
		Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
		None => Ok(None),
	}
}

async fn put_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
	let schema = build_meta_schema();
	let row = RecordBatch::try_new(
		schema.clone(),
		vec![
			Arc::new(StringArray::from(vec![key])),
			Arc::new(StringArray::from(vec![value])),
			Arc::new(TimestampMillisecondArray::from(vec![chrono::Utc::now().timestamp_millis()])),
		],
	)?;
	let rows = Box::new(RecordBatchIterator::new(vec![Ok(row)].into_iter(), schema.clone()));
	if !table_exists(conn, META_TABLE).await? {
		conn.create_table(META_TABLE, rows).execute().await?;
		return Ok(());
	}
	let meta = conn.open_table(META_TABLE).execute().await?;
	let mut upsert = meta.merge_insert(&["key"]);
	upsert.when_matched_update_all(None).when_not_matched_insert_all();
	upsert.execute(rows).await?;
	Ok(())
}

async fn fetch_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
	if !table_exists(conn, META_TABLE).await? {
		return Ok(None);
	}
	let meta = conn.open_table(META_TABLE).execute().await?;
	let filter = format!("key = '{}'", key.replace('\'', "''"));
	let mut stream = meta.query().only_if(filter).execute().await?;
	while let Some(batch) = stream.try_next().await? {
		if batch.num_rows() == 0 {
			continue;
		}
		let values = batch
			.column_by_name("value")
			.and_then(|c| c.as_any().downcast_ref::<StringArray>())
			.ok_or_else(|| anyhow!("meta table has no utf8 'value' column"))?;
		return Ok(Some(values.value(0).to_string()));
	}
	Ok(None)
}
