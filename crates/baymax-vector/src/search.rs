use anyhow::{anyhow, Result};
use arrow_array::{Array, Float32Array, RecordBatch, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};

use baymax_core::types::{Attribution, Passage, ScoredPassage};
use crate::schema::{COL_DISTANCE, COL_ID, COL_SECTION, COL_SOURCES, COL_TEXT, COL_TOPIC_ID, COL_TOPIC_NAME};

/// Cosine nearest-neighbour search. Scores are `1 - distance`, best first,
/// ties broken by id so repeated queries return the same order.
pub async fn search_vec(table: &Table, q_vec: &[f32], k: usize) -> Result<Vec<ScoredPassage>> {
	let mut stream = table
		.vector_search(q_vec.to_vec())?
		.distance_type(DistanceType::Cosine)
		.limit(k)
		.execute()
		.await?;
	let mut hits = Vec::new();
	while let Some(batch) = TryStreamExt::try_next(&mut stream).await? {
		hits.extend(decode_batch(&batch)?);
	}
	hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
	hits.truncate(k);
	Ok(hits)
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<StringArray>())
		.ok_or_else(|| anyhow!("column '{}' missing or not utf8", name))
}

fn opt_value(col: &StringArray, i: usize) -> Option<String> {
	if col.is_null(i) { None } else { Some(col.value(i).to_string()) }
}

pub fn decode_batch(batch: &RecordBatch) -> Result<Vec<ScoredPassage>> {
	let ids = string_col(batch, COL_ID)?;
	let texts = string_col(batch, COL_TEXT)?;
	let topic_ids = string_col(batch, COL_TOPIC_ID)?;
	let topic_names = string_col(batch, COL_TOPIC_NAME)?;
	let sections = string_col(batch, COL_SECTION)?;
	let sources = string_col(batch, COL_SOURCES)?;
	let distance = batch.column_by_name(COL_DISTANCE).and_then(|c| c.as_any().downcast_ref::<Float32Array>());
	let mut out = Vec::with_capacity(batch.num_rows());
	for i in 0..batch.num_rows() {
		let score = distance.map_or(0.0, |d| 1.0 - d.value(i));
		let metadata = Attribution {
			topic_id: opt_value(topic_ids, i),
			topic_name: opt_value(topic_names, i),
			section: opt_value(sections, i),
			sources: if sources.is_null(i) { String::new() } else { sources.value(i).to_string() },
		};
		out.push(ScoredPassage {
			id: ids.value(i).to_string(),
			score,
			passage: Passage { text: texts.value(i).to_string(), metadata },
		});
	}
	Ok(out)
}
