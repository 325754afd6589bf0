use anyhow::{bail, Result};
use lancedb::database::CreateTableMode;
use lancedb::Connection;
use arrow_array::{RecordBatch, RecordBatchIterator, FixedSizeListArray, StringArray};
use std::sync::Arc;

use baymax_core::types::IndexEntry;
use crate::schema::{build_passage_schema, EMPTY_COLLECTION_DIM};

/// Writes `entries` as the complete new contents of `table_name`.
///
/// The table is recreated in overwrite mode, so concurrent readers keep seeing
/// the previous version until the new one is committed. An empty slice leaves
/// an empty table behind with a placeholder vector width.
pub async fn overwrite_table(db: &Connection, table_name: &str, entries: &[IndexEntry]) -> Result<usize> {
	let dim = match entries.first() {
		Some(e) => i32::try_from(e.embedding.len())?,
		None => EMPTY_COLLECTION_DIM,
	};
	let schema = build_passage_schema(dim);
	let batches = if entries.is_empty() { vec![] } else { vec![Ok(entries_to_record_batch(entries, dim)?)] };
	let reader = Box::new(RecordBatchIterator::new(batches.into_iter(), schema));
	db.create_table(table_name, reader).mode(CreateTableMode::Overwrite).execute().await?;
	tracing::debug!(table = table_name, rows = entries.len(), dim, "collection overwritten");
	Ok(entries.len())
}

pub fn entries_to_record_batch(entries: &[IndexEntry], dim: i32) -> Result<RecordBatch> {
	let schema = build_passage_schema(dim);
	let mut ids = Vec::with_capacity(entries.len()); let mut texts = Vec::with_capacity(entries.len());
	let mut topic_ids = Vec::with_capacity(entries.len()); let mut topic_names = Vec::with_capacity(entries.len());
	let mut sections = Vec::with_capacity(entries.len()); let mut sources = Vec::with_capacity(entries.len());
	let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(entries.len());
	for e in entries {
		if i32::try_from(e.embedding.len()).ok() != Some(dim) {
			bail!("entry {} has {} dimensions, collection expects {}", e.id, e.embedding.len(), dim);
		}
		let meta = &e.passage.metadata;
		ids.push(e.id.clone()); texts.push(e.passage.text.clone());
		topic_ids.push(meta.topic_id.clone()); topic_names.push(meta.topic_name.clone());
		sections.push(meta.section.clone()); sources.push(meta.sources.clone());
		vectors.push(Some(e.embedding.iter().map(|&x| Some(x)).collect()));
	}
	let record_batch = RecordBatch::try_new(schema, vec![
		Arc::new(StringArray::from(ids)),
		Arc::new(StringArray::from(texts)),
		Arc::new(StringArray::from(topic_ids)),
		Arc::new(StringArray::from(topic_names)),
		Arc::new(StringArray::from(sections)),
		Arc::new(StringArray::from(sources)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), dim)),
	])?;
	Ok(record_batch)
}

#[cfg(test)]
mod tests {
	use super::*;
	use baymax_core::types::{Attribution, Passage};

	fn entry(id: &str, width: usize) -> IndexEntry {
		IndexEntry { id: id.into(), embedding: vec![0.5; width], passage: Passage { text: "teks".into(), metadata: Attribution::default() } }
	}

	#[test]
	fn mixed_widths_are_rejected() {
		let err = entries_to_record_batch(&[entry("doc-0", 4), entry("doc-1", 3)], 4).unwrap_err();
		assert!(err.to_string().contains("doc-1 has 3 dimensions"), "{err}");
	}

	#[test]
	fn batch_has_one_row_per_entry() {
		let batch = entries_to_record_batch(&[entry("doc-0", 4), entry("doc-1", 4)], 4).expect("batch");
		assert_eq!(batch.num_rows(), 2);
	}
}
