use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

/// Vector width used for a collection written with no entries.
pub const EMPTY_COLLECTION_DIM: i32 = 1;

pub const COL_ID: &str = "id";
pub const COL_TEXT: &str = "text";
pub const COL_TOPIC_ID: &str = "topic_id";
pub const COL_TOPIC_NAME: &str = "topic_name";
pub const COL_SECTION: &str = "section";
pub const COL_SOURCES: &str = "sources";
pub const COL_VECTOR: &str = "vector";
pub const COL_DISTANCE: &str = "_distance";

pub fn build_passage_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(COL_ID, DataType::Utf8, false),
		Field::new(COL_TEXT, DataType::Utf8, false),
		Field::new(COL_TOPIC_ID, DataType::Utf8, true),
		Field::new(COL_TOPIC_NAME, DataType::Utf8, true),
		Field::new(COL_SECTION, DataType::Utf8, true),
		Field::new(COL_SOURCES, DataType::Utf8, false),
		Field::new(COL_VECTOR, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}

/// Key/value table holding per-collection build metadata.
pub fn build_meta_schema() -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("key", DataType::Utf8, false),
		Field::new("value", DataType::Utf8, false),
		Field::new("updated_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
	]))
}

/// Width of the `vector` column, if the schema has one.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
	match schema.field_with_name(COL_VECTOR).ok()?.data_type() {
		DataType::FixedSizeList(_, n) => usize::try_from(*n).ok(),
		_ => None,
	}
}
