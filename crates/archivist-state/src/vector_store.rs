//! C7 vector store: one LanceDB table per embedding dimension, bridged from
//! the synchronous store surface via a shared tokio runtime.
//!
//! Only one dimension is ever live for a given store directory — the
//! collection's dimension is pinned on first write, and a later write with a
//! different dimension is a hard `DimensionMismatch` error surfaced to the
//! orchestrator.

use archivist_core::error::StateError;
use arrow_array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator,
    StringArray,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{Connection as LanceConnection, DistanceType};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::runtime::Runtime;

const ANN_INDEX_ROW_THRESHOLD: usize = 256;
const TABLE_PREFIX: &str = "vectors_";

static LANCE_RUNTIME: OnceLock<Runtime> = OnceLock::new();
static LANCE_CONN_CACHE: OnceLock<Mutex<HashMap<String, LanceConnection>>> = OnceLock::new();

fn rt() -> Result<&'static Runtime, StateError> {
    if let Some(rt) = LANCE_RUNTIME.get() {
        return Ok(rt);
    }
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(|e| StateError::Sqlite(format!("failed to create lancedb runtime: {e}")))?;
    Ok(LANCE_RUNTIME.get_or_init(|| runtime))
}

fn conn_cache() -> &'static Mutex<HashMap<String, LanceConnection>> {
    LANCE_CONN_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

fn block_on<F: std::future::Future>(f: F) -> Result<F::Output, StateError> {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        Ok(tokio::task::block_in_place(|| handle.block_on(f)))
    } else {
        Ok(rt()?.block_on(f))
    }
}

fn table_name(dim: usize) -> String {
    format!("{TABLE_PREFIX}{dim}d")
}

fn make_schema(dim: i32) -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("file_id", DataType::Utf8, false),
        Field::new("path", DataType::Utf8, false),
        Field::new("language", DataType::Utf8, false),
        Field::new("partition_id", DataType::Utf8, false),
        Field::new("authority_score", DataType::Float32, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
            false,
        ),
    ]))
}

/// A single row to be written into the vector store.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub file_id: String,
    pub path: String,
    pub language: String,
    pub partition_id: String,
    pub authority_score: f64,
    pub vector: Vec<f32>,
}

/// A single nearest-neighbour hit from `search` (cosine similarity).
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub file_id: String,
    pub score: f64,
}

/// Filter pushed into `search` so C10 doesn't have to re-filter results it
/// already asked the store to exclude.
#[derive(Debug, Clone, Default)]
pub struct VectorFilter {
    pub partition_id: Option<String>,
    pub language: Option<String>,
}

pub struct VectorStore {
    dir: PathBuf,
}

impl VectorStore {
    pub fn open(base_dir: &Path) -> Self {
        Self {
            dir: base_dir.to_path_buf(),
        }
    }

    async fn connection(&self) -> Result<LanceConnection, StateError> {
        let key = self.dir.to_string_lossy().to_string();
        if let Ok(cache) = conn_cache().lock()
            && let Some(c) = cache.get(&key)
        {
            return Ok(c.clone());
        }
        std::fs::create_dir_all(&self.dir).map_err(StateError::Io)?;
        let conn = lancedb::connect(self.dir.to_str().unwrap_or("."))
            .execute()
            .await
            .map_err(|e| StateError::Sqlite(format!("lancedb connect: {e}")))?;
        if let Ok(mut cache) = conn_cache().lock() {
            cache.insert(key, conn.clone());
        }
        Ok(conn)
    }

    async fn existing_tables(&self, conn: &LanceConnection) -> Result<Vec<String>, StateError> {
        conn.table_names()
            .execute()
            .await
            .map_err(|e| StateError::Sqlite(format!("lancedb table_names: {e}")))
    }

    /// The dimension pinned for this store, if any vectors have ever been
    /// written.
    pub fn dimension(&self) -> Result<Option<usize>, StateError> {
        block_on(async {
            let conn = self.connection().await?;
            let tables = self.existing_tables(&conn).await?;
            Ok(tables
                .iter()
                .find(|n| n.starts_with(TABLE_PREFIX))
                .and_then(|n| n.trim_start_matches(TABLE_PREFIX).strip_suffix('d'))
                .and_then(|d| d.parse::<usize>().ok()))
        })?
    }

    pub fn count(&self) -> Result<usize, StateError> {
        let Some(dim) = self.dimension()? else {
            return Ok(0);
        };
        block_on(async {
            let conn = self.connection().await?;
            let table = conn
                .open_table(table_name(dim))
                .execute()
                .await
                .map_err(|e| StateError::Sqlite(format!("lancedb open_table: {e}")))?;
            table
                .count_rows(None)
                .await
                .map_err(|e| StateError::Sqlite(format!("lancedb count_rows: {e}")))
        })?
    }

    /// Replace any prior vectors for these `file_id`s and insert the new
    /// ones. Every record in `records` must share the same dimension, and
    /// that dimension must match any dimension already pinned for this store.
    /// Writing a mismatched vector is a hard error; nothing is mutated.
    pub fn upsert(&self, records: &[VectorRecord]) -> Result<usize, StateError> {
        if records.is_empty() {
            return Ok(0);
        }
        let dim = records[0].vector.len();
        if let Some(mismatched) = records.iter().find(|r| r.vector.len() != dim) {
            return Err(StateError::DimensionMismatch {
                collection: dim,
                got: mismatched.vector.len(),
            });
        }
        if let Some(pinned) = self.dimension()?
            && pinned != dim
        {
            return Err(StateError::DimensionMismatch {
                collection: pinned,
                got: dim,
            });
        }

        let batch = records_to_batch(records, dim as i32)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);
        let file_ids: Vec<String> = records.iter().map(|r| r.file_id.clone()).collect();

        block_on(async {
            let conn = self.connection().await?;
            let table = open_or_create_table(&conn, dim).await?;

            let predicate = format!(
                "file_id IN ({})",
                file_ids
                    .iter()
                    .map(|id| format!("'{}'", escape(id)))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            table
                .delete(&predicate)
                .await
                .map_err(|e| StateError::Sqlite(format!("lancedb delete before upsert: {e}")))?;

            table
                .add(Box::new(reader))
                .execute()
                .await
                .map_err(|e| StateError::Sqlite(format!("lancedb add: {e}")))?;

            maybe_create_ann_index(&table).await;
            Ok::<(), StateError>(())
        })??;
        Ok(records.len())
    }

    pub fn delete(&self, file_id: &str) -> Result<(), StateError> {
        let Some(dim) = self.dimension()? else {
            return Ok(());
        };
        block_on(async {
            let conn = self.connection().await?;
            let table = conn
                .open_table(table_name(dim))
                .execute()
                .await
                .map_err(|e| StateError::Sqlite(format!("lancedb open_table: {e}")))?;
            table
                .delete(&format!("file_id = '{}'", escape(file_id)))
                .await
                .map_err(|e| StateError::Sqlite(format!("lancedb delete: {e}")))
        })?
    }

    /// Cosine-similarity top-k, deterministically tie-broken by `file_id`
    /// ascending.
    pub fn search(
        &self,
        query_vector: &[f32],
        k: usize,
        filter: Option<&VectorFilter>,
    ) -> Result<Vec<VectorMatch>, StateError> {
        if k == 0 || query_vector.is_empty() {
            return Ok(Vec::new());
        }
        let dim = query_vector.len();
        let predicate = filter.and_then(|f| build_filter_predicate(f));

        let matches = block_on(async {
            let conn = self.connection().await?;
            let table = match conn.open_table(table_name(dim)).execute().await {
                Ok(t) => t,
                Err(lancedb::Error::TableNotFound { .. }) => return Ok(Vec::new()),
                Err(e) => return Err(StateError::Sqlite(format!("lancedb open_table: {e}"))),
            };

            let mut query = table
                .vector_search(query_vector)
                .map_err(|e| StateError::Sqlite(format!("lancedb vector_search: {e}")))?
                .distance_type(DistanceType::Cosine)
                .limit(k)
                .select(Select::columns(&["file_id"]));
            if let Some(p) = predicate.as_deref() {
                query = query.only_if(p);
            }

            let batches: Vec<RecordBatch> = query
                .execute()
                .await
                .map_err(|e| StateError::Sqlite(format!("lancedb execute: {e}")))?
                .try_collect()
                .await
                .map_err(|e| StateError::Sqlite(format!("lancedb collect: {e}")))?;

            let mut out = Vec::new();
            for batch in &batches {
                parse_matches(batch, &mut out);
            }
            Ok(out)
        })??;

        let mut matches = matches;
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.file_id.cmp(&b.file_id))
        });
        matches.truncate(k);
        Ok(matches)
    }
}

async fn open_or_create_table(
    conn: &LanceConnection,
    dim: usize,
) -> Result<lancedb::Table, StateError> {
    let name = table_name(dim);
    match conn.open_table(&name).execute().await {
        Ok(t) => Ok(t),
        Err(lancedb::Error::TableNotFound { .. }) => {
            let schema = make_schema(dim as i32);
            conn.create_empty_table(&name, schema)
                .execute()
                .await
                .map_err(|e| StateError::Sqlite(format!("lancedb create_table: {e}")))
        }
        Err(e) => Err(StateError::Sqlite(format!("lancedb open_table: {e}"))),
    }
}

async fn maybe_create_ann_index(table: &lancedb::Table) {
    let row_count = table.count_rows(None).await.unwrap_or(0);
    if row_count < ANN_INDEX_ROW_THRESHOLD {
        return;
    }
    let indices = match table.list_indices().await {
        Ok(i) => i,
        Err(_) => return,
    };
    if indices.iter().any(|idx| idx.columns.contains(&"vector".to_string())) {
        return;
    }
    if let Err(e) = table
        .create_index(&["vector"], lancedb::index::Index::Auto)
        .execute()
        .await
    {
        tracing::warn!(error = %e, "failed to create ANN index, brute-force scan still works");
    }
}

fn records_to_batch(records: &[VectorRecord], dim: i32) -> Result<RecordBatch, StateError> {
    let schema = make_schema(dim);
    let file_ids = StringArray::from(records.iter().map(|r| r.file_id.as_str()).collect::<Vec<_>>());
    let paths = StringArray::from(records.iter().map(|r| r.path.as_str()).collect::<Vec<_>>());
    let languages = StringArray::from(records.iter().map(|r| r.language.as_str()).collect::<Vec<_>>());
    let partitions = StringArray::from(records.iter().map(|r| r.partition_id.as_str()).collect::<Vec<_>>());
    let authorities = Float32Array::from(
        records
            .iter()
            .map(|r| r.authority_score as f32)
            .collect::<Vec<_>>(),
    );

    let flat: Vec<f32> = records.iter().flat_map(|r| r.vector.iter().copied()).collect();
    let values = Float32Array::from(flat);
    let inner = Arc::new(Field::new("item", DataType::Float32, true));
    let vectors = FixedSizeListArray::new(inner, dim, Arc::new(values), None);

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(file_ids) as ArrayRef,
            Arc::new(paths),
            Arc::new(languages),
            Arc::new(partitions),
            Arc::new(authorities),
            Arc::new(vectors),
        ],
    )
    .map_err(|e| StateError::Sqlite(format!("arrow RecordBatch: {e}")))
}

fn parse_matches(batch: &RecordBatch, out: &mut Vec<VectorMatch>) {
    let file_ids = batch
        .column_by_name("file_id")
        .and_then(|c| c.as_any().downcast_ref::<StringArray>());
    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>());
    let (Some(file_ids), Some(distances)) = (file_ids, distances) else {
        return;
    };
    for i in 0..batch.num_rows() {
        out.push(VectorMatch {
            file_id: file_ids.value(i).to_string(),
            score: 1.0 - distances.value(i) as f64,
        });
    }
}

fn build_filter_predicate(filter: &VectorFilter) -> Option<String> {
    let mut clauses = Vec::new();
    if let Some(p) = &filter.partition_id {
        clauses.push(format!("partition_id = '{}'", escape(p)));
    }
    if let Some(l) = &filter.language {
        clauses.push(format!("language = '{}'", escape(l)));
    }
    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" AND "))
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "''")
}
