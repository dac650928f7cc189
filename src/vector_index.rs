//! # VectorIndex
//!
//! Persistent embedding index for the knowledge base.
//!
//! Stores embedding vectors alongside their [`Document`] records in parallel,
//! insertion-ordered lists and answers "k most similar" queries with an exact
//! squared-Euclidean scan. Exactness matters here: results must come back in
//! a deterministic order (ascending distance, earlier-inserted wins on ties)
//! so that prompt assembly and its tests are reproducible.
//!
//! ## Serialization layout
//! Two artifacts per index instance, always written together at the end of a
//! mutating call:
//!
//! - `vectors.bin` — bincode blob holding the dimension and raw vectors.
//! - `documents.yaml` — the parallel ordered list of document records.
//!
//! Both are written to temp files first and atomically renamed into place, so
//! a crash mid-write leaves the previous durable state intact. A reader that
//! finds either file missing treats the pair as "no index yet", not corrupt.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, SupportRagError};
use crate::models::{Document, ScoredDocument};

const VECTORS_FILE: &str = "vectors.bin";
const DOCUMENTS_FILE: &str = "documents.yaml";

/// On-disk shape of the similarity structure.
#[derive(Serialize, Deserialize)]
struct VectorsBlob {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

/// Append-only nearest-neighbor index over embedded documents.
///
/// Invariant: `vectors.len() == documents.len()` and every vector has the
/// index's fixed dimension, after any mutating operation completes.
pub struct VectorIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
    documents: Vec<Document>,
    dir: PathBuf,
}

impl VectorIndex {
    /// Open the index stored under `dir`, or start a fresh empty one when no
    /// persisted artifacts exist yet.
    ///
    /// # Errors
    /// - [`SupportRagError::Config`] if a persisted index was built with a
    ///   different dimension than `dimension`.
    /// - [`SupportRagError::Storage`] if the two artifacts disagree with each
    ///   other (count mismatch) or fail to decode.
    pub fn open(dir: impl Into<PathBuf>, dimension: usize) -> Result<Self> {
        let dir = dir.into();
        let vectors_path = dir.join(VECTORS_FILE);
        let documents_path = dir.join(DOCUMENTS_FILE);

        if !vectors_path.is_file() || !documents_path.is_file() {
            tracing::info!("No persisted index under {}, starting empty", dir.display());
            return Ok(Self {
                dimension,
                vectors: Vec::new(),
                documents: Vec::new(),
                dir,
            });
        }

        tracing::info!("Loading index from {}", dir.display());
        let bytes = fs::read(&vectors_path)?;
        let (blob, _): (VectorsBlob, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
                .map_err(|e| SupportRagError::Storage(format!("decoding {VECTORS_FILE}: {e}")))?;

        if blob.dimension != dimension {
            return Err(SupportRagError::Config(format!(
                "index at {} was built with dimension {}, configured dimension is {}",
                dir.display(),
                blob.dimension,
                dimension
            )));
        }

        let documents: Vec<Document> = serde_yaml::from_str(&fs::read_to_string(&documents_path)?)?;

        if documents.len() != blob.vectors.len() {
            return Err(SupportRagError::Storage(format!(
                "index at {} is inconsistent: {} vectors but {} documents",
                dir.display(),
                blob.vectors.len(),
                documents.len()
            )));
        }

        Ok(Self {
            dimension,
            vectors: blob.vectors,
            documents,
            dir,
        })
    }

    /// Number of indexed documents.
    pub fn count(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Append documents with their embedding vectors and persist durably.
    ///
    /// Validates everything before touching the in-memory state: a count or
    /// dimension mismatch is a configuration error and leaves the index
    /// unchanged, in memory and on disk. On success both artifacts are
    /// written together before this returns.
    pub fn add(&mut self, documents: Vec<Document>, vectors: Vec<Vec<f32>>) -> Result<()> {
        if documents.len() != vectors.len() {
            return Err(SupportRagError::CountMismatch {
                documents: documents.len(),
                vectors: vectors.len(),
            });
        }
        for vector in &vectors {
            if vector.len() != self.dimension {
                return Err(SupportRagError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }

        let added = documents.len();
        self.vectors.extend(vectors);
        self.documents.extend(documents);
        self.save()?;
        tracing::info!("Added {} documents to index ({} total)", added, self.count());
        Ok(())
    }

    /// Query for the `k` entries nearest to `query_vector`.
    ///
    /// Returns at most `k` results ordered by ascending squared-Euclidean
    /// distance; ties are broken by insertion order (earlier wins). An empty
    /// index yields an empty vector, never an error.
    ///
    /// # Errors
    /// [`SupportRagError::DimensionMismatch`] if the query vector does not
    /// have the index's dimension.
    pub fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredDocument>> {
        if query_vector.len() != self.dimension {
            return Err(SupportRagError::DimensionMismatch {
                expected: self.dimension,
                actual: query_vector.len(),
            });
        }
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| (squared_l2(query_vector, vector), position))
            .collect();
        scored.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(i, (score, position))| ScoredDocument {
                document: self.documents[position].clone(),
                score,
                rank: i + 1,
            })
            .collect())
    }

    /// Write both artifacts durably, temp file + rename.
    fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let blob = VectorsBlob {
            dimension: self.dimension,
            vectors: self.vectors.clone(),
        };
        let encoded = bincode::serde::encode_to_vec(&blob, bincode::config::standard())
            .map_err(|e| SupportRagError::Storage(format!("encoding {VECTORS_FILE}: {e}")))?;
        let documents_yaml = serde_yaml::to_string(&self.documents)?;

        write_atomic(&self.dir, VECTORS_FILE, &encoded)?;
        write_atomic(&self.dir, DOCUMENTS_FILE, documents_yaml.as_bytes())?;
        Ok(())
    }
}

fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(dir.join(name))
        .map_err(|e| SupportRagError::Io(e.error))?;
    Ok(())
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> Document {
        Document::new(id, format!("text for {id}"))
    }

    fn index_with(dir: &Path, entries: &[(&str, [f32; 3])]) -> VectorIndex {
        let mut index = VectorIndex::open(dir, 3).unwrap();
        let documents = entries.iter().map(|(id, _)| doc(id)).collect();
        let vectors = entries.iter().map(|(_, v)| v.to_vec()).collect();
        index.add(documents, vectors).unwrap();
        index
    }

    #[test]
    fn search_on_empty_index_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::open(dir.path(), 3).unwrap();
        let hits = index.search(&[0.0, 0.0, 0.0], 3).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn search_returns_at_most_available() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_with(dir.path(), &[("a", [1.0, 0.0, 0.0]), ("b", [0.0, 1.0, 0.0])]);
        let hits = index.search(&[0.0, 0.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn scores_are_non_decreasing_and_ranked() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_with(
            dir.path(),
            &[
                ("far", [3.0, 0.0, 0.0]),
                ("near", [1.0, 0.0, 0.0]),
                ("mid", [2.0, 0.0, 0.0]),
            ],
        );
        let hits = index.search(&[0.0, 0.0, 0.0], 3).unwrap();
        assert_eq!(hits[0].document.id, "near");
        assert_eq!(hits[1].document.id, "mid");
        assert_eq!(hits[2].document.id, "far");
        assert!(hits[0].score <= hits[1].score);
        assert!(hits[1].score <= hits[2].score);
        assert_eq!(
            hits.iter().map(|h| h.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        // Squared distances, not roots.
        assert_eq!(hits[0].score, 1.0);
        assert_eq!(hits[2].score, 9.0);
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_with(
            dir.path(),
            &[
                ("first", [1.0, 1.0, 0.0]),
                ("second", [1.0, 1.0, 0.0]),
                ("third", [1.0, 1.0, 0.0]),
            ],
        );
        let hits = index.search(&[1.0, 1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].document.id, "first");
        assert_eq!(hits[1].document.id, "second");
    }

    #[test]
    fn add_count_mismatch_leaves_index_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = index_with(dir.path(), &[("a", [1.0, 0.0, 0.0])]);
        let err = index
            .add(vec![doc("b"), doc("c")], vec![vec![0.0, 0.0, 0.0]])
            .unwrap_err();
        assert!(matches!(err, SupportRagError::CountMismatch { .. }));
        assert_eq!(index.count(), 1);
    }

    #[test]
    fn add_dimension_mismatch_leaves_index_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = VectorIndex::open(dir.path(), 3).unwrap();
        let err = index
            .add(
                vec![doc("a"), doc("b")],
                vec![vec![1.0, 0.0, 0.0], vec![1.0, 0.0]],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            SupportRagError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(index.count(), 0);
        // Nothing was persisted either.
        let reopened = VectorIndex::open(dir.path(), 3).unwrap();
        assert_eq!(reopened.count(), 0);
    }

    #[test]
    fn persisted_index_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_with(
            dir.path(),
            &[
                ("a", [0.1, 0.2, 0.3]),
                ("b", [0.9, 0.8, 0.7]),
                ("c", [0.4, 0.4, 0.4]),
            ],
        );
        let query = [0.35, 0.4, 0.45];
        let before = index.search(&query, 2).unwrap();

        let reopened = VectorIndex::open(dir.path(), 3).unwrap();
        assert_eq!(reopened.count(), 3);
        let after = reopened.search(&query, 2).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn dimension_mismatch_on_open_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        index_with(dir.path(), &[("a", [1.0, 0.0, 0.0])]);
        let err = VectorIndex::open(dir.path(), 5).unwrap_err();
        assert!(matches!(err, SupportRagError::Config(_)));
    }

    #[test]
    fn query_dimension_mismatch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_with(dir.path(), &[("a", [1.0, 0.0, 0.0])]);
        assert!(index.search(&[1.0, 0.0], 1).is_err());
    }
}
