// ---------------------------------------------------------------------------
// SimilarityIndex: eager all-pairs cosine index
// ---------------------------------------------------------------------------
//
// `fit` computes the full n x n cosine matrix up front (O(n^2 * d) time,
// O(n^2) space), so it is only suitable for small catalogues. Each fit
// produces a new immutable snapshot with a bumped version number.
//
// Ranking contract shared by every query path:
//   - descending similarity
//   - ties keep row order (stable sort)
//   - item queries never return the query item itself
// ---------------------------------------------------------------------------

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RecommendError;
use crate::sparse::{cosine_similarity_with_magnitude, FeatureMatrix, SparseVector};
use crate::types::Scored;

/// One fitted generation of the index.
#[derive(Debug)]
pub struct IndexSnapshot {
	version: u64,
	ids: Vec<String>,
	positions: HashMap<String, usize>,
	matrix: FeatureMatrix,
	magnitudes: Vec<f64>,
	/// Row-major n x n cosine matrix.
	similarities: Vec<f64>,
}

impl IndexSnapshot {
	/// `positions` must map every ID in `ids` to its own row.
	fn build(
		matrix: FeatureMatrix,
		ids: Vec<String>,
		positions: HashMap<String, usize>,
		version: u64,
	) -> Self {
		let n = ids.len();
		let magnitudes: Vec<f64> = matrix.rows().iter().map(SparseVector::norm).collect();

		let mut similarities = vec![0.0; n * n];
		for i in 0..n {
			similarities[i * n + i] = if magnitudes[i] > 0.0 { 1.0 } else { 0.0 };
			for j in (i + 1)..n {
				let sim = cosine_similarity_with_magnitude(
					&matrix.rows()[i],
					&matrix.rows()[j],
					magnitudes[i],
					magnitudes[j],
				);
				similarities[i * n + j] = sim;
				similarities[j * n + i] = sim;
			}
		}

		Self {
			version,
			ids,
			positions,
			matrix,
			magnitudes,
			similarities,
		}
	}

	pub fn version(&self) -> u64 {
		self.version
	}

	pub fn ids(&self) -> &[String] {
		&self.ids
	}

	pub fn matrix(&self) -> &FeatureMatrix {
		&self.matrix
	}

	fn row_similarities(&self, row: usize) -> &[f64] {
		let n = self.ids.len();
		&self.similarities[row * n..(row + 1) * n]
	}
}

#[derive(Default)]
pub struct SimilarityIndex {
	snapshot: Option<Arc<IndexSnapshot>>,
	generation: u64,
}

impl SimilarityIndex {
	pub fn new() -> Self {
		Self::default()
	}

	/// Fit on `matrix` whose row `i` belongs to `ids[i]`. Replaces any
	/// previous snapshot wholesale. IDs must be unique; on any error the
	/// current snapshot is left as it was.
	pub fn fit(&mut self, matrix: FeatureMatrix, ids: Vec<String>) -> Result<(), RecommendError> {
		if matrix.len() != ids.len() {
			return Err(RecommendError::InvalidQuery {
				expected: matrix.len(),
				got: ids.len(),
			});
		}
		let mut positions = HashMap::with_capacity(ids.len());
		for (i, id) in ids.iter().enumerate() {
			if positions.insert(id.clone(), i).is_some() {
				return Err(RecommendError::DuplicateId(id.clone()));
			}
		}
		let version = self.generation + 1;
		let snapshot = IndexSnapshot::build(matrix, ids, positions, version);
		tracing::debug!(
			items = snapshot.ids.len(),
			dim = snapshot.matrix.dim(),
			version,
			"Similarity index fitted"
		);
		self.snapshot = Some(Arc::new(snapshot));
		self.generation = version;
		Ok(())
	}

	/// Top `top_n` item IDs most similar to `item_id`, excluding itself.
	/// Unknown IDs yield an empty list.
	pub fn recommend(&self, item_id: &str, top_n: usize) -> Result<Vec<String>, RecommendError> {
		Ok(self
			.recommend_scored(item_id, top_n)?
			.into_iter()
			.map(|s| s.id)
			.collect())
	}

	pub fn recommend_scored(
		&self,
		item_id: &str,
		top_n: usize,
	) -> Result<Vec<Scored>, RecommendError> {
		let snap = self.snapshot()?;
		let row = match snap.positions.get(item_id) {
			Some(&row) => row,
			None => {
				tracing::debug!(item_id, "Unknown item id, no recommendations");
				return Ok(Vec::new());
			}
		};
		if top_n == 0 {
			return Ok(Vec::new());
		}

		let sims = snap.row_similarities(row);
		let candidates = (0..snap.ids.len())
			.filter(|&j| j != row)
			.map(|j| (j, sims[j]))
			.collect();
		Ok(rank(&snap, candidates, top_n))
	}

	/// Top `top_n` item IDs most similar to an arbitrary query vector.
	pub fn recommend_for_vector(
		&self,
		query: &SparseVector,
		top_n: usize,
	) -> Result<Vec<String>, RecommendError> {
		Ok(self
			.recommend_for_vector_scored(query, top_n)?
			.into_iter()
			.map(|s| s.id)
			.collect())
	}

	pub fn recommend_for_vector_scored(
		&self,
		query: &SparseVector,
		top_n: usize,
	) -> Result<Vec<Scored>, RecommendError> {
		let snap = self.snapshot()?;
		if query.dim() != snap.matrix.dim() {
			return Err(RecommendError::InvalidQuery {
				expected: snap.matrix.dim(),
				got: query.dim(),
			});
		}
		if top_n == 0 {
			return Ok(Vec::new());
		}

		let query_mag = query.norm();
		let candidates = snap
			.matrix
			.rows()
			.iter()
			.enumerate()
			.map(|(j, row)| {
				(
					j,
					cosine_similarity_with_magnitude(query, row, query_mag, snap.magnitudes[j]),
				)
			})
			.collect();
		Ok(rank(&snap, candidates, top_n))
	}

	/// Stored similarity between two fitted items.
	pub fn similarity(&self, a: &str, b: &str) -> Result<Option<f64>, RecommendError> {
		let snap = self.snapshot()?;
		let (Some(&i), Some(&j)) = (snap.positions.get(a), snap.positions.get(b)) else {
			return Ok(None);
		};
		Ok(Some(snap.row_similarities(i)[j]))
	}

	pub fn is_fitted(&self) -> bool {
		self.snapshot.is_some()
	}

	/// Version of the current snapshot; 0 before the first fit.
	pub fn version(&self) -> u64 {
		self.snapshot.as_ref().map(|s| s.version).unwrap_or(0)
	}

	pub fn len(&self) -> usize {
		self.snapshot.as_ref().map(|s| s.ids.len()).unwrap_or(0)
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn dim(&self) -> usize {
		self.snapshot.as_ref().map(|s| s.matrix.dim()).unwrap_or(0)
	}

	pub fn current(&self) -> Option<Arc<IndexSnapshot>> {
		self.snapshot.clone()
	}

	fn snapshot(&self) -> Result<Arc<IndexSnapshot>, RecommendError> {
		self.snapshot.clone().ok_or(RecommendError::NotFitted)
	}
}

/// Sort (row, score) pairs by descending score; `sort_by` is stable so equal
/// scores keep row order.
fn rank(snap: &IndexSnapshot, mut candidates: Vec<(usize, f64)>, top_n: usize) -> Vec<Scored> {
	candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
	candidates.truncate(top_n);
	candidates
		.into_iter()
		.map(|(j, score)| Scored {
			id: snap.ids[j].clone(),
			score,
		})
		.collect()
}
