// ---------------------------------------------------------------------------
// Sparse vectors, feature matrix, cosine similarity
// ---------------------------------------------------------------------------
//
// Rows are stored as sorted (column, value) pairs with zeros omitted. All
// similarity math is done in f64.
// ---------------------------------------------------------------------------

/// A sparse row vector of fixed dimensionality.
///
/// Entries are kept sorted by strictly increasing column; zero values are
/// never stored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseVector {
	dim: usize,
	entries: Vec<(usize, f64)>,
}

impl SparseVector {
	/// An all-zero vector of width `dim`.
	pub fn new(dim: usize) -> Self {
		Self {
			dim,
			entries: Vec::new(),
		}
	}

	pub fn from_dense(values: &[f64]) -> Self {
		let entries = values
			.iter()
			.enumerate()
			.filter(|(_, v)| **v != 0.0)
			.map(|(i, v)| (i, *v))
			.collect();
		Self {
			dim: values.len(),
			entries,
		}
	}

	/// Build from unordered (column, value) pairs. Columns at or beyond `dim`
	/// and zero values are dropped; duplicate columns are summed.
	pub fn from_pairs(dim: usize, mut pairs: Vec<(usize, f64)>) -> Self {
		pairs.retain(|(c, _)| *c < dim);
		pairs.sort_by_key(|(c, _)| *c);
		let mut entries: Vec<(usize, f64)> = Vec::with_capacity(pairs.len());
		for (col, val) in pairs {
			match entries.last_mut() {
				Some(last) if last.0 == col => last.1 += val,
				_ => entries.push((col, val)),
			}
		}
		entries.retain(|(_, v)| *v != 0.0);
		Self { dim, entries }
	}

	pub fn dim(&self) -> usize {
		self.dim
	}

	pub fn entries(&self) -> &[(usize, f64)] {
		&self.entries
	}

	/// Number of stored (non-zero) entries.
	pub fn nnz(&self) -> usize {
		self.entries.len()
	}

	pub fn is_zero(&self) -> bool {
		self.entries.is_empty()
	}

	/// Value at `col`, zero when absent.
	pub fn get(&self, col: usize) -> f64 {
		self.entries
			.binary_search_by_key(&col, |(c, _)| *c)
			.map(|i| self.entries[i].1)
			.unwrap_or(0.0)
	}

	/// Concatenate `self` and `other`; `other`'s columns shift by `self.dim`.
	pub fn concat(&self, other: &SparseVector) -> SparseVector {
		let mut entries = self.entries.clone();
		entries.extend(other.entries.iter().map(|(c, v)| (c + self.dim, *v)));
		SparseVector {
			dim: self.dim + other.dim,
			entries,
		}
	}

	pub fn dot(&self, other: &SparseVector) -> f64 {
		let (mut i, mut j) = (0, 0);
		let mut sum = 0.0;
		while i < self.entries.len() && j < other.entries.len() {
			let (ca, va) = self.entries[i];
			let (cb, vb) = other.entries[j];
			if ca == cb {
				sum += va * vb;
				i += 1;
				j += 1;
			} else if ca < cb {
				i += 1;
			} else {
				j += 1;
			}
		}
		sum
	}

	/// L2 norm.
	pub fn norm(&self) -> f64 {
		self.entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt()
	}

	/// Scale in place so the L2 norm is 1. Zero vectors are left alone.
	pub fn normalize(&mut self) {
		let n = self.norm();
		if n > 0.0 && n.is_finite() {
			for (_, v) in &mut self.entries {
				*v /= n;
			}
		}
	}

	pub fn to_dense(&self) -> Vec<f64> {
		let mut out = vec![0.0; self.dim];
		for (c, v) in &self.entries {
			out[*c] = *v;
		}
		out
	}
}

/// Row-major sparse matrix: one `SparseVector` per item, all the same width.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureMatrix {
	dim: usize,
	rows: Vec<SparseVector>,
}

impl FeatureMatrix {
	/// An empty matrix with `dim` columns and no rows.
	pub fn new(dim: usize) -> Self {
		Self {
			dim,
			rows: Vec::new(),
		}
	}

	/// Build from dense rows. The width is taken from the first row; shorter
	/// rows are zero-padded and longer rows truncated.
	pub fn from_dense<R: AsRef<[f64]>>(rows: &[R]) -> Self {
		let dim = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
		let rows = rows
			.iter()
			.map(|r| {
				let r = r.as_ref();
				let pairs = r.iter().copied().enumerate().collect();
				SparseVector::from_pairs(dim, pairs)
			})
			.collect();
		Self { dim, rows }
	}

	/// Append a row. Its width must already match `dim`.
	pub fn push(&mut self, row: SparseVector) {
		debug_assert_eq!(row.dim(), self.dim);
		self.rows.push(row);
	}

	/// Horizontal stack: row `i` of the result is `left[i] ++ right[i]`.
	/// Returns `None` when the row counts differ.
	pub fn hstack(left: &FeatureMatrix, right: &FeatureMatrix) -> Option<FeatureMatrix> {
		if left.rows.len() != right.rows.len() {
			return None;
		}
		let rows = left
			.rows
			.iter()
			.zip(&right.rows)
			.map(|(a, b)| a.concat(b))
			.collect();
		Some(FeatureMatrix {
			dim: left.dim + right.dim,
			rows,
		})
	}

	pub fn dim(&self) -> usize {
		self.dim
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	pub fn row(&self, i: usize) -> Option<&SparseVector> {
		self.rows.get(i)
	}

	pub fn rows(&self) -> &[SparseVector] {
		&self.rows
	}
}

/// Cosine similarity of two sparse vectors.
/// Returns 0.0 when either side has zero magnitude or the result is not
/// finite. Result clamped to [-1.0, 1.0].
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
	cosine_similarity_with_magnitude(a, b, a.norm(), b.norm())
}

/// Cosine similarity using pre-computed magnitudes.
pub fn cosine_similarity_with_magnitude(
	a: &SparseVector,
	b: &SparseVector,
	mag_a: f64,
	mag_b: f64,
) -> f64 {
	let denom = mag_a * mag_b;
	if denom == 0.0 {
		return 0.0;
	}
	let result = a.dot(b) / denom;
	if !result.is_finite() {
		return 0.0;
	}
	result.clamp(-1.0, 1.0)
}
