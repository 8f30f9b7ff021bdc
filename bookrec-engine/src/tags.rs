// ---------------------------------------------------------------------------
// One-hot tag vocabulary
// ---------------------------------------------------------------------------

use std::collections::{BTreeSet, HashMap};

use crate::sparse::{FeatureMatrix, SparseVector};

/// Frozen tag vocabulary. Columns follow sorted tag order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagVocabulary {
	tags: Vec<String>,
	index: HashMap<String, usize>,
}

impl TagVocabulary {
	pub fn fit<S: AsRef<str>>(tag_lists: &[&[S]]) -> Self {
		let unique: BTreeSet<&str> = tag_lists
			.iter()
			.flat_map(|list| list.iter().map(|t| t.as_ref()))
			.collect();
		let tags: Vec<String> = unique.into_iter().map(str::to_string).collect();
		let index = tags
			.iter()
			.enumerate()
			.map(|(i, t)| (t.clone(), i))
			.collect();
		Self { tags, index }
	}

	/// Binary presence row. Unknown tags are dropped; repeats count once.
	pub fn transform_one<S: AsRef<str>>(&self, tags: &[S]) -> SparseVector {
		let mut cols: Vec<usize> = tags
			.iter()
			.filter_map(|t| self.index.get(t.as_ref()).copied())
			.collect();
		cols.sort_unstable();
		cols.dedup();
		SparseVector::from_pairs(self.tags.len(), cols.into_iter().map(|c| (c, 1.0)).collect())
	}

	pub fn transform<S: AsRef<str>>(&self, tag_lists: &[&[S]]) -> FeatureMatrix {
		let mut matrix = FeatureMatrix::new(self.tags.len());
		for list in tag_lists {
			matrix.push(self.transform_one(list));
		}
		matrix
	}

	pub fn len(&self) -> usize {
		self.tags.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tags.is_empty()
	}

	pub fn tags(&self) -> &[String] {
		&self.tags
	}
}
