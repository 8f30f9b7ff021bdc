// ---------------------------------------------------------------------------
// Library: upsert-by-ID book store
// ---------------------------------------------------------------------------
//
// Keeps books in first-insertion order. Re-adding an existing ID replaces
// the record in place without moving it.
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use crate::types::Book;

#[derive(Debug, Clone, Default)]
pub struct Library {
	books: Vec<Book>,
	positions: HashMap<String, usize>,
}

impl Library {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert or replace by ID.
	pub fn add(&mut self, book: Book) {
		match self.positions.get(&book.id) {
			Some(&pos) => self.books[pos] = book,
			None => {
				self.positions.insert(book.id.clone(), self.books.len());
				self.books.push(book);
			}
		}
	}

	/// Remove a book by ID. Returns the removed record, if any.
	pub fn remove(&mut self, id: &str) -> Option<Book> {
		let pos = self.positions.remove(id)?;
		let book = self.books.remove(pos);
		for (i, b) in self.books.iter().enumerate().skip(pos) {
			self.positions.insert(b.id.clone(), i);
		}
		Some(book)
	}

	pub fn get_by_id(&self, id: &str) -> Option<&Book> {
		self.positions.get(id).map(|&pos| &self.books[pos])
	}

	/// All books in insertion order.
	pub fn all(&self) -> &[Book] {
		&self.books
	}

	pub fn len(&self) -> usize {
		self.books.len()
	}

	pub fn is_empty(&self) -> bool {
		self.books.is_empty()
	}

	/// Case-insensitive substring match on the title.
	pub fn find_by_title(&self, title_substr: &str) -> Vec<&Book> {
		let needle = title_substr.to_lowercase();
		self.books
			.iter()
			.filter(|b| b.title.to_lowercase().contains(&needle))
			.collect()
	}

	/// Case-insensitive substring match against any author.
	pub fn find_by_author(&self, author_name: &str) -> Vec<&Book> {
		let needle = author_name.to_lowercase();
		self.books
			.iter()
			.filter(|b| b.authors.iter().any(|a| a.to_lowercase().contains(&needle)))
			.collect()
	}

	/// Exact tag match.
	pub fn find_by_tag(&self, tag: &str) -> Vec<&Book> {
		self.books
			.iter()
			.filter(|b| b.tags.iter().any(|t| t == tag))
			.collect()
	}
}

impl FromIterator<Book> for Library {
	fn from_iter<I: IntoIterator<Item = Book>>(iter: I) -> Self {
		let mut library = Library::new();
		for book in iter {
			library.add(book);
		}
		library
	}
}
