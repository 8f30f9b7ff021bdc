// ---------------------------------------------------------------------------
// Text cleaning
// ---------------------------------------------------------------------------
//
// Steps, in order: strip HTML tags, strip URLs, lowercase, drop ASCII
// punctuation, collapse whitespace, then drop any extra stopwords.
// ---------------------------------------------------------------------------

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

/// A pure, deterministic text normalizer.
pub trait TextCleaner {
	fn clean(&self, raw: &str) -> String;
}

struct Patterns {
	html: Regex,
	url: Regex,
	whitespace: Regex,
}

fn patterns() -> &'static Patterns {
	static PATTERNS: OnceLock<Patterns> = OnceLock::new();
	PATTERNS.get_or_init(|| Patterns {
		html: Regex::new(r"<[^>]+>").expect("html pattern is valid"),
		url: Regex::new(r"http\S+").expect("url pattern is valid"),
		whitespace: Regex::new(r"\s+").expect("whitespace pattern is valid"),
	})
}

#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
	extra_stopwords: HashSet<String>,
}

impl Preprocessor {
	pub fn new() -> Self {
		Self::default()
	}

	/// A cleaner that additionally removes the given (already lowercase)
	/// words.
	pub fn with_stopwords<I, S>(words: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			extra_stopwords: words.into_iter().map(Into::into).collect(),
		}
	}

	pub fn process(&self, text: &str) -> String {
		let p = patterns();
		let text = p.html.replace_all(text, " ");
		let text = p.url.replace_all(&text, " ");
		let text: String = text
			.to_lowercase()
			.chars()
			.filter(|c| !c.is_ascii_punctuation())
			.collect();
		let text = p.whitespace.replace_all(&text, " ").trim().to_string();

		if self.extra_stopwords.is_empty() {
			return text;
		}
		text.split(' ')
			.filter(|t| !self.extra_stopwords.contains(*t))
			.collect::<Vec<_>>()
			.join(" ")
	}
}

impl TextCleaner for Preprocessor {
	fn clean(&self, raw: &str) -> String {
		self.process(raw)
	}
}
