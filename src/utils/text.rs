use std::{borrow::Cow, fmt, sync::Arc};

use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};

/// scheme://host(.part)*(/path)*
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\w+:/{2}[\d\w-]+(\.[\d\w-]+)*(?:/[^\s/]*)*").expect("valid regex")
});

/// Remove urls from text
#[inline]
pub fn sanitize(text: &str) -> Cow<'_, str> {
    URL_PATTERN.replace_all(text, "")
}

/// Trim a whitespace token down to its word part.
///
/// Leading characters other than word characters and `#` are dropped,
/// trailing non-word characters are dropped: `"(#Covid19),"` becomes `"#Covid19"`.
#[inline]
pub fn trim_token(token: &str) -> &str {
    token
        .trim_start_matches(|c: char| !(is_word_char(c) || c == '#'))
        .trim_end_matches(|c: char| !is_word_char(c))
}

#[inline]
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// true if `text` holds a run of `min_run` or more identical word characters ("sooo", "___")
pub fn has_repeated_run(text: &str, min_run: usize) -> bool {
    let mut prev: Option<char> = None;
    let mut run = 0usize;
    for c in text.chars() {
        if !is_word_char(c) {
            prev = None;
            run = 0;
            continue;
        }
        if prev == Some(c) {
            run += 1;
        } else {
            prev = Some(c);
            run = 1;
        }
        if run >= min_run {
            return true;
        }
    }
    false
}

/// Splits sanitized tweet text into the words counted by word distributions.
///
/// The plain variant only strips urls and splits on whitespace.
/// The stemming variant additionally lowercases and Snowball-stems each word.
#[derive(Clone, Default)]
pub struct WordTokenizer {
    stemmer: Option<Arc<Stemmer>>,
}

impl fmt::Debug for WordTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordTokenizer")
            .field("stemming", &self.stemmer.is_some())
            .finish()
    }
}

impl WordTokenizer {
    pub fn plain() -> Self {
        Self { stemmer: None }
    }

    pub fn stemming() -> Self {
        Self {
            stemmer: Some(Arc::new(Stemmer::create(Algorithm::English))),
        }
    }

    pub fn new(stemming: bool) -> Self {
        if stemming { Self::stemming() } else { Self::plain() }
    }

    #[inline]
    pub fn is_stemming(&self) -> bool {
        self.stemmer.is_some()
    }

    /// Words of `text` after url removal
    pub fn words(&self, text: &str) -> Vec<String> {
        let clean = sanitize(text);
        match &self.stemmer {
            None => clean.split_whitespace().map(str::to_string).collect(),
            Some(stemmer) => clean
                .split_whitespace()
                .map(|w| stemmer.stem(&w.to_lowercase()).into_owned())
                .collect(),
        }
    }
}
