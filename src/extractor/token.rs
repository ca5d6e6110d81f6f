use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::utils::math::{kl_divergence, safe_ratio};

/// Word occurrence counts of a body of text.
///
/// Used both for the corpus-wide word distribution and for the local
/// distribution of a single hashtag's tweets.
///
/// # Examples
/// ```
/// use hashtag_features::WordFrequency;
/// let mut freq = WordFrequency::new();
/// freq.add_word("plastic");
/// freq.add_word("ocean");
/// freq.add_word("plastic");
///
/// assert_eq!(freq.word_count("plastic"), 2);
/// assert_eq!(freq.probability("ocean"), 1.0 / 3.0);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WordFrequency {
    #[serde(with = "indexmap::map::serde_seq")]
    word_count: IndexMap<String, u64>,
    total_word_count: u64,
}

/// adding words
impl WordFrequency {
    pub fn new() -> Self {
        WordFrequency {
            word_count: IndexMap::new(),
            total_word_count: 0,
        }
    }

    /// Count one occurrence of `word`
    #[inline]
    pub fn add_word(&mut self, word: &str) -> &mut Self {
        if let Some(count) = self.word_count.get_mut(word) {
            *count += 1;
        } else {
            self.word_count.insert(word.to_string(), 1);
        }
        self.total_word_count += 1;
        self
    }

    /// Count every word of the slice
    #[inline]
    pub fn add_words<T>(&mut self, words: &[T]) -> &mut Self
    where
        T: AsRef<str>,
    {
        for word in words {
            self.add_word(word.as_ref());
        }
        self
    }

    /// Merge another frequency table into self.
    /// Counts add, so merging is associative and commutative.
    pub fn merge(&mut self, other: &WordFrequency) -> &mut Self {
        for (word, &count) in other.word_count.iter() {
            *self.word_count.entry(word.clone()).or_insert(0) += count;
        }
        self.total_word_count += other.total_word_count;
        self
    }
}

/// statistics
impl WordFrequency {
    /// Occurrences of `word`, 0 if never seen
    #[inline]
    pub fn word_count(&self, word: &str) -> u64 {
        self.word_count.get(word).copied().unwrap_or(0)
    }

    /// Sum of all counts
    #[inline]
    pub fn total_count(&self) -> u64 {
        self.total_word_count
    }

    /// Number of distinct words
    #[inline]
    pub fn word_num(&self) -> usize {
        self.word_count.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.word_count.is_empty()
    }

    /// Normalized frequency of `word` (count / total), 0.0 on an empty table
    #[inline]
    pub fn probability(&self, word: &str) -> f64 {
        safe_ratio(self.word_count(word), self.total_word_count)
    }

    /// Iterate `(word, count)` in first-seen order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.word_count.iter().map(|(w, &c)| (w.as_str(), c))
    }

    /// Kullback-Leibler divergence of this distribution `p` from `reference` `q`.
    ///
    /// Summed over this table's words; words the reference has never seen
    /// have an undefined term and are left out.
    ///
    /// # Returns
    /// * `(f64, usize)` - divergence, number of words missing from `reference`
    pub fn kl_divergence_from(&self, reference: &WordFrequency) -> (f64, usize) {
        kl_divergence(
            self.iter()
                .map(|(word, _)| (self.probability(word), reference.probability(word))),
        )
    }
}
