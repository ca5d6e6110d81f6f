use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::utils::text::trim_token;

/// Compound score at or above which a tweet is positive
pub const POSITIVE_THRESHOLD: f64 = 0.5;
/// Compound score at or below which a tweet is negative
pub const NEGATIVE_THRESHOLD: f64 = -0.5;

/// Sentiment class of a tweet, stored as its code: positive 2, negative 1, neutral 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SentimentClass {
    #[default]
    Neutral,
    Negative,
    Positive,
}

impl SentimentClass {
    /// Classify a compound score in -1.0 - 1.0
    #[inline]
    pub fn from_compound(compound: f64) -> Self {
        if compound >= POSITIVE_THRESHOLD {
            SentimentClass::Positive
        } else if compound <= NEGATIVE_THRESHOLD {
            SentimentClass::Negative
        } else {
            SentimentClass::Neutral
        }
    }

    #[inline]
    pub fn code(self) -> u8 {
        match self {
            SentimentClass::Neutral => 0,
            SentimentClass::Negative => 1,
            SentimentClass::Positive => 2,
        }
    }
}

impl From<SentimentClass> for u8 {
    fn from(class: SentimentClass) -> u8 {
        class.code()
    }
}

impl TryFrom<u8> for SentimentClass {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(SentimentClass::Neutral),
            1 => Ok(SentimentClass::Negative),
            2 => Ok(SentimentClass::Positive),
            other => Err(format!("unknown sentiment code {other}")),
        }
    }
}

/// Pluggable sentiment model
pub trait SentimentScorer: Send + Sync {
    /// Compound polarity of `text` in -1.0 - 1.0
    fn score(&self, text: &str) -> f64;

    #[inline]
    fn classify(&self, text: &str) -> SentimentClass {
        SentimentClass::from_compound(self.score(text))
    }
}

impl<F> SentimentScorer for F
where
    F: Fn(&str) -> f64 + Send + Sync,
{
    fn score(&self, text: &str) -> f64 {
        self(text)
    }
}

/// VADER normalization constant
const ALPHA: f64 = 15.0;
/// Valence multiplier applied after a negation word
const NEGATION_SCALAR: f64 = -0.74;
/// Words after a negation that it still flips
const NEGATION_WINDOW: usize = 3;

const NEGATIONS: [&str; 12] = [
    "not", "no", "never", "none", "nobody", "nothing", "neither", "nor", "cannot", "isn't", "don't", "won't",
];

/// Lexicon-based scorer in the manner of VADER.
///
/// Sums word valences (roughly -4 to 4), flips the valence of words shortly
/// after a negation, and squashes the sum with `x / sqrt(x² + 15)`.
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    lexicon: HashMap<String, f64>,
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconScorer {
    pub fn new() -> Self {
        Self { lexicon: Self::default_lexicon() }
    }

    /// Scorer over a custom word → valence table. Keys are matched lowercase.
    pub fn with_lexicon(lexicon: HashMap<String, f64>) -> Self {
        Self {
            lexicon: lexicon.into_iter().map(|(w, v)| (w.to_lowercase(), v)).collect(),
        }
    }

    fn default_lexicon() -> HashMap<String, f64> {
        [
            ("good", 1.9), ("great", 3.1), ("excellent", 2.7), ("amazing", 2.8), ("awesome", 3.1),
            ("wonderful", 2.7), ("love", 3.2), ("loved", 2.9), ("happy", 2.7), ("best", 3.2),
            ("beautiful", 2.9), ("nice", 1.8), ("fantastic", 2.6), ("win", 2.8), ("hope", 1.9),
            ("support", 1.7), ("thanks", 1.9), ("thank", 1.5), ("proud", 2.1), ("clean", 1.7),
            ("save", 2.2), ("like", 1.5), ("fun", 2.3), ("glad", 2.0), ("yes", 1.7),
            ("bad", -2.5), ("terrible", -2.1), ("awful", -2.0), ("horrible", -2.5), ("worst", -3.1),
            ("hate", -2.7), ("sad", -2.1), ("angry", -2.3), ("disgusting", -2.4), ("kill", -3.7),
            ("killing", -3.4), ("dead", -3.3), ("death", -2.9), ("pollution", -1.5), ("waste", -1.8),
            ("crisis", -3.1), ("disaster", -3.1), ("problem", -1.7), ("fail", -2.5), ("poor", -2.1),
            ("wrong", -2.1), ("shame", -2.1), ("toxic", -2.5), ("destroy", -2.6), ("threat", -2.4),
        ]
        .into_iter()
        .map(|(w, v)| (w.to_string(), v))
        .collect()
    }

    /// Raw valence sum before normalization
    fn valence_sum(&self, text: &str) -> f64 {
        let mut sum = 0.0;
        let mut since_negation: Option<usize> = None;
        for raw in text.split_whitespace() {
            let word = trim_token(raw).trim_start_matches('#').to_lowercase();
            if word.is_empty() {
                continue;
            }
            if NEGATIONS.contains(&word.as_str()) || word.ends_with("n't") {
                since_negation = Some(0);
                continue;
            }
            if let Some(&valence) = self.lexicon.get(&word) {
                let flipped = matches!(since_negation, Some(n) if n < NEGATION_WINDOW);
                sum += if flipped { valence * NEGATION_SCALAR } else { valence };
            }
            since_negation = since_negation.map(|n| n + 1);
        }
        sum
    }
}

impl SentimentScorer for LexiconScorer {
    fn score(&self, text: &str) -> f64 {
        let sum = self.valence_sum(text);
        if sum == 0.0 {
            return 0.0;
        }
        (sum / (sum * sum + ALPHA).sqrt()).clamp(-1.0, 1.0)
    }
}
