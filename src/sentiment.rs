//! Lexicon-based sentiment classification for review text.
//!
//! `classify` reduces a free-text description to one of three labels. Only the
//! sign of the underlying polarity survives the reduction:
//!
//! - polarity > 0  → `Positive`
//! - polarity < 0  → `Negative`
//! - polarity == 0 → `Neutral`
//!
//! Polarity is the mean of the scores of every lexicon word found in the text,
//! after applying intensifiers ("very good") and negation ("not good").
//! Text without any scored word is neutral. Classification never fails.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Multiplier applied to a scored word preceded by an intensifier.
const INTENSIFIER_FACTOR: f64 = 1.3;

/// Multiplier applied to a scored word with a negator shortly before it.
const NEGATION_FACTOR: f64 = -0.5;

/// How many tokens before a scored word are searched for a negator.
const NEGATION_WINDOW: usize = 2;

/// Each `!` amplifies the final polarity by this fraction, up to `MAX_EXCLAMATIONS`.
const EXCLAMATION_BOOST: f64 = 0.1;
const MAX_EXCLAMATIONS: usize = 3;

/// Categorical sentiment of a review description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Discretize a polarity value. Magnitude is discarded.
    pub fn from_polarity(polarity: f64) -> Self {
        if polarity > 0.0 {
            Sentiment::Positive
        } else if polarity < 0.0 {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    /// Integer contribution of this sentiment to a restaurant's ranking score.
    pub fn delta(self) -> i64 {
        match self {
            Sentiment::Positive => 1,
            Sentiment::Neutral => 0,
            Sentiment::Negative => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify review text into a sentiment label.
pub fn classify(text: &str) -> Sentiment {
    Sentiment::from_polarity(polarity(text))
}

/// Polarity of `text` in `[-1.0, 1.0]`.
pub fn polarity(text: &str) -> f64 {
    let tokens = tokenize(text);
    let mut scores = Vec::new();

    for (index, token) in tokens.iter().enumerate() {
        let Some(base) = word_polarity(token) else {
            continue;
        };

        let mut score = base;
        if index > 0 && is_intensifier(&tokens[index - 1]) {
            score = (score * INTENSIFIER_FACTOR).clamp(-1.0, 1.0);
        }

        let window = &tokens[index.saturating_sub(NEGATION_WINDOW)..index];
        if window.iter().any(|t| is_negator(t)) {
            score *= NEGATION_FACTOR;
        }

        scores.push(score);
    }

    if scores.is_empty() {
        return 0.0;
    }

    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let exclamations = text.matches('!').count().min(MAX_EXCLAMATIONS);
    (mean * (1.0 + EXCLAMATION_BOOST * exclamations as f64)).clamp(-1.0, 1.0)
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.trim_matches('\'').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn is_intensifier(token: &str) -> bool {
    matches!(
        token,
        "very" | "really" | "extremely" | "so" | "super" | "incredibly" | "truly" | "absolutely"
    )
}

fn is_negator(token: &str) -> bool {
    matches!(
        token,
        "not" | "no" | "never" | "nothing" | "hardly" | "cannot" | "without"
    ) || token.ends_with("n't")
}

fn word_polarity(word: &str) -> Option<f64> {
    let score = match word {
        // positive
        "amazing" | "fantastic" | "wonderful" | "excellent" | "outstanding" => 0.6,
        "perfect" | "superb" | "exceptional" | "phenomenal" => 1.0,
        "best" | "incredible" | "awesome" => 0.8,
        "delicious" | "tasty" | "yummy" | "flavorful" | "flavourful" => 0.7,
        "great" | "lovely" | "beautiful" | "brilliant" => 0.8,
        "good" | "nice" | "fresh" | "friendly" | "clean" => 0.5,
        "love" | "loved" | "enjoyed" | "enjoy" => 0.5,
        "happy" | "pleasant" | "welcoming" | "attentive" | "cozy" | "cosy" => 0.6,
        "recommend" | "recommended" | "worth" => 0.3,
        "fast" | "quick" | "generous" | "affordable" | "cheap" => 0.3,
        "okay" | "ok" | "fine" | "decent" => 0.2,
        // negative
        "bad" | "poor" | "rude" | "dirty" => -0.7,
        "terrible" | "awful" | "horrible" | "disgusting" | "inedible" => -1.0,
        "worst" | "hate" | "hated" => -1.0,
        "bland" | "stale" | "soggy" | "greasy" | "overcooked" | "undercooked" => -0.5,
        "cold" | "slow" | "noisy" | "expensive" | "overpriced" => -0.4,
        "disappointing" | "disappointed" | "mediocre" | "boring" => -0.6,
        "sick" | "gross" | "nasty" | "unfriendly" => -0.7,
        "avoid" | "wrong" => -0.3,
        _ => return None,
    };
    Some(score)
}
