//! # Sentiment Classifier
//! Lexicon + rule based polarity scoring in the VADER style.
//!
//! The valence lexicon is embedded at compile time. On top of plain lookup the
//! analyzer applies booster/dampener words, ALL-CAPS emphasis, negation within
//! a three-word window, "but" contrast, "least" handling, a handful of idioms
//! and `!`/`?` emphasis, then squashes the sum into a compound score in [-1, 1].

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

static LEXICON: Lazy<HashMap<String, f64>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, f64>>(raw).expect("valid sentiment lexicon")
});

/// Compound score at or above which a text is labeled positive.
pub const POSITIVE_THRESHOLD: f64 = 0.05;
/// Compound score at or below which a text is labeled negative.
pub const NEGATIVE_THRESHOLD: f64 = -0.05;

// Empirically derived scalars.
const B_INCR: f64 = 0.293;
const B_DECR: f64 = -0.293;
const C_INCR: f64 = 0.733;
const N_SCALAR: f64 = -0.74;
const NORMALIZE_ALPHA: f64 = 15.0;

const NEGATE: &[&str] = &[
    "aint", "arent", "cannot", "cant", "couldnt", "darent", "didnt", "doesnt", "ain't", "aren't",
    "can't", "couldn't", "daren't", "didn't", "doesn't", "dont", "hadnt", "hasnt", "havent",
    "isnt", "mightnt", "mustnt", "neither", "don't", "hadn't", "hasn't", "haven't", "isn't",
    "mightn't", "mustn't", "neednt", "needn't", "never", "none", "nope", "nor", "not", "nothing",
    "nowhere", "oughtnt", "shant", "shouldnt", "uhuh", "wasnt", "werent", "oughtn't", "shan't",
    "shouldn't", "uh-uh", "wasn't", "weren't", "without", "wont", "wouldnt", "won't", "wouldn't",
    "rarely", "seldom", "despite",
];

static BOOSTERS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    let incr = [
        "absolutely", "amazingly", "awfully", "completely", "considerable", "considerably",
        "decidedly", "deeply", "enormous", "enormously", "entirely", "especially", "exceptional",
        "exceptionally", "extreme", "extremely", "fabulously", "fully", "greatly", "hella",
        "highly", "hugely", "incredible", "incredibly", "intensely", "major", "majorly", "more",
        "most", "particularly", "purely", "quite", "really", "remarkably", "so", "substantially",
        "thoroughly", "total", "totally", "tremendous", "tremendously", "uber", "unbelievably",
        "unusually", "utter", "utterly", "very",
    ];
    let decr = [
        "almost", "barely", "hardly", "just enough", "kind of", "kinda", "kindof", "kind-of",
        "less", "little", "marginal", "marginally", "occasional", "occasionally", "partly",
        "scarce", "scarcely", "slight", "slightly", "somewhat", "sort of", "sorta", "sortof",
        "sort-of",
    ];
    incr.iter()
        .map(|w| (*w, B_INCR))
        .chain(decr.iter().map(|w| (*w, B_DECR)))
        .collect()
});

static SPECIAL_CASES: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("the shit", 3.0),
        ("the bomb", 3.0),
        ("bad ass", 1.5),
        ("badass", 1.5),
        ("yeah right", -2.0),
        ("kiss of death", -1.5),
        ("to die for", 3.0),
        ("beating heart", 3.1),
        ("broken heart", -2.9),
        ("cut the mustard", 2.0),
        ("hand to mouth", -2.0),
        ("back handed", -2.0),
        ("blow smoke", -2.0),
        ("blowing smoke", -2.0),
        ("upper hand", 1.0),
        ("break a leg", 2.0),
        ("cooking with gas", 2.0),
        ("in the black", 2.0),
        ("in the red", -2.0),
        ("on the ball", 2.0),
        ("under the weather", -2.0),
    ])
});

/// Discrete label derived from a compound score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// `>= 0.05` → Positive, `<= -0.05` → Negative, otherwise Neutral.
    pub fn from_compound(compound: f64) -> Self {
        if compound >= POSITIVE_THRESHOLD {
            SentimentLabel::Positive
        } else if compound <= NEGATIVE_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Negative => "Negative",
            SentimentLabel::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proportions of negative/neutral/positive mass plus the normalized compound.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PolarityScores {
    pub neg: f64,
    pub neu: f64,
    pub pos: f64,
    pub compound: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SentimentAnalyzer;

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Compound polarity in [-1, 1]. Empty text scores 0.0.
    pub fn score(&self, text: &str) -> f64 {
        self.polarity_scores(text).compound
    }

    pub fn polarity_scores(&self, text: &str) -> PolarityScores {
        let words = tokenize(text);
        let lower: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
        let cap_diff = is_cap_diff(&words);

        let mut sentiments = Vec::with_capacity(words.len());
        for (i, word) in words.iter().enumerate() {
            let lw = lower[i].as_str();
            if BOOSTERS.contains_key(lw) {
                sentiments.push(0.0);
                continue;
            }
            if lw == "kind" && lower.get(i + 1).is_some_and(|n| n == "of") {
                sentiments.push(0.0);
                continue;
            }
            sentiments.push(self.valence(word, i, &words, &lower, cap_diff));
        }

        but_check(&lower, &mut sentiments);
        score_valence(&sentiments, text)
    }

    #[inline]
    fn word_valence(&self, w: &str) -> Option<f64> {
        LEXICON.get(w).copied()
    }

    fn in_lexicon(&self, w: &str) -> bool {
        LEXICON.contains_key(w)
    }

    fn valence(
        &self,
        word: &str,
        i: usize,
        words: &[String],
        lower: &[String],
        cap_diff: bool,
    ) -> f64 {
        let Some(base) = self.word_valence(&lower[i]) else {
            return 0.0;
        };
        let mut valence = base;

        // "no" followed by another lexicon word acts as a plain negator.
        if lower[i] == "no" && lower.get(i + 1).is_some_and(|n| self.in_lexicon(n)) {
            valence = 0.0;
        }
        if (i > 0 && lower[i - 1] == "no")
            || (i > 1 && lower[i - 2] == "no")
            || (i > 2 && lower[i - 3] == "no" && matches!(lower[i - 1].as_str(), "or" | "nor"))
        {
            valence = base * N_SCALAR;
        }

        if cap_diff && is_upper(word) {
            valence += if valence > 0.0 { C_INCR } else { -C_INCR };
        }

        for start in 0..3 {
            if i > start && !self.in_lexicon(&lower[i - (start + 1)]) {
                let mut s = scalar_inc_dec(&words[i - (start + 1)], valence, cap_diff);
                if start == 1 && s != 0.0 {
                    s *= 0.95;
                }
                if start == 2 && s != 0.0 {
                    s *= 0.9;
                }
                valence += s;
                valence = negation_check(valence, lower, start, i);
                if start == 2 {
                    valence = special_idioms_check(valence, lower, i);
                }
            }
        }

        self.least_check(valence, lower, i)
    }

    fn least_check(&self, valence: f64, lower: &[String], i: usize) -> f64 {
        if i > 1 && lower[i - 1] == "least" && !self.in_lexicon(&lower[i - 1]) {
            if lower[i - 2] != "at" && lower[i - 2] != "very" {
                return valence * N_SCALAR;
            }
        } else if i > 0 && lower[i - 1] == "least" && !self.in_lexicon(&lower[i - 1]) {
            return valence * N_SCALAR;
        }
        valence
    }
}

/// Whitespace tokens; surrounding punctuation is stripped unless that would
/// leave two chars or fewer (keeps emoticons like ":)"). Single chars are dropped.
fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|tok| {
            let stripped = tok.trim_matches(|c: char| c.is_ascii_punctuation());
            if stripped.chars().count() <= 2 {
                tok
            } else {
                stripped
            }
        })
        .filter(|tok| tok.chars().count() > 1)
        .map(str::to_string)
        .collect()
}

/// Python-style `isupper`: at least one cased char and no lowercase ones.
fn is_upper(word: &str) -> bool {
    word.chars().any(char::is_alphabetic) && !word.chars().any(char::is_lowercase)
}

/// True when some, but not all, tokens are ALL CAPS.
fn is_cap_diff(words: &[String]) -> bool {
    let caps = words.iter().filter(|w| is_upper(w)).count();
    let diff = words.len() - caps;
    diff > 0 && diff < words.len()
}

fn negated(word: &str) -> bool {
    NEGATE.contains(&word) || word.contains("n't")
}

fn scalar_inc_dec(word: &str, valence: f64, cap_diff: bool) -> f64 {
    let Some(&boost) = BOOSTERS.get(word.to_lowercase().as_str()) else {
        return 0.0;
    };
    let mut scalar = if valence < 0.0 { -boost } else { boost };
    if cap_diff && is_upper(word) {
        scalar += if valence > 0.0 { C_INCR } else { -C_INCR };
    }
    scalar
}

fn negation_check(valence: f64, lower: &[String], start: usize, i: usize) -> f64 {
    let prev = |k: usize| lower[i - k].as_str();
    match start {
        0 => {
            if negated(prev(1)) {
                return valence * N_SCALAR;
            }
        }
        1 => {
            if prev(2) == "never" && matches!(prev(1), "so" | "this") {
                return valence * 1.25;
            } else if prev(2) == "without" && prev(1) == "doubt" {
                return valence;
            } else if negated(prev(2)) {
                return valence * N_SCALAR;
            }
        }
        2 => {
            if prev(3) == "never" && (matches!(prev(2), "so" | "this") || matches!(prev(1), "so" | "this")) {
                return valence * 1.25;
            } else if prev(3) == "without" && (prev(2) == "doubt" || prev(1) == "doubt") {
                return valence;
            } else if negated(prev(3)) {
                return valence * N_SCALAR;
            }
        }
        _ => {}
    }
    valence
}

/// Only reached for `i >= 3`.
fn special_idioms_check(valence: f64, lower: &[String], i: usize) -> f64 {
    let w = |k: usize| lower[k].as_str();
    let one_zero = format!("{} {}", w(i - 1), w(i));
    let two_one_zero = format!("{} {} {}", w(i - 2), w(i - 1), w(i));
    let two_one = format!("{} {}", w(i - 2), w(i - 1));
    let three_two_one = format!("{} {} {}", w(i - 3), w(i - 2), w(i - 1));
    let three_two = format!("{} {}", w(i - 3), w(i - 2));

    let mut valence = valence;
    for seq in [&one_zero, &two_one_zero, &two_one, &three_two_one, &three_two] {
        if let Some(&v) = SPECIAL_CASES.get(seq.as_str()) {
            valence = v;
            break;
        }
    }
    if lower.len() > i + 1 {
        let zero_one = format!("{} {}", w(i), w(i + 1));
        if let Some(&v) = SPECIAL_CASES.get(zero_one.as_str()) {
            valence = v;
        }
    }
    if lower.len() > i + 2 {
        let zero_one_two = format!("{} {} {}", w(i), w(i + 1), w(i + 2));
        if let Some(&v) = SPECIAL_CASES.get(zero_one_two.as_str()) {
            valence = v;
        }
    }

    // multi-word dampeners such as "sort of"
    for gram in [&three_two_one, &three_two, &two_one] {
        if let Some(&b) = BOOSTERS.get(gram.as_str()) {
            valence += b;
        }
    }
    valence
}

/// Sentiment before "but" is halved, after it is boosted by half.
fn but_check(lower: &[String], sentiments: &mut [f64]) {
    let Some(bi) = lower.iter().position(|w| w == "but") else {
        return;
    };
    for (si, s) in sentiments.iter_mut().enumerate() {
        if si < bi {
            *s *= 0.5;
        } else if si > bi {
            *s *= 1.5;
        }
    }
}

fn punctuation_emphasis(text: &str) -> f64 {
    let ep = text.matches('!').count().min(4) as f64 * 0.292;
    let qm_count = text.matches('?').count();
    let qm = match qm_count {
        0 | 1 => 0.0,
        2..=3 => qm_count as f64 * 0.18,
        _ => 0.96,
    };
    ep + qm
}

fn normalize(score: f64) -> f64 {
    (score / (score * score + NORMALIZE_ALPHA).sqrt()).clamp(-1.0, 1.0)
}

fn round_to(x: f64, places: i32) -> f64 {
    let p = 10f64.powi(places);
    (x * p).round() / p
}

fn score_valence(sentiments: &[f64], text: &str) -> PolarityScores {
    if sentiments.is_empty() {
        return PolarityScores::default();
    }

    let punct = punctuation_emphasis(text);
    let mut sum: f64 = sentiments.iter().sum();
    if sum > 0.0 {
        sum += punct;
    } else if sum < 0.0 {
        sum -= punct;
    }
    let compound = normalize(sum);

    let (mut pos_sum, mut neg_sum, mut neu_count) = (0.0f64, 0.0f64, 0usize);
    for &s in sentiments {
        if s > 0.0 {
            pos_sum += s + 1.0;
        } else if s < 0.0 {
            neg_sum += s - 1.0;
        } else {
            neu_count += 1;
        }
    }
    if pos_sum > neg_sum.abs() {
        pos_sum += punct;
    } else if pos_sum < neg_sum.abs() {
        neg_sum -= punct;
    }

    let total = pos_sum + neg_sum.abs() + neu_count as f64;
    PolarityScores {
        neg: round_to((neg_sum / total).abs(), 3),
        neu: round_to((neu_count as f64 / total).abs(), 3),
        pos: round_to((pos_sum / total).abs(), 3),
        compound: round_to(compound, 4),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_neutral_text_score_zero() {
        let a = SentimentAnalyzer::new();
        assert_eq!(a.score(""), 0.0);
        assert_eq!(a.score("   "), 0.0);
        assert_eq!(a.score("News: StellarCap appoints new CTO this week."), 0.0);
    }

    #[test]
    fn tokenizer_strips_punctuation_but_keeps_short_tokens() {
        let toks = tokenize("Breaking: ApexPay soars. :) a");
        assert_eq!(toks, vec!["Breaking", "ApexPay", "soars", ":)"]);
    }

    #[test]
    fn negation_flips_polarity() {
        let a = SentimentAnalyzer::new();
        let plain = a.score("The results are good");
        let negated = a.score("The results are not good");
        assert!(plain > 0.0);
        assert!(negated < 0.0);
    }

    #[test]
    fn boosters_and_exclamations_amplify() {
        let a = SentimentAnalyzer::new();
        let base = a.score("profits are good");
        assert!(a.score("profits are very good") > base);
        assert!(a.score("profits are good!!!") > base);
    }

    #[test]
    fn caps_emphasis_only_with_mixed_case() {
        let a = SentimentAnalyzer::new();
        assert!(a.score("profits are GOOD") > a.score("profits are good"));
        assert_eq!(a.score("PROFITS ARE GOOD"), a.score("profits are good"));
    }

    #[test]
    fn but_shifts_weight_to_second_clause() {
        let a = SentimentAnalyzer::new();
        assert!(a.score("profits are good but outlook is terrible") < 0.0);
    }

    #[test]
    fn compound_is_clamped_and_rounded() {
        let a = SentimentAnalyzer::new();
        let s = a.score("great great great great great great great great!!!!");
        assert!(s <= 1.0 && s > 0.9);
        assert_eq!(s, round_to(s, 4));
    }

    #[test]
    fn proportions_sum_to_one() {
        let a = SentimentAnalyzer::new();
        let p = a.polarity_scores("Alert: The FCA probes ApexPay after it announces layoffs.");
        let sum = p.neg + p.neu + p.pos;
        assert!((sum - 1.0).abs() < 0.01, "sum={sum}");
        assert!(p.neg > 0.0);
    }

    #[test]
    fn label_thresholds_are_inclusive() {
        assert_eq!(SentimentLabel::from_compound(0.05), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_compound(0.0499), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_compound(-0.05), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_compound(-0.0499), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_compound(1.0), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_compound(-1.0), SentimentLabel::Negative);
    }
}
