//! # Headline Synthesizer
//! Builds fictitious fintech headlines from fixed vocabularies.
//!
//! A headline is produced in two steps: [`HeadlineDraft::draw`] consumes
//! entropy from the caller's RNG and picks the slots, [`HeadlineDraft::render`]
//! interpolates them into the category template. Passing a seeded `StdRng`
//! reproduces a whole run.

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const COMPANIES: [&str; 6] = [
    "InnovateFin",
    "QuantumBank",
    "ApexPay",
    "StellarCap",
    "FutureVest",
    "DigitalAsset Inc.",
];

pub const POSITIVE_EVENTS: [&str; 5] = [
    "announces record profits",
    "secures major funding",
    "launches new AI platform",
    "partners with tech giant",
    "gets regulatory approval",
];

pub const NEGATIVE_EVENTS: [&str; 5] = [
    "faces data breach inquiry",
    "reports unexpected losses",
    "under investigation by FCA",
    "announces layoffs",
    "service outage affects millions",
];

pub const NEUTRAL_TOPICS: [&str; 4] = [
    "releases quarterly report",
    "updates terms of service",
    "attends global finance summit",
    "appoints new CTO",
];

pub const REGULATORS: [&str; 3] = ["The FCA", "The Bank of England", "UK Treasury"];

/// Template family a headline was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Positive,
    Negative,
    Neutral,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Positive, Category::Negative, Category::Neutral];

    /// Descriptor table for this category.
    pub fn descriptors(self) -> &'static [&'static str] {
        match self {
            Category::Positive => &POSITIVE_EVENTS,
            Category::Negative => &NEGATIVE_EVENTS,
            Category::Neutral => &NEUTRAL_TOPICS,
        }
    }
}

/// Slots chosen for one headline, before interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlineDraft {
    pub category: Category,
    pub company: &'static str,
    pub descriptor: &'static str,
    /// Only drawn for negative headlines.
    pub regulator: Option<&'static str>,
}

impl HeadlineDraft {
    /// Draw order: category, company, descriptor, then regulator (negative only).
    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let category = pick(rng, &Category::ALL);
        let company = pick(rng, &COMPANIES);
        let descriptor = pick(rng, category.descriptors());
        let regulator = match category {
            Category::Negative => Some(pick(rng, &REGULATORS)),
            _ => None,
        };
        Self {
            category,
            company,
            descriptor,
            regulator,
        }
    }

    pub fn render(&self) -> String {
        match self.category {
            Category::Positive => format!(
                "Breaking: {} stock soars as it {}.",
                self.company, self.descriptor
            ),
            Category::Negative => format!(
                "Alert: {} probes {} after it {}.",
                self.regulator.unwrap_or(REGULATORS[0]),
                self.company,
                self.descriptor
            ),
            Category::Neutral => format!("News: {} {} this week.", self.company, self.descriptor),
        }
    }
}

/// A rendered headline together with the entity it is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headline {
    pub text: String,
    pub company: &'static str,
    pub category: Category,
}

/// Draw and render one headline.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Headline {
    let draft = HeadlineDraft::draw(rng);
    Headline {
        text: draft.render(),
        company: draft.company,
        category: draft.category,
    }
}

/// Uniform pick from a non-empty constant table.
fn pick<R: Rng + ?Sized, T: Copy>(rng: &mut R, items: &[T]) -> T {
    items[rng.random_range(0..items.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn positive_template_matches_exactly() {
        let draft = HeadlineDraft {
            category: Category::Positive,
            company: "ApexPay",
            descriptor: "secures major funding",
            regulator: None,
        };
        assert_eq!(
            draft.render(),
            "Breaking: ApexPay stock soars as it secures major funding."
        );
    }

    #[test]
    fn negative_and_neutral_templates() {
        let neg = HeadlineDraft {
            category: Category::Negative,
            company: "QuantumBank",
            descriptor: "announces layoffs",
            regulator: Some("UK Treasury"),
        };
        assert_eq!(
            neg.render(),
            "Alert: UK Treasury probes QuantumBank after it announces layoffs."
        );

        let neu = HeadlineDraft {
            category: Category::Neutral,
            company: "StellarCap",
            descriptor: "appoints new CTO",
            regulator: None,
        };
        assert_eq!(neu.render(), "News: StellarCap appoints new CTO this week.");
    }

    #[test]
    fn drafts_stay_inside_vocabulary() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let d = HeadlineDraft::draw(&mut rng);
            assert!(COMPANIES.contains(&d.company));
            assert!(d.category.descriptors().contains(&d.descriptor));
            match d.category {
                Category::Negative => assert!(REGULATORS.contains(&d.regulator.unwrap())),
                _ => assert!(d.regulator.is_none()),
            }
        }
    }

    #[test]
    fn all_categories_show_up() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(generate(&mut rng).category);
        }
        assert_eq!(seen.len(), 3);
    }
}
