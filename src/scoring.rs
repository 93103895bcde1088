//! Scoring Engine
//!
//! Runs a message through the rule library and the two statistical
//! heuristics, accumulating a risk total and a trust total along with the
//! indicator labels that explain them.

use crate::rules::{normalize, Category, RuleLibrary};
use serde::{Deserialize, Serialize};

/// Bonus added to the risk total when a message has more than
/// [`EXCLAMATION_LIMIT`] exclamation marks.
pub const EXCLAMATION_BONUS: u32 = 15;
pub const EXCLAMATION_LIMIT: usize = 3;

/// Bonus added to the risk total for shouting.
pub const CAPITALIZATION_BONUS: u32 = 20;
pub const CAPITALIZATION_RATIO: f64 = 0.5;
pub const CAPITALIZATION_MIN_LENGTH: usize = 10;
pub const CAPITALIZATION_INDICATOR: &str = "Excessive capitalization";

/// Running total for one category plus the labels recorded so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreAccumulator {
    total: u32,
    indicators: Vec<String>,
}

impl ScoreAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add weight and record the label unless it is already present.
    pub fn record(&mut self, weight: u32, indicator: &str) {
        self.total += weight;
        if !self.indicators.iter().any(|i| i == indicator) {
            self.indicators.push(indicator.to_string());
        }
    }

    /// Add weight without recording a label.
    pub fn add(&mut self, weight: u32) {
        self.total += weight;
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn indicators(&self) -> &[String] {
        &self.indicators
    }
}

/// Everything the engine learned about one message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub winner: Category,
    pub risk: ScoreAccumulator,
    pub trust: ScoreAccumulator,
    pub exclamation_count: usize,
    pub uppercase_ratio: f64,
    pub length: usize,
}

impl ScoreOutcome {
    pub fn winning_score(&self) -> u32 {
        self.winning().total()
    }

    pub fn combined_total(&self) -> u32 {
        self.risk.total() + self.trust.total()
    }

    pub fn winning_indicators(&self) -> &[String] {
        self.winning().indicators()
    }

    fn winning(&self) -> &ScoreAccumulator {
        match self.winner {
            Category::RiskIndicating => &self.risk,
            Category::TrustIndicating => &self.trust,
        }
    }
}

pub struct ScoringEngine<'a> {
    library: &'a RuleLibrary,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(library: &'a RuleLibrary) -> Self {
        Self { library }
    }

    /// Score a message. Callers reject blank input before getting here.
    pub fn score(&self, message: &str) -> ScoreOutcome {
        let normalized = normalize(message);
        let mut risk = ScoreAccumulator::new();
        let mut trust = ScoreAccumulator::new();

        for rule in self.library.risk_rules() {
            if rule.matches(&normalized) {
                log::debug!("Risk rule matched: {} (+{})", rule.indicator(), rule.weight());
                risk.record(rule.weight(), rule.indicator());
            }
        }

        for rule in self.library.trust_rules() {
            if rule.matches(&normalized) {
                log::debug!("Trust rule matched: {} (+{})", rule.indicator(), rule.weight());
                trust.record(rule.weight(), rule.indicator());
            }
        }

        // Heuristics look at the original text, not the case-folded copy
        let exclamation_count = message.matches('!').count();
        if exclamation_count > EXCLAMATION_LIMIT {
            log::debug!("{exclamation_count} exclamation marks (+{EXCLAMATION_BONUS})");
            risk.add(EXCLAMATION_BONUS);
        }

        // Length in UTF-16 code units, so an emoji counts as two
        let length = message.encode_utf16().count();
        let uppercase_ratio = uppercase_ratio(message, length);
        if uppercase_ratio > CAPITALIZATION_RATIO && length > CAPITALIZATION_MIN_LENGTH {
            log::debug!(
                "Uppercase ratio {uppercase_ratio:.2} over {length} chars (+{CAPITALIZATION_BONUS})"
            );
            risk.record(CAPITALIZATION_BONUS, CAPITALIZATION_INDICATOR);
        }

        // Ties go to trust
        let winner = if risk.total() > trust.total() {
            Category::RiskIndicating
        } else {
            Category::TrustIndicating
        };

        log::debug!(
            "Scored message: risk={}, trust={}, winner={}",
            risk.total(),
            trust.total(),
            winner
        );

        ScoreOutcome {
            winner,
            risk,
            trust,
            exclamation_count,
            uppercase_ratio,
            length,
        }
    }
}

/// Share of UTF-16 code units that are ASCII uppercase letters.
fn uppercase_ratio(message: &str, length: usize) -> f64 {
    if length == 0 {
        return 0.0;
    }
    let upper = message.chars().filter(|c| c.is_ascii_uppercase()).count();
    upper as f64 / length as f64
}
