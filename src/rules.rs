//! Rule Library
//!
//! The fixed catalog of weighted pattern rules consulted by the scoring
//! engine. Rules are compiled once when the library is built and never
//! change afterwards; tuning a weight or a pattern means editing the tables
//! below.

use crate::error::{ClassifyError, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weight applied to every risk-indicating rule.
pub const RISK_RULE_WEIGHT: u32 = 20;
/// Weight applied to every trust-indicating rule.
pub const TRUST_RULE_WEIGHT: u32 = 25;

// (pattern, indicator) in evaluation order
const RISK_RULES: &[(&str, &str)] = &[
    (
        r"urgent|immediately|act now|limited time",
        "Urgency language detected",
    ),
    (
        r"\$[0-9,]+|won|winner|prize|reward|cash",
        "Financial incentive mentioned",
    ),
    (
        r"click here|bit\.ly|tinyurl|short link",
        "Suspicious link pattern",
    ),
    (r"claim|redeem|collect your", "Action-oriented phishing"),
    (r"free|100%|guarantee", "Too good to be true offers"),
    (
        r"verify|confirm|update your (account|info)",
        "Data harvesting attempt",
    ),
    (r"bank|paypal|amazon|apple", "Brand impersonation risk"),
    (r"!", "Excessive punctuation"),
];

const TRUST_RULES: &[(&str, &str)] = &[
    (
        r"meeting|schedule|appointment",
        "Calendar/scheduling context",
    ),
    (r"thank|thanks|appreciate", "Polite communication"),
    (r"how are you|hope you're", "Personal greeting"),
    (r"let me know|get back to", "Normal conversation flow"),
    (r"see you|talk soon|later", "Casual sign-off"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    RiskIndicating,
    TrustIndicating,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::RiskIndicating => write!(f, "risk"),
            Category::TrustIndicating => write!(f, "trust"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PatternRule {
    category: Category,
    matcher: Regex,
    weight: u32,
    indicator: &'static str,
}

impl PatternRule {
    pub fn category(&self) -> Category {
        self.category
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn indicator(&self) -> &'static str {
        self.indicator
    }

    pub fn pattern(&self) -> &str {
        self.matcher.as_str()
    }

    /// Expects text that has already gone through [`normalize`].
    pub fn matches(&self, normalized: &str) -> bool {
        self.matcher.is_match(normalized)
    }
}

/// One rule paired with whether it fired for a given message.
#[derive(Debug, Clone, Copy)]
pub struct RuleEvaluation<'a> {
    pub rule: &'a PatternRule,
    pub matched: bool,
}

/// Case-fold a message for matching. The original text is left untouched for
/// the heuristics that depend on letter case.
pub fn normalize(message: &str) -> String {
    message.to_lowercase()
}

#[derive(Debug, Clone)]
pub struct RuleLibrary {
    risk: Vec<PatternRule>,
    trust: Vec<PatternRule>,
}

impl RuleLibrary {
    /// Compile the built-in catalog.
    pub fn new() -> Result<Self> {
        Self::from_tables(RISK_RULES, TRUST_RULES)
    }

    fn from_tables(
        risk: &[(&str, &'static str)],
        trust: &[(&str, &'static str)],
    ) -> Result<Self> {
        let library = Self {
            risk: compile(Category::RiskIndicating, RISK_RULE_WEIGHT, risk)?,
            trust: compile(Category::TrustIndicating, TRUST_RULE_WEIGHT, trust)?,
        };

        log::debug!(
            "Rule library ready: {} risk rules, {} trust rules",
            library.risk.len(),
            library.trust.len()
        );
        Ok(library)
    }

    pub fn risk_rules(&self) -> &[PatternRule] {
        &self.risk
    }

    pub fn trust_rules(&self) -> &[PatternRule] {
        &self.trust
    }

    /// All rules, risk-indicating first, in evaluation order.
    pub fn rules(&self) -> impl Iterator<Item = &PatternRule> {
        self.risk.iter().chain(self.trust.iter())
    }

    /// Report, for every rule in evaluation order, whether it matches.
    pub fn evaluate(&self, message: &str) -> Vec<RuleEvaluation<'_>> {
        let normalized = normalize(message);
        self.rules()
            .map(|rule| RuleEvaluation {
                rule,
                matched: rule.matches(&normalized),
            })
            .collect()
    }
}

fn compile(
    category: Category,
    weight: u32,
    table: &[(&str, &'static str)],
) -> Result<Vec<PatternRule>> {
    table
        .iter()
        .map(|&(pattern, indicator)| {
            let matcher = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| ClassifyError::InvalidRule {
                    label: indicator.to_string(),
                    source,
                })?;
            Ok(PatternRule {
                category,
                matcher,
                weight,
                indicator,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched_labels(library: &RuleLibrary, message: &str) -> Vec<&'static str> {
        library
            .evaluate(message)
            .into_iter()
            .filter(|e| e.matched)
            .map(|e| e.rule.indicator())
            .collect()
    }

    #[test]
    fn test_catalog_shape() {
        let library = RuleLibrary::new().unwrap();
        assert_eq!(library.risk_rules().len(), 8);
        assert_eq!(library.trust_rules().len(), 5);
        assert!(library
            .risk_rules()
            .iter()
            .all(|r| r.weight() == 20 && r.category() == Category::RiskIndicating));
        assert!(library
            .trust_rules()
            .iter()
            .all(|r| r.weight() == 25 && r.category() == Category::TrustIndicating));
        assert_eq!(library.rules().count(), 13);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let library = RuleLibrary::new().unwrap();
        let labels = matched_labels(&library, "ACT NOW to claim your CASH");
        assert_eq!(
            labels,
            vec![
                "Urgency language detected",
                "Financial incentive mentioned",
                "Action-oriented phishing",
            ]
        );
    }

    #[test]
    fn test_dollar_amount_and_short_link() {
        let library = RuleLibrary::new().unwrap();
        let labels = matched_labels(&library, "Send $1,500 via bit.ly/pay");
        assert!(labels.contains(&"Financial incentive mentioned"));
        assert!(labels.contains(&"Suspicious link pattern"));
    }

    #[test]
    fn test_dollar_amount_needs_ascii_digits() {
        let library = RuleLibrary::new().unwrap();
        // Arabic-Indic and full-width digits are not amounts
        assert!(matched_labels(&library, "pay $١٢٣ now").is_empty());
        assert!(matched_labels(&library, "pay $１２３ now").is_empty());
        assert_eq!(
            matched_labels(&library, "pay $123 now"),
            vec!["Financial incentive mentioned"]
        );
    }

    #[test]
    fn test_patterns_match_inside_words() {
        // "later" fires inside "collateral", "won" inside "wonderful"
        let library = RuleLibrary::new().unwrap();
        let labels = matched_labels(&library, "A wonderful collateral");
        assert!(labels.contains(&"Financial incentive mentioned"));
        assert!(labels.contains(&"Casual sign-off"));
    }

    #[test]
    fn test_trust_rules() {
        let library = RuleLibrary::new().unwrap();
        let labels = matched_labels(
            &library,
            "Thanks for the appointment, how are you? Let me know, talk soon",
        );
        assert_eq!(
            labels,
            vec![
                "Calendar/scheduling context",
                "Polite communication",
                "Personal greeting",
                "Normal conversation flow",
                "Casual sign-off",
            ]
        );
    }

    #[test]
    fn test_evaluate_reports_every_rule() {
        let library = RuleLibrary::new().unwrap();
        let evaluations = library.evaluate("nothing to see");
        assert_eq!(evaluations.len(), 13);
        assert!(evaluations.iter().all(|e| !e.matched));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = RuleLibrary::from_tables(&[("(unclosed", "Broken rule")], TRUST_RULES)
            .unwrap_err();
        match err {
            ClassifyError::InvalidRule { label, .. } => assert_eq!(label, "Broken rule"),
            other => panic!("Expected InvalidRule, got {other:?}"),
        }
    }
}
