//! Classification front door.
//!
//! Validates input, runs the local engine (rules, scoring, calibration) or
//! the configured remote service, and hands every caller the same
//! [`Classification`] regardless of which backend produced it.

use crate::calibration::ConfidenceCalibrator;
use crate::config::{BackendConfig, Config};
use crate::error::{ClassifyError, Result};
use crate::remote::RemoteClassifier;
use crate::rules::{Category, RuleLibrary};
use crate::scoring::{ScoreOutcome, ScoringEngine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on the number of indicators reported with a verdict.
pub const MAX_INDICATORS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Spam,
    Ham,
}

impl From<Category> for Label {
    fn from(category: Category) -> Self {
        match category {
            Category::RiskIndicating => Label::Spam,
            Category::TrustIndicating => Label::Ham,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Spam => write!(f, "spam"),
            Label::Ham => write!(f, "ham"),
        }
    }
}

/// The verdict every backend is adapted to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(rename = "classification")]
    pub label: Label,
    pub confidence: f64,
    #[serde(default)]
    pub indicators: Vec<String>,
}

impl Classification {
    /// Assemble a verdict from a score outcome and a calibrated confidence.
    pub fn from_outcome(outcome: &ScoreOutcome, confidence: f64) -> Self {
        Self {
            label: outcome.winner.into(),
            confidence,
            indicators: outcome
                .winning_indicators()
                .iter()
                .take(MAX_INDICATORS)
                .cloned()
                .collect(),
        }
    }

    pub fn is_spam(&self) -> bool {
        self.label == Label::Spam
    }
}

/// Reject blank input before any backend sees it.
pub fn validate_message(text: &str) -> Result<&str> {
    if text.trim().is_empty() {
        return Err(ClassifyError::EmptyMessage);
    }
    Ok(text)
}

/// A verdict together with the score breakdown behind it.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub outcome: ScoreOutcome,
    pub classification: Classification,
}

/// The in-process rule engine.
pub struct LocalClassifier {
    library: Arc<RuleLibrary>,
    calibrator: ConfidenceCalibrator,
    analysis_delay: Duration,
}

impl LocalClassifier {
    pub fn new(library: Arc<RuleLibrary>, calibrator: ConfidenceCalibrator) -> Self {
        Self {
            library,
            calibrator,
            analysis_delay: Duration::ZERO,
        }
    }

    /// Pause this long before answering in [`Classifier::classify`].
    pub fn with_analysis_delay(mut self, delay: Duration) -> Self {
        self.analysis_delay = delay;
        self
    }

    pub fn library(&self) -> &RuleLibrary {
        &self.library
    }

    pub fn analyze(&self, text: &str) -> Result<Analysis> {
        let text = validate_message(text)?;
        let outcome = ScoringEngine::new(&self.library).score(text);
        let confidence = self
            .calibrator
            .calibrate(outcome.winning_score(), outcome.combined_total());
        let classification = Classification::from_outcome(&outcome, confidence);

        log::info!(
            "Classified {} chars as {} ({:.1}%, risk={}, trust={})",
            outcome.length,
            classification.label,
            classification.confidence,
            outcome.risk.total(),
            outcome.trust.total()
        );

        Ok(Analysis {
            outcome,
            classification,
        })
    }

    pub fn classify(&self, text: &str) -> Result<Classification> {
        self.analyze(text).map(|analysis| analysis.classification)
    }
}

/// Backend chosen by configuration.
pub enum Classifier {
    Local(LocalClassifier),
    Remote(RemoteClassifier),
}

impl Classifier {
    /// Build the configured backend. The whole configuration is validated
    /// first, so a config that never went through [`Config::from_file`] is
    /// rejected here instead of failing on the first message.
    pub fn from_config(config: &Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| match e.downcast::<ClassifyError>() {
                Ok(err) => err,
                Err(e) => ClassifyError::InvalidConfig(format!("{e:#}")),
            })?;

        match &config.backend {
            BackendConfig::Local { analysis_delay_ms } => {
                let library = Arc::new(RuleLibrary::new()?);
                let calibrator = ConfidenceCalibrator::new(config.calibration.clone())?;
                Ok(Classifier::Local(
                    LocalClassifier::new(library, calibrator)
                        .with_analysis_delay(Duration::from_millis(*analysis_delay_ms)),
                ))
            }
            BackendConfig::Remote(remote) => Ok(Classifier::Remote(RemoteClassifier::new(
                remote.clone(),
                config.calibration.clone(),
            )?)),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Classifier::Local(_) => "local",
            Classifier::Remote(_) => "remote",
        }
    }

    pub async fn classify(&self, text: &str) -> Result<Classification> {
        let text = validate_message(text)?;
        match self {
            Classifier::Local(local) => {
                if !local.analysis_delay.is_zero() {
                    tokio::time::sleep(local.analysis_delay).await;
                }
                local.classify(text)
            }
            Classifier::Remote(remote) => remote.classify(text).await,
        }
    }
}
