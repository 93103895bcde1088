//! Remote classification backend.
//!
//! Posts the message to an HTTP model service and maps whichever response
//! format the deployment is configured for onto [`Classification`]. The
//! format is chosen by configuration and never sniffed from the body.

use crate::calibration::CalibrationConfig;
use crate::classifier::{Classification, Label, MAX_INDICATORS};
use crate::error::{ClassifyError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseFormat {
    /// `{"classification", "confidence", "indicators"}`, same as the local engine.
    Canonical,
    /// `{"label", "confidence", "probabilities", "raw_prediction", ...}`.
    Model,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceScale {
    /// Confidence arrives in `0..=1`.
    Fraction,
    /// Confidence arrives in `0..=100`.
    Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub endpoint: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_response_format")]
    pub response_format: ResponseFormat,
    #[serde(default = "default_confidence_scale")]
    pub confidence_scale: ConfidenceScale,
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_response_format() -> ResponseFormat {
    ResponseFormat::Model
}

fn default_confidence_scale() -> ConfidenceScale {
    ConfidenceScale::Fraction
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Probabilities {
    pub ham: f64,
    pub spam: f64,
}

/// Response body of the model-serving deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelResponse {
    pub label: Label,
    pub confidence: f64,
    pub probabilities: Option<Probabilities>,
    pub raw_prediction: Option<Label>,
    pub text_length: Option<usize>,
    pub accuracy: Option<f64>,
}

pub struct RemoteClassifier {
    client: Client,
    config: RemoteConfig,
    bounds: (f64, f64),
}

impl RemoteClassifier {
    pub fn new(config: RemoteConfig, calibration: CalibrationConfig) -> Result<Self> {
        calibration.validate()?;
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            config,
            bounds: (calibration.floor, calibration.ceiling),
        })
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }

    /// One round trip. Requests exceeding the timeout are abandoned and
    /// reported as [`ClassifyError::Timeout`]; nothing is retried.
    pub async fn classify(&self, text: &str) -> Result<Classification> {
        let after = self.timeout();
        let body = match tokio::time::timeout(after, self.send(text)).await {
            Ok(body) => body?,
            Err(_) => {
                log::warn!(
                    "Remote classifier at {} timed out after {after:?}",
                    self.config.endpoint
                );
                return Err(ClassifyError::Timeout { after });
            }
        };
        let classification = self.adapt(&body)?;

        log::info!(
            "Remote classified {} chars as {} ({:.1}%)",
            text.chars().count(),
            classification.label,
            classification.confidence
        );
        Ok(classification)
    }

    async fn send(&self, text: &str) -> Result<String> {
        log::debug!("POST {}", self.config.endpoint);
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&PredictRequest { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("Remote classifier returned HTTP {status}");
            return Err(ClassifyError::Http { status, body });
        }

        Ok(response.text().await?)
    }

    /// Map a response body onto a [`Classification`] using the configured format.
    pub fn adapt(&self, body: &str) -> Result<Classification> {
        let (floor, ceiling) = self.bounds;
        let mut classification = match self.config.response_format {
            ResponseFormat::Canonical => serde_json::from_str::<Classification>(body)
                .map_err(|e| ClassifyError::Decode(e.to_string()))?,
            ResponseFormat::Model => {
                let response: ModelResponse = serde_json::from_str(body)
                    .map_err(|e| ClassifyError::Decode(e.to_string()))?;
                log::debug!(
                    "Model response: raw_prediction={:?}, text_length={:?}, accuracy={:?}",
                    response.raw_prediction,
                    response.text_length,
                    response.accuracy
                );
                let confidence = match self.config.confidence_scale {
                    ConfidenceScale::Fraction => response.confidence * 100.0,
                    ConfidenceScale::Percent => response.confidence,
                };
                Classification {
                    label: response.label,
                    confidence,
                    indicators: Vec::new(),
                }
            }
        };

        if !classification.confidence.is_finite() {
            return Err(ClassifyError::Decode(format!(
                "confidence is not a number: {}",
                classification.confidence
            )));
        }
        classification.confidence =
            (classification.confidence.clamp(floor, ceiling) * 10.0).round() / 10.0;
        classification.indicators = unique_indicators(classification.indicators);
        Ok(classification)
    }
}

/// First occurrence of each label, in order, capped at [`MAX_INDICATORS`].
fn unique_indicators(indicators: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(MAX_INDICATORS);
    for indicator in indicators {
        if unique.len() == MAX_INDICATORS {
            break;
        }
        if !unique.contains(&indicator) {
            unique.push(indicator);
        }
    }
    unique
}
