pub mod calibration;
pub mod classifier;
pub mod config;
pub mod error;
pub mod remote;
pub mod rules;
pub mod scoring;
pub mod session;

pub use calibration::{CalibrationConfig, ConfidenceCalibrator};
pub use classifier::{Classification, Classifier, Label, LocalClassifier};
pub use config::{BackendConfig, Config};
pub use error::ClassifyError;
pub use rules::{Category, RuleLibrary};
pub use scoring::{ScoreOutcome, ScoringEngine};
pub use session::{ClassificationSession, RequestState};
