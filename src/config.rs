use crate::calibration::CalibrationConfig;
use crate::remote::RemoteConfig;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BackendConfig {
    Local {
        // Simulated processing time before answering (milliseconds)
        #[serde(default)]
        analysis_delay_ms: u64,
    },
    Remote(RemoteConfig),
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Local {
            analysis_delay_ms: 0,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {path}"))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {path}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {path}"))?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.calibration.validate()?;

        if let BackendConfig::Remote(remote) = &self.backend {
            if remote.endpoint.trim().is_empty() {
                bail!("remote backend requires an endpoint");
            }
            url::Url::parse(&remote.endpoint)
                .with_context(|| format!("Invalid remote endpoint: {}", remote.endpoint))?;
            if remote.timeout_seconds == 0 {
                bail!("remote timeout_seconds must be greater than zero");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{ConfidenceScale, ResponseFormat};

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.calibration.floor, 65.0);
        assert_eq!(config.calibration.ceiling, 99.0);
        assert_eq!(config.calibration.jitter, 15.0);
        assert!(matches!(
            config.backend,
            BackendConfig::Local {
                analysis_delay_ms: 0
            }
        ));
    }

    #[test]
    fn test_parse_remote_config() {
        let yaml = r#"
backend:
  type: "Remote"
  endpoint: "http://127.0.0.1:8000/predict"
  timeout_seconds: 5
calibration:
  floor: 65.0
  ceiling: 99.0
  jitter: 0.0
  seed: 42
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();
        match &config.backend {
            BackendConfig::Remote(remote) => {
                assert_eq!(remote.endpoint, "http://127.0.0.1:8000/predict");
                assert_eq!(remote.timeout_seconds, 5);
                assert_eq!(remote.response_format, ResponseFormat::Model);
                assert_eq!(remote.confidence_scale, ConfidenceScale::Fraction);
            }
            other => panic!("Expected remote backend, got {other:?}"),
        }
        assert_eq!(config.calibration.seed, Some(42));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = serde_yaml::from_str("backend:\n  type: \"Local\"\n").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let mut config = Config::default();
        config.calibration.floor = 100.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.calibration.jitter = -1.0;
        assert!(config.validate().is_err());

        let config = Config {
            backend: BackendConfig::Remote(RemoteConfig {
                endpoint: "not a url".to_string(),
                timeout_seconds: 5,
                response_format: ResponseFormat::Model,
                confidence_scale: ConfidenceScale::Fraction,
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            backend: BackendConfig::Remote(RemoteConfig {
                endpoint: "http://localhost:8000/predict".to_string(),
                timeout_seconds: 0,
                response_format: ResponseFormat::Model,
                confidence_scale: ConfidenceScale::Fraction,
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("chill-shield-{}.yaml", std::process::id()));
        let path = path.to_string_lossy().to_string();

        let mut config = Config::default();
        config.calibration.seed = Some(9);
        config.to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
