/// 定位系统配置
///
/// JSON 格式，所有字段都有默认值：
///
/// ```json
/// {
///   "algorithm": "WKNN",
///   "predictionIntervalMs": 5000,
///   "stepLengthM": 0.7,
///   "anchorSmoothingSteps": 6,
///   "ssidFilter": "^Campus"
/// }
/// ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::algorithms::PositioningStrategy;
use crate::error::{Result, WifiNavError};

/// 默认连续预测间隔（毫秒）
pub const DEFAULT_PREDICTION_INTERVAL_MS: u64 = 5_000;
/// 默认步长（米）
pub const DEFAULT_STEP_LENGTH_M: f64 = 0.7;
/// 默认锚点平滑步数
pub const DEFAULT_ANCHOR_SMOOTHING_STEPS: u32 = 6;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalizationConfig {
    /// 定位策略名称（EUCLIDEAN / WKNN / COSINE）
    pub algorithm: String,
    /// 连续预测间隔（毫秒）
    pub prediction_interval_ms: u64,
    /// 步长（米）
    pub step_length_m: f64,
    /// 锚点校正分摊的步数
    pub anchor_smoothing_steps: u32,
    /// 只保留 SSID 匹配该正则的读数
    pub ssid_filter: Option<String>,
}

impl LocalizationConfig {
    /// 从 JSON 字符串加载并校验
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: LocalizationConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载并校验
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// 校验配置值
    pub fn validate(&self) -> Result<()> {
        if !PositioningStrategy::is_known_name(&self.algorithm) {
            return Err(WifiNavError::InvalidConfig {
                field: "algorithm",
                reason: format!("未知算法 {:?}", self.algorithm),
            });
        }
        if self.prediction_interval_ms == 0 {
            return Err(WifiNavError::InvalidConfig {
                field: "predictionIntervalMs",
                reason: "预测间隔必须大于 0".to_string(),
            });
        }
        if self.step_length_m.is_nan() || self.step_length_m <= 0.0 {
            return Err(WifiNavError::InvalidConfig {
                field: "stepLengthM",
                reason: format!("步长必须为正数，实际 {}", self.step_length_m),
            });
        }
        if self.anchor_smoothing_steps == 0 {
            return Err(WifiNavError::InvalidConfig {
                field: "anchorSmoothingSteps",
                reason: "平滑步数必须大于 0".to_string(),
            });
        }
        if let Some(pattern) = &self.ssid_filter {
            regex::Regex::new(pattern)?;
        }
        Ok(())
    }

    /// 配置的定位策略
    pub fn strategy(&self) -> PositioningStrategy {
        PositioningStrategy::from_name(&self.algorithm)
    }

    /// 连续预测间隔
    pub fn prediction_interval(&self) -> Duration {
        Duration::from_millis(self.prediction_interval_ms)
    }
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        LocalizationConfig {
            algorithm: PositioningStrategy::Euclidean.name().to_string(),
            prediction_interval_ms: DEFAULT_PREDICTION_INTERVAL_MS,
            step_length_m: DEFAULT_STEP_LENGTH_M,
            anchor_smoothing_steps: DEFAULT_ANCHOR_SMOOTHING_STEPS,
            ssid_filter: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let config = LocalizationConfig::from_json_str("{}").unwrap();
        assert_eq!(config, LocalizationConfig::default());
        assert_eq!(config.strategy(), PositioningStrategy::Euclidean);
        assert_eq!(config.prediction_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_override() {
        let config =
            LocalizationConfig::from_json_str(r#"{"algorithm":"wknn","stepLengthM":0.65}"#).unwrap();
        assert_eq!(config.strategy(), PositioningStrategy::WeightedKnn { k: 3 });
        assert_eq!(config.step_length_m, 0.65);
        assert_eq!(config.anchor_smoothing_steps, 6);
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            LocalizationConfig::from_json_str(r#"{"algorithm":"kalman"}"#),
            Err(WifiNavError::InvalidConfig { field: "algorithm", .. })
        ));
        assert!(matches!(
            LocalizationConfig::from_json_str(r#"{"stepLengthM":0}"#),
            Err(WifiNavError::InvalidConfig { field: "stepLengthM", .. })
        ));
        assert!(matches!(
            LocalizationConfig::from_json_str(r#"{"ssidFilter":"("}"#),
            Err(WifiNavError::InvalidFilter(_))
        ));
        assert!(matches!(
            LocalizationConfig::from_json_str("{"),
            Err(WifiNavError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            LocalizationConfig::from_file("/nonexistent/wifinav.json"),
            Err(WifiNavError::Io(_))
        ));
    }
}
