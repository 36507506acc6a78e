/// 定位结果数据结构
///
/// - `Position`：坐标级定位结果（由定位策略产生）
/// - `Prediction`：仅标签的指纹匹配结果

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::algorithms::Point2D;

/// 坐标定位结果
///
/// 置信度的尺度由具体策略决定，不同策略之间不可直接比较。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// X 坐标（米）
    pub x: f64,
    /// Y 坐标（米）
    pub y: f64,
    /// 最近指纹的位置名称
    pub location_name: String,
    /// 置信度
    pub confidence: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, location_name: impl Into<String>, confidence: f64) -> Self {
        Position {
            x,
            y,
            location_name: location_name.into(),
            confidence,
        }
    }

    /// 坐标点，可直接作为航位推算的锚点
    pub fn point(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.2}, {:.2}) [{:.1}]",
            self.location_name, self.x, self.y, self.confidence
        )
    }
}

/// 标签匹配结果
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub fingerprint_id: u64,
    pub location_name: String,
    /// 平均差异分数，越小越好
    pub score: f64,
    /// 与当前扫描匹配的 AP 数量
    pub matched_count: usize,
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (score {:.1}, {} matching APs)",
            self.location_name, self.score, self.matched_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_point() {
        let position = Position::new(1.5, -2.0, "Room A", 90.0);
        assert_eq!(position.point(), Point2D::new(1.5, -2.0));
        assert_eq!(position.to_string(), "Room A (1.50, -2.00) [90.0]");
    }

    #[test]
    fn test_prediction_display() {
        let prediction = Prediction {
            fingerprint_id: 3,
            location_name: "Lab".to_string(),
            score: 4.0,
            matched_count: 2,
        };
        assert_eq!(prediction.to_string(), "Lab (score 4.0, 2 matching APs)");
    }
}
