/// 指纹定位算法实现
///
/// 支持：
/// - 最近指纹（欧几里得距离）
/// - 加权 K 近邻（WKNN）
/// - 余弦相似度
///
/// 所有算法共享同一个契约：当前扫描 + 指纹库 -> 坐标 + 置信度。
/// 纯函数，只读输入，可并发调用。

use std::fmt;

use tracing::debug;

use crate::algorithms::{AccessPointReading, Fingerprint, Position, ScanIndex};

/// 噪声底 (dBm)：一侧存在而另一侧缺失的 AP 以此值代替
pub const NO_SIGNAL: f64 = -100.0;

/// WKNN 默认邻居数量
pub const DEFAULT_K: usize = 3;

/// WKNN 权重的防除零项
const WEIGHT_EPSILON: f64 = 0.1;

// ============================================================================
// 距离 / 相似度
// ============================================================================

/// BSSID 并集上的欧几里得距离
///
/// 缺失的一侧取 `NO_SIGNAL`。结果为累积平方和的平方根，不按匹配数归一化。
pub fn union_distance(scan: &ScanIndex<'_>, stored: &ScanIndex<'_>) -> f64 {
    let total_diff_squared: f64 = scan
        .union(stored)
        .map(|bssid| {
            let scan_rssi = scan.get(bssid).map_or(NO_SIGNAL, f64::from);
            let stored_rssi = stored.get(bssid).map_or(NO_SIGNAL, f64::from);
            let diff = scan_rssi - stored_rssi;
            diff * diff
        })
        .sum();
    total_diff_squared.sqrt()
}

/// BSSID 并集上的余弦相似度
///
/// 每个 RSSI 先平移为 `max(0, rssi - NO_SIGNAL)`，缺失的 AP 贡献 0。
/// 任一向量范数为 0 时相似度为 0。
pub fn cosine_similarity(scan: &ScanIndex<'_>, stored: &ScanIndex<'_>) -> f64 {
    let mut dot_product = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for bssid in scan.union(stored) {
        let a = shifted_magnitude(scan.get(bssid));
        let b = shifted_magnitude(stored.get(bssid));
        dot_product += a * b;
        norm_a += a * a;
        norm_b += b * b;
    }

    if norm_a > 0.0 && norm_b > 0.0 {
        dot_product / (norm_a.sqrt() * norm_b.sqrt())
    } else {
        0.0
    }
}

fn shifted_magnitude(rssi: Option<i32>) -> f64 {
    (rssi.map_or(NO_SIGNAL, f64::from) - NO_SIGNAL).max(0.0)
}

// ============================================================================
// 定位策略
// ============================================================================

/// 可在运行时按名称切换的定位策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PositioningStrategy {
    /// 最近指纹
    #[default]
    Euclidean,
    /// 加权 K 近邻
    WeightedKnn { k: usize },
    /// 余弦相似度
    Cosine,
}

impl PositioningStrategy {
    /// 按名称选择策略（不区分大小写）
    ///
    /// `EUCLIDEAN` / `WKNN`（k = 3）/ `COSINE`，其它名称回退到欧几里得。
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "EUCLIDEAN" => PositioningStrategy::Euclidean,
            "WKNN" => PositioningStrategy::WeightedKnn { k: DEFAULT_K },
            "COSINE" => PositioningStrategy::Cosine,
            _ => PositioningStrategy::Euclidean,
        }
    }

    /// 是否为可识别的策略名称
    pub fn is_known_name(name: &str) -> bool {
        matches!(
            name.to_ascii_uppercase().as_str(),
            "EUCLIDEAN" | "WKNN" | "COSINE"
        )
    }

    /// 策略名称
    pub fn name(&self) -> &'static str {
        match self {
            PositioningStrategy::Euclidean => "EUCLIDEAN",
            PositioningStrategy::WeightedKnn { .. } => "WKNN",
            PositioningStrategy::Cosine => "COSINE",
        }
    }

    /// 计算位置
    ///
    /// # 返回
    /// - 定位结果；扫描或指纹库为空、或没有带坐标的候选时为 None
    pub fn calculate_position(
        &self,
        scan: &[AccessPointReading],
        database: &[Fingerprint],
    ) -> Option<Position> {
        if scan.is_empty() || database.is_empty() {
            return None;
        }

        let scan_index = ScanIndex::new(scan);
        match *self {
            PositioningStrategy::Euclidean => Self::_euclidean_impl(&scan_index, database),
            PositioningStrategy::WeightedKnn { k } => Self::_wknn_impl(&scan_index, database, k),
            PositioningStrategy::Cosine => Self::_cosine_impl(&scan_index, database),
        }
    }

    // ========================================================================
    // 私有实现函数
    // ========================================================================

    fn _euclidean_impl(scan: &ScanIndex<'_>, database: &[Fingerprint]) -> Option<Position> {
        let mut best: Option<(&Fingerprint, f64)> = None;

        for fingerprint in database.iter().filter(|f| f.has_coordinates()) {
            let distance = union_distance(scan, &fingerprint.index());
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((fingerprint, distance));
            }
        }

        let (fingerprint, distance) = best?;
        let point = fingerprint.coordinates()?;
        debug!(
            location = %fingerprint.location_name,
            distance,
            "欧几里得最近指纹"
        );

        Some(Position::new(
            point.x,
            point.y,
            fingerprint.location_name.clone(),
            (100.0 - distance).max(0.0),
        ))
    }

    fn _wknn_impl(scan: &ScanIndex<'_>, database: &[Fingerprint], k: usize) -> Option<Position> {
        let mut distances: Vec<(&Fingerprint, f64)> = database
            .iter()
            .map(|fingerprint| (fingerprint, union_distance(scan, &fingerprint.index())))
            .collect();
        distances.sort_by(|a, b| a.1.total_cmp(&b.1));

        let neighbors: Vec<_> = distances
            .into_iter()
            .filter_map(|(fingerprint, distance)| {
                fingerprint
                    .coordinates()
                    .map(|point| (fingerprint, point, distance))
            })
            .take(k)
            .collect();

        let (nearest, _, nearest_distance) = *neighbors.first()?;

        let mut total_weight = 0.0;
        let mut weighted_sum_x = 0.0;
        let mut weighted_sum_y = 0.0;
        for (_, point, distance) in &neighbors {
            let weight = 1.0 / (distance + WEIGHT_EPSILON);
            total_weight += weight;
            weighted_sum_x += point.x * weight;
            weighted_sum_y += point.y * weight;
        }

        if total_weight == 0.0 {
            return None;
        }

        debug!(
            neighbors = neighbors.len(),
            nearest = %nearest.location_name,
            nearest_distance,
            "WKNN 加权平均"
        );

        Some(Position::new(
            weighted_sum_x / total_weight,
            weighted_sum_y / total_weight,
            nearest.location_name.clone(),
            (100.0 - nearest_distance).max(0.0),
        ))
    }

    fn _cosine_impl(scan: &ScanIndex<'_>, database: &[Fingerprint]) -> Option<Position> {
        let mut best: Option<(&Fingerprint, f64)> = None;

        for fingerprint in database.iter().filter(|f| f.has_coordinates()) {
            let similarity = cosine_similarity(scan, &fingerprint.index());
            if best.is_none_or(|(_, best_similarity)| similarity > best_similarity) {
                best = Some((fingerprint, similarity));
            }
        }

        let (fingerprint, similarity) = best?;
        let point = fingerprint.coordinates()?;
        debug!(
            location = %fingerprint.location_name,
            similarity,
            "余弦相似度最佳指纹"
        );

        Some(Position::new(
            point.x,
            point.y,
            fingerprint.location_name.clone(),
            similarity * 100.0,
        ))
    }
}

impl fmt::Display for PositioningStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositioningStrategy::WeightedKnn { k } => write!(f, "WKNN(k={})", k),
            other => write!(f, "{}", other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings(pairs: &[(&str, i32)]) -> Vec<AccessPointReading> {
        pairs
            .iter()
            .map(|(bssid, rssi)| AccessPointReading::new(*bssid, *rssi))
            .collect()
    }

    #[test]
    fn test_union_distance_penalizes_missing_ap() {
        let scan = readings(&[("A", -50), ("B", -60)]);
        let stored = readings(&[("A", -50)]);
        let distance = union_distance(&ScanIndex::new(&scan), &ScanIndex::new(&stored));
        // B: -60 对 -100
        assert!((distance - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_silent_fingerprint_is_zero() {
        let scan = readings(&[("A", -50)]);
        let silent = readings(&[("Z", -100)]);
        let similarity = cosine_similarity(&ScanIndex::new(&scan), &ScanIndex::new(&silent));
        assert_eq!(similarity, 0.0);
    }

    #[test]
    fn test_from_name_fallback() {
        assert_eq!(PositioningStrategy::from_name("wknn"), PositioningStrategy::WeightedKnn { k: 3 });
        assert_eq!(PositioningStrategy::from_name("Cosine"), PositioningStrategy::Cosine);
        assert_eq!(PositioningStrategy::from_name("kalman"), PositioningStrategy::Euclidean);
        assert!(!PositioningStrategy::is_known_name("kalman"));
    }

    #[test]
    fn test_euclidean_skips_best_match_without_coordinates() {
        let scan = readings(&[("A", -50), ("B", -60)]);
        let database = vec![
            Fingerprint::new("Uncalibrated", scan.clone()),
            Fingerprint::with_coordinates("Far", readings(&[("A", -80)]), 7.0, 8.0),
        ];
        let position = PositioningStrategy::Euclidean
            .calculate_position(&scan, &database)
            .unwrap();
        assert_eq!(position.location_name, "Far");
        assert_eq!((position.x, position.y), (7.0, 8.0));
    }

    #[test]
    fn test_wknn_exact_match_dominates() {
        let scan = readings(&[("A", -50)]);
        let database = vec![
            Fingerprint::with_coordinates("Exact", scan.clone(), 0.0, 0.0),
            Fingerprint::with_coordinates("Off", readings(&[("A", -60)]), 10.0, 0.0),
        ];
        let position = PositioningStrategy::WeightedKnn { k: 2 }
            .calculate_position(&scan, &database)
            .unwrap();
        // 权重 10 对 1/10.1
        assert!(position.x < 0.2);
        assert_eq!(position.location_name, "Exact");
        assert_eq!(position.confidence, 100.0);
    }

    #[test]
    fn test_no_coordinates_anywhere() {
        let scan = readings(&[("A", -50)]);
        let database = vec![Fingerprint::new("Label only", scan.clone())];
        for strategy in [
            PositioningStrategy::Euclidean,
            PositioningStrategy::WeightedKnn { k: 3 },
            PositioningStrategy::Cosine,
        ] {
            assert!(strategy.calculate_position(&scan, &database).is_none());
        }
    }
}
