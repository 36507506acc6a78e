/// 定位引擎
///
/// - 指纹保存 / 删除请求（转发给存储）
/// - 基于 BSSID 重叠的轻量标签匹配（`predict`）
/// - 坐标级定位（委托给当前定位策略）

use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::algorithms::{AccessPointReading, Fingerprint, Position, PositioningStrategy, Prediction, ScanIndex};
use crate::config::LocalizationConfig;
use crate::store::FingerprintStore;

/// 指纹中的 AP 在当前扫描里缺失时累加的固定惩罚
pub const MISSING_AP_PENALTY: f64 = 18.0;

pub struct LocalizationEngine<S: FingerprintStore> {
    store: Arc<S>,
    strategy: RwLock<PositioningStrategy>,
}

impl<S: FingerprintStore> LocalizationEngine<S> {
    /// 使用默认策略（欧几里得）创建引擎
    pub fn new(store: Arc<S>) -> Self {
        Self::with_strategy(store, PositioningStrategy::default())
    }

    pub fn with_strategy(store: Arc<S>, strategy: PositioningStrategy) -> Self {
        LocalizationEngine {
            store,
            strategy: RwLock::new(strategy),
        }
    }

    /// 按配置选择策略
    pub fn from_config(store: Arc<S>, config: &LocalizationConfig) -> Self {
        Self::with_strategy(store, config.strategy())
    }

    /// 存储句柄
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// 当前策略
    pub fn algorithm(&self) -> PositioningStrategy {
        *self.strategy.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// 切换定位策略（不区分大小写，未知名称回退到欧几里得）
    pub fn set_algorithm(&self, name: &str) {
        if !PositioningStrategy::is_known_name(name) {
            warn!(name, "未知定位算法，回退到 EUCLIDEAN");
        }
        let strategy = PositioningStrategy::from_name(name);
        *self.strategy.write().unwrap_or_else(PoisonError::into_inner) = strategy;
        info!(%strategy, "定位算法已切换");
    }

    /// 保存指纹
    ///
    /// 标签为空白或读数为空时不做任何事。
    pub fn save_fingerprint(
        &self,
        label: &str,
        readings: &[AccessPointReading],
        x_meters: Option<f64>,
        y_meters: Option<f64>,
    ) {
        if label.trim().is_empty() || readings.is_empty() {
            warn!(label, readings = readings.len(), "指纹标签或读数为空，忽略保存");
            return;
        }

        let fingerprint = Fingerprint {
            id: 0,
            location_name: label.trim().to_string(),
            timestamp: Utc::now(),
            readings: readings.to_vec(),
            x_meters,
            y_meters,
        };
        let id = self.store.insert(fingerprint);
        info!(id, label = label.trim(), "指纹已保存");
    }

    /// 删除单个指纹
    pub fn delete_fingerprint(&self, id: u64) -> bool {
        self.store.delete_by_id(id)
    }

    /// 清空指纹库
    pub fn clear_fingerprints(&self) {
        self.store.clear_all();
        info!("指纹库已清空");
    }

    /// 指纹库快照
    pub fn fingerprints(&self) -> Vec<Fingerprint> {
        self.store.list_all()
    }

    /// 仅标签的指纹匹配
    ///
    /// 对每个指纹遍历其自身读数：当前扫描中存在同一 BSSID 时计为匹配并累加
    /// RSSI 绝对差，否则累加 `MISSING_AP_PENALTY`。没有任何匹配的指纹不参与候选。
    /// 分数 = 累计差异 / 匹配数（只除以匹配数），分数最低者胜出，平分时保留先出现的。
    pub fn predict(&self, readings: &[AccessPointReading]) -> Option<Prediction> {
        let fingerprints = self.store.list_all();
        predict_label(readings, &fingerprints)
    }

    /// 坐标级定位，委托给当前策略
    pub fn update_position(&self, readings: &[AccessPointReading]) -> Option<Position> {
        if readings.is_empty() {
            return None;
        }
        let database = self.store.list_all();
        if database.is_empty() {
            return None;
        }
        self.algorithm().calculate_position(readings, &database)
    }
}

/// 标签匹配的纯函数实现（对给定快照）
pub fn predict_label(readings: &[AccessPointReading], fingerprints: &[Fingerprint]) -> Option<Prediction> {
    if fingerprints.is_empty() || readings.is_empty() {
        return None;
    }

    let current = ScanIndex::new(readings);
    let mut best: Option<Prediction> = None;

    for fingerprint in fingerprints {
        let mut total_diff = 0.0;
        let mut matches = 0usize;

        for stored in &fingerprint.readings {
            match current.get(&stored.bssid) {
                Some(rssi) => {
                    matches += 1;
                    total_diff += (f64::from(rssi) - f64::from(stored.rssi)).abs();
                }
                None => total_diff += MISSING_AP_PENALTY,
            }
        }

        if matches == 0 {
            continue;
        }

        let score = total_diff / matches as f64;
        if best.as_ref().is_none_or(|b| score < b.score) {
            best = Some(Prediction {
                fingerprint_id: fingerprint.id,
                location_name: fingerprint.location_name.clone(),
                score,
                matched_count: matches,
            });
        }
    }

    if let Some(prediction) = &best {
        debug!(%prediction, "标签匹配结果");
    }
    best
}
