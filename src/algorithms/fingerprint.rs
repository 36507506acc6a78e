/// Wi-Fi 指纹数据结构
///
/// - 单个接入点（AP）读数
/// - 带标签的指纹快照（可选标定坐标）
/// - 按 BSSID 索引的扫描查找表
/// - 读数列表的 JSON 编解码

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::algorithms::Point2D;
use crate::error::Result;

/// 扫描时观测到的单个接入点
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessPointReading {
    /// 接入点硬件标识（BSSID）
    pub bssid: String,
    /// 网络名称（可能缺失）
    pub ssid: Option<String>,
    /// 信号强度 (dBm)，通常在 [-100, 0]
    pub rssi: i32,
    /// 频率 (MHz)
    pub frequency: u32,
    /// 平台采集后经过的毫秒数
    pub age_ms: u64,
}

impl AccessPointReading {
    pub fn new(bssid: impl Into<String>, rssi: i32) -> Self {
        AccessPointReading {
            bssid: bssid.into(),
            ssid: None,
            rssi,
            frequency: 0,
            age_ms: 0,
        }
    }

    /// 附带 SSID 与频率
    pub fn with_details(
        bssid: impl Into<String>,
        ssid: impl Into<String>,
        rssi: i32,
        frequency: u32,
        age_ms: u64,
    ) -> Self {
        AccessPointReading {
            bssid: bssid.into(),
            ssid: Some(ssid.into()),
            rssi,
            frequency,
            age_ms,
        }
    }
}

/// 带位置标签的指纹快照
///
/// 创建后不可变；`id` 在持久化之前为 0，由存储分配。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub id: u64,
    /// 位置名称（非空）
    pub location_name: String,
    /// 创建时间
    pub timestamp: DateTime<Utc>,
    pub readings: Vec<AccessPointReading>,
    /// 标定坐标 X（米）
    pub x_meters: Option<f64>,
    /// 标定坐标 Y（米）
    pub y_meters: Option<f64>,
}

impl Fingerprint {
    /// 创建尚未持久化的指纹（无坐标）
    pub fn new(location_name: impl Into<String>, readings: Vec<AccessPointReading>) -> Self {
        Fingerprint {
            id: 0,
            location_name: location_name.into(),
            timestamp: Utc::now(),
            readings,
            x_meters: None,
            y_meters: None,
        }
    }

    /// 创建带标定坐标的指纹
    pub fn with_coordinates(
        location_name: impl Into<String>,
        readings: Vec<AccessPointReading>,
        x_meters: f64,
        y_meters: f64,
    ) -> Self {
        Fingerprint {
            x_meters: Some(x_meters),
            y_meters: Some(y_meters),
            ..Self::new(location_name, readings)
        }
    }

    /// 两个坐标都存在时返回标定点
    pub fn coordinates(&self) -> Option<Point2D> {
        match (self.x_meters, self.y_meters) {
            (Some(x), Some(y)) => Some(Point2D::new(x, y)),
            _ => None,
        }
    }

    /// 是否可以作为坐标定位结果
    pub fn has_coordinates(&self) -> bool {
        self.coordinates().is_some()
    }

    /// 按 BSSID 建立索引
    pub fn index(&self) -> ScanIndex<'_> {
        ScanIndex::new(&self.readings)
    }
}

/// BSSID -> RSSI 查找表（借用原始读数）
///
/// 同一 BSSID 出现多次时保留最后一次读数。
#[derive(Clone, Debug, Default)]
pub struct ScanIndex<'a> {
    rssi: HashMap<&'a str, i32>,
}

impl<'a> ScanIndex<'a> {
    pub fn new(readings: &'a [AccessPointReading]) -> Self {
        let rssi = readings
            .iter()
            .map(|reading| (reading.bssid.as_str(), reading.rssi))
            .collect();
        ScanIndex { rssi }
    }

    /// 获取 RSSI
    pub fn get(&self, bssid: &str) -> Option<i32> {
        self.rssi.get(bssid).copied()
    }

    /// 是否包含 BSSID
    pub fn contains(&self, bssid: &str) -> bool {
        self.rssi.contains_key(bssid)
    }

    /// 不同 BSSID 的数量
    pub fn len(&self) -> usize {
        self.rssi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rssi.is_empty()
    }

    /// 迭代 BSSID
    pub fn bssids(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.rssi.keys().copied()
    }

    /// 两个索引的 BSSID 并集（先本表，再对方独有的）
    pub fn union<'b>(&'b self, other: &'b ScanIndex<'a>) -> impl Iterator<Item = &'a str> + 'b {
        self.bssids()
            .chain(other.bssids().filter(move |bssid| !self.contains(bssid)))
    }
}

// ============================================================================
// JSON 编解码
// ============================================================================

/// 将读数列表编码为 JSON 数组
pub fn readings_to_json(readings: &[AccessPointReading]) -> Result<String> {
    Ok(serde_json::to_string(readings)?)
}

/// 从 JSON 数组解码读数列表
///
/// 空白输入视为空列表；缺失字段取默认值。
pub fn readings_from_json(raw: &str) -> Result<Vec<AccessPointReading>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_coordinates() {
        let plain = Fingerprint::new("Hall", vec![AccessPointReading::new("AA:01", -50)]);
        assert!(!plain.has_coordinates());

        let mut half = plain.clone();
        half.x_meters = Some(1.0);
        assert_eq!(half.coordinates(), None);

        let calibrated = Fingerprint::with_coordinates("Hall", vec![], 1.0, 2.0);
        assert_eq!(calibrated.coordinates(), Some(Point2D::new(1.0, 2.0)));
        assert_eq!(calibrated.id, 0);
    }

    #[test]
    fn test_scan_index_union() {
        let scan = vec![
            AccessPointReading::new("AA:01", -50),
            AccessPointReading::new("AA:02", -60),
        ];
        let stored = vec![
            AccessPointReading::new("AA:02", -61),
            AccessPointReading::new("AA:03", -70),
        ];
        let a = ScanIndex::new(&scan);
        let b = ScanIndex::new(&stored);

        let mut union: Vec<&str> = a.union(&b).collect();
        union.sort();
        assert_eq!(union, vec!["AA:01", "AA:02", "AA:03"]);
        assert_eq!(a.get("AA:02"), Some(-60));
        assert_eq!(a.get("AA:03"), None);
    }

    #[test]
    fn test_readings_json_lenient_decode() {
        assert!(readings_from_json("  ").unwrap().is_empty());

        let decoded = readings_from_json(r#"[{"bssid":"AA:01","rssi":-42,"ageMs":120}]"#).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].bssid, "AA:01");
        assert_eq!(decoded[0].rssi, -42);
        assert_eq!(decoded[0].age_ms, 120);
        assert_eq!(decoded[0].ssid, None);
        assert_eq!(decoded[0].frequency, 0);

        assert!(readings_from_json("not json").is_err());
    }

    #[test]
    fn test_readings_json_encode_uses_camel_case() {
        let json = readings_to_json(&[AccessPointReading::with_details("AA:01", "Lab", -40, 2412, 7)]).unwrap();
        assert!(json.contains("\"ageMs\":7"));
        assert!(json.contains("\"ssid\":\"Lab\""));
    }
}
