/// Wi-Fi 扫描来源
///
/// 扫描来源负责新鲜度过滤（阈值由来源自己决定）；
/// 返回空列表表示“没有新鲜数据”，核心按“无信息”处理而不是错误。

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use regex::Regex;

use crate::algorithms::AccessPointReading;
use crate::config::LocalizationConfig;
use crate::error::Result;

/// 扫描来源契约
pub trait ScanSource: Send + Sync {
    /// 执行一次扫描，返回新鲜的读数
    fn scan(&self) -> impl Future<Output = Vec<AccessPointReading>> + Send;
}

/// 按顺序回放预先录制的扫描序列，耗尽后返回空列表
#[derive(Debug, Default)]
pub struct ReplayScanSource {
    scans: Mutex<VecDeque<Vec<AccessPointReading>>>,
}

impl ReplayScanSource {
    pub fn new(scans: Vec<Vec<AccessPointReading>>) -> Self {
        ReplayScanSource {
            scans: Mutex::new(scans.into()),
        }
    }

    /// 追加一次扫描
    pub fn push(&self, scan: Vec<AccessPointReading>) {
        self.scans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(scan);
    }

    /// 剩余扫描数量
    pub fn remaining(&self) -> usize {
        self.scans.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl ScanSource for ReplayScanSource {
    async fn scan(&self) -> Vec<AccessPointReading> {
        self.scans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_default()
    }
}

/// SSID 白名单过滤
///
/// 未设置表达式时保留全部读数；设置后只保留 SSID 匹配的读数（无 SSID 的被丢弃）。
#[derive(Clone, Debug, Default)]
pub struct ReadingFilter {
    pattern: Option<Regex>,
}

impl ReadingFilter {
    /// 不过滤
    pub fn allow_all() -> Self {
        ReadingFilter { pattern: None }
    }

    pub fn from_pattern(pattern: &str) -> Result<Self> {
        Ok(ReadingFilter {
            pattern: Some(Regex::new(pattern)?),
        })
    }

    pub fn from_config(config: &LocalizationConfig) -> Result<Self> {
        match &config.ssid_filter {
            Some(pattern) => Self::from_pattern(pattern),
            None => Ok(Self::allow_all()),
        }
    }

    /// 单个读数是否保留
    pub fn accepts(&self, reading: &AccessPointReading) -> bool {
        match &self.pattern {
            None => true,
            Some(pattern) => reading
                .ssid
                .as_deref()
                .is_some_and(|ssid| pattern.is_match(ssid)),
        }
    }

    pub fn apply(&self, readings: Vec<AccessPointReading>) -> Vec<AccessPointReading> {
        if self.pattern.is_none() {
            return readings;
        }
        readings.into_iter().filter(|r| self.accepts(r)).collect()
    }
}
