/// 连续定位循环
///
/// 功能：
/// - 按固定间隔获取一次扫描并做标签匹配
/// - 匹配到带坐标的指纹时，把坐标作为锚点交给航位推算引擎
/// - 通过 mpsc 通道输出每一轮的结果
/// - 协作式取消：每轮开始前检查一次停止信号，等待间隔期间也会响应；
///   进行中的匹配计算不会被打断

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::algorithms::{Point2D, Prediction};
use crate::config::LocalizationConfig;
use crate::engine::LocalizationEngine;
use crate::error::Result;
use crate::pdr::SharedDeadReckoning;
use crate::scan::{ReadingFilter, ScanSource};
use crate::store::FingerprintStore;

/// 单轮定位结果
#[derive(Clone, Debug)]
pub struct PredictionUpdate {
    /// 轮次（从 1 开始）
    pub iteration: u64,
    /// 过滤后参与匹配的 AP 数量
    pub scanned: usize,
    /// 标签匹配结果；没有新鲜扫描或没有匹配时为 None
    pub prediction: Option<Prediction>,
    /// 施加给航位推算的锚点
    pub anchor: Option<Point2D>,
    pub timestamp: DateTime<Local>,
}

pub struct ContinuousPredictor<S: FingerprintStore, Src: ScanSource> {
    engine: Arc<LocalizationEngine<S>>,
    source: Arc<Src>,
    dead_reckoning: Option<SharedDeadReckoning>,
    filter: ReadingFilter,
    interval: Duration,
}

impl<S, Src> ContinuousPredictor<S, Src>
where
    S: FingerprintStore + 'static,
    Src: ScanSource + 'static,
{
    pub fn new(engine: Arc<LocalizationEngine<S>>, source: Arc<Src>, interval: Duration) -> Self {
        ContinuousPredictor {
            engine,
            source,
            dead_reckoning: None,
            filter: ReadingFilter::allow_all(),
            interval,
        }
    }

    /// 按配置设置间隔与 SSID 过滤
    pub fn from_config(
        engine: Arc<LocalizationEngine<S>>,
        source: Arc<Src>,
        config: &LocalizationConfig,
    ) -> Result<Self> {
        Ok(Self::new(engine, source, config.prediction_interval())
            .with_filter(ReadingFilter::from_config(config)?))
    }

    /// 把匹配结果作为锚点交给航位推算引擎
    pub fn with_dead_reckoning(mut self, dead_reckoning: SharedDeadReckoning) -> Self {
        self.dead_reckoning = Some(dead_reckoning);
        self
    }

    pub fn with_filter(mut self, filter: ReadingFilter) -> Self {
        self.filter = filter;
        self
    }

    /// 执行一轮：扫描 -> 过滤 -> 标签匹配 -> 锚点
    pub async fn run_once(&self, iteration: u64) -> PredictionUpdate {
        let readings = self.filter.apply(self.source.scan().await);
        let scanned = readings.len();

        let prediction = if readings.is_empty() {
            debug!(iteration, "没有新鲜的 Wi-Fi 扫描");
            None
        } else {
            self.engine.predict(&readings)
        };

        let anchor = prediction
            .as_ref()
            .and_then(|p| self.engine.store().get_by_id(p.fingerprint_id))
            .and_then(|fingerprint| fingerprint.coordinates());

        if let (Some(anchor), Some(dead_reckoning)) = (anchor, &self.dead_reckoning) {
            dead_reckoning.apply_anchor(anchor);
        }

        match &prediction {
            Some(p) => info!(iteration, prediction = %p, "定位结果"),
            None => debug!(iteration, scanned, "没有匹配的指纹"),
        }

        PredictionUpdate {
            iteration,
            scanned,
            prediction,
            anchor,
            timestamp: Local::now(),
        }
    }

    /// 在 tokio 任务中启动循环
    pub fn spawn(self, updates: mpsc::Sender<PredictionUpdate>) -> PredictionHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run_loop(updates, shutdown_rx));
        PredictionHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run_loop(
        self,
        updates: mpsc::Sender<PredictionUpdate>,
        mut shutdown: watch::Receiver<bool>,
    ) -> u64 {
        info!(interval_ms = self.interval.as_millis() as u64, "连续定位已启动");
        let mut iterations = 0;

        loop {
            let stop_requested = *shutdown.borrow();
            if stop_requested {
                break;
            }

            let update = self.run_once(iterations + 1).await;
            iterations += 1;

            if updates.send(update).await.is_err() {
                debug!("结果接收端已关闭");
                break;
            }

            tokio::select! {
                _ = sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    // 句柄被丢弃时同样退出
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(iterations, "连续定位已停止");
        iterations
    }
}

/// 运行中循环的句柄
#[derive(Debug)]
pub struct PredictionHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<u64>,
}

impl PredictionHandle {
    /// 发出停止信号并等待循环退出，返回完成的轮数
    pub async fn stop(self) -> u64 {
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(iterations) => iterations,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => {
                warn!(error = %err, "连续定位任务异常结束");
                0
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
