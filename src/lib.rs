/// Wi-Fi 指纹室内定位 + 行人航位推算
///
/// - `algorithms`：指纹数据、定位策略、二维向量等纯计算部分
/// - `engine`：定位引擎（指纹保存、标签匹配、坐标定位）
/// - `pdr`：航位推算引擎（步伐 + 航向积分，锚点平滑校正）
/// - `positioning`：按固定间隔运行的连续定位循环
/// - `store` / `scan`：指纹存储与扫描来源契约

pub mod algorithms;
pub mod config;
pub mod engine;
pub mod error;
pub mod pdr;
pub mod positioning;
pub mod scan;
pub mod store;

pub use algorithms::{
    AccessPointReading, Fingerprint, NO_SIGNAL, Point2D, Position, PositioningStrategy, Prediction,
};
pub use config::LocalizationConfig;
pub use engine::{LocalizationEngine, MISSING_AP_PENALTY};
pub use error::{Result, WifiNavError};
pub use pdr::{DeadReckoningEngine, SensorEvent, SharedDeadReckoning};
pub use positioning::{ContinuousPredictor, PredictionHandle, PredictionUpdate};
pub use scan::{ReadingFilter, ReplayScanSource, ScanSource};
pub use store::{FingerprintStore, InMemoryFingerprintStore};
