/// 行人航位推算（PDR）引擎
///
/// 输入端口：航向更新、步伐脉冲（`SensorEvent`）
/// 输出端口：观察者回调（当前位置 + 轨迹快照）
///
/// 外部锚点（通常来自指纹匹配）不会让位置瞬间跳变，
/// 而是在之后的若干步中平均分摊校正量。

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::algorithms::Point2D;
use crate::config::{DEFAULT_ANCHOR_SMOOTHING_STEPS, DEFAULT_STEP_LENGTH_M, LocalizationConfig};

/// 轨迹（ghost path）最多保留的点数
pub const MAX_TRAIL_POINTS: usize = 20;

/// 传感器事件
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SensorEvent {
    /// 方位角（弧度）
    Heading(f64),
    /// 旋转向量四元数 `[x, y, z, w]`，取其方位角作为航向
    RotationVector([f64; 4]),
    /// 检测到一步
    Step,
}

/// 位置观察者：每一步和每次重置后调用
pub type PositionObserver = Box<dyn FnMut(Point2D, &[Point2D]) + Send>;

/// 从旋转向量计算方位角
///
/// 与 Android `getOrientation` 一致：`atan2(R[1], R[4])`，R 为四元数对应的旋转矩阵。
pub fn azimuth_from_rotation_vector(x: f64, y: f64, z: f64, w: f64) -> f64 {
    let r1 = 2.0 * (x * y - z * w);
    let r4 = 1.0 - 2.0 * (x * x + z * z);
    r1.atan2(r4)
}

pub struct DeadReckoningEngine {
    running: bool,
    step_length: f64,
    heading_rad: f64,
    position: Point2D,
    trail: VecDeque<Point2D>,
    correction_per_step: Point2D,
    correction_steps_remaining: u32,
    smoothing_steps: u32,
    observer: Option<PositionObserver>,
}

impl DeadReckoningEngine {
    /// 创建停止状态的引擎，位置在原点
    pub fn new() -> Self {
        DeadReckoningEngine {
            running: false,
            step_length: DEFAULT_STEP_LENGTH_M,
            heading_rad: 0.0,
            position: Point2D::zero(),
            trail: VecDeque::with_capacity(MAX_TRAIL_POINTS + 1),
            correction_per_step: Point2D::zero(),
            correction_steps_remaining: 0,
            smoothing_steps: DEFAULT_ANCHOR_SMOOTHING_STEPS,
            observer: None,
        }
    }

    /// 按配置设置步长与锚点平滑步数
    pub fn from_config(config: &LocalizationConfig) -> Self {
        let mut engine = Self::new();
        engine.set_step_length(config.step_length_m);
        if config.anchor_smoothing_steps > 0 {
            engine.smoothing_steps = config.anchor_smoothing_steps;
        }
        engine
    }

    // ========================================================================
    // 生命周期
    // ========================================================================

    /// 开始消费传感器事件（已运行时无操作）
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        info!("航位推算已启动");
    }

    /// 停止消费传感器事件（已停止时无操作）
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        info!("航位推算已停止");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// 位置归零、清空轨迹、取消进行中的校正，并通知观察者
    pub fn reset(&mut self) {
        self.position = Point2D::zero();
        self.trail.clear();
        self.correction_per_step = Point2D::zero();
        self.correction_steps_remaining = 0;
        debug!("航位推算已重置");
        self.notify_observer();
    }

    // ========================================================================
    // 参数与状态
    // ========================================================================

    /// 设置观察者（替换已有的）
    pub fn set_observer(&mut self, observer: impl FnMut(Point2D, &[Point2D]) + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    /// 设置步长；非正数被忽略
    pub fn set_step_length(&mut self, length_meters: f64) {
        if length_meters > 0.0 {
            self.step_length = length_meters;
        } else {
            warn!(length_meters, "步长必须为正数，忽略");
        }
    }

    pub fn step_length(&self) -> f64 {
        self.step_length
    }

    /// 当前航向（弧度）
    pub fn heading(&self) -> f64 {
        self.heading_rad
    }

    pub fn position(&self) -> Point2D {
        self.position
    }

    /// 轨迹快照（最旧的在前）
    pub fn trail(&self) -> Vec<Point2D> {
        self.trail.iter().copied().collect()
    }

    /// 剩余校正步数
    pub fn correction_steps_remaining(&self) -> u32 {
        self.correction_steps_remaining
    }

    // ========================================================================
    // 锚点校正
    // ========================================================================

    /// 使用默认平滑步数（6 步，可由配置修改）施加锚点
    pub fn apply_anchor(&mut self, anchor: Point2D) {
        self.apply_anchor_with_steps(anchor, self.smoothing_steps);
    }

    /// 在接下来的 `smoothing_steps` 步内把轨迹逐步拉向锚点
    ///
    /// `smoothing_steps` 为 0 时无操作。新的锚点会替换进行中的校正。
    pub fn apply_anchor_with_steps(&mut self, anchor: Point2D, smoothing_steps: u32) {
        if smoothing_steps == 0 {
            return;
        }
        let delta = anchor - self.position;
        self.correction_per_step = delta / f64::from(smoothing_steps);
        self.correction_steps_remaining = smoothing_steps;
        debug!(%anchor, smoothing_steps, "施加锚点校正");
    }

    // ========================================================================
    // 事件处理
    // ========================================================================

    /// 处理一个传感器事件；停止状态下事件被丢弃
    pub fn handle_event(&mut self, event: SensorEvent) {
        if !self.running {
            return;
        }
        match event {
            SensorEvent::Heading(rad) => self.heading_rad = rad,
            SensorEvent::RotationVector([x, y, z, w]) => {
                self.heading_rad = azimuth_from_rotation_vector(x, y, z, w);
            }
            SensorEvent::Step => self.handle_step(),
        }
    }

    fn handle_step(&mut self) {
        let displacement = Point2D::new(
            self.step_length * self.heading_rad.cos(),
            self.step_length * self.heading_rad.sin(),
        );

        let correction = if self.correction_steps_remaining > 0 {
            self.correction_steps_remaining -= 1;
            self.correction_per_step
        } else {
            Point2D::zero()
        };

        self.position = self.position + displacement + correction;
        self.trail.push_back(self.position);
        if self.trail.len() > MAX_TRAIL_POINTS {
            self.trail.pop_front();
        }

        debug!(position = %self.position, heading = self.heading_rad, "步伐");
        self.notify_observer();
    }

    fn notify_observer(&mut self) {
        let trail = self.trail.make_contiguous();
        if let Some(observer) = self.observer.as_mut() {
            observer(self.position, trail);
        }
    }
}

impl Default for DeadReckoningEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DeadReckoningEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeadReckoningEngine")
            .field("running", &self.running)
            .field("step_length", &self.step_length)
            .field("heading_rad", &self.heading_rad)
            .field("position", &self.position)
            .field("trail_len", &self.trail.len())
            .field("correction_steps_remaining", &self.correction_steps_remaining)
            .finish()
    }
}

// ============================================================================
// 线程间共享
// ============================================================================

/// 多个事件生产者共享的引擎句柄
///
/// 每次操作都在互斥锁内完成，步伐与航向更新不会交错。
#[derive(Clone, Debug)]
pub struct SharedDeadReckoning {
    inner: Arc<Mutex<DeadReckoningEngine>>,
}

impl SharedDeadReckoning {
    pub fn new(engine: DeadReckoningEngine) -> Self {
        SharedDeadReckoning {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// 在锁内访问引擎
    pub fn with<R>(&self, f: impl FnOnce(&mut DeadReckoningEngine) -> R) -> R {
        let mut engine = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *engine)
    }

    pub fn handle_event(&self, event: SensorEvent) {
        self.with(|engine| engine.handle_event(event));
    }

    pub fn apply_anchor(&self, anchor: Point2D) {
        self.with(|engine| engine.apply_anchor(anchor));
    }

    pub fn start(&self) {
        self.with(DeadReckoningEngine::start);
    }

    pub fn stop(&self) {
        self.with(DeadReckoningEngine::stop);
    }

    pub fn reset(&self) {
        self.with(DeadReckoningEngine::reset);
    }

    pub fn position(&self) -> Point2D {
        self.with(|engine| engine.position())
    }

    pub fn trail(&self) -> Vec<Point2D> {
        self.with(|engine| engine.trail())
    }
}

impl Default for SharedDeadReckoning {
    fn default() -> Self {
        Self::new(DeadReckoningEngine::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn running_engine() -> DeadReckoningEngine {
        let mut engine = DeadReckoningEngine::new();
        engine.start();
        engine
    }

    #[test]
    fn test_step_along_heading() {
        let mut engine = running_engine();
        engine.handle_event(SensorEvent::Step);
        assert!((engine.position().x - 0.7).abs() < 1e-12);
        assert!(engine.position().y.abs() < 1e-12);

        engine.handle_event(SensorEvent::Heading(FRAC_PI_2));
        engine.handle_event(SensorEvent::Step);
        assert!((engine.position().x - 0.7).abs() < 1e-9);
        assert!((engine.position().y - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_events_ignored_while_stopped() {
        let mut engine = DeadReckoningEngine::new();
        engine.handle_event(SensorEvent::Heading(1.0));
        engine.handle_event(SensorEvent::Step);
        assert_eq!(engine.position(), Point2D::zero());
        assert_eq!(engine.heading(), 0.0);

        engine.start();
        engine.start();
        engine.stop();
        engine.handle_event(SensorEvent::Step);
        assert!(engine.trail().is_empty());
    }

    #[test]
    fn test_non_positive_step_length_ignored() {
        let mut engine = DeadReckoningEngine::new();
        engine.set_step_length(0.0);
        engine.set_step_length(-1.0);
        assert_eq!(engine.step_length(), 0.7);
        engine.set_step_length(0.8);
        assert_eq!(engine.step_length(), 0.8);
    }

    #[test]
    fn test_zero_smoothing_steps_is_noop() {
        let mut engine = running_engine();
        engine.apply_anchor_with_steps(Point2D::new(10.0, 10.0), 0);
        assert_eq!(engine.correction_steps_remaining(), 0);
        engine.apply_anchor(Point2D::new(10.0, 10.0));
        assert_eq!(engine.correction_steps_remaining(), 6);
    }

    #[test]
    fn test_rotation_vector_azimuth() {
        // 绕 z 轴旋转 90°
        let half = FRAC_PI_2 / 2.0;
        let azimuth = azimuth_from_rotation_vector(0.0, 0.0, half.sin(), half.cos());
        assert!((azimuth + FRAC_PI_2).abs() < 1e-9);
        assert_eq!(azimuth_from_rotation_vector(0.0, 0.0, 0.0, 1.0), 0.0);

        let mut engine = running_engine();
        engine.handle_event(SensorEvent::RotationVector([0.0, 0.0, half.sin(), half.cos()]));
        assert!((engine.heading() + FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_from_config() {
        let config = LocalizationConfig {
            step_length_m: 0.5,
            anchor_smoothing_steps: 3,
            ..LocalizationConfig::default()
        };
        let mut engine = DeadReckoningEngine::from_config(&config);
        assert_eq!(engine.step_length(), 0.5);
        engine.apply_anchor(Point2D::new(3.0, 0.0));
        assert_eq!(engine.correction_steps_remaining(), 3);
    }
}
