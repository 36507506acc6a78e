/// 定位算法模块
///
/// 该模块提供指纹定位的纯计算部分：
/// - 二维向量（航位推算与坐标输出共用）
/// - Wi-Fi 读数与指纹数据结构
/// - 多种可切换的定位策略（欧几里得、WKNN、余弦相似度）
/// - 定位结果与标签匹配结果

pub mod fingerprint;
pub mod location_algorithms;
pub mod point;
pub mod results;

pub use fingerprint::*;
pub use location_algorithms::*;
pub use point::*;
pub use results::*;
