/// 指纹存储
///
/// 核心只依赖 `FingerprintStore` 契约，不关心持久化方式。
/// 存储句柄由调用方显式创建并传入（`Arc<S>`），不使用全局单例。

use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::algorithms::Fingerprint;

/// 指纹存储契约
///
/// `list_all` 必须返回一致的快照（迭代过程中不会被并发修改撕裂）。
pub trait FingerprintStore: Send + Sync {
    /// 所有指纹的快照，最新的在前
    fn list_all(&self) -> Vec<Fingerprint>;

    /// 插入新指纹并返回分配的 id（忽略传入的 id）
    fn insert(&self, fingerprint: Fingerprint) -> u64;

    /// 按 id 获取单个指纹
    fn get_by_id(&self, id: u64) -> Option<Fingerprint>;

    /// 按 id 删除，返回是否存在
    fn delete_by_id(&self, id: u64) -> bool;

    /// 清空所有指纹
    fn clear_all(&self);
}

/// 内存中的指纹存储（线程安全）
#[derive(Debug)]
pub struct InMemoryFingerprintStore {
    inner: RwLock<StoreState>,
}

#[derive(Debug)]
struct StoreState {
    fingerprints: Vec<Fingerprint>,
    next_id: u64,
}

impl InMemoryFingerprintStore {
    /// 创建空存储
    pub fn new() -> Self {
        InMemoryFingerprintStore {
            inner: RwLock::new(StoreState {
                fingerprints: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// 从指纹向量创建（依次分配 id）
    pub fn from_vec(fingerprints: Vec<Fingerprint>) -> Self {
        let store = InMemoryFingerprintStore::new();
        for fingerprint in fingerprints {
            store.insert(fingerprint);
        }
        store
    }

    /// 指纹数量
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .fingerprints
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryFingerprintStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprintStore for InMemoryFingerprintStore {
    fn list_all(&self) -> Vec<Fingerprint> {
        let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot = state.fingerprints.clone();
        snapshot.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        snapshot
    }

    fn insert(&self, mut fingerprint: Fingerprint) -> u64 {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let id = state.next_id;
        state.next_id += 1;
        fingerprint.id = id;
        debug!(id, location = %fingerprint.location_name, "保存指纹");
        state.fingerprints.push(fingerprint);
        id
    }

    fn get_by_id(&self, id: u64) -> Option<Fingerprint> {
        let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        state.fingerprints.iter().find(|f| f.id == id).cloned()
    }

    fn delete_by_id(&self, id: u64) -> bool {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let before = state.fingerprints.len();
        state.fingerprints.retain(|f| f.id != id);
        before != state.fingerprints.len()
    }

    fn clear_all(&self) {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        state.fingerprints.clear();
    }
}
