//! 内存存储
//!
//! 行为与远端存储一致：ID 由存储分配，更新逐字段合并，列表保持插入顺序。
//! 可以模拟离线或让接下来的若干次调用失败。

use crate::error::StoreError;
use crate::store::MeasurementStore;
use geomeasure_core::record::{NewRecord, Record, RecordId, RecordPatch};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<Record>>,
    offline: AtomicBool,
    pending_failures: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以已有记录初始化（例如从快照文件加载）
    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: RwLock::new(records),
            ..Self::default()
        }
    }

    /// 模拟离线：之后的所有调用都失败，直到恢复在线
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// 让接下来的 `count` 次调用失败
    pub fn fail_next(&self, count: usize) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// 当前全部记录的副本
    pub async fn snapshot(&self) -> Vec<Record> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn check_available(&self, operation: &str) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("{operation}: store is offline")));
        }
        let injected = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable(format!("{operation}: injected failure")));
        }
        Ok(())
    }
}

impl MeasurementStore for MemoryStore {
    async fn create(&self, record: NewRecord) -> Result<Record, StoreError> {
        self.check_available("create")?;

        let id = RecordId::new(Uuid::new_v4().simple().to_string());
        let record = record.into_record(id);
        self.records.write().await.push(record.clone());

        tracing::debug!("Created record {} ({})", record.id, record.properties.kind);
        Ok(record)
    }

    async fn update(&self, id: &RecordId, patch: RecordPatch) -> Result<Record, StoreError> {
        self.check_available("update")?;

        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        record.apply(patch);

        tracing::debug!("Updated record {}", id);
        Ok(record.clone())
    }

    async fn delete(&self, id: &RecordId) -> Result<bool, StoreError> {
        self.check_available("delete")?;

        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| &r.id != id);
        let deleted = records.len() != before;

        tracing::debug!("Delete record {}: {}", id, deleted);
        Ok(deleted)
    }

    async fn list_all(&self) -> Result<Vec<Record>, StoreError> {
        self.check_available("list")?;
        Ok(self.records.read().await.clone())
    }

    async fn find_by_id(&self, id: &RecordId) -> Result<Option<Record>, StoreError> {
        self.check_available("find")?;
        Ok(self.records.read().await.iter().find(|r| &r.id == id).cloned())
    }
}
