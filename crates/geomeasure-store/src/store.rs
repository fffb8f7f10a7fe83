//! 存储接口
//!
//! 每次调用至多执行一次，不做内部重试；重试策略由调用方决定。

use crate::error::StoreError;
use geomeasure_core::record::{NewRecord, Record, RecordId, RecordPatch};
use std::future::Future;

/// 测量记录存储
pub trait MeasurementStore {
    /// 创建记录，ID 由存储分配
    fn create(&self, record: NewRecord) -> impl Future<Output = Result<Record, StoreError>> + Send;

    /// 合并更新：缺省的几何或属性字段保持不变
    ///
    /// 记录不存在时返回 [`StoreError::NotFound`]。
    fn update(
        &self,
        id: &RecordId,
        patch: RecordPatch,
    ) -> impl Future<Output = Result<Record, StoreError>> + Send;

    /// 删除记录，返回记录此前是否存在
    fn delete(&self, id: &RecordId) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// 按插入顺序列出全部记录
    fn list_all(&self) -> impl Future<Output = Result<Vec<Record>, StoreError>> + Send;

    fn find_by_id(
        &self,
        id: &RecordId,
    ) -> impl Future<Output = Result<Option<Record>, StoreError>> + Send;
}
