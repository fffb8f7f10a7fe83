//! 同步会话
//!
//! 持有注册表、控制器和存储，把用户操作转成状态转换，
//! 并在当前任务里依次执行控制器产出的存储操作，直到该图形没有后续操作。

use crate::controller::{Completion, OpOutcome, StoreOp, SyncController, SyncState};
use crate::error::SyncError;
use geomeasure_core::error::RegistryError;
use geomeasure_core::measure::Measurer;
use geomeasure_core::record::NewRecord;
use geomeasure_core::registry::{ShapeKey, ShapeRef, ShapeRegistry};
use geomeasure_core::validation::validate_geometry;
use geomeasure_store::MeasurementStore;
use serde_json::Value;

/// 执行一个存储操作，结果打包为 [`Completion`]
pub async fn execute<S: MeasurementStore>(store: &S, op: StoreOp) -> Completion {
    let ticket = op.ticket();
    let outcome = match op {
        StoreOp::Create { record, .. } => store.create(record).await.map(OpOutcome::Created),
        StoreOp::Update { id, patch, .. } => store.update(&id, patch).await.map(OpOutcome::Updated),
        StoreOp::Delete { id, .. } => store.delete(&id).await.map(OpOutcome::Deleted),
    };
    Completion { ticket, outcome }
}

pub struct SyncSession<S> {
    registry: ShapeRegistry,
    controller: SyncController,
    store: S,
}

impl<S: MeasurementStore> SyncSession<S> {
    pub fn new(store: S, measurer: Measurer) -> Self {
        Self {
            registry: ShapeRegistry::new(measurer),
            controller: SyncController::new(),
            store,
        }
    }

    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    pub fn controller(&self) -> &SyncController {
        &self.controller
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 加载存储中的全部记录，返回新加入的数量
    pub async fn load(&mut self) -> Result<usize, SyncError> {
        let records = self.store.list_all().await?;
        let mut loaded = 0;
        for record in records {
            if let Some(key) = self.registry.insert_persisted(record) {
                self.controller.track_synced(key);
                loaded += 1;
            }
        }
        tracing::info!("Loaded {} shapes from store", loaded);
        Ok(loaded)
    }

    /// 完成一次绘制：校验几何、加入注册表并保存
    ///
    /// 校验失败时注册表不变；保存失败时图形保留，状态为 `Failed`。
    pub async fn draw(&mut self, raw: &Value) -> Result<ShapeKey, SyncError> {
        let geometry = validate_geometry(raw)?;
        let key = self.registry.add_drawn(geometry).key();
        let op = self.controller.on_draw_complete(&self.registry, key)?;
        self.drive(op).await?;
        Ok(key)
    }

    /// 导入一条已校验的创建负载
    ///
    /// 测量值按几何重新计算，类型和标签沿用负载。
    pub async fn import(&mut self, record: NewRecord) -> Result<ShapeKey, SyncError> {
        let key = self.registry.add(record.geometry, record.properties).key();
        let op = self.controller.on_draw_complete(&self.registry, key)?;
        self.drive(op).await?;
        Ok(key)
    }

    /// 用新的几何替换图形，保留用户标签
    pub async fn edit_geometry(
        &mut self,
        shape: impl Into<ShapeRef>,
        raw: &Value,
    ) -> Result<(), SyncError> {
        let shape = shape.into();
        let geometry = validate_geometry(raw)?;
        let key = self.registry.replace_geometry(shape, geometry, None)?.key();
        let op = self.controller.on_edit(&self.registry, key)?;
        self.drive(op).await
    }

    pub async fn edit_label(
        &mut self,
        shape: impl Into<ShapeRef>,
        text: impl Into<String>,
    ) -> Result<(), SyncError> {
        let key = self.registry.set_label(shape, text)?.key();
        let op = self.controller.on_edit(&self.registry, key)?;
        self.drive(op).await
    }

    pub async fn delete(&mut self, shape: impl Into<ShapeRef>) -> Result<(), SyncError> {
        let op = self.controller.on_delete(&mut self.registry, shape)?;
        self.drive(op).await
    }

    pub async fn retry(&mut self, shape: impl Into<ShapeRef>) -> Result<(), SyncError> {
        let op = self.controller.retry(&self.registry, shape)?;
        self.drive(op).await
    }

    /// 同步状态；图形不存在时返回 `None`
    pub fn state(&self, shape: impl Into<ShapeRef>) -> Option<SyncState> {
        let key = self.key_of(&shape.into()).ok()?;
        self.controller.state(key)
    }

    pub fn is_saved(&self, shape: impl Into<ShapeRef>) -> bool {
        self.state(shape) == Some(SyncState::Synced)
    }

    pub fn last_error(&self, shape: impl Into<ShapeRef>) -> Option<&str> {
        let key = self.key_of(&shape.into()).ok()?;
        self.controller.last_error(key)
    }

    fn key_of(&self, shape: &ShapeRef) -> Result<ShapeKey, SyncError> {
        self.registry
            .resolve(shape)
            .map(|s| s.key())
            .ok_or_else(|| RegistryError::NotFound(shape.to_string()).into())
    }

    async fn drive(&mut self, mut op: Option<StoreOp>) -> Result<(), SyncError> {
        while let Some(current) = op {
            tracing::debug!("Executing {} for {}", current.kind(), current.ticket().key);
            let completion = execute(&self.store, current).await;
            op = self.controller.complete(&mut self.registry, completion)?;
        }
        Ok(())
    }
}
