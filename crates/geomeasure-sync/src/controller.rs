//! 同步控制器
//!
//! 每个图形一个状态机：
//!
//! ```text
//! Draft -> Saving -> Synced -> Dirty -> Saving -> Synced | Failed
//! ```
//!
//! `Failed` 不是终态：图形保持可见可编辑，下一次编辑或显式重试会重新进入 `Saving`。
//!
//! 控制器本身不做 IO。每个存储调用以 [`StoreOp`] 交给调用方执行，
//! 结果以 [`Completion`] 送回 [`SyncController::complete`]。
//! 同一图形同时至多一个操作在途；在途期间的编辑合并为一次，
//! 完成后只发送最新状态（按图形整体后写者胜）。

use crate::error::SyncError;
use geomeasure_core::error::RegistryError;
use geomeasure_core::record::{NewRecord, Record, RecordId, RecordPatch};
use geomeasure_core::registry::{ShapeKey, ShapeRef, ShapeRegistry};
use geomeasure_store::StoreError;
use std::collections::HashMap;
use std::fmt;

/// 图形同步状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    /// 尚未发送
    Draft,
    /// 存储操作在途
    Saving,
    /// 与存储最新已知状态一致
    Synced,
    /// 上次同步后有本地修改
    Dirty,
    /// 上次存储操作失败，可重试
    Failed,
}

impl SyncState {
    pub fn name(&self) -> &'static str {
        match self {
            SyncState::Draft => "Draft",
            SyncState::Saving => "Saving",
            SyncState::Synced => "Synced",
            SyncState::Dirty => "Dirty",
            SyncState::Failed => "Failed",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 存储操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OpKind::Create => "create",
            OpKind::Update => "update",
            OpKind::Delete => "delete",
        })
    }
}

/// 操作凭据：标识图形、发出时的本地版本和全局序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub key: ShapeKey,
    pub version: u64,
    seq: u64,
}

/// 交给调用方执行的存储操作
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Create { ticket: Ticket, record: NewRecord },
    Update { ticket: Ticket, id: RecordId, patch: RecordPatch },
    Delete { ticket: Ticket, id: RecordId },
}

impl StoreOp {
    pub fn ticket(&self) -> Ticket {
        match self {
            StoreOp::Create { ticket, .. }
            | StoreOp::Update { ticket, .. }
            | StoreOp::Delete { ticket, .. } => *ticket,
        }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            StoreOp::Create { .. } => OpKind::Create,
            StoreOp::Update { .. } => OpKind::Update,
            StoreOp::Delete { .. } => OpKind::Delete,
        }
    }
}

/// 存储调用的成功结果
#[derive(Debug, Clone, PartialEq)]
pub enum OpOutcome {
    Created(Record),
    Updated(Record),
    Deleted(bool),
}

impl OpOutcome {
    fn kind(&self) -> OpKind {
        match self {
            OpOutcome::Created(_) => OpKind::Create,
            OpOutcome::Updated(_) => OpKind::Update,
            OpOutcome::Deleted(_) => OpKind::Delete,
        }
    }
}

/// 存储调用完成通知
#[derive(Debug)]
pub struct Completion {
    pub ticket: Ticket,
    pub outcome: Result<OpOutcome, StoreError>,
}

#[derive(Debug)]
struct Track {
    state: SyncState,
    in_flight: Option<(Ticket, OpKind)>,
    /// 在途期间排队的后续操作（只保留一个，删除优先于更新）
    queued: Option<OpKind>,
    /// 本地版本号，每次本地修改递增
    version: u64,
    failed_op: Option<OpKind>,
    last_error: Option<String>,
}

impl Track {
    fn new(state: SyncState) -> Self {
        Self {
            state,
            in_flight: None,
            queued: None,
            version: 0,
            failed_op: None,
            last_error: None,
        }
    }

    fn queue(&mut self, kind: OpKind) {
        if self.queued != Some(OpKind::Delete) {
            self.queued = Some(kind);
        }
    }
}

/// 同步控制器
#[derive(Debug, Default)]
pub struct SyncController {
    tracks: HashMap<ShapeKey, Track>,
    next_seq: u64,
}

impl SyncController {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前状态；未跟踪的图形返回 `None`
    pub fn state(&self, key: ShapeKey) -> Option<SyncState> {
        self.tracks.get(&key).map(|t| t.state)
    }

    /// 最近一次失败的原因（用于“未保存”提示）
    pub fn last_error(&self, key: ShapeKey) -> Option<&str> {
        self.tracks.get(&key).and_then(|t| t.last_error.as_deref())
    }

    /// 是否已与存储一致
    pub fn is_saved(&self, key: ShapeKey) -> bool {
        self.state(key) == Some(SyncState::Synced)
    }

    /// 是否有操作在途
    pub fn is_busy(&self, key: ShapeKey) -> bool {
        self.tracks.get(&key).is_some_and(|t| t.in_flight.is_some())
    }

    /// 跟踪从存储加载的图形
    pub fn track_synced(&mut self, key: ShapeKey) {
        self.tracks.insert(key, Track::new(SyncState::Synced));
    }

    fn resolve(registry: &ShapeRegistry, shape: &ShapeRef) -> Result<(ShapeKey, Option<RecordId>), SyncError> {
        registry
            .resolve(shape)
            .map(|s| (s.key(), s.id().cloned()))
            .ok_or_else(|| RegistryError::NotFound(shape.to_string()).into())
    }

    fn track_mut(&mut self, key: ShapeKey, persisted: bool) -> &mut Track {
        self.tracks.entry(key).or_insert_with(|| {
            Track::new(if persisted {
                SyncState::Synced
            } else {
                SyncState::Draft
            })
        })
    }

    /// 按图形当前状态构造并登记一个在途操作
    fn issue(
        &mut self,
        registry: &ShapeRegistry,
        key: ShapeKey,
        kind: OpKind,
    ) -> Result<StoreOp, SyncError> {
        let shape = registry
            .get(key)
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))?;

        self.next_seq += 1;
        let seq = self.next_seq;
        let track = self.track_mut(key, shape.is_persisted());
        let ticket = Ticket {
            key,
            version: track.version,
            seq,
        };

        let op = match (kind, shape.id()) {
            (OpKind::Create, _) => StoreOp::Create {
                ticket,
                record: shape.to_new_record(),
            },
            (OpKind::Update, Some(id)) => StoreOp::Update {
                ticket,
                id: id.clone(),
                patch: shape.to_patch(),
            },
            (OpKind::Delete, Some(id)) => StoreOp::Delete {
                ticket,
                id: id.clone(),
            },
            (_, None) => return Err(SyncError::NotPersisted(key)),
        };

        track.state = SyncState::Saving;
        track.in_flight = Some((ticket, kind));
        tracing::debug!("{} {} issued (version {})", key, kind, ticket.version);
        Ok(op)
    }

    /// 绘制完成：Draft -> Saving，发出创建请求
    pub fn on_draw_complete(
        &mut self,
        registry: &ShapeRegistry,
        key: ShapeKey,
    ) -> Result<Option<StoreOp>, SyncError> {
        let (key, id) = Self::resolve(registry, &key.into())?;
        if let Some(id) = id {
            tracing::warn!("{} already persisted as {}, ignoring draw completion", key, id);
            return Ok(None);
        }

        let track = self.track_mut(key, false);
        if track.in_flight.is_some() || !matches!(track.state, SyncState::Draft | SyncState::Failed) {
            return Ok(None);
        }
        self.issue(registry, key, OpKind::Create).map(Some)
    }

    /// 图形被编辑（几何或标签已在注册表中更新）
    ///
    /// 尚无ID时不发请求：草稿的创建请求本身会携带最新状态；
    /// 创建在途时排队，拿到ID后再发送更新。
    pub fn on_edit(
        &mut self,
        registry: &ShapeRegistry,
        shape: impl Into<ShapeRef>,
    ) -> Result<Option<StoreOp>, SyncError> {
        let (key, id) = Self::resolve(registry, &shape.into())?;
        let track = self.track_mut(key, id.is_some());
        track.version += 1;

        if track.in_flight.is_some() {
            track.queue(OpKind::Update);
            tracing::debug!("{} edit queued behind in-flight operation (version {})", key, track.version);
            return Ok(None);
        }

        if id.is_none() {
            // 创建失败后的编辑重新尝试创建
            if track.state == SyncState::Failed {
                return self.issue(registry, key, OpKind::Create).map(Some);
            }
            return Ok(None);
        }

        // 删除失败的图形仍等待删除，编辑不会让它重新同步
        if track.failed_op == Some(OpKind::Delete) {
            tracing::debug!("{} edit ignored while delete is pending retry", key);
            return Ok(None);
        }

        track.state = SyncState::Dirty;
        self.issue(registry, key, OpKind::Update).map(Some)
    }

    /// 删除图形：存储确认后才从注册表移除
    pub fn on_delete(
        &mut self,
        registry: &mut ShapeRegistry,
        shape: impl Into<ShapeRef>,
    ) -> Result<Option<StoreOp>, SyncError> {
        let (key, id) = Self::resolve(registry, &shape.into())?;
        let track = self.track_mut(key, id.is_some());

        if track.in_flight.is_some() {
            track.queue(OpKind::Delete);
            tracing::debug!("{} delete queued behind in-flight operation", key);
            return Ok(None);
        }

        if id.is_none() {
            // 从未持久化，直接在本地移除
            registry.remove(key);
            self.tracks.remove(&key);
            tracing::debug!("{} removed before first save", key);
            return Ok(None);
        }

        self.issue(registry, key, OpKind::Delete).map(Some)
    }

    /// 显式重试上次失败的操作（使用最新状态）
    pub fn retry(
        &mut self,
        registry: &ShapeRegistry,
        shape: impl Into<ShapeRef>,
    ) -> Result<Option<StoreOp>, SyncError> {
        let (key, id) = Self::resolve(registry, &shape.into())?;
        let Some(track) = self.tracks.get(&key) else {
            return Ok(None);
        };
        if track.state != SyncState::Failed || track.in_flight.is_some() {
            return Ok(None);
        }

        let kind = match (track.failed_op, id) {
            (_, None) => OpKind::Create,
            (Some(kind), Some(_)) => kind,
            (None, Some(_)) => OpKind::Update,
        };
        tracing::info!("{} retrying {}", key, kind);
        self.issue(registry, key, kind).map(Some)
    }

    /// 处理存储调用结果，必要时返回下一个要执行的操作
    pub fn complete(
        &mut self,
        registry: &mut ShapeRegistry,
        completion: Completion,
    ) -> Result<Option<StoreOp>, SyncError> {
        let Completion { ticket, outcome } = completion;
        let key = ticket.key;
        let track = self
            .tracks
            .get_mut(&key)
            .ok_or(SyncError::UnknownTicket(ticket))?;

        let kind = match track.in_flight {
            Some((in_flight, kind)) if in_flight == ticket => kind,
            _ => return Err(SyncError::UnknownTicket(ticket)),
        };
        track.in_flight = None;

        let outcome = match outcome {
            Ok(outcome) if outcome.kind() == kind => outcome,
            Ok(outcome) => {
                let err = SyncError::UnexpectedOutcome {
                    expected: kind,
                    found: outcome.kind(),
                };
                track.state = SyncState::Failed;
                track.failed_op = Some(kind);
                track.last_error = Some(err.to_string());
                return Err(err);
            }
            Err(err) => return self.fail(registry, key, kind, err),
        };

        match outcome {
            OpOutcome::Created(record) => {
                if let Err(err) = registry.assign_id(key, record.id.clone()) {
                    tracing::warn!(
                        "{} created as {} but the id could not be bound: {}",
                        key,
                        record.id,
                        err
                    );
                    if let Some(track) = self.tracks.get_mut(&key) {
                        track.state = SyncState::Failed;
                        track.failed_op = Some(OpKind::Create);
                        track.last_error = Some(err.to_string());
                    }
                    return Err(err.into());
                }
                tracing::info!("{} saved as {}", key, record.id);
                self.settle(registry, key, ticket)
            }
            OpOutcome::Updated(_) => self.settle(registry, key, ticket),
            OpOutcome::Deleted(existed) => {
                if !existed {
                    tracing::warn!("{} was already absent from the store", key);
                }
                registry.remove(key);
                self.tracks.remove(&key);
                tracing::info!("{} deleted", key);
                Ok(None)
            }
        }
    }

    /// 创建/更新成功后：发送排队的操作，或标记为已同步
    fn settle(
        &mut self,
        registry: &mut ShapeRegistry,
        key: ShapeKey,
        ticket: Ticket,
    ) -> Result<Option<StoreOp>, SyncError> {
        let Some(track) = self.tracks.get_mut(&key) else {
            return Ok(None);
        };
        track.failed_op = None;
        track.last_error = None;

        match track.queued.take() {
            Some(OpKind::Delete) => self.issue(registry, key, OpKind::Delete).map(Some),
            _ if ticket.version < track.version => {
                // 响应对应的是旧版本，发送最新状态
                tracing::debug!(
                    "{} response for version {} is stale (latest {})",
                    key,
                    ticket.version,
                    track.version
                );
                track.state = SyncState::Dirty;
                self.issue(registry, key, OpKind::Update).map(Some)
            }
            _ => {
                track.state = SyncState::Synced;
                tracing::debug!("{} synced at version {}", key, track.version);
                Ok(None)
            }
        }
    }

    fn fail(
        &mut self,
        registry: &mut ShapeRegistry,
        key: ShapeKey,
        kind: OpKind,
        err: StoreError,
    ) -> Result<Option<StoreOp>, SyncError> {
        tracing::warn!("{} {} failed: {}", key, kind, err);
        let persisted = registry.get(key).is_some_and(|s| s.is_persisted());
        let Some(track) = self.tracks.get_mut(&key) else {
            return Ok(None);
        };
        track.state = SyncState::Failed;
        track.failed_op = Some(kind);
        track.last_error = Some(err.to_string());

        match (track.queued.take(), persisted) {
            // 删除失败：保持 Failed 等待重试，排队的编辑不再发送
            (_, true) if kind == OpKind::Delete => Ok(None),
            // 编辑在失败前已到达：以最新状态重新进入 Saving
            (Some(OpKind::Update), true) => self.issue(registry, key, OpKind::Update).map(Some),
            (Some(OpKind::Delete), true) => self.issue(registry, key, OpKind::Delete).map(Some),
            // 创建失败后删除：存储里没有记录，本地移除即可
            (Some(OpKind::Delete), false) => {
                registry.remove(key);
                self.tracks.remove(&key);
                Ok(None)
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geomeasure_core::geometry::{Coord, Geometry};
    use geomeasure_core::properties::MeasurementProperties;

    fn line(end_lon: f64) -> Geometry {
        Geometry::LineString(vec![Coord::new(2.35, 48.85), Coord::new(end_lon, 48.86)])
    }

    fn record_for(op: &StoreOp, id: &str) -> Record {
        let StoreOp::Create { record, .. } = op else {
            panic!("expected create, got {op:?}");
        };
        record.clone().into_record(RecordId::new(id))
    }

    fn ok(op: &StoreOp, outcome: OpOutcome) -> Completion {
        Completion {
            ticket: op.ticket(),
            outcome: Ok(outcome),
        }
    }

    fn failed(op: &StoreOp) -> Completion {
        Completion {
            ticket: op.ticket(),
            outcome: Err(StoreError::Unavailable("offline".into())),
        }
    }

    /// 绘制并完成创建，返回已同步的图形
    fn synced_shape(registry: &mut ShapeRegistry, sync: &mut SyncController) -> ShapeKey {
        let key = registry.add_drawn(line(2.36)).key();
        let create = sync.on_draw_complete(registry, key).unwrap().unwrap();
        let record = record_for(&create, "rec-1");
        assert!(sync
            .complete(registry, ok(&create, OpOutcome::Created(record)))
            .unwrap()
            .is_none());
        key
    }

    #[test]
    fn test_draw_create_assigns_id() {
        let mut registry = ShapeRegistry::default();
        let mut sync = SyncController::new();
        let key = registry.add_drawn(line(2.36)).key();

        let create = sync.on_draw_complete(&registry, key).unwrap().unwrap();
        assert_eq!(sync.state(key), Some(SyncState::Saving));
        let StoreOp::Create { record, .. } = &create else {
            panic!("expected create");
        };
        assert_eq!(record.properties.kind, "LineString");

        let saved = record_for(&create, "rec-1");
        sync.complete(&mut registry, ok(&create, OpOutcome::Created(saved)))
            .unwrap();

        assert_eq!(sync.state(key), Some(SyncState::Synced));
        assert_eq!(registry.get(key).unwrap().id(), Some(&RecordId::new("rec-1")));
    }

    #[test]
    fn test_create_failure_keeps_shape() {
        let mut registry = ShapeRegistry::default();
        let mut sync = SyncController::new();
        let key = registry.add_drawn(line(2.36)).key();

        let create = sync.on_draw_complete(&registry, key).unwrap().unwrap();
        sync.complete(&mut registry, failed(&create)).unwrap();

        assert_eq!(sync.state(key), Some(SyncState::Failed));
        assert!(sync.last_error(key).unwrap().contains("offline"));
        assert!(registry.get(key).is_some());

        let retry = sync.retry(&registry, key).unwrap().unwrap();
        assert_eq!(retry.kind(), OpKind::Create);
    }

    #[test]
    fn test_edit_without_id_is_noop() {
        let mut registry = ShapeRegistry::default();
        let mut sync = SyncController::new();
        let key = registry.add_drawn(line(2.36)).key();

        assert!(sync.on_edit(&registry, key).unwrap().is_none());
        assert_eq!(sync.state(key), Some(SyncState::Draft));
    }

    #[test]
    fn test_edit_sends_full_update_without_type() {
        let mut registry = ShapeRegistry::default();
        let mut sync = SyncController::new();
        let key = synced_shape(&mut registry, &mut sync);

        registry.replace_geometry(key, line(2.40), None).unwrap();
        let update = sync.on_edit(&registry, key).unwrap().unwrap();

        let StoreOp::Update { id, patch, .. } = &update else {
            panic!("expected update");
        };
        assert_eq!(id.as_str(), "rec-1");
        assert_eq!(patch.geometry.as_ref(), Some(&line(2.40)));
        let props = patch.properties.as_ref().unwrap();
        assert!(props.kind.is_none());
        assert!(props.calculated_value.is_some());
        assert!(props.label.is_some());
    }

    #[test]
    fn test_rapid_edits_are_coalesced() {
        let mut registry = ShapeRegistry::default();
        let mut sync = SyncController::new();
        let key = synced_shape(&mut registry, &mut sync);

        registry.set_label(key, "first").unwrap();
        let first = sync.on_edit(&registry, key).unwrap().unwrap();

        registry.set_label(key, "second").unwrap();
        assert!(sync.on_edit(&registry, key).unwrap().is_none());
        registry.set_label(key, "third").unwrap();
        assert!(sync.on_edit(&registry, key).unwrap().is_none());
        assert_eq!(sync.state(key), Some(SyncState::Saving));

        let stale = registry.get(key).unwrap().to_new_record().into_record(RecordId::new("rec-1"));
        let next = sync
            .complete(&mut registry, ok(&first, OpOutcome::Updated(stale.clone())))
            .unwrap()
            .expect("latest state must be sent");

        let StoreOp::Update { patch, .. } = &next else {
            panic!("expected update");
        };
        assert_eq!(
            patch.properties.as_ref().and_then(|p| p.label.as_deref()),
            Some("third")
        );

        assert!(sync
            .complete(&mut registry, ok(&next, OpOutcome::Updated(stale)))
            .unwrap()
            .is_none());
        assert_eq!(sync.state(key), Some(SyncState::Synced));
    }

    #[test]
    fn test_edit_during_create_is_sent_after_id() {
        let mut registry = ShapeRegistry::default();
        let mut sync = SyncController::new();
        let key = registry.add_drawn(line(2.36)).key();
        let create = sync.on_draw_complete(&registry, key).unwrap().unwrap();

        registry.set_label(key, "renamed while saving").unwrap();
        assert!(sync.on_edit(&registry, key).unwrap().is_none());

        let record = record_for(&create, "rec-9");
        let next = sync
            .complete(&mut registry, ok(&create, OpOutcome::Created(record)))
            .unwrap()
            .unwrap();
        assert_eq!(next.kind(), OpKind::Update);
        assert_eq!(sync.state(key), Some(SyncState::Saving));
    }

    #[test]
    fn test_delete_failure_keeps_shape() {
        let mut registry = ShapeRegistry::default();
        let mut sync = SyncController::new();
        let key = synced_shape(&mut registry, &mut sync);

        let delete = sync.on_delete(&mut registry, key).unwrap().unwrap();
        sync.complete(&mut registry, failed(&delete)).unwrap();

        assert!(registry.get(key).is_some());
        assert_eq!(sync.state(key), Some(SyncState::Failed));

        let retry = sync.retry(&registry, key).unwrap().unwrap();
        assert_eq!(retry.kind(), OpKind::Delete);
        sync.complete(&mut registry, ok(&retry, OpOutcome::Deleted(true)))
            .unwrap();
        assert!(registry.get(key).is_none());
        assert_eq!(sync.state(key), None);
    }

    #[test]
    fn test_edit_queued_behind_failed_delete() {
        let mut registry = ShapeRegistry::default();
        let mut sync = SyncController::new();
        let key = synced_shape(&mut registry, &mut sync);

        let delete = sync.on_delete(&mut registry, key).unwrap().unwrap();
        registry.set_label(key, "renamed").unwrap();
        assert!(sync.on_edit(&registry, key).unwrap().is_none());

        assert!(sync.complete(&mut registry, failed(&delete)).unwrap().is_none());
        assert_eq!(sync.state(key), Some(SyncState::Failed));
        assert!(sync.last_error(key).unwrap().contains("offline"));

        // 之后的编辑也不能掩盖失败的删除
        registry.set_label(key, "renamed again").unwrap();
        assert!(sync.on_edit(&registry, key).unwrap().is_none());
        assert_eq!(sync.state(key), Some(SyncState::Failed));

        let retry = sync.retry(&registry, key).unwrap().unwrap();
        assert_eq!(retry.kind(), OpKind::Delete);
        sync.complete(&mut registry, ok(&retry, OpOutcome::Deleted(true)))
            .unwrap();
        assert!(registry.get(key).is_none());
    }

    #[test]
    fn test_created_id_conflict_marks_failed() {
        let mut registry = ShapeRegistry::default();
        let mut sync = SyncController::new();
        let first = registry.add_drawn(line(2.36)).key();
        registry.assign_id(first, RecordId::new("same")).unwrap();
        sync.track_synced(first);

        let second = registry.add_drawn(line(2.37)).key();
        let create = sync.on_draw_complete(&registry, second).unwrap().unwrap();
        let record = record_for(&create, "same");

        let result = sync.complete(&mut registry, ok(&create, OpOutcome::Created(record)));
        assert!(matches!(
            result,
            Err(SyncError::Registry(RegistryError::DuplicateId(_)))
        ));
        assert_eq!(sync.state(second), Some(SyncState::Failed));
        assert!(!sync.is_busy(second));
        assert!(sync.last_error(second).is_some());
        assert!(registry.get(second).unwrap().id().is_none());

        let retry = sync.retry(&registry, second).unwrap().unwrap();
        assert_eq!(retry.kind(), OpKind::Create);
    }

    #[test]
    fn test_delete_draft_is_local() {
        let mut registry = ShapeRegistry::default();
        let mut sync = SyncController::new();
        let key = registry.add_drawn(line(2.36)).key();

        assert!(sync.on_delete(&mut registry, key).unwrap().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_queued_delete_supersedes_update() {
        let mut registry = ShapeRegistry::default();
        let mut sync = SyncController::new();
        let key = synced_shape(&mut registry, &mut sync);

        let update = sync.on_edit(&registry, key).unwrap().unwrap();
        assert!(sync.on_delete(&mut registry, key).unwrap().is_none());
        assert!(sync.on_edit(&registry, key).unwrap().is_none());

        let record = Record {
            id: RecordId::new("rec-1"),
            geometry: line(2.36),
            properties: MeasurementProperties::new(1.0, "LineString", "x"),
        };
        let next = sync
            .complete(&mut registry, ok(&update, OpOutcome::Updated(record)))
            .unwrap()
            .unwrap();
        assert_eq!(next.kind(), OpKind::Delete);
    }

    #[test]
    fn test_failed_update_recovers_on_next_edit() {
        let mut registry = ShapeRegistry::default();
        let mut sync = SyncController::new();
        let key = synced_shape(&mut registry, &mut sync);

        let update = sync.on_edit(&registry, key).unwrap().unwrap();
        sync.complete(&mut registry, failed(&update)).unwrap();
        assert_eq!(sync.state(key), Some(SyncState::Failed));

        let again = sync.on_edit(&registry, key).unwrap().unwrap();
        assert_eq!(again.kind(), OpKind::Update);
        assert_eq!(sync.state(key), Some(SyncState::Saving));
    }

    #[test]
    fn test_unknown_ticket_rejected() {
        let mut registry = ShapeRegistry::default();
        let mut sync = SyncController::new();
        let key = synced_shape(&mut registry, &mut sync);

        let update = sync.on_edit(&registry, key).unwrap().unwrap();
        let record = Record {
            id: RecordId::new("rec-1"),
            geometry: line(2.36),
            properties: MeasurementProperties::new(1.0, "LineString", "x"),
        };
        sync.complete(&mut registry, ok(&update, OpOutcome::Updated(record.clone())))
            .unwrap();

        let replay = sync.complete(&mut registry, ok(&update, OpOutcome::Updated(record)));
        assert!(matches!(replay, Err(SyncError::UnknownTicket(_))));
    }

    #[test]
    fn test_independent_controllers() {
        let mut registry_a = ShapeRegistry::default();
        let mut registry_b = ShapeRegistry::default();
        let mut sync_a = SyncController::new();
        let mut sync_b = SyncController::new();

        let a = synced_shape(&mut registry_a, &mut sync_a);
        let b = registry_b.add_drawn(line(2.37)).key();

        assert_eq!(sync_a.state(a), Some(SyncState::Synced));
        assert_eq!(sync_b.state(b), None);
        assert!(sync_b.on_draw_complete(&registry_b, b).unwrap().is_some());
        assert_eq!(sync_a.state(a), Some(SyncState::Synced));
    }
}
