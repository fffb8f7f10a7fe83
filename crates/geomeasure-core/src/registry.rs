//! 图形注册表
//!
//! 持有当前可见、可编辑的全部图形，是唯一的共享可变状态。
//! 所有修改都经过这里的操作，要么完整生效，要么完全不生效。
//! 遍历顺序即插入顺序。

use crate::annotation::{label_anchor, segment_annotations, SegmentAnnotation};
use crate::error::RegistryError;
use crate::geometry::{Coord, Geometry};
use crate::measure::Measurer;
use crate::properties::{MeasurementProperties, PropertiesPatch};
use crate::record::{NewRecord, Record, RecordId, RecordPatch};
use std::fmt;

/// 注册表内的本地句柄，图形持久化前就存在
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeKey(u64);

impl ShapeKey {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shape#{}", self.0)
    }
}

/// 图形引用：本地句柄或存储分配的记录ID
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShapeRef {
    Key(ShapeKey),
    Id(RecordId),
}

impl From<ShapeKey> for ShapeRef {
    fn from(key: ShapeKey) -> Self {
        ShapeRef::Key(key)
    }
}

impl From<RecordId> for ShapeRef {
    fn from(id: RecordId) -> Self {
        ShapeRef::Id(id)
    }
}

impl From<&RecordId> for ShapeRef {
    fn from(id: &RecordId) -> Self {
        ShapeRef::Id(id.clone())
    }
}

impl fmt::Display for ShapeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeRef::Key(key) => key.fmt(f),
            ShapeRef::Id(id) => id.fmt(f),
        }
    }
}

/// 绘制的图形
///
/// 几何、派生测量值和标注分别存放；字段只能通过注册表修改。
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    key: ShapeKey,
    id: Option<RecordId>,
    geometry: Geometry,
    properties: MeasurementProperties,
    segment_annotations: Vec<SegmentAnnotation>,
    label_anchor: Coord,
}

impl Shape {
    pub fn key(&self) -> ShapeKey {
        self.key
    }

    /// 存储分配的ID，首次持久化前为 `None`
    pub fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn properties(&self) -> &MeasurementProperties {
        &self.properties
    }

    pub fn label(&self) -> &str {
        &self.properties.label
    }

    pub fn segment_annotations(&self) -> &[SegmentAnnotation] {
        &self.segment_annotations
    }

    pub fn label_anchor(&self) -> Coord {
        self.label_anchor
    }

    /// 创建请求负载
    pub fn to_new_record(&self) -> NewRecord {
        NewRecord {
            geometry: self.geometry.clone(),
            properties: self.properties.clone(),
        }
    }

    /// 更新请求负载：完整几何 + 测量值 + 标签
    ///
    /// `type` 创建后不变，不随更新发送。
    pub fn to_patch(&self) -> RecordPatch {
        RecordPatch {
            geometry: Some(self.geometry.clone()),
            properties: Some(PropertiesPatch {
                calculated_value: Some(self.properties.calculated_value),
                kind: None,
                label: Some(self.properties.label.clone()),
            }),
        }
    }

    fn matches(&self, shape: &ShapeRef) -> bool {
        match shape {
            ShapeRef::Key(key) => self.key == *key,
            ShapeRef::Id(id) => self.id.as_ref() == Some(id),
        }
    }
}

/// 图形注册表
#[derive(Debug, Default)]
pub struct ShapeRegistry {
    measurer: Measurer,
    next_key: u64,
    shapes: Vec<Shape>,
}

impl ShapeRegistry {
    pub fn new(measurer: Measurer) -> Self {
        Self {
            measurer,
            next_key: 0,
            shapes: Vec::new(),
        }
    }

    pub fn measurer(&self) -> &Measurer {
        &self.measurer
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// 按插入顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter()
    }

    fn allocate_key(&mut self) -> ShapeKey {
        self.next_key += 1;
        ShapeKey(self.next_key)
    }

    fn position(&self, shape: &ShapeRef) -> Option<usize> {
        self.shapes.iter().position(|s| s.matches(shape))
    }

    fn build(&self, key: ShapeKey, id: Option<RecordId>, geometry: Geometry, mut properties: MeasurementProperties) -> Shape {
        properties.calculated_value = self.measurer.measure(&geometry);
        properties.kind = geometry.type_name().to_string();
        Shape {
            key,
            id,
            segment_annotations: segment_annotations(&self.measurer, &geometry),
            label_anchor: label_anchor(&geometry),
            geometry,
            properties,
        }
    }

    /// 添加图形（未持久化）
    ///
    /// `calculated_value` 和类型总是由当前几何推导；标签沿用调用方的值。
    pub fn add(&mut self, geometry: Geometry, properties: MeasurementProperties) -> &Shape {
        let key = self.allocate_key();
        let shape = self.build(key, None, geometry, properties);
        tracing::debug!(
            "Added {} ({}, {} segment annotations)",
            key,
            shape.properties.kind,
            shape.segment_annotations.len()
        );
        self.shapes.push(shape);
        &self.shapes[self.shapes.len() - 1]
    }

    /// 添加刚绘制完成的图形，标签为格式化后的测量值
    pub fn add_drawn(&mut self, geometry: Geometry) -> &Shape {
        let properties = MeasurementProperties::new(
            0.0,
            geometry.kind().as_str(),
            self.measurer.label(&geometry),
        );
        self.add(geometry, properties)
    }

    /// 加入从存储加载的记录；ID 已存在时跳过并返回 `None`
    pub fn insert_persisted(&mut self, record: Record) -> Option<ShapeKey> {
        if self.find_by_id(&record.id).is_some() {
            tracing::debug!("Skipped already loaded record {}", record.id);
            return None;
        }
        let key = self.allocate_key();
        let shape = self.build(key, Some(record.id), record.geometry, record.properties);
        self.shapes.push(shape);
        Some(key)
    }

    pub fn get(&self, key: ShapeKey) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.key == key)
    }

    pub fn find_by_id(&self, id: &RecordId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id.as_ref() == Some(id))
    }

    pub fn resolve(&self, shape: &ShapeRef) -> Option<&Shape> {
        self.position(shape).map(|i| &self.shapes[i])
    }

    /// 替换几何
    ///
    /// 重新计算测量值、分段标注和锚点；除非显式提供新标签，否则保留用户标签。
    /// 几何类型不可改变。
    pub fn replace_geometry(
        &mut self,
        shape: impl Into<ShapeRef>,
        geometry: Geometry,
        label: Option<String>,
    ) -> Result<&Shape, RegistryError> {
        let shape = shape.into();
        let index = self
            .position(&shape)
            .ok_or_else(|| RegistryError::NotFound(shape.to_string()))?;

        let current = &self.shapes[index];
        if current.geometry.kind() != geometry.kind() {
            return Err(RegistryError::KindMismatch {
                expected: current.geometry.kind(),
                found: geometry.kind(),
            });
        }
        if matches!(&label, Some(text) if text.trim().is_empty()) {
            return Err(RegistryError::EmptyLabel);
        }

        let mut properties = current.properties.clone();
        if let Some(label) = label {
            properties.label = label;
        }
        let replacement = self.build(current.key, current.id.clone(), geometry, properties);
        tracing::debug!(
            "Replaced geometry of {}: {} -> {}",
            shape,
            self.shapes[index].properties.calculated_value,
            replacement.properties.calculated_value
        );

        self.shapes[index] = replacement;
        Ok(&self.shapes[index])
    }

    /// 修改标签，不重新计算测量值
    pub fn set_label(
        &mut self,
        shape: impl Into<ShapeRef>,
        text: impl Into<String>,
    ) -> Result<&Shape, RegistryError> {
        let shape = shape.into();
        let text = text.into();
        let index = self
            .position(&shape)
            .ok_or_else(|| RegistryError::NotFound(shape.to_string()))?;
        if text.trim().is_empty() {
            return Err(RegistryError::EmptyLabel);
        }

        self.shapes[index].properties.label = text;
        Ok(&self.shapes[index])
    }

    /// 移除图形及其全部标注
    pub fn remove(&mut self, shape: impl Into<ShapeRef>) -> bool {
        let shape = shape.into();
        match self.position(&shape) {
            Some(index) => {
                let removed = self.shapes.remove(index);
                tracing::debug!(
                    "Removed {} with {} segment annotations",
                    removed.key,
                    removed.segment_annotations.len()
                );
                true
            }
            None => false,
        }
    }

    /// 绑定存储分配的ID；只能对尚未持久化的图形调用一次
    pub fn assign_id(&mut self, key: ShapeKey, id: RecordId) -> Result<(), RegistryError> {
        if self.find_by_id(&id).is_some_and(|s| s.key != key) {
            return Err(RegistryError::DuplicateId(id));
        }

        let shape = self
            .shapes
            .iter_mut()
            .find(|s| s.key == key)
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))?;

        if let Some(existing) = &shape.id {
            return Err(RegistryError::AlreadyPersisted {
                key: key.to_string(),
                id: existing.clone(),
            });
        }

        tracing::debug!("Bound {} to record {}", key, id);
        shape.id = Some(id);
        Ok(())
    }
}
