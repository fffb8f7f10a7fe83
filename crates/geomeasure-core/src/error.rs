//! 核心错误定义

use crate::geometry::GeometryKind;
use crate::record::RecordId;
use serde::Serialize;
use thiserror::Error;

/// 违规类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// 坐标越界、非数字或维度不对
    InvalidCoordinate,
    /// 线串少于2个点，或多边形环少于4个点
    InsufficientPoints,
    /// 几何类型不是 Point / LineString / Polygon
    UnsupportedType,
    /// 多边形环首尾不重合
    UnclosedRing,
    /// 测量属性字段无效
    InvalidProperty,
    /// 缺少必需字段
    MissingField,
}

/// 单个字段的违规信息
///
/// `path` 使用点号连接，例如 `geometry.coordinates.0.1`。
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{path}: {message}")]
pub struct Violation {
    #[serde(skip)]
    pub kind: ViolationKind,
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(kind: ViolationKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// 校验失败，包含所有违规字段（不会在第一个错误处停止）
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Validation failed ({} violation(s))", .violations.len())]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// 是否包含指定类别的违规
    pub fn has_kind(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }

    /// 查找指定路径上的违规
    pub fn at_path(&self, path: &str) -> Option<&Violation> {
        self.violations.iter().find(|v| v.path == path)
    }

    /// 生成对外的错误响应体
    pub fn to_response(&self) -> serde_json::Value {
        serde_json::json!({
            "error": "Validation failed",
            "details": self.violations,
        })
    }
}

/// 图形注册表错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Shape not found: {0}")]
    NotFound(String),

    #[error("Shape {key} is already persisted as {id}")]
    AlreadyPersisted { key: String, id: RecordId },

    #[error("Record id {0} is already bound to another shape")]
    DuplicateId(RecordId),

    #[error("Geometry kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        expected: GeometryKind,
        found: GeometryKind,
    },

    #[error("Label must not be empty")]
    EmptyLabel,
}
