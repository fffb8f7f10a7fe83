//! 测量属性

use serde::{Deserialize, Serialize};

/// 测量属性（随记录持久化）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementProperties {
    /// 当前几何的测量值（米或平方米），非负
    pub calculated_value: f64,
    /// 几何类型的显示名称，创建后不再改变
    #[serde(rename = "type")]
    pub kind: String,
    /// 用户可编辑的显示文本
    pub label: String,
}

impl MeasurementProperties {
    pub fn new(calculated_value: f64, kind: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            calculated_value,
            kind: kind.into(),
            label: label.into(),
        }
    }

    /// 逐字段合并补丁，缺省字段保持不变
    pub fn merge(&mut self, patch: &PropertiesPatch) {
        if let Some(value) = patch.calculated_value {
            self.calculated_value = value;
        }
        if let Some(kind) = &patch.kind {
            self.kind.clone_from(kind);
        }
        if let Some(label) = &patch.label {
            self.label.clone_from(label);
        }
    }
}

/// 部分属性更新
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertiesPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculated_value: Option<f64>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl PropertiesPatch {
    pub fn is_empty(&self) -> bool {
        self.calculated_value.is_none() && self.kind.is_none() && self.label.is_none()
    }
}
