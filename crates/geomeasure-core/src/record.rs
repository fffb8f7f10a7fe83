//! 持久化记录的线上格式
//!
//! ```json
//! { "_id": "...", "geometry": {"type": "...", "coordinates": [...]},
//!   "properties": {"calculatedValue": 0.0, "type": "...", "label": "..."} }
//! ```

use crate::geometry::Geometry;
use crate::properties::{MeasurementProperties, PropertiesPatch};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 存储分配的记录ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 已持久化的测量记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub geometry: Geometry,
    pub properties: MeasurementProperties,
}

/// 创建请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub geometry: Geometry,
    pub properties: MeasurementProperties,
}

impl NewRecord {
    pub fn into_record(self, id: RecordId) -> Record {
        Record {
            id,
            geometry: self.geometry,
            properties: self.properties,
        }
    }
}

/// 更新请求：缺省字段保持不变（合并而非替换）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertiesPatch>,
}

impl Record {
    /// 应用更新补丁
    pub fn apply(&mut self, patch: RecordPatch) {
        if let Some(geometry) = patch.geometry {
            self.geometry = geometry;
        }
        if let Some(properties) = &patch.properties {
            self.properties.merge(properties);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Coord;
    use serde_json::json;

    fn sample() -> Record {
        Record {
            id: RecordId::new("65f1c0ffee"),
            geometry: Geometry::Point(Coord::new(2.35, 48.85)),
            properties: MeasurementProperties::new(0.0, "Point", "pin"),
        }
    }

    #[test]
    fn test_record_wire_shape() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value,
            json!({
                "_id": "65f1c0ffee",
                "geometry": {"type": "Point", "coordinates": [2.35, 48.85]},
                "properties": {"calculatedValue": 0.0, "type": "Point", "label": "pin"}
            })
        );
    }

    #[test]
    fn test_apply_patch_merges_properties() {
        let mut record = sample();
        record.apply(RecordPatch {
            geometry: Some(Geometry::Point(Coord::new(2.40, 48.90))),
            properties: Some(PropertiesPatch {
                label: Some("moved pin".into()),
                ..Default::default()
            }),
        });

        assert_eq!(record.geometry, Geometry::Point(Coord::new(2.40, 48.90)));
        assert_eq!(record.properties.label, "moved pin");
        assert_eq!(record.properties.kind, "Point");
    }
}
