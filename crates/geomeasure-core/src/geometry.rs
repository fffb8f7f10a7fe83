//! 地理几何图元定义
//!
//! 支持的 GeoJSON 几何：
//! - 点 (Point)
//! - 线串 (LineString)
//! - 多边形 (Polygon)，只测量外环
//!
//! 坐标为 EPSG:4326 的 `[经度, 纬度]` 或 `[经度, 纬度, 高程]`，经度在前。
//! 几何一经校验即不可变，编辑会生成新的几何替换旧的。

use crate::error::{Violation, ViolationKind};
use crate::validation;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;
pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;

/// 线串最少点数
pub const MIN_LINE_POINTS: usize = 2;
/// 多边形环最少点数（含闭合点）
pub const MIN_RING_POINTS: usize = 4;

/// 地理坐标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    /// 经度（度）
    pub lon: f64,
    /// 纬度（度）
    pub lat: f64,
    /// 高程，测量时忽略
    pub alt: Option<f64>,
}

impl Coord {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat, alt: None }
    }

    pub fn with_altitude(lon: f64, lat: f64, alt: f64) -> Self {
        Self {
            lon,
            lat,
            alt: Some(alt),
        }
    }

    /// 经纬度是否在 EPSG:4326 范围内
    pub fn in_bounds(&self) -> bool {
        (MIN_LONGITUDE..=MAX_LONGITUDE).contains(&self.lon)
            && (MIN_LATITUDE..=MAX_LATITUDE).contains(&self.lat)
    }

    /// 平面位置是否相同（忽略高程）
    pub fn same_position(&self, other: &Coord) -> bool {
        self.lon == other.lon && self.lat == other.lat
    }
}

impl Serialize for Coord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.alt.is_some() { 3 } else { 2 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.lon)?;
        seq.serialize_element(&self.lat)?;
        if let Some(alt) = self.alt {
            seq.serialize_element(&alt)?;
        }
        seq.end()
    }
}

/// 几何类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
}

impl GeometryKind {
    /// GeoJSON 中的类型名，同时用作 `properties.type` 的显示值
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::Polygon => "Polygon",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Point" => Some(GeometryKind::Point),
            "LineString" => Some(GeometryKind::LineString),
            "Polygon" => Some(GeometryKind::Polygon),
            _ => None,
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 几何类型枚举
///
/// 序列化为 `{"type": ..., "coordinates": ...}`；反序列化经过完整校验。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates", try_from = "Value")]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    Polygon(Vec<Vec<Coord>>),
}

impl Geometry {
    /// 从原始 GeoJSON 几何构造并校验
    ///
    /// 返回第一个违规；需要完整列表时使用 [`validation::validate_geometry`]。
    pub fn validate(raw: &Value) -> Result<Geometry, Violation> {
        let mut violations = Vec::new();
        let geometry = validation::collect_geometry(raw, "", &mut violations);
        match (geometry, violations.into_iter().next()) {
            (Some(geometry), None) => Ok(geometry),
            (_, Some(first)) => Err(first),
            (None, None) => Err(Violation::new(
                ViolationKind::UnsupportedType,
                "",
                "invalid geometry",
            )),
        }
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::LineString(_) => GeometryKind::LineString,
            Geometry::Polygon(_) => GeometryKind::Polygon,
        }
    }

    /// 获取几何的类型名称
    pub fn type_name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// 线串的顶点；其他几何返回空切片
    pub fn line_coords(&self) -> &[Coord] {
        match self {
            Geometry::LineString(coords) => coords,
            _ => &[],
        }
    }

    /// 多边形外环；其他几何返回 `None`
    pub fn outer_ring(&self) -> Option<&[Coord]> {
        match self {
            Geometry::Polygon(rings) => rings.first().map(Vec::as_slice),
            _ => None,
        }
    }

    /// 遍历所有坐标
    pub fn coords(&self) -> Box<dyn Iterator<Item = &Coord> + '_> {
        match self {
            Geometry::Point(c) => Box::new(std::iter::once(c)),
            Geometry::LineString(coords) => Box::new(coords.iter()),
            Geometry::Polygon(rings) => Box::new(rings.iter().flatten()),
        }
    }
}

impl TryFrom<Value> for Geometry {
    type Error = Violation;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        Geometry::validate(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_line_string() {
        let raw = json!({"type": "LineString", "coordinates": [[2.35, 48.85], [2.36, 48.86]]});
        let geometry = Geometry::validate(&raw).unwrap();
        assert_eq!(geometry.kind(), GeometryKind::LineString);
        assert_eq!(geometry.line_coords().len(), 2);
    }

    #[test]
    fn test_point_longitude_out_of_range() {
        let err = Geometry::validate(&json!({"type": "Point", "coordinates": [200, 10]})).unwrap_err();
        assert_eq!(err.kind, ViolationKind::InvalidCoordinate);
        assert_eq!(err.path, "coordinates.0");
    }

    #[test]
    fn test_short_ring_rejected() {
        let raw = json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]]]
        });
        let err = Geometry::validate(&raw).unwrap_err();
        assert_eq!(err.kind, ViolationKind::InsufficientPoints);
    }

    #[test]
    fn test_unsupported_type() {
        let raw = json!({"type": "MultiPoint", "coordinates": [[0.0, 0.0]]});
        let err = Geometry::validate(&raw).unwrap_err();
        assert_eq!(err.kind, ViolationKind::UnsupportedType);
    }

    #[test]
    fn test_serialize_geojson() {
        let geometry = Geometry::LineString(vec![
            Coord::new(2.35, 48.85),
            Coord::with_altitude(2.36, 48.86, 35.0),
        ]);
        let value = serde_json::to_value(&geometry).unwrap();
        assert_eq!(
            value,
            json!({"type": "LineString", "coordinates": [[2.35, 48.85], [2.36, 48.86, 35.0]]})
        );

        let parsed: Geometry = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, geometry);
    }

    #[test]
    fn test_deserialize_rejects_out_of_bounds() {
        let result: Result<Geometry, _> =
            serde_json::from_value(json!({"type": "Point", "coordinates": [10, 95]}));
        assert!(result.is_err());
    }
}
