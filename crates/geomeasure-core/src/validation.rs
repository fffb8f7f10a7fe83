//! 入口校验
//!
//! 所有进入注册表或存储的几何/属性负载都先经过这里。
//! 收集全部违规字段后一次性返回，不在第一个错误处短路。
//! 无副作用，可重复调用。

use crate::error::{ValidationError, Violation, ViolationKind};
use crate::geometry::{
    Coord, Geometry, GeometryKind, MAX_LATITUDE, MAX_LONGITUDE, MIN_LATITUDE, MIN_LINE_POINTS,
    MIN_LONGITUDE, MIN_RING_POINTS,
};
use crate::properties::{MeasurementProperties, PropertiesPatch};
use crate::record::{NewRecord, RecordPatch};
use serde_json::Value;

const POSITION_HINT: &str = "expected [longitude, latitude] or [longitude, latitude, altitude]";

/// 校验单个几何，返回完整违规列表
pub fn validate_geometry(raw: &Value) -> Result<Geometry, ValidationError> {
    let mut violations = Vec::new();
    let geometry = collect_geometry(raw, "", &mut violations);
    finish(geometry, violations)
}

/// 校验创建请求 `{geometry, properties}`
pub fn validate_create(body: &Value) -> Result<NewRecord, ValidationError> {
    let mut violations = Vec::new();
    if !body.is_object() {
        violations.push(Violation::new(
            ViolationKind::MissingField,
            "",
            "request body must be an object",
        ));
        return Err(ValidationError::new(violations));
    }

    let geometry = match body.get("geometry") {
        Some(raw) => collect_geometry(raw, "geometry", &mut violations),
        None => {
            violations.push(required("geometry"));
            None
        }
    };

    let properties = match body.get("properties") {
        Some(raw) => collect_properties(raw, "properties", false, &mut violations),
        None => {
            violations.push(required("properties"));
            None
        }
    };

    check_kind_matches(body, &mut violations);

    let record = match (geometry, properties) {
        (Some(geometry), Some(patch)) => complete_properties(patch).map(|properties| NewRecord {
            geometry,
            properties,
        }),
        _ => None,
    };
    finish(record, violations)
}

/// 校验更新请求，所有字段可选，属性可部分提供
pub fn validate_update(body: &Value) -> Result<RecordPatch, ValidationError> {
    let mut violations = Vec::new();
    if !body.is_object() {
        violations.push(Violation::new(
            ViolationKind::MissingField,
            "",
            "request body must be an object",
        ));
        return Err(ValidationError::new(violations));
    }

    let geometry = body
        .get("geometry")
        .and_then(|raw| collect_geometry(raw, "geometry", &mut violations));
    let properties = body
        .get("properties")
        .and_then(|raw| collect_properties(raw, "properties", true, &mut violations));

    finish(
        Some(RecordPatch {
            geometry,
            properties,
        }),
        violations,
    )
}

fn finish<T>(value: Option<T>, violations: Vec<Violation>) -> Result<T, ValidationError> {
    match value {
        Some(value) if violations.is_empty() => Ok(value),
        _ => Err(ValidationError::new(violations)),
    }
}

fn join(base: &str, segment: impl std::fmt::Display) -> String {
    if base.is_empty() {
        segment.to_string()
    } else {
        format!("{base}.{segment}")
    }
}

fn required(path: &str) -> Violation {
    Violation::new(ViolationKind::MissingField, path, "Required")
}

/// 收集几何违规；无违规时返回几何
pub(crate) fn collect_geometry(
    raw: &Value,
    base: &str,
    out: &mut Vec<Violation>,
) -> Option<Geometry> {
    if !raw.is_object() {
        out.push(Violation::new(
            ViolationKind::UnsupportedType,
            base,
            "geometry must be an object",
        ));
        return None;
    }

    let type_path = join(base, "type");
    let kind = match raw.get("type").and_then(Value::as_str) {
        Some(name) => GeometryKind::from_name(name),
        None => None,
    };
    let Some(kind) = kind else {
        out.push(Violation::new(
            ViolationKind::UnsupportedType,
            type_path,
            "expected one of \"Point\", \"LineString\", \"Polygon\"",
        ));
        return None;
    };

    let coords_path = join(base, "coordinates");
    let Some(coordinates) = raw.get("coordinates") else {
        out.push(Violation::new(
            ViolationKind::InvalidCoordinate,
            coords_path,
            "Required",
        ));
        return None;
    };

    let before = out.len();
    let geometry = match kind {
        GeometryKind::Point => collect_coord(coordinates, &coords_path, out).map(Geometry::Point),
        GeometryKind::LineString => {
            collect_line(coordinates, &coords_path, out).map(Geometry::LineString)
        }
        GeometryKind::Polygon => {
            collect_polygon(coordinates, &coords_path, out).map(Geometry::Polygon)
        }
    };

    if out.len() == before {
        geometry
    } else {
        None
    }
}

fn collect_line(raw: &Value, path: &str, out: &mut Vec<Violation>) -> Option<Vec<Coord>> {
    let coords = collect_positions(raw, path, out)?;
    if coords.len() < MIN_LINE_POINTS {
        out.push(Violation::new(
            ViolationKind::InsufficientPoints,
            path,
            format!(
                "a LineString needs at least {MIN_LINE_POINTS} positions, found {}",
                coords.len()
            ),
        ));
        return None;
    }
    Some(coords)
}

fn collect_polygon(raw: &Value, path: &str, out: &mut Vec<Violation>) -> Option<Vec<Vec<Coord>>> {
    let Some(rings) = raw.as_array() else {
        out.push(Violation::new(
            ViolationKind::InvalidCoordinate,
            path,
            "expected an array of linear rings",
        ));
        return None;
    };

    if rings.is_empty() {
        out.push(Violation::new(
            ViolationKind::InsufficientPoints,
            path,
            "a Polygon needs at least one ring",
        ));
        return None;
    }

    let mut parsed = Vec::with_capacity(rings.len());
    let mut valid = true;
    for (i, ring) in rings.iter().enumerate() {
        let ring_path = join(path, i);
        let Some(coords) = collect_positions(ring, &ring_path, out) else {
            valid = false;
            continue;
        };

        if coords.len() < MIN_RING_POINTS {
            out.push(Violation::new(
                ViolationKind::InsufficientPoints,
                ring_path,
                format!(
                    "a Polygon ring needs at least {MIN_RING_POINTS} positions, found {}",
                    coords.len()
                ),
            ));
            valid = false;
            continue;
        }

        // 长度已检查，首尾一定存在
        if let (Some(first), Some(last)) = (coords.first(), coords.last()) {
            if !first.same_position(last) {
                out.push(Violation::new(
                    ViolationKind::UnclosedRing,
                    ring_path,
                    "the first and last positions of a ring must be identical",
                ));
                valid = false;
                continue;
            }
        }

        parsed.push(coords);
    }

    valid.then_some(parsed)
}

/// 解析坐标数组，逐个收集违规
fn collect_positions(raw: &Value, path: &str, out: &mut Vec<Violation>) -> Option<Vec<Coord>> {
    let Some(items) = raw.as_array() else {
        out.push(Violation::new(
            ViolationKind::InvalidCoordinate,
            path,
            "expected an array of positions",
        ));
        return None;
    };

    let mut coords = Vec::with_capacity(items.len());
    let mut valid = true;
    for (i, item) in items.iter().enumerate() {
        match collect_coord(item, &join(path, i), out) {
            Some(coord) => coords.push(coord),
            None => valid = false,
        }
    }
    valid.then_some(coords)
}

fn collect_coord(raw: &Value, path: &str, out: &mut Vec<Violation>) -> Option<Coord> {
    let Some(items) = raw.as_array() else {
        out.push(Violation::new(ViolationKind::InvalidCoordinate, path, POSITION_HINT));
        return None;
    };
    if !(2..=3).contains(&items.len()) {
        out.push(Violation::new(ViolationKind::InvalidCoordinate, path, POSITION_HINT));
        return None;
    }

    let mut numbers = [0.0_f64; 3];
    let mut valid = true;
    for (i, item) in items.iter().enumerate() {
        match item.as_f64() {
            Some(n) if n.is_finite() => numbers[i] = n,
            _ => {
                out.push(Violation::new(
                    ViolationKind::InvalidCoordinate,
                    join(path, i),
                    "expected a number",
                ));
                valid = false;
            }
        }
    }
    if !valid {
        return None;
    }

    let [lon, lat, alt] = numbers;
    if !(MIN_LONGITUDE..=MAX_LONGITUDE).contains(&lon) {
        out.push(Violation::new(
            ViolationKind::InvalidCoordinate,
            join(path, 0),
            format!("longitude must be between {MIN_LONGITUDE} and {MAX_LONGITUDE}, got {lon}"),
        ));
        valid = false;
    }
    if !(MIN_LATITUDE..=MAX_LATITUDE).contains(&lat) {
        out.push(Violation::new(
            ViolationKind::InvalidCoordinate,
            join(path, 1),
            format!("latitude must be between {MIN_LATITUDE} and {MAX_LATITUDE}, got {lat}"),
        ));
        valid = false;
    }
    if !valid {
        return None;
    }

    Some(if items.len() == 3 {
        Coord::with_altitude(lon, lat, alt)
    } else {
        Coord::new(lon, lat)
    })
}

/// 收集属性违规；`partial` 为真时允许缺省字段
fn collect_properties(
    raw: &Value,
    base: &str,
    partial: bool,
    out: &mut Vec<Violation>,
) -> Option<PropertiesPatch> {
    let Some(object) = raw.as_object() else {
        out.push(Violation::new(
            ViolationKind::InvalidProperty,
            base,
            "properties must be an object",
        ));
        return None;
    };

    let before = out.len();
    let mut patch = PropertiesPatch::default();

    let value_path = join(base, "calculatedValue");
    match object.get("calculatedValue") {
        Some(value) => match value.as_f64() {
            Some(v) if v.is_finite() && v >= 0.0 => patch.calculated_value = Some(v),
            _ => out.push(Violation::new(
                ViolationKind::InvalidProperty,
                value_path,
                "calculatedValue must be a non-negative number",
            )),
        },
        None if !partial => out.push(required(&value_path)),
        None => {}
    }

    for (field, slot) in [("type", &mut patch.kind), ("label", &mut patch.label)] {
        let path = join(base, field);
        match object.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => *slot = Some(s.clone()),
            Some(_) => out.push(Violation::new(
                ViolationKind::InvalidProperty,
                path,
                format!("{field} must be a non-empty string"),
            )),
            None if !partial => out.push(required(&path)),
            None => {}
        }
    }

    (out.len() == before).then_some(patch)
}

/// `properties.type` 必须与几何类型一致
///
/// 只比较两边都是合法字符串的情况，其余问题已由各自的字段报告。
fn check_kind_matches(body: &Value, out: &mut Vec<Violation>) {
    let geometry_type = body
        .pointer("/geometry/type")
        .and_then(Value::as_str)
        .and_then(GeometryKind::from_name);
    let property_type = body
        .pointer("/properties/type")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty());

    if let (Some(expected), Some(found)) = (geometry_type, property_type) {
        if found != expected.as_str() {
            out.push(Violation::new(
                ViolationKind::InvalidProperty,
                "properties.type",
                format!("type `{found}` does not match geometry type `{expected}`"),
            ));
        }
    }
}

fn complete_properties(patch: PropertiesPatch) -> Option<MeasurementProperties> {
    Some(MeasurementProperties {
        calculated_value: patch.calculated_value?,
        kind: patch.kind?,
        label: patch.label?,
    })
}
