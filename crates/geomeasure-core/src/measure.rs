//! 测量计算
//!
//! 所有长度/面积都在投影 P 下计算，而不是直接用经纬度度数：
//!
//! - 地球视为半径 [`EARTH_RADIUS`] 的球体；
//! - 长度：逐段沿大圆计算（haversine），等价于以该段起点为中心的
//!   方位等距投影下的平面距离；
//! - 面积：外环投影到 Lambert 等积圆柱投影 `(x = R·λ, y = R·sin φ)`，
//!   再用鞋带公式求平面面积，内环（洞）不参与计算；
//! - 高程忽略。
//!
//! 另提供 [`Projection::WebMercator`]：直接在 EPSG:3857 平面米坐标中量算，
//! 仅用于与屏幕坐标对照，默认不启用。

use crate::geometry::{Coord, Geometry, GeometryKind};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::str::FromStr;

/// 平均地球半径（米）
pub const EARTH_RADIUS: f64 = 6_371_008.8;

/// Web Mercator (EPSG:3857) 椭球长半轴（米）
pub const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Web Mercator 可表示的最大纬度
pub const WEB_MERCATOR_MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// 测量投影
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Projection {
    /// 球面大圆长度 + 等积圆柱面积（投影 P）
    #[default]
    Spherical,
    /// EPSG:3857 平面量算
    WebMercator,
}

impl FromStr for Projection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spherical" | "sphere" | "geodesic" => Ok(Projection::Spherical),
            "web-mercator" | "webmercator" | "epsg:3857" => Ok(Projection::WebMercator),
            other => Err(format!("Unknown projection: {other}")),
        }
    }
}

/// 经纬度投影到 Web Mercator 平面
pub fn to_web_mercator(c: &Coord) -> Point2<f64> {
    let lat = c
        .lat
        .clamp(-WEB_MERCATOR_MAX_LATITUDE, WEB_MERCATOR_MAX_LATITUDE)
        .to_radians();
    Point2::new(
        WEB_MERCATOR_RADIUS * c.lon.to_radians(),
        WEB_MERCATOR_RADIUS * (FRAC_PI_4 + lat / 2.0).tan().ln(),
    )
}

/// Web Mercator 平面坐标反投影为经纬度
pub fn from_web_mercator(p: &Point2<f64>) -> Coord {
    let lon = (p.x / WEB_MERCATOR_RADIUS).to_degrees();
    let lat = (2.0 * (p.y / WEB_MERCATOR_RADIUS).exp().atan() - FRAC_PI_2).to_degrees();
    Coord::new(lon, lat)
}

/// 等积圆柱投影
fn to_equal_area(c: &Coord) -> Point2<f64> {
    Point2::new(
        EARTH_RADIUS * c.lon.to_radians(),
        EARTH_RADIUS * c.lat.to_radians().sin(),
    )
}

/// 大圆距离（haversine）
fn haversine(a: &Coord, b: &Coord) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (lat2 - lat1) / 2.0;
    let d_lon = (b.lon - a.lon).to_radians() / 2.0;
    let h = d_lat.sin().powi(2) + lat1.cos() * lat2.cos() * d_lon.sin().powi(2);
    2.0 * EARTH_RADIUS * h.sqrt().atan2((1.0 - h).max(0.0).sqrt())
}

/// 鞋带公式（平面多边形面积，取绝对值）
fn shoelace(points: &[Point2<f64>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(p, q)| p.x * q.y - q.x * p.y)
        .sum();
    (twice / 2.0).abs()
}

/// 测量器
///
/// 无内部状态，同一几何多次测量结果完全相同。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Measurer {
    projection: Projection,
}

impl Measurer {
    pub fn new(projection: Projection) -> Self {
        Self { projection }
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// 两点间距离（米）
    pub fn distance(&self, a: &Coord, b: &Coord) -> f64 {
        match self.projection {
            Projection::Spherical => haversine(a, b),
            Projection::WebMercator => (to_web_mercator(b) - to_web_mercator(a)).norm(),
        }
    }

    /// 逐段长度，每对相邻坐标一项；非线串返回空
    pub fn segment_lengths(&self, geometry: &Geometry) -> Vec<f64> {
        geometry
            .line_coords()
            .windows(2)
            .map(|pair| self.distance(&pair[0], &pair[1]))
            .collect()
    }

    /// 线串总长度（米）；非线串为0
    pub fn length(&self, geometry: &Geometry) -> f64 {
        self.segment_lengths(geometry).iter().sum()
    }

    /// 多边形外环面积（平方米）；非多边形为0
    pub fn area(&self, geometry: &Geometry) -> f64 {
        let Some(ring) = geometry.outer_ring() else {
            return 0.0;
        };
        // 去掉闭合点
        let open = &ring[..ring.len().saturating_sub(1)];
        let projected: Vec<Point2<f64>> = match self.projection {
            Projection::Spherical => open.iter().map(to_equal_area).collect(),
            Projection::WebMercator => open.iter().map(to_web_mercator).collect(),
        };
        shoelace(&projected)
    }

    /// 按几何类型选择长度或面积
    pub fn measure(&self, geometry: &Geometry) -> f64 {
        match geometry.kind() {
            GeometryKind::Point => 0.0,
            GeometryKind::LineString => self.length(geometry),
            GeometryKind::Polygon => self.area(geometry),
        }
    }

    /// 测量值的显示文本
    pub fn label(&self, geometry: &Geometry) -> String {
        format_measurement(geometry.kind(), self.measure(geometry))
    }

    /// 分段长度的显示文本（侧栏列表使用）
    pub fn segment_labels(&self, geometry: &Geometry) -> Vec<String> {
        self.segment_lengths(geometry)
            .into_iter()
            .map(format_length)
            .collect()
    }
}

/// 线段在屏幕上的中点（Web Mercator 中点反投影回经纬度）
pub fn segment_midpoint(a: &Coord, b: &Coord) -> Coord {
    let pa = to_web_mercator(a);
    let pb = to_web_mercator(b);
    from_web_mercator(&nalgebra::center(&pa, &pb))
}

/// 两位小数、千位逗号分隔、`.` 小数点，与系统区域设置无关
fn format_grouped(value: f64) -> String {
    let value = if value > 0.0 { value } else { 0.0 };
    let fixed = format!("{value:.2}");
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{grouped}.{frac_part}")
}

/// 长度显示，例如 `1,234.57 m`
pub fn format_length(meters: f64) -> String {
    format!("{} m", format_grouped(meters))
}

/// 面积显示，例如 `1,234.57 m²`
pub fn format_area(square_meters: f64) -> String {
    format!("{} m²", format_grouped(square_meters))
}

pub fn format_measurement(kind: GeometryKind, value: f64) -> String {
    match kind {
        GeometryKind::Polygon => format_area(value),
        GeometryKind::Point | GeometryKind::LineString => format_length(value),
    }
}
