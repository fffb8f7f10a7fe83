//! 标注派生
//!
//! 图形的显示标注完全由几何推导：线串每段一个分段标注，
//! 另有一个主标签锚点。几何变化后整体重新生成。

use crate::geometry::{Coord, Geometry};
use crate::measure::{format_length, segment_midpoint, Measurer};

/// 分段标注：显示在线段中点的长度文本
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentAnnotation {
    pub midpoint: Coord,
    pub text: String,
}

/// 生成分段标注；只有线串有，数量为顶点数减一
pub fn segment_annotations(measurer: &Measurer, geometry: &Geometry) -> Vec<SegmentAnnotation> {
    geometry
        .line_coords()
        .windows(2)
        .map(|pair| SegmentAnnotation {
            midpoint: segment_midpoint(&pair[0], &pair[1]),
            text: format_length(measurer.distance(&pair[0], &pair[1])),
        })
        .collect()
}

/// 主标签锚点
///
/// - 点：点本身
/// - 线串：最后一个顶点
/// - 多边形：外环的面积质心（退化时取顶点平均）
pub fn label_anchor(geometry: &Geometry) -> Coord {
    match geometry {
        Geometry::Point(c) => Coord::new(c.lon, c.lat),
        Geometry::LineString(coords) => coords
            .last()
            .map(|c| Coord::new(c.lon, c.lat))
            .unwrap_or(Coord::new(0.0, 0.0)),
        Geometry::Polygon(rings) => rings
            .first()
            .map(|ring| ring_centroid(ring))
            .unwrap_or(Coord::new(0.0, 0.0)),
    }
}

fn ring_centroid(ring: &[Coord]) -> Coord {
    let open = &ring[..ring.len().saturating_sub(1)];
    if open.is_empty() {
        return Coord::new(0.0, 0.0);
    }

    let mut twice_area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for (p, q) in open.iter().zip(open.iter().cycle().skip(1)) {
        let cross = p.lon * q.lat - q.lon * p.lat;
        twice_area += cross;
        cx += (p.lon + q.lon) * cross;
        cy += (p.lat + q.lat) * cross;
    }

    if twice_area.abs() < f64::EPSILON {
        let n = open.len() as f64;
        let lon = open.iter().map(|c| c.lon).sum::<f64>() / n;
        let lat = open.iter().map(|c| c.lat).sum::<f64>() / n;
        return Coord::new(lon, lat);
    }

    let factor = 1.0 / (3.0 * twice_area);
    Coord::new(cx * factor, cy * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_annotation_per_segment() {
        let geometry = Geometry::LineString(vec![
            Coord::new(2.35, 48.85),
            Coord::new(2.36, 48.86),
            Coord::new(2.37, 48.86),
        ]);
        let annotations = segment_annotations(&Measurer::default(), &geometry);
        assert_eq!(annotations.len(), 2);
        assert!(annotations.iter().all(|a| a.text.ends_with(" m")));
    }

    #[test]
    fn test_polygon_has_no_segment_annotations() {
        let geometry = Geometry::Polygon(vec![vec![
            Coord::new(0.0, 0.0),
            Coord::new(1.0, 0.0),
            Coord::new(1.0, 1.0),
            Coord::new(0.0, 0.0),
        ]]);
        assert!(segment_annotations(&Measurer::default(), &geometry).is_empty());
    }

    #[test]
    fn test_square_centroid() {
        let geometry = Geometry::Polygon(vec![vec![
            Coord::new(0.0, 0.0),
            Coord::new(2.0, 0.0),
            Coord::new(2.0, 2.0),
            Coord::new(0.0, 2.0),
            Coord::new(0.0, 0.0),
        ]]);
        let anchor = label_anchor(&geometry);
        assert!((anchor.lon - 1.0).abs() < 1e-12);
        assert!((anchor.lat - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_line_anchor_is_last_vertex() {
        let geometry = Geometry::LineString(vec![Coord::new(0.0, 0.0), Coord::new(3.0, 4.0)]);
        assert_eq!(label_anchor(&geometry), Coord::new(3.0, 4.0));
    }
}
