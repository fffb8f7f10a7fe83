//! geomeasure 核心测量引擎
//!
//! 在地图上绘制的线和多边形，经校验后计算长度、面积和分段距离，
//! 并维护图形、标注与持久化记录之间的对应关系。
//!
//! # 架构设计
//!
//! - `Geometry`: EPSG:4326 下的点、线串、多边形
//! - `validation`: 入口校验，一次列出所有违规字段
//! - `Measurer`: 在固定投影下计算长度/面积
//! - `ShapeRegistry`: 当前可见、可编辑的图形集合
//!
//! # 示例
//!
//! ```rust
//! use geomeasure_core::prelude::*;
//!
//! let raw = serde_json::json!({
//!     "type": "LineString",
//!     "coordinates": [[2.35, 48.85], [2.36, 48.86]]
//! });
//! let line = Geometry::validate(&raw).unwrap();
//!
//! let measurer = Measurer::default();
//! println!("Length: {}", format_length(measurer.length(&line)));
//! ```

pub mod annotation;
pub mod error;
pub mod geometry;
pub mod measure;
pub mod properties;
pub mod record;
pub mod registry;
pub mod validation;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::annotation::SegmentAnnotation;
    pub use crate::error::{RegistryError, ValidationError, Violation, ViolationKind};
    pub use crate::geometry::{Coord, Geometry, GeometryKind};
    pub use crate::measure::{format_area, format_length, format_measurement, Measurer, Projection};
    pub use crate::properties::{MeasurementProperties, PropertiesPatch};
    pub use crate::record::{NewRecord, Record, RecordId, RecordPatch};
    pub use crate::registry::{Shape, ShapeKey, ShapeRef, ShapeRegistry};
    pub use crate::validation::{validate_create, validate_geometry, validate_update};
}
