//! geomeasure 存储
//!
//! 同步控制器所依赖的外部存储协作者：
//! - `MeasurementStore`: 异步存储接口（创建、合并更新、删除、列出）
//! - `MemoryStore`: 进程内实现，可注入故障用于测试
//! - `persist`: JSON 快照文件的保存与加载

pub mod error;
pub mod memory;
pub mod persist;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::MeasurementStore;
