//! geomeasure 同步
//!
//! 图形注册表与外部存储之间的同步：
//! - `controller`: 每个图形一个状态机，不做 IO，产出存储操作凭据
//! - `session`: 异步驱动器，把操作交给 [`MeasurementStore`](geomeasure_store::MeasurementStore) 执行并回送结果

pub mod controller;
pub mod error;
pub mod session;

pub use controller::{Completion, OpKind, OpOutcome, StoreOp, SyncController, SyncState, Ticket};
pub use error::SyncError;
pub use session::{execute, SyncSession};
