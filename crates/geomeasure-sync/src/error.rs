//! 同步错误定义

use crate::controller::{OpKind, Ticket};
use geomeasure_core::error::{RegistryError, ValidationError};
use geomeasure_core::registry::ShapeKey;
use geomeasure_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("No in-flight operation for {} (version {})", .0.key, .0.version)]
    UnknownTicket(Ticket),

    #[error("Expected {expected} outcome, got {found}")]
    UnexpectedOutcome { expected: OpKind, found: OpKind },

    #[error("{0} has no record id yet")]
    NotPersisted(ShapeKey),
}
