//! Report layer errors

use custos_persistence::PersistenceError;
use thiserror::Error;

/// Errors surfacing from aggregation reads. The cache itself never fails;
/// only the backing store can.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report query failed: {0}")]
    Store(#[from] PersistenceError),
}

pub type ReportResult<T> = Result<T, ReportError>;
