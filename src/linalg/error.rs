/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use ::qr_eigen_comm::CommError;

pub type QrResult<T> = Result<T, QrError>;

/// Everything that can go wrong in a factorization or eigenvalue run.
///
/// The same numerically singular input produces the same `SingularColumn`
/// in every execution mode.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QrError {
    #[error("invalid matrix dimension: {size}")]
    InvalidDimension { size: usize },

    #[error("matrix dimensions do not match: {left}x{left} versus {right}x{right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("column {column} is linearly dependent on the columns before it (norm {norm:e})")]
    SingularColumn { column: usize, norm: f64 },

    #[error("process topology error: {reason}")]
    ProcessTopology { reason: String },

    #[error("could not allocate a {size}x{size} matrix")]
    ResourceExhaustion { size: usize },
}

impl QrError {
    pub(crate) fn topology(reason: impl Into<String>) -> Self {
        QrError::ProcessTopology { reason: reason.into() }
    }
}

impl From<CommError> for QrError {
    fn from(e: CommError) -> Self { QrError::topology(e.to_string()) }
}
