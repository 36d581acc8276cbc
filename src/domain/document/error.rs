//! Document lifecycle errors

use thiserror::Error;

use super::entity::DocumentId;

/// Rejected status changes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Document '{id}' is deleted and cannot change status")]
    DocumentDeleted { id: DocumentId },

    #[error("Document '{id}' can only be deleted through the deletion flow")]
    DeletionNotAllowed { id: DocumentId },
}
