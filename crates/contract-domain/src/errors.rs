// errors.rs
use crate::WorkflowState;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
  #[error("Error de validación: {0}")]
  ValidationError(String),
  /// La arista `from -> to` no existe en la tabla de transiciones.
  #[error("Transición ilegal: {from} -> {to}")]
  IllegalTransition { from: WorkflowState, to: WorkflowState },
  /// Edición sobre un contrato en estado terminal (`LOCKED` / `REVOKED`).
  #[error("Contrato inmutable en estado {0}")]
  Immutable(WorkflowState),
  #[error("Error externo: {0}")]
  ExternalError(String),
  #[error("Error de serialización: {0}")]
  SerializationError(String),
}

impl From<serde_json::Error> for DomainError {
  fn from(e: serde_json::Error) -> Self {
    Self::SerializationError(e.to_string())
  }
}
