// Archivo: errors.rs
// Propósito: definir los errores del motor de contratos, el código de estado
// que ve la capa de presentación y el alias Result<T> usado por las APIs.
use contract_domain::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errores del motor y de sus repositorios.
///
/// - `NotFound`: recurso inexistente o de otro usuario (indistinguibles a
///   propósito para no filtrar la existencia de recursos ajenos).
/// - `Conflict`: otra escritura cambió la versión esperada.
/// - `Storage`: error del almacenamiento subyacente, ya envuelto.
/// - `Authentication`: credenciales o sesión inválidas.
/// - `Domain`: reglas del dominio (transición ilegal, contrato inmutable,
///   validación).
#[derive(Error, Debug)]
pub enum FlowError {
  #[error("No encontrado: {0}")]
  NotFound(String),
  #[error("Conflicto: {0}")]
  Conflict(String),
  #[error("Error de almacenamiento: {0}")]
  Storage(String),
  #[error("Autenticación fallida: {0}")]
  Authentication(String),
  #[error(transparent)]
  Domain(#[from] DomainError),
}

/// Códigos de estado independientes del transporte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
  Ok,
  NotFound,
  Forbidden,
  IllegalTransition,
  Immutable,
  ValidationFailed,
  Conflict,
  Internal,
}

impl FlowError {
  pub fn status_code(&self) -> StatusCode {
    match self {
      FlowError::NotFound(_) => StatusCode::NotFound,
      FlowError::Conflict(_) => StatusCode::Conflict,
      FlowError::Storage(_) => StatusCode::Internal,
      FlowError::Authentication(_) => StatusCode::Forbidden,
      FlowError::Domain(DomainError::IllegalTransition { .. }) => StatusCode::IllegalTransition,
      FlowError::Domain(DomainError::Immutable(_)) => StatusCode::Immutable,
      FlowError::Domain(DomainError::ValidationError(_)) => StatusCode::ValidationFailed,
      FlowError::Domain(DomainError::ExternalError(_)) | FlowError::Domain(DomainError::SerializationError(_)) => {
        StatusCode::Internal
      }
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, FlowError::NotFound(_))
  }

  pub fn is_illegal_transition(&self) -> bool {
    matches!(self, FlowError::Domain(DomainError::IllegalTransition { .. }))
  }

  pub fn is_immutable(&self) -> bool {
    matches!(self, FlowError::Domain(DomainError::Immutable(_)))
  }

  pub fn is_validation(&self) -> bool {
    matches!(self, FlowError::Domain(DomainError::ValidationError(_)))
  }
}

impl fmt::Display for StatusCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      StatusCode::Ok => "Ok",
      StatusCode::NotFound => "NotFound",
      StatusCode::Forbidden => "Forbidden",
      StatusCode::IllegalTransition => "IllegalTransition",
      StatusCode::Immutable => "Immutable",
      StatusCode::ValidationFailed => "ValidationFailed",
      StatusCode::Conflict => "Conflict",
      StatusCode::Internal => "Internal",
    };
    write!(f, "{}", s)
  }
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, FlowError>;
