// Archivo: identity.rs
// Propósito: contrato con el proveedor de identidad. El motor nunca lee
// estado global de sesión: la capa de presentación resuelve el token a un
// `Actor` y lo pasa explícitamente a cada operación.
use crate::errors::Result;
use chrono::{DateTime, Utc};
use contract_domain::Actor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Credenciales de inicio de sesión.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, secret: impl Into<String>) -> Self {
        Self { email: email.into(), secret: secret.into() }
    }
}

/// Token opaco de sesión.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sesión emitida tras autenticar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: SessionToken,
    pub actor: Actor,
    pub issued_at: DateTime<Utc>,
}

/// Emite y valida credenciales de sesión. Los fallos se devuelven como
/// `FlowError::Authentication`.
pub trait IdentityProvider: Send + Sync {
    fn authenticate(&self, credentials: &Credentials) -> Result<Session>;

    fn resolve(&self, token: &SessionToken) -> Result<Actor>;
}
