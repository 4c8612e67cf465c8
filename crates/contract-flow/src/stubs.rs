// Archivo: stubs.rs
// Propósito: implementaciones en memoria para pruebas y wiring rápido.
//
// Incluye un repositorio de contratos (`InMemoryContractRepository`) y un
// proveedor de identidad (`InMemoryIdentityProvider`). No son durables y se
// usan para demos o pruebas locales.
use crate::domain::PersistResult;
use crate::errors::{FlowError, Result};
use crate::identity::{Credentials, IdentityProvider, Session, SessionToken};
use crate::repository::ContractRepository;
use chrono::{DateTime, Utc};
use contract_domain::{Actor, Contract, DomainError, FieldDefinition, Owned, TransitionRecord, UserId};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Helper para mapear `Mutex::lock()` en un `Result` con `FlowError::Storage`.
fn lock<T>(m: &Mutex<T>) -> std::result::Result<MutexGuard<'_, T>, FlowError> {
    m.lock().map_err(|e| FlowError::Storage(format!("mutex poisoned: {:?}", e)))
}

/// Repositorio de contratos en memoria. Conserva el orden de inserción.
pub struct InMemoryContractRepository {
    contracts: Mutex<IndexMap<Uuid, Contract>>,
}

impl InMemoryContractRepository {
    pub fn new() -> Self {
        Self { contracts: Mutex::new(IndexMap::new()) }
    }

    /// Comprueba la versión y, si coincide, aplica `mutate` sobre una copia
    /// que sólo se guarda cuando la mutación tiene éxito.
    fn write_versioned<F>(&self, id: &Uuid, expected_version: i64, mutate: F) -> Result<PersistResult>
        where F: FnOnce(&mut Contract) -> std::result::Result<(), DomainError>
    {
        let mut contracts = lock(&self.contracts)?;
        let stored = contracts.get_mut(id)
                              .ok_or_else(|| FlowError::NotFound(format!("contrato {}", id)))?;
        if stored.version() != expected_version {
            return Ok(PersistResult::Conflict { expected: expected_version, actual: stored.version() });
        }
        let mut updated = stored.clone();
        mutate(&mut updated)?;
        let new_version = expected_version + 1;
        updated.set_version(new_version);
        *stored = updated;
        Ok(PersistResult::Ok { new_version })
    }
}

impl Default for InMemoryContractRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractRepository for InMemoryContractRepository {
    fn insert_contract(&self, contract: &Contract) -> Result<()> {
        let mut contracts = lock(&self.contracts)?;
        if contracts.contains_key(&contract.id()) {
            return Err(FlowError::Conflict(format!("el contrato {} ya existe", contract.id())));
        }
        contracts.insert(contract.id(), contract.clone());
        Ok(())
    }

    fn get_contract(&self, id: &Uuid) -> Result<Option<Contract>> {
        let contracts = lock(&self.contracts)?;
        Ok(contracts.get(id).cloned())
    }

    fn list_contracts(&self, owner: &UserId) -> Result<Vec<Contract>> {
        let contracts = lock(&self.contracts)?;
        let mut out: Vec<Contract> = contracts.values().rev().filter(|c| &c.owner() == owner).cloned().collect();
        out.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(out)
    }

    fn commit_transition(&self, id: &Uuid, record: &TransitionRecord, expected_version: i64) -> Result<PersistResult> {
        self.write_versioned(id, expected_version, |c| {
                if c.status() != record.from {
                    return Err(DomainError::IllegalTransition { from: c.status(), to: record.to });
                }
                c.apply_transition(record.to, record.actor, record.at).map(|_| ())
            })
    }

    fn replace_fields(&self,
                      id: &Uuid,
                      fields: &[FieldDefinition],
                      updated_at: DateTime<Utc>,
                      expected_version: i64)
                      -> Result<PersistResult> {
        self.write_versioned(id, expected_version, |c| c.replace_fields(fields.to_vec(), false, updated_at))
    }
}

struct UserRecord {
    actor: Actor,
    digest: String,
}

/// Proveedor de identidad en memoria: registro, login y sesiones.
///
/// Guarda sólo la huella SHA-256 del secreto para la comparación; no es un
/// esquema de contraseñas.
pub struct InMemoryIdentityProvider {
    /// Usuarios indexados por email normalizado.
    users: Mutex<HashMap<String, UserRecord>>,
    sessions: Mutex<HashMap<SessionToken, Actor>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self { users: Mutex::new(HashMap::new()), sessions: Mutex::new(HashMap::new()) }
    }

    /// Registra un usuario nuevo. Un email repetido es un error de validación.
    pub fn register(&self, name: &str, email: &str, secret: &str) -> Result<Actor> {
        let email = normalize_email(email);
        if name.trim().is_empty() || email.is_empty() || secret.is_empty() {
            return Err(DomainError::ValidationError("Nombre, email y secreto son obligatorios".to_string()).into());
        }
        let mut users = lock(&self.users)?;
        if users.contains_key(&email) {
            return Err(DomainError::ValidationError(format!("El usuario {} ya existe", email)).into());
        }
        let actor = Actor::new(UserId::new(), name.trim());
        users.insert(email, UserRecord { actor: actor.clone(), digest: digest(secret) });
        Ok(actor)
    }

    /// Invalida la sesión. Devuelve `false` si el token no existía.
    pub fn logout(&self, token: &SessionToken) -> Result<bool> {
        let mut sessions = lock(&self.sessions)?;
        Ok(sessions.remove(token).is_some())
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for InMemoryIdentityProvider {
    fn authenticate(&self, credentials: &Credentials) -> Result<Session> {
        let actor = {
            let users = lock(&self.users)?;
            match users.get(&normalize_email(&credentials.email)) {
                Some(u) if u.digest == digest(&credentials.secret) => u.actor.clone(),
                _ => return Err(FlowError::Authentication("credenciales inválidas".to_string())),
            }
        };
        let token = SessionToken::new(Uuid::new_v4().simple().to_string());
        lock(&self.sessions)?.insert(token.clone(), actor.clone());
        Ok(Session { token, actor, issued_at: Utc::now() })
    }

    fn resolve(&self, token: &SessionToken) -> Result<Actor> {
        let sessions = lock(&self.sessions)?;
        sessions.get(token)
                .cloned()
                .ok_or_else(|| FlowError::Authentication("sesión inválida o expirada".to_string()))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn digest(secret: &str) -> String {
    format!("{:x}", Sha256::digest(secret.as_bytes()))
}
