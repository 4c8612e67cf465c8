use crate::DomainError;
use crate::{Blueprint, Owned, UserId};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Trait que define la persistencia de blueprints (Template Store).
pub trait BlueprintRepository: Send + Sync {
    /// Guarda un blueprint y devuelve su `Uuid`.
    fn save_blueprint(&self, blueprint: Blueprint) -> Result<Uuid, DomainError>;

    /// Recupera un blueprint por id sin comprobar propietario. Lo usa
    /// `instantiate`, que no exige ser dueño del blueprint.
    fn get_blueprint(&self, id: &Uuid) -> Result<Option<Blueprint>, DomainError>;

    /// Lista los blueprints de `owner`, el más reciente primero.
    fn list_blueprints(&self, owner: &UserId) -> Result<Vec<Blueprint>, DomainError>;

    /// Elimina el blueprint `id` sólo si pertenece a `owner`. Devuelve
    /// `false` si no existe o es de otro usuario. Nunca toca contratos.
    fn delete_blueprint(&self, id: &Uuid, owner: &UserId) -> Result<bool, DomainError>;
}

/// Implementación en memoria para tests y desarrollo.
pub struct InMemoryBlueprintRepository {
    // Orden de inserción; el listado lo invierte para desempatar por fecha.
    blueprints: Arc<Mutex<Vec<Blueprint>>>,
}

impl InMemoryBlueprintRepository {
    pub fn new() -> Self {
        Self { blueprints: Arc::new(Mutex::new(Vec::new())) }
    }

    fn lock_map<'a, T>(&'a self, m: &'a Mutex<T>, name: &str) -> Result<std::sync::MutexGuard<'a, T>, DomainError> {
        m.lock()
         .map_err(|e| DomainError::ExternalError(format!("Mutex '{}' poisoned: {}", name, e)))
    }
}

impl Default for InMemoryBlueprintRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl BlueprintRepository for InMemoryBlueprintRepository {
    fn save_blueprint(&self, blueprint: Blueprint) -> Result<Uuid, DomainError> {
        let id = blueprint.id();
        let mut blueprints = self.lock_map(&self.blueprints, "blueprints")?;
        match blueprints.iter_mut().find(|b| b.id() == id) {
            Some(existing) => *existing = blueprint,
            None => blueprints.push(blueprint),
        }
        Ok(id)
    }

    fn get_blueprint(&self, id: &Uuid) -> Result<Option<Blueprint>, DomainError> {
        let blueprints = self.lock_map(&self.blueprints, "blueprints")?;
        Ok(blueprints.iter().find(|b| &b.id() == id).cloned())
    }

    fn list_blueprints(&self, owner: &UserId) -> Result<Vec<Blueprint>, DomainError> {
        let blueprints = self.lock_map(&self.blueprints, "blueprints")?;
        let mut out: Vec<Blueprint> = blueprints.iter().rev().filter(|b| &b.owner() == owner).cloned().collect();
        out.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(out)
    }

    fn delete_blueprint(&self, id: &Uuid, owner: &UserId) -> Result<bool, DomainError> {
        let mut blueprints = self.lock_map(&self.blueprints, "blueprints")?;
        let before = blueprints.len();
        blueprints.retain(|b| !(&b.id() == id && &b.owner() == owner));
        Ok(blueprints.len() != before)
    }
}
