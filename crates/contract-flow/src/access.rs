// Archivo: access.rs
// Propósito: compuerta de propiedad. Un recurso ajeno se trata igual que uno
// inexistente para no revelar su existencia.
use crate::errors::{FlowError, Result};
use contract_domain::{Actor, Owned};
use log::debug;
use uuid::Uuid;

/// Devuelve el recurso si existe y pertenece a `actor`; en otro caso
/// `FlowError::NotFound`. El rechazo por propiedad queda en el log a nivel
/// debug.
pub fn authorize<T: Owned>(resource: Option<T>, actor: &Actor, kind: &str, id: &Uuid) -> Result<T> {
    match resource {
        Some(r) if r.is_owned_by(actor) => Ok(r),
        Some(r) => {
            debug!("acceso denegado a {} {}: propietario {} distinto de {}", kind, id, r.owner(), actor.id);
            Err(not_found(kind, id))
        }
        None => Err(not_found(kind, id)),
    }
}

fn not_found(kind: &str, id: &Uuid) -> FlowError {
    FlowError::NotFound(format!("{} {}", kind, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use contract_domain::{DomainStubs, UserId};

    #[test]
    fn foreign_and_missing_look_the_same() {
        let ana = Actor::new(UserId::new(), "Ana");
        let luis = Actor::new(UserId::new(), "Luis");
        let bp = DomainStubs::nda_blueprint(&ana).expect("blueprint");
        let id = bp.id();

        let foreign = authorize(Some(bp.clone()), &luis, "blueprint", &id).unwrap_err();
        let missing = authorize::<contract_domain::Blueprint>(None, &luis, "blueprint", &id).unwrap_err();
        assert_eq!(foreign.to_string(), missing.to_string());
        assert!(foreign.is_not_found());

        assert_eq!(authorize(Some(bp), &ana, "blueprint", &id).expect("owner").id(), id);
    }
}
