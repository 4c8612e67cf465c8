use crate::domain_repository::{BlueprintRepository, InMemoryBlueprintRepository};
use crate::{Actor, Blueprint, DomainError, FieldInput};
use serde_json::json;

pub struct DomainStubs;

impl DomainStubs {
    /// Campos de ejemplo de un acuerdo de confidencialidad.
    pub fn nda_fields() -> Vec<FieldInput> {
        vec![FieldInput::new("text", "Parte reveladora").with_id("disclosing_party"),
             FieldInput::new("text", "Parte receptora").with_id("receiving_party"),
             FieldInput::new("date", "Fecha de inicio").with_id("start_date"),
             FieldInput::new("checkbox", "Incluye no competencia").with_id("non_compete").with_value(json!(false)),
             FieldInput::new("signature", "Firma").with_id("signature")]
    }

    /// Blueprint de ejemplo propiedad de `owner`.
    pub fn nda_blueprint(owner: &Actor) -> Result<Blueprint, DomainError> {
        Blueprint::from_inputs("Acuerdo de confidencialidad", Self::nda_fields(), owner)
    }

    /// Repositorio en memoria pre-poblado con dos blueprints de `owner`.
    pub fn sample_repo(owner: &Actor) -> Result<InMemoryBlueprintRepository, DomainError> {
        let repo = InMemoryBlueprintRepository::new();
        repo.save_blueprint(Self::nda_blueprint(owner)?)?;
        let services = Blueprint::from_inputs("Contrato de servicios",
                                              vec![FieldInput::new("text", "Cliente").with_id("client"),
                                                   FieldInput::new("date", "Vigencia").with_id("valid_until"),
                                                   FieldInput::new("signature", "Firma del cliente").with_id("client_sig")],
                                              owner)?;
        repo.save_blueprint(services)?;
        Ok(repo)
    }
}
