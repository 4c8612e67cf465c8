use contract_domain::{Actor, BlueprintRepository, FieldInput, FieldKind, InMemoryBlueprintRepository, TransitionAction};
use contract_flow::{ContractRepository, ContractService, Credentials, EngineConfig, InMemoryContractRepository,
                    InMemoryIdentityProvider};
use log::info;
use serde_json::{json, Value as JsonValue};
use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;
use uuid::Uuid;

/// Menú interactivo para gestionar blueprints y contratos.
///
/// Usa SQLite cuando `CONTRACTS_DB_URL` (o `DATABASE_URL`) está definida y
/// repositorios en memoria en caso contrario. Los usuarios viven siempre en
/// memoria durante la sesión.
fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
                             .init();

    let config = EngineConfig::from_env();
    let (templates, contracts): (Arc<dyn BlueprintRepository>, Arc<dyn ContractRepository>) =
        match contract_persistence::database_url_from_env() {
            Some(url) => {
                let repo = Arc::new(contract_persistence::DieselRepository::new(&url)?);
                info!("usando SQLite en {}", url);
                let templates: Arc<dyn BlueprintRepository> = repo.clone();
                let contracts: Arc<dyn ContractRepository> = repo;
                (templates, contracts)
            }
            None => {
                info!("sin base de datos configurada; repositorios en memoria");
                let templates: Arc<dyn BlueprintRepository> = Arc::new(InMemoryBlueprintRepository::new());
                let contracts: Arc<dyn ContractRepository> = Arc::new(InMemoryContractRepository::new());
                (templates, contracts)
            }
        };
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let service = ContractService::new(identity.clone(), templates, contracts, config);

    let actor = match sign_in(&identity, &service)? {
        Some(a) => a,
        None => return Ok(()),
    };
    println!("Hola, {}", actor.name);

    loop {
        println!("\n== Contratos ==");
        println!("1) Ver contratos");
        println!("2) Ver blueprints");
        println!("3) Crear blueprint");
        println!("4) Eliminar blueprint");
        println!("5) Crear contrato desde un blueprint");
        println!("6) Editar valores de un contrato");
        println!("7) Cambiar estado de un contrato");
        println!("8) Ver historial de un contrato");
        println!("9) Salir");
        let choice = prompt("Elige una opción: ")?;
        match choice.trim() {
            "1" => match (service.list_contracts(&actor), service.status_counts(&actor)) {
                (Ok(rows), Ok(counts)) => {
                    println!("\nTotal {} | activos {} | pendientes de firma {} | completados {} | revocados {}",
                             counts.total, counts.active, counts.pending_signature, counts.completed, counts.revoked);
                    println!("ID                                   | ESTADO   | BLUEPRINT            | NOMBRE");
                    println!("-----------------------------------------------------------------------------------");
                    for r in rows {
                        let bp = r.blueprint_name.unwrap_or_else(|| "-".into());
                        println!("{} | {:<8} | {:<20} | {}", r.id, r.status.as_str(), bp, r.name);
                    }
                }
                (Err(e), _) | (_, Err(e)) => eprintln!("Error listando contratos: {}", e),
            },
            "2" => match service.list_blueprints(&actor) {
                Ok(list) => {
                    for b in list {
                        println!("{} | {} | {} campos", b.id(), b.name(), b.len());
                        for f in b.fields() {
                            println!("    - {} [{}] {}", f.id(), f.kind(), f.label());
                        }
                    }
                }
                Err(e) => eprintln!("Error listando blueprints: {}", e),
            },
            "3" => {
                let name = prompt("Nombre del blueprint: ")?;
                let mut fields = Vec::new();
                loop {
                    let kind = prompt("Tipo de campo (text/date/signature/checkbox, enter para terminar): ")?;
                    if kind.trim().is_empty() {
                        break;
                    }
                    let label = prompt("Etiqueta: ")?;
                    fields.push(FieldInput::new(kind.trim(), label.trim()));
                }
                match service.create_blueprint(name.trim(), fields, &actor) {
                    Ok(b) => println!("Blueprint creado: {}", b.id()),
                    Err(e) => eprintln!("Error creando blueprint: {}", e),
                }
            }
            "4" => {
                let id = match read_uuid("Blueprint id a eliminar (UUID): ")? {
                    Some(u) => u,
                    None => continue,
                };
                let confirm = prompt(&format!("Confirma borrado de {}? escribir 'yes' para confirmar: ", id))?;
                if confirm.trim().to_lowercase() == "yes" {
                    match service.delete_blueprint(&id, &actor) {
                        Ok(()) => println!("Blueprint eliminado: {}", id),
                        Err(e) => eprintln!("Error eliminando blueprint: {}", e),
                    }
                } else {
                    println!("Borrado cancelado");
                }
            }
            "5" => {
                let bp = match read_uuid("Blueprint id (UUID): ")? {
                    Some(u) => u,
                    None => continue,
                };
                let name = prompt("Nombre del contrato: ")?;
                match service.instantiate(&bp, name.trim(), &actor) {
                    Ok(c) => println!("Contrato creado: {}", c.id()),
                    Err(e) => eprintln!("Error creando contrato: {}", e),
                }
            }
            "6" => {
                let id = match read_uuid("Contrato id (UUID): ")? {
                    Some(u) => u,
                    None => continue,
                };
                let contract = match service.get_contract(&id, &actor) {
                    Ok(c) => c,
                    Err(e) => { eprintln!("Error: {}", e); continue; }
                };
                if !contract.is_editable() {
                    eprintln!("El contrato está en {} y no admite cambios", contract.status());
                    continue;
                }
                let mut values: Vec<(String, JsonValue)> = Vec::new();
                for f in contract.fields() {
                    let raw = prompt(&format!("{} [{}] ({}), enter para mantener: ", f.label(), f.kind(), f.value()))?;
                    if !raw.trim().is_empty() {
                        values.push((f.id().to_string(), input_to_json(f.kind(), raw.trim())));
                    }
                }
                match service.set_field_values(&id, &values, &actor) {
                    Ok(c) => println!("Guardado (versión {})", c.version()),
                    Err(e) => eprintln!("Error guardando campos: {}", e),
                }
            }
            "7" => {
                let id = match read_uuid("Contrato id (UUID): ")? {
                    Some(u) => u,
                    None => continue,
                };
                let contract = match service.get_contract(&id, &actor) {
                    Ok(c) => c,
                    Err(e) => { eprintln!("Error: {}", e); continue; }
                };
                let next: Vec<String> = contract.status()
                                                .next_states()
                                                .iter()
                                                .filter_map(|to| contract.status().action_to(*to))
                                                .map(|a| a.to_string())
                                                .collect();
                if next.is_empty() {
                    println!("{} es un estado final", contract.status());
                    continue;
                }
                let raw = prompt(&format!("Estado actual {}. Acción ({}): ", contract.status(), next.join("/")))?;
                let action: TransitionAction = match raw.parse() {
                    Ok(a) => a,
                    Err(e) => { eprintln!("{}", e); continue; }
                };
                match service.transition_by_action(&id, action, &actor) {
                    Ok(c) => println!("Nuevo estado: {}", c.status()),
                    Err(e) => eprintln!("Error [{}]: {}", e.status_code(), e),
                }
            }
            "8" => {
                let id = match read_uuid("Contrato id (UUID): ")? {
                    Some(u) => u,
                    None => continue,
                };
                match service.history(&id, &actor) {
                    Ok(h) if h.is_empty() => println!("Sin transiciones"),
                    Ok(h) => {
                        for r in h {
                            println!("{} | {} -> {} | {}", r.at, r.from, r.to, r.actor);
                        }
                    }
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            "9" => {
                println!("Saliendo...");
                break;
            }
            other => {
                println!("Opción inválida: {}", other);
            }
        }
    }

    Ok(())
}

/// Registro o inicio de sesión. `None` si el usuario decide salir.
fn sign_in(identity: &InMemoryIdentityProvider, service: &ContractService) -> Result<Option<Actor>, Box<dyn Error>> {
    loop {
        println!("\n1) Registrarse\n2) Iniciar sesión\n3) Salir");
        let choice = prompt("Elige una opción: ")?;
        match choice.trim() {
            "1" => {
                let name = prompt("Nombre: ")?;
                let email = prompt("Email: ")?;
                let secret = prompt("Contraseña: ")?;
                match identity.register(name.trim(), email.trim(), secret.trim()) {
                    Ok(a) => println!("Usuario registrado: {}", a),
                    Err(e) => eprintln!("Error registrando: {}", e),
                }
            }
            "2" => {
                let email = prompt("Email: ")?;
                let secret = prompt("Contraseña: ")?;
                match service.login(&Credentials::new(email.trim(), secret.trim())) {
                    Ok(session) => return Ok(Some(service.resolve(&session.token)?)),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            "3" => return Ok(None),
            other => println!("Opción inválida: {}", other),
        }
    }
}

/// Las casillas aceptan s/n además de true/false; el resto se envía como
/// texto y lo valida el motor.
fn input_to_json(kind: FieldKind, raw: &str) -> JsonValue {
    match (kind, raw.to_lowercase().as_str()) {
        (FieldKind::Checkbox, "s" | "si" | "sí" | "true" | "1") => json!(true),
        (FieldKind::Checkbox, "n" | "no" | "false" | "0") => json!(false),
        _ => json!(raw),
    }
}

fn read_uuid(msg: &str) -> io::Result<Option<Uuid>> {
    let raw = prompt(msg)?;
    match Uuid::parse_str(raw.trim()) {
        Ok(u) => Ok(Some(u)),
        Err(_) => {
            eprintln!("UUID inválido");
            Ok(None)
        }
    }
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s)
}
