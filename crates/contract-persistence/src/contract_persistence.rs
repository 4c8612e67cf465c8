// Archivo: contract_persistence.rs
// Propósito: implementar `ContractRepository` sobre SQLite. Cada escritura
// compara la versión dentro de una transacción inmediata, de modo que el
// cambio de estado y su registro de auditoría se guardan juntos o no se
// guardan.
use crate::schema::{contracts, status_history};
use crate::store::{from_micros, parse_uuid, to_micros, DbConn, DieselRepository, StoreError};
use chrono::{DateTime, Utc};
use contract_domain::{AuditTrail, Contract, ContractParts, DomainError, FieldDefinition, Owned, TransitionRecord, UserId,
                      WorkflowState};
use contract_flow::{ContractRepository, FlowError, PersistResult, Result};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = contracts)]
struct ContractRow {
  pub id: String,
  pub name: String,
  pub blueprint_id: Option<String>,
  pub owner_id: String,
  pub status: String,
  pub fields: String,
  pub schema_hash: String,
  pub version: i64,
  pub created_at_ts: i64,
  pub updated_at_ts: i64,
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = status_history)]
struct HistoryRow {
  pub id: String,
  pub contract_id: String,
  pub seq: i64,
  pub from_status: String,
  pub to_status: String,
  pub actor_id: String,
  pub at_ts: i64,
}

impl HistoryRow {
  fn new(contract_id: &str, seq: i64, record: &TransitionRecord) -> Self {
    Self { id: Uuid::new_v4().to_string(),
           contract_id: contract_id.to_string(),
           seq,
           from_status: record.from.as_str().to_string(),
           to_status: record.to.as_str().to_string(),
           actor_id: record.actor.to_string(),
           at_ts: to_micros(record.at) }
  }

  fn into_record(self) -> std::result::Result<TransitionRecord, StoreError> {
    Ok(TransitionRecord { from: parse_state(&self.from_status)?,
                          to: parse_state(&self.to_status)?,
                          at: from_micros(self.at_ts)?,
                          actor: UserId::from_uuid(parse_uuid(&self.actor_id)?) })
  }
}

fn parse_state(raw: &str) -> std::result::Result<WorkflowState, StoreError> {
  raw.parse::<WorkflowState>().map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn contract_row(c: &Contract) -> std::result::Result<ContractRow, StoreError> {
  Ok(ContractRow { id: c.id().to_string(),
                   name: c.name().to_string(),
                   blueprint_id: c.blueprint_id().map(|b| b.to_string()),
                   owner_id: c.owner().to_string(),
                   status: c.status().as_str().to_string(),
                   fields: serde_json::to_string(c.fields())?,
                   schema_hash: c.schema_hash().to_string(),
                   version: c.version(),
                   created_at_ts: to_micros(c.created_at()),
                   updated_at_ts: to_micros(c.updated_at()) })
}

fn rehydrate(row: ContractRow, history: Vec<HistoryRow>) -> std::result::Result<Contract, StoreError> {
  let records = history.into_iter().map(HistoryRow::into_record).collect::<std::result::Result<Vec<_>, _>>()?;
  let parts = ContractParts { id: parse_uuid(&row.id)?,
                              name: row.name,
                              blueprint_id: row.blueprint_id.as_deref().map(parse_uuid).transpose()?,
                              owner: UserId::from_uuid(parse_uuid(&row.owner_id)?),
                              status: parse_state(&row.status)?,
                              fields: serde_json::from_str(&row.fields)?,
                              status_history: AuditTrail::from_records(records),
                              schema_hash: row.schema_hash,
                              version: row.version,
                              created_at: from_micros(row.created_at_ts)?,
                              updated_at: from_micros(row.updated_at_ts)? };
  Contract::from_parts(parts).map_err(|e| StoreError::Corrupt(format!("contrato {}: {}", row.id, e)))
}

/// Versión actual del contrato, `None` si no existe.
fn current_version(conn: &mut SqliteConnection, id: &str) -> std::result::Result<Option<i64>, DieselError> {
  contracts::table.filter(contracts::id.eq(id))
                  .select(contracts::version)
                  .first::<i64>(conn)
                  .optional()
}

/// Resultado de una escritura dentro de la transacción.
enum Write {
  Done(PersistResult),
  Missing,
  Immutable(WorkflowState),
}

impl DieselRepository {
  fn load_history(conn: &mut DbConn, ids: &[String]) -> std::result::Result<HashMap<String, Vec<HistoryRow>>, StoreError> {
    let rows = status_history::table.filter(status_history::contract_id.eq_any(ids))
                                    .order((status_history::contract_id.asc(), status_history::seq.asc()))
                                    .load::<HistoryRow>(conn)?;
    let mut out: HashMap<String, Vec<HistoryRow>> = HashMap::new();
    for r in rows {
      out.entry(r.contract_id.clone()).or_default().push(r);
    }
    Ok(out)
  }

  fn finish(id: &Uuid, write: std::result::Result<Write, StoreError>) -> Result<PersistResult> {
    match write? {
      Write::Done(result) => Ok(result),
      Write::Missing => Err(FlowError::NotFound(format!("contrato {}", id))),
      Write::Immutable(status) => Err(DomainError::Immutable(status).into()),
    }
  }
}

impl ContractRepository for DieselRepository {
  fn insert_contract(&self, contract: &Contract) -> Result<()> {
    let mut conn = self.conn()?;
    let row = contract_row(contract)?;
    let history: Vec<HistoryRow> = contract.status_history()
                                           .iter()
                                           .enumerate()
                                           .map(|(i, r)| HistoryRow::new(&row.id, i as i64, r))
                                           .collect();
    let inserted = conn.immediate_transaction::<_, DieselError, _>(|conn| {
                         diesel::insert_into(contracts::table).values(&row).execute(conn)?;
                         if !history.is_empty() {
                           diesel::insert_into(status_history::table).values(&history).execute(conn)?;
                         }
                         Ok(())
                       });
    match inserted {
      Ok(()) => Ok(()),
      Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
        Err(FlowError::Conflict(format!("el contrato {} ya existe", contract.id())))
      }
      Err(e) => Err(StoreError::from(e).into()),
    }
  }

  fn get_contract(&self, id: &Uuid) -> Result<Option<Contract>> {
    let mut conn = self.conn()?;
    let id_s = id.to_string();
    let row = contracts::table.filter(contracts::id.eq(&id_s))
                              .first::<ContractRow>(&mut conn)
                              .optional()
                              .map_err(StoreError::from)?;
    match row {
      Some(row) => {
        let mut history = Self::load_history(&mut conn, &[id_s.clone()])?;
        Ok(Some(rehydrate(row, history.remove(&id_s).unwrap_or_default())?))
      }
      None => Ok(None),
    }
  }

  fn list_contracts(&self, owner: &UserId) -> Result<Vec<Contract>> {
    let mut conn = self.conn()?;
    let rows = contracts::table.filter(contracts::owner_id.eq(owner.to_string()))
                               .order(contracts::created_at_ts.desc())
                               .load::<ContractRow>(&mut conn)
                               .map_err(StoreError::from)?;
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let mut history = Self::load_history(&mut conn, &ids)?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
      let h = history.remove(&row.id).unwrap_or_default();
      out.push(rehydrate(row, h)?);
    }
    Ok(out)
  }

  fn commit_transition(&self, id: &Uuid, record: &TransitionRecord, expected_version: i64) -> Result<PersistResult> {
    let mut conn = self.conn()?;
    let id_s = id.to_string();
    let write = conn.immediate_transaction::<_, StoreError, _>(|conn| {
                      let actual = match current_version(conn, &id_s)? {
                        Some(v) => v,
                        None => return Ok(Write::Missing),
                      };
                      if actual != expected_version {
                        return Ok(Write::Done(PersistResult::Conflict { expected: expected_version, actual }));
                      }
                      let new_version = expected_version + 1;
                      let updated = diesel::update(contracts::table.filter(contracts::id.eq(&id_s))
                                                                   .filter(contracts::version.eq(expected_version))
                                                                   .filter(contracts::status.eq(record.from.as_str())))
                                    .set((contracts::status.eq(record.to.as_str()),
                                          contracts::version.eq(new_version),
                                          contracts::updated_at_ts.eq(to_micros(record.at))))
                                    .execute(conn)?;
                      if updated == 0 {
                        // La versión coincide pero el estado no: la fila no corresponde al registro.
                        return Ok(Write::Done(PersistResult::Conflict { expected: expected_version, actual }));
                      }
                      let seq: i64 = status_history::table.filter(status_history::contract_id.eq(&id_s))
                                                          .count()
                                                          .get_result(conn)?;
                      diesel::insert_into(status_history::table).values(&HistoryRow::new(&id_s, seq, record))
                                                                .execute(conn)?;
                      Ok(Write::Done(PersistResult::Ok { new_version }))
                    });
    Self::finish(id, write)
  }

  fn replace_fields(&self,
                    id: &Uuid,
                    fields: &[FieldDefinition],
                    updated_at: DateTime<Utc>,
                    expected_version: i64)
                    -> Result<PersistResult> {
    let mut conn = self.conn()?;
    let id_s = id.to_string();
    let payload = serde_json::to_string(fields).map_err(StoreError::from)?;
    let write = conn.immediate_transaction::<_, StoreError, _>(|conn| {
                      let (actual, status) = match contracts::table.filter(contracts::id.eq(&id_s))
                                                                   .select((contracts::version, contracts::status))
                                                                   .first::<(i64, String)>(conn)
                                                                   .optional()?
                      {
                        Some(found) => found,
                        None => return Ok(Write::Missing),
                      };
                      if actual != expected_version {
                        return Ok(Write::Done(PersistResult::Conflict { expected: expected_version, actual }));
                      }
                      let state = parse_state(&status)?;
                      if state.is_terminal() {
                        return Ok(Write::Immutable(state));
                      }
                      let new_version = expected_version + 1;
                      diesel::update(contracts::table.filter(contracts::id.eq(&id_s)))
                        .set((contracts::fields.eq(&payload),
                              contracts::version.eq(new_version),
                              contracts::updated_at_ts.eq(to_micros(updated_at))))
                        .execute(conn)?;
                      Ok(Write::Done(PersistResult::Ok { new_version }))
                    });
    Self::finish(id, write)
  }
}
