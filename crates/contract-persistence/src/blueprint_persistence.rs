use crate::schema::blueprints;
use crate::schema::blueprints::dsl;
use crate::store::{from_micros, parse_uuid, to_micros, DieselRepository, StoreError};
use contract_domain::{Blueprint, BlueprintRepository, DomainError, FieldDefinition, Owned, UserId};
use diesel::prelude::*;
use uuid::Uuid;

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = blueprints)]
struct BlueprintRow {
  pub id: String,
  pub name: String,
  pub owner_id: String,
  pub fields: String,
  pub schema_hash: String,
  pub created_at_ts: i64,
}

impl BlueprintRow {
  fn from_blueprint(b: &Blueprint) -> Result<Self, StoreError> {
    Ok(Self { id: b.id().to_string(),
              name: b.name().to_string(),
              owner_id: b.owner().to_string(),
              fields: serde_json::to_string(b.fields())?,
              schema_hash: b.schema_hash().to_string(),
              created_at_ts: to_micros(b.created_at()) })
  }

  fn into_blueprint(self) -> Result<Blueprint, DomainError> {
    let fields: Vec<FieldDefinition> = serde_json::from_str(&self.fields).map_err(StoreError::from)?;
    let owner = UserId::from_uuid(parse_uuid(&self.owner_id)?);
    let blueprint =
      Blueprint::restore(parse_uuid(&self.id)?, &self.name, fields, owner, from_micros(self.created_at_ts)?)?;
    if blueprint.schema_hash() != self.schema_hash {
      return Err(StoreError::Corrupt(format!("huella de esquema distinta en blueprint {}", self.id)).into());
    }
    Ok(blueprint)
  }
}

impl BlueprintRepository for DieselRepository {
  fn save_blueprint(&self, blueprint: Blueprint) -> Result<Uuid, DomainError> {
    let mut conn = self.conn()?;
    let row = BlueprintRow::from_blueprint(&blueprint)?;
    diesel::replace_into(dsl::blueprints).values(&row)
                                          .execute(&mut conn)
                                          .map_err(StoreError::from)?;
    Ok(blueprint.id())
  }

  fn get_blueprint(&self, id: &Uuid) -> Result<Option<Blueprint>, DomainError> {
    let mut conn = self.conn()?;
    let row = dsl::blueprints.filter(dsl::id.eq(id.to_string()))
                             .first::<BlueprintRow>(&mut conn)
                             .optional()
                             .map_err(StoreError::from)?;
    row.map(BlueprintRow::into_blueprint).transpose()
  }

  fn list_blueprints(&self, owner: &UserId) -> Result<Vec<Blueprint>, DomainError> {
    let mut conn = self.conn()?;
    let rows = dsl::blueprints.filter(dsl::owner_id.eq(owner.to_string()))
                              .order(dsl::created_at_ts.desc())
                              .load::<BlueprintRow>(&mut conn)
                              .map_err(StoreError::from)?;
    rows.into_iter().map(BlueprintRow::into_blueprint).collect()
  }

  fn delete_blueprint(&self, id: &Uuid, owner: &UserId) -> Result<bool, DomainError> {
    let mut conn = self.conn()?;
    let deleted = diesel::delete(dsl::blueprints.filter(dsl::id.eq(id.to_string()))
                                                .filter(dsl::owner_id.eq(owner.to_string())))
                  .execute(&mut conn)
                  .map_err(StoreError::from)?;
    Ok(deleted > 0)
  }
}
