// field.rs
use crate::DomainError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Tipos de campo soportados por blueprints y contratos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum FieldKind {
  Text,
  Date,
  Signature,
  Checkbox,
}

impl FieldKind {
  pub const ALL: [FieldKind; 4] = [FieldKind::Text, FieldKind::Date, FieldKind::Signature, FieldKind::Checkbox];

  pub fn as_str(&self) -> &'static str {
    match self {
      FieldKind::Text => "text",
      FieldKind::Date => "date",
      FieldKind::Signature => "signature",
      FieldKind::Checkbox => "checkbox",
    }
  }
}

impl fmt::Display for FieldKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for FieldKind {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "text" => Ok(FieldKind::Text),
      "date" => Ok(FieldKind::Date),
      "signature" => Ok(FieldKind::Signature),
      "checkbox" => Ok(FieldKind::Checkbox),
      other => Err(DomainError::ValidationError(format!("Tipo de campo desconocido: '{}'", other))),
    }
  }
}

impl TryFrom<String> for FieldKind {
  type Error = DomainError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

/// Valor tipado de un campo. La variante determina el `FieldKind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
  Text(String),
  /// Fecha ISO-8601 (`AAAA-MM-DD`) o vacío.
  Date(String),
  /// Nombre del firmante; vacío significa "sin firmar".
  Signature(String),
  Checkbox(bool),
}

impl FieldValue {
  /// Valor vacío por defecto para el tipo dado.
  pub fn empty(kind: FieldKind) -> Self {
    match kind {
      FieldKind::Text => FieldValue::Text(String::new()),
      FieldKind::Date => FieldValue::Date(String::new()),
      FieldKind::Signature => FieldValue::Signature(String::new()),
      FieldKind::Checkbox => FieldValue::Checkbox(false),
    }
  }

  pub fn kind(&self) -> FieldKind {
    match self {
      FieldValue::Text(_) => FieldKind::Text,
      FieldValue::Date(_) => FieldKind::Date,
      FieldValue::Signature(_) => FieldKind::Signature,
      FieldValue::Checkbox(_) => FieldKind::Checkbox,
    }
  }

  /// Convierte un valor JSON sin tipo en un `FieldValue` del tipo `kind`.
  ///
  /// `null` se interpreta como "sin valor" y produce el vacío del tipo. No
  /// hay coerción: un checkbox sólo acepta booleanos y los tipos de texto
  /// sólo aceptan strings.
  pub fn from_json(kind: FieldKind, value: &JsonValue) -> Result<Self, DomainError> {
    let parsed = match (kind, value) {
      (_, JsonValue::Null) => FieldValue::empty(kind),
      (FieldKind::Text, JsonValue::String(s)) => FieldValue::Text(s.clone()),
      (FieldKind::Date, JsonValue::String(s)) => FieldValue::Date(s.clone()),
      (FieldKind::Signature, JsonValue::String(s)) => FieldValue::Signature(s.clone()),
      (FieldKind::Checkbox, JsonValue::Bool(b)) => FieldValue::Checkbox(*b),
      (k, other) => {
        return Err(DomainError::ValidationError(format!("Valor {} no válido para un campo de tipo {}", other, k)));
      }
    };
    parsed.validate()?;
    Ok(parsed)
  }

  pub fn to_json(&self) -> JsonValue {
    match self {
      FieldValue::Text(s) | FieldValue::Date(s) | FieldValue::Signature(s) => JsonValue::String(s.clone()),
      FieldValue::Checkbox(b) => JsonValue::Bool(*b),
    }
  }

  /// Comprueba las reglas propias del tipo (hoy sólo el formato de fecha).
  pub fn validate(&self) -> Result<(), DomainError> {
    match self {
      FieldValue::Date(s) => validate_iso_date(s),
      _ => Ok(()),
    }
  }

  pub fn is_empty(&self) -> bool {
    match self {
      FieldValue::Text(s) | FieldValue::Date(s) | FieldValue::Signature(s) => s.is_empty(),
      FieldValue::Checkbox(b) => !*b,
    }
  }

  /// Nombre del firmante si es una firma no vacía.
  pub fn signer(&self) -> Option<&str> {
    match self {
      FieldValue::Signature(s) if !s.is_empty() => Some(s.as_str()),
      _ => None,
    }
  }
}

impl fmt::Display for FieldValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FieldValue::Text(s) | FieldValue::Date(s) | FieldValue::Signature(s) => write!(f, "{}", s),
      FieldValue::Checkbox(b) => write!(f, "{}", if *b { "[x]" } else { "[ ]" }),
    }
  }
}

fn validate_iso_date(s: &str) -> Result<(), DomainError> {
  if s.is_empty() {
    return Ok(());
  }
  let bytes = s.as_bytes();
  let shape_ok = bytes.len() == 10
                 && bytes[4] == b'-'
                 && bytes[7] == b'-'
                 && bytes.iter().enumerate().all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
  if !shape_ok || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_err() {
    return Err(DomainError::ValidationError(format!("Fecha '{}' no es una fecha ISO-8601 (AAAA-MM-DD)", s)));
  }
  Ok(())
}

/// Posición del campo sobre el documento (sólo informativa para la UI).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
  #[serde(default)]
  pub x: f64,
  #[serde(default)]
  pub y: f64,
}

/// Campo tipado y etiquetado de un blueprint o contrato.
///
/// Invariante: `value.kind() == kind`. Se comprueba al construir, al
/// deserializar y en cada escritura.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawField", into = "RawField")]
pub struct FieldDefinition {
  id: String,
  kind: FieldKind,
  label: String,
  position: Position,
  value: FieldValue,
}

impl FieldDefinition {
  pub fn new(id: impl Into<String>, kind: FieldKind, label: impl Into<String>) -> Result<Self, DomainError> {
    let id = id.into();
    let label = label.into();
    if id.trim().is_empty() {
      return Err(DomainError::ValidationError("El id del campo no puede estar vacío".to_string()));
    }
    if label.trim().is_empty() {
      return Err(DomainError::ValidationError(format!("El campo '{}' no tiene etiqueta", id)));
    }
    Ok(Self { id, kind, label, position: Position::default(), value: FieldValue::empty(kind) })
  }

  pub fn with_position(mut self, position: Position) -> Self {
    self.position = position;
    self
  }

  pub fn with_value(mut self, value: FieldValue) -> Result<Self, DomainError> {
    self.set_value(value)?;
    Ok(self)
  }

  pub fn with_json_value(self, value: &JsonValue) -> Result<Self, DomainError> {
    let parsed = FieldValue::from_json(self.kind, value)?;
    self.with_value(parsed)
  }

  pub fn set_value(&mut self, value: FieldValue) -> Result<(), DomainError> {
    if value.kind() != self.kind {
      return Err(DomainError::ValidationError(format!("El campo '{}' es de tipo {} y no acepta un valor {}",
                                                      self.id,
                                                      self.kind,
                                                      value.kind())));
    }
    value.validate()?;
    self.value = value;
    Ok(())
  }

  /// Copia del campo con el valor reiniciado al vacío de su tipo.
  pub fn cleared(&self) -> Self {
    let mut copy = self.clone();
    copy.value = FieldValue::empty(self.kind);
    copy
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn kind(&self) -> FieldKind {
    self.kind
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn position(&self) -> Position {
    self.position
  }

  pub fn value(&self) -> &FieldValue {
    &self.value
  }
}

impl fmt::Display for FieldDefinition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({}, {}): {}", self.label, self.id, self.kind, self.value)
  }
}

/// Forma serializada de `FieldDefinition`: el valor viaja como JSON plano.
#[derive(Serialize, Deserialize)]
struct RawField {
  id: String,
  #[serde(alias = "type")]
  kind: FieldKind,
  label: String,
  #[serde(default)]
  position: Position,
  #[serde(default)]
  value: JsonValue,
}

impl TryFrom<RawField> for FieldDefinition {
  type Error = DomainError;

  fn try_from(raw: RawField) -> Result<Self, Self::Error> {
    FieldDefinition::new(raw.id, raw.kind, raw.label)?.with_position(raw.position)
                                                      .with_json_value(&raw.value)
  }
}

impl From<FieldDefinition> for RawField {
  fn from(f: FieldDefinition) -> Self {
    RawField { value: f.value.to_json(), id: f.id, kind: f.kind, label: f.label, position: f.position }
  }
}

/// Entrada sin tipar de un campo tal como llega desde la capa de
/// presentación. El `kind` es un string libre y se valida al crear el
/// blueprint, no en cada escritura de valores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldInput {
  #[serde(default)]
  pub id: Option<String>,
  #[serde(alias = "type")]
  pub kind: String,
  #[serde(default)]
  pub label: String,
  #[serde(default)]
  pub position: Option<Position>,
  #[serde(default)]
  pub value: Option<JsonValue>,
}

impl FieldInput {
  pub fn new(kind: impl Into<String>, label: impl Into<String>) -> Self {
    Self { kind: kind.into(), label: label.into(), ..Default::default() }
  }

  pub fn with_id(mut self, id: impl Into<String>) -> Self {
    self.id = Some(id.into());
    self
  }

  pub fn with_value(mut self, value: JsonValue) -> Self {
    self.value = Some(value);
    self
  }

  /// Valida y convierte la entrada. Si no trae id se genera uno.
  pub fn into_definition(self) -> Result<FieldDefinition, DomainError> {
    let kind: FieldKind = self.kind.parse()?;
    let id = match self.id {
      Some(id) if !id.trim().is_empty() => id,
      _ => Uuid::new_v4().simple().to_string(),
    };
    let field = FieldDefinition::new(id, kind, self.label)?.with_position(self.position.unwrap_or_default());
    match self.value {
      Some(v) => field.with_json_value(&v),
      None => Ok(field),
    }
  }
}
