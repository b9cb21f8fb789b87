//! Data-entry forms for the restaurant tables.
//!
//! Each form holds the raw text the operator typed, validates it and turns it
//! into a single `INSERT` whose literals are quoted for the target engine.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::models::DatabaseType;

pub const MEASUREMENT_UNITS: &[&str] = &[
    "Kilogramos",
    "Gramos",
    "Libras",
    "Litros",
    "Mililitros",
    "Unidades",
    "Paquetes",
];

pub const REQUEST_KINDS: &[&str] = &["Petición", "Queja", "Reclamo", "Sugerencia", "Felicitación"];

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// First invalid field of a form
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct FormError {
    pub field: &'static str,
    pub message: String,
}

impl FormError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Quotes `value` as a string literal for `engine`.
///
/// Single quotes are doubled on both engines. MySQL also treats the
/// backslash as an escape character inside literals, so it is doubled there.
/// NUL characters are dropped.
pub fn quote_literal(value: &str, engine: DatabaseType) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        match ch {
            '\'' => quoted.push_str("''"),
            '\\' if engine == DatabaseType::MySQL => quoted.push_str("\\\\"),
            '\0' => {}
            other => quoted.push(other),
        }
    }
    quoted.push('\'');
    quoted
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Int(i64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Literal {
    fn render(&self, engine: DatabaseType) -> String {
        match self {
            Literal::Null => "NULL".to_string(),
            Literal::Int(i) => i.to_string(),
            Literal::Decimal(d) => d.to_string(),
            Literal::Text(s) => quote_literal(s, engine),
            Literal::Date(d) => format!("'{}'", d.format(DATE_FORMAT)),
            Literal::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Column / value pairs for one row of one table
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    table: &'static str,
    values: Vec<(&'static str, Literal)>,
}

impl Insert {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            values: Vec::new(),
        }
    }

    pub fn value(mut self, column: &'static str, literal: Literal) -> Self {
        self.values.push((column, literal));
        self
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn to_sql(&self, engine: DatabaseType) -> String {
        let columns: Vec<&str> = self.values.iter().map(|(column, _)| *column).collect();
        let literals: Vec<String> = self.values.iter().map(|(_, l)| l.render(engine)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            literals.join(", ")
        )
    }
}

pub trait EntityForm: Send + Sync {
    /// Shown once the row is stored
    fn success_message(&self) -> &'static str;

    fn to_insert(&self) -> Result<Insert, FormError>;

    fn insert_sql(&self, engine: DatabaseType) -> Result<String, FormError> {
        Ok(self.to_insert()?.to_sql(engine))
    }
}

fn required(value: &str, field: &'static str, message: &str) -> Result<Literal, FormError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FormError::new(field, message));
    }
    Ok(Literal::Text(trimmed.to_string()))
}

fn optional(value: &str) -> Literal {
    match value.trim() {
        "" => Literal::Null,
        trimmed => Literal::Text(trimmed.to_string()),
    }
}

fn id(value: &str, field: &'static str, message: &str) -> Result<Literal, FormError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FormError::new(field, message));
    }
    match trimmed.parse::<i64>() {
        Ok(id) if id > 0 => Ok(Literal::Int(id)),
        _ => Err(FormError::new(field, format!("{} no es un número válido", trimmed))),
    }
}

fn amount(value: &str, field: &'static str, message: &str) -> Result<Literal, FormError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FormError::new(field, message));
    }
    match trimmed.parse::<Decimal>() {
        Ok(d) if !d.is_sign_negative() => Ok(Literal::Decimal(d)),
        _ => Err(FormError::new(field, format!("{} no es una cantidad válida", trimmed))),
    }
}

fn date(value: &str, field: &'static str) -> Result<NaiveDate, FormError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| FormError::new(field, "Fecha inválida, use AAAA-MM-DD"))
}

fn required_date(value: &str, field: &'static str, message: &str) -> Result<Literal, FormError> {
    if value.trim().is_empty() {
        return Err(FormError::new(field, message));
    }
    date(value, field).map(Literal::Date)
}

fn optional_date(value: &str, field: &'static str) -> Result<Literal, FormError> {
    if value.trim().is_empty() {
        return Ok(Literal::Null);
    }
    date(value, field).map(Literal::Date)
}

fn datetime(value: &str, field: &'static str, message: &str) -> Result<Literal, FormError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FormError::new(field, message));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(Literal::DateTime)
        .ok_or_else(|| FormError::new(field, "Fecha y hora inválidas"))
}

fn one_of(
    value: &str,
    choices: &[&str],
    field: &'static str,
    message: &str,
) -> Result<Literal, FormError> {
    let literal = required(value, field, message)?;
    if choices.contains(&value.trim()) {
        Ok(literal)
    } else {
        Err(FormError::new(field, format!("{} no es una opción válida", value.trim())))
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

fn optional_email(value: &str, field: &'static str) -> Result<Literal, FormError> {
    match optional(value) {
        Literal::Text(email) if !is_email(&email) => Err(FormError::new(field, "Email inválido")),
        literal => Ok(literal),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RestaurantForm {
    pub rut: String,
    pub name: String,
}

impl EntityForm for RestaurantForm {
    fn success_message(&self) -> &'static str {
        "Restaurante creado correctamente"
    }

    fn to_insert(&self) -> Result<Insert, FormError> {
        Ok(Insert::new("Restaurante")
            .value("RUT", required(&self.rut, "rut", "RUT es requerido")?)
            .value("Nombre", required(&self.name, "name", "Nombre es requerido")?))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmployeeForm {
    pub cedula: String,
    pub restaurant_rut: String,
    pub site_id: String,
    pub role_id: String,
    pub area_id: String,
    pub names: String,
    pub phone: String,
    pub email: String,
}

impl EntityForm for EmployeeForm {
    fn success_message(&self) -> &'static str {
        "Empleado registrado correctamente"
    }

    fn to_insert(&self) -> Result<Insert, FormError> {
        Ok(Insert::new("Empleado")
            .value("Cedula", required(&self.cedula, "cedula", "Cédula es requerida")?)
            .value(
                "RUT",
                required(&self.restaurant_rut, "restaurantRut", "RUT del restaurante es requerido")?,
            )
            .value("ID_Sede", id(&self.site_id, "siteId", "Sede es requerida")?)
            .value("ID_Cargo", id(&self.role_id, "roleId", "Cargo es requerido")?)
            .value("ID_Area", id(&self.area_id, "areaId", "Área es requerida")?)
            .value("Nombres", required(&self.names, "names", "Nombres son requeridos")?)
            .value("Numero_Contacto", optional(&self.phone))
            .value("Correo_Corporativo", optional_email(&self.email, "email")?))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngredientForm {
    pub inventory_id: String,
    pub name: String,
    pub description: String,
    pub expires_on: String,
    pub stock: String,
    pub unit: String,
}

impl EntityForm for IngredientForm {
    fn success_message(&self) -> &'static str {
        "Ingrediente agregado correctamente"
    }

    fn to_insert(&self) -> Result<Insert, FormError> {
        Ok(Insert::new("Materias_Primas")
            .value(
                "ID_Inventario_MP",
                id(&self.inventory_id, "inventoryId", "Inventario es requerido")?,
            )
            .value("Nombre_Ingrediente", required(&self.name, "name", "Nombre es requerido")?)
            .value("Descripcion", optional(&self.description))
            .value("Fecha_Caducidad", optional_date(&self.expires_on, "expiresOn")?)
            .value("Cantidad_Stock", amount(&self.stock, "stock", "Cantidad es requerida")?)
            .value(
                "Unidad_Medida",
                one_of(&self.unit, MEASUREMENT_UNITS, "unit", "Unidad de medida es requerida")?,
            ))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DishForm {
    pub name: String,
    pub description: String,
    pub price: String,
}

impl EntityForm for DishForm {
    fn success_message(&self) -> &'static str {
        "Plato agregado correctamente"
    }

    fn to_insert(&self) -> Result<Insert, FormError> {
        Ok(Insert::new("Plato")
            .value("Nombre_Plato", required(&self.name, "name", "Nombre es requerido")?)
            .value("Descripcion", optional(&self.description))
            .value("Precio", amount(&self.price, "price", "Precio es requerido")?))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteForm {
    pub name: String,
    pub address: String,
}

impl EntityForm for SiteForm {
    fn success_message(&self) -> &'static str {
        "Sede creada correctamente"
    }

    fn to_insert(&self) -> Result<Insert, FormError> {
        Ok(Insert::new("Sede")
            .value("Nombre_Sede", required(&self.name, "name", "Nombre de sede es requerido")?)
            .value("Direccion", required(&self.address, "address", "Dirección es requerida")?))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AreaForm {
    pub name: String,
}

impl EntityForm for AreaForm {
    fn success_message(&self) -> &'static str {
        "Área creada correctamente"
    }

    fn to_insert(&self) -> Result<Insert, FormError> {
        Ok(Insert::new("Area")
            .value("Nombre_Area", required(&self.name, "name", "Nombre del área es requerido")?))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleForm {
    pub name: String,
    pub base_salary: String,
}

impl EntityForm for RoleForm {
    fn success_message(&self) -> &'static str {
        "Cargo creado correctamente"
    }

    fn to_insert(&self) -> Result<Insert, FormError> {
        Ok(Insert::new("Cargo")
            .value("Nombre_Cargo", required(&self.name, "name", "Nombre del cargo es requerido")?)
            .value(
                "Salario_Base",
                amount(&self.base_salary, "baseSalary", "Salario base es requerido")?,
            ))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpaceForm {
    pub site_id: String,
    pub capacity: String,
}

impl EntityForm for SpaceForm {
    fn success_message(&self) -> &'static str {
        "Espacio creado correctamente"
    }

    fn to_insert(&self) -> Result<Insert, FormError> {
        Ok(Insert::new("Espacio")
            .value("ID_Sede", id(&self.site_id, "siteId", "Sede es requerida")?)
            .value(
                "Capacidad_Maxima",
                id(&self.capacity, "capacity", "Capacidad máxima es requerida")?,
            ))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableForm {
    pub space_id: String,
    pub number: String,
}

impl EntityForm for TableForm {
    fn success_message(&self) -> &'static str {
        "Mesa creada correctamente"
    }

    fn to_insert(&self) -> Result<Insert, FormError> {
        Ok(Insert::new("Mesa")
            .value("ID_Espacio", id(&self.space_id, "spaceId", "Espacio es requerido")?)
            .value("Numero_Mesa", id(&self.number, "number", "Número de mesa es requerido")?))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderForm {
    pub table_id: String,
    /// Cedula of the serving employee
    pub employee_id: String,
    pub placed_at: String,
}

impl EntityForm for OrderForm {
    fn success_message(&self) -> &'static str {
        "Orden creada correctamente"
    }

    fn to_insert(&self) -> Result<Insert, FormError> {
        Ok(Insert::new("Orden")
            .value("ID_Mesa", id(&self.table_id, "tableId", "Mesa es requerida")?)
            .value(
                "ID_Empleado",
                required(&self.employee_id, "employeeId", "Empleado es requerido")?,
            )
            .value(
                "Fecha_Hora",
                datetime(&self.placed_at, "placedAt", "Fecha y hora son requeridas")?,
            ))
    }
}

/// Petition, complaint, claim or suggestion (PQRS) filed with a restaurant
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestForm {
    pub restaurant_rut: String,
    pub kind: String,
    pub description: String,
    pub date: String,
}

impl EntityForm for RequestForm {
    fn success_message(&self) -> &'static str {
        "PQRS registrada correctamente"
    }

    fn to_insert(&self) -> Result<Insert, FormError> {
        Ok(Insert::new("PQRS")
            .value(
                "RUT",
                required(&self.restaurant_rut, "restaurantRut", "RUT del restaurante es requerido")?,
            )
            .value(
                "Tipo_Solicitud",
                one_of(&self.kind, REQUEST_KINDS, "kind", "Tipo de solicitud es requerido")?,
            )
            .value(
                "Descripcion",
                required(&self.description, "description", "Descripción es requerida")?,
            )
            .value("Fecha", required_date(&self.date, "date", "Fecha es requerida")?))
    }
}
