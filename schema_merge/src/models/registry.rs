//! Model registry for schema_merge
//!
//! Structs deriving [`SchemaModel`](crate::SchemaModel) describe tables; the registry
//! collects their definitions and turns them into a source [`Schema`].

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::schema::analyzer::SchemaInspector;
use crate::schema::sqlserver::DEFAULT_SCHEMA;
use crate::schema::types::{Column, ForeignKey, Index, IndexType, Schema, Table};
use crate::utils::naming::{
    get_foreign_key_name, get_index_name, get_primary_key_name, get_unique_constraint_name,
};

/// A struct that describes a table
pub trait SchemaModel {
    fn definition() -> ModelDefinition;
}

/// Table-level description produced by `#[derive(SchemaModel)]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDefinition {
    /// Rust struct name
    pub model_name: String,
    pub schema: String,
    pub table: String,
    pub fields: Vec<FieldDefinition>,
}

impl ModelDefinition {
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            schema: DEFAULT_SCHEMA.to_string(),
            table: model_name.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Schema-qualified table name
    pub fn table_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// The explicit identity field, or else a field named `id`
    pub fn identity_field(&self) -> Option<&FieldDefinition> {
        self.fields
            .iter()
            .find(|field| field.identity)
            .or_else(|| self.fields.iter().find(|field| field.name.eq_ignore_ascii_case("id")))
    }

    fn matches(&self, name: &str) -> bool {
        self.model_name.eq_ignore_ascii_case(name)
            || self.table.eq_ignore_ascii_case(name)
            || self.table_name().eq_ignore_ascii_case(name)
    }
}

/// Column-level description of one struct field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: String,
    /// Field type with any `Option<..>` wrapper removed
    pub rust_type: String,
    /// Explicit SQL type, overriding the mapping
    pub db_type: Option<String>,
    pub max_length: Option<u32>,
    pub nullable: bool,
    pub identity: bool,
    /// Member of the model's unique key
    pub key: bool,
    /// Computed column expression
    pub calculated: Option<String>,
    /// `Model`, `table.column` or `schema.table.column`
    pub references: Option<String>,
    pub cascade_delete: bool,
    pub cascade_update: bool,
}

impl FieldDefinition {
    pub fn new(name: &str, rust_type: &str) -> Self {
        Self {
            name: name.to_string(),
            rust_type: rust_type.to_string(),
            ..Default::default()
        }
    }
}

/// Registry for schema models
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelDefinition>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a derived model
    pub fn register<T: SchemaModel>(&mut self) -> &mut Self {
        self.register_definition(T::definition())
    }

    /// Register a definition; a later definition with the same model name replaces the earlier
    pub fn register_definition(&mut self, definition: ModelDefinition) -> &mut Self {
        tracing::debug!(model = %definition.model_name, table = %definition.table_name(), "Registered model");
        self.models.insert(definition.model_name.clone(), definition);
        self
    }

    pub fn get_model(&self, name: &str) -> Option<&ModelDefinition> {
        self.models.get(name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Convert registered models to a schema
    pub fn to_schema(&self) -> Result<Schema> {
        let mut schema = Schema::new();

        for model in self.models.values() {
            let table_name = model.table_name();
            let identity = model.identity_field().map(|field| field.name.clone());
            let mut table = Table::new(&table_name);
            let mut position = 1;

            for field in &model.fields {
                let data_type = match &field.db_type {
                    Some(db_type) => db_type.clone(),
                    None => map_type_to_db_type(&field.rust_type, field.max_length)?,
                };
                let is_identity = identity.as_deref() == Some(field.name.as_str());

                let mut column = Column::new(&field.name, &data_type)
                    .nullable(field.nullable && !is_identity);
                if is_identity {
                    column = column.position(0);
                } else {
                    column = column.position(position);
                    position += 1;
                }
                if let Some(expression) = &field.calculated {
                    column = column.calculated(expression);
                }
                table.add_column(column);
            }

            if let Some(identity) = &identity {
                let pk_name = get_primary_key_name(&table_name);
                let mut pk = Index::new(&pk_name, IndexType::PrimaryKey, &[identity.as_str()]);
                pk.is_clustered = true;
                table.add_index(pk);
                table.clustered_index_name = Some(pk_name);
                table = table.identity(identity);
            }

            let key_fields: Vec<String> = model
                .fields
                .iter()
                .filter(|field| field.key)
                .map(|field| field.name.clone())
                .collect();
            if !key_fields.is_empty() {
                let columns: Vec<&str> = key_fields.iter().map(String::as_str).collect();
                table.add_index(Index::new(
                    &get_unique_constraint_name(&table_name, &key_fields),
                    IndexType::UniqueConstraint,
                    &columns,
                ));
            }

            for field in &model.fields {
                let reference = match &field.references {
                    Some(reference) => reference,
                    None => continue,
                };
                let (referenced_table, referenced_column) = self.resolve_reference(reference)?;

                table.add_index(Index::new(
                    &get_index_name(&table_name, &field.name),
                    IndexType::NonUnique,
                    &[field.name.as_str()],
                ));
                schema.add_foreign_key(
                    ForeignKey::new(
                        &get_foreign_key_name(&table_name, &field.name),
                        &table_name,
                        &referenced_table,
                    )
                    .with_column(&field.name, &referenced_column)
                    .cascade_delete(field.cascade_delete)
                    .cascade_update(field.cascade_update),
                );
            }

            schema.add_table(table);
        }

        schema.link_parents();
        tracing::info!(
            tables = schema.tables.len(),
            foreign_keys = schema.foreign_keys.len(),
            "Built schema from models"
        );
        Ok(schema)
    }

    /// Resolve a reference to a (table, column) pair
    fn resolve_reference(&self, reference: &str) -> Result<(String, String)> {
        let segments: Vec<&str> = reference.split('.').map(str::trim).collect();

        match segments.as_slice() {
            [model_name] => {
                let model = self
                    .models
                    .values()
                    .find(|model| model.matches(model_name))
                    .ok_or_else(|| {
                        Error::ModelRegistrationError(format!(
                            "Referenced model '{}' is not registered",
                            reference
                        ))
                    })?;
                let identity = model.identity_field().ok_or_else(|| {
                    Error::ModelRegistrationError(format!(
                        "Referenced model '{}' has no identity column",
                        model.model_name
                    ))
                })?;
                Ok((model.table_name(), identity.name.clone()))
            }
            [table @ .., column] if !table.is_empty() => {
                let table = table.join(".");
                let table = self
                    .models
                    .values()
                    .find(|model| model.matches(&table))
                    .map(ModelDefinition::table_name)
                    .unwrap_or(table);
                Ok((table, column.to_string()))
            }
            _ => Err(Error::ModelRegistrationError(format!(
                "Invalid reference '{}'",
                reference
            ))),
        }
    }
}

#[async_trait]
impl SchemaInspector for ModelRegistry {
    async fn get_schema(&mut self) -> Result<Schema> {
        self.to_schema()
    }
}

/// Map a Rust type to a SQL Server type
///
/// Only the last path segment matters, so `chrono::NaiveDate` and `NaiveDate` map alike.
pub fn map_type_to_db_type(rust_type: &str, max_length: Option<u32>) -> Result<String> {
    let compact: String = rust_type.chars().filter(|c| !c.is_whitespace()).collect();
    let sized = |base: &str| match max_length {
        Some(length) => format!("{}({})", base, length),
        None => format!("{}(max)", base),
    };

    if compact.ends_with("Vec<u8>") {
        return Ok(sized("varbinary"));
    }

    let base = compact.split('<').next().unwrap_or(&compact);
    let last = base.rsplit("::").next().unwrap_or(base);

    match last {
        "i32" => Ok("int".to_string()),
        "i64" => Ok("bigint".to_string()),
        "i16" => Ok("smallint".to_string()),
        "u8" => Ok("tinyint".to_string()),
        "bool" => Ok("bit".to_string()),
        "String" | "str" | "&str" => Ok(sized("nvarchar")),
        "f64" => Ok("float".to_string()),
        "f32" => Ok("real".to_string()),
        "Decimal" => Ok("decimal(18,2)".to_string()),
        "NaiveDateTime" | "DateTime" => Ok("datetime".to_string()),
        "NaiveDate" => Ok("date".to_string()),
        "NaiveTime" => Ok("time".to_string()),
        "Uuid" => Ok("uniqueidentifier".to_string()),
        _ => Err(Error::ModelRegistrationError(format!(
            "No mapping found for Rust type: {}",
            rust_type
        ))),
    }
}
