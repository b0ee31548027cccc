//! Type definitions for database schema objects
//!
//! Every object kind the comparison engine understands lives here, together with the
//! identity rules the engine's set operations rely on: two objects are the same object
//! when they share a kind and a case-insensitive name, or when both carry the same
//! nonzero live `object_id`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Discriminator for the object kinds in a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DbObjectType {
    Table,
    Column,
    Index,
    ForeignKey,
    CheckConstraint,
}

impl DbObjectType {
    pub const ALL: [DbObjectType; 5] = [
        DbObjectType::Table,
        DbObjectType::Column,
        DbObjectType::Index,
        DbObjectType::ForeignKey,
        DbObjectType::CheckConstraint,
    ];
}

impl fmt::Display for DbObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for DbObjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DbObjectType::ALL
            .into_iter()
            .find(|kind| kind.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UsageError(format!("Unrecognized object type: {}", s)))
    }
}

/// Case-insensitive name comparison shared by every identity check
pub fn names_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn same_identity(
    (kind_a, name_a, id_a): (DbObjectType, &str, i64),
    (kind_b, name_b, id_b): (DbObjectType, &str, i64),
) -> bool {
    if kind_a != kind_b {
        return false;
    }

    if id_a != 0 && id_a == id_b {
        return true;
    }

    names_match(name_a, name_b)
}

/// Objects equal by id may differ in name, so only the kind feeds the hash
fn hash_identity<H: Hasher>(kind: DbObjectType, state: &mut H) {
    kind.hash(state);
}

/// Implements identity-based equality and hashing for a concrete object struct
macro_rules! impl_identity {
    ($ty:ty, $kind:expr) => {
        impl $ty {
            pub fn object_type(&self) -> DbObjectType {
                $kind
            }

            fn identity_key(&self) -> (DbObjectType, &str, i64) {
                ($kind, self.name.as_str(), self.object_id)
            }
        }

        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                same_identity(self.identity_key(), other.identity_key())
            }
        }

        impl Eq for $ty {}

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                hash_identity($kind, state);
            }
        }
    };
}

/// Represents a database table
///
/// Foreign keys are deliberately not owned here; they live on [`Schema`] so that a key
/// can reference any table without an ownership cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Table {
    pub object_id: i64,
    /// Schema-qualified name, e.g. `dbo.Employee`
    pub name: String,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    pub check_constraints: Vec<CheckConstraint>,
    pub clustered_index_name: Option<String>,
    pub identity_column_name: Option<String>,
    /// Informational only; destructive checks use the live metadata snapshot
    pub row_count: i64,
}

impl_identity!(Table, DbObjectType::Table);

impl Table {
    /// Create a new table with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Add a column to the table
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// Add an index to the table
    pub fn add_index(&mut self, index: Index) {
        self.indexes.push(index);
    }

    /// Add a check constraint to the table
    pub fn add_check_constraint(&mut self, check: CheckConstraint) {
        self.check_constraints.push(check);
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.add_index(index);
        self
    }

    pub fn with_check_constraint(mut self, check: CheckConstraint) -> Self {
        self.add_check_constraint(check);
        self
    }

    /// Mark a column as the table's identity column
    pub fn identity(mut self, column_name: &str) -> Self {
        self.identity_column_name = Some(column_name.to_string());
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| names_match(&col.name, name))
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|ndx| names_match(&ndx.name, name))
    }

    pub fn is_identity_column(&self, column_name: &str) -> bool {
        self.identity_column_name
            .as_deref()
            .is_some_and(|identity| names_match(identity, column_name))
    }

    /// Whether the column belongs to the table's primary key
    pub fn is_primary_key_column(&self, column_name: &str) -> bool {
        self.indexes
            .iter()
            .filter(|ndx| ndx.index_type == IndexType::PrimaryKey)
            .flat_map(|ndx| ndx.columns.iter())
            .any(|col| names_match(&col.name, column_name))
    }
}

/// Represents a database column
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Column {
    pub object_id: i64,
    pub name: String,
    /// Dialect-specific type text, e.g. `nvarchar(50)`
    pub data_type: String,
    pub is_nullable: bool,
    pub default_value: Option<String>,
    /// True when a required column is added to a table that already has rows
    pub is_default_required: bool,
    pub position: Option<i32>,
    pub is_calculated: bool,
    pub expression: Option<String>,
    /// Owning table name; set by [`Schema::link_parents`], never persisted
    #[serde(skip)]
    pub parent: Option<String>,
}

impl_identity!(Column, DbObjectType::Column);

impl Column {
    /// Create a new column with the given name and type
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            ..Default::default()
        }
    }

    /// Set whether the column is nullable
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.is_nullable = nullable;
        self
    }

    /// Set a default value for the column
    pub fn default(mut self, default: &str) -> Self {
        self.default_value = Some(default.to_string());
        self
    }

    pub fn position(mut self, position: i32) -> Self {
        self.position = Some(position);
        self
    }

    /// Turn the column into a persisted computed column
    pub fn calculated(mut self, expression: &str) -> Self {
        self.is_calculated = true;
        self.expression = Some(expression.to_string());
        self
    }

    /// Describes how `self` (desired) differs from `current`, if at all
    pub fn is_altered(&self, current: &Column) -> Option<String> {
        if !self.data_type.eq_ignore_ascii_case(&current.data_type) {
            return Some(format!(
                "Data type changed from {} to {}",
                current.data_type, self.data_type
            ));
        }

        if self.is_nullable != current.is_nullable {
            return Some(format!(
                "Nullability changed from {} to {}",
                current.is_nullable, self.is_nullable
            ));
        }

        if self.default_value != current.default_value {
            return Some(format!(
                "Default value changed from {} to {}",
                current.default_value.as_deref().unwrap_or("<none>"),
                self.default_value.as_deref().unwrap_or("<none>")
            ));
        }

        None
    }
}

/// Kind of index, mirroring how SQL Server reports them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexType {
    PrimaryKey = 1,
    UniqueIndex = 2,
    UniqueConstraint = 3,
    #[default]
    NonUnique = 4,
}

impl IndexType {
    /// Primary keys and unique constraints can be the target of a foreign key
    pub fn is_referenceable(self) -> bool {
        matches!(self, IndexType::PrimaryKey | IndexType::UniqueConstraint)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// A member column of an index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexColumn {
    pub name: String,
    pub direction: SortDirection,
    pub order: i32,
}

impl IndexColumn {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn descending(mut self) -> Self {
        self.direction = SortDirection::Descending;
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

/// Represents an index, primary key or unique constraint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Index {
    pub object_id: i64,
    pub name: String,
    pub index_type: IndexType,
    pub columns: Vec<IndexColumn>,
    pub is_clustered: bool,
    /// Owning table name; set by [`Schema::link_parents`], never persisted
    #[serde(skip)]
    pub parent: Option<String>,
}

impl_identity!(Index, DbObjectType::Index);

impl Index {
    pub fn new(name: &str, index_type: IndexType, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            index_type,
            columns: columns
                .iter()
                .enumerate()
                .map(|(i, col)| IndexColumn::new(col).order(i as i32 + 1))
                .collect(),
            ..Default::default()
        }
    }

    /// Member columns in key order
    pub fn ordered_columns(&self) -> Vec<&IndexColumn> {
        let mut columns: Vec<&IndexColumn> = self.columns.iter().collect();
        columns.sort_by_key(|col| col.order);
        columns
    }

    pub fn contains_column(&self, column_name: &str) -> bool {
        self.columns.iter().any(|col| names_match(&col.name, column_name))
    }

    /// Describes how `self` (desired) differs from `current`, if at all
    pub fn is_altered(&self, current: &Index) -> Option<String> {
        if self.index_type != current.index_type {
            return Some(format!(
                "Index type changed from {:?} to {:?}",
                current.index_type, self.index_type
            ));
        }

        let added: Vec<&str> = self
            .columns
            .iter()
            .filter(|col| !current.contains_column(&col.name))
            .map(|col| col.name.as_str())
            .collect();
        if !added.is_empty() {
            return Some(format!("Added columns {}", added.join(", ")));
        }

        let removed: Vec<&str> = current
            .columns
            .iter()
            .filter(|col| !self.contains_column(&col.name))
            .map(|col| col.name.as_str())
            .collect();
        if !removed.is_empty() {
            return Some(format!("Removed columns {}", removed.join(", ")));
        }

        let key_changed = self
            .ordered_columns()
            .iter()
            .zip(current.ordered_columns())
            .any(|(desired, live)| {
                !names_match(&desired.name, &live.name) || desired.direction != live.direction
            });
        if key_changed {
            return Some("Column order or sort direction changed".to_string());
        }

        None
    }
}

/// A referencing/referenced column pair of a foreign key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForeignKeyColumn {
    pub referencing_name: String,
    pub referenced_name: String,
}

impl ForeignKeyColumn {
    pub fn new(referencing_name: &str, referenced_name: &str) -> Self {
        Self {
            referencing_name: referencing_name.to_string(),
            referenced_name: referenced_name.to_string(),
        }
    }
}

/// Represents a foreign key constraint
///
/// Both ends are held by table name; [`Schema::table`] resolves them. The owning table
/// is persisted as `parentName` so a deserialized schema can be re-linked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForeignKey {
    pub object_id: i64,
    pub name: String,
    #[serde(rename = "parentName")]
    pub parent: String,
    pub referenced_table: String,
    pub columns: Vec<ForeignKeyColumn>,
    pub cascade_delete: bool,
    pub cascade_update: bool,
}

impl_identity!(ForeignKey, DbObjectType::ForeignKey);

impl ForeignKey {
    pub fn new(name: &str, parent: &str, referenced_table: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: parent.to_string(),
            referenced_table: referenced_table.to_string(),
            ..Default::default()
        }
    }

    pub fn with_column(mut self, referencing_name: &str, referenced_name: &str) -> Self {
        self.columns
            .push(ForeignKeyColumn::new(referencing_name, referenced_name));
        self
    }

    pub fn cascade_delete(mut self, cascade: bool) -> Self {
        self.cascade_delete = cascade;
        self
    }

    pub fn cascade_update(mut self, cascade: bool) -> Self {
        self.cascade_update = cascade;
        self
    }
}

/// Represents a check constraint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckConstraint {
    pub object_id: i64,
    pub name: String,
    pub expression: String,
    #[serde(skip)]
    pub parent: Option<String>,
}

impl_identity!(CheckConstraint, DbObjectType::CheckConstraint);

impl CheckConstraint {
    pub fn new(name: &str, expression: &str) -> Self {
        Self {
            name: name.to_string(),
            expression: expression.to_string(),
            ..Default::default()
        }
    }
}

/// Any schema object, as carried by script actions and statements
#[derive(Debug, Clone)]
pub enum DbObject {
    Table(Table),
    Column(Column),
    Index(Index),
    ForeignKey(ForeignKey),
    CheckConstraint(CheckConstraint),
}

impl DbObject {
    pub fn object_type(&self) -> DbObjectType {
        match self {
            DbObject::Table(_) => DbObjectType::Table,
            DbObject::Column(_) => DbObjectType::Column,
            DbObject::Index(_) => DbObjectType::Index,
            DbObject::ForeignKey(_) => DbObjectType::ForeignKey,
            DbObject::CheckConstraint(_) => DbObjectType::CheckConstraint,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DbObject::Table(t) => &t.name,
            DbObject::Column(c) => &c.name,
            DbObject::Index(i) => &i.name,
            DbObject::ForeignKey(fk) => &fk.name,
            DbObject::CheckConstraint(ck) => &ck.name,
        }
    }

    pub fn object_id(&self) -> i64 {
        match self {
            DbObject::Table(t) => t.object_id,
            DbObject::Column(c) => c.object_id,
            DbObject::Index(i) => i.object_id,
            DbObject::ForeignKey(fk) => fk.object_id,
            DbObject::CheckConstraint(ck) => ck.object_id,
        }
    }

    /// Name of the enclosing table, when the object has one
    pub fn parent_name(&self) -> Option<&str> {
        match self {
            DbObject::Table(_) => None,
            DbObject::Column(c) => c.parent.as_deref(),
            DbObject::Index(i) => i.parent.as_deref(),
            DbObject::ForeignKey(fk) => Some(fk.parent.as_str()),
            DbObject::CheckConstraint(ck) => ck.parent.as_deref(),
        }
    }

    /// Name prefixed by the parent table for table-scoped objects
    pub fn qualified_name(&self) -> String {
        match (self, self.parent_name()) {
            (DbObject::Column(_) | DbObject::Index(_) | DbObject::CheckConstraint(_), Some(parent)) => {
                format!("{}.{}", parent, self.name())
            }
            _ => self.name().to_string(),
        }
    }

    /// Describes how `self` (desired) differs from `current`; only columns and indexes
    /// can be altered in place
    pub fn is_altered(&self, current: &DbObject) -> Option<String> {
        match (self, current) {
            (DbObject::Column(desired), DbObject::Column(live)) => desired.is_altered(live),
            (DbObject::Index(desired), DbObject::Index(live)) => desired.is_altered(live),
            _ => None,
        }
    }

    fn identity_key(&self) -> (DbObjectType, &str, i64) {
        (self.object_type(), self.name(), self.object_id())
    }
}

impl PartialEq for DbObject {
    fn eq(&self, other: &Self) -> bool {
        same_identity(self.identity_key(), other.identity_key())
    }
}

impl Eq for DbObject {}

impl Hash for DbObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_identity(self.object_type(), state);
    }
}

impl fmt::Display for DbObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.object_type(), self.qualified_name())
    }
}

impl From<Table> for DbObject {
    fn from(table: Table) -> Self {
        DbObject::Table(table)
    }
}

impl From<Column> for DbObject {
    fn from(column: Column) -> Self {
        DbObject::Column(column)
    }
}

impl From<Index> for DbObject {
    fn from(index: Index) -> Self {
        DbObject::Index(index)
    }
}

impl From<ForeignKey> for DbObject {
    fn from(fk: ForeignKey) -> Self {
        DbObject::ForeignKey(fk)
    }
}

impl From<CheckConstraint> for DbObject {
    fn from(check: CheckConstraint) -> Self {
        DbObject::CheckConstraint(check)
    }
}

/// One side of a comparison: every table plus every foreign key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Schema {
    pub tables: Vec<Table>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table to the schema
    pub fn add_table(&mut self, table: Table) {
        self.tables.push(table);
    }

    /// Add a foreign key to the schema
    pub fn add_foreign_key(&mut self, fk: ForeignKey) {
        self.foreign_keys.push(fk);
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.add_table(table);
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.add_foreign_key(fk);
        self
    }

    /// Look up a table by (case-insensitive) name
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|tbl| names_match(&tbl.name, name))
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.foreign_keys.is_empty()
    }

    /// Point every column, index and check constraint at its owning table.
    ///
    /// Parents already set are left alone. Must run before any dependency lookup;
    /// the comparison engine calls it on both schemas.
    pub fn link_parents(&mut self) {
        for table in &mut self.tables {
            let name = &table.name;
            for col in &mut table.columns {
                col.parent.get_or_insert_with(|| name.clone());
            }
            for ndx in &mut table.indexes {
                ndx.parent.get_or_insert_with(|| name.clone());
            }
            for chk in &mut table.check_constraints {
                chk.parent.get_or_insert_with(|| name.clone());
            }
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mut schema: Schema = serde_json::from_str(json)?;
        schema.link_parents();
        Ok(schema)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn identity_ignores_case_and_unrelated_fields() {
        let a = Column::new("FirstName", "nvarchar(50)");
        let b = Column::new("firstname", "int").nullable(true).position(4);

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_eq!(DbObject::from(a.clone()), DbObject::from(b.clone()));
        assert_eq!(hash_of(&DbObject::from(a)), hash_of(&DbObject::from(b)));
    }

    #[test]
    fn identity_requires_same_kind() {
        let table = DbObject::from(Table::new("dbo.Thing"));
        let index = DbObject::from(Index::new("dbo.Thing", IndexType::NonUnique, &["Id"]));
        assert_ne!(table, index);
    }

    #[test]
    fn matching_object_ids_win_over_names() {
        let mut a = Table::new("dbo.Old");
        let mut b = Table::new("dbo.New");
        assert_ne!(a, b);

        a.object_id = 42;
        b.object_id = 42;
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_eq!(hash_of(&DbObject::from(a.clone())), hash_of(&DbObject::from(b.clone())));

        let set: std::collections::HashSet<Table> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn column_alteration_reasons() {
        let live = Column::new("Name", "nvarchar(40)");
        let desired = Column::new("Name", "nvarchar(50)");
        assert_eq!(
            desired.is_altered(&live).as_deref(),
            Some("Data type changed from nvarchar(40) to nvarchar(50)")
        );

        let desired = Column::new("Name", "NVARCHAR(40)").nullable(true);
        assert_eq!(
            desired.is_altered(&live).as_deref(),
            Some("Nullability changed from false to true")
        );

        let desired = Column::new("Name", "nvarchar(40)").default("''");
        assert!(desired.is_altered(&live).unwrap().starts_with("Default value changed"));

        assert!(live.is_altered(&live.clone()).is_none());
    }

    #[test]
    fn index_alteration_reasons() {
        let live = Index::new("IX_T", IndexType::NonUnique, &["A", "B"]);

        let desired = Index::new("IX_T", IndexType::UniqueIndex, &["A", "B"]);
        assert!(desired.is_altered(&live).unwrap().contains("Index type changed"));

        let desired = Index::new("IX_T", IndexType::NonUnique, &["A", "B", "C"]);
        assert_eq!(desired.is_altered(&live).as_deref(), Some("Added columns C"));

        let desired = Index::new("IX_T", IndexType::NonUnique, &["A"]);
        assert_eq!(desired.is_altered(&live).as_deref(), Some("Removed columns B"));

        let desired = Index::new("IX_T", IndexType::NonUnique, &["B", "A"]);
        assert!(desired.is_altered(&live).is_some());

        assert!(live.is_altered(&live.clone()).is_none());
    }

    #[test]
    fn object_type_parses_case_insensitively() {
        assert_eq!("table".parse::<DbObjectType>().unwrap(), DbObjectType::Table);
        assert_eq!("ForeignKey".parse::<DbObjectType>().unwrap(), DbObjectType::ForeignKey);
        assert!("view".parse::<DbObjectType>().is_err());
    }

    #[test]
    fn link_parents_keeps_existing_links() {
        let mut schema = Schema::new().with_table(
            Table::new("dbo.T")
                .with_column(Column::new("A", "int"))
                .with_index(Index::new("IX_T_A", IndexType::NonUnique, &["A"])),
        );
        schema.tables[0].columns[0].parent = Some("dbo.Elsewhere".to_string());
        schema.link_parents();

        assert_eq!(schema.tables[0].columns[0].parent.as_deref(), Some("dbo.Elsewhere"));
        assert_eq!(schema.tables[0].indexes[0].parent.as_deref(), Some("dbo.T"));
    }

    #[test]
    fn json_keeps_foreign_key_parent_name_and_drops_back_references() {
        let mut schema = Schema::new()
            .with_table(Table::new("dbo.Parent").with_column(Column::new("Id", "int")))
            .with_table(Table::new("dbo.Child").with_column(Column::new("ParentId", "int")))
            .with_foreign_key(
                ForeignKey::new("FK_Child_Parent", "dbo.Child", "dbo.Parent")
                    .with_column("ParentId", "Id"),
            );
        schema.link_parents();

        let json = schema.to_json().unwrap();
        assert!(json.contains("\"parentName\": \"dbo.Child\""));
        assert!(!json.contains("\"parent\""));

        let restored = Schema::from_json(&json).unwrap();
        assert_eq!(restored.tables[1].columns[0].parent.as_deref(), Some("dbo.Child"));
        assert_eq!(
            restored.table(&restored.foreign_keys[0].parent).map(|t| t.name.as_str()),
            Some("dbo.Child")
        );
    }
}
