//! Dependency discovery
//!
//! Before an object can be altered or dropped, anything that would block the statement
//! (indexes covering a column, foreign keys pointing at a table or key) has to be dropped
//! first and, for alters, recreated afterwards.

use crate::schema::action::{ActionKind, ScriptAction};
use crate::schema::types::{names_match, DbObject, DbObjectType, ForeignKey, Index, Schema, Table};

/// A dependent object together with the table that owns it
pub type Dependency<'a> = (Option<&'a Table>, DbObject);

impl DbObject {
    /// Objects that must be dropped before this one can be altered or dropped.
    ///
    /// `owner` is the table the object belongs to, `schema` is the side whose foreign
    /// keys are searched and `in_flight` the actions already planned in this run.
    pub fn dependencies<'a>(
        &self,
        owner: Option<&'a Table>,
        schema: &'a Schema,
        in_flight: &[ScriptAction],
    ) -> Vec<Dependency<'a>> {
        match self {
            DbObject::Column(column) => match owner {
                Some(table) => column_dependencies(&column.name, table, schema),
                None => Vec::new(),
            },
            DbObject::Table(table) => table_dependencies(table, schema, in_flight),
            DbObject::Index(index) => match owner {
                Some(table) => index_dependencies(index, table, schema),
                None => Vec::new(),
            },
            DbObject::ForeignKey(_) | DbObject::CheckConstraint(_) => Vec::new(),
        }
    }
}

fn column_dependencies<'a>(column: &str, table: &'a Table, schema: &'a Schema) -> Vec<Dependency<'a>> {
    let indexes = table
        .indexes
        .iter()
        .filter(|ndx| ndx.contains_column(column))
        .map(|ndx| (Some(table), DbObject::Index(ndx.clone())));

    let foreign_keys = schema
        .foreign_keys
        .iter()
        .filter(|fk| {
            names_match(&fk.parent, &table.name)
                && fk.columns.iter().any(|col| names_match(&col.referencing_name, column))
        })
        .map(|fk| (Some(table), DbObject::ForeignKey(fk.clone())));

    indexes.chain(foreign_keys).collect()
}

fn table_dependencies<'a>(
    table: &Table,
    schema: &'a Schema,
    in_flight: &[ScriptAction],
) -> Vec<Dependency<'a>> {
    let already_dropping = |fk: &ForeignKey| {
        in_flight.iter().any(|action| {
            action.kind == ActionKind::Drop
                && action.object.object_type() == DbObjectType::Table
                && names_match(action.object.name(), &fk.parent)
        })
    };

    schema
        .foreign_keys
        .iter()
        .filter(|fk| names_match(&fk.referenced_table, &table.name) && !already_dropping(fk))
        .map(|fk| (schema.table(&fk.parent), DbObject::ForeignKey(fk.clone())))
        .collect()
}

fn index_dependencies<'a>(index: &Index, table: &Table, schema: &'a Schema) -> Vec<Dependency<'a>> {
    if !index.index_type.is_referenceable() {
        return Vec::new();
    }

    schema
        .foreign_keys
        .iter()
        .filter(|fk| {
            names_match(&fk.referenced_table, &table.name)
                && fk
                    .columns
                    .iter()
                    .any(|col| index.contains_column(&col.referenced_name))
        })
        .map(|fk| (schema.table(&fk.parent), DbObject::ForeignKey(fk.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{Column, IndexType};

    fn sample() -> Schema {
        let mut schema = Schema::new()
            .with_table(
                Table::new("dbo.Parent")
                    .with_column(Column::new("Id", "int"))
                    .with_column(Column::new("Code", "nvarchar(10)"))
                    .with_index(Index::new("PK_Parent", IndexType::PrimaryKey, &["Id"]))
                    .with_index(Index::new("IX_Parent_Code", IndexType::NonUnique, &["Code"])),
            )
            .with_table(
                Table::new("dbo.Child")
                    .with_column(Column::new("Id", "int"))
                    .with_column(Column::new("ParentId", "int"))
                    .with_index(Index::new("IX_Child_ParentId", IndexType::NonUnique, &["ParentId"])),
            )
            .with_foreign_key(
                ForeignKey::new("FK_Child_Parent", "dbo.Child", "dbo.Parent").with_column("ParentId", "Id"),
            );
        schema.link_parents();
        schema
    }

    fn names(deps: &[Dependency<'_>]) -> Vec<String> {
        deps.iter().map(|(_, obj)| obj.to_string()).collect()
    }

    #[test]
    fn column_depends_on_covering_indexes_and_foreign_keys() {
        let schema = sample();
        let child = schema.table("dbo.Child").unwrap();
        let column = DbObject::Column(child.columns[1].clone());

        assert_eq!(
            names(&column.dependencies(Some(child), &schema, &[])),
            vec!["Index dbo.Child.IX_Child_ParentId", "ForeignKey FK_Child_Parent"]
        );
    }

    #[test]
    fn table_depends_on_incoming_foreign_keys() {
        let schema = sample();
        let parent = DbObject::Table(schema.tables[0].clone());

        let deps = parent.dependencies(None, &schema, &[]);
        assert_eq!(names(&deps), vec!["ForeignKey FK_Child_Parent"]);
        assert_eq!(deps[0].0.map(|t| t.name.as_str()), Some("dbo.Child"));
    }

    #[test]
    fn table_skips_keys_whose_owner_is_being_dropped() {
        let schema = sample();
        let parent = DbObject::Table(schema.tables[0].clone());
        let in_flight = vec![ScriptAction::new(ActionKind::Drop, schema.tables[1].clone())];

        assert!(parent.dependencies(None, &schema, &in_flight).is_empty());
    }

    #[test]
    fn only_referenceable_indexes_have_dependents() {
        let schema = sample();
        let parent = schema.table("dbo.Parent").unwrap();

        let pk = DbObject::Index(parent.indexes[0].clone());
        assert_eq!(
            names(&pk.dependencies(Some(parent), &schema, &[])),
            vec!["ForeignKey FK_Child_Parent"]
        );

        let ix = DbObject::Index(parent.indexes[1].clone());
        assert!(ix.dependencies(Some(parent), &schema, &[]).is_empty());
    }
}
