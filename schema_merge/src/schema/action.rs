//! Script actions
//!
//! The comparison engine produces an ordered list of [`ScriptAction`]s; each one holds
//! the statements that realise a single create, alter or drop.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::schema::generator::ScriptBuilder;
use crate::schema::types::{names_match, DbObject, DbObjectType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Create,
    Alter,
    Drop,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [ActionKind::Create, ActionKind::Alter, ActionKind::Drop];
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UsageError(format!("Unrecognized action: {}", s)))
    }
}

/// One SQL statement plus the object it actually touches
///
/// `affected` differs from the owning action's object when the statement drops or
/// rebuilds a dependency, e.g. a `DROP CONSTRAINT` emitted while dropping a table.
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub affected: Option<DbObject>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, affected: impl Into<DbObject>) -> Self {
        Self {
            sql: sql.into(),
            affected: Some(affected.into()),
        }
    }

    /// A statement that touches no schema object, such as a comment
    pub fn bare(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            affected: None,
        }
    }
}

/// A single planned change to the target database
#[derive(Debug, Clone)]
pub struct ScriptAction {
    pub kind: ActionKind,
    pub object: DbObject,
    pub statements: Vec<Statement>,
    pub is_destructive: bool,
    pub message: Option<String>,
}

impl ScriptAction {
    pub fn new(kind: ActionKind, object: impl Into<DbObject>) -> Self {
        Self {
            kind,
            object: object.into(),
            statements: Vec::new(),
            is_destructive: false,
            message: None,
        }
    }

    pub fn key(&self) -> ScriptActionKey {
        ScriptActionKey::new(self.kind, &self.object.qualified_name(), self.object.object_type())
    }

    /// Whether any statement of this action touches an object of the given kind and name
    pub fn affects(&self, object_type: DbObjectType, name: &str) -> bool {
        self.statements.iter().any(|st| {
            st.affected.as_ref().is_some_and(|obj| {
                obj.object_type() == object_type && names_match(obj.name(), name)
            })
        })
    }
}

impl PartialEq for ScriptAction {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.object == other.object
    }
}

impl Eq for ScriptAction {}

impl fmt::Display for ScriptAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.object)
    }
}

/// Serializable identity of an action, used by the ignore list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptActionKey {
    pub action: ActionKind,
    pub object_name: String,
    pub object_type: DbObjectType,
}

impl ScriptActionKey {
    pub fn new(action: ActionKind, object_name: &str, object_type: DbObjectType) -> Self {
        Self {
            action,
            object_name: object_name.to_string(),
            object_type,
        }
    }
}

/// Rendering helpers over a planned action list
pub trait ScriptActions {
    /// Flatten into executable statements, deduplicated in first-seen order.
    ///
    /// Statements of destructive actions are wrapped in block comments unless
    /// `allow_destructive` is set.
    fn to_sql_statements<B>(&self, builder: &B, allow_destructive: bool) -> Vec<String>
    where
        B: ScriptBuilder + ?Sized;

    fn to_sql_script<B>(&self, separator: &str, builder: &B, allow_destructive: bool) -> String
    where
        B: ScriptBuilder + ?Sized,
    {
        self.to_sql_statements(builder, allow_destructive).join(separator)
    }

    /// One `"{kind} {type} {name}"` line per action
    fn to_compact_statements(&self) -> Vec<String>;
}

impl ScriptActions for [ScriptAction] {
    fn to_sql_statements<B>(&self, builder: &B, allow_destructive: bool) -> Vec<String>
    where
        B: ScriptBuilder + ?Sized,
    {
        let statements: IndexSet<String> = self
            .iter()
            .flat_map(|action| {
                let comment_out = action.is_destructive && !allow_destructive;
                action.statements.iter().map(move |st| {
                    if comment_out {
                        builder.block_comment(&st.sql)
                    } else {
                        st.sql.clone()
                    }
                })
            })
            .collect();

        statements.into_iter().collect()
    }

    fn to_compact_statements(&self) -> Vec<String> {
        self.iter().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::generator::DatabaseMetadata;
    use crate::schema::sqlserver::SqlServerScriptBuilder;
    use crate::schema::types::{Column, Table};
    use pretty_assertions::assert_eq;

    fn drop_action(sql: &[&str], destructive: bool) -> ScriptAction {
        let mut action = ScriptAction::new(ActionKind::Drop, Table::new("dbo.Log"));
        action.statements = sql.iter().map(|s| Statement::bare(*s)).collect();
        action.is_destructive = destructive;
        action
    }

    #[test]
    fn statements_are_deduplicated_in_order() {
        let builder = SqlServerScriptBuilder::with_metadata(DatabaseMetadata::default());
        let actions = vec![
            drop_action(&["A", "B"], false),
            drop_action(&["B", "C"], false),
        ];

        assert_eq!(actions.to_sql_statements(&builder, false), vec!["A", "B", "C"]);
        assert_eq!(actions.to_sql_script("\nGO\n", &builder, false), "A\nGO\nB\nGO\nC");
    }

    #[test]
    fn destructive_statements_are_commented_out_unless_allowed() {
        let builder = SqlServerScriptBuilder::with_metadata(DatabaseMetadata::default());
        let actions = vec![drop_action(&["DROP TABLE [dbo].[Log]"], true)];

        assert_eq!(
            actions.to_sql_statements(&builder, false),
            vec!["/*\nDROP TABLE [dbo].[Log]\n*/"]
        );
        assert_eq!(
            actions.to_sql_statements(&builder, true),
            vec!["DROP TABLE [dbo].[Log]"]
        );
    }

    #[test]
    fn compact_listing_and_keys() {
        let mut column = Column::new("Notes", "nvarchar(max)");
        column.parent = Some("dbo.Log".to_string());
        let actions = vec![
            ScriptAction::new(ActionKind::Create, column),
            drop_action(&[], false),
        ];

        assert_eq!(
            actions.to_compact_statements(),
            vec!["Create Column dbo.Log.Notes", "Drop Table dbo.Log"]
        );
        assert_eq!(
            actions[0].key(),
            ScriptActionKey::new(ActionKind::Create, "dbo.Log.Notes", DbObjectType::Column)
        );
    }

    #[test]
    fn action_equality_is_kind_and_object() {
        let a = drop_action(&["X"], true);
        let b = drop_action(&["Y"], false);
        assert_eq!(a, b);
        assert_ne!(a, ScriptAction::new(ActionKind::Create, Table::new("dbo.Log")));
    }
}
