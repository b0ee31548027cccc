//! Ignore list and preview filter
//!
//! The ignore list is a persisted set of [`ScriptActionKey`]s that are removed from every
//! plan. The preview filter narrows what is shown without persisting anything.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::schema::action::{ActionKind, ScriptAction, ScriptActionKey};
use crate::schema::types::DbObjectType;

/// Split a `kind:text` expression; the kind part is parsed as an object type
fn split_expression(expression: &str) -> Result<(Option<DbObjectType>, &str)> {
    match expression.split_once(':') {
        Some((kind, text)) => Ok((Some(kind.parse()?), text.trim())),
        None => Ok((None, expression.trim())),
    }
}

/// Actions the user never wants scripted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IgnoreList {
    pub actions: Vec<ScriptActionKey>,
}

impl IgnoreList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an ignore file; a missing file is an empty list
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn contains(&self, key: &ScriptActionKey) -> bool {
        self.actions.contains(key)
    }

    /// Drop every action whose key is on the list
    pub fn apply(&self, actions: Vec<ScriptAction>) -> Vec<ScriptAction> {
        let before = actions.len();
        let kept: Vec<ScriptAction> = actions
            .into_iter()
            .filter(|action| !self.contains(&action.key()))
            .collect();

        if kept.len() < before {
            tracing::info!(ignored = before - kept.len(), "Ignored planned actions");
        }
        kept
    }

    /// Ignore every create, alter and drop of the objects an expression matches.
    ///
    /// The expression is `kind:prefix`, e.g. `table:dbo.Audit`; it matches actions whose
    /// object type is `kind` and whose name starts with `prefix`. Returns how many keys
    /// were added.
    pub fn add_matching(&mut self, expression: &str, actions: &[ScriptAction]) -> Result<usize> {
        let (object_type, prefix) = match split_expression(expression)? {
            (Some(object_type), prefix) => (object_type, prefix),
            (None, _) => {
                return Err(Error::UsageError(format!(
                    "Ignore expression must look like kind:prefix, got '{}'",
                    expression
                )))
            }
        };

        let mut added = 0;
        let names = actions
            .iter()
            .map(ScriptAction::key)
            .filter(|key| key.object_type == object_type && key.object_name.starts_with(prefix))
            .map(|key| key.object_name);

        for name in names {
            for kind in ActionKind::ALL {
                let key = ScriptActionKey::new(kind, &name, object_type);
                if !self.contains(&key) {
                    self.actions.push(key);
                    added += 1;
                }
            }
        }

        Ok(added)
    }
}

/// Preview filter parsed from `kind:text` or plain `text`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFilter {
    pub object_type: Option<DbObjectType>,
    pub text: String,
}

impl ActionFilter {
    pub fn parse(expression: &str) -> Result<Self> {
        let (object_type, text) = split_expression(expression)?;
        Ok(Self {
            object_type,
            text: text.to_lowercase(),
        })
    }

    pub fn matches(&self, action: &ScriptAction) -> bool {
        let type_matches = self
            .object_type
            .map_or(true, |object_type| action.object.object_type() == object_type);

        type_matches
            && action
                .object
                .qualified_name()
                .to_lowercase()
                .contains(&self.text)
    }

    pub fn apply(&self, actions: Vec<ScriptAction>) -> Vec<ScriptAction> {
        actions.into_iter().filter(|action| self.matches(action)).collect()
    }
}
