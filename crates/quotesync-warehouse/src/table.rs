use std::fmt::{Display, Formatter};

use crate::WarehouseError;

/// Destination table identifier, optionally schema-qualified.
///
/// The table name arrives through configuration and is interpolated into
/// `DELETE FROM` / `INSERT INTO` statements, so it is restricted to plain
/// identifiers: ASCII letters, digits and underscores, not starting with a
/// digit, with at most one `schema.` qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    pub fn parse(input: &str) -> Result<Self, WarehouseError> {
        let reject = |reason: &'static str| WarehouseError::InvalidTable {
            value: input.to_owned(),
            reason,
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(reject("table name is empty"));
        }

        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() > 2 {
            return Err(reject("at most one schema qualifier is allowed"));
        }
        for part in &parts {
            if !is_identifier(part) {
                return Err(reject(
                    "identifiers are limited to ASCII letters, digits and underscores",
                ));
            }
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
