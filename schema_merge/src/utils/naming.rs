//! Naming utilities
//!
//! Constraint name patterns for generated schemas and a few formatting helpers.

/// Primary key name pattern
pub const PRIMARY_KEY_PATTERN: &str = "PK_{table}";
/// Unique constraint name pattern
pub const UNIQUE_CONSTRAINT_PATTERN: &str = "U_{table}_{columns}";
/// Foreign key support index name pattern
pub const INDEX_PATTERN: &str = "IX_{table}_{column}";
/// Foreign key name pattern
pub const FOREIGN_KEY_PATTERN: &str = "FK_{table}_{column}";

/// Format a name according to a pattern with placeholders
pub fn format_name(pattern: &str, replacements: &[(&str, &str)]) -> String {
    let mut result = pattern.to_string();

    for (placeholder, value) in replacements {
        result = result.replace(&format!("{{{}}}", placeholder), value);
    }

    result
}

/// Table name without its schema prefix
pub fn bare_table_name(table_name: &str) -> &str {
    table_name.rsplit('.').next().unwrap_or(table_name)
}

pub fn get_primary_key_name(table_name: &str) -> String {
    format_name(PRIMARY_KEY_PATTERN, &[("table", bare_table_name(table_name))])
}

pub fn get_unique_constraint_name(table_name: &str, columns: &[String]) -> String {
    format_name(
        UNIQUE_CONSTRAINT_PATTERN,
        &[("table", bare_table_name(table_name)), ("columns", &columns.join("_"))],
    )
}

pub fn get_index_name(table_name: &str, column_name: &str) -> String {
    format_name(
        INDEX_PATTERN,
        &[("table", bare_table_name(table_name)), ("column", column_name)],
    )
}

pub fn get_foreign_key_name(table_name: &str, column_name: &str) -> String {
    format_name(
        FOREIGN_KEY_PATTERN,
        &[("table", bare_table_name(table_name)), ("column", column_name)],
    )
}

/// Group digits in thousands, e.g. `1234567` becomes `1,234,567`
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Bracket-quote a SQL Server identifier, doubling any closing bracket
pub fn quote_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}
