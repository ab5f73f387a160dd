//! Provisioning SQL bundled with the installer.
//!
//! Templates carry `$(DBNAME)` and `$(PASSWORD)` tokens, matched ignoring
//! case. The database name is substituted as a bare identifier, so it must be
//! a plain identifier; the password is substituted inside a string literal
//! with quotes doubled.

use whippet_core::result::{WhippetError, WhippetResult};
use whippet_data::DatabaseProvider;

/// Token replaced by the target database name.
pub const DBNAME_TOKEN: &str = "$(DBNAME)";

/// Token replaced by the login password.
pub const PASSWORD_TOKEN: &str = "$(PASSWORD)";

/// A provisioning script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    /// Create the target database
    DbCreate,
    /// Create the service login
    DbLogin,
    /// Create the `whippet` schema and tables
    DbSchema,
}

impl ScriptKind {
    /// Script name as used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DbCreate => "DB_CREATE",
            Self::DbLogin => "DB_LOGIN",
            Self::DbSchema => "DB_SCHEMA",
        }
    }
}

/// The template for `kind` on `provider`, if the provider needs one.
///
/// `SQLite` creates a database file on first connection and has no logins,
/// so it only ships a schema script.
#[must_use]
pub const fn template(provider: DatabaseProvider, kind: ScriptKind) -> Option<&'static str> {
    match (provider, kind) {
        (DatabaseProvider::PostgreSql, ScriptKind::DbCreate) => {
            Some(include_str!("../scripts/postgresql/db_create.sql"))
        }
        (DatabaseProvider::PostgreSql, ScriptKind::DbLogin) => {
            Some(include_str!("../scripts/postgresql/db_login.sql"))
        }
        (DatabaseProvider::PostgreSql, ScriptKind::DbSchema) => {
            Some(include_str!("../scripts/postgresql/db_schema.sql"))
        }
        (DatabaseProvider::SqlServer, ScriptKind::DbCreate) => {
            Some(include_str!("../scripts/mssql/db_create.sql"))
        }
        (DatabaseProvider::SqlServer, ScriptKind::DbLogin) => {
            Some(include_str!("../scripts/mssql/db_login.sql"))
        }
        (DatabaseProvider::SqlServer, ScriptKind::DbSchema) => {
            Some(include_str!("../scripts/mssql/db_schema.sql"))
        }
        (DatabaseProvider::Sqlite, ScriptKind::DbSchema) => {
            Some(include_str!("../scripts/sqlite/db_schema.sql"))
        }
        (DatabaseProvider::Sqlite, ScriptKind::DbCreate | ScriptKind::DbLogin) => None,
    }
}

/// Values substituted into a template.
#[derive(Clone, Default)]
pub struct ScriptTokens<'a> {
    /// Target database name
    pub database: Option<&'a str>,
    /// Login password
    pub password: Option<&'a str>,
}

impl std::fmt::Debug for ScriptTokens<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptTokens")
            .field("database", &self.database)
            .field("password", &self.password.map(|_| "*****"))
            .finish()
    }
}

/// Substitute `tokens` into `template`.
///
/// # Errors
///
/// - [`WhippetError::ArgumentNull`] when the template uses a token that has
///   no value
/// - [`WhippetError::Validation`] when the database name is not a plain
///   identifier
pub fn render(template: &str, tokens: &ScriptTokens<'_>) -> WhippetResult<String> {
    let mut script = template.to_string();

    if contains_token(&script, DBNAME_TOKEN) {
        let database = tokens
            .database
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| WhippetError::argument_null("database"))?;
        if !is_plain_identifier(database) {
            return Err(WhippetError::validation(
                "database",
                format!("'{database}' is not a plain identifier"),
            ));
        }
        script = replace_token(&script, DBNAME_TOKEN, database);
    }

    if contains_token(&script, PASSWORD_TOKEN) {
        let password = tokens
            .password
            .filter(|password| !password.is_empty())
            .ok_or_else(|| WhippetError::argument_null("password"))?;
        script = replace_token(&script, PASSWORD_TOKEN, &password.replace('\'', "''"));
    }

    Ok(script)
}

/// Replace every occurrence of `token`, ignoring ASCII case.
#[must_use]
pub fn replace_token(text: &str, token: &str, value: &str) -> String {
    if token.is_empty() {
        return text.to_string();
    }
    // ASCII lowering keeps byte offsets aligned with `text`.
    let haystack = text.to_ascii_lowercase();
    let needle = token.to_ascii_lowercase();

    let mut output = String::with_capacity(text.len());
    let mut last = 0;
    for (start, _) in haystack.match_indices(&needle) {
        output.push_str(&text[last..start]);
        output.push_str(value);
        last = start + needle.len();
    }
    output.push_str(&text[last..]);
    output
}

fn contains_token(text: &str, token: &str) -> bool {
    text.to_ascii_lowercase().contains(&token.to_ascii_lowercase())
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;

    #[test]
    fn tokens_match_ignoring_case() {
        assert_eq!(
            replace_token("CREATE DATABASE $(dbname); -- $(DbName)", DBNAME_TOKEN, "whippet"),
            "CREATE DATABASE whippet; -- whippet"
        );
        assert_eq!(replace_token("no tokens", DBNAME_TOKEN, "x"), "no tokens");
    }

    #[test]
    fn renders_postgres_login() {
        let template = template(DatabaseProvider::PostgreSql, ScriptKind::DbLogin).unwrap();
        let script = render(
            template,
            &ScriptTokens {
                database: Some("whippet"),
                password: Some("it's secret"),
            },
        )
        .unwrap();

        assert!(script.contains("PASSWORD 'it''s secret'"));
        assert!(script.contains("ON DATABASE whippet TO whippet_sa"));
        assert!(!script.contains("$("));
    }

    #[test]
    fn missing_values_are_reported() {
        let template = template(DatabaseProvider::PostgreSql, ScriptKind::DbLogin).unwrap();
        assert_eq!(
            render(template, &ScriptTokens::default()),
            Err(WhippetError::argument_null("database"))
        );
        assert_eq!(
            render(
                template,
                &ScriptTokens {
                    database: Some("whippet"),
                    password: None,
                }
            ),
            Err(WhippetError::argument_null("password"))
        );
    }

    #[test]
    fn database_name_must_be_an_identifier() {
        let template = template(DatabaseProvider::PostgreSql, ScriptKind::DbCreate).unwrap();
        let tokens = ScriptTokens {
            database: Some("x; DROP DATABASE postgres"),
            password: None,
        };
        assert!(render(template, &tokens).unwrap_err().is_validation());
    }

    #[test]
    fn sqlite_only_ships_a_schema() {
        assert!(template(DatabaseProvider::Sqlite, ScriptKind::DbCreate).is_none());
        assert!(template(DatabaseProvider::Sqlite, ScriptKind::DbLogin).is_none());

        let schema = template(DatabaseProvider::Sqlite, ScriptKind::DbSchema).unwrap();
        assert_eq!(render(schema, &ScriptTokens::default()).unwrap(), schema);
    }

    #[test]
    fn every_server_provider_ships_all_scripts() {
        for provider in [DatabaseProvider::PostgreSql, DatabaseProvider::SqlServer] {
            for kind in [ScriptKind::DbCreate, ScriptKind::DbLogin, ScriptKind::DbSchema] {
                assert!(template(provider, kind).is_some(), "{provider} {}", kind.as_str());
            }
        }
    }
}
