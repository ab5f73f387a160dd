//! `keyword=value;` connection strings.
//!
//! Pairs keep their original order and spelling. Keywords are matched
//! case-insensitively and through provider-specific synonyms, so
//! `Server=db;Initial Catalog=app` and `Host=db;Database=app` both answer
//! [`ConnectionStringBuilder::host`] and [`ConnectionStringBuilder::database`].
//!
//! # Example
//!
//! ```
//! use whippet_data::connection_string::ConnectionStringBuilder;
//! use whippet_data::provider::DatabaseProvider;
//!
//! # fn main() -> Result<(), whippet_data::DataError> {
//! let mut builder = ConnectionStringBuilder::parse(
//!     DatabaseProvider::PostgreSql,
//!     "Host=localhost;Database=postgres;Username=whippet_sa;Password=secret",
//! )?;
//! builder.set_database("Whippet")?;
//!
//! assert_eq!(builder.database(), Some("whippet"));
//! assert_eq!(
//!     builder.to_string(),
//!     "Host=localhost;Database=whippet;Username=whippet_sa;Password=*****;"
//! );
//! # Ok(())
//! # }
//! ```

use crate::error::{DataError, Result};
use crate::provider::DatabaseProvider;
use sqlx::postgres::PgConnectOptions;
use sqlx::sqlite::SqliteConnectOptions;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Extension appended to `SQLite` database names that have none.
pub const SQLITE_FILE_EXTENSION: &str = ".sqlite";

/// Well-known connection string settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    /// Server host name
    Host,
    /// Server port
    Port,
    /// Database (catalog) name
    Database,
    /// Login name
    Username,
    /// Login password
    Password,
    /// `PostgreSQL` password file
    Passfile,
    /// Application name reported to the server
    ApplicationName,
    /// `PostgreSQL` schema search path
    SearchPath,
    /// Connect timeout in seconds
    Timeout,
    /// `SQLite` database file
    FileName,
}

impl Keyword {
    /// Accepted spellings, lower-case with single spaces.
    fn synonyms(self, provider: DatabaseProvider) -> &'static [&'static str] {
        match (self, provider) {
            (Self::Host, DatabaseProvider::SqlServer) => {
                &["server", "data source", "address", "addr", "network address"]
            },
            (Self::Host, _) => &["host", "server"],
            (Self::Port, _) => &["port"],
            (Self::Database, _) => &["database", "db", "initial catalog"],
            (Self::Username, _) => &["username", "user id", "userid", "user name", "user", "uid"],
            (Self::Password, _) => &["password", "pwd"],
            (Self::Passfile, _) => &["passfile"],
            (Self::ApplicationName, _) => &["application name", "applicationname", "app"],
            (Self::SearchPath, _) => &["search path", "searchpath"],
            (Self::Timeout, _) => &["timeout", "connect timeout", "connection timeout"],
            (Self::FileName, _) => &["data source", "datasource", "filename", "file name"],
        }
    }

    /// Spelling used when the keyword is added to a string that lacks it.
    const fn canonical(self, provider: DatabaseProvider) -> &'static str {
        match (self, provider) {
            (Self::Host, DatabaseProvider::SqlServer) => "Server",
            (Self::Host, _) => "Host",
            (Self::Port, _) => "Port",
            (Self::Database, _) => "Database",
            (Self::Username, DatabaseProvider::SqlServer) => "User ID",
            (Self::Username, _) => "Username",
            (Self::Password, _) => "Password",
            (Self::Passfile, _) => "Passfile",
            (Self::ApplicationName, _) => "Application Name",
            (Self::SearchPath, _) => "Search Path",
            (Self::Timeout, _) => "Timeout",
            (Self::FileName, _) => "Data Source",
        }
    }

    fn matches(self, provider: DatabaseProvider, key: &str) -> bool {
        let key = normalize_key(key);
        self.synonyms(provider).contains(&key.as_str())
    }
}

fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Ordered, provider-aware connection string.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionStringBuilder {
    provider: DatabaseProvider,
    pairs: Vec<(String, String)>,
}

impl ConnectionStringBuilder {
    /// Create an empty connection string for `provider`.
    #[must_use]
    pub const fn new(provider: DatabaseProvider) -> Self {
        Self {
            provider,
            pairs: Vec::new(),
        }
    }

    /// Parse `keyword=value;` pairs.
    ///
    /// Empty segments are ignored. Values may be wrapped in single or double
    /// quotes to contain `;`; a doubled quote inside a quoted value stands for
    /// one quote.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidConnectionString`] if a segment has no `=`,
    /// has an empty keyword, or leaves a quote open.
    pub fn parse(provider: DatabaseProvider, connection_string: &str) -> Result<Self> {
        let mut pairs = Vec::new();
        for segment in split_segments(connection_string)? {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                DataError::InvalidConnectionString(format!("expected keyword=value, found '{segment}'"))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(DataError::InvalidConnectionString(format!(
                    "missing keyword in '{segment}'"
                )));
            }
            pairs.push((key.to_string(), unquote(value.trim())));
        }
        Ok(Self { provider, pairs })
    }

    /// Provider this connection string targets.
    #[must_use]
    pub const fn provider(&self) -> DatabaseProvider {
        self.provider
    }

    /// Raw pairs in order.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Value of a well-known keyword.
    #[must_use]
    pub fn get(&self, keyword: Keyword) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| keyword.matches(self.provider, key))
            .map(|(_, value)| value.as_str())
    }

    /// Value of an arbitrary keyword, matched case-insensitively.
    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<&str> {
        let key = normalize_key(key);
        self.pairs
            .iter()
            .find(|(existing, _)| normalize_key(existing) == key)
            .map(|(_, value)| value.as_str())
    }

    /// Set a well-known keyword.
    ///
    /// An existing pair keeps its position and spelling; later duplicates are
    /// dropped. A missing keyword is appended under its canonical spelling.
    pub fn set(&mut self, keyword: Keyword, value: impl Into<String>) -> &mut Self {
        let provider = self.provider;
        self.set_matching(|key| keyword.matches(provider, key), keyword.canonical(provider), value.into());
        self
    }

    /// Set an arbitrary keyword, matched case-insensitively.
    pub fn set_raw(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        let normalized = normalize_key(key);
        self.set_matching(|existing| normalize_key(existing) == normalized, key, value.into());
        self
    }

    /// Remove a well-known keyword (every synonym).
    pub fn remove(&mut self, keyword: Keyword) -> &mut Self {
        let provider = self.provider;
        self.pairs.retain(|(key, _)| !keyword.matches(provider, key));
        self
    }

    fn set_matching(&mut self, matches: impl Fn(&str) -> bool, canonical: &str, value: String) {
        let mut seen = false;
        self.pairs.retain_mut(|(key, existing)| {
            if !matches(key) {
                return true;
            }
            if seen {
                return false;
            }
            seen = true;
            existing.clone_from(&value);
            true
        });
        if !seen {
            self.pairs.push((canonical.to_string(), value));
        }
    }

    /// Server host name.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.get(Keyword::Host)
    }

    /// Server port, falling back to the provider default.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidConnectionString`] if the port is not a number.
    pub fn port(&self) -> Result<Option<u16>> {
        match self.get(Keyword::Port) {
            Some(port) => port
                .parse()
                .map(Some)
                .map_err(|_| DataError::InvalidConnectionString(format!("invalid port '{port}'"))),
            None => Ok(self.provider.default_port()),
        }
    }

    /// Database name. For `SQLite` this is the file name.
    #[must_use]
    pub fn database(&self) -> Option<&str> {
        match self.provider {
            DatabaseProvider::Sqlite => self.file_name(),
            _ => self.get(Keyword::Database),
        }
    }

    /// Login name.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.get(Keyword::Username)
    }

    /// Login password.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.get(Keyword::Password)
    }

    /// `PostgreSQL` password file.
    #[must_use]
    pub fn passfile(&self) -> Option<&str> {
        self.get(Keyword::Passfile)
    }

    /// Application name.
    #[must_use]
    pub fn application_name(&self) -> Option<&str> {
        self.get(Keyword::ApplicationName)
    }

    /// Schema search path.
    #[must_use]
    pub fn search_path(&self) -> Option<&str> {
        self.get(Keyword::SearchPath)
    }

    /// Connect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidConnectionString`] if the timeout is not a
    /// whole number of seconds.
    pub fn timeout(&self) -> Result<Option<Duration>> {
        self.get(Keyword::Timeout)
            .map(|secs| {
                secs.parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| DataError::InvalidConnectionString(format!("invalid timeout '{secs}'")))
            })
            .transpose()
    }

    /// `SQLite` database file.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.get(Keyword::FileName)
    }

    /// Point the connection string at another database.
    ///
    /// Only the database keyword changes. `PostgreSQL` names are lower-cased
    /// because the server folds unquoted identifiers. For `SQLite` the name is
    /// a file, and [`SQLITE_FILE_EXTENSION`] is appended when it has no
    /// extension.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::ArgumentNull`] if `name` is blank.
    pub fn set_database(&mut self, name: &str) -> Result<&mut Self> {
        if name.trim().is_empty() {
            return Err(DataError::ArgumentNull("database"));
        }
        match self.provider {
            DatabaseProvider::Sqlite => {
                self.set(Keyword::FileName, sqlite_file_name(name.trim()));
            },
            provider => {
                self.set(Keyword::Database, provider.normalize_database_name(name));
            },
        }
        Ok(self)
    }

    /// Copy of this connection string pointing at `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::ArgumentNull`] if `name` is blank.
    pub fn with_database(&self, name: &str) -> Result<Self> {
        let mut copy = self.clone();
        copy.set_database(name)?;
        Ok(copy)
    }

    /// Replace the login credentials.
    ///
    /// A blank username or password removes that keyword.
    pub fn update_credentials(&mut self, username: &str, password: &str) -> &mut Self {
        for (keyword, value) in [(Keyword::Username, username), (Keyword::Password, password)] {
            if value.trim().is_empty() {
                self.remove(keyword);
            } else {
                self.set(keyword, value);
            }
        }
        self
    }

    /// The full connection string, password included.
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        self.render(false)
    }

    fn render(&self, redact: bool) -> String {
        let mut out = String::new();
        for (key, value) in &self.pairs {
            out.push_str(key);
            out.push('=');
            if redact && Keyword::Password.matches(self.provider, key) {
                out.push_str("*****");
            } else {
                out.push_str(&quote_if_needed(value));
            }
            out.push(';');
        }
        out
    }

    /// `PostgreSQL` connect options.
    ///
    /// Environment variables such as `PGHOST` and the user's `.pgpass` are
    /// ignored; only the connection string counts.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnsupportedProvider`] for other providers and
    /// [`DataError::InvalidConnectionString`] for an invalid port.
    pub fn to_pg_options(&self) -> Result<PgConnectOptions> {
        if self.provider != DatabaseProvider::PostgreSql {
            return Err(DataError::unsupported(self.provider, "PostgreSQL connect options"));
        }

        let mut options = PgConnectOptions::new_without_pgpass();
        if let Some(host) = self.host() {
            options = options.host(host);
        }
        if let Some(port) = self.port()? {
            options = options.port(port);
        }
        if let Some(database) = self.database() {
            options = options.database(database);
        }
        if let Some(username) = self.username() {
            options = options.username(username);
        }
        if let Some(password) = self.password() {
            options = options.password(password);
        }
        if let Some(application_name) = self.application_name() {
            options = options.application_name(application_name);
        }
        if let Some(search_path) = self.search_path() {
            options = options.options([("search_path", search_path)]);
        }
        Ok(options)
    }

    /// `SQLite` connect options. The file is created if missing.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnsupportedProvider`] for other providers and
    /// [`DataError::InvalidConnectionString`] when no file is named.
    pub fn to_sqlite_options(&self) -> Result<SqliteConnectOptions> {
        if self.provider != DatabaseProvider::Sqlite {
            return Err(DataError::unsupported(self.provider, "SQLite connect options"));
        }

        let file = self
            .file_name()
            .ok_or_else(|| DataError::InvalidConnectionString("missing Data Source".to_string()))?;
        let mut options = if file == ":memory:" {
            SqliteConnectOptions::new().in_memory(true)
        } else {
            SqliteConnectOptions::new().filename(file).create_if_missing(true)
        };
        if let Some(timeout) = self.timeout()? {
            options = options.busy_timeout(timeout);
        }
        Ok(options)
    }
}

impl fmt::Display for ConnectionStringBuilder {
    /// Renders the connection string with the password redacted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(true))
    }
}

impl fmt::Debug for ConnectionStringBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionStringBuilder")
            .field("provider", &self.provider)
            .field("connection_string", &self.render(true))
            .finish()
    }
}

/// Extensions accepted as an explicit `SQLite` file name.
pub const SQLITE_KNOWN_EXTENSIONS: &[&str] = &["sqlite", "sqlite3", "db", "db3"];

/// `SQLite` file name for a database name, adding [`SQLITE_FILE_EXTENSION`]
/// unless the name already ends in one of [`SQLITE_KNOWN_EXTENSIONS`].
///
/// Any other dotted suffix is part of the name: `acme.v2` becomes
/// `acme.v2.sqlite`.
#[must_use]
pub fn sqlite_file_name(name: &str) -> String {
    let known = Path::new(name)
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            SQLITE_KNOWN_EXTENSIONS
                .iter()
                .any(|known| extension.eq_ignore_ascii_case(known))
        });
    if name == ":memory:" || known {
        name.to_string()
    } else {
        format!("{name}{SQLITE_FILE_EXTENSION}")
    }
}

/// Split on `;` outside quotes.
fn split_segments(input: &str) -> Result<Vec<&str>> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut in_value = false;
    let mut chars = input.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        match (quote, ch) {
            (Some(open), c) if c == open => {
                if chars.peek().is_some_and(|&(_, next)| next == open) {
                    chars.next();
                } else {
                    quote = None;
                }
            },
            (Some(_), _) => {},
            (None, '=') if !in_value => in_value = true,
            (None, '"' | '\'') if in_value && value_is_empty(&input[start..index]) => {
                quote = Some(ch);
            },
            (None, ';') => {
                segments.push(&input[start..index]);
                start = index + 1;
                in_value = false;
            },
            _ => {},
        }
    }

    if quote.is_some() {
        return Err(DataError::InvalidConnectionString("unterminated quote".to_string()));
    }
    segments.push(&input[start..]);
    Ok(segments)
}

fn value_is_empty(segment: &str) -> bool {
    segment
        .split_once('=')
        .is_some_and(|(_, value)| value.trim().is_empty())
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            let inner = &value[1..value.len() - 1];
            let doubled: String = [quote, quote].iter().collect();
            return inner.replace(&doubled, &quote.to_string());
        }
    }
    value.to_string()
}

fn quote_if_needed(value: &str) -> String {
    let needs_quotes = value.contains(';')
        || value.starts_with(['"', '\''])
        || value != value.trim();
    if needs_quotes {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
