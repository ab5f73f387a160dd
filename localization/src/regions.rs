//! Countries and their states or provinces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;
use whippet_core::cqrs::{Query, QueryHandler, QueryParameter};
use whippet_core::environment::Clock;
use whippet_core::repository::{Entity, Repository};
use whippet_core::result::{ResultContainerExt, WhippetError, WhippetResult, require_not_blank};

/// A country, identified by its ISO 3166-1 alpha-2 code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Country {
    /// Country id
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Unique two or three letter code
    pub abbreviation: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Country {
    /// New country with a random id.
    #[must_use]
    pub fn new(name: impl Into<String>, abbreviation: impl Into<String>, clock: &impl Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            abbreviation: abbreviation.into(),
            created_at: clock.now(),
        }
    }
}

impl Entity for Country {
    type Id = Uuid;

    const ENTITY_NAME: &'static str = "Country";

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> WhippetResult {
        require_not_blank(&self.name, "name")?;
        validate_abbreviation(&self.abbreviation)
    }
}

/// A state, province or similar first-level subdivision of a country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct StateProvince {
    /// State or province id
    pub id: Uuid,
    /// Owning country
    pub country_id: Uuid,
    /// Name, unique within the country
    pub name: String,
    /// Postal abbreviation, if the country uses one
    pub abbreviation: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl StateProvince {
    /// New state or province with a random id.
    #[must_use]
    pub fn new(country_id: Uuid, name: impl Into<String>, clock: &impl Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            country_id,
            name: name.into(),
            abbreviation: None,
            created_at: clock.now(),
        }
    }

    /// Set the postal abbreviation.
    #[must_use]
    pub fn with_abbreviation(mut self, abbreviation: impl Into<String>) -> Self {
        self.abbreviation = Some(abbreviation.into());
        self
    }
}

impl Entity for StateProvince {
    type Id = Uuid;

    const ENTITY_NAME: &'static str = "StateProvince";

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> WhippetResult {
        require_not_blank(&self.name, "name")?;
        self.abbreviation.as_deref().map_or(Ok(()), validate_abbreviation)
    }
}

fn validate_abbreviation(abbreviation: &str) -> WhippetResult {
    require_not_blank(abbreviation, "abbreviation")?;
    let length = abbreviation.chars().count();
    if !(2..=3).contains(&length) || !abbreviation.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(WhippetError::validation(
            "abbreviation",
            format!("'{abbreviation}' must be two or three letters"),
        ));
    }
    Ok(())
}

/// Country storage.
pub trait CountryRepository: Repository<Country> {
    /// Find a country by abbreviation, ignoring case.
    fn get_by_abbreviation(
        &self,
        abbreviation: &str,
    ) -> impl Future<Output = WhippetResult<Option<Country>>> + Send;
}

/// State and province storage.
pub trait StateProvinceRepository: Repository<StateProvince> {
    /// Find a state or province of a country by name, ignoring case.
    fn get_by_name(
        &self,
        name: &str,
        country_id: Uuid,
    ) -> impl Future<Output = WhippetResult<Option<StateProvince>>> + Send;
}

/// Look up a country by abbreviation.
#[derive(Debug, Clone)]
pub struct GetCountryByAbbreviation {
    /// Country code, matched ignoring case
    pub abbreviation: String,
}

impl GetCountryByAbbreviation {
    /// Create the query.
    #[must_use]
    pub fn new(abbreviation: impl Into<String>) -> Self {
        Self {
            abbreviation: abbreviation.into(),
        }
    }
}

impl Query for GetCountryByAbbreviation {
    type Entity = Country;

    fn parameters(&self) -> Vec<QueryParameter> {
        vec![("abbreviation", Value::String(self.abbreviation.clone()))]
    }
}

/// Handles [`GetCountryByAbbreviation`].
#[derive(Debug)]
pub struct GetCountryByAbbreviationHandler<R> {
    repository: Arc<R>,
}

impl<R> GetCountryByAbbreviationHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: CountryRepository> QueryHandler<GetCountryByAbbreviation> for GetCountryByAbbreviationHandler<R> {
    async fn handle(&self, query: GetCountryByAbbreviation) -> WhippetResult<Vec<Country>> {
        require_not_blank(&query.abbreviation, "abbreviation")?;
        self.repository
            .get_by_abbreviation(&query.abbreviation)
            .await
            .into_enumerable()
    }
}

/// Look up a state or province by name within a country.
#[derive(Debug, Clone)]
pub struct GetStateProvinceByName {
    /// Name, matched ignoring case
    pub name: String,
    /// Country the state or province belongs to
    pub country_id: Uuid,
}

impl GetStateProvinceByName {
    /// Create the query.
    #[must_use]
    pub fn new(name: impl Into<String>, country_id: Uuid) -> Self {
        Self {
            name: name.into(),
            country_id,
        }
    }
}

impl Query for GetStateProvinceByName {
    type Entity = StateProvince;

    fn parameters(&self) -> Vec<QueryParameter> {
        vec![
            ("name", Value::String(self.name.clone())),
            ("country_id", Value::String(self.country_id.to_string())),
        ]
    }
}

/// Handles [`GetStateProvinceByName`].
#[derive(Debug)]
pub struct GetStateProvinceByNameHandler<R> {
    repository: Arc<R>,
}

impl<R> GetStateProvinceByNameHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: StateProvinceRepository> QueryHandler<GetStateProvinceByName> for GetStateProvinceByNameHandler<R> {
    async fn handle(&self, query: GetStateProvinceByName) -> WhippetResult<Vec<StateProvince>> {
        require_not_blank(&query.name, "name")?;
        self.repository
            .get_by_name(&query.name, query.country_id)
            .await
            .into_enumerable()
    }
}
