//! Cities, postal codes and culture-invariant street addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;
use whippet_core::cqrs::{Query, QueryHandler, QueryParameter};
use whippet_core::environment::Clock;
use whippet_core::repository::{Entity, Repository};
use whippet_core::result::{WhippetResult, require_not_blank};

/// A city within a state or province.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct City {
    /// City id
    pub id: Uuid,
    /// Owning state or province
    pub state_province_id: Uuid,
    /// Name, unique within the state or province
    pub name: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl City {
    /// New city with a random id.
    #[must_use]
    pub fn new(state_province_id: Uuid, name: impl Into<String>, clock: &impl Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            state_province_id,
            name: name.into(),
            created_at: clock.now(),
        }
    }
}

impl Entity for City {
    type Id = Uuid;

    const ENTITY_NAME: &'static str = "City";

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> WhippetResult {
        require_not_blank(&self.name, "name")
    }
}

/// A postal code served by a city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct PostalCode {
    /// Postal code id
    pub id: Uuid,
    /// City the code belongs to
    pub city_id: Uuid,
    /// The code as written, unique within the city
    pub value: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl PostalCode {
    /// New postal code with a random id.
    #[must_use]
    pub fn new(city_id: Uuid, value: impl Into<String>, clock: &impl Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            city_id,
            value: value.into(),
            created_at: clock.now(),
        }
    }
}

impl Entity for PostalCode {
    type Id = Uuid;

    const ENTITY_NAME: &'static str = "PostalCode";

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> WhippetResult {
        require_not_blank(&self.value, "value")
    }
}

/// A street address stored without culture-specific formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct InvariantAddress {
    /// Address id
    pub id: Uuid,
    /// First street line
    pub line_one: String,
    /// Second street line
    pub line_two: Option<String>,
    /// City
    pub city_id: Uuid,
    /// Postal code, where the country uses them
    pub postal_code_id: Option<Uuid>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl InvariantAddress {
    /// New single-line address with a random id.
    #[must_use]
    pub fn new(line_one: impl Into<String>, city_id: Uuid, clock: &impl Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            line_one: line_one.into(),
            line_two: None,
            city_id,
            postal_code_id: None,
            created_at: clock.now(),
        }
    }

    /// Set the second street line.
    #[must_use]
    pub fn with_line_two(mut self, line_two: impl Into<String>) -> Self {
        self.line_two = Some(line_two.into());
        self
    }

    /// Set the postal code.
    #[must_use]
    pub const fn with_postal_code(mut self, postal_code_id: Uuid) -> Self {
        self.postal_code_id = Some(postal_code_id);
        self
    }
}

impl Entity for InvariantAddress {
    type Id = Uuid;

    const ENTITY_NAME: &'static str = "InvariantAddress";

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> WhippetResult {
        require_not_blank(&self.line_one, "line_one")
    }
}

/// City storage.
pub trait CityRepository: Repository<City> {
    /// Every city of a state or province.
    fn get_by_state_province(
        &self,
        state_province_id: Uuid,
    ) -> impl Future<Output = WhippetResult<Vec<City>>> + Send;
}

/// Postal code storage.
pub trait PostalCodeRepository: Repository<PostalCode> {
    /// Every postal code of a city.
    fn get_by_city(&self, city_id: Uuid) -> impl Future<Output = WhippetResult<Vec<PostalCode>>> + Send;
}

/// Address storage.
pub trait InvariantAddressRepository: Repository<InvariantAddress> {}

/// Every city of a state or province.
#[derive(Debug, Clone)]
pub struct GetCitiesByStateProvince {
    /// State or province id
    pub state_province_id: Uuid,
}

impl GetCitiesByStateProvince {
    /// Create the query.
    #[must_use]
    pub const fn new(state_province_id: Uuid) -> Self {
        Self { state_province_id }
    }
}

impl Query for GetCitiesByStateProvince {
    type Entity = City;

    fn parameters(&self) -> Vec<QueryParameter> {
        vec![("state_province_id", Value::String(self.state_province_id.to_string()))]
    }
}

/// Handles [`GetCitiesByStateProvince`].
#[derive(Debug)]
pub struct GetCitiesByStateProvinceHandler<R> {
    repository: Arc<R>,
}

impl<R> GetCitiesByStateProvinceHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: CityRepository> QueryHandler<GetCitiesByStateProvince> for GetCitiesByStateProvinceHandler<R> {
    async fn handle(&self, query: GetCitiesByStateProvince) -> WhippetResult<Vec<City>> {
        self.repository.get_by_state_province(query.state_province_id).await
    }
}

/// Every postal code of a city.
#[derive(Debug, Clone)]
pub struct GetPostalCodesByCity {
    /// City id
    pub city_id: Uuid,
}

impl GetPostalCodesByCity {
    /// Create the query.
    #[must_use]
    pub const fn new(city_id: Uuid) -> Self {
        Self { city_id }
    }
}

impl Query for GetPostalCodesByCity {
    type Entity = PostalCode;

    fn parameters(&self) -> Vec<QueryParameter> {
        vec![("city_id", Value::String(self.city_id.to_string()))]
    }
}

/// Handles [`GetPostalCodesByCity`].
#[derive(Debug)]
pub struct GetPostalCodesByCityHandler<R> {
    repository: Arc<R>,
}

impl<R> GetPostalCodesByCityHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: PostalCodeRepository> QueryHandler<GetPostalCodesByCity> for GetPostalCodesByCityHandler<R> {
    async fn handle(&self, query: GetPostalCodesByCity) -> WhippetResult<Vec<PostalCode>> {
        self.repository.get_by_city(query.city_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whippet_core::result::WhippetError;
    use whippet_testing::test_clock;

    #[test]
    fn address_needs_a_first_line() {
        let city = Uuid::new_v4();
        let address = InvariantAddress::new(" ", city, &test_clock());
        assert_eq!(address.validate(), Err(WhippetError::argument_null("line_one")));

        let postal_code = Uuid::new_v4();
        let address = InvariantAddress::new("1 Main St", city, &test_clock())
            .with_line_two("Suite 200")
            .with_postal_code(postal_code);
        assert_eq!(address.validate(), Ok(()));
        assert_eq!(address.postal_code_id, Some(postal_code));
    }

    #[test]
    fn blank_postal_code_is_rejected() {
        let code = PostalCode::new(Uuid::new_v4(), "", &test_clock());
        assert_eq!(code.validate(), Err(WhippetError::argument_null("value")));
    }
}
