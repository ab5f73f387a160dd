//! `PostgreSQL` addressing store over the `whippet` schema.

use crate::addresses::{
    City, CityRepository, InvariantAddress, InvariantAddressRepository, PostalCode, PostalCodeRepository,
};
use crate::handlers::AddressingStore;
use crate::regions::{Country, CountryRepository, StateProvince, StateProvinceRepository};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;
use whippet_core::result::WhippetResult;
use whippet_data::PostgresConnection;
use whippet_data::repository::{PgEntity, PgQuery, PostgresRepository};

impl PgEntity for Country {
    const TABLE: &'static str = "whippet.countries";
    const COLUMNS: &'static [&'static str] = &["id", "name", "abbreviation", "created_at"];

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.id)
            .bind(&self.name)
            .bind(&self.abbreviation)
            .bind(self.created_at)
    }
}

impl PgEntity for StateProvince {
    const TABLE: &'static str = "whippet.state_provinces";
    const COLUMNS: &'static [&'static str] = &["id", "country_id", "name", "abbreviation", "created_at"];

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.id)
            .bind(self.country_id)
            .bind(&self.name)
            .bind(&self.abbreviation)
            .bind(self.created_at)
    }
}

impl PgEntity for City {
    const TABLE: &'static str = "whippet.cities";
    const COLUMNS: &'static [&'static str] = &["id", "state_province_id", "name", "created_at"];

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.id)
            .bind(self.state_province_id)
            .bind(&self.name)
            .bind(self.created_at)
    }
}

impl PgEntity for PostalCode {
    const TABLE: &'static str = "whippet.postal_codes";
    const COLUMNS: &'static [&'static str] = &["id", "city_id", "value", "created_at"];

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.id)
            .bind(self.city_id)
            .bind(&self.value)
            .bind(self.created_at)
    }
}

impl PgEntity for InvariantAddress {
    const TABLE: &'static str = "whippet.invariant_addresses";
    const COLUMNS: &'static [&'static str] =
        &["id", "line_one", "line_two", "city_id", "postal_code_id", "created_at"];

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.id)
            .bind(&self.line_one)
            .bind(&self.line_two)
            .bind(self.city_id)
            .bind(self.postal_code_id)
            .bind(self.created_at)
    }
}

impl CountryRepository for PostgresRepository<Country> {
    async fn get_by_abbreviation(&self, abbreviation: &str) -> WhippetResult<Option<Country>> {
        Ok(self
            .find_ignoring_case("abbreviation", abbreviation)
            .await?
            .into_iter()
            .next())
    }
}

impl StateProvinceRepository for PostgresRepository<StateProvince> {
    async fn get_by_name(&self, name: &str, country_id: Uuid) -> WhippetResult<Option<StateProvince>> {
        Ok(self
            .find_in_parent_ignoring_case("country_id", country_id, "name", name)
            .await?
            .into_iter()
            .next())
    }
}

impl CityRepository for PostgresRepository<City> {
    async fn get_by_state_province(&self, state_province_id: Uuid) -> WhippetResult<Vec<City>> {
        self.find_by_uuid("state_province_id", state_province_id).await
    }
}

impl PostalCodeRepository for PostgresRepository<PostalCode> {
    async fn get_by_city(&self, city_id: Uuid) -> WhippetResult<Vec<PostalCode>> {
        self.find_by_uuid("city_id", city_id).await
    }
}

impl InvariantAddressRepository for PostgresRepository<InvariantAddress> {}

/// An [`AddressingStore`] over the `whippet` schema.
#[derive(Debug, Clone)]
pub struct PostgresAddressingStore {
    countries: Arc<PostgresRepository<Country>>,
    state_provinces: Arc<PostgresRepository<StateProvince>>,
    cities: Arc<PostgresRepository<City>>,
    postal_codes: Arc<PostgresRepository<PostalCode>>,
    addresses: Arc<PostgresRepository<InvariantAddress>>,
}

impl PostgresAddressingStore {
    /// Create a store whose repositories share `pool`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            countries: Arc::new(PostgresRepository::new(pool.clone())),
            state_provinces: Arc::new(PostgresRepository::new(pool.clone())),
            cities: Arc::new(PostgresRepository::new(pool.clone())),
            postal_codes: Arc::new(PostgresRepository::new(pool.clone())),
            addresses: Arc::new(PostgresRepository::new(pool)),
        }
    }

    /// Create a store over an open connection's pool.
    #[must_use]
    pub fn from_connection(connection: &PostgresConnection) -> Self {
        Self::new(connection.pool().clone())
    }
}

impl AddressingStore for PostgresAddressingStore {
    type Countries = PostgresRepository<Country>;
    type StateProvinces = PostgresRepository<StateProvince>;
    type Cities = PostgresRepository<City>;
    type PostalCodes = PostgresRepository<PostalCode>;
    type Addresses = PostgresRepository<InvariantAddress>;

    fn countries(&self) -> Arc<Self::Countries> {
        Arc::clone(&self.countries)
    }

    fn state_provinces(&self) -> Arc<Self::StateProvinces> {
        Arc::clone(&self.state_provinces)
    }

    fn cities(&self) -> Arc<Self::Cities> {
        Arc::clone(&self.cities)
    }

    fn postal_codes(&self) -> Arc<Self::PostalCodes> {
        Arc::clone(&self.postal_codes)
    }

    fn addresses(&self) -> Arc<Self::Addresses> {
        Arc::clone(&self.addresses)
    }
}
