//! In-memory addressing store for tests.
//!
//! Enforces the same unique keys as the installed schema: country
//! abbreviations, names within their parent and postal codes within a city.

use crate::addresses::{
    City, CityRepository, InvariantAddress, InvariantAddressRepository, PostalCode, PostalCodeRepository,
};
use crate::handlers::AddressingStore;
use crate::regions::{Country, CountryRepository, StateProvince, StateProvinceRepository};
use std::sync::Arc;
use uuid::Uuid;
use whippet_core::result::WhippetResult;
use whippet_testing::InMemoryRepository;

impl CountryRepository for InMemoryRepository<Country> {
    async fn get_by_abbreviation(&self, abbreviation: &str) -> WhippetResult<Option<Country>> {
        Ok(self
            .find(|country| country.abbreviation.eq_ignore_ascii_case(abbreviation))?
            .into_iter()
            .next())
    }
}

impl StateProvinceRepository for InMemoryRepository<StateProvince> {
    async fn get_by_name(&self, name: &str, country_id: Uuid) -> WhippetResult<Option<StateProvince>> {
        Ok(self
            .find(|state| state.country_id == country_id && state.name.eq_ignore_ascii_case(name))?
            .into_iter()
            .next())
    }
}

impl CityRepository for InMemoryRepository<City> {
    async fn get_by_state_province(&self, state_province_id: Uuid) -> WhippetResult<Vec<City>> {
        self.find(|city| city.state_province_id == state_province_id)
    }
}

impl PostalCodeRepository for InMemoryRepository<PostalCode> {
    async fn get_by_city(&self, city_id: Uuid) -> WhippetResult<Vec<PostalCode>> {
        self.find(|code| code.city_id == city_id)
    }
}

impl InvariantAddressRepository for InMemoryRepository<InvariantAddress> {}

/// An [`AddressingStore`] keeping every entity in memory.
#[derive(Debug, Clone)]
pub struct InMemoryAddressingStore {
    /// Countries
    pub countries: Arc<InMemoryRepository<Country>>,
    /// States and provinces
    pub state_provinces: Arc<InMemoryRepository<StateProvince>>,
    /// Cities
    pub cities: Arc<InMemoryRepository<City>>,
    /// Postal codes
    pub postal_codes: Arc<InMemoryRepository<PostalCode>>,
    /// Addresses
    pub addresses: Arc<InMemoryRepository<InvariantAddress>>,
}

impl InMemoryAddressingStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for InMemoryAddressingStore {
    fn default() -> Self {
        Self {
            countries: Arc::new(InMemoryRepository::new().unique_by(
                "countries_abbreviation_key",
                |country: &Country| country.abbreviation.to_lowercase(),
            )),
            state_provinces: Arc::new(InMemoryRepository::new().unique_by(
                "state_provinces_country_id_name_key",
                |state: &StateProvince| format!("{}/{}", state.country_id, state.name.to_lowercase()),
            )),
            cities: Arc::new(InMemoryRepository::new().unique_by(
                "cities_state_province_id_name_key",
                |city: &City| format!("{}/{}", city.state_province_id, city.name.to_lowercase()),
            )),
            postal_codes: Arc::new(InMemoryRepository::new().unique_by(
                "postal_codes_city_id_value_key",
                |code: &PostalCode| format!("{}/{}", code.city_id, code.value.to_lowercase()),
            )),
            addresses: Arc::new(InMemoryRepository::new()),
        }
    }
}

impl AddressingStore for InMemoryAddressingStore {
    type Countries = InMemoryRepository<Country>;
    type StateProvinces = InMemoryRepository<StateProvince>;
    type Cities = InMemoryRepository<City>;
    type PostalCodes = InMemoryRepository<PostalCode>;
    type Addresses = InMemoryRepository<InvariantAddress>;

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
