//! Wiring of the addressing handlers into a dispatcher.

use crate::addresses::{
    City, CityRepository, GetCitiesByStateProvince, GetCitiesByStateProvinceHandler, GetPostalCodesByCity,
    GetPostalCodesByCityHandler, InvariantAddress, InvariantAddressRepository, PostalCode,
    PostalCodeRepository,
};
use crate::regions::{
    Country, CountryRepository, GetCountryByAbbreviation, GetCountryByAbbreviationHandler,
    GetStateProvinceByName, GetStateProvinceByNameHandler, StateProvince, StateProvinceRepository,
};
use std::sync::Arc;
use whippet_runtime::{DispatchError, DispatcherBuilder};

/// The repositories behind addressing.
pub trait AddressingStore {
    /// Country storage
    type Countries: CountryRepository;
    /// State and province storage
    type StateProvinces: StateProvinceRepository;
    /// City storage
    type Cities: CityRepository;
    /// Postal code storage
    type PostalCodes: PostalCodeRepository;
    /// Address storage
    type Addresses: InvariantAddressRepository;

    /// Country repository.
    fn countries(&self) -> Arc<Self::Countries>;
    /// State and province repository.
    fn state_provinces(&self) -> Arc<Self::StateProvinces>;
    /// City repository.
    fn cities(&self) -> Arc<Self::Cities>;
    /// Postal code repository.
    fn postal_codes(&self) -> Arc<Self::PostalCodes>;
    /// Address repository.
    fn addresses(&self) -> Arc<Self::Addresses>;
}

/// Register every addressing command and query handler backed by `store`.
///
/// # Errors
///
/// Returns [`DispatchError::DuplicateHandler`] if `builder` already serves
/// one of the addressing messages.
pub fn register_handlers<S: AddressingStore>(
    builder: DispatcherBuilder,
    store: &S,
) -> Result<DispatcherBuilder, DispatchError> {
    let countries = store.countries();
    let state_provinces = store.state_provinces();
    let cities = store.cities();
    let postal_codes = store.postal_codes();

    let builder = builder
        .crud_handlers::<Country, _>(&countries)?
        .crud_handlers::<StateProvince, _>(&state_provinces)?
        .crud_handlers::<City, _>(&cities)?
        .crud_handlers::<PostalCode, _>(&postal_codes)?
        .crud_handlers::<InvariantAddress, _>(&store.addresses())?
        .query_handler::<GetCountryByAbbreviation, _>(GetCountryByAbbreviationHandler::new(countries))?
        .query_handler::<GetStateProvinceByName, _>(GetStateProvinceByNameHandler::new(state_provinces))?
        .query_handler::<GetCitiesByStateProvince, _>(GetCitiesByStateProvinceHandler::new(cities))?
        .query_handler::<GetPostalCodesByCity, _>(GetPostalCodesByCityHandler::new(postal_codes))?;

    tracing::debug!("Addressing handlers registered");
    Ok(builder)
}
