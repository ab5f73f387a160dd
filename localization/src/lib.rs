//! # Whippet Localization
//!
//! Postal addressing: countries, their states or provinces, cities, postal
//! codes, and street addresses stored without culture-specific formatting
//! ([`InvariantAddress`]).
//!
//! [`CountrySeeder`] fills an empty installation with a default country
//! list. [`register_handlers`] binds the CRUD messages of every entity plus
//! the lookups (country by abbreviation, state or province by name, cities
//! of a state, postal codes of a city).
//!
//! ## Features
//!
//! - `test-utils` (default): in-memory repositories ([`mocks`])
//! - `postgres`: repositories over the `whippet` schema ([`stores::postgres`])

pub mod addresses;
pub mod handlers;
pub mod regions;
pub mod seed;
pub mod stores;

#[cfg(feature = "test-utils")]
pub mod mocks;

// Re-exports
pub use addresses::{
    City, CityRepository, GetCitiesByStateProvince, GetPostalCodesByCity, InvariantAddress,
    InvariantAddressRepository, PostalCode, PostalCodeRepository,
};
pub use handlers::{AddressingStore, register_handlers};
pub use regions::{
    Country, CountryRepository, GetCountryByAbbreviation, GetStateProvinceByName, StateProvince,
    StateProvinceRepository,
};
pub use seed::{CountrySeeder, DEFAULT_COUNTRIES};
