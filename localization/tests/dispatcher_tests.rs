//! Addressing handlers routed through a dispatcher over the in-memory store.

#![allow(clippy::unwrap_used)] // Test code

use std::sync::Arc;
use whippet_core::crud::{Create, Delete, GetById, Update};
use whippet_core::result::WhippetError;
use whippet_localization::mocks::InMemoryAddressingStore;
use whippet_localization::{
    City, Country, CountrySeeder, GetCitiesByStateProvince, GetCountryByAbbreviation, GetPostalCodesByCity,
    GetStateProvinceByName, InvariantAddress, PostalCode, StateProvince, register_handlers,
};
use whippet_runtime::Dispatcher;
use whippet_testing::test_clock;

fn dispatcher(store: &InMemoryAddressingStore) -> Dispatcher {
    register_handlers(Dispatcher::builder(), store).unwrap().build()
}

#[tokio::test]
async fn address_is_built_from_seeded_country_down() {
    let store = InMemoryAddressingStore::new();
    let dispatcher = dispatcher(&store);
    let clock = test_clock();

    CountrySeeder::new(Arc::clone(&store.countries), test_clock())
        .seed()
        .await
        .unwrap();
    let canada = dispatcher
        .query(GetCountryByAbbreviation::new("ca"))
        .await
        .unwrap()
        .pop()
        .unwrap();
    assert_eq!(canada.name, "Canada");

    let ontario = StateProvince::new(canada.id, "Ontario", &clock).with_abbreviation("ON");
    dispatcher.send(Create::new(ontario.clone())).await.unwrap();
    let found = dispatcher
        .query(GetStateProvinceByName::new("ONTARIO", canada.id))
        .await
        .unwrap();
    assert_eq!(found, vec![ontario.clone()]);

    let toronto = City::new(ontario.id, "Toronto", &clock);
    dispatcher.send(Create::new(toronto.clone())).await.unwrap();
    let code = PostalCode::new(toronto.id, "M5V 2T6", &clock);
    dispatcher.send(Create::new(code.clone())).await.unwrap();

    assert_eq!(
        dispatcher.query(GetCitiesByStateProvince::new(ontario.id)).await.unwrap(),
        vec![toronto.clone()]
    );
    assert_eq!(
        dispatcher.query(GetPostalCodesByCity::new(toronto.id)).await.unwrap(),
        vec![code.clone()]
    );

    let address = InvariantAddress::new("290 Bremner Blvd", toronto.id, &clock).with_postal_code(code.id);
    dispatcher.send(Create::new(address.clone())).await.unwrap();
    let moved = address.clone().with_line_two("Level 2");
    dispatcher.send(Update::new(moved.clone())).await.unwrap();
    assert_eq!(
        dispatcher.query(GetById::<InvariantAddress>::new(address.id)).await.unwrap(),
        vec![moved]
    );

    dispatcher.send(Delete::<InvariantAddress>::new(address.id)).await.unwrap();
    assert!(store.addresses.is_empty());
}

#[tokio::test]
async fn state_names_are_scoped_to_their_country() {
    let store = InMemoryAddressingStore::new();
    let dispatcher = dispatcher(&store);
    let clock = test_clock();

    let australia = Country::new("Australia", "AU", &clock);
    let brazil = Country::new("Brazil", "BR", &clock);
    dispatcher.send(Create::new(australia.clone())).await.unwrap();
    dispatcher.send(Create::new(brazil.clone())).await.unwrap();

    dispatcher
        .send(Create::new(StateProvince::new(australia.id, "Victoria", &clock)))
        .await
        .unwrap();
    assert!(
        dispatcher
            .query(GetStateProvinceByName::new("Victoria", brazil.id))
            .await
            .unwrap()
            .is_empty()
    );

    let duplicate = dispatcher
        .send(Create::new(StateProvince::new(australia.id, "VICTORIA", &clock)))
        .await;
    assert!(matches!(duplicate, Err(WhippetError::Conflict(message)) if message.contains("state_provinces_country_id_name_key")));

    let country = dispatcher.send(Create::new(Country::new("Austria", "au", &clock))).await;
    assert!(matches!(country, Err(WhippetError::Conflict(_))));
}

#[tokio::test]
async fn malformed_country_code_is_rejected() {
    let store = InMemoryAddressingStore::new();
    let dispatcher = dispatcher(&store);

    let result = dispatcher
        .send(Create::new(Country::new("Nowhere", "N0", &test_clock())))
        .await;

    assert!(result.unwrap_err().is_validation());
    assert!(store.countries.is_empty());
}

#[test]
fn every_message_is_served() {
    let dispatcher = dispatcher(&InMemoryAddressingStore::new());

    assert!(dispatcher.has_command_handler::<Create<InvariantAddress>>());
    assert!(dispatcher.has_query_handler::<GetPostalCodesByCity>());
    // 5 entities x 5 CRUD messages + 4 lookups
    assert_eq!(dispatcher.len(), 29);
}
