//! Settings handlers routed through a dispatcher over the in-memory store.

#![allow(clippy::unwrap_used)] // Test code

use uuid::Uuid;
use whippet_core::crud::{Create, GetAll, Update};
use whippet_core::result::WhippetError;
use whippet_runtime::Dispatcher;
use whippet_settings::mocks::InMemorySettingsStore;
use whippet_settings::{
    GetSettingByName, GetSettingGroupByName, GetSettingsByGroup, Setting, SettingGroup, register_handlers,
};
use whippet_testing::test_clock;

fn dispatcher(store: &InMemorySettingsStore) -> Dispatcher {
    register_handlers(Dispatcher::builder(), store).unwrap().build()
}

#[tokio::test]
async fn settings_are_looked_up_within_their_group() {
    let store = InMemorySettingsStore::new();
    let dispatcher = dispatcher(&store);
    let clock = test_clock();

    let mail = SettingGroup::new("Mail", &clock);
    let ui = SettingGroup::new("UI", &clock);
    dispatcher.send(Create::new(mail.clone())).await.unwrap();
    dispatcher.send(Create::new(ui.clone())).await.unwrap();

    let host = Setting::new(mail.id, "Host", Some("smtp.local".to_string()), &clock);
    dispatcher.send(Create::new(host.clone())).await.unwrap();
    dispatcher
        .send(Create::new(Setting::new(ui.id, "Host", None, &clock)))
        .await
        .unwrap();

    let found = dispatcher.query(GetSettingByName::new(mail.id, "HOST")).await.unwrap();
    assert_eq!(found, vec![host.clone()]);
    assert!(
        dispatcher
            .query(GetSettingByName::new(Uuid::new_v4(), "Host"))
            .await
            .unwrap()
            .is_empty()
    );

    let changed = Setting {
        value: Some("smtp.example.org".to_string()),
        ..host
    };
    dispatcher.send(Update::new(changed.clone())).await.unwrap();
    assert_eq!(
        dispatcher.query(GetSettingsByGroup::new(mail.id)).await.unwrap(),
        vec![changed]
    );
    assert_eq!(dispatcher.query(GetAll::<Setting>::new()).await.unwrap().len(), 2);

    let groups = dispatcher.query(GetSettingGroupByName::new("mail")).await.unwrap();
    assert_eq!(groups, vec![mail]);
}

#[tokio::test]
async fn duplicate_setting_names_conflict_within_a_group() {
    let store = InMemorySettingsStore::new();
    let dispatcher = dispatcher(&store);
    let clock = test_clock();
    let group = SettingGroup::new("Mail", &clock);

    dispatcher
        .send(Create::new(Setting::new(group.id, "Port", Some("25".to_string()), &clock)))
        .await
        .unwrap();
    let duplicate = dispatcher
        .send(Create::new(Setting::new(group.id, "port", Some("587".to_string()), &clock)))
        .await;

    assert!(matches!(duplicate, Err(WhippetError::Conflict(message)) if message.contains("settings_group_id_name_key")));
    assert_eq!(
        dispatcher.query(GetSettingByName::new(group.id, " ")).await,
        Err(WhippetError::argument_null("name"))
    );
}

#[test]
fn every_message_is_served() {
    let dispatcher = dispatcher(&InMemorySettingsStore::new());

    assert!(dispatcher.has_query_handler::<GetSettingByName>());
    // 2 entities x 5 CRUD messages + 3 lookups
    assert_eq!(dispatcher.len(), 13);
}
