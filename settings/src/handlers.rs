//! Wiring of the settings handlers into a dispatcher.

use crate::settings::{
    GetSettingByName, GetSettingByNameHandler, GetSettingGroupByName, GetSettingGroupByNameHandler,
    GetSettingsByGroup, GetSettingsByGroupHandler, Setting, SettingGroup, SettingGroupRepository,
    SettingRepository,
};
use std::sync::Arc;
use whippet_runtime::{DispatchError, DispatcherBuilder};

/// The repositories behind application settings.
pub trait SettingsStore {
    /// Group storage
    type Groups: SettingGroupRepository;
    /// Setting storage
    type Settings: SettingRepository;

    /// Group repository.
    fn groups(&self) -> Arc<Self::Groups>;
    /// Setting repository.
    fn settings(&self) -> Arc<Self::Settings>;
}

/// Register every settings command and query handler backed by `store`.
///
/// # Errors
///
/// Returns [`DispatchError::DuplicateHandler`] if `builder` already serves
/// one of the settings messages.
pub fn register_handlers<S: SettingsStore>(
    builder: DispatcherBuilder,
    store: &S,
) -> Result<DispatcherBuilder, DispatchError> {
    let groups = store.groups();
    let settings = store.settings();

    let builder = builder
        .crud_handlers::<SettingGroup, _>(&groups)?
        .crud_handlers::<Setting, _>(&settings)?
        .query_handler::<GetSettingGroupByName, _>(GetSettingGroupByNameHandler::new(groups))?
        .query_handler::<GetSettingsByGroup, _>(GetSettingsByGroupHandler::new(Arc::clone(&settings)))?
        .query_handler::<GetSettingByName, _>(GetSettingByNameHandler::new(settings))?;

    tracing::debug!("Settings handlers registered");
    Ok(builder)
}
