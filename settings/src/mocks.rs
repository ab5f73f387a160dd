//! In-memory settings store for tests.

use crate::handlers::SettingsStore;
use crate::settings::{Setting, SettingGroup, SettingGroupRepository, SettingRepository};
use std::sync::Arc;
use uuid::Uuid;
use whippet_core::result::WhippetResult;
use whippet_testing::InMemoryRepository;

impl SettingGroupRepository for InMemoryRepository<SettingGroup> {
    async fn get_by_name(&self, name: &str) -> WhippetResult<Option<SettingGroup>> {
        Ok(self
            .find(|group| group.name.eq_ignore_ascii_case(name))?
            .into_iter()
            .next())
    }
}

impl SettingRepository for InMemoryRepository<Setting> {
    async fn get_by_group(&self, group_id: Uuid) -> WhippetResult<Vec<Setting>> {
        self.find(|setting| setting.group_id == group_id)
    }

    async fn get_by_name(&self, group_id: Uuid, name: &str) -> WhippetResult<Option<Setting>> {
        Ok(self
            .find(|setting| setting.group_id == group_id && setting.name.eq_ignore_ascii_case(name))?
            .into_iter()
            .next())
    }
}

/// A [`SettingsStore`] keeping groups and settings in memory.
#[derive(Debug, Clone)]
pub struct InMemorySettingsStore {
    /// Setting groups
    pub groups: Arc<InMemoryRepository<SettingGroup>>,
    /// Settings
    pub settings: Arc<InMemoryRepository<Setting>>,
}

impl InMemorySettingsStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for InMemorySettingsStore {
    fn default() -> Self {
        Self {
            groups: Arc::new(
                InMemoryRepository::new()
                    .unique_by("setting_groups_name_key", |group: &SettingGroup| group.name.to_lowercase()),
            ),
            settings: Arc::new(InMemoryRepository::new().unique_by(
                "settings_group_id_name_key",
                |setting: &Setting| format!("{}/{}", setting.group_id, setting.name.to_lowercase()),
            )),
        }
    }
}

impl SettingsStore for InMemorySettingsStore {
    type Groups = InMemoryRepository<SettingGroup>;
    type Settings = InMemoryRepository<Setting>;

    fn groups(&self) -> Arc<Self::Groups> {
        Arc::clone(&self.groups)
    }

    fn settings(&self) -> Arc<Self::Settings> {
        Arc::clone(&self.settings)
    }
}
