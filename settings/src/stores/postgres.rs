//! `PostgreSQL` settings store over the `whippet` schema.

use crate::handlers::SettingsStore;
use crate::settings::{Setting, SettingGroup, SettingGroupRepository, SettingRepository};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;
use whippet_core::result::WhippetResult;
use whippet_data::PostgresConnection;
use whippet_data::repository::{PgEntity, PgQuery, PostgresRepository};

impl PgEntity for SettingGroup {
    const TABLE: &'static str = "whippet.setting_groups";
    const COLUMNS: &'static [&'static str] = &["id", "name", "description", "created_at"];

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.id)
            .bind(&self.name)
            .bind(&self.description)
            .bind(self.created_at)
    }
}

impl PgEntity for Setting {
    const TABLE: &'static str = "whippet.settings";
    const COLUMNS: &'static [&'static str] = &["id", "group_id", "name", "value", "created_at"];

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.id)
            .bind(self.group_id)
            .bind(&self.name)
            .bind(&self.value)
            .bind(self.created_at)
    }
}

impl SettingGroupRepository for PostgresRepository<SettingGroup> {
    async fn get_by_name(&self, name: &str) -> WhippetResult<Option<SettingGroup>> {
        Ok(self.find_ignoring_case("name", name).await?.into_iter().next())
    }
}

impl SettingRepository for PostgresRepository<Setting> {
    async fn get_by_group(&self, group_id: Uuid) -> WhippetResult<Vec<Setting>> {
        self.find_by_uuid("group_id", group_id).await
    }

    async fn get_by_name(&self, group_id: Uuid, name: &str) -> WhippetResult<Option<Setting>> {
        Ok(self
            .find_in_parent_ignoring_case("group_id", group_id, "name", name)
            .await?
            .into_iter()
            .next())
    }
}

/// A [`SettingsStore`] over the `whippet` schema.
#[derive(Debug, Clone)]
pub struct PostgresSettingsStore {
    groups: Arc<PostgresRepository<SettingGroup>>,
    settings: Arc<PostgresRepository<Setting>>,
}

impl PostgresSettingsStore {
    /// Create a store whose repositories share `pool`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            groups: Arc::new(PostgresRepository::new(pool.clone())),
            settings: Arc::new(PostgresRepository::new(pool)),
        }
    }

    /// Create a store over an open connection's pool.
    #[must_use]
    pub fn from_connection(connection: &PostgresConnection) -> Self {
        Self::new(connection.pool().clone())
    }
}

impl SettingsStore for PostgresSettingsStore {
    type Groups = PostgresRepository<SettingGroup>;
    type Settings = PostgresRepository<Setting>;

    fn groups(&self) -> Arc<Self::Groups> {
        Arc::clone(&self.groups)
    }

    fn settings(&self) -> Arc<Self::Settings> {
        Arc::clone(&self.settings)
    }
}
