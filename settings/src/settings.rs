//! Setting groups and the settings in them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;
use whippet_core::cqrs::{Query, QueryHandler, QueryParameter};
use whippet_core::environment::Clock;
use whippet_core::repository::{Entity, Repository};
use whippet_core::result::{ResultContainerExt, WhippetResult, require_not_blank};

/// A named collection of application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct SettingGroup {
    /// Group id
    pub id: Uuid,
    /// Unique name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl SettingGroup {
    /// New group with a random id.
    #[must_use]
    pub fn new(name: impl Into<String>, clock: &impl Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            created_at: clock.now(),
        }
    }
}

impl Entity for SettingGroup {
    type Id = Uuid;

    const ENTITY_NAME: &'static str = "SettingGroup";

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> WhippetResult {
        require_not_blank(&self.name, "name")
    }
}

/// One named value within a [`SettingGroup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Setting {
    /// Setting id
    pub id: Uuid,
    /// Owning group
    pub group_id: Uuid,
    /// Name, unique within the group
    pub name: String,
    /// Value, if set
    pub value: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Setting {
    /// New setting with a random id.
    #[must_use]
    pub fn new(group_id: Uuid, name: impl Into<String>, value: Option<String>, clock: &impl Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            name: name.into(),
            value,
            created_at: clock.now(),
        }
    }

    /// The value parsed as a flag.
    ///
    /// `true`, `yes`, `on` and `1` read as set, ignoring case; anything else,
    /// including a missing value, reads as unset.
    #[must_use]
    pub fn as_flag(&self) -> bool {
        self.value.as_deref().is_some_and(|value| {
            ["true", "yes", "on", "1"]
                .iter()
                .any(|flag| value.trim().eq_ignore_ascii_case(flag))
        })
    }
}

impl Entity for Setting {
    type Id = Uuid;

    const ENTITY_NAME: &'static str = "Setting";

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> WhippetResult {
        require_not_blank(&self.name, "name")
    }
}

/// Setting group storage.
pub trait SettingGroupRepository: Repository<SettingGroup> {
    /// Find a group by name, ignoring case.
    fn get_by_name(&self, name: &str) -> impl Future<Output = WhippetResult<Option<SettingGroup>>> + Send;
}

/// Setting storage.
pub trait SettingRepository: Repository<Setting> {
    /// Every setting of a group.
    fn get_by_group(&self, group_id: Uuid) -> impl Future<Output = WhippetResult<Vec<Setting>>> + Send;

    /// Find a setting of a group by name, ignoring case.
    fn get_by_name(
        &self,
        group_id: Uuid,
        name: &str,
    ) -> impl Future<Output = WhippetResult<Option<Setting>>> + Send;
}

/// Look up a setting group by name.
#[derive(Debug, Clone)]
pub struct GetSettingGroupByName {
    /// Group name, matched ignoring case
    pub name: String,
}

impl GetSettingGroupByName {
    /// Create the query.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Query for GetSettingGroupByName {
    type Entity = SettingGroup;

    fn parameters(&self) -> Vec<QueryParameter> {
        vec![("name", Value::String(self.name.clone()))]
    }
}

/// Handles [`GetSettingGroupByName`].
#[derive(Debug)]
pub struct GetSettingGroupByNameHandler<R> {
    repository: Arc<R>,
}

impl<R> GetSettingGroupByNameHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: SettingGroupRepository> QueryHandler<GetSettingGroupByName> for GetSettingGroupByNameHandler<R> {
    async fn handle(&self, query: GetSettingGroupByName) -> WhippetResult<Vec<SettingGroup>> {
        require_not_blank(&query.name, "name")?;
        self.repository.get_by_name(&query.name).await.into_enumerable()
    }
}

/// Every setting of a group.
#[derive(Debug, Clone)]
pub struct GetSettingsByGroup {
    /// Group id
    pub group_id: Uuid,
}

impl GetSettingsByGroup {
    /// Create the query.
    #[must_use]
    pub const fn new(group_id: Uuid) -> Self {
        Self { group_id }
    }
}

impl Query for GetSettingsByGroup {
    type Entity = Setting;

    fn parameters(&self) -> Vec<QueryParameter> {
        vec![("group_id", Value::String(self.group_id.to_string()))]
    }
}

/// Handles [`GetSettingsByGroup`].
#[derive(Debug)]
pub struct GetSettingsByGroupHandler<R> {
    repository: Arc<R>,
}

impl<R> GetSettingsByGroupHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: SettingRepository> QueryHandler<GetSettingsByGroup> for GetSettingsByGroupHandler<R> {
    async fn handle(&self, query: GetSettingsByGroup) -> WhippetResult<Vec<Setting>> {
        self.repository.get_by_group(query.group_id).await
    }
}

/// Look up one setting of a group by name.
#[derive(Debug, Clone)]
pub struct GetSettingByName {
    /// Group id
    pub group_id: Uuid,
    /// Setting name, matched ignoring case
    pub name: String,
}

impl GetSettingByName {
    /// Create the query.
    #[must_use]
    pub fn new(group_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            group_id,
            name: name.into(),
        }
    }
}

impl Query for GetSettingByName {
    type Entity = Setting;

    fn parameters(&self) -> Vec<QueryParameter> {
        vec![
            ("group_id", Value::String(self.group_id.to_string())),
            ("name", Value::String(self.name.clone())),
        ]
    }
}

/// Handles [`GetSettingByName`].
#[derive(Debug)]
pub struct GetSettingByNameHandler<R> {
    repository: Arc<R>,
}

impl<R> GetSettingByNameHandler<R> {
    /// Create a handler over `repository`.
    #[must_use]
    pub const fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: SettingRepository> QueryHandler<GetSettingByName> for GetSettingByNameHandler<R> {
    async fn handle(&self, query: GetSettingByName) -> WhippetResult<Vec<Setting>> {
        require_not_blank(&query.name, "name")?;
        self.repository
            .get_by_name(query.group_id, &query.name)
            .await
            .into_enumerable()
    }
}
