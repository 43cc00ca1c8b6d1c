use thiserror::Error;
use tracing::info;

use crate::application::repos::KvError;
use crate::cache::{CacheStore, KvKey};
use crate::config::SiteDefaults;
use crate::domain::entities::SiteSettingsRecord;
use crate::domain::error::DomainError;
use crate::domain::settings::{SettingField, SettingsPatch, validate_settings_patch};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] KvError),
}

impl From<&SiteDefaults> for SiteSettingsRecord {
    fn from(defaults: &SiteDefaults) -> Self {
        Self {
            name: defaults.name.clone(),
            description: defaults.description.clone(),
            author: defaults.author.clone(),
            theme_color: defaults.theme_color.clone(),
            favicon: defaults.favicon.clone(),
            favicon_png: defaults.favicon_png.clone(),
            github: defaults.github.clone(),
            twitter: defaults.twitter.clone(),
            instagram: defaults.instagram.clone(),
            patreon: defaults.patreon.clone(),
            linkedin: defaults.linkedin.clone(),
            discord: defaults.discord.clone(),
            support_email: defaults.support_email.clone(),
        }
    }
}

/// Site settings stored field-by-field, overlaying configured defaults.
#[derive(Clone)]
pub struct SettingsService {
    cache: CacheStore,
    defaults: SiteSettingsRecord,
}

impl SettingsService {
    pub fn new(cache: CacheStore, defaults: SiteSettingsRecord) -> Self {
        Self { cache, defaults }
    }

    pub async fn load(&self) -> Result<SiteSettingsRecord, SettingsError> {
        let mut record = self.defaults.clone();
        for field in SettingField::ALL {
            if let Some(value) = self.cache.get_raw(&KvKey::Setting(field)).await?
                && !value.is_empty()
            {
                field.write(&mut record, value);
            }
        }
        Ok(record)
    }

    /// Validate and store every non-empty field of `patch`, then return the merged view.
    pub async fn update(&self, patch: SettingsPatch) -> Result<SiteSettingsRecord, SettingsError> {
        let accepted = validate_settings_patch(&patch).map_err(DomainError::validation)?;

        for (field, value) in &accepted {
            self.cache
                .set_raw(&KvKey::Setting(*field), value, None)
                .await?;
        }

        info!(
            target = "nuxtpress::settings",
            fields = ?accepted.iter().map(|(field, _)| field.as_str()).collect::<Vec<_>>(),
            "site settings updated"
        );
        self.load().await
    }
}
