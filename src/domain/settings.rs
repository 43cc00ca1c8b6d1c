//! Site setting fields, their validation, and social-handle normalization.

use serde::Deserialize;

use crate::domain::entities::SiteSettingsRecord;
use crate::domain::error::ValidationIssue;

pub const NAME_MAX_CHARS: usize = 50;
pub const DESCRIPTION_MAX_CHARS: usize = 160;
pub const AUTHOR_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingField {
    Name,
    Description,
    Author,
    ThemeColor,
    Favicon,
    FaviconPng,
    Github,
    Twitter,
    Instagram,
    Patreon,
    Linkedin,
    Discord,
    SupportEmail,
}

impl SettingField {
    pub const ALL: [SettingField; 13] = [
        SettingField::Name,
        SettingField::Description,
        SettingField::Author,
        SettingField::ThemeColor,
        SettingField::Favicon,
        SettingField::FaviconPng,
        SettingField::Github,
        SettingField::Twitter,
        SettingField::Instagram,
        SettingField::Patreon,
        SettingField::Linkedin,
        SettingField::Discord,
        SettingField::SupportEmail,
    ];

    /// Storage name used in the `setting:<field>` key.
    pub fn as_str(self) -> &'static str {
        match self {
            SettingField::Name => "name",
            SettingField::Description => "description",
            SettingField::Author => "author",
            SettingField::ThemeColor => "theme_color",
            SettingField::Favicon => "favicon",
            SettingField::FaviconPng => "favicon_png",
            SettingField::Github => "github",
            SettingField::Twitter => "twitter",
            SettingField::Instagram => "instagram",
            SettingField::Patreon => "patreon",
            SettingField::Linkedin => "linkedin",
            SettingField::Discord => "discord",
            SettingField::SupportEmail => "support_email",
        }
    }

    /// Field name in request and response bodies.
    pub fn json_name(self) -> &'static str {
        match self {
            SettingField::ThemeColor => "themeColor",
            SettingField::FaviconPng => "faviconPng",
            SettingField::SupportEmail => "supportEmail",
            other => other.as_str(),
        }
    }

    pub fn read(self, record: &SiteSettingsRecord) -> &str {
        match self {
            SettingField::Name => &record.name,
            SettingField::Description => &record.description,
            SettingField::Author => &record.author,
            SettingField::ThemeColor => &record.theme_color,
            SettingField::Favicon => &record.favicon,
            SettingField::FaviconPng => &record.favicon_png,
            SettingField::Github => &record.github,
            SettingField::Twitter => &record.twitter,
            SettingField::Instagram => &record.instagram,
            SettingField::Patreon => &record.patreon,
            SettingField::Linkedin => &record.linkedin,
            SettingField::Discord => &record.discord,
            SettingField::SupportEmail => &record.support_email,
        }
    }

    pub fn write(self, record: &mut SiteSettingsRecord, value: String) {
        let slot = match self {
            SettingField::Name => &mut record.name,
            SettingField::Description => &mut record.description,
            SettingField::Author => &mut record.author,
            SettingField::ThemeColor => &mut record.theme_color,
            SettingField::Favicon => &mut record.favicon,
            SettingField::FaviconPng => &mut record.favicon_png,
            SettingField::Github => &mut record.github,
            SettingField::Twitter => &mut record.twitter,
            SettingField::Instagram => &mut record.instagram,
            SettingField::Patreon => &mut record.patreon,
            SettingField::Linkedin => &mut record.linkedin,
            SettingField::Discord => &mut record.discord,
            SettingField::SupportEmail => &mut record.support_email,
        };
        *slot = value;
    }
}

/// Partial settings update. Absent or empty fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub theme_color: Option<String>,
    pub favicon: Option<String>,
    pub favicon_png: Option<String>,
    pub github: Option<String>,
    pub twitter: Option<String>,
    pub instagram: Option<String>,
    pub patreon: Option<String>,
    pub linkedin: Option<String>,
    pub discord: Option<String>,
    pub support_email: Option<String>,
}

impl SettingsPatch {
    fn value(&self, field: SettingField) -> Option<&str> {
        let value = match field {
            SettingField::Name => &self.name,
            SettingField::Description => &self.description,
            SettingField::Author => &self.author,
            SettingField::ThemeColor => &self.theme_color,
            SettingField::Favicon => &self.favicon,
            SettingField::FaviconPng => &self.favicon_png,
            SettingField::Github => &self.github,
            SettingField::Twitter => &self.twitter,
            SettingField::Instagram => &self.instagram,
            SettingField::Patreon => &self.patreon,
            SettingField::Linkedin => &self.linkedin,
            SettingField::Discord => &self.discord,
            SettingField::SupportEmail => &self.support_email,
        };
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// Validate a patch and return the normalized values to store, in field order.
pub fn validate_settings_patch(
    patch: &SettingsPatch,
) -> Result<Vec<(SettingField, String)>, Vec<ValidationIssue>> {
    let mut accepted = Vec::new();
    let mut issues = Vec::new();

    for field in SettingField::ALL {
        let Some(value) = patch.value(field) else {
            continue;
        };
        match normalize_field(field, value) {
            Ok(normalized) => accepted.push((field, normalized)),
            Err(message) => issues.push(ValidationIssue::new(field.json_name(), message)),
        }
    }

    if issues.is_empty() {
        Ok(accepted)
    } else {
        Err(issues)
    }
}

fn normalize_field(field: SettingField, value: &str) -> Result<String, &'static str> {
    match field {
        SettingField::Name => {
            max_chars(value, NAME_MAX_CHARS, "Name must be 50 characters or less")
        }
        SettingField::Description => max_chars(
            value,
            DESCRIPTION_MAX_CHARS,
            "Description must be 160 characters or less",
        ),
        SettingField::Author => {
            max_chars(value, AUTHOR_MAX_CHARS, "Author must be 50 characters or less")
        }
        SettingField::ThemeColor => {
            if is_hex_color(value) {
                Ok(value.to_string())
            } else {
                Err("Theme color must be a valid hex color")
            }
        }
        SettingField::Favicon | SettingField::FaviconPng => {
            if is_icon_reference(value) {
                Ok(value.to_string())
            } else {
                Err("Favicon must be a valid URL, relative path (starting with /), or data URI")
            }
        }
        SettingField::Github => Ok(strip_profile_url(value, &["github.com/"])),
        SettingField::Twitter => Ok(strip_profile_url(value, &["x.com/", "twitter.com/"])),
        SettingField::Instagram => Ok(strip_profile_url(value, &["instagram.com/"])),
        SettingField::Patreon => Ok(strip_profile_url(value, &["patreon.com/"])),
        SettingField::Linkedin => Ok(strip_profile_url(value, &["linkedin.com/in/"])),
        SettingField::Discord => {
            if is_discord_link(value) {
                Ok(value.to_string())
            } else {
                Err("Discord must be a valid invite link (discord.gg/ or discord.com/invite/) or user profile (discord.com/users/)")
            }
        }
        SettingField::SupportEmail => {
            if is_email(value) {
                Ok(value.to_string())
            } else {
                Err("Must be a valid email")
            }
        }
    }
}

fn max_chars(value: &str, limit: usize, message: &'static str) -> Result<String, &'static str> {
    if value.chars().count() > limit {
        Err(message)
    } else {
        Ok(value.to_string())
    }
}

fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6) && digits.bytes().all(|byte| byte.is_ascii_hexdigit())
}

fn is_icon_reference(value: &str) -> bool {
    ["data:", "/", "http://", "https://"]
        .iter()
        .any(|prefix| value.starts_with(prefix))
}

fn strip_scheme(value: &str) -> &str {
    value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .unwrap_or(value)
}

/// Reduce a profile URL to the handle; bare handles are returned as given.
pub fn strip_profile_url(value: &str, hosts: &[&str]) -> String {
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return value.to_string();
    }

    let rest = strip_scheme(value);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    for host in hosts {
        if let Some(handle) = rest.strip_prefix(host) {
            return handle.trim_end_matches('/').to_string();
        }
    }
    value.to_string()
}

fn is_discord_link(value: &str) -> bool {
    let rest = strip_scheme(value);
    let alnum = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric());

    if let Some(code) = rest.strip_prefix("discord.gg/") {
        return alnum(code);
    }
    if let Some(code) = rest.strip_prefix("discord.com/invite/") {
        return alnum(code);
    }
    if let Some(id) = rest.strip_prefix("discord.com/users/") {
        return !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit());
    }
    false
}

fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}
