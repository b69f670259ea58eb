use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Paused,
}

string_enum!(ProjectStatus { Active => "active", Paused => "paused" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptStatus {
    Active,
    Disabled,
}

string_enum!(ScriptStatus { Active => "active", Disabled => "disabled" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Active,
    Paused,
}

string_enum!(CampaignStatus { Active => "active", Paused => "paused" });

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyUnit {
    Hour,
    #[default]
    Day,
}

string_enum!(FrequencyUnit { Hour => "hour", Day => "day" });

impl FrequencyUnit {
    pub fn millis(&self) -> u64 {
        match self {
            Self::Hour => 3_600_000,
            Self::Day => 86_400_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    Pending,
    Verified,
    Failed,
    CloudflarePending,
}

string_enum!(DomainStatus {
    Pending => "pending",
    Verified => "verified",
    Failed => "failed",
    CloudflarePending => "cloudflare_pending",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryLink {
    pub url: String,
    pub keyword: String,
}

/// Fallback payload served to denied domains instead of the bare noop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "content", rename_all = "lowercase")]
pub enum SecondaryContent {
    Js(String),
    Links(Vec<SecondaryLink>),
}

impl SecondaryContent {
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Js(_) => "js",
            Self::Links(_) => "links",
        }
    }

    /// Blank JS or a list without any usable link counts as unset.
    pub fn is_configured(&self) -> bool {
        match self {
            Self::Js(code) => !code.trim().is_empty(),
            Self::Links(links) => links.iter().any(|l| !l.url.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub slug: String,
    pub js_code: String,
    pub status: ScriptStatus,
    pub secondary: Option<SecondaryContent>,
    pub created_at: DateTime<Utc>,
}

impl Script {
    pub fn public_url(&self, project_slug: &str) -> String {
        format!("/api/js/{}/{}.js", project_slug, self.slug)
    }
}

fn default_frequency() -> u32 {
    1
}

/// Popunder behaviour: open `target_url` behind the page at most
/// `frequency` times per `frequency_unit`, `delay` ms after the first click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopunderSettings {
    pub target_url: String,
    #[serde(default = "default_frequency")]
    pub frequency: u32,
    #[serde(default)]
    pub frequency_unit: FrequencyUnit,
    #[serde(default)]
    pub delay: u64,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopunderCampaign {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub slug: String,
    pub status: CampaignStatus,
    pub settings: PopunderSettings,
    pub created_at: DateTime<Utc>,
}

impl PopunderCampaign {
    pub fn public_url(&self, project_slug: &str) -> String {
        format!("/api/js/popunder/{}/{}.js", project_slug, self.slug)
    }
}

/// The asset a whitelist entry gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "owner_type", content = "owner_id", rename_all = "lowercase")]
pub enum WhitelistOwner {
    Script(i64),
    Campaign(i64),
}

impl WhitelistOwner {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Script(_) => "script",
            Self::Campaign(_) => "campaign",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Self::Script(id) | Self::Campaign(id) => *id,
        }
    }

    /// `(script_id, campaign_id)` with exactly one side set.
    pub fn columns(&self) -> (Option<i64>, Option<i64>) {
        match self {
            Self::Script(id) => (Some(*id), None),
            Self::Campaign(id) => (None, Some(*id)),
        }
    }
}

impl fmt::Display for WhitelistOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub id: i64,
    #[serde(flatten)]
    pub owner: WhitelistOwner,
    pub pattern: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub id: i64,
    pub project_id: i64,
    pub script_id: Option<i64>,
    pub campaign_id: Option<i64>,
    pub domain: Option<String>,
    pub referer_url: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub allowed: bool,
    pub created_at: DateTime<Utc>,
}

/// An access record before the store assigns it an id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccessLog {
    pub project_id: i64,
    pub script_id: Option<i64>,
    pub campaign_id: Option<i64>,
    pub domain: Option<String>,
    pub referer_url: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub allowed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomDomain {
    pub id: i64,
    pub domain: String,
    pub status: DomainStatus,
    pub is_active: bool,
    pub resolved_ip: Option<String>,
    pub platform_ip: String,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_text_round_trips() {
        assert_eq!(
            "cloudflare_pending".parse::<DomainStatus>().unwrap(),
            DomainStatus::CloudflarePending
        );
        assert_eq!(ScriptStatus::Disabled.to_string(), "disabled");
        let err = "archived".parse::<ProjectStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown ProjectStatus value 'archived'");
    }

    #[test]
    fn secondary_content_wire_shape() {
        let links = SecondaryContent::Links(vec![SecondaryLink {
            url: "https://partner.example".into(),
            keyword: "Partner".into(),
        }]);
        assert_eq!(
            serde_json::to_value(&links).unwrap(),
            json!({
                "mode": "links",
                "content": [{"url": "https://partner.example", "keyword": "Partner"}]
            })
        );

        let js: SecondaryContent =
            serde_json::from_value(json!({"mode": "js", "content": "console.log(1);"})).unwrap();
        assert_eq!(js, SecondaryContent::Js("console.log(1);".into()));
        assert_eq!(js.mode(), "js");
    }

    #[test]
    fn unusable_secondary_is_not_configured() {
        assert!(!SecondaryContent::Js("  \n".into()).is_configured());
        assert!(!SecondaryContent::Links(vec![SecondaryLink {
            url: " ".into(),
            keyword: "x".into(),
        }])
        .is_configured());
        assert!(SecondaryContent::Js("x()".into()).is_configured());
    }

    #[test]
    fn whitelist_entry_names_its_owner() {
        let entry = WhitelistEntry {
            id: 3,
            owner: WhitelistOwner::Campaign(9),
            pattern: "example.com".into(),
            is_active: true,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["owner_type"], "campaign");
        assert_eq!(value["owner_id"], 9);
        assert_eq!(WhitelistOwner::Script(4).columns(), (Some(4), None));
        assert_eq!(WhitelistOwner::Campaign(4).to_string(), "campaign 4");
    }

    #[test]
    fn popunder_settings_defaults() {
        let settings: PopunderSettings =
            serde_json::from_value(json!({"target_url": "https://target.com"})).unwrap();
        assert_eq!(settings.frequency, 1);
        assert_eq!(settings.frequency_unit, FrequencyUnit::Day);
        assert_eq!(settings.delay, 0);
        assert_eq!(settings.width, None);

        let missing = serde_json::from_value::<PopunderSettings>(json!({"frequency": 2}));
        assert!(missing.is_err());
    }
}
