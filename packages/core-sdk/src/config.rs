//! Application settings and the process-wide credential set.
//!
//! Credentials are resolved once, after the shell has loaded `.env`, and stay
//! fixed for the process lifetime.

use std::{collections::BTreeMap, path::PathBuf};

use once_cell::sync::OnceCell;

use crate::{secrets::SecretResolver, telemetry};

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const PERENUAL_BASE_URL: &str = "https://perenual.com/api";

pub const PLANTS_DB_FILE: &str = "plants_database.json";
pub const CHAT_HISTORY_FILE: &str = "chat_history.json";

pub const DEFAULT_LOCATION: &str = "Sialkot,PK";
pub const DEFAULT_CITY: &str = "Sialkot";
pub const DEFAULT_COUNTRY: &str = "PK";

/** \brief Daily watering check time (HH:MM, local). */
pub const WATERING_CHECK_TIME: &str = "08:00";
pub const MAX_PLANTS: usize = 50;

static CREDENTIALS: OnceCell<CredentialSet> = OnceCell::new();

/**
 * \brief Logical credentials the application knows about.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Credential {
    OpenWeatherApiKey,
    GeminiApiKey,
    GroqApiKey,
    PerenualApiKey,
    HuggingFaceApiKey,
    DefaultLocation,
}

impl Credential {
    pub const ALL: [Credential; 6] = [
        Credential::OpenWeatherApiKey,
        Credential::GeminiApiKey,
        Credential::GroqApiKey,
        Credential::PerenualApiKey,
        Credential::HuggingFaceApiKey,
        Credential::DefaultLocation,
    ];

    /** \brief Canonical name, also the environment variable name. */
    pub fn env_name(self) -> &'static str {
        match self {
            Credential::OpenWeatherApiKey => "OPENWEATHER_API_KEY",
            Credential::GeminiApiKey => "GEMINI_API_KEY",
            Credential::GroqApiKey => "GROQ_API_KEY",
            Credential::PerenualApiKey => "PERENUAL_API_KEY",
            Credential::HuggingFaceApiKey => "HUGGINGFACE_API_KEY",
            Credential::DefaultLocation => "DEFAULT_LOCATION",
        }
    }

    /**
     * \brief Names tried in order: the canonical name first, then lowercase short aliases.
     */
    pub fn name_variants(self) -> &'static [&'static str] {
        match self {
            Credential::OpenWeatherApiKey => &[
                "OPENWEATHER_API_KEY",
                "openweather_key",
                "openweather_api_key",
            ],
            Credential::GeminiApiKey => &["GEMINI_API_KEY", "gemini_key", "gemini_api_key"],
            Credential::GroqApiKey => &["GROQ_API_KEY", "groq_key", "groq_api_key"],
            Credential::PerenualApiKey => {
                &["PERENUAL_API_KEY", "perenual_key", "perenual_api_key"]
            }
            Credential::HuggingFaceApiKey => &[
                "HUGGINGFACE_API_KEY",
                "huggingface_key",
                "huggingface_api_key",
            ],
            Credential::DefaultLocation => &["DEFAULT_LOCATION", "default_location"],
        }
    }

    pub fn default_value(self) -> &'static str {
        match self {
            Credential::DefaultLocation => DEFAULT_LOCATION,
            _ => "",
        }
    }

    /** \brief Whether the value is a secret that must be redacted for display. */
    pub fn is_secret(self) -> bool {
        !matches!(self, Credential::DefaultLocation)
    }
}

/**
 * \brief Resolved credential values keyed by canonical name. Values may be empty.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSet {
    values: BTreeMap<String, String>,
}

impl CredentialSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, credential: Credential, value: impl Into<String>) -> Self {
        self.values
            .insert(credential.env_name().to_string(), value.into());
        self
    }

    /** \brief Value by canonical name; unknown names read as empty. */
    pub fn get(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn credential(&self, credential: Credential) -> &str {
        self.get(credential.env_name())
    }

    pub fn groq_api_key(&self) -> &str {
        self.credential(Credential::GroqApiKey)
    }

    pub fn openweather_api_key(&self) -> &str {
        self.credential(Credential::OpenWeatherApiKey)
    }

    pub fn gemini_api_key(&self) -> &str {
        self.credential(Credential::GeminiApiKey)
    }

    pub fn perenual_api_key(&self) -> &str {
        self.credential(Credential::PerenualApiKey)
    }

    pub fn huggingface_api_key(&self) -> &str {
        self.credential(Credential::HuggingFaceApiKey)
    }

    /** \brief Falls back to the built-in location if the set was never loaded. */
    pub fn default_location(&self) -> &str {
        match self.credential(Credential::DefaultLocation) {
            "" => DEFAULT_LOCATION,
            location => location,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /**
     * \brief (name, display value, is set) for each known credential, secrets redacted.
     */
    pub fn redacted(&self) -> Vec<(&'static str, String, bool)> {
        Credential::ALL
            .iter()
            .map(|&c| {
                let value = self.credential(c);
                let shown = if value.is_empty() {
                    String::new()
                } else if c.is_secret() {
                    telemetry::redact(value)
                } else {
                    value.to_string()
                };
                (c.env_name(), shown, !value.is_empty())
            })
            .collect()
    }
}

/**
 * \brief Resolve every known credential through its name variants.
 */
pub fn load_all_credentials(resolver: &SecretResolver) -> CredentialSet {
    let mut set = CredentialSet::new();
    for credential in Credential::ALL {
        let value = credential
            .name_variants()
            .iter()
            .find_map(|name| resolver.lookup(name))
            .unwrap_or_else(|| credential.default_value().to_string());
        set = set.with(credential, value);
    }
    telemetry::log_event(
        "config.credentials",
        &format!(
            "loaded credentials from [{}]: {}",
            resolver.source_labels().join(", "),
            set.redacted()
                .iter()
                .map(|(name, _, present)| format!("{}={}", name, if *present { "set" } else { "unset" }))
                .collect::<Vec<_>>()
                .join(" ")
        ),
    );
    set
}

/**
 * \brief Load `.env` into the process environment. A missing file is fine.
 */
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => Some(path),
        Err(err) if err.not_found() => None,
        Err(err) => {
            telemetry::log_error("config.dotenv", &format!("ignoring .env: {}", err));
            None
        }
    }
}

/**
 * \brief Install the process-wide credential set. The first call wins; later
 *        calls return the already installed set.
 */
pub fn initialize(set: CredentialSet) -> &'static CredentialSet {
    CREDENTIALS.get_or_init(|| set)
}

/**
 * \brief Process-wide credentials, if `initialize` has run.
 */
pub fn credentials() -> Option<&'static CredentialSet> {
    CREDENTIALS.get()
}

/**
 * \brief Process-wide credentials, loading them from the default sources on first use.
 */
pub fn credentials_or_init() -> &'static CredentialSet {
    CREDENTIALS.get_or_init(|| load_all_credentials(&SecretResolver::from_default_sources()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::TomlSecretsStore;

    fn resolver(raw: &str) -> SecretResolver {
        SecretResolver::new(vec![Box::new(
            TomlSecretsStore::from_toml_str(raw).expect("parse store"),
        )])
    }

    #[test]
    fn test_load_all_credentials_uses_aliases() {
        let set = load_all_credentials(&resolver(
            r#"
            perenual_api_key = "pe-1"
            [api]
            groq_key = "gsk_live"
            openweather_api_key = "ow-1"
            "#,
        ));
        assert_eq!(set.groq_api_key(), "gsk_live");
        assert_eq!(set.openweather_api_key(), "ow-1");
        assert_eq!(set.perenual_api_key(), "pe-1");
        assert_eq!(set.gemini_api_key(), "");
        assert_eq!(set.huggingface_api_key(), "");
    }

    #[test]
    fn test_canonical_name_beats_alias() {
        let set = load_all_credentials(&resolver(
            r#"
            GEMINI_API_KEY = "canonical"
            gemini_key = "alias"
            "#,
        ));
        assert_eq!(set.gemini_api_key(), "canonical");
    }

    #[test]
    fn test_location_defaults_only_for_location() {
        let set = load_all_credentials(&SecretResolver::new(Vec::new()));
        assert_eq!(set.default_location(), "Sialkot,PK");
        for credential in Credential::ALL {
            if credential != Credential::DefaultLocation {
                assert_eq!(set.credential(credential), "", "{:?}", credential);
            }
        }

        let set = load_all_credentials(&resolver(r#"default_location = "Lahore,PK""#));
        assert_eq!(set.default_location(), "Lahore,PK");
    }

    #[test]
    fn test_redacted_hides_keys_but_not_location() {
        let set = CredentialSet::new()
            .with(Credential::GroqApiKey, "gsk_1234567")
            .with(Credential::DefaultLocation, "Lahore,PK");
        let rows = set.redacted();
        assert_eq!(rows.len(), Credential::ALL.len());
        let groq = rows
            .iter()
            .find(|(name, _, _)| *name == "GROQ_API_KEY")
            .expect("groq row");
        assert_eq!(groq.1, "gsk_****");
        assert!(groq.2);
        let location = rows
            .iter()
            .find(|(name, _, _)| *name == "DEFAULT_LOCATION")
            .expect("location row");
        assert_eq!(location.1, "Lahore,PK");
        let gemini = rows
            .iter()
            .find(|(name, _, _)| *name == "GEMINI_API_KEY")
            .expect("gemini row");
        assert!(!gemini.2);
    }

    #[test]
    fn test_initialize_is_write_once() {
        let first = initialize(CredentialSet::new().with(Credential::GroqApiKey, "first"));
        let second = initialize(CredentialSet::new().with(Credential::GroqApiKey, "second"));
        assert!(std::ptr::eq(first, second));
        assert_eq!(credentials().map(|c| c.groq_api_key()), Some(first.groq_api_key()));
        assert!(std::ptr::eq(credentials_or_init(), first));
    }
}
