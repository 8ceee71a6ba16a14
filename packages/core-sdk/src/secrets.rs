use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use toml::{Table, Value};

use crate::telemetry;

/** \brief Group key under which the secrets file may nest API keys. */
pub const SECRETS_GROUP: &str = "api";

/** \brief Default secrets file location (Streamlit layout). */
pub const DEFAULT_SECRETS_FILE: &str = ".streamlit/secrets.toml";

/** \brief Environment variable overriding the secrets file location. */
pub const SECRETS_FILE_ENV: &str = "SMART_GARDEN_SECRETS_FILE";

/**
 * \brief A place secrets can be read from.
 * \details `Ok(None)` means "not defined here"; an empty value counts as not defined.
 *          Errors are reported to the resolver, which treats them as "not found".
 */
pub trait SecretSource: Send + Sync {
    /** \brief Short label used in diagnostics. */
    fn label(&self) -> &str;

    fn lookup(&self, name: &str) -> Result<Option<String>>;
}

/**
 * \brief Secrets store backed by a TOML document.
 * \details Lookup order for `name`: `[api].<name lowercased>`, then `<name>`, then
 *          `<name lowercased>`. A failing step is skipped, not fatal.
 */
#[derive(Debug, Clone, Default)]
pub struct TomlSecretsStore {
    table: Table,
}

impl TomlSecretsStore {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let table: Table = toml::from_str(raw).context("parse secrets toml failed")?;
        Ok(Self { table })
    }

    /**
     * \brief Load the store from a file. A missing file yields `Ok(None)` (store unavailable).
     */
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read secrets file {} failed", path.display()))?;
        Self::from_toml_str(&raw).map(Some)
    }

    fn nested(&self, key: &str) -> Result<Option<String>> {
        let group = match self.table.get(SECRETS_GROUP) {
            Some(group) => group,
            None => return Ok(None),
        };
        let group = group
            .as_table()
            .ok_or_else(|| anyhow!("secrets group '{}' is not a table", SECRETS_GROUP))?;
        group.get(key).map(value_as_string).transpose()
    }

    fn direct(&self, key: &str) -> Result<Option<String>> {
        self.table.get(key).map(value_as_string).transpose()
    }
}

impl SecretSource for TomlSecretsStore {
    fn label(&self) -> &str {
        "secrets-file"
    }

    fn lookup(&self, name: &str) -> Result<Option<String>> {
        let lower = name.to_lowercase();
        let attempts: [(&str, Result<Option<String>>); 3] = [
            ("nested", self.nested(&lower)),
            ("direct", self.direct(name)),
            ("lowercase", self.direct(&lower)),
        ];
        for (step, attempt) in attempts {
            match attempt {
                Ok(Some(value)) if !value.is_empty() => return Ok(Some(value)),
                Ok(_) => {}
                Err(err) => telemetry::log_error(
                    "secrets.lookup",
                    &format!("{} lookup for {} skipped: {}", step, name, err),
                ),
            }
        }
        Ok(None)
    }
}

fn value_as_string(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        other => Err(anyhow!("expected a scalar secret, found {}", other.type_str())),
    }
}

/**
 * \brief Process environment (including anything loaded from `.env`).
 */
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl SecretSource for EnvSource {
    fn label(&self) -> &str {
        "env"
    }

    fn lookup(&self, name: &str) -> Result<Option<String>> {
        match std::env::var(name) {
            Ok(value) if !value.is_empty() => Ok(Some(value)),
            Ok(_) | Err(std::env::VarError::NotPresent) => Ok(None),
            Err(err) => Err(anyhow!("env var {} unreadable: {}", name, err)),
        }
    }
}

/**
 * \brief Ordered list of secret sources; the first non-empty hit wins.
 */
pub struct SecretResolver {
    sources: Vec<Box<dyn SecretSource>>,
}

impl SecretResolver {
    pub fn new(sources: Vec<Box<dyn SecretSource>>) -> Self {
        Self { sources }
    }

    /**
     * \brief Secrets file (if present and readable) first, then the environment.
     */
    pub fn from_default_sources() -> Self {
        let mut sources: Vec<Box<dyn SecretSource>> = Vec::new();
        let path = default_secrets_path();
        match TomlSecretsStore::load(&path) {
            Ok(Some(store)) => sources.push(Box::new(store)),
            Ok(None) => {}
            Err(err) => telemetry::log_error(
                "secrets.load",
                &format!("secrets store unavailable: {:#}", err),
            ),
        }
        sources.push(Box::new(EnvSource));
        Self::new(sources)
    }

    /**
     * \brief Resolve `name`, falling back to `default`. Never fails.
     */
    pub fn resolve(&self, name: &str, default: &str) -> String {
        self.lookup(name).unwrap_or_else(|| default.to_string())
    }

    /**
     * \brief First non-empty value across all sources, or `None`.
     */
    pub fn lookup(&self, name: &str) -> Option<String> {
        for source in &self.sources {
            match source.lookup(name) {
                Ok(Some(value)) if !value.is_empty() => return Some(value),
                Ok(_) => {}
                Err(err) => telemetry::log_error(
                    "secrets.resolve",
                    &format!("source {} failed for {}: {}", source.label(), name, err),
                ),
            }
        }
        None
    }

    pub fn source_labels(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.label()).collect()
    }
}

pub fn default_secrets_path() -> PathBuf {
    std::env::var(SECRETS_FILE_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_SECRETS_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct BrokenSource;

    impl SecretSource for BrokenSource {
        fn label(&self) -> &str {
            "broken"
        }

        fn lookup(&self, _name: &str) -> Result<Option<String>> {
            Err(anyhow!("store not ready"))
        }
    }

    fn store(raw: &str) -> TomlSecretsStore {
        TomlSecretsStore::from_toml_str(raw).expect("parse store")
    }

    #[test]
    fn test_store_prefers_nested_group() {
        let s = store(
            r#"
            GROQ_API_KEY = "direct"
            groq_api_key = "lower"
            [api]
            groq_api_key = "nested"
            "#,
        );
        assert_eq!(
            s.lookup("GROQ_API_KEY").expect("lookup").as_deref(),
            Some("nested")
        );
    }

    #[test]
    fn test_store_falls_through_direct_then_lowercase() {
        let s = store(r#"groq_api_key = "lower""#);
        assert_eq!(
            s.lookup("GROQ_API_KEY").expect("lookup").as_deref(),
            Some("lower")
        );

        let s = store(
            r#"
            GROQ_API_KEY = "direct"
            groq_api_key = "lower"
            "#,
        );
        assert_eq!(
            s.lookup("GROQ_API_KEY").expect("lookup").as_deref(),
            Some("direct")
        );
    }

    #[test]
    fn test_store_malformed_group_is_skipped() {
        let s = store(
            r#"
            api = "not a table"
            groq_key = "flat"
            "#,
        );
        assert_eq!(s.lookup("groq_key").expect("lookup").as_deref(), Some("flat"));
        assert_eq!(s.lookup("GEMINI_API_KEY").expect("lookup"), None);
    }

    #[test]
    fn test_store_empty_value_is_not_found() {
        let s = store(
            r#"
            [api]
            groq_key = ""
            "#,
        );
        assert_eq!(s.lookup("groq_key").expect("lookup"), None);
    }

    #[test]
    fn test_resolver_nested_store_value_without_env() {
        std::env::remove_var("SMART_GARDEN_TEST_UNSET_GROQ");
        let resolver = SecretResolver::new(vec![
            Box::new(store(
                r#"
                [api]
                smart_garden_test_unset_groq = "X"
                "#,
            )),
            Box::new(EnvSource),
        ]);
        assert_eq!(resolver.resolve("SMART_GARDEN_TEST_UNSET_GROQ", ""), "X");
    }

    #[test]
    fn test_resolver_store_beats_env() {
        std::env::set_var("SMART_GARDEN_TEST_PRIORITY", "from-env");
        let resolver = SecretResolver::new(vec![
            Box::new(store(r#"SMART_GARDEN_TEST_PRIORITY = "from-store""#)),
            Box::new(EnvSource),
        ]);
        assert_eq!(
            resolver.resolve("SMART_GARDEN_TEST_PRIORITY", ""),
            "from-store"
        );
    }

    #[test]
    fn test_resolver_env_fallback() {
        std::env::set_var("SMART_GARDEN_TEST_ENV_ONLY", "from-env");
        let resolver = SecretResolver::new(vec![Box::new(store("")), Box::new(EnvSource)]);
        assert_eq!(resolver.resolve("SMART_GARDEN_TEST_ENV_ONLY", ""), "from-env");
    }

    #[test]
    fn test_resolver_default_when_nothing_defines_it() {
        let resolver = SecretResolver::new(vec![Box::new(EnvSource)]);
        assert_eq!(
            resolver.resolve("SMART_GARDEN_TEST_NEVER_SET", "fallback"),
            "fallback"
        );
        assert_eq!(resolver.resolve("SMART_GARDEN_TEST_NEVER_SET", ""), "");
    }

    #[test]
    fn test_resolver_survives_broken_and_missing_sources() {
        let resolver = SecretResolver::new(vec![Box::new(BrokenSource)]);
        assert_eq!(resolver.resolve("GROQ_API_KEY", "fallback"), "fallback");

        let empty = SecretResolver::new(Vec::new());
        assert_eq!(empty.resolve("", ""), "");
        assert_eq!(empty.resolve("anything", "d"), "d");
    }

    #[test]
    fn test_load_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = TomlSecretsStore::load(&dir.path().join("secrets.toml")).expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_file_and_reject_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("secrets.toml");
        let mut file = std::fs::File::create(&path).expect("create");
        writeln!(file, "[api]\nopenweather_key = \"ow-123\"").expect("write");
        let loaded = TomlSecretsStore::load(&path)
            .expect("load")
            .expect("store present");
        assert_eq!(
            loaded.lookup("OPENWEATHER_KEY").expect("lookup").as_deref(),
            Some("ow-123")
        );

        std::fs::write(&path, "this is = = not toml").expect("overwrite");
        assert!(TomlSecretsStore::load(&path).is_err());
    }
}
