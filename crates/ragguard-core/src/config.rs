//! Layered configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `RAGGUARD_*`
//! env vars (`__` separates nested keys). Missing keys fall back to the
//! built-in defaults of each section, which reproduce the stock company
//! department/role layout.
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

pub const ENV_PREFIX: &str = "RAGGUARD_";

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    /// Load `config.toml` from the working directory.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    /// Load `path`, its `<stem>.<env>.toml` sibling and the environment.
    /// Absent files contribute nothing.
    pub fn load_from(path: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file(path));
        if let Some(suffix) = env_suffix(&env_name) {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("config");
            figment = figment.merge(Toml::file(path.with_file_name(format!("{stem}.{suffix}.toml"))));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok(Self { figment, base_dir })
    }

    pub fn from_figment(figment: Figment, base_dir: impl Into<PathBuf>) -> Self {
        Self { figment, base_dir: base_dir.into() }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    /// Extract and validate the typed settings.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Directory relative paths in the configuration are resolved against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

fn env_suffix(env_name: &str) -> Option<&'static str> {
    match env_name {
        "dev" | "development" => Some("dev"),
        "prod" | "production" => Some("prod"),
        "test" | "testing" => Some("test"),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub access: AccessSettings,
    pub retrieval: RetrievalSettings,
    pub index: IndexSettings,
    pub data: DataSettings,
    pub ingest: IngestSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.access.validate()?;
        self.retrieval.validate()?;
        self.index.validate()?;
        self.ingest.validate(&self.access)
    }

    pub fn data_dir(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.data.dir)
    }
}

/// Department → roles table plus the distinguished full-access role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessSettings {
    pub full_access_role: String,
    pub general_department: String,
    /// Roles allowed to read each department, the full-access role excluded.
    pub departments: BTreeMap<String, Vec<String>>,
    /// Explicit role → primary department assignments. Roles not listed here
    /// fall back to the department sharing their name.
    pub primary_departments: BTreeMap<String, String>,
}

impl Default for AccessSettings {
    fn default() -> Self {
        let own = |d: &str| (d.to_string(), vec![d.to_string()]);
        let mut departments: BTreeMap<String, Vec<String>> =
            ["finance", "marketing", "hr", "engineering"].into_iter().map(own).collect();
        departments.insert(
            "general".to_string(),
            ["finance", "marketing", "hr", "engineering", "employee"].iter().map(|r| (*r).to_string()).collect(),
        );
        Self {
            full_access_role: "c-level".to_string(),
            general_department: "general".to_string(),
            departments,
            primary_departments: BTreeMap::new(),
        }
    }
}

impl AccessSettings {
    fn validate(&self) -> Result<()> {
        if self.full_access_role.trim().is_empty() {
            return Err(Error::InvalidConfig("access.full_access_role must not be empty".into()));
        }
        if self.departments.is_empty() {
            return Err(Error::InvalidConfig("access.departments must name at least one department".into()));
        }
        if !self.departments.contains_key(&self.general_department) {
            return Err(Error::InvalidConfig(format!(
                "access.general_department '{}' is not a configured department",
                self.general_department
            )));
        }
        for (department, roles) in &self.departments {
            let ordinary = roles.iter().filter(|r| **r != self.full_access_role).count();
            if ordinary == 0 {
                return Err(Error::InvalidConfig(format!("department '{department}' grants no roles")));
            }
        }
        for (role, department) in &self.primary_departments {
            if !self.departments.contains_key(department) {
                return Err(Error::InvalidConfig(format!(
                    "primary department '{department}' of role '{role}' is not a configured department"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub default_top_k: usize,
    /// Largest `top_k` a caller may ask for.
    pub max_top_k: usize,
    pub over_fetch_multiplier: usize,
    pub min_over_fetch: usize,
    pub search_timeout_ms: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { default_top_k: 3, max_top_k: 100, over_fetch_multiplier: 2, min_over_fetch: 6, search_timeout_ms: 2_000 }
    }
}

impl RetrievalSettings {
    /// Number of candidates to request from the index for `top_k` results.
    /// Always strictly greater than `top_k`.
    pub fn over_fetch(&self, top_k: usize) -> usize {
        top_k
            .saturating_mul(self.over_fetch_multiplier)
            .max(self.min_over_fetch)
            .max(top_k.saturating_add(1))
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.default_top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.default_top_k must be positive".into()));
        }
        if self.default_top_k > self.max_top_k {
            return Err(Error::InvalidConfig(format!(
                "retrieval.default_top_k {} exceeds retrieval.max_top_k {}",
                self.default_top_k, self.max_top_k
            )));
        }
        if self.over_fetch_multiplier < 2 {
            return Err(Error::InvalidConfig("retrieval.over_fetch_multiplier must be at least 2".into()));
        }
        if self.search_timeout_ms == 0 {
            return Err(Error::InvalidConfig("retrieval.search_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Text,
    Vector,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    Hashing,
    Bert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub backend: IndexBackend,
    pub embedder: EmbedderKind,
    pub embedding_dim: usize,
    pub model_dir: Option<String>,
    pub writer_heap_bytes: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Hybrid,
            embedder: EmbedderKind::Hashing,
            embedding_dim: 384,
            model_dir: None,
            writer_heap_bytes: 50_000_000,
        }
    }
}

impl IndexSettings {
    fn validate(&self) -> Result<()> {
        if self.embedding_dim == 0 {
            return Err(Error::InvalidConfig("index.embedding_dim must be positive".into()));
        }
        if self.embedder == EmbedderKind::Bert && self.model_dir.is_none() {
            return Err(Error::InvalidConfig("index.model_dir is required for the bert embedder".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { dir: "sample_data".to_string() }
    }
}

/// Filename keywords used to guess the department of an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub department: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Rules are tried in order; the first match wins.
    pub department_keywords: Vec<KeywordRule>,
}

impl Default for IngestSettings {
    fn default() -> Self {
        let rule = |department: &str, keywords: &[&str]| KeywordRule {
            department: department.to_string(),
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
        };
        Self {
            department_keywords: vec![
                rule("finance", &["finance", "financial", "quarterly", "revenue", "expense"]),
                rule("marketing", &["marketing", "campaign", "sales", "customer"]),
                rule("hr", &["hr", "employee", "payroll", "attendance"]),
                rule("engineering", &["engineering", "technical", "architecture", "development"]),
            ],
        }
    }
}

impl IngestSettings {
    fn validate(&self, access: &AccessSettings) -> Result<()> {
        for rule in &self.department_keywords {
            if !access.departments.contains_key(&rule.department) {
                return Err(Error::InvalidConfig(format!(
                    "ingest keyword rule names unknown department '{}'",
                    rule.department
                )));
            }
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
