use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::catalog::{DatabaseSection, MemoryCatalog};

pub const DEFAULT_DATABASE: &str = "default";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Database unqualified table names are looked up in.
    pub database: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            database: DEFAULT_DATABASE.to_string(),
        }
    }
}

/// Proxy configuration file:
///
/// ```toml
/// [analyzer]
/// database = "default"
///
/// [databases.default]
/// n = "..."
/// prime1 = "..."
/// prime2 = "..."
/// g = "..."
///
/// [[databases.default.tables]]
/// name = "employee"
/// columns = [{ name = "salary", type = "int", sensitive = true, key = { m = "..", x = ".." } }]
/// ```
#[derive(Debug, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    databases: IndexMap<String, DatabaseSection>,
}

impl ProxyConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("invalid proxy configuration")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&s)
    }

    /// Splits the configuration into analyzer settings and the catalog it describes.
    pub fn into_parts(self) -> (AnalyzerConfig, MemoryCatalog) {
        (self.analyzer, MemoryCatalog::from_sections(self.databases))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::from_toml_str("").unwrap();
        let (analyzer, catalog) = config.into_parts();
        assert_eq!(analyzer.database, "default");
        assert!(catalog.table_names("default").is_empty());
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxy.toml");
        std::fs::write(
            &path,
            r#"
[analyzer]
database = "sales"

[databases.sales]
n = "35"
prime1 = "5"
prime2 = "7"
g = "3"

[[databases.sales.tables]]
name = "orders"
columns = [
    { name = "id", type = "bigint" },
    { name = "amount", type = "int", sensitive = true },
]
"#,
        )
        .unwrap();

        let (analyzer, catalog) = ProxyConfig::load(&path).unwrap().into_parts();
        assert_eq!(analyzer.database, "sales");
        assert_eq!(catalog.database("sales").unwrap().prime2, "7");
        let orders = catalog.table("sales", "orders").unwrap();
        assert!(orders.column("amount").unwrap().sensitive);
    }

    #[test]
    fn test_invalid_config() {
        assert!(ProxyConfig::from_toml_str("[analyzer]\ndatabase = 3").is_err());
        assert!(ProxyConfig::load("/nonexistent/proxy.toml").is_err());
    }
}
