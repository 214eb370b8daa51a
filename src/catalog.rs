use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Column types as the metastore records them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum DataType {
    /// Not resolved yet, or not known to the catalog.
    Unknown,
    Int,
    BigInt,
    Float,
    Double,
    Decimal { precision: u8, scale: u8 },
    String,
    Boolean,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("unknown data type: {0}")]
pub struct UnknownDataType(String);

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Int
                | DataType::BigInt
                | DataType::Float
                | DataType::Double
                | DataType::Decimal { .. }
        )
    }

    fn numeric_rank(&self) -> u8 {
        match self {
            DataType::Int => 1,
            DataType::BigInt => 2,
            DataType::Float => 3,
            DataType::Double => 4,
            DataType::Decimal { .. } => 5,
            _ => 0,
        }
    }

    /// Result type of an arithmetic operation over two numeric operands.
    pub fn widen(self, other: DataType) -> DataType {
        if self == DataType::Unknown || other == DataType::Unknown {
            return DataType::Unknown;
        }
        if self.numeric_rank() >= other.numeric_rank() {
            self
        } else {
            other
        }
    }

    /// Whether values of the two types can appear on both sides of a comparison.
    pub fn comparable_with(&self, other: &DataType) -> bool {
        match (self, other) {
            (DataType::Unknown, _) | (_, DataType::Unknown) => true,
            (DataType::String, DataType::String) => true,
            (DataType::Boolean, DataType::Boolean) => true,
            (a, b) => a.is_numeric() && b.is_numeric(),
        }
    }
}

impl FromStr for DataType {
    type Err = UnknownDataType;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let data_type = match lower.as_str() {
            "int" | "integer" | "smallint" | "tinyint" => DataType::Int,
            "bigint" => DataType::BigInt,
            "float" => DataType::Float,
            "double" => DataType::Double,
            "string" | "varchar" | "char" => DataType::String,
            "boolean" | "bool" => DataType::Boolean,
            "decimal" => DataType::Decimal {
                precision: 10,
                scale: 0,
            },
            _ => {
                let args = lower
                    .strip_prefix("decimal(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .ok_or_else(|| UnknownDataType(s.to_string()))?;
                let (precision, scale) = match args.split_once(',') {
                    Some((p, s)) => (p.trim(), s.trim()),
                    None => (args.trim(), "0"),
                };
                DataType::Decimal {
                    precision: precision.parse().map_err(|_| UnknownDataType(s.to_string()))?,
                    scale: scale.parse().map_err(|_| UnknownDataType(s.to_string()))?,
                }
            }
        };
        Ok(data_type)
    }
}

impl TryFrom<String> for DataType {
    type Error = UnknownDataType;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Unknown => f.write_str("unknown"),
            DataType::Int => f.write_str("int"),
            DataType::BigInt => f.write_str("bigint"),
            DataType::Float => f.write_str("float"),
            DataType::Double => f.write_str("double"),
            DataType::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            DataType::String => f.write_str("string"),
            DataType::Boolean => f.write_str("boolean"),
        }
    }
}

// Cryptographic material is kept as decimal strings; only the encryption
// pipeline interprets it.

/// Domain parameters of a database: modulus `n = prime1 * prime2` and generator `g`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct DatabaseMeta {
    pub n: String,
    pub prime1: String,
    pub prime2: String,
    pub g: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ColumnKey {
    pub m: String,
    pub x: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub key: ColumnKey,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, data_type: DataType, sensitive: bool) -> Self {
        ColumnMeta {
            name: name.into(),
            data_type,
            sensitive,
            key: ColumnKey::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableMeta {
    pub name: String,
    pub columns: Vec<ColumnMeta>,
}

impl TableMeta {
    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Read access to the metastore. Lookups are case-insensitive.
pub trait Catalog {
    fn database(&self, name: &str) -> Option<DatabaseMeta>;
    fn table(&self, database: &str, name: &str) -> Option<TableMeta>;
}

#[derive(Debug, Clone, Default)]
struct DatabaseEntry {
    meta: DatabaseMeta,
    tables: IndexMap<String, TableMeta>,
}

/// Catalog held in memory, typically loaded from the `[databases]` section
/// of the proxy configuration.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    databases: IndexMap<String, DatabaseEntry>,
}

// On-disk shape of a database section
#[derive(Debug, Deserialize)]
pub(crate) struct DatabaseSection {
    #[serde(default)]
    n: String,
    #[serde(default)]
    prime1: String,
    #[serde(default)]
    prime2: String,
    #[serde(default)]
    g: String,
    #[serde(default)]
    tables: Vec<TableMeta>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    databases: IndexMap<String, DatabaseSection>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_database(&mut self, name: &str, meta: DatabaseMeta) {
        self.databases
            .entry(name.to_lowercase())
            .or_default()
            .meta = meta;
    }

    /// Registers a table, creating its database with empty parameters if needed.
    pub fn add_table(&mut self, database: &str, table: TableMeta) {
        let entry = self.databases.entry(database.to_lowercase()).or_default();
        entry.tables.insert(table.name.to_lowercase(), table);
    }

    pub fn table_names(&self, database: &str) -> Vec<&str> {
        self.databases
            .get(&database.to_lowercase())
            .map(|db| db.tables.values().map(|t| t.name.as_str()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn from_sections(sections: IndexMap<String, DatabaseSection>) -> Self {
        let mut catalog = MemoryCatalog::new();
        for (name, section) in sections {
            catalog.add_database(
                &name,
                DatabaseMeta {
                    n: section.n,
                    prime1: section.prime1,
                    prime2: section.prime2,
                    g: section.g,
                },
            );
            for table in section.tables {
                debug!(
                    database = %name,
                    table = %table.name,
                    columns = table.columns.len(),
                    "registered table"
                );
                catalog.add_table(&name, table);
            }
        }
        catalog
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(s).context("invalid catalog definition")?;
        Ok(Self::from_sections(file.databases))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog file {}", path.display()))?;
        Self::from_toml_str(&s)
    }
}

impl Catalog for MemoryCatalog {
    fn database(&self, name: &str) -> Option<DatabaseMeta> {
        self.databases
            .get(&name.to_lowercase())
            .map(|db| db.meta.clone())
    }

    fn table(&self, database: &str, name: &str) -> Option<TableMeta> {
        self.databases
            .get(&database.to_lowercase())?
            .tables
            .get(&name.to_lowercase())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
[databases.default]
n = "15"
prime1 = "3"
prime2 = "5"
g = "2"

[[databases.default.tables]]
name = "Employee"
columns = [
    { name = "id", type = "int" },
    { name = "salary", type = "decimal(10,2)", sensitive = true, key = { m = "7", x = "11" } },
    { name = "name", type = "string" },
]
"#;

    #[test]
    fn test_parse_data_types() {
        assert_eq!("INT".parse::<DataType>().unwrap(), DataType::Int);
        assert_eq!("varchar".parse::<DataType>().unwrap(), DataType::String);
        assert_eq!(
            "decimal(12, 3)".parse::<DataType>().unwrap(),
            DataType::Decimal {
                precision: 12,
                scale: 3
            }
        );
        assert_eq!(
            "decimal(8)".parse::<DataType>().unwrap(),
            DataType::Decimal {
                precision: 8,
                scale: 0
            }
        );
        assert!("blob".parse::<DataType>().is_err());
        assert!("decimal(x,1)".parse::<DataType>().is_err());
    }

    #[test]
    fn test_widen_and_compare() {
        assert_eq!(DataType::Int.widen(DataType::BigInt), DataType::BigInt);
        assert_eq!(DataType::Double.widen(DataType::Int), DataType::Double);
        assert_eq!(DataType::Int.widen(DataType::Unknown), DataType::Unknown);
        assert!(DataType::Int.comparable_with(&DataType::Float));
        assert!(DataType::String.comparable_with(&DataType::String));
        assert!(!DataType::String.comparable_with(&DataType::Int));
        assert!(DataType::Unknown.comparable_with(&DataType::Boolean));
    }

    #[test]
    fn test_load_from_toml() {
        let catalog = MemoryCatalog::from_toml_str(CATALOG).unwrap();

        let db = catalog.database("DEFAULT").unwrap();
        assert_eq!(db.n, "15");
        assert_eq!(db.g, "2");

        let table = catalog.table("default", "employee").unwrap();
        assert_eq!(table.name, "Employee");
        assert_eq!(table.columns.len(), 3);

        let salary = table.column("SALARY").unwrap();
        assert!(salary.sensitive);
        assert_eq!(salary.key.m, "7");
        assert!(!table.column("id").unwrap().sensitive);

        assert!(catalog.table("default", "missing").is_none());
        assert!(catalog.table("other", "employee").is_none());
        assert_eq!(catalog.table_names("default"), vec!["Employee"]);
    }

    #[test]
    fn test_load_rejects_bad_type() {
        let bad = r#"
[[databases.default.tables]]
name = "t"
columns = [{ name = "a", type = "blob" }]
"#;
        assert!(MemoryCatalog::from_toml_str(bad).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(&path, CATALOG).unwrap();

        let catalog = MemoryCatalog::load(&path).unwrap();
        assert!(catalog.table("default", "employee").is_some());
        assert!(MemoryCatalog::load(dir.path().join("missing.toml")).is_err());
    }
}
