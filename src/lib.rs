pub mod analyzer;
pub mod ast;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod tree;

pub use analyzer::{analyze, Analyzer};
pub use ast::Statement;
pub use catalog::{Catalog, MemoryCatalog};
pub use config::{AnalyzerConfig, ProxyConfig};
pub use error::SemanticError;
pub use tree::{ParseTree, Tag};
