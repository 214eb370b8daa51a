// Lowering of grammar parse trees into the query AST

mod expr;
mod from;
mod stmt;

pub use expr::{build_expr, build_predicate};
pub use from::build_from;
pub use stmt::{build_load, build_query};

use crate::ast::Statement;
use crate::error::{Result, SemanticError};
use crate::tree::{ParseTree, Tag};

/// Lowers a statement root without consulting the catalog. Column types are
/// left `Unknown` until analysis.
pub fn build(tree: &ParseTree) -> Result<Statement> {
    match &tree.tag {
        Tag::Query => build_query(tree),
        Tag::Load => build_load(tree),
        tag => Err(SemanticError::UnsupportedStatement(tag.to_string())),
    }
}
