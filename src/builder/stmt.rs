use tracing::trace;

use crate::ast::{
    Expr, InsertStmt, LoadStmt, SelectStmt, SelectionItem, SelectionList, Statement, TableRefs,
};
use crate::builder::expr::{bin_operator, build_bin_predicate, build_expr};
use crate::builder::from::{build_from, build_table_name};
use crate::error::{Result, SemanticError};
use crate::tree::{ParseTree, Tag};

// Pieces of a TOK_INSERT subtree, built independently and assembled once.
struct InsertClause {
    selection_list: SelectionList,
    where_clause: Option<Expr>,
    grouping_exprs: Vec<Expr>,
    target_table: Option<String>,
}

/// Lowers a `TOK_QUERY` tree.
pub fn build_query(node: &ParseTree) -> Result<Statement> {
    if node.tag != Tag::Query {
        return Err(SemanticError::UnsupportedStatement(node.tag.to_string()));
    }

    let mut table_refs = None;
    let mut insert = None;
    for child in &node.children {
        match &child.tag {
            Tag::From => table_refs = Some(build_from(child)?),
            Tag::Insert => insert = Some(build_insert_clause(child)?),
            tag => return Err(SemanticError::unsupported("query", tag)),
        }
    }

    let clause = insert.ok_or_else(|| {
        SemanticError::UnsupportedStatement(format!("{} without {}", Tag::Query, Tag::Insert))
    })?;
    let select = SelectStmt {
        selection_list: clause.selection_list,
        where_clause: clause.where_clause,
        grouping_exprs: clause.grouping_exprs,
        table_refs: table_refs.unwrap_or_else(TableRefs::new),
    };

    let stmt = match clause.target_table {
        Some(target) => Statement::Insert(InsertStmt {
            target_table: Some(target),
            query: select,
        }),
        // No destination: a plain selection query.
        None => Statement::Select(select),
    };
    trace!(sql = %stmt, "lowered query");
    Ok(stmt)
}

/// Lowers a query used as a subquery; only its SELECT part is kept.
pub(crate) fn build_query_select(node: &ParseTree) -> Result<SelectStmt> {
    match build_query(node)? {
        Statement::Select(select) => Ok(select),
        Statement::Insert(insert) => Ok(insert.query),
        Statement::Load(_) => Err(SemanticError::UnsupportedStatement(Tag::Load.to_string())),
    }
}

fn build_insert_clause(node: &ParseTree) -> Result<InsertClause> {
    let mut selection_list = SelectionList::default();
    let mut where_clause = None;
    let mut grouping_exprs = Vec::new();
    let mut target_table = None;

    for child in &node.children {
        match &child.tag {
            Tag::Select => selection_list = build_selection_list(child)?,
            Tag::Where => where_clause = build_where(child)?,
            Tag::GroupBy => grouping_exprs = build_group_by(child)?,
            Tag::Destination => target_table = find_destination(child),
            tag => return Err(SemanticError::unsupported("insert", tag)),
        }
    }

    Ok(InsertClause {
        selection_list,
        where_clause,
        grouping_exprs,
        target_table,
    })
}

/// Destination extraction is not implemented: it never yields a target, so
/// every query (including `INSERT OVERWRITE TABLE ...`) lowers to its SELECT.
/// Callers route statements on that basis.
fn find_destination(_node: &ParseTree) -> Option<String> {
    None
}

fn build_selection_list(node: &ParseTree) -> Result<SelectionList> {
    let mut items = Vec::with_capacity(node.children.len());
    for child in &node.children {
        match &child.tag {
            Tag::SelExpr => items.push(build_select_item(child)?),
            tag => return Err(SemanticError::unsupported("select", tag)),
        }
    }
    Ok(SelectionList::new(items))
}

// TOK_SELEXPR(expr, [alias])
fn build_select_item(node: &ParseTree) -> Result<SelectionItem> {
    let mut expr = None;
    let mut alias = None;

    for child in &node.children {
        match &child.tag {
            Tag::Identifier => alias = Some(child.text.clone()),
            _ => expr = Some(build_expr(child)?),
        }
    }

    let expr = expr.ok_or_else(|| SemanticError::unsupported("select", node.to_string()))?;
    Ok(SelectionItem { expr, alias })
}

fn build_where(node: &ParseTree) -> Result<Option<Expr>> {
    let mut where_clause = None;
    for child in &node.children {
        // Compound predicates (AND/OR) have no lowering rule.
        let op = bin_operator(&child.tag)
            .ok_or_else(|| SemanticError::unsupported("where", &child.tag))?;
        where_clause = Some(build_bin_predicate(child, op)?);
    }
    Ok(where_clause)
}

fn build_group_by(node: &ParseTree) -> Result<Vec<Expr>> {
    let mut exprs = Vec::with_capacity(node.children.len());
    for child in &node.children {
        match &child.tag {
            Tag::TableOrCol | Tag::Dot => exprs.push(build_expr(child)?),
            tag => return Err(SemanticError::unsupported("group by", tag)),
        }
    }
    Ok(exprs)
}

/// Lowers `TOK_LOAD(path, TOK_TAB(TOK_TABNAME(name)), [KW_LOCAL], [KW_OVERWRITE])`.
/// The statement always overwrites the target, whether or not the keyword
/// was given.
pub fn build_load(node: &ParseTree) -> Result<Statement> {
    if node.tag != Tag::Load {
        return Err(SemanticError::UnsupportedStatement(node.tag.to_string()));
    }

    let mut path = None;
    let mut table = None;
    for child in &node.children {
        match &child.tag {
            Tag::StringLiteral => path = Some(unquote(&child.text).to_string()),
            Tag::Tab => match child.children.as_slice() {
                [name] => table = Some(build_table_name(name)?),
                _ => return Err(SemanticError::unsupported("load", child.to_string())),
            },
            Tag::Local | Tag::Overwrite => {}
            tag => return Err(SemanticError::unsupported("load", tag)),
        }
    }

    match (path, table) {
        (Some(path), Some(table)) => Ok(Statement::Load(LoadStmt::new(path, table))),
        _ => Err(SemanticError::unsupported("load", node.to_string())),
    }
}

fn unquote(text: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
            return inner;
        }
    }
    text
}
