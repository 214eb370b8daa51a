use tracing::debug;

use crate::ast::{
    ArithmeticExpr, BinaryPredicate, Expr, FieldLiteral, InlineViewRef, InsertStmt, JoinClause,
    LoadStmt, SelectStmt, SelectionItem, SelectionList, Statement, TableRef, TableRefs,
};
use crate::builder;
use crate::catalog::{Catalog, DataType};
use crate::config::AnalyzerConfig;
use crate::error::{Result, SemanticError};
use crate::tree::ParseTree;

// Output schema of a table reference, as seen by the enclosing query
#[derive(Debug, Clone)]
struct OutputColumn {
    name: String,
    data_type: DataType,
    protected: bool,
}

#[derive(Debug, Clone)]
struct ScopeEntry {
    // alias, or table name for an unaliased base table
    name: Option<String>,
    columns: Vec<OutputColumn>,
}

impl ScopeEntry {
    // An inline view may expose the same name twice (`SELECT a AS b, b`).
    fn column(&self, name: &str) -> Result<Option<&OutputColumn>> {
        let mut matches = self
            .columns
            .iter()
            .filter(|c| c.name.eq_ignore_ascii_case(name));
        let column = matches.next();
        if column.is_some() && matches.next().is_some() {
            return Err(SemanticError::AmbiguousReference(name.to_string()));
        }
        Ok(column)
    }
}

/// Table references visible to the expressions of one SELECT.
#[derive(Debug, Clone, Default)]
struct Scope {
    entries: Vec<ScopeEntry>,
}

impl Scope {
    fn add(&mut self, name: Option<&str>, columns: Vec<OutputColumn>) {
        self.entries.push(ScopeEntry {
            name: name.map(str::to_string),
            columns,
        });
    }

    fn resolve(&self, qualifier: &str, name: &str) -> Result<&OutputColumn> {
        if !qualifier.is_empty() {
            let mut sources = self.entries.iter().filter(|e| {
                e.name
                    .as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case(qualifier))
            });
            let entry = sources.next().ok_or_else(|| {
                SemanticError::UnresolvedReference(format!("table or alias {qualifier}"))
            })?;
            if sources.next().is_some() {
                return Err(SemanticError::AmbiguousReference(qualifier.to_string()));
            }
            return entry.column(name)?.ok_or_else(|| {
                SemanticError::UnresolvedReference(format!("column {qualifier}.{name}"))
            });
        }

        let mut found = None;
        for entry in &self.entries {
            if let Some(column) = entry.column(name)? {
                if found.is_some() {
                    return Err(SemanticError::AmbiguousReference(name.to_string()));
                }
                found = Some(column);
            }
        }
        found.ok_or_else(|| SemanticError::UnresolvedReference(format!("column {name}")))
    }
}

/// Lowers parse trees and resolves them against the catalog.
pub struct Analyzer<'a> {
    catalog: &'a dyn Catalog,
    database: String,
}

impl<'a> Analyzer<'a> {
    pub fn new(catalog: &'a dyn Catalog) -> Self {
        Self::with_config(catalog, &AnalyzerConfig::default())
    }

    pub fn with_config(catalog: &'a dyn Catalog, config: &AnalyzerConfig) -> Self {
        Analyzer {
            catalog,
            database: config.database.clone(),
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Lowers `tree` and resolves every reference in it. Fails on the first
    /// construct without a lowering rule or the first unresolved name.
    pub fn analyze(&self, tree: &ParseTree) -> Result<Statement> {
        let stmt = builder::build(tree)?;
        let stmt = self.analyze_statement(stmt)?;
        debug!(
            sql = %stmt,
            protected = stmt.involves_protected_column(),
            "analyzed statement"
        );
        Ok(stmt)
    }

    /// Resolves an already lowered statement.
    pub fn analyze_statement(&self, stmt: Statement) -> Result<Statement> {
        match stmt {
            Statement::Select(s) => Ok(Statement::Select(self.analyze_select(s)?)),
            Statement::Insert(s) => Ok(Statement::Insert(self.analyze_insert(s)?)),
            Statement::Load(s) => Ok(Statement::Load(self.analyze_load(s)?)),
        }
    }

    fn analyze_select(&self, stmt: SelectStmt) -> Result<SelectStmt> {
        let SelectStmt {
            selection_list,
            where_clause,
            grouping_exprs,
            table_refs,
        } = stmt;

        // Table references first: they define the scope of everything else.
        // An on-clause sees the references up to and including its own.
        let mut scope = Scope::default();
        let mut refs = Vec::with_capacity(table_refs.len());
        for table_ref in table_refs {
            refs.push(self.analyze_table_ref(table_ref, &mut scope)?);
        }

        let items = selection_list
            .items
            .into_iter()
            .map(|item| {
                Ok(SelectionItem {
                    expr: resolve_expr(item.expr, &scope)?,
                    alias: item.alias,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let where_clause = where_clause
            .map(|expr| resolve_expr(expr, &scope))
            .transpose()?;

        let grouping_exprs = grouping_exprs
            .into_iter()
            .map(|expr| resolve_expr(expr, &scope))
            .collect::<Result<Vec<_>>>()?;

        Ok(SelectStmt {
            selection_list: SelectionList::new(items),
            where_clause,
            grouping_exprs,
            table_refs: TableRefs::from_vec(refs),
        })
    }

    fn analyze_table_ref(&self, table_ref: TableRef, scope: &mut Scope) -> Result<TableRef> {
        let visible_name = table_ref.visible_name().map(str::to_string);
        match table_ref {
            TableRef::Base(mut base) => {
                let table = self.catalog.table(&self.database, &base.table).ok_or_else(|| {
                    SemanticError::UnresolvedReference(format!("table {}", base.table))
                })?;
                debug!(
                    database = %self.database,
                    table = %table.name,
                    columns = table.columns.len(),
                    "resolved table"
                );

                let columns = table
                    .columns
                    .iter()
                    .map(|c| OutputColumn {
                        name: c.name.clone(),
                        data_type: c.data_type,
                        protected: c.sensitive,
                    })
                    .collect();
                scope.add(visible_name.as_deref(), columns);

                base.join = resolve_join(base.join, scope)?;
                Ok(TableRef::Base(base))
            }
            TableRef::InlineView(view) => {
                let InlineViewRef {
                    subquery,
                    alias,
                    join,
                } = view;
                let subquery = self.analyze_select(*subquery)?;
                scope.add(visible_name.as_deref(), view_columns(&subquery));

                Ok(TableRef::InlineView(InlineViewRef {
                    subquery: Box::new(subquery),
                    alias,
                    join: resolve_join(join, scope)?,
                }))
            }
        }
    }

    fn analyze_insert(&self, stmt: InsertStmt) -> Result<InsertStmt> {
        if let Some(target) = &stmt.target_table {
            self.require_table(target)?;
        }
        Ok(InsertStmt {
            target_table: stmt.target_table,
            query: self.analyze_select(stmt.query)?,
        })
    }

    fn analyze_load(&self, stmt: LoadStmt) -> Result<LoadStmt> {
        self.require_table(&stmt.target_table)?;
        Ok(stmt)
    }

    fn require_table(&self, name: &str) -> Result<()> {
        match self.catalog.table(&self.database, name) {
            Some(_) => Ok(()),
            None => Err(SemanticError::UnresolvedReference(format!("table {name}"))),
        }
    }
}

// Items of a subquery are addressed by alias or column name; other
// expressions get Hive's positional names (_c0, _c1, ...).
fn view_columns(subquery: &SelectStmt) -> Vec<OutputColumn> {
    subquery
        .selection_list
        .items
        .iter()
        .enumerate()
        .map(|(i, item)| OutputColumn {
            name: item
                .output_name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("_c{i}")),
            data_type: item.expr.data_type(),
            protected: item.expr.involves_protected_column(),
        })
        .collect()
}

fn resolve_join(join: Option<JoinClause>, scope: &Scope) -> Result<Option<JoinClause>> {
    let Some(JoinClause {
        operator,
        on_clause,
        left,
    }) = join
    else {
        return Ok(None);
    };
    Ok(Some(JoinClause {
        operator,
        on_clause: on_clause.map(|e| resolve_expr(e, scope)).transpose()?,
        left,
    }))
}

fn resolve_expr(expr: Expr, scope: &Scope) -> Result<Expr> {
    match expr {
        Expr::Field(field) => {
            let column = scope.resolve(&field.qualifier, &field.name)?;
            Ok(Expr::Field(FieldLiteral {
                data_type: column.data_type,
                protected: column.protected,
                ..field
            }))
        }
        Expr::Arithmetic(arith) => {
            let left = resolve_expr(*arith.left, scope)?;
            let right = resolve_expr(*arith.right, scope)?;
            let (lt, rt) = (left.data_type(), right.data_type());
            let operand_ok = |t: DataType| t == DataType::Unknown || t.is_numeric();
            if !operand_ok(lt) || !operand_ok(rt) {
                return Err(SemanticError::IncompatibleOperands {
                    operator: arith.operator.symbol(),
                    left: lt,
                    right: rt,
                });
            }
            Ok(Expr::Arithmetic(ArithmeticExpr {
                operator: arith.operator,
                left: Box::new(left),
                right: Box::new(right),
                data_type: lt.widen(rt),
            }))
        }
        Expr::Predicate(pred) => {
            let left = resolve_expr(*pred.left, scope)?;
            let right = resolve_expr(*pred.right, scope)?;
            let (lt, rt) = (left.data_type(), right.data_type());
            if !lt.comparable_with(&rt) {
                return Err(SemanticError::IncompatibleOperands {
                    operator: pred.operator.symbol(),
                    left: lt,
                    right: rt,
                });
            }
            Ok(Expr::Predicate(BinaryPredicate {
                operator: pred.operator,
                left: Box::new(left),
                right: Box::new(right),
            }))
        }
        Expr::Int(_) | Expr::Float(_) | Expr::String(_) | Expr::FunctionCallStar(_) => Ok(expr),
    }
}

/// Lowers and analyzes `tree` against `catalog` using the default database.
pub fn analyze(tree: &ParseTree, catalog: &dyn Catalog) -> Result<Statement> {
    Analyzer::new(catalog).analyze(tree)
}
