// Typed query AST produced by lowering a parse tree

use std::fmt;

use crate::catalog::DataType;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStmt),
    Insert(InsertStmt),
    Load(LoadStmt),
}

impl Statement {
    pub fn to_sql(&self) -> String {
        match self {
            Statement::Select(s) => s.to_sql(),
            Statement::Insert(s) => s.to_sql(),
            Statement::Load(s) => s.to_sql(),
        }
    }

    pub fn involves_protected_column(&self) -> bool {
        match self {
            Statement::Select(s) => s.involves_protected_column(),
            Statement::Insert(s) => s.involves_protected_column(),
            Statement::Load(s) => s.involves_protected_column(),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStmt {
    pub selection_list: SelectionList,
    pub where_clause: Option<Expr>,
    pub grouping_exprs: Vec<Expr>,
    pub table_refs: TableRefs,
}

impl SelectStmt {
    pub fn to_sql(&self) -> String {
        let mut sql = format!("SELECT {}", self.selection_list.to_sql());
        if !self.table_refs.is_empty() {
            sql.push_str(" FROM ");
            sql.push_str(&self.table_refs.to_sql());
        }
        if let Some(pred) = &self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(&pred.to_sql());
        }
        if !self.grouping_exprs.is_empty() {
            let cols: Vec<String> = self.grouping_exprs.iter().map(Expr::to_sql).collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&cols.join(", "));
        }
        sql
    }

    pub fn involves_protected_column(&self) -> bool {
        self.selection_list.involves_protected_column()
            || self
                .where_clause
                .as_ref()
                .is_some_and(Expr::involves_protected_column)
            || self
                .grouping_exprs
                .iter()
                .any(Expr::involves_protected_column)
            || self.table_refs.involves_protected_column()
    }
}

/// `INSERT OVERWRITE TABLE target <query>`. Without a target it renders as
/// the bare query.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStmt {
    pub target_table: Option<String>,
    pub query: SelectStmt,
}

impl InsertStmt {
    pub fn to_sql(&self) -> String {
        match &self.target_table {
            Some(table) => format!("INSERT OVERWRITE TABLE {table} {}", self.query.to_sql()),
            None => self.query.to_sql(),
        }
    }

    pub fn involves_protected_column(&self) -> bool {
        self.query.involves_protected_column()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadStmt {
    pub file_path: String,
    pub target_table: String,
    pub overwrite: bool,
}

impl LoadStmt {
    pub fn new(file_path: impl Into<String>, target_table: impl Into<String>) -> Self {
        LoadStmt {
            file_path: file_path.into(),
            target_table: target_table.into(),
            overwrite: true,
        }
    }

    pub fn to_sql(&self) -> String {
        let overwrite = if self.overwrite { "OVERWRITE " } else { "" };
        format!(
            "LOAD DATA INPATH '{}' {overwrite}INTO TABLE {}",
            self.file_path, self.target_table
        )
    }

    // Loading moves a file as-is; encryption of the rows is done upstream.
    pub fn involves_protected_column(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionList {
    pub items: Vec<SelectionItem>,
}

impl SelectionList {
    pub fn new(items: Vec<SelectionItem>) -> Self {
        SelectionList { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_sql(&self) -> String {
        let items: Vec<String> = self.items.iter().map(SelectionItem::to_sql).collect();
        items.join(", ")
    }

    pub fn involves_protected_column(&self) -> bool {
        self.items.iter().any(|item| item.expr.involves_protected_column())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectionItem {
    pub fn to_sql(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {alias}", self.expr.to_sql()),
            None => self.expr.to_sql(),
        }
    }

    /// Name the item is visible under from an enclosing query.
    pub fn output_name(&self) -> Option<&str> {
        match (&self.alias, &self.expr) {
            (Some(alias), _) => Some(alias),
            (None, Expr::Field(field)) => Some(&field.name),
            _ => None,
        }
    }
}

// ============================================================================
// Table references
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOperator {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
}

impl JoinOperator {
    pub fn keyword(&self) -> &'static str {
        match self {
            JoinOperator::Inner => "JOIN",
            JoinOperator::LeftOuter => "LEFT OUTER JOIN",
            JoinOperator::RightOuter => "RIGHT OUTER JOIN",
            JoinOperator::FullOuter => "FULL OUTER JOIN",
            JoinOperator::Cross => "CROSS JOIN",
        }
    }
}

/// Join information carried by every non-first reference of a join chain.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub operator: JoinOperator,
    pub on_clause: Option<Expr>,
    /// Position of the left-hand reference in the enclosing `TableRefs`.
    pub left: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BaseTableRef {
    pub table: String,
    pub alias: Option<String>,
    pub join: Option<JoinClause>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineViewRef {
    pub subquery: Box<SelectStmt>,
    pub alias: Option<String>,
    pub join: Option<JoinClause>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableRef {
    Base(BaseTableRef),
    InlineView(InlineViewRef),
}

impl TableRef {
    pub fn base(table: impl Into<String>, alias: Option<String>) -> Self {
        TableRef::Base(BaseTableRef {
            table: table.into(),
            alias,
            join: None,
        })
    }

    pub fn inline_view(subquery: SelectStmt, alias: Option<String>) -> Self {
        TableRef::InlineView(InlineViewRef {
            subquery: Box::new(subquery),
            alias,
            join: None,
        })
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            TableRef::Base(t) => t.alias.as_deref(),
            TableRef::InlineView(v) => v.alias.as_deref(),
        }
    }

    /// Name a column qualifier must use to address this reference.
    pub fn visible_name(&self) -> Option<&str> {
        match self {
            TableRef::Base(t) => Some(t.alias.as_deref().unwrap_or(&t.table)),
            TableRef::InlineView(v) => v.alias.as_deref(),
        }
    }

    pub fn join(&self) -> Option<&JoinClause> {
        match self {
            TableRef::Base(t) => t.join.as_ref(),
            TableRef::InlineView(v) => v.join.as_ref(),
        }
    }

    fn join_mut(&mut self) -> &mut Option<JoinClause> {
        match self {
            TableRef::Base(t) => &mut t.join,
            TableRef::InlineView(v) => &mut v.join,
        }
    }

    fn source_sql(&self) -> String {
        let (source, alias) = match self {
            TableRef::Base(t) => (t.table.clone(), t.alias.as_deref()),
            TableRef::InlineView(v) => (format!("({})", v.subquery.to_sql()), v.alias.as_deref()),
        };
        match alias {
            Some(alias) => format!("{source} {alias}"),
            None => source,
        }
    }

    pub fn involves_protected_column(&self) -> bool {
        let on_clause = self
            .join()
            .and_then(|j| j.on_clause.as_ref())
            .is_some_and(Expr::involves_protected_column);
        match self {
            TableRef::Base(_) => on_clause,
            TableRef::InlineView(v) => on_clause || v.subquery.involves_protected_column(),
        }
    }
}

/// Ordered FROM-clause references. Joins form a left-deep chain: every
/// reference carrying a `JoinClause` is joined with the one before it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableRefs {
    refs: Vec<TableRef>,
}

impl TableRefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, table_ref: TableRef) {
        self.refs.push(table_ref);
    }

    /// Moves a lowered sub-chain to the end, keeping its back-references valid.
    pub fn append(&mut self, other: TableRefs) {
        let offset = self.refs.len();
        for mut table_ref in other.refs {
            if let Some(join) = table_ref.join_mut() {
                join.left += offset;
            }
            self.refs.push(table_ref);
        }
    }

    /// Joins the last reference with the one before it.
    pub(crate) fn attach_join(&mut self, operator: JoinOperator, on_clause: Option<Expr>) {
        let size = self.refs.len();
        if let Some(last) = self.refs.last_mut() {
            *last.join_mut() = Some(JoinClause {
                operator,
                on_clause,
                left: size.saturating_sub(2),
            });
        }
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TableRef> {
        self.refs.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TableRef> {
        self.refs.iter()
    }

    /// Left-hand side of the join the reference at `index` takes part in.
    pub fn left_tbl_ref(&self, index: usize) -> Option<&TableRef> {
        let join = self.refs.get(index)?.join()?;
        self.refs.get(join.left)
    }

    pub(crate) fn from_vec(refs: Vec<TableRef>) -> Self {
        TableRefs { refs }
    }

    pub fn to_sql(&self) -> String {
        let mut sql = String::new();
        for (i, table_ref) in self.refs.iter().enumerate() {
            match table_ref.join() {
                Some(join) if i > 0 => {
                    sql.push(' ');
                    sql.push_str(join.operator.keyword());
                    sql.push(' ');
                    sql.push_str(&table_ref.source_sql());
                    if let Some(on) = &join.on_clause {
                        sql.push_str(" ON ");
                        sql.push_str(&on.to_sql());
                    }
                }
                _ => {
                    if i > 0 {
                        sql.push_str(", ");
                    }
                    sql.push_str(&table_ref.source_sql());
                }
            }
        }
        sql
    }

    pub fn involves_protected_column(&self) -> bool {
        self.refs.iter().any(TableRef::involves_protected_column)
    }
}

impl IntoIterator for TableRefs {
    type Item = TableRef;
    type IntoIter = std::vec::IntoIter<TableRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.refs.into_iter()
    }
}

impl<'a> IntoIterator for &'a TableRefs {
    type Item = &'a TableRef;
    type IntoIter = std::slice::Iter<'a, TableRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.refs.iter()
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOperator {
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
}

impl BinOperator {
    pub const ALL: [BinOperator; 6] = [
        BinOperator::Eq,
        BinOperator::Ne,
        BinOperator::Le,
        BinOperator::Ge,
        BinOperator::Lt,
        BinOperator::Gt,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            BinOperator::Eq => "=",
            BinOperator::Ne => "!=",
            BinOperator::Le => "<=",
            BinOperator::Ge => ">=",
            BinOperator::Lt => "<",
            BinOperator::Gt => ">",
        }
    }

    /// Stable lower-case name, used when naming rewritten predicates.
    pub fn name(&self) -> &'static str {
        match self {
            BinOperator::Eq => "eq",
            BinOperator::Ne => "ne",
            BinOperator::Le => "le",
            BinOperator::Ge => "ge",
            BinOperator::Lt => "lt",
            BinOperator::Gt => "gt",
        }
    }
}

impl fmt::Display for BinOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOperator {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithOperator::Add => "+",
            ArithOperator::Sub => "-",
            ArithOperator::Mul => "*",
            ArithOperator::Div => "/",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Field(FieldLiteral),
    Int(IntLiteral),
    Float(FloatLiteral),
    String(StringLiteral),
    Arithmetic(ArithmeticExpr),
    Predicate(BinaryPredicate),
    FunctionCallStar(FunctionCallStarExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldLiteral {
    /// Table name or alias; empty when the reference is unqualified.
    pub qualifier: String,
    pub name: String,
    pub data_type: DataType,
    pub protected: bool,
}

impl FieldLiteral {
    pub fn unresolved(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        FieldLiteral {
            qualifier: qualifier.into(),
            name: name.into(),
            data_type: DataType::Unknown,
            protected: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntLiteral {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatLiteral {
    pub text: String,
}

/// String literal; `text` keeps the surrounding quotes.
#[derive(Debug, Clone, PartialEq)]
pub struct StringLiteral {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArithmeticExpr {
    pub operator: ArithOperator,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub data_type: DataType,
}

impl ArithmeticExpr {
    pub fn children(&self) -> [&Expr; 2] {
        [&self.left, &self.right]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryPredicate {
    pub operator: BinOperator,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

impl BinaryPredicate {
    pub fn children(&self) -> [&Expr; 2] {
        [&self.left, &self.right]
    }
}

/// `name(*)`, e.g. `count(*)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallStarExpr {
    pub name: String,
}

impl Expr {
    pub fn field(qualifier: impl Into<String>, name: impl Into<String>) -> Expr {
        Expr::Field(FieldLiteral::unresolved(qualifier, name))
    }

    /// Numeric literal; the kind is decided once, by the presence of a decimal point.
    pub fn number(text: impl Into<String>) -> Expr {
        let text = text.into();
        if text.contains('.') {
            Expr::Float(FloatLiteral { text })
        } else {
            Expr::Int(IntLiteral { text })
        }
    }

    pub fn string(text: impl Into<String>) -> Expr {
        Expr::String(StringLiteral { text: text.into() })
    }

    pub fn arithmetic(operator: ArithOperator, left: Expr, right: Expr) -> Expr {
        Expr::Arithmetic(ArithmeticExpr {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            data_type: DataType::Unknown,
        })
    }

    pub fn predicate(operator: BinOperator, left: Expr, right: Expr) -> Expr {
        Expr::Predicate(BinaryPredicate {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Expr::Field(f) => f.data_type,
            Expr::Int(lit) => {
                if lit.text.ends_with(['L', 'l']) {
                    DataType::BigInt
                } else {
                    DataType::Int
                }
            }
            Expr::Float(lit) => decimal_literal_type(&lit.text).unwrap_or(DataType::Double),
            Expr::String(_) => DataType::String,
            Expr::Arithmetic(a) => a.data_type,
            Expr::Predicate(_) => DataType::Boolean,
            Expr::FunctionCallStar(_) => DataType::BigInt,
        }
    }

    pub fn to_sql(&self) -> String {
        match self {
            Expr::Field(f) if f.qualifier.is_empty() => f.name.clone(),
            Expr::Field(f) => format!("{}.{}", f.qualifier, f.name),
            Expr::Int(lit) => lit.text.clone(),
            Expr::Float(lit) => lit.text.clone(),
            Expr::String(lit) => lit.text.clone(),
            Expr::Arithmetic(a) => format!(
                "{} {} {}",
                a.left.operand_sql(),
                a.operator.symbol(),
                a.right.operand_sql()
            ),
            Expr::Predicate(p) => format!(
                "{} {} {}",
                p.left.to_sql(),
                p.operator.symbol(),
                p.right.to_sql()
            ),
            Expr::FunctionCallStar(func) => format!("{}(*)", func.name),
        }
    }

    // Nested arithmetic is parenthesized so the rendering keeps the tree shape.
    fn operand_sql(&self) -> String {
        match self {
            Expr::Arithmetic(_) => format!("({})", self.to_sql()),
            _ => self.to_sql(),
        }
    }

    pub fn involves_protected_column(&self) -> bool {
        match self {
            Expr::Field(f) => f.protected,
            Expr::Int(_) | Expr::Float(_) | Expr::String(_) | Expr::FunctionCallStar(_) => false,
            Expr::Arithmetic(a) => a.children().iter().any(|c| c.involves_protected_column()),
            Expr::Predicate(p) => p.children().iter().any(|c| c.involves_protected_column()),
        }
    }
}

// `3.25BD` is DECIMAL(3,2); precision and scale follow the digits written.
fn decimal_literal_type(text: &str) -> Option<DataType> {
    let split = text.len().checked_sub(2)?;
    let (number, suffix) = text.split_at_checked(split)?;
    if !suffix.eq_ignore_ascii_case("bd") {
        return None;
    }
    let number = number.trim_start_matches('-');
    let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
    let scale = frac_part.len().min(38) as u8;
    let precision = (int_part.len() + frac_part.len()).clamp(1, 38) as u8;
    Some(DataType::Decimal {
        precision: precision.max(scale),
        scale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_operator_symbols() {
        let expected = ["=", "!=", "<=", ">=", "<", ">"];
        for (op, symbol) in BinOperator::ALL.iter().zip(expected) {
            let pred = Expr::predicate(*op, Expr::field("", "a"), Expr::number("1"));
            assert_eq!(pred.to_sql(), format!("a {symbol} 1"));
        }
        assert_eq!(BinOperator::Ne.name(), "ne");
        assert_eq!(BinOperator::Ge.name(), "ge");
    }

    #[test]
    fn test_number_classification() {
        assert!(matches!(Expr::number("3.0"), Expr::Float(ref f) if f.text == "3.0"));
        assert!(matches!(Expr::number("3"), Expr::Int(ref i) if i.text == "3"));
        assert_eq!(Expr::number("3.0").to_sql(), "3.0");
        assert_eq!(Expr::number("7L").data_type(), DataType::BigInt);
        assert_eq!(Expr::number("7").data_type(), DataType::Int);
        assert_eq!(Expr::number("3.25").data_type(), DataType::Double);
    }

    #[test]
    fn test_decimal_literal_type() {
        let lit = |text: &str| Expr::Float(FloatLiteral { text: text.to_string() });
        assert_eq!(
            lit("3.25BD").data_type(),
            DataType::Decimal {
                precision: 3,
                scale: 2
            }
        );
        assert_eq!(
            lit("-7bd").data_type(),
            DataType::Decimal {
                precision: 1,
                scale: 0
            }
        );
        assert_eq!(lit("7BD").to_sql(), "7BD");
    }

    #[test]
    fn test_load_to_sql() {
        let mut load = LoadStmt::new("/x", "t");
        assert!(load.overwrite);
        assert_eq!(load.to_sql(), "LOAD DATA INPATH '/x' OVERWRITE INTO TABLE t");
        load.overwrite = false;
        assert_eq!(load.to_sql(), "LOAD DATA INPATH '/x' INTO TABLE t");
        assert!(!Statement::Load(load).involves_protected_column());
    }

    #[test]
    fn test_nested_arithmetic_to_sql() {
        let sum = Expr::arithmetic(ArithOperator::Add, Expr::field("", "a"), Expr::field("t", "b"));
        let expr = Expr::arithmetic(ArithOperator::Mul, sum, Expr::number("2"));
        assert_eq!(expr.to_sql(), "(a + t.b) * 2");
    }

    #[test]
    fn test_protected_propagation() {
        let mut field = FieldLiteral::unresolved("", "salary");
        field.protected = true;
        let expr = Expr::arithmetic(ArithOperator::Add, Expr::Field(field), Expr::number("1"));
        assert!(expr.involves_protected_column());

        let select = SelectStmt {
            selection_list: SelectionList::new(vec![SelectionItem { expr, alias: None }]),
            where_clause: None,
            grouping_exprs: Vec::new(),
            table_refs: TableRefs::from_vec(vec![TableRef::base("emp", None)]),
        };
        assert!(select.involves_protected_column());
        assert_eq!(select.to_sql(), "SELECT salary + 1 FROM emp");
    }

    #[test]
    fn test_append_keeps_back_references() {
        let mut inner = TableRefs::new();
        inner.push(TableRef::base("b", None));
        inner.push(TableRef::base("c", None));
        inner.attach_join(JoinOperator::LeftOuter, None);

        let mut refs = TableRefs::new();
        refs.push(TableRef::base("a", None));
        refs.append(inner);

        assert_eq!(refs.len(), 3);
        assert_eq!(refs.get(2).unwrap().join().unwrap().left, 1);
        assert!(std::ptr::eq(refs.left_tbl_ref(2).unwrap(), refs.get(1).unwrap()));
        assert!(refs.left_tbl_ref(0).is_none());
        assert_eq!(refs.to_sql(), "a, b LEFT OUTER JOIN c");
    }
}
