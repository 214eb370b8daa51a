// Generic parse tree handed over by the grammar front end

use std::fmt;

/// Token kinds a grammar may put on a parse-tree node. Names follow the
/// HiveQL grammar (`TOK_QUERY`, `KW_AND`, ...). Anything the grammar emits
/// that is not listed here is carried as `Other` so the builders can name it
/// when they reject it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    // Statements
    Query,
    Load,

    // Query clauses
    From,
    Insert,
    Destination,
    Dir,
    TmpFile,
    Tab,
    TabName,
    Select,
    SelExpr,
    Where,
    GroupBy,

    // FROM elements
    TabRef,
    SubQuery,
    Join,
    LeftOuterJoin,
    RightOuterJoin,
    FullOuterJoin,
    CrossJoin,

    // Expressions
    TableOrCol,
    FunctionStar,
    Dot,
    Plus,
    Minus,
    Star,
    Divide,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    And,
    Or,

    // Leaves
    Identifier,
    Number,
    BigintLiteral,
    SmallintLiteral,
    TinyintLiteral,
    DecimalLiteral,
    StringLiteral,
    Local,
    Overwrite,

    Other(String),
}

impl Tag {
    pub fn from_name(name: &str) -> Tag {
        match name {
            "TOK_QUERY" => Tag::Query,
            "TOK_LOAD" => Tag::Load,
            "TOK_FROM" => Tag::From,
            "TOK_INSERT" => Tag::Insert,
            "TOK_DESTINATION" => Tag::Destination,
            "TOK_DIR" => Tag::Dir,
            "TOK_TMP_FILE" => Tag::TmpFile,
            "TOK_TAB" => Tag::Tab,
            "TOK_TABNAME" => Tag::TabName,
            "TOK_SELECT" => Tag::Select,
            "TOK_SELEXPR" => Tag::SelExpr,
            "TOK_WHERE" => Tag::Where,
            "TOK_GROUPBY" => Tag::GroupBy,
            "TOK_TABREF" => Tag::TabRef,
            "TOK_SUBQUERY" => Tag::SubQuery,
            "TOK_JOIN" => Tag::Join,
            "TOK_LEFTOUTERJOIN" => Tag::LeftOuterJoin,
            "TOK_RIGHTOUTERJOIN" => Tag::RightOuterJoin,
            "TOK_FULLOUTERJOIN" => Tag::FullOuterJoin,
            "TOK_CROSSJOIN" => Tag::CrossJoin,
            "TOK_TABLE_OR_COL" => Tag::TableOrCol,
            "TOK_FUNCTIONSTAR" => Tag::FunctionStar,
            "DOT" => Tag::Dot,
            "PLUS" => Tag::Plus,
            "MINUS" => Tag::Minus,
            "STAR" => Tag::Star,
            "DIVIDE" => Tag::Divide,
            "EQUAL" => Tag::Equal,
            "NOTEQUAL" => Tag::NotEqual,
            "LESSTHAN" => Tag::LessThan,
            "LESSTHANOREQUALTO" => Tag::LessThanOrEqualTo,
            "GREATERTHAN" => Tag::GreaterThan,
            "GREATERTHANOREQUALTO" => Tag::GreaterThanOrEqualTo,
            "KW_AND" => Tag::And,
            "KW_OR" => Tag::Or,
            "Identifier" => Tag::Identifier,
            "Number" => Tag::Number,
            "BigintLiteral" => Tag::BigintLiteral,
            "SmallintLiteral" => Tag::SmallintLiteral,
            "TinyintLiteral" => Tag::TinyintLiteral,
            "DecimalLiteral" => Tag::DecimalLiteral,
            "StringLiteral" => Tag::StringLiteral,
            "KW_LOCAL" => Tag::Local,
            "KW_OVERWRITE" => Tag::Overwrite,
            other => Tag::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Tag::Query => "TOK_QUERY",
            Tag::Load => "TOK_LOAD",
            Tag::From => "TOK_FROM",
            Tag::Insert => "TOK_INSERT",
            Tag::Destination => "TOK_DESTINATION",
            Tag::Dir => "TOK_DIR",
            Tag::TmpFile => "TOK_TMP_FILE",
            Tag::Tab => "TOK_TAB",
            Tag::TabName => "TOK_TABNAME",
            Tag::Select => "TOK_SELECT",
            Tag::SelExpr => "TOK_SELEXPR",
            Tag::Where => "TOK_WHERE",
            Tag::GroupBy => "TOK_GROUPBY",
            Tag::TabRef => "TOK_TABREF",
            Tag::SubQuery => "TOK_SUBQUERY",
            Tag::Join => "TOK_JOIN",
            Tag::LeftOuterJoin => "TOK_LEFTOUTERJOIN",
            Tag::RightOuterJoin => "TOK_RIGHTOUTERJOIN",
            Tag::FullOuterJoin => "TOK_FULLOUTERJOIN",
            Tag::CrossJoin => "TOK_CROSSJOIN",
            Tag::TableOrCol => "TOK_TABLE_OR_COL",
            Tag::FunctionStar => "TOK_FUNCTIONSTAR",
            Tag::Dot => "DOT",
            Tag::Plus => "PLUS",
            Tag::Minus => "MINUS",
            Tag::Star => "STAR",
            Tag::Divide => "DIVIDE",
            Tag::Equal => "EQUAL",
            Tag::NotEqual => "NOTEQUAL",
            Tag::LessThan => "LESSTHAN",
            Tag::LessThanOrEqualTo => "LESSTHANOREQUALTO",
            Tag::GreaterThan => "GREATERTHAN",
            Tag::GreaterThanOrEqualTo => "GREATERTHANOREQUALTO",
            Tag::And => "KW_AND",
            Tag::Or => "KW_OR",
            Tag::Identifier => "Identifier",
            Tag::Number => "Number",
            Tag::BigintLiteral => "BigintLiteral",
            Tag::SmallintLiteral => "SmallintLiteral",
            Tag::TinyintLiteral => "TinyintLiteral",
            Tag::DecimalLiteral => "DecimalLiteral",
            Tag::StringLiteral => "StringLiteral",
            Tag::Local => "KW_LOCAL",
            Tag::Overwrite => "KW_OVERWRITE",
            Tag::Other(name) => name,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseTree {
    pub tag: Tag,
    pub text: String,
    pub children: Vec<ParseTree>,
}

impl ParseTree {
    /// Interior node; its text is the tag name, as the grammar reports it.
    pub fn node(tag: Tag, children: Vec<ParseTree>) -> Self {
        let text = tag.name().to_string();
        ParseTree {
            tag,
            text,
            children,
        }
    }

    pub fn leaf(tag: Tag, text: impl Into<String>) -> Self {
        ParseTree {
            tag,
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn child(&self, index: usize) -> Option<&ParseTree> {
        self.children.get(index)
    }

    /// Text of the first child, e.g. the column name under `TOK_TABLE_OR_COL`.
    pub fn first_child_text(&self) -> Option<&str> {
        self.children.first().map(|c| c.text.as_str())
    }
}

// Same shape as Hive's toStringTree: leaves print their text, interior
// nodes print "(TEXT child child ...)".
impl fmt::Display for ParseTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.children.is_empty() {
            return f.write_str(&self.text);
        }
        write!(f, "({}", self.text)?;
        for child in &self.children {
            write!(f, " {child}")?;
        }
        write!(f, ")")
    }
}
