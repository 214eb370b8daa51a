// Front end for the restricted query grammar. Produces HiveQL-shaped parse
// trees; it accepts a little more than the analyzer lowers (AND/OR, general
// function calls, SELECT *) so those are rejected with a semantic error.

use anyhow::{bail, Result};

use crate::lexer::{Lexer, Token};
use crate::tree::{ParseTree, Tag};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

fn ident(name: String) -> ParseTree {
    ParseTree::leaf(Tag::Identifier, name)
}

fn other(name: &str, children: Vec<ParseTree>) -> ParseTree {
    ParseTree::node(Tag::Other(name.to_string()), children)
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> &Token {
        self.pos += 1;
        self.tokens.get(self.pos - 1).unwrap_or(&Token::Eof)
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        let token = self.peek().clone();
        if token == expected {
            self.advance();
            Ok(())
        } else {
            bail!("expected {expected:?}, got {token:?}");
        }
    }

    fn consume(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn parse(&mut self) -> Result<ParseTree> {
        let tree = match self.peek() {
            Token::Select => {
                let destination = ParseTree::node(
                    Tag::Dir,
                    vec![ParseTree::node(Tag::TmpFile, Vec::new())],
                );
                self.parse_query(destination)?
            }
            Token::Insert => {
                self.advance();
                self.expect(Token::Overwrite)?;
                self.expect(Token::Table)?;
                let table = self.parse_table_name()?;
                self.parse_query(ParseTree::node(Tag::Tab, vec![table]))?
            }
            Token::Load => self.parse_load()?,
            _ => bail!("unexpected token: {:?}", self.peek()),
        };

        // Optional semicolon
        self.consume(&Token::Semicolon);
        if self.peek() != &Token::Eof {
            bail!("unexpected token after statement: {:?}", self.peek());
        }

        Ok(tree)
    }

    // TOK_QUERY(TOK_FROM?, TOK_INSERT(TOK_DESTINATION, TOK_SELECT, TOK_WHERE?, TOK_GROUPBY?))
    fn parse_query(&mut self, destination: ParseTree) -> Result<ParseTree> {
        self.expect(Token::Select)?;

        let mut items = Vec::new();
        loop {
            items.push(self.parse_select_item()?);
            if !self.consume(&Token::Comma) {
                break;
            }
        }

        let mut children = Vec::new();
        if self.consume(&Token::From) {
            let from = self.parse_from_element()?;
            children.push(ParseTree::node(Tag::From, vec![from]));
        }

        let mut insert = vec![
            ParseTree::node(Tag::Destination, vec![destination]),
            ParseTree::node(Tag::Select, items),
        ];

        if self.consume(&Token::Where) {
            let cond = self.parse_expr()?;
            insert.push(ParseTree::node(Tag::Where, vec![cond]));
        }

        if self.consume(&Token::Group) {
            self.expect(Token::By)?;
            let mut cols = Vec::new();
            loop {
                cols.push(self.parse_expr()?);
                if !self.consume(&Token::Comma) {
                    break;
                }
            }
            insert.push(ParseTree::node(Tag::GroupBy, cols));
        }

        children.push(ParseTree::node(Tag::Insert, insert));
        Ok(ParseTree::node(Tag::Query, children))
    }

    fn parse_select_item(&mut self) -> Result<ParseTree> {
        if self.consume(&Token::Asterisk) {
            return Ok(ParseTree::node(
                Tag::SelExpr,
                vec![other("TOK_ALLCOLREF", Vec::new())],
            ));
        }

        let mut children = vec![self.parse_expr()?];
        if let Some(alias) = self.parse_alias()? {
            children.push(ident(alias));
        }
        Ok(ParseTree::node(Tag::SelExpr, children))
    }

    // [AS] alias
    fn parse_alias(&mut self) -> Result<Option<String>> {
        if self.consume(&Token::As) {
            return self.parse_ident().map(Some);
        }
        match self.peek().clone() {
            Token::Ident(s) => {
                self.advance();
                Ok(Some(s))
            }
            _ => Ok(None),
        }
    }

    fn parse_ident(&mut self) -> Result<String> {
        match self.peek().clone() {
            Token::Ident(s) => {
                self.advance();
                Ok(s)
            }
            _ => bail!("expected identifier, got {:?}", self.peek()),
        }
    }

    // TOK_TABNAME(name) or TOK_TABNAME(db, name)
    fn parse_table_name(&mut self) -> Result<ParseTree> {
        let mut parts = vec![ident(self.parse_ident()?)];
        if self.consume(&Token::Dot) {
            parts.push(ident(self.parse_ident()?));
        }
        Ok(ParseTree::node(Tag::TabName, parts))
    }

    fn parse_join_tag(&mut self) -> Result<Option<Tag>> {
        let tag = match self.peek() {
            Token::Join => {
                self.advance();
                return Ok(Some(Tag::Join));
            }
            Token::Inner => Tag::Join,
            Token::Left => Tag::LeftOuterJoin,
            Token::Right => Tag::RightOuterJoin,
            Token::Full => Tag::FullOuterJoin,
            Token::Cross => Tag::CrossJoin,
            _ => return Ok(None),
        };
        self.advance();
        if tag != Tag::Join && tag != Tag::CrossJoin {
            self.consume(&Token::Outer);
        }
        self.expect(Token::Join)?;
        Ok(Some(tag))
    }

    // Joins nest to the left: ((a JOIN b) JOIN c)
    fn parse_from_element(&mut self) -> Result<ParseTree> {
        let mut from = self.parse_table_source()?;

        while let Some(tag) = self.parse_join_tag()? {
            let right = self.parse_table_source()?;
            let mut children = vec![from, right];
            if self.consume(&Token::On) {
                children.push(self.parse_expr()?);
            }
            from = ParseTree::node(tag, children);
        }

        Ok(from)
    }

    fn parse_table_source(&mut self) -> Result<ParseTree> {
        if self.consume(&Token::LParen) {
            let destination = ParseTree::node(
                Tag::Dir,
                vec![ParseTree::node(Tag::TmpFile, Vec::new())],
            );
            let query = self.parse_query(destination)?;
            self.expect(Token::RParen)?;
            let mut children = vec![query];
            if let Some(alias) = self.parse_alias()? {
                children.push(ident(alias));
            }
            return Ok(ParseTree::node(Tag::SubQuery, children));
        }

        let mut children = vec![self.parse_table_name()?];
        if let Some(alias) = self.parse_alias()? {
            children.push(ident(alias));
        }
        Ok(ParseTree::node(Tag::TabRef, children))
    }

    // TOK_LOAD(path, TOK_TAB(TOK_TABNAME(name)), [KW_LOCAL], [KW_OVERWRITE])
    fn parse_load(&mut self) -> Result<ParseTree> {
        self.expect(Token::Load)?;
        self.expect(Token::Data)?;
        let local = self.consume(&Token::Local);
        self.expect(Token::Inpath)?;
        let path = match self.peek().clone() {
            Token::String(s) => {
                self.advance();
                s
            }
            _ => bail!("expected file path, got {:?}", self.peek()),
        };
        let overwrite = self.consume(&Token::Overwrite);
        self.expect(Token::Into)?;
        self.expect(Token::Table)?;
        let table = self.parse_table_name()?;

        let mut children = vec![
            ParseTree::leaf(Tag::StringLiteral, path),
            ParseTree::node(Tag::Tab, vec![table]),
        ];
        if local {
            children.push(ParseTree::leaf(Tag::Local, "LOCAL"));
        }
        if overwrite {
            children.push(ParseTree::leaf(Tag::Overwrite, "OVERWRITE"));
        }
        Ok(ParseTree::node(Tag::Load, children))
    }

    // Expression parsing with precedence
    fn parse_expr(&mut self) -> Result<ParseTree> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<ParseTree> {
        let mut left = self.parse_and()?;
        while self.consume(&Token::Or) {
            let right = self.parse_and()?;
            left = ParseTree::node(Tag::Or, vec![left, right]);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<ParseTree> {
        let mut left = self.parse_comparison()?;
        while self.consume(&Token::And) {
            let right = self.parse_comparison()?;
            left = ParseTree::node(Tag::And, vec![left, right]);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<ParseTree> {
        let left = self.parse_additive()?;

        let tag = match self.peek() {
            Token::Eq => Tag::Equal,
            Token::Ne => Tag::NotEqual,
            Token::Lt => Tag::LessThan,
            Token::Le => Tag::LessThanOrEqualTo,
            Token::Gt => Tag::GreaterThan,
            Token::Ge => Tag::GreaterThanOrEqualTo,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;

        Ok(ParseTree::node(tag, vec![left, right]))
    }

    fn parse_additive(&mut self) -> Result<ParseTree> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let tag = match self.peek() {
                Token::Plus => Tag::Plus,
                Token::Minus => Tag::Minus,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = ParseTree::node(tag, vec![left, right]);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<ParseTree> {
        let mut left = self.parse_unary()?;
        loop {
            let tag = match self.peek() {
                Token::Asterisk => Tag::Star,
                Token::Slash => Tag::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = ParseTree::node(tag, vec![left, right]);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<ParseTree> {
        if self.peek() != &Token::Minus {
            return self.parse_primary();
        }
        self.advance();
        // Negative numbers stay literals; other negations are unary MINUS.
        if let Token::Number(n) = self.peek().clone() {
            self.advance();
            return Ok(number_literal(format!("-{n}")));
        }
        let operand = self.parse_unary()?;
        Ok(ParseTree::node(Tag::Minus, vec![operand]))
    }

    fn parse_primary(&mut self) -> Result<ParseTree> {
        match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(number_literal(n))
            }
            Token::String(s) => {
                self.advance();
                Ok(ParseTree::leaf(Tag::StringLiteral, s))
            }
            Token::Ident(s) => {
                self.advance();
                if self.peek() == &Token::LParen {
                    return self.parse_function_call(s);
                }
                let column = ParseTree::node(Tag::TableOrCol, vec![ident(s)]);
                // Check for table-qualified column (table.column)
                if self.consume(&Token::Dot) {
                    let name = self.parse_ident()?;
                    Ok(ParseTree::node(Tag::Dot, vec![column, ident(name)]))
                } else {
                    Ok(column)
                }
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            _ => bail!("unexpected token in expression: {:?}", self.peek()),
        }
    }

    // name(*) becomes TOK_FUNCTIONSTAR, anything else TOK_FUNCTION
    fn parse_function_call(&mut self, name: String) -> Result<ParseTree> {
        self.expect(Token::LParen)?;
        if self.peek() == &Token::Asterisk && self.peek_at(1) == &Token::RParen {
            self.pos += 2;
            return Ok(ParseTree::node(Tag::FunctionStar, vec![ident(name)]));
        }

        let mut children = vec![ident(name)];
        if !self.consume(&Token::RParen) {
            loop {
                children.push(self.parse_expr()?);
                if !self.consume(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RParen)?;
        }
        Ok(other("TOK_FUNCTION", children))
    }
}

// Suffixed literals get their own token kinds, as in the Hive lexer.
fn number_literal(text: String) -> ParseTree {
    let upper = text.to_uppercase();
    let tag = if upper.ends_with("BD") {
        Tag::DecimalLiteral
    } else if upper.ends_with('L') {
        Tag::BigintLiteral
    } else if upper.ends_with('S') {
        Tag::SmallintLiteral
    } else if upper.ends_with('Y') {
        Tag::TinyintLiteral
    } else {
        Tag::Number
    };
    ParseTree::leaf(tag, text)
}

pub fn parse(sql: &str) -> Result<ParseTree> {
    let mut lexer = Lexer::new(sql);
    let tokens = lexer.tokenize()?;
    let mut parser = Parser::new(tokens);
    parser.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_select_tree() {
        let tree = parse("SELECT a+b FROM t WHERE a > 5").unwrap();
        assert_eq!(
            tree.to_string(),
            "(TOK_QUERY (TOK_FROM (TOK_TABREF (TOK_TABNAME t))) \
             (TOK_INSERT (TOK_DESTINATION (TOK_DIR TOK_TMP_FILE)) \
             (TOK_SELECT (TOK_SELEXPR (PLUS (TOK_TABLE_OR_COL a) (TOK_TABLE_OR_COL b)))) \
             (TOK_WHERE (GREATERTHAN (TOK_TABLE_OR_COL a) 5))))"
        );
    }

    #[test]
    fn test_parse_joins_nest_left() {
        let tree =
            parse("SELECT a.x FROM A a JOIN B b ON a.x = b.y LEFT JOIN C ON b.z = C.w").unwrap();
        let from = &tree.children[0];
        assert_eq!(from.tag, Tag::From);

        let outer = &from.children[0];
        assert_eq!(outer.tag, Tag::LeftOuterJoin);
        assert_eq!(outer.children[0].tag, Tag::Join);
        assert_eq!(outer.children[1].tag, Tag::TabRef);
        assert_eq!(outer.children[2].tag, Tag::Equal);
    }

    #[test]
    fn test_parse_subquery_and_aliases() {
        let tree = parse("SELECT v.s AS total FROM (SELECT sum(*) s FROM t) v").unwrap();
        assert_eq!(
            tree.children[0].to_string(),
            "(TOK_FROM (TOK_SUBQUERY (TOK_QUERY (TOK_FROM (TOK_TABREF (TOK_TABNAME t))) \
             (TOK_INSERT (TOK_DESTINATION (TOK_DIR TOK_TMP_FILE)) \
             (TOK_SELECT (TOK_SELEXPR (TOK_FUNCTIONSTAR sum) s)))) v))"
        );
    }

    #[test]
    fn test_parse_insert_and_load() {
        let insert = parse("INSERT OVERWRITE TABLE dest SELECT a FROM t;").unwrap();
        let destination = &insert.children[1].children[0];
        assert_eq!(destination.to_string(), "(TOK_DESTINATION (TOK_TAB (TOK_TABNAME dest)))");

        let load = parse("LOAD DATA LOCAL INPATH '/data/t.txt' OVERWRITE INTO TABLE t").unwrap();
        assert_eq!(
            load.to_string(),
            "(TOK_LOAD '/data/t.txt' (TOK_TAB (TOK_TABNAME t)) LOCAL OVERWRITE)"
        );
    }

    #[test]
    fn test_parse_literals() {
        let tree = parse("SELECT a FROM t WHERE a = -3.5").unwrap();
        let cond = &tree.children[1].children[2].children[0];
        assert_eq!(cond.children[1].tag, Tag::Number);
        assert_eq!(cond.children[1].text, "-3.5");

        let tree = parse("SELECT a FROM t WHERE a = 10L").unwrap();
        let cond = &tree.children[1].children[2].children[0];
        assert_eq!(cond.children[1].tag, Tag::BigintLiteral);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("SELECT FROM t").is_err());
        assert!(parse("SELECT a FROM t extra junk").is_err());
        assert!(parse("DELETE FROM t").is_err());
        assert!(parse("LOAD DATA INPATH /x INTO TABLE t").is_err());
    }
}
