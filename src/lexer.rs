use anyhow::{bail, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Select,
    From,
    Where,
    Group,
    By,
    As,
    Insert,
    Overwrite,
    Table,
    Load,
    Data,
    Local,
    Inpath,
    Into,
    Join,
    Inner,
    Left,
    Right,
    Full,
    Outer,
    Cross,
    On,
    And,
    Or,

    // Identifiers and literals
    Ident(String),
    Number(String), // raw text, including a type suffix (L, S, Y, BD)
    String(String), // raw text, including quotes

    // Symbols
    Asterisk,  // *
    Comma,     // ,
    Semicolon, // ;
    Dot,       // .
    LParen,    // (
    RParen,    // )
    Eq,        // =
    Ne,        // <> or !=
    Lt,        // <
    Le,        // <=
    Gt,        // >
    Ge,        // >=
    Plus,      // +
    Minus,     // -
    Slash,     // /

    Eof,
}

pub struct Lexer {
    input: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        self.pos += 1;
        ch
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let ch = match self.peek() {
            Some(ch) => ch,
            None => return Ok(Token::Eof),
        };

        let token = match ch {
            '*' => {
                self.advance();
                Token::Asterisk
            }
            ',' => {
                self.advance();
                Token::Comma
            }
            ';' => {
                self.advance();
                Token::Semicolon
            }
            '.' => {
                self.advance();
                Token::Dot
            }
            '(' => {
                self.advance();
                Token::LParen
            }
            ')' => {
                self.advance();
                Token::RParen
            }
            '+' => {
                self.advance();
                Token::Plus
            }
            '-' => {
                self.advance();
                Token::Minus
            }
            '/' => {
                self.advance();
                Token::Slash
            }
            '=' => {
                self.advance();
                Token::Eq
            }
            '!' => {
                self.advance();
                if self.peek() != Some('=') {
                    bail!("unexpected character: !");
                }
                self.advance();
                Token::Ne
            }
            '<' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Token::Le
                } else if self.peek() == Some('>') {
                    self.advance();
                    Token::Ne
                } else {
                    Token::Lt
                }
            }
            '>' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '\'' | '"' => self.read_string(ch)?,
            '`' => self.read_quoted_ident()?,
            _ if ch.is_ascii_digit() => self.read_number(),
            _ if ch.is_ascii_alphabetic() || ch == '_' => self.read_ident_or_keyword(),
            _ => bail!("unexpected character: {ch}"),
        };

        Ok(token)
    }

    fn read_string(&mut self, quote: char) -> Result<Token> {
        let mut s = String::new();
        s.push(quote);
        self.advance(); // consume opening quote
        loop {
            match self.advance() {
                Some('\\') => {
                    s.push('\\');
                    match self.advance() {
                        Some(escaped) => s.push(escaped),
                        None => bail!("unterminated string literal"),
                    }
                }
                Some(ch) if ch == quote => {
                    s.push(ch);
                    break;
                }
                Some(ch) => s.push(ch),
                None => bail!("unterminated string literal"),
            }
        }
        Ok(Token::String(s))
    }

    fn read_quoted_ident(&mut self) -> Result<Token> {
        self.advance(); // consume opening backtick
        let mut s = String::new();
        loop {
            match self.advance() {
                Some('`') => break,
                Some(ch) => s.push(ch),
                None => bail!("unterminated quoted identifier"),
            }
        }
        Ok(Token::Ident(s))
    }

    fn read_digits(&mut self, s: &mut String) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                s.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Token {
        let mut s = String::new();
        self.read_digits(&mut s);
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            s.push('.');
            self.advance();
            self.read_digits(&mut s);
        }

        // Hive literal suffixes: 10L (bigint), 10S (smallint), 10Y (tinyint), 10BD (decimal)
        match (self.peek(), self.peek_at(1)) {
            (Some(b @ ('B' | 'b')), Some(d @ ('D' | 'd'))) => {
                s.push(b);
                s.push(d);
                self.pos += 2;
            }
            (Some(suffix @ ('L' | 'l' | 'S' | 's' | 'Y' | 'y')), next)
                if !next.is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') =>
            {
                s.push(suffix);
                self.advance();
            }
            _ => {}
        }
        Token::Number(s)
    }

    fn read_ident_or_keyword(&mut self) -> Token {
        let mut s = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                s.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        match s.to_uppercase().as_str() {
            "SELECT" => Token::Select,
            "FROM" => Token::From,
            "WHERE" => Token::Where,
            "GROUP" => Token::Group,
            "BY" => Token::By,
            "AS" => Token::As,
            "INSERT" => Token::Insert,
            "OVERWRITE" => Token::Overwrite,
            "TABLE" => Token::Table,
            "LOAD" => Token::Load,
            "DATA" => Token::Data,
            "LOCAL" => Token::Local,
            "INPATH" => Token::Inpath,
            "INTO" => Token::Into,
            "JOIN" => Token::Join,
            "INNER" => Token::Inner,
            "LEFT" => Token::Left,
            "RIGHT" => Token::Right,
            "FULL" => Token::Full,
            "OUTER" => Token::Outer,
            "CROSS" => Token::Cross,
            "ON" => Token::On,
            "AND" => Token::And,
            "OR" => Token::Or,
            _ => Token::Ident(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(sql: &str) -> Vec<Token> {
        Lexer::new(sql).tokenize().unwrap()
    }

    #[test]
    fn test_tokenize_select() {
        assert_eq!(
            tokens("SELECT t.a+1 FROM t WHERE a != 'x'"),
            vec![
                Token::Select,
                Token::Ident("t".to_string()),
                Token::Dot,
                Token::Ident("a".to_string()),
                Token::Plus,
                Token::Number("1".to_string()),
                Token::From,
                Token::Ident("t".to_string()),
                Token::Where,
                Token::Ident("a".to_string()),
                Token::Ne,
                Token::String("'x'".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(
            tokens("3 3.25 10L 7BD 2s 4.x"),
            vec![
                Token::Number("3".to_string()),
                Token::Number("3.25".to_string()),
                Token::Number("10L".to_string()),
                Token::Number("7BD".to_string()),
                Token::Number("2s".to_string()),
                Token::Number("4".to_string()),
                Token::Dot,
                Token::Ident("x".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_strings_and_quoted_idents() {
        assert_eq!(
            tokens(r#"'it\'s' "dq" `select`"#),
            vec![
                Token::String(r"'it\'s'".to_string()),
                Token::String("\"dq\"".to_string()),
                Token::Ident("select".to_string()),
                Token::Eof,
            ]
        );
        assert!(Lexer::new("'open").tokenize().is_err());
        assert!(Lexer::new("a ! b").tokenize().is_err());
    }
}
