use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
    Semicolon,
    Equals,
    Eof,
}

impl Token {
    /// Short human-readable rendering used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Caret => "'^'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Semicolon => "';'".to_string(),
            Token::Equals => "'='".to_string(),
            Token::Eof => "end of expression".to_string(),
        }
    }
}

struct Lexer {
    i: usize,
    chars: Vec<char>,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            i: 0,
            chars: input.chars().collect(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.i).cloned()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.i + offset).cloned()
    }

    fn eat_while<F: Fn(char) -> bool>(&mut self, f: F) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if f(c) {
                s.push(c);
                self.i += 1;
            } else {
                break;
            }
        }
        s
    }

    fn number(&mut self) -> Result<Token, ParseError> {
        let mut s = self.eat_while(|ch| ch.is_ascii_digit() || ch == '.');
        // 'e' is only an exponent marker when digits follow it.
        if let Some('e') | Some('E') = self.peek() {
            let sign = matches!(self.peek_at(1), Some('+') | Some('-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|ch| ch.is_ascii_digit()) {
                for _ in 0..digit_at {
                    if let Some(c) = self.peek() {
                        s.push(c);
                        self.i += 1;
                    }
                }
                s += &self.eat_while(|ch| ch.is_ascii_digit());
            }
        }
        s.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| ParseError::InvalidNumber(s))
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.i += 1;
            } else {
                break;
            }
        }

        let single = |lexer: &mut Lexer, tok: Token| {
            lexer.i += 1;
            Ok(tok)
        };

        match self.peek() {
            None => Ok(Token::Eof),
            Some(c)
                if c.is_ascii_digit()
                    || (c == '.' && self.peek_at(1).is_some_and(|ch| ch.is_ascii_digit())) =>
            {
                self.number()
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let id = self.eat_while(|ch| ch.is_ascii_alphanumeric() || ch == '_');
                Ok(Token::Ident(id))
            }
            Some('+') => single(self, Token::Plus),
            Some('-') => single(self, Token::Minus),
            Some('*') => single(self, Token::Star),
            Some('/') => single(self, Token::Slash),
            Some('^') => single(self, Token::Caret),
            Some('(') => single(self, Token::LParen),
            Some(')') => single(self, Token::RParen),
            Some(',') => single(self, Token::Comma),
            Some(';') => single(self, Token::Semicolon),
            Some('=') => single(self, Token::Equals),
            Some(other) => Err(ParseError::UnexpectedCharacter {
                ch: other,
                position: self.i,
            }),
        }
    }
}

/// Splits an expression into tokens. The returned vector always ends with `Token::Eof`.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer::new(input);
    let mut out = Vec::new();
    loop {
        let tok = lexer.next_token()?;
        if tok == Token::Eof {
            out.push(Token::Eof);
            break;
        }
        out.push(tok);
    }
    Ok(out)
}
