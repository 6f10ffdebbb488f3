use crate::error::ParseError;
use crate::expr::expr::{BinOp, Definition, Expr, ParsedExpression, UnOp};
use crate::expr::lexer::{Token, tokenize};

/// Binding power of prefix `-`/`+`: tighter than `*` but looser than `^`, so `-x^2` is `-(x^2)`.
const PREFIX_BP: u8 = 65;

// Pratt parser
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn bump(&mut self) -> Token {
        let t = self.peek().clone();
        self.pos += 1;
        t
    }

    fn unexpected(found: &Token, expected: &str) -> ParseError {
        match found {
            Token::Eof => ParseError::UnexpectedEnd,
            other => ParseError::UnexpectedToken {
                found: other.describe(),
                expected: expected.to_string(),
            },
        }
    }

    fn parse(&mut self) -> Result<ParsedExpression, ParseError> {
        let energy = self.parse_bp(0)?;
        let mut definitions = Vec::new();

        loop {
            match self.bump() {
                Token::Eof => break,
                Token::Semicolon => {
                    // A trailing ';' is tolerated.
                    if let Token::Eof = self.peek() {
                        break;
                    }
                    definitions.push(self.parse_definition()?);
                }
                other => return Err(Self::unexpected(&other, "';' or end of expression")),
            }
        }

        Ok(ParsedExpression {
            energy,
            definitions,
        })
    }

    fn parse_definition(&mut self) -> Result<Definition, ParseError> {
        let name = match self.bump() {
            Token::Ident(name) => name,
            other => return Err(Self::unexpected(&other, "a name to define")),
        };
        match self.bump() {
            Token::Equals => {}
            other => return Err(Self::unexpected(&other, "'='")),
        }
        let expr = self.parse_bp(0)?;
        Ok(Definition { name, expr })
    }

    // binding powers: (left_bp, right_bp)
    fn infix_binding_power(op: &Token) -> Option<(u8, u8)> {
        match op {
            Token::Caret => Some((70, 69)), // right-assoc: use lower rbp
            Token::Star | Token::Slash => Some((60, 61)),
            Token::Plus | Token::Minus => Some((50, 51)),
            _ => None,
        }
    }

    fn parse_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = match self.bump() {
            Token::Number(n) => Expr::Number(n),
            Token::Ident(name) => {
                if let Token::LParen = self.peek() {
                    self.bump();
                    let mut args = vec![];
                    if let Token::RParen = self.peek() {
                        self.bump();
                    } else {
                        loop {
                            args.push(self.parse_bp(0)?);
                            match self.bump() {
                                Token::Comma => continue,
                                Token::RParen => break,
                                other => return Err(Self::unexpected(&other, "',' or ')'")),
                            }
                        }
                    }
                    Expr::Call(name, args)
                } else {
                    Expr::Var(name)
                }
            }
            Token::LParen => {
                let e = self.parse_bp(0)?;
                match self.bump() {
                    Token::RParen => e,
                    other => return Err(Self::unexpected(&other, "')'")),
                }
            }
            Token::Plus => Expr::Unary(UnOp::Pos, Box::new(self.parse_bp(PREFIX_BP)?)),
            Token::Minus => Expr::Unary(UnOp::Neg, Box::new(self.parse_bp(PREFIX_BP)?)),
            other => return Err(Self::unexpected(&other, "an operand")),
        };

        loop {
            let op = self.peek().clone();
            let Some((lbp, rbp)) = Self::infix_binding_power(&op) else {
                break;
            };
            if lbp < min_bp {
                break;
            }
            self.bump();
            let rhs = self.parse_bp(rbp)?;
            let binop = match op {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Caret => BinOp::Pow,
                _ => unreachable!("infix_binding_power only accepts arithmetic operators"),
            };
            lhs = Expr::Binary(Box::new(lhs), binop, Box::new(rhs));
        }
        Ok(lhs)
    }
}

/// Parses an energy expression, including any trailing `; name = value` definitions.
pub fn parse(input: &str) -> Result<ParsedExpression, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens);
    parser.parse()
}
