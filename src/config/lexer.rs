use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Word(String),
    Number(u64),
    Str(String),
    LBrace,
    RBrace,
    Semicolon,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Word(s) => write!(f, "{s}"),
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::Str(s) => write!(f, "\"{s}\""),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::Semicolon => write!(f, ";"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Loc {
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, col {}", self.line, self.col)
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: Loc,
}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next();
        match c {
            Some('\n') => {
                self.line += 1;
                self.col = 1;
            }
            Some(_) => self.col += 1,
            None => {}
        }
        c
    }

    fn loc(&self) -> Loc {
        Loc {
            line: self.line,
            col: self.col,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();

        loop {
            while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
                self.advance();
            }

            let Some(&c) = self.chars.peek() else {
                break;
            };

            if c == '#' {
                while !matches!(self.chars.peek(), Some('\n') | None) {
                    self.advance();
                }
                continue;
            }

            let loc = self.loc();

            match c {
                '{' => {
                    self.advance();
                    tokens.push(Token {
                        kind: TokenKind::LBrace,
                        loc,
                    });
                }
                '}' => {
                    self.advance();
                    tokens.push(Token {
                        kind: TokenKind::RBrace,
                        loc,
                    });
                }
                ';' => {
                    self.advance();
                    tokens.push(Token {
                        kind: TokenKind::Semicolon,
                        loc,
                    });
                }
                '"' => {
                    self.advance();
                    let mut s = String::new();
                    loop {
                        match self.advance() {
                            Some('"') => break,
                            Some(ch) => s.push(ch),
                            None => {
                                return Err(format!(
                                    "unterminated string starting at {}",
                                    loc
                                ));
                            }
                        }
                    }
                    tokens.push(Token {
                        kind: TokenKind::Str(s),
                        loc,
                    });
                }
                _ => {
                    let mut word = String::new();
                    while let Some(&ch) = self.chars.peek() {
                        if ch.is_whitespace() || matches!(ch, '{' | '}' | ';' | '#' | '"') {
                            break;
                        }
                        word.push(ch);
                        self.advance();
                    }
                    if word.is_empty() {
                        return Err(format!("unexpected character '{}' at {}", c, loc));
                    }
                    if let Ok(n) = word.parse::<u64>() {
                        tokens.push(Token {
                            kind: TokenKind::Number(n),
                            loc,
                        });
                    } else {
                        tokens.push(Token {
                            kind: TokenKind::Word(word),
                            loc,
                        });
                    }
                }
            }
        }

        Ok(tokens)
    }
}
