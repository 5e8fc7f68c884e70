use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::lexer::{Lexer, Loc, Token, TokenKind};
use crate::config::types::{AppConfig, ListenAddress, LocationConfig, ServerConfig};

#[derive(Debug)]
pub enum ConfigError {
    Syntax {
        message: String,
        loc: Option<Loc>,
        context: Vec<String>,
    },
    Generic(String),
}

impl ConfigError {
    fn at(message: impl Into<String>, loc: Loc, context: &[String]) -> Self {
        ConfigError::Syntax {
            message: message.into(),
            loc: Some(loc),
            context: context.to_vec(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Syntax {
                message,
                loc,
                context,
            } => {
                write!(f, "\x1b[31m❌ Configuration Error\x1b[0m: {message}")?;
                if let Some(loc) = loc {
                    write!(f, " (at {loc})")?;
                }
                for ctx in context.iter().rev() {
                    write!(f, "\n  \x1b[2min {ctx}\x1b[0m")?;
                }
                Ok(())
            }
            ConfigError::Generic(s) => write!(f, "{s}"),
        }
    }
}

impl std::error::Error for ConfigError {}

pub type ParseResult<T> = Result<T, ConfigError>;

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    context: Vec<String>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            cursor: 0,
            context: Vec::new(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn loc(&self) -> Loc {
        self.peek()
            .map(|t| t.loc)
            .or_else(|| self.tokens.last().map(|t| t.loc))
            .unwrap_or(Loc { line: 0, col: 0 })
    }

    fn err(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::at(message, self.loc(), &self.context)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.cursor).cloned();
        if tok.is_some() {
            self.cursor += 1;
        }
        tok
    }

    fn expect_semicolon(&mut self) -> ParseResult<()> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Semicolon,
                ..
            }) => Ok(()),
            Some(t) => Err(self.err(format!("expected ';', found '{}'", t.kind))),
            None => Err(self.err("expected ';', found end of file")),
        }
    }

    fn expect_lbrace(&mut self) -> ParseResult<()> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::LBrace,
                ..
            }) => Ok(()),
            Some(t) => Err(self.err(format!("expected '{{', found '{}'", t.kind))),
            None => Err(self.err("expected '{', found end of file")),
        }
    }

    fn at_rbrace(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token {
                kind: TokenKind::RBrace,
                ..
            })
        )
    }

    /// Consumes one bare value token (word, number, or quoted string) as a string.
    fn value(&mut self) -> ParseResult<String> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Word(w),
                ..
            }) => Ok(w),
            Some(Token {
                kind: TokenKind::Number(n),
                ..
            }) => Ok(n.to_string()),
            Some(Token {
                kind: TokenKind::Str(s),
                ..
            }) => Ok(s),
            Some(t) => Err(self.err(format!("expected a value, found '{}'", t.kind))),
            None => Err(self.err("expected a value, found end of file")),
        }
    }

    fn values_until_semicolon(&mut self) -> ParseResult<Vec<String>> {
        let mut out = Vec::new();
        loop {
            match self.peek() {
                Some(Token {
                    kind: TokenKind::Semicolon,
                    ..
                }) => {
                    self.advance();
                    return Ok(out);
                }
                Some(_) => out.push(self.value()?),
                None => return Err(self.err("expected ';', found end of file")),
            }
        }
    }

    fn directive_name(&mut self) -> ParseResult<(String, Loc)> {
        let loc = self.loc();
        match self.advance() {
            Some(Token {
                kind: TokenKind::Word(w),
                ..
            }) => Ok((w, loc)),
            Some(t) => Err(self.err(format!("expected a directive name, found '{}'", t.kind))),
            None => Err(self.err("expected a directive name, found end of file")),
        }
    }
}

fn parse_size(s: &str) -> Result<usize, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty size literal".to_string());
    }
    let (digits, mult) = match s.chars().last().unwrap() {
        'k' | 'K' => (&s[..s.len() - 1], 1024usize),
        'm' | 'M' => (&s[..s.len() - 1], 1024 * 1024),
        'g' | 'G' => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        _ => (s, 1),
    };
    let n: usize = digits
        .parse()
        .map_err(|_| format!("invalid size literal '{s}'"))?;
    Ok(n * mult)
}

fn parse_listen(value: &str) -> Result<ListenAddress, String> {
    match value.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port
                .parse()
                .map_err(|_| format!("invalid port in listen address '{value}'"))?;
            let host = if host.is_empty() {
                "0.0.0.0".to_string()
            } else {
                host.to_string()
            };
            Ok(ListenAddress { host, port })
        }
        None => {
            let port: u16 = value
                .parse()
                .map_err(|_| format!("invalid listen address '{value}'"))?;
            Ok(ListenAddress {
                host: "0.0.0.0".to_string(),
                port,
            })
        }
    }
}

impl Parser {
    fn parse_location_block(&mut self) -> ParseResult<LocationConfig> {
        let path = self.value()?;
        self.expect_lbrace()?;
        self.context.push(format!("location \"{path}\""));

        let mut loc = LocationConfig {
            path,
            ..Default::default()
        };
        let mut seen_scalar: HashMap<&'static str, Loc> = HashMap::new();

        while !self.at_rbrace() {
            let (name, dloc) = self.directive_name()?;
            match name.as_str() {
                "root" => {
                    self.reject_dup("root", dloc, &mut seen_scalar)?;
                    let v = self.value()?;
                    self.expect_semicolon()?;
                    loc.root = Some(v);
                }
                "index" => {
                    loc.index.extend(self.values_until_semicolon()?);
                }
                "methods" => {
                    loc.methods = self
                        .values_until_semicolon()?
                        .into_iter()
                        .map(|m| m.to_uppercase())
                        .collect();
                }
                "autoindex" => {
                    self.reject_dup("autoindex", dloc, &mut seen_scalar)?;
                    let v = self.value()?;
                    self.expect_semicolon()?;
                    loc.autoindex = parse_bool(&v).map_err(|e| self.err(e))?;
                }
                "upload_enable" => {
                    self.reject_dup("upload_enable", dloc, &mut seen_scalar)?;
                    let v = self.value()?;
                    self.expect_semicolon()?;
                    loc.upload_enable = parse_bool(&v).map_err(|e| self.err(e))?;
                }
                "upload_store" => {
                    self.reject_dup("upload_store", dloc, &mut seen_scalar)?;
                    let v = self.value()?;
                    self.expect_semicolon()?;
                    loc.upload_store = Some(v);
                }
                "client_max_body_size" => {
                    self.reject_dup("client_max_body_size", dloc, &mut seen_scalar)?;
                    let v = self.value()?;
                    self.expect_semicolon()?;
                    loc.client_max_body_size = Some(parse_size(&v).map_err(|e| self.err(e))?);
                }
                "cgi_pass" => {
                    let ext = self.value()?;
                    let interp = self.value()?;
                    self.expect_semicolon()?;
                    let ext = if ext.starts_with('.') {
                        ext
                    } else {
                        format!(".{ext}")
                    };
                    if loc.cgi.insert(ext.clone(), interp).is_some() {
                        return Err(self.err(format!("duplicate cgi_pass for extension '{ext}'")));
                    }
                }
                "return" => {
                    let code = self.value()?;
                    let target = self.value()?;
                    self.expect_semicolon()?;
                    let code: u16 = code
                        .parse()
                        .map_err(|_| self.err(format!("invalid return status code '{code}'")))?;
                    loc.redirect = Some((code, target));
                }
                "error_page" => {
                    let mut parts = self.values_until_semicolon()?;
                    if parts.len() < 2 {
                        return Err(self.err("error_page requires a status code and a path"));
                    }
                    let path = parts.pop().unwrap();
                    for code_s in parts {
                        let code: u16 = code_s.parse().map_err(|_| {
                            self.err(format!("invalid status code '{code_s}' in error_page"))
                        })?;
                        loc.error_pages.insert(code, path.clone());
                    }
                }
                other => {
                    return Err(self.err(format!("unknown location directive '{other}'")));
                }
            }
        }
        self.advance(); // '}'
        self.context.pop();
        Ok(loc)
    }

    fn reject_dup(
        &self,
        name: &'static str,
        loc: Loc,
        seen: &mut HashMap<&'static str, Loc>,
    ) -> ParseResult<()> {
        if let Some(prev) = seen.insert(name, loc) {
            return Err(ConfigError::at(
                format!("directive '{name}' already set (first seen at {prev})"),
                loc,
                &self.context,
            ));
        }
        Ok(())
    }

    fn parse_server_block(&mut self) -> ParseResult<ServerConfig> {
        self.expect_lbrace()?;
        self.context.push("server".to_string());

        let mut srv = ServerConfig::default();
        let mut seen_scalar: HashMap<&'static str, Loc> = HashMap::new();

        while !self.at_rbrace() {
            let (name, dloc) = self.directive_name()?;
            match name.as_str() {
                "listen" => {
                    let v = self.value()?;
                    self.expect_semicolon()?;
                    srv.listen.push(parse_listen(&v).map_err(|e| self.err(e))?);
                }
                "server_name" => {
                    self.reject_dup("server_name", dloc, &mut seen_scalar)?;
                    let v = self.value()?;
                    self.expect_semicolon()?;
                    srv.server_name = Some(v);
                }
                "root" => {
                    self.reject_dup("root", dloc, &mut seen_scalar)?;
                    let v = self.value()?;
                    self.expect_semicolon()?;
                    srv.root = Some(v);
                }
                "index" => {
                    srv.index.extend(self.values_until_semicolon()?);
                }
                "client_max_body_size" => {
                    self.reject_dup("client_max_body_size", dloc, &mut seen_scalar)?;
                    let v = self.value()?;
                    self.expect_semicolon()?;
                    srv.client_max_body_size = Some(parse_size(&v).map_err(|e| self.err(e))?);
                }
                "error_page" => {
                    let mut parts = self.values_until_semicolon()?;
                    if parts.len() < 2 {
                        return Err(self.err("error_page requires a status code and a path"));
                    }
                    let path = parts.pop().unwrap();
                    for code_s in parts {
                        let code: u16 = code_s.parse().map_err(|_| {
                            self.err(format!("invalid status code '{code_s}' in error_page"))
                        })?;
                        srv.error_pages.insert(code, path.clone());
                    }
                }
                "location" => {
                    srv.locations.push(self.parse_location_block()?);
                }
                other => {
                    return Err(self.err(format!("unknown server directive '{other}'")));
                }
            }
        }
        self.advance(); // '}'

        if srv.listen.is_empty() {
            return Err(self.err("server block has no 'listen' directive"));
        }
        if srv.locations.is_empty() {
            return Err(self.err("server block has no 'location' blocks"));
        }

        self.context.pop();
        Ok(srv)
    }

    fn parse_http_block(&mut self, servers: &mut Vec<ServerConfig>) -> ParseResult<usize> {
        self.expect_lbrace()?;
        self.context.push("http".to_string());

        let mut max_body = None;
        while !self.at_rbrace() {
            let (name, dloc) = self.directive_name()?;
            match name.as_str() {
                "client_max_body_size" => {
                    if max_body.is_some() {
                        return Err(ConfigError::at(
                            "directive 'client_max_body_size' already set",
                            dloc,
                            &self.context,
                        ));
                    }
                    let v = self.value()?;
                    self.expect_semicolon()?;
                    max_body = Some(parse_size(&v).map_err(|e| self.err(e))?);
                }
                "server" => {
                    servers.push(self.parse_server_block()?);
                }
                other => {
                    return Err(self.err(format!("unknown http directive '{other}'")));
                }
            }
        }
        self.advance(); // '}'
        self.context.pop();
        Ok(max_body.unwrap_or(crate::config::types::DEFAULT_MAX_BODY_SIZE))
    }

    fn parse_top_level(&mut self) -> ParseResult<AppConfig> {
        let mut servers = Vec::new();
        let mut http_max_body_size = crate::config::types::DEFAULT_MAX_BODY_SIZE;
        let mut seen_http = false;

        while self.peek().is_some() {
            let (name, loc) = self.directive_name()?;
            match name.as_str() {
                "http" => {
                    if seen_http {
                        return Err(ConfigError::at(
                            "only one 'http' block is allowed",
                            loc,
                            &self.context,
                        ));
                    }
                    seen_http = true;
                    http_max_body_size = self.parse_http_block(&mut servers)?;
                }
                "server" => {
                    servers.push(self.parse_server_block()?);
                }
                other => {
                    return Err(self.err(format!("unknown top-level directive '{other}'")));
                }
            }
        }

        if servers.is_empty() {
            return Err(self.err("configuration defines no server blocks"));
        }

        Ok(AppConfig {
            http_max_body_size,
            servers: servers.into_iter().map(Arc::new).collect(),
        })
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s {
        "on" | "true" => Ok(true),
        "off" | "false" => Ok(false),
        other => Err(format!("expected 'on' or 'off', found '{other}'")),
    }
}

pub fn parse(source: &str) -> ParseResult<AppConfig> {
    let tokens = Lexer::new(source)
        .tokenize()
        .map_err(ConfigError::Generic)?;
    Parser::new(tokens).parse_top_level()
}
