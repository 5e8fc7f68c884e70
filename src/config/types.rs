use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_MAX_BODY_SIZE: usize = 1_048_576; // 1 MiB
pub const DEFAULT_ROOT: &str = "./www";
pub const DEFAULT_INDEX: &str = "index.html";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenAddress {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A path-prefix-scoped configuration attached to a virtual host.
#[derive(Debug, Clone)]
pub struct LocationConfig {
    pub path: String,
    pub root: Option<String>,
    pub index: Vec<String>,
    pub methods: Vec<String>,
    pub autoindex: bool,
    pub upload_enable: bool,
    pub upload_store: Option<String>,
    /// extension (with leading dot, e.g. ".py") -> interpreter path.
    pub cgi: HashMap<String, String>,
    pub redirect: Option<(u16, String)>,
    pub client_max_body_size: Option<usize>,
    pub error_pages: HashMap<u16, String>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            root: None,
            index: Vec::new(),
            methods: vec!["GET".to_string()],
            autoindex: false,
            upload_enable: false,
            upload_store: None,
            cgi: HashMap::new(),
            redirect: None,
            client_max_body_size: None,
            error_pages: HashMap::new(),
        }
    }
}

impl LocationConfig {
    /// Resolves the document root, inheriting from the server when unset.
    pub fn effective_root<'a>(&'a self, server: &'a ServerConfig) -> &'a str {
        self.root
            .as_deref()
            .or(server.root.as_deref())
            .unwrap_or(DEFAULT_ROOT)
    }

    pub fn effective_index(&self, server: &ServerConfig) -> Vec<String> {
        if !self.index.is_empty() {
            self.index.clone()
        } else if !server.index.is_empty() {
            server.index.clone()
        } else {
            vec![DEFAULT_INDEX.to_string()]
        }
    }

    pub fn effective_max_body_size(&self, server: &ServerConfig, http_default: usize) -> usize {
        self.client_max_body_size
            .or(server.client_max_body_size)
            .unwrap_or(http_default)
    }

    pub fn cgi_interpreter_for(&self, url_path: &str) -> Option<(&str, &str)> {
        self.cgi
            .iter()
            .find(|(ext, _)| url_path.ends_with(ext.as_str()))
            .map(|(ext, interp)| (ext.as_str(), interp.as_str()))
    }

    pub fn error_page_for(&self, code: u16, server: &ServerConfig) -> Option<String> {
        self.error_pages
            .get(&code)
            .or_else(|| server.error_pages.get(&code))
            .cloned()
    }
}

/// One virtual host.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: Vec<ListenAddress>,
    pub server_name: Option<String>,
    pub root: Option<String>,
    pub index: Vec<String>,
    pub client_max_body_size: Option<usize>,
    pub error_pages: HashMap<u16, String>,
    pub locations: Vec<LocationConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: Vec::new(),
            server_name: None,
            root: None,
            index: Vec::new(),
            client_max_body_size: None,
            error_pages: HashMap::new(),
            locations: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn binds(&self, addr: &ListenAddress) -> bool {
        self.listen.iter().any(|l| l == addr)
    }

    /// Longest-prefix match of `path` against this server's locations;
    /// ties are broken by definition order.
    pub fn find_location(&self, path: &str) -> Option<&LocationConfig> {
        let mut best: Option<&LocationConfig> = None;
        for loc in &self.locations {
            if !path.starts_with(loc.path.as_str()) {
                continue;
            }
            match best {
                Some(b) if loc.path.len() <= b.path.len() => {}
                _ => best = Some(loc),
            }
        }
        best
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_max_body_size: usize,
    pub servers: Vec<std::sync::Arc<ServerConfig>>,
}

impl AppConfig {
    pub fn servers_for(&self, addr: &ListenAddress) -> Vec<&std::sync::Arc<ServerConfig>> {
        self.servers.iter().filter(|s| s.binds(addr)).collect()
    }

    pub fn all_listen_addresses(&self) -> Vec<ListenAddress> {
        let mut out = Vec::new();
        for s in &self.servers {
            for l in &s.listen {
                if !out.contains(l) {
                    out.push(l.clone());
                }
            }
        }
        out
    }
}
