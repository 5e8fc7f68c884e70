use std::collections::HashMap;

use crate::config::parser::ConfigError;
use crate::config::types::AppConfig;

/// Cross-cutting checks that span multiple server blocks. Bind conflicts are
/// fatal; missing files/roots are surfaced as warnings since CGI scripts and
/// upload directories may be created after the config is written.
pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    check_bind_conflicts(config)?;

    for server in &config.servers {
        for (code, path) in &server.error_pages {
            if !(100..=599).contains(code) {
                return Err(ConfigError::Generic(format!(
                    "invalid status code {code} in error_page directive"
                )));
            }
            if std::fs::metadata(path).is_err() {
                proxy_log::warn!("error page '{}' (status {}) does not exist", path, code);
            }
        }
        for location in &server.locations {
            if let Some(root) = &location.root {
                if std::fs::read_dir(root).is_err() {
                    proxy_log::warn!(
                        "location \"{}\" root '{}' is not a readable directory",
                        location.path,
                        root
                    );
                }
            }
            for (code, path) in &location.error_pages {
                if !(100..=599).contains(code) {
                    return Err(ConfigError::Generic(format!(
                        "invalid status code {code} in error_page directive"
                    )));
                }
                if std::fs::metadata(path).is_err() {
                    proxy_log::warn!("error page '{}' (status {}) does not exist", path, code);
                }
            }
        }
    }

    Ok(())
}

/// A `0.0.0.0:port` default-style listener conflicts with any other server
/// bound to the same port (same host, or the wildcard address), unless both
/// declare distinct `server_name`s -- distinguishable only by Host header.
fn check_bind_conflicts(config: &AppConfig) -> Result<(), ConfigError> {
    let mut by_port: HashMap<u16, Vec<(&str, Option<&str>)>> = HashMap::new();

    for server in &config.servers {
        for addr in &server.listen {
            let entries = by_port.entry(addr.port).or_default();
            for (host, name) in entries.iter() {
                let same_host = *host == addr.host || *host == "0.0.0.0" || addr.host == "0.0.0.0";
                if same_host && *name == server.server_name.as_deref() {
                    return Err(ConfigError::Generic(format!(
                        "duplicate server: {}:{} server_name {:?} is bound more than once",
                        addr.host, addr.port, server.server_name
                    )));
                }
            }
            entries.push((addr.host.as_str(), server.server_name.as_deref()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{ListenAddress, LocationConfig, ServerConfig};
    use std::sync::Arc;

    fn make_config(host: &str, ports: &[u16], name: Option<&str>) -> ServerConfig {
        ServerConfig {
            listen: ports
                .iter()
                .map(|p| ListenAddress {
                    host: host.to_string(),
                    port: *p,
                })
                .collect(),
            server_name: name.map(|n| n.to_string()),
            locations: vec![LocationConfig::default()],
            ..Default::default()
        }
    }

    fn app(servers: Vec<ServerConfig>) -> AppConfig {
        AppConfig {
            http_max_body_size: 1_048_576,
            servers: servers.into_iter().map(Arc::new).collect(),
        }
    }

    #[test]
    fn no_conflicts_distinct_ports() {
        let cfg = app(vec![
            make_config("0.0.0.0", &[8080], None),
            make_config("0.0.0.0", &[8081], None),
        ]);
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn virtual_hosts_on_same_port_ok() {
        let cfg = app(vec![
            make_config("0.0.0.0", &[80], Some("a.example.com")),
            make_config("0.0.0.0", &[80], Some("b.example.com")),
        ]);
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn duplicate_default_server_conflicts() {
        let cfg = app(vec![
            make_config("0.0.0.0", &[80], None),
            make_config("0.0.0.0", &[80], None),
        ]);
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn wildcard_conflicts_with_specific_host() {
        let cfg = app(vec![
            make_config("0.0.0.0", &[80], None),
            make_config("127.0.0.1", &[80], None),
        ]);
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn multi_port_partial_conflict() {
        let cfg = app(vec![
            make_config("0.0.0.0", &[80, 8080], None),
            make_config("0.0.0.0", &[8080], None),
        ]);
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn invalid_status_code_rejected() {
        let mut server = make_config("0.0.0.0", &[80], None);
        server.error_pages.insert(999, "/err.html".to_string());
        assert!(validate(&app(vec![server])).is_err());
    }
}
