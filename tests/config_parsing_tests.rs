use webserv::config;

fn err_to_str(e: webserv::config::ConfigError) -> String {
    format!("{}", e)
}

#[test]
fn test_valid_server_config() {
    let src = r#"
http {
    server {
        listen 0.0.0.0:80;
        server_name myserv;
        client_max_body_size 2048;
        location / {
            root ./www;
        }
    }
}
"#;
    let config = config::load(src).unwrap();
    assert_eq!(config.servers.len(), 1);
    let server = &config.servers[0];
    assert_eq!(server.listen[0].host, "0.0.0.0");
    assert_eq!(server.listen[0].port, 80);
    assert_eq!(server.server_name.as_deref(), Some("myserv"));
    assert_eq!(server.client_max_body_size, Some(2048));
    assert_eq!(server.locations[0].path, "/");
}

#[test]
fn test_multiple_listen_addresses() {
    let src = r#"
server {
    listen 8080;
    listen 8081;
    server_name test_server;
    client_max_body_size 1024;
    location / {
        methods GET;
        root ./www;
        index index.html;
        autoindex on;
    }
}
"#;
    let config = config::load(src).expect("should parse valid config");
    assert_eq!(config.servers.len(), 1);
    let server = &config.servers[0];
    assert_eq!(server.listen.len(), 2);
    assert_eq!(server.listen[0].port, 8080);
    assert_eq!(server.listen[1].port, 8081);
    assert_eq!(server.locations.len(), 1);
    assert_eq!(server.locations[0].path, "/");
    assert!(server.locations[0].autoindex);
}

#[test]
fn test_missing_semicolon() {
    let src = r#"
server {
    listen 80
    location / { root ./www; }
}
"#;
    let err = err_to_str(config::load(src).unwrap_err());
    assert!(err.contains("expected ';'"));
}

#[test]
fn test_unknown_server_directive() {
    let src = r#"
server {
    listen 80;
    fake_directive foo;
    location / { root ./www; }
}
"#;
    let err = err_to_str(config::load(src).unwrap_err());
    assert!(err.contains("unknown server directive"));
}

#[test]
fn test_unknown_location_directive() {
    let src = r#"
server {
    listen 80;
    location / {
        fake_directive foo;
        root ./www;
    }
}
"#;
    let err = err_to_str(config::load(src).unwrap_err());
    assert!(err.contains("unknown location directive"));
}

#[test]
fn test_type_mismatch_in_size() {
    let src = r#"
server {
    listen 80;
    client_max_body_size not_a_number;
    location / { root ./www; }
}
"#;
    let err = err_to_str(config::load(src).unwrap_err());
    assert!(err.contains("invalid size literal"));
}

#[test]
fn test_invalid_listen_port() {
    let src = r#"
server {
    listen 0.0.0.0:notaport;
    location / { root ./www; }
}
"#;
    let err = err_to_str(config::load(src).unwrap_err());
    assert!(err.contains("invalid port"));
}

#[test]
fn test_full_app_config_two_servers() {
    let src = r#"
http {
    server {
        listen 8080;
        server_name web1;
        location / { root ./web1/www; }
    }
    server {
        listen 9090;
        server_name web2;
        location / { root ./web2/www; }
    }
}
"#;
    let config = config::load(src).unwrap();
    assert_eq!(config.servers.len(), 2);
    assert_eq!(config.servers[0].server_name.as_deref(), Some("web1"));
    assert_eq!(config.servers[1].listen[0].port, 9090);
}

#[test]
fn test_missing_listen_directive_rejected() {
    let src = r#"
server {
    location / { root ./www; }
}
"#;
    let err = err_to_str(config::load(src).unwrap_err());
    assert!(err.contains("no 'listen' directive"));
}

#[test]
fn test_missing_location_block_rejected() {
    let src = r#"
server {
    listen 80;
}
"#;
    let err = err_to_str(config::load(src).unwrap_err());
    assert!(err.contains("no 'location' blocks"));
}

#[test]
fn test_duplicate_directive_rejected() {
    let src = r#"
server {
    listen 80;
    server_name a;
    server_name b;
    location / { root ./www; }
}
"#;
    let err = err_to_str(config::load(src).unwrap_err());
    assert!(err.contains("already set"));
}

#[test]
fn test_invalid_autoindex_value() {
    let src = r#"
server {
    listen 80;
    location / {
        root ./www;
        autoindex yes;
    }
}
"#;
    let err = err_to_str(config::load(src).unwrap_err());
    assert!(err.contains("expected 'on' or 'off'"));
}

#[test]
fn test_cgi_pass_and_return() {
    let src = r#"
server {
    listen 80;
    location /cgi-bin {
        root ./www;
        cgi_pass .py /usr/bin/python3;
    }
    location /old {
        return 301 /new;
    }
}
"#;
    let config = config::load(src).unwrap();
    let server = &config.servers[0];
    assert_eq!(
        server.locations[0].cgi.get(".py").map(String::as_str),
        Some("/usr/bin/python3")
    );
    assert_eq!(server.locations[1].redirect, Some((301, "/new".to_string())));
}

#[test]
fn test_error_page_directive() {
    let src = r#"
server {
    listen 80;
    error_page 404 /404.html;
    location / { root ./www; }
}
"#;
    let config = config::load(src).unwrap();
    assert_eq!(
        config.servers[0].error_pages.get(&404).map(String::as_str),
        Some("/404.html")
    );
}

#[test]
fn test_validate_rejects_bind_conflict() {
    let src = r#"
http {
    server {
        listen 0.0.0.0:80;
        location / { root ./www; }
    }
    server {
        listen 0.0.0.0:80;
        location / { root ./www; }
    }
}
"#;
    let err = config::load(src).unwrap_err();
    assert!(format!("{err}").contains("duplicate server"));
}
