use webserv::config::{LocationConfig, ServerConfig};
use webserv::http::Method;
use webserv::router::{self, RoutingError};

fn server_with_locations(locations: Vec<LocationConfig>) -> ServerConfig {
    ServerConfig {
        locations,
        ..Default::default()
    }
}

fn location(path: &str, methods: &[&str]) -> LocationConfig {
    LocationConfig {
        path: path.to_string(),
        methods: methods.iter().map(|m| m.to_string()).collect(),
        ..Default::default()
    }
}

#[test]
fn test_router_simple_match() {
    let cfg = server_with_locations(vec![location("/", &["GET"])]);
    let loc = router::find_location(&cfg, "/", &Method::GET).unwrap();
    assert_eq!(loc.path, "/");
}

#[test]
fn test_router_falls_back_to_root_location() {
    let cfg = server_with_locations(vec![location("/", &["GET"])]);
    let loc = router::find_location(&cfg, "/unconfigured", &Method::GET).unwrap();
    assert_eq!(loc.path, "/");
}

#[test]
fn test_router_longest_prefix_match() {
    let cfg = server_with_locations(vec![location("/a", &["GET"]), location("/a/b", &["GET"])]);
    let loc = router::find_location(&cfg, "/a/b/c", &Method::GET).unwrap();
    assert_eq!(loc.path, "/a/b");
}

#[test]
fn test_router_ties_broken_by_definition_order() {
    let cfg = server_with_locations(vec![location("/a", &["GET"]), location("/a", &["POST"])]);
    let loc = router::find_location(&cfg, "/a", &Method::GET).unwrap();
    assert_eq!(loc.methods, vec!["GET".to_string()]);
}

#[test]
fn test_router_method_not_allowed() {
    let cfg = server_with_locations(vec![location("/", &["GET"])]);
    let err = router::find_location(&cfg, "/", &Method::POST).unwrap_err();
    assert!(matches!(err, RoutingError::MethodNotAllowed));
}

#[test]
fn test_router_path_not_found() {
    let cfg = server_with_locations(vec![location("/a", &["GET"])]);
    let err = router::find_location(&cfg, "/b", &Method::GET).unwrap_err();
    assert!(matches!(err, RoutingError::NotFound));
}

#[test]
fn test_resolve_fs_path_strips_location_prefix() {
    let cfg = ServerConfig {
        root: Some(".".to_string()),
        ..Default::default()
    };
    let loc = LocationConfig {
        path: "/static".to_string(),
        root: Some(".".to_string()),
        ..Default::default()
    };
    let resolved = router::resolve_fs_path(&cfg, &loc, "/static/css/app.css").unwrap();
    assert!(resolved.ends_with("css/app.css"));
}

#[test]
fn test_resolve_fs_path_rejects_traversal_outside_root() {
    let cfg = ServerConfig {
        root: Some(".".to_string()),
        ..Default::default()
    };
    let loc = LocationConfig {
        path: "/".to_string(),
        root: Some(".".to_string()),
        ..Default::default()
    };
    let err = router::resolve_fs_path(&cfg, &loc, "/../../etc/passwd").unwrap_err();
    assert!(matches!(err, RoutingError::NotFound));
}
