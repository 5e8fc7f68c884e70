use webserv::http::{HttpResponse, Method};
use std::str::FromStr;

#[test]
fn test_method_from_str_roundtrip() {
    for (raw, expected) in [
        ("GET", Method::GET),
        ("POST", Method::POST),
        ("DELETE", Method::DELETE),
        ("PUT", Method::PUT),
        ("PATCH", Method::PATCH),
        ("HEAD", Method::HEAD),
        ("OPTIONS", Method::OPTIONS),
    ] {
        assert_eq!(Method::from_str(raw).unwrap(), expected);
        assert_eq!(expected.as_str(), raw);
    }
}

#[test]
fn test_method_from_str_rejects_unknown() {
    assert!(Method::from_str("TRACE").is_err());
}

#[test]
fn test_method_is_allowed() {
    let allowed = vec!["GET".to_string(), "HEAD".to_string()];
    assert!(Method::GET.is_allowed(&allowed));
    assert!(!Method::POST.is_allowed(&allowed));
}

#[test]
fn test_response_generation() {
    let mut res = HttpResponse::new(200, "OK");
    res.set_header("Content-Type", "text/plain");
    res.set_body(b"Hello Rust".to_vec(), "text/plain");

    let bytes = res.to_bytes();
    let s = String::from_utf8_lossy(&bytes);

    assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(s.contains("Content-Type: text/plain\r\n"));
    assert!(s.contains("Content-Length: 10\r\n"));
    assert!(s.ends_with("\r\n\r\nHello Rust"));
}

#[test]
fn test_response_default_headers() {
    let res = HttpResponse::new(404, "Not Found");
    let bytes = res.to_bytes();
    let s = String::from_utf8_lossy(&bytes);

    assert!(s.contains("Connection: close\r\n"));
    assert!(s.contains("Content-Length: 0\r\n"));
}

#[test]
fn test_header_emission_order_is_stable() {
    let mut res = HttpResponse::new(200, "OK");
    res.set_header("Vary", "Accept-Encoding");
    res.set_header("X-Custom", "1");
    res.set_body(b"hi".to_vec(), "text/plain");

    let bytes = res.to_bytes();
    let s = String::from_utf8_lossy(&bytes);
    let header_block = s.split("\r\n\r\n").next().unwrap();
    let lines: Vec<&str> = header_block.split("\r\n").skip(1).collect();

    assert_eq!(
        lines,
        vec![
            "Content-Type: text/plain",
            "Content-Length: 2",
            "Connection: close",
            "Vary: Accept-Encoding",
            "X-Custom: 1",
        ]
    );
}

#[test]
fn test_status_text_known_codes() {
    assert_eq!(HttpResponse::status_text(200), "OK");
    assert_eq!(HttpResponse::status_text(404), "Not Found");
    assert_eq!(HttpResponse::status_text(500), "Internal Server Error");
}
