#[cfg(test)]
mod integration_tests {
    use std::fs;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::thread;
    use std::time::Duration;
    use webserv::config;
    use webserv::poll_set::PollSet;
    use webserv::server::Server;

    fn read_all(stream: &mut TcpStream, timeout: Duration) -> String {
        stream.set_read_timeout(Some(timeout)).unwrap();
        let mut out = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => out.extend_from_slice(&buf[..n]),
                Err(_) => break,
            }
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    fn spawn_server(source: &'static str) {
        thread::spawn(move || {
            let app_config = config::load(source).expect("test config must parse");
            let mut pollset = PollSet::new(1024).unwrap();
            let mut server = Server::new(app_config, &mut pollset).unwrap();
            server.run(&mut pollset).unwrap();
        });
        thread::sleep(Duration::from_millis(300));
    }

    #[test]
    fn test_server_chunked_upload() {
        let test_root = "./tmp_test_chunked_root";
        let upload_path = "./tmp_test_chunked_root/uploads";
        let _ = fs::remove_dir_all(test_root);
        fs::create_dir_all(upload_path).expect("failed to create test directories");

        spawn_server(
            r#"
server {
    listen 8092;
    server_name 127.0.0.1;
    client_max_body_size 1048576;
    location /upload {
        root ./tmp_test_chunked_root;
        upload_enable on;
        upload_store uploads;
        methods GET POST;
    }
}
"#,
        );

        let mut stream = TcpStream::connect("127.0.0.1:8092").expect("failed to connect");
        stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        let headers = "POST /upload/test.txt HTTP/1.1\r\n\
                       Host: 127.0.0.1:8092\r\n\
                       Transfer-Encoding: chunked\r\n\
                       Content-Type: text/plain\r\n\r\n";
        stream.write_all(headers.as_bytes()).unwrap();
        stream.write_all(b"5\r\nHello\r\n").unwrap();
        thread::sleep(Duration::from_millis(100));
        stream.write_all(b"7\r\n World!\r\n").unwrap();
        thread::sleep(Duration::from_millis(100));
        stream.write_all(b"0\r\n\r\n").unwrap();
        stream.flush().unwrap();

        let response = read_all(&mut stream, Duration::from_secs(2));
        assert!(response.contains("201 Created") || response.contains("200 OK"));

        let mut found_content = false;
        let mut found_name = false;
        for entry in fs::read_dir(upload_path).unwrap() {
            let path = entry.unwrap().path();
            if path.is_file() && fs::read_to_string(&path).unwrap() == "Hello World!" {
                found_content = true;
                if path.file_name().and_then(|n| n.to_str()) == Some("test.txt") {
                    found_name = true;
                }
            }
        }
        assert!(found_content, "chunked data was not correctly assembled on disk");
        assert!(found_name, "uploaded file must keep the name from the request path, not a generated one");

        let _ = fs::remove_dir_all(test_root);
    }

    #[test]
    fn test_server_serves_static_file() {
        let test_root = "./tmp_test_static_root";
        let _ = fs::remove_dir_all(test_root);
        fs::create_dir_all(test_root).unwrap();
        fs::write(format!("{test_root}/index.html"), "Hello").unwrap();

        spawn_server(
            r#"
server {
    listen 8093;
    server_name localhost;
    location / {
        root ./tmp_test_static_root;
        methods GET;
    }
}
"#,
        );

        let mut stream = TcpStream::connect("127.0.0.1:8093").unwrap();
        let request = "GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n";
        stream.write_all(request.as_bytes()).unwrap();

        let response = read_all(&mut stream, Duration::from_secs(2));
        assert!(response.contains("200 OK"));
        assert!(response.ends_with("Hello"));

        let _ = fs::remove_dir_all(test_root);
    }

    #[test]
    fn test_server_closes_connection_after_response() {
        let test_root = "./tmp_test_close_root";
        let _ = fs::remove_dir_all(test_root);
        fs::create_dir_all(test_root).unwrap();
        fs::write(format!("{test_root}/index.html"), "Hi").unwrap();

        spawn_server(
            r#"
server {
    listen 8094;
    server_name localhost;
    location / {
        root ./tmp_test_close_root;
        methods GET;
    }
}
"#,
        );

        let mut stream = TcpStream::connect("127.0.0.1:8094").unwrap();
        let request = "GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n";
        stream.write_all(request.as_bytes()).unwrap();

        let response = read_all(&mut stream, Duration::from_secs(2));
        assert!(response.contains("200 OK"));
        // The socket must be at EOF, not merely idle: a second read call on an
        // already-closed peer returns Ok(0) immediately.
        let mut buf = [0u8; 16];
        stream.set_read_timeout(Some(Duration::from_millis(500))).unwrap();
        assert_eq!(stream.read(&mut buf).unwrap(), 0);

        let _ = fs::remove_dir_all(test_root);
    }

    #[test]
    fn test_fragmented_chunk_boundaries() {
        let test_root = "./tmp_test_fragmented_root";
        let upload_path = "./tmp_test_fragmented_root/uploads";
        let _ = fs::remove_dir_all(test_root);
        fs::create_dir_all(upload_path).unwrap();

        spawn_server(
            r#"
server {
    listen 8095;
    server_name 127.0.0.1;
    location /upload {
        root ./tmp_test_fragmented_root;
        upload_enable on;
        upload_store uploads;
        methods POST;
    }
}
"#,
        );

        let mut stream = TcpStream::connect("127.0.0.1:8095").unwrap();
        let headers = "POST /upload/frag.txt HTTP/1.1\r\n\
                       Host: 127.0.0.1:8095\r\n\
                       Transfer-Encoding: chunked\r\n\
                       Content-Type: text/plain\r\n\r\n";
        stream.write_all(headers.as_bytes()).unwrap();
        stream.flush().unwrap();
        thread::sleep(Duration::from_millis(200));

        // Split a single chunk's size line, data, and terminator across writes.
        stream.write_all(b"B\r\n").unwrap();
        stream.flush().unwrap();
        thread::sleep(Duration::from_millis(150));
        stream.write_all(b"Rust Stream").unwrap();
        stream.flush().unwrap();
        thread::sleep(Duration::from_millis(150));
        stream.write_all(b"\r\n0\r\n").unwrap();
        stream.flush().unwrap();
        thread::sleep(Duration::from_millis(150));
        stream.write_all(b"\r\n").unwrap();
        stream.flush().unwrap();

        let response = read_all(&mut stream, Duration::from_secs(2));
        assert!(response.contains("201 Created") || response.contains("200 OK"));

        let _ = fs::remove_dir_all(test_root);
    }
}
