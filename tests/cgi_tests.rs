#[cfg(test)]
mod integration_tests {
    use std::fs;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::os::unix::fs::PermissionsExt;
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

    fn write_script(path: &str, contents: &str) {
        fs::write(path, contents).unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_cgi_script_runs_and_returns_body() {
        let test_root = "./tmp_test_cgi_root";
        let _ = fs::remove_dir_all(test_root);
        fs::create_dir_all(test_root).unwrap();
        write_script(
            &format!("{test_root}/hello.sh"),
            "#!/bin/sh\nprintf 'Content-Type: text/plain\\r\\n\\r\\nhello from cgi\\n'\n",
        );

        spawn_server(
            r#"
server {
    listen 8096;
    server_name localhost;
    location / {
        root ./tmp_test_cgi_root;
        methods GET;
        cgi_pass .sh /bin/sh;
    }
}
"#,
        );

        let mut stream = TcpStream::connect("127.0.0.1:8096").unwrap();
        let request = "GET /hello.sh HTTP/1.1\r\nHost: localhost\r\n\r\n";
        stream.write_all(request.as_bytes()).unwrap();

        let response = read_all(&mut stream, Duration::from_secs(3));
        assert!(response.contains("200 OK"));
        assert!(response.contains("Content-Type: text/plain"));
        assert!(response.contains("Content-Length:"));
        assert!(response.ends_with("hello from cgi\n"));

        let _ = fs::remove_dir_all(test_root);
    }

    #[test]
    fn test_cgi_script_sees_query_string_env() {
        let test_root = "./tmp_test_cgi_env_root";
        let _ = fs::remove_dir_all(test_root);
        fs::create_dir_all(test_root).unwrap();
        write_script(
            &format!("{test_root}/echo_query.sh"),
            "#!/bin/sh\nprintf 'Content-Type: text/plain\\r\\n\\r\\n%s' \"$QUERY_STRING\"\n",
        );

        spawn_server(
            r#"
server {
    listen 8097;
    server_name localhost;
    location / {
        root ./tmp_test_cgi_env_root;
        methods GET;
        cgi_pass .sh /bin/sh;
    }
}
"#,
        );

        let mut stream = TcpStream::connect("127.0.0.1:8097").unwrap();
        let request = "GET /echo_query.sh?name=rust HTTP/1.1\r\nHost: localhost\r\n\r\n";
        stream.write_all(request.as_bytes()).unwrap();

        let response = read_all(&mut stream, Duration::from_secs(3));
        assert!(response.contains("200 OK"));
        assert!(response.ends_with("name=rust"));

        let _ = fs::remove_dir_all(test_root);
    }

    #[test]
    fn test_cgi_timeout_returns_gateway_timeout() {
        let test_root = "./tmp_test_cgi_timeout_root";
        let _ = fs::remove_dir_all(test_root);
        fs::create_dir_all(test_root).unwrap();
        write_script(
            &format!("{test_root}/slow.sh"),
            "#!/bin/sh\nsleep 30\nprintf 'Content-Type: text/plain\\r\\n\\r\\ntoo late'\n",
        );

        spawn_server(
            r#"
server {
    listen 8098;
    server_name localhost;
    location / {
        root ./tmp_test_cgi_timeout_root;
        methods GET;
        cgi_pass .sh /bin/sh;
    }
}
"#,
        );

        let mut stream = TcpStream::connect("127.0.0.1:8098").unwrap();
        let request = "GET /slow.sh HTTP/1.1\r\nHost: localhost\r\n\r\n";
        stream.write_all(request.as_bytes()).unwrap();

        // The script sleeps past the CGI timeout; allow for the timeout
        // itself plus one more sweep tick before the 504 is written back.
        let response = read_all(&mut stream, Duration::from_secs(40));
        assert!(response.contains("504 Gateway Timeout"));

        let _ = fs::remove_dir_all(test_root);
    }
}
