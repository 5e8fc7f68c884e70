use crate::prelude::*;

/// Splits CGI output into its header block and body, honoring an optional
/// `Status:` pseudo-header (RFC 3875 §6.3).
fn parse_cgi_output(raw_output: &[u8]) -> (u16, Vec<(String, String)>, Vec<u8>) {
    let (header_end, delim_len) = match find_subsequence(raw_output, b"\r\n\r\n", 0) {
        Some(pos) => (pos, 4),
        None => match find_subsequence(raw_output, b"\n\n", 0) {
            Some(pos) => (pos, 2),
            None => (raw_output.len(), 0),
        },
    };

    let header_section = String::from_utf8_lossy(&raw_output[..header_end]);
    let body = raw_output
        .get(header_end + delim_len..)
        .unwrap_or(&[])
        .to_vec();

    let mut status_code = 200;
    let mut headers = Vec::new();

    for line in header_section.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim().to_lowercase();
            let value = value.trim().to_string();

            if key == "status" {
                status_code = value
                    .split_whitespace()
                    .next()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(200);
            } else {
                headers.push((key, value));
            }
        }
    }

    (status_code, headers, body)
}

/// Builds a complete response from accumulated CGI stdout once the child has
/// exited. Output is never streamed chunked: the full body is in hand, so a
/// real `Content-Length` is always computed.
fn build_cgi_response(raw_output: &[u8]) -> HttpResponse {
    let (status, headers, body) = parse_cgi_output(raw_output);
    let mut res = HttpResponse::new(status, &HttpResponse::status_text(status));
    res.headers.remove("content-type");
    for (k, v) in headers {
        res.set_header(&k, &v);
    }
    res.set_body(body, res.headers.get("content-type").cloned().as_deref().unwrap_or("text/html"));
    res
}

/// Drives one readiness event for a CGI connection: reads any available
/// stdout into the accumulation buffer, writes any pending request body into
/// the script's stdin, and finalizes the response once the child exits.
pub fn handle_cgi_event(
    poll: &Poll,
    event: &Event,
    cgi_token: Token,
    client_token: Token,
    conn: &mut HttpConnection,
    cgi_to_client: &mut HashMap<Token, Token>,
) -> Result<()> {
    if let ActiveAction::Cgi {
        out_stream,
        in_stream,
        child,
        stdout_buf,
        start_time: _,
    } = &mut conn.action
    {
        if event.is_readable() && Some(cgi_token) == conn.cgi_out_token {
            let mut buf = [0u8; 4096];
            loop {
                match out_stream.read(&mut buf) {
                    Ok(0) => {
                        conn.cgi_out_token = None;
                        break;
                    }
                    Ok(n) => stdout_buf.extend_from_slice(&buf[..n]),
                    Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                    Err(_) => {
                        conn.cgi_out_token = None;
                        break;
                    }
                }
            }
        }

        if event.is_writable() && Some(cgi_token) == conn.cgi_in_token {
            if !conn.cgi_buffer.is_empty() {
                if let Some(pipe) = in_stream {
                    match pipe.write(&conn.cgi_buffer) {
                        Ok(n) => {
                            conn.cgi_buffer.drain(..n);
                            if conn.body_remaining == 0 && conn.cgi_buffer.is_empty() {
                                conn.cgi_in_token = None;
                                if let Some(pipe) = in_stream.take() {
                                    drop(pipe);
                                }
                            }
                        }
                        Err(e) if e.kind() != ErrorKind::WouldBlock => conn.closed = true,
                        Err(_) => {}
                    }
                }
            } else if conn.body_remaining == 0 {
                conn.cgi_in_token = None;
                if let Some(pipe) = in_stream.take() {
                    drop(pipe);
                }
            }
        }

        match child.try_wait() {
            Ok(Some(_status)) if conn.cgi_out_token.is_none() => {
                let res = build_cgi_response(stdout_buf);
                conn.write_buffer.extend_from_slice(&res.to_bytes());
                cleanup_cgi(cgi_to_client, conn);
                conn.action = ActiveAction::None;
                poll.registry().reregister(
                    &mut conn.stream,
                    client_token,
                    Interest::READABLE | Interest::WRITABLE,
                )?;
            }
            Ok(Some(_)) | Ok(None) => {}
            Err(_) => conn.closed = true,
        }
    }
    Ok(())
}

/// Builds the RFC 3875 environment for a CGI invocation.
pub fn build_cgi_env(
    conn: &HttpConnection,
    s_cfg: &ServerConfig,
    location: &LocationConfig,
    script_path: &Path,
) -> HashMap<String, String> {
    let req = &conn.request;
    let mut envs = HashMap::new();

    let (path_part, query_string) = match req.url.split_once('?') {
        Some((p, q)) => (p, q.to_string()),
        None => (req.url.as_str(), String::new()),
    };
    let path_info = path_part
        .strip_prefix(location.path.as_str())
        .unwrap_or("")
        .to_string();

    envs.insert("GATEWAY_INTERFACE".to_string(), "CGI/1.1".to_string());
    envs.insert("SERVER_PROTOCOL".to_string(), "HTTP/1.1".to_string());
    envs.insert("SERVER_SOFTWARE".to_string(), "webserv/0.1".to_string());
    envs.insert("REQUEST_METHOD".to_string(), req.method.to_string());
    envs.insert("QUERY_STRING".to_string(), query_string);
    envs.insert("PATH_INFO".to_string(), path_info);
    envs.insert("SCRIPT_NAME".to_string(), location.path.clone());
    envs.insert(
        "SCRIPT_FILENAME".to_string(),
        script_path.to_string_lossy().to_string(),
    );
    envs.insert(
        "SERVER_NAME".to_string(),
        s_cfg
            .server_name
            .clone()
            .unwrap_or_else(|| "localhost".to_string()),
    );
    if let Some(addr) = s_cfg.listen.first() {
        envs.insert("SERVER_PORT".to_string(), addr.port.to_string());
    }

    if let Ok(addr) = conn.stream.peer_addr() {
        envs.insert("REMOTE_ADDR".to_string(), addr.ip().to_string());
        envs.insert("REMOTE_PORT".to_string(), addr.port().to_string());
    }

    if let Some(ct) = req.headers.get("content-type") {
        envs.insert("CONTENT_TYPE".to_string(), ct.clone());
    }
    if let Some(cl) = req.headers.get("content-length") {
        envs.insert("CONTENT_LENGTH".to_string(), cl.clone());
    }

    for (k, v) in req.headers.iter() {
        let env_key = format!("HTTP_{}", k.to_uppercase().replace('-', "_"));
        envs.insert(env_key, v.clone());
    }

    envs
}

pub fn cleanup_cgi(cgi_to_client: &mut HashMap<Token, Token>, conn: &mut HttpConnection) {
    if let Some(t) = conn.cgi_out_token.take() {
        cgi_to_client.remove(&t);
    }
    if let Some(t) = conn.cgi_in_token.take() {
        cgi_to_client.remove(&t);
    }
}

pub fn check_time_out_cgi(
    connections: &mut HashMap<Token, HttpConnection>,
    poll: &Poll,
    cgi_to_client: &mut HashMap<Token, Token>,
) {
    for (token, conn) in connections.iter_mut() {
        let timed_out = matches!(
            &conn.action,
            ActiveAction::Cgi { start_time, .. } if start_time.elapsed() > TIMEOUT_CGI
        );
        if timed_out {
            proxy_log::warn!("CGI process on {:?} timed out, killing", token);
            force_cgi_timeout(conn, cgi_to_client);
            poll.registry()
                .reregister(&mut conn.stream, *token, Interest::READABLE | Interest::WRITABLE)
                .ok();
        }
    }
}

/// Kills a runaway CGI child and reaps it, then sends a 504 if no headers
/// have been written to the client yet.
pub fn force_cgi_timeout(conn: &mut HttpConnection, cgi_to_client: &mut HashMap<Token, Token>) {
    if let ActiveAction::Cgi { ref mut child, .. } = conn.action {
        let _ = child.kill();
        let _ = child.wait();

        let res = handle_error(GATEWAY_TIMEOUT, conn.s_cfg.as_ref());
        conn.write_buffer.extend_from_slice(&res.to_bytes());

        conn.cgi_in_token = None;
        conn.cgi_out_token = None;
        conn.cgi_buffer.clear();
        conn.closed = true;

        cleanup_cgi(cgi_to_client, conn);
        conn.action = ActiveAction::None;
    }
}
