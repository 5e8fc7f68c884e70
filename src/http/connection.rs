use crate::prelude::*;

#[derive(Debug)]
pub struct HttpConnection {
    pub stream: TcpStream,
    pub write_buffer: Vec<u8>,
    pub request: HttpRequest,
    pub response: HttpResponse,
    pub config_list: Vec<Arc<ServerConfig>>,
    pub s_cfg: Option<Arc<ServerConfig>>,
    pub action: ActiveAction,
    pub upload_manager: Option<Upload>,
    pub total_body_read: usize,
    pub body_remaining: usize,
    pub boundary: String,
    pub closed: bool,
    pub cgi_in_token: Option<Token>,
    pub cgi_out_token: Option<Token>,
    pub cgi_buffer: Vec<u8>,
    pub last_activity: Instant,
}

#[derive(Debug)]
pub enum ActiveAction {
    Upload(PathBuf),
    FileDownload(File, usize),
    Cgi {
        out_stream: mio::net::UnixStream,
        in_stream: Option<mio::net::UnixStream>,
        child: std::process::Child,
        stdout_buf: Vec<u8>,
        start_time: Instant,
    },
    Discard,
    None,
}

impl HttpConnection {
    pub fn new(stream: TcpStream, config_list: Vec<Arc<ServerConfig>>) -> Self {
        Self {
            stream,
            write_buffer: Vec::new(),
            request: HttpRequest::new(),
            response: HttpResponse::new(HTTP_OK, "OK"),
            upload_manager: None,
            config_list,
            s_cfg: None,
            action: ActiveAction::None,
            total_body_read: 0,
            body_remaining: 0,
            boundary: String::new(),
            closed: false,
            cgi_in_token: None,
            cgi_out_token: None,
            cgi_buffer: Vec::new(),
            last_activity: Instant::now(),
        }
    }

    /// A connection is ready to drop once every response byte has left the
    /// socket. `Connection: close` is unconditional, so there is never a
    /// reason to keep it open past this point.
    pub fn should_close(&self) -> bool {
        self.closed && self.write_buffer.is_empty() && self.cgi_buffer.is_empty()
    }

    /// Selects a virtual host by `Host` header / `server_name`, falling back
    /// to the first server bound to this listener.
    pub fn resolve_config(&self) -> Arc<ServerConfig> {
        if let Some(host_header) = self.request.headers.get("host") {
            let hostname = host_header.split(':').next().unwrap_or("");
            for config in &self.config_list {
                if config.server_name.as_deref() == Some(hostname) {
                    return Arc::clone(config);
                }
            }
        }
        Arc::clone(&self.config_list[0])
    }

    /// Returns true (connection should close) on EOF or a read error.
    pub fn read_data(&mut self) -> core::result::Result<bool, ParseError> {
        let mut buf = [0u8; READ_BUF_SIZE];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => return Ok(true),
                Ok(n) => {
                    self.request.buffer.extend_from_slice(&buf[..n]);
                    self.touch();
                    if self.request.buffer.len() >= MAX_READ_DATA / 2 {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(_) => return Ok(true),
            }
        }
        Ok(false)
    }

    pub fn write_data(&mut self) -> bool {
        match self.stream.write(&self.write_buffer) {
            Ok(n) => {
                self.write_buffer.drain(..n);
                self.touch();
                false
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => false,
            Err(_) => true,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

impl HttpConnection {
    /// Reads data from the client socket and dispatches it to the request
    /// parser. Implements CGI backpressure: once the script's stdin pipe is
    /// backlogged, interest flips to WRITABLE until it drains.
    pub fn handle_read_phase(
        conn: &mut HttpConnection,
        poll: &Poll,
        token: Token,
        next_token: &mut usize,
        cgi_to_client: &mut HashMap<Token, Token>,
    ) -> Result<()> {
        match conn.read_data() {
            Ok(is_eof) => conn.closed = is_eof,
            Err(_) => conn.closed = true,
        }

        let mut interest = Interest::READABLE;
        if matches!(conn.action, ActiveAction::Cgi { .. }) && conn.cgi_buffer.len() > MAX_READ_DATA
        {
            interest = Interest::WRITABLE;
        }
        poll.registry()
            .reregister(&mut conn.stream, token, interest)?;

        if !conn.closed && !conn.request.buffer.is_empty() {
            conn.closed =
                HttpRequest::proces_request(poll, token, next_token, cgi_to_client, conn)?;
        }
        Ok(())
    }

    /// Flushes pending response bytes, refilling the write buffer from an
    /// in-progress file download as needed. A connection always closes after
    /// exactly one response is drained -- there is no keep-alive state to
    /// restore here.
    pub fn handle_write_phase(
        conn: &mut HttpConnection,
        poll: &Poll,
        token: Token,
    ) -> Result<()> {
        if conn.write_buffer.is_empty() {
            if let ActiveAction::FileDownload(ref mut file, ref mut remaining) = conn.action {
                let mut chunk = vec![0u8; 8192];
                match file.read(&mut chunk) {
                    Ok(0) => conn.action = ActiveAction::None,
                    Ok(n) => {
                        conn.write_buffer.extend_from_slice(&chunk[..n]);
                        *remaining -= n;
                    }
                    Err(_) => conn.closed = true,
                }
            }
        }

        if !conn.write_buffer.is_empty() {
            conn.closed = conn.write_data() || conn.closed;
        }

        if conn.write_buffer.is_empty() && !matches!(conn.action, ActiveAction::FileDownload(_, _))
        {
            conn.closed = true;
        }

        let mut interest = Interest::READABLE;
        if !conn.write_buffer.is_empty() || matches!(conn.action, ActiveAction::FileDownload(_, _))
        {
            interest |= Interest::WRITABLE;
        }
        poll.registry()
            .reregister(&mut conn.stream, token, interest)?;

        Ok(())
    }

    /// Kills any active CGI child and reaps it, moving it to purgatory if it
    /// won't die immediately, then drops the connection from the server map.
    pub fn terminate_connection(server: &mut Server, token: Token) {
        if let Some(mut conn) = server.connections.remove(&token) {
            let action = std::mem::replace(&mut conn.action, ActiveAction::None);

            if let ActiveAction::Cgi { mut child, .. } = action {
                let _ = child.kill();
                if let Ok(None) = child.try_wait() {
                    server.zombie_purgatory.push(child);
                }
                cleanup_cgi(&mut server.cgi_to_client, &mut conn);
            }
        }
    }
}
