use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    POST,
    DELETE,
    PUT,
    PATCH,
    HEAD,
    OPTIONS,
}

impl Method {
    pub fn is_allowed(&self, allowed_methods: &[String]) -> bool {
        allowed_methods.iter().any(|m| m == self.as_str())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::DELETE => "DELETE",
            Method::PUT => "PUT",
            Method::PATCH => "PATCH",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
        }
    }
}

impl FromStr for Method {
    type Err = ParseError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "DELETE" => Ok(Method::DELETE),
            "PUT" => Ok(Method::PUT),
            "PATCH" => Ok(Method::PATCH),
            "HEAD" => Ok(Method::HEAD),
            "OPTIONS" => Ok(Method::OPTIONS),
            _ => Err(ParseError::InvalidMethod),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, PartialEq)]
pub enum ParsingState {
    RequestLine,
    Headers,
    HeadersDone,
    Body,
    ChunkedBody,
    Complete,
    Error,
}

const CRLN_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    IncompleteRequestLine,
    MalformedRequestLine,
    InvalidMethod,
    InvalidUtf8(std::string::FromUtf8Error),
    UnexpectedEof,
    HeaderTooLong,
    TooManyHeaders,
    InvalidHeaderName,
    InvalidHeaderValue,
    InvalidChunkSize,
    PayloadTooLarge,
    ParseHexError,
    Error(u16),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::IncompleteRequestLine => write!(f, "Incomplete request line"),
            ParseError::MalformedRequestLine => write!(f, "Malformed request line"),
            ParseError::InvalidMethod => write!(f, "Invalid HTTP method"),
            ParseError::InvalidUtf8(_) => write!(f, "Invalid UTF-8 in request"),
            ParseError::UnexpectedEof => write!(f, "Unexpected end of input"),
            ParseError::HeaderTooLong => write!(f, "Header line too long"),
            ParseError::TooManyHeaders => write!(f, "Too many headers"),
            ParseError::InvalidHeaderName => write!(f, "Invalid header name"),
            ParseError::InvalidHeaderValue => write!(f, "Invalid header value"),
            ParseError::PayloadTooLarge => write!(f, "Payload too large"),
            ParseError::ParseHexError => write!(f, "Parse hex error"),
            ParseError::Error(_) => write!(f, "other error"),
            ParseError::InvalidChunkSize => write!(f, "invalid chunk size"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<std::string::FromUtf8Error> for ParseError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        ParseError::InvalidUtf8(err)
    }
}

#[derive(Debug)]
pub enum ChunkState {
    ReadSize,
    ReadData(usize),
    ReadTrailingCRLF,
    ReadTrailers,
}

#[derive(Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub version: String,
    pub headers: HashMap<String, String>,
    pub trailers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub body_file: Option<File>,
    pub is_large_body: bool,
    pub buffer: Vec<u8>,
    pub cursor: usize,
    pub state: ParsingState,
    pub chunk_state: ChunkState,
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpRequest {
    pub fn new() -> Self {
        HttpRequest {
            method: Method::GET,
            url: String::new(),
            version: String::new(),
            headers: HashMap::new(),
            trailers: HashMap::new(),
            body: Vec::new(),
            buffer: Vec::with_capacity(4096),
            cursor: 0,
            state: ParsingState::RequestLine,
            is_large_body: false,
            body_file: None,
            chunk_state: ChunkState::ReadSize,
        }
    }

    pub fn clear(&mut self) {
        self.state = ParsingState::RequestLine;
        self.headers.clear();
        self.trailers.clear();
        self.body.clear();
    }

    pub fn finish_request(&mut self) {
        self.buffer.drain(..self.cursor);
        self.cursor = 0;
        self.clear();
    }

    /// Drains as much of the buffered request as can be parsed in one pass.
    /// A connection always closes after exactly one response -- there is no
    /// pipelining to resume once this returns.
    pub fn proces_request(
        poll: &Poll,
        token: Token,
        next_token: &mut usize,
        cgi_to_client: &mut HashMap<Token, Token>,
        conn: &mut HttpConnection,
    ) -> Result<bool> {
        let mut closed = false;
        loop {
            match HttpRequest::parse_request(conn, poll, next_token, cgi_to_client, token) {
                Ok(()) => {
                    trace!("request parsing complete");
                    if let Some(s_cfg) = conn.s_cfg.clone() {
                        if let Some(upload_manager) = &mut conn.upload_manager {
                            let response =
                                Upload::handel_upload_manager(upload_manager, s_cfg.as_ref());
                            conn.write_buffer.extend_from_slice(&response.to_bytes());
                        }
                    }

                    conn.request.finish_request();
                    break;
                }
                Err(ParseError::IncompleteRequestLine) => break,
                Err(e) => {
                    let code = match e {
                        ParseError::PayloadTooLarge => HTTP_PAYLOAD_TOO_LARGE,
                        ParseError::InvalidMethod => HTTP_BAD_REQUEST,
                        ParseError::HeaderTooLong => HTTP_HEADER_FIELDS_TOO_LARGE,
                        _ => HTTP_BAD_REQUEST,
                    };
                    let response = handle_error(code, conn.s_cfg.as_ref());
                    closed = true;
                    conn.write_buffer.extend_from_slice(&response.to_bytes());
                    conn.request.finish_request();
                    break;
                }
            }
        }

        if !conn.write_buffer.is_empty() || matches!(conn.action, ActiveAction::FileDownload(_, _))
        {
            poll.registry().reregister(
                &mut conn.stream,
                token,
                Interest::READABLE | Interest::WRITABLE,
            )?;
        }
        Ok(closed)
    }

    pub fn parse_request(
        conn: &mut HttpConnection,
        poll: &Poll,
        next_token: &mut usize,
        cgi_to_client: &mut HashMap<Token, Token>,
        client_token: Token,
    ) -> core::result::Result<(), ParseError> {
        loop {
            let res = match &conn.request.state {
                ParsingState::RequestLine => conn.request.parse_request_line(),
                ParsingState::Headers => HttpRequest::parse_headers(conn),
                ParsingState::HeadersDone => {
                    if let Some(res) = HttpRequest::setup_action(
                        conn,
                        poll,
                        next_token,
                        cgi_to_client,
                        client_token,
                    )? {
                        conn.write_buffer.extend_from_slice(&res.to_bytes());
                        conn.request.state = ParsingState::Complete;
                    }
                    Ok(())
                }
                ParsingState::Body => HttpRequest::parse_unchunked_body(poll, conn),
                ParsingState::ChunkedBody => match HttpRequest::parse_chunked_body(conn) {
                    Ok(true) => {
                        conn.request.state = ParsingState::Complete;
                        Ok(())
                    }
                    Ok(false) => return Err(ParseError::IncompleteRequestLine),
                    Err(e) => Err(e),
                },
                _ => break,
            };

            match res {
                Ok(_) => {
                    if conn.request.state == ParsingState::Complete {
                        break;
                    }
                }
                Err(ParseError::IncompleteRequestLine) => {
                    return Err(ParseError::IncompleteRequestLine);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn setup_action(
        conn: &mut HttpConnection,
        poll: &Poll,
        next_token: &mut usize,
        cgi_to_client: &mut HashMap<Token, Token>,
        client_token: Token,
    ) -> core::result::Result<Option<HttpResponse>, ParseError> {
        let s_cfg = conn.resolve_config();
        conn.s_cfg = Some(Arc::clone(&s_cfg));

        let content_length = conn
            .request
            .headers
            .get("content-length")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(0);

        let is_chunked = conn
            .request
            .headers
            .get("transfer-encoding")
            .map(|v| v.contains("chunked"))
            .unwrap_or(false);

        let content_type = conn
            .request
            .headers
            .get("content-type")
            .map(|s| s.as_str())
            .unwrap_or("");

        conn.boundary = content_type
            .split("boundary=")
            .nth(1)
            .map(|b| b.trim())
            .unwrap_or("")
            .to_string();

        let request = &conn.request;
        let location = match router::find_location(&s_cfg, &request.url, &request.method) {
            Ok(loc) => loc,
            Err(RoutingError::MethodNotAllowed) => {
                return Ok(Some(handle_error(HTTP_METHOD_NOT_ALLOWED, Some(&s_cfg))))
            }
            Err(RoutingError::NotFound) | Err(RoutingError::Forbidden) => {
                return Ok(Some(handle_error(HTTP_NOT_FOUND, Some(&s_cfg))))
            }
        };

        let max_body = location.effective_max_body_size(&s_cfg, conn_http_default(conn));
        if !is_chunked && content_length > max_body {
            return Err(ParseError::PayloadTooLarge);
        }
        conn.body_remaining = content_length;

        let res = if let Some((code, ref target)) = location.redirect {
            Some(HttpResponse::redirect(code, target))
        } else if let Some((_ext, interp)) = location.cgi_interpreter_for(&request.url) {
            Self::spawn_cgi(conn, poll, next_token, cgi_to_client, client_token, interp)?
        } else {
            match &request.method {
                Method::GET | Method::HEAD => match handle_get(request, location, &s_cfg) {
                    (res, ActiveAction::FileDownload(file, size)) => {
                        conn.action = ActiveAction::FileDownload(file, size);
                        Some(res)
                    }
                    (res, _) => Some(res),
                },
                Method::POST | Method::PUT | Method::PATCH => {
                    if location.upload_enable {
                        let store = location
                            .upload_store
                            .as_deref()
                            .unwrap_or(location.effective_root(&s_cfg));
                        let path = PathBuf::from(location.effective_root(&s_cfg)).join(store);
                        conn.action = ActiveAction::Upload(path);
                        None
                    } else {
                        Some(handle_error(HTTP_METHOD_NOT_ALLOWED, Some(&s_cfg)))
                    }
                }
                Method::DELETE => Some(handle_delete(request, location, &s_cfg)),
                Method::OPTIONS => {
                    let mut res = HttpResponse::new(204, "No Content");
                    res.set_header("Allow", &location.methods.join(", "));
                    Some(res)
                }
            }
        };

        if res.is_none() {
            if is_chunked {
                conn.request.state = ParsingState::ChunkedBody;
            } else if content_length > 0 {
                conn.request.state = ParsingState::Body;
            } else if matches!(conn.action, ActiveAction::Cgi { .. }) {
                conn.request.state = ParsingState::Complete;
            } else {
                let mut res = HttpResponse::new(HTTP_BAD_REQUEST, "Bad Request");
                res.set_body(b"Error: No file data provided.".to_vec(), "text/plain");
                return Ok(Some(res));
            }
        }

        Ok(res)
    }

    #[allow(clippy::too_many_arguments)]
    fn spawn_cgi(
        conn: &mut HttpConnection,
        poll: &Poll,
        next_token: &mut usize,
        cgi_to_client: &mut HashMap<Token, Token>,
        client_token: Token,
        interpreter: &str,
    ) -> core::result::Result<Option<HttpResponse>, ParseError> {
        let s_cfg = conn.s_cfg.clone().unwrap();
        let request_url = conn.request.url.clone();
        let location = match router::find_location(&s_cfg, &request_url, &conn.request.method) {
            Ok(loc) => loc.clone(),
            Err(RoutingError::MethodNotAllowed) => {
                return Ok(Some(handle_error(HTTP_METHOD_NOT_ALLOWED, Some(&s_cfg))))
            }
            Err(_) => return Ok(Some(handle_error(HTTP_NOT_FOUND, Some(&s_cfg)))),
        };

        let script_path = match router::resolve_fs_path(&s_cfg, &location, &request_url) {
            Ok(p) => p,
            Err(RoutingError::Forbidden) => {
                return Ok(Some(handle_error(HTTP_FORBIDDEN, Some(&s_cfg))))
            }
            Err(_) => return Ok(Some(handle_error(HTTP_NOT_FOUND, Some(&s_cfg)))),
        };

        let Ok((server_out_std, script_out_std)) = UnixStream::pair() else {
            return Ok(Some(handle_error(HTTP_INTERNAL_SERVER_ERROR, Some(&s_cfg))));
        };
        server_out_std.set_nonblocking(true).ok();
        let mut server_out_mio = mio::net::UnixStream::from_std(server_out_std);

        let Ok((server_in_std, script_in_std)) = UnixStream::pair() else {
            return Ok(Some(handle_error(HTTP_INTERNAL_SERVER_ERROR, Some(&s_cfg))));
        };
        server_in_std.set_nonblocking(true).ok();
        let mut server_in_mio = mio::net::UnixStream::from_std(server_in_std);

        let script_output_file = unsafe { File::from_raw_fd(script_out_std.into_raw_fd()) };
        let script_input_file = unsafe { File::from_raw_fd(script_in_std.into_raw_fd()) };

        let envs = build_cgi_env(conn, &s_cfg, &location, &script_path);

        let mut cmd = Command::new(interpreter);
        cmd.arg(&script_path)
            .envs(envs)
            .stdin(Stdio::from(script_input_file))
            .stdout(Stdio::from(script_output_file))
            .stderr(Stdio::inherit());

        match cmd.spawn() {
            Ok(child) => {
                let out_token = Token(*next_token);
                *next_token += 1;
                poll.registry()
                    .register(&mut server_out_mio, out_token, Interest::READABLE)
                    .ok();

                let in_token = Token(*next_token);
                *next_token += 1;
                poll.registry()
                    .register(&mut server_in_mio, in_token, Interest::WRITABLE)
                    .ok();

                conn.cgi_out_token = Some(out_token);
                conn.cgi_in_token = Some(in_token);

                conn.action = ActiveAction::Cgi {
                    out_stream: server_out_mio,
                    in_stream: Some(server_in_mio),
                    child,
                    stdout_buf: Vec::new(),
                    start_time: Instant::now(),
                };

                cgi_to_client.insert(out_token, client_token);
                cgi_to_client.insert(in_token, client_token);

                Ok(None)
            }
            Err(_) => Ok(Some(handle_error(HTTP_INTERNAL_SERVER_ERROR, Some(&s_cfg)))),
        }
    }

    fn parse_request_line(&mut self) -> core::result::Result<(), ParseError> {
        if let Some(abs_index) = find_crlf(&self.buffer, self.cursor) {
            let line_bytes = &self.buffer[self.cursor..abs_index];
            let request_line =
                std::str::from_utf8(line_bytes).map_err(|_| ParseError::MalformedRequestLine)?;

            let parts: Vec<&str> = request_line.split_whitespace().collect();
            if parts.len() == 3 {
                self.method = Method::from_str(parts[0])?;
                self.url = parts[1].to_string();
                self.version = parts[2].to_string();

                self.cursor = abs_index + CRLN_LEN;
                self.state = ParsingState::Headers;
            } else {
                return Err(ParseError::MalformedRequestLine);
            }
        } else {
            return Err(ParseError::IncompleteRequestLine);
        }
        Ok(())
    }

    fn extract_and_parse_header(
        &mut self,
    ) -> core::result::Result<Option<(String, String)>, ParseError> {
        if let Some(abs_index) = find_crlf(&self.buffer, self.cursor) {
            let line_bytes = &self.buffer[self.cursor..abs_index];
            if line_bytes.is_empty() {
                self.cursor = abs_index + CRLN_LEN;
                return Ok(None);
            }
            let line =
                std::str::from_utf8(line_bytes).map_err(|_| ParseError::MalformedRequestLine)?;
            self.cursor = abs_index + CRLN_LEN;
            if let Some(sep) = line.find(':') {
                let key = line[..sep].trim().to_string();
                let val = line[sep + 1..].trim().to_string();
                return Ok(Some((key.to_ascii_lowercase(), val)));
            }
            Err(ParseError::MalformedRequestLine)
        } else {
            Err(ParseError::IncompleteRequestLine)
        }
    }

    fn parse_headers(conn: &mut HttpConnection) -> core::result::Result<(), ParseError> {
        loop {
            if conn.request.cursor > 8192 {
                return Err(ParseError::HeaderTooLong);
            }
            let headers_option = conn.request.extract_and_parse_header()?;
            match headers_option {
                Some((k, v)) => conn.request.headers.insert(k, v),
                None => {
                    conn.request.buffer.drain(..conn.request.cursor);
                    conn.request.cursor = 0;
                    conn.request.state = ParsingState::HeadersDone;
                    return Ok(());
                }
            };
        }
    }

    pub fn parse_unchunked_body(
        poll: &Poll,
        conn: &mut HttpConnection,
    ) -> core::result::Result<(), ParseError> {
        if conn.s_cfg.is_some() {
            let available = conn.request.buffer.len() - conn.request.cursor;
            let to_process = std::cmp::min(available, conn.body_remaining);

            if to_process > 0 {
                match &mut conn.action {
                    ActiveAction::Cgi { in_stream, .. } => {
                        let data = conn.request.buffer.drain(..to_process).collect::<Vec<u8>>();
                        conn.cgi_buffer.extend_from_slice(&data);
                        conn.body_remaining -= to_process;

                        if let Some(in_token) = conn.cgi_in_token {
                            if let Some(pipe) = in_stream {
                                poll.registry()
                                    .reregister(pipe, in_token, Interest::WRITABLE)
                                    .ok();
                            }
                        }
                    }
                    _ => {
                        let start = conn.request.cursor;
                        execute_active_action(
                            &conn.request,
                            &mut conn.upload_manager,
                            &mut conn.action,
                            start,
                            to_process,
                            &conn.boundary,
                        )?;

                        conn.body_remaining -= to_process;
                        conn.request.buffer.drain(start..start + to_process);
                    }
                }
            }
        }

        if conn.body_remaining == 0 {
            conn.request.state = ParsingState::Complete;
        } else {
            return Err(ParseError::IncompleteRequestLine);
        }

        Ok(())
    }

    pub fn parse_chunked_body(conn: &mut HttpConnection) -> core::result::Result<bool, ParseError> {
        if let Some(s_cfg) = conn.s_cfg.clone() {
            let location = router::find_location(&s_cfg, &conn.request.url, &conn.request.method)
                .ok()
                .map(|l| l.clone());
            let max_body = location
                .map(|l| l.effective_max_body_size(&s_cfg, conn_http_default(conn)))
                .unwrap_or(conn_http_default(conn));

            loop {
                match &conn.request.chunk_state {
                    ChunkState::ReadSize => {
                        let current_len = conn.request.buffer.len();
                        if current_len == 0 {
                            return Ok(false);
                        }

                        let search_limit = std::cmp::min(current_len, 18);
                        match find_subsequence(&conn.request.buffer[..search_limit], b"\r\n", 0) {
                            Some(line_end) => {
                                let hex_str =
                                    String::from_utf8_lossy(&conn.request.buffer[..line_end]);
                                let chunk_size = usize::from_str_radix(hex_str.trim(), 16)
                                    .map_err(|_| ParseError::ParseHexError)?;
                                if conn.total_body_read + chunk_size > max_body {
                                    return Err(ParseError::PayloadTooLarge);
                                }

                                if chunk_size == 0 {
                                    if conn.request.buffer.len() < line_end + 2 {
                                        return Ok(false);
                                    }
                                    conn.request.buffer.drain(..line_end + 2);
                                    conn.request.chunk_state = ChunkState::ReadTrailers;
                                    continue;
                                }

                                conn.request.chunk_state = ChunkState::ReadData(chunk_size);
                                conn.request.buffer.drain(..line_end + 2);
                            }
                            None => {
                                if current_len >= 18 {
                                    return Err(ParseError::ParseHexError);
                                }
                                return Ok(false);
                            }
                        }
                    }

                    ChunkState::ReadData(remaining_size) => {
                        let remaining_size = *remaining_size;
                        if conn.request.buffer.is_empty() {
                            return Ok(false);
                        }

                        let available = conn.request.buffer.len();
                        let to_read = std::cmp::min(available, remaining_size);

                        let data = conn.request.buffer.drain(..to_read).collect::<Vec<u8>>();

                        match &mut conn.action {
                            ActiveAction::Cgi { .. } => {
                                conn.cgi_buffer.extend_from_slice(&data);
                            }
                            _ => {
                                if let Some(mgr) = &mut conn.upload_manager {
                                    if !conn.boundary.is_empty() {
                                        mgr.upload_body_with_boundry(&conn.request, &data);
                                    } else {
                                        mgr.upload_simple_body(&conn.request, &data);
                                    }
                                }
                            }
                        }

                        conn.total_body_read += to_read;
                        let new_remaining = remaining_size - to_read;

                        if new_remaining == 0 {
                            conn.request.chunk_state = ChunkState::ReadTrailingCRLF;
                        } else {
                            conn.request.chunk_state = ChunkState::ReadData(new_remaining);
                            return Ok(false);
                        }
                    }

                    ChunkState::ReadTrailingCRLF => {
                        if conn.request.buffer.len() < 2 {
                            return Ok(false);
                        }
                        if &conn.request.buffer[..2] != b"\r\n" {
                            return Err(ParseError::ParseHexError);
                        }
                        conn.request.buffer.drain(..2);
                        conn.request.chunk_state = ChunkState::ReadSize;
                    }

                    ChunkState::ReadTrailers => {
                        if conn.request.buffer.len() > 8192 {
                            return Err(ParseError::HeaderTooLong);
                        }
                        match conn.request.extract_and_parse_header() {
                            Ok(Some((k, v))) => {
                                if let Some(allowed_trailers) = conn.request.headers.get("trailer")
                                {
                                    if allowed_trailers.to_lowercase().contains(&k) {
                                        conn.request.trailers.insert(k, v);
                                    }
                                }
                                continue;
                            }
                            Ok(None) => {
                                conn.request.buffer.drain(..conn.request.cursor);
                                conn.request.cursor = 0;
                                return Ok(true);
                            }
                            Err(ParseError::IncompleteRequestLine) => return Ok(false),
                            Err(e) => return Err(e),
                        }
                    }
                }
            }
        }
        Ok(true)
    }

    /// Derives an upload's filename from the request path, the same way the
    /// multipart path reads it from `Content-Disposition` -- falling back to a
    /// timestamped name only when the URL carries nothing usable.
    pub fn extract_filename(&self) -> String {
        let path = self.url.split('?').next().unwrap_or(&self.url);
        match Path::new(path).file_name().and_then(|s| s.to_str()) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!(
                "uploaded_{}",
                SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_millis())
                    .unwrap_or(0)
            ),
        }
    }
}

fn conn_http_default(conn: &HttpConnection) -> usize {
    conn.s_cfg
        .as_ref()
        .and_then(|s| s.client_max_body_size)
        .unwrap_or(DEFAULT_MAX_BODY_SIZE)
}

fn find_crlf(buffer: &[u8], start_offset: usize) -> Option<usize> {
    let search_area = buffer.get(start_offset..)?;

    let mut current_pos = 0;
    while let Some(r_pos) = search_area[current_pos..].iter().position(|&b| b == b'\r') {
        let abs_r_pos_in_search = current_pos + r_pos;

        if search_area.get(abs_r_pos_in_search + 1) == Some(&b'\n') {
            return Some(start_offset + abs_r_pos_in_search);
        }
        current_pos = abs_r_pos_in_search + 1;
    }
    None
}

pub fn find_subsequence(buffer: &[u8], needle: &[u8], start_offset: usize) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let search_area = buffer.get(start_offset..)?;
    let first_byte = needle[0];
    let mut current_pos = 0;

    while let Some(rel_pos) = search_area[current_pos..]
        .iter()
        .position(|&b| b == first_byte)
    {
        let abs_pos_in_search = current_pos + rel_pos;

        if let Some(candidate) =
            search_area.get(abs_pos_in_search..abs_pos_in_search + needle.len())
        {
            if candidate == needle {
                return Some(start_offset + abs_pos_in_search);
            }
        } else {
            return None;
        }

        current_pos = abs_pos_in_search + 1;
    }
    None
}

impl Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- HTTP Request ---\n")?;
        writeln!(f, "{:?} {} {}", self.method, self.url, self.version)?;

        writeln!(f, "Headers:")?;
        for (key, value) in &self.headers {
            writeln!(f, "  {}: {}", key, value)?;
        }

        if !self.body.is_empty() {
            writeln!(f, "Body ({} bytes):", self.body.len())?;
            match String::from_utf8(self.body.clone()) {
                Ok(s) => writeln!(f, "  {}", s)?,
                Err(_) => writeln!(f, "  <binary data>")?,
            }
        } else {
            writeln!(f, "Body: <empty>")?;
        }
        writeln!(f, "--------------------")
    }
}

#[derive(Debug, Default)]
pub struct PartInfo {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: String,
}

pub fn parse_part_headers(headers: &str) -> PartInfo {
    let mut info = PartInfo {
        name: String::new(),
        filename: None,
        content_type: String::new(),
    };

    for line in headers.lines() {
        if line.starts_with("Content-Disposition:") {
            if let Some(n) = line.split(';').find(|s| s.trim().starts_with("name=")) {
                info.name = n
                    .split('=')
                    .nth(1)
                    .unwrap_or("")
                    .trim_matches('"')
                    .to_string();
            }
            if let Some(f) = line.split(';').find(|s| s.trim().starts_with("filename=")) {
                info.filename = Some(
                    f.split('=')
                        .nth(1)
                        .unwrap_or("")
                        .trim_matches('"')
                        .to_string(),
                );
            }
        } else if line.starts_with("Content-Type:") {
            info.content_type = line
                .split(':')
                .nth(1)
                .unwrap_or("text/plain")
                .trim()
                .to_string();
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_request_line() {
        let mut req = HttpRequest::new();
        req.buffer.extend_from_slice(b"GET /index.html HTTP/1.1\r\n");
        req.parse_request_line().unwrap();

        assert_eq!(req.method, Method::GET);
        assert_eq!(req.url, "/index.html");
        assert_eq!(req.version, "HTTP/1.1");
        assert_eq!(req.state, ParsingState::Headers);
    }

    #[test]
    fn incomplete_request_line_awaits_more_data() {
        let mut req = HttpRequest::new();
        req.buffer.extend_from_slice(b"GET /index.html ");
        assert_eq!(
            req.parse_request_line().unwrap_err(),
            ParseError::IncompleteRequestLine
        );
    }

    #[test]
    fn rejects_malformed_request_line() {
        let mut req = HttpRequest::new();
        req.buffer.extend_from_slice(b"GET\r\n");
        assert_eq!(
            req.parse_request_line().unwrap_err(),
            ParseError::MalformedRequestLine
        );
    }

    #[test]
    fn rejects_unknown_method() {
        let mut req = HttpRequest::new();
        req.buffer.extend_from_slice(b"TRACE / HTTP/1.1\r\n");
        assert_eq!(
            req.parse_request_line().unwrap_err(),
            ParseError::InvalidMethod
        );
    }

    #[test]
    fn extracts_one_header_at_a_time() {
        let mut req = HttpRequest::new();
        req.buffer
            .extend_from_slice(b"Host: example.com\r\nX-Custom: value\r\n\r\n");

        let (k, v) = req.extract_and_parse_header().unwrap().unwrap();
        assert_eq!(k, "host");
        assert_eq!(v, "example.com");

        let (k, v) = req.extract_and_parse_header().unwrap().unwrap();
        assert_eq!(k, "x-custom");
        assert_eq!(v, "value");

        assert!(req.extract_and_parse_header().unwrap().is_none());
    }

    #[test]
    fn header_without_colon_is_malformed() {
        let mut req = HttpRequest::new();
        req.buffer.extend_from_slice(b"not-a-header\r\n");
        assert_eq!(
            req.extract_and_parse_header().unwrap_err(),
            ParseError::MalformedRequestLine
        );
    }

    #[test]
    fn find_crlf_locates_terminator() {
        let buf = b"abc\r\ndef";
        assert_eq!(find_crlf(buf, 0), Some(3));
        assert_eq!(find_crlf(buf, 4), None);
    }

    #[test]
    fn find_subsequence_locates_needle() {
        let buf = b"----boundary\r\nContent";
        assert_eq!(find_subsequence(buf, b"boundary", 0), Some(4));
        assert_eq!(find_subsequence(buf, b"missing", 0), None);
    }

    #[test]
    fn parse_part_headers_extracts_filename_and_type() {
        let headers = "Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\nContent-Type: text/plain\r\n";
        let info = parse_part_headers(headers);
        assert_eq!(info.name, "file");
        assert_eq!(info.filename.as_deref(), Some("a.txt"));
        assert_eq!(info.content_type, "text/plain");
    }
}
