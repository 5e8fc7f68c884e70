use crate::prelude::*;

#[derive(Debug)]
pub struct HttpResponse {
    pub version: String,
    pub status_code: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status_code: u16, status_text: &str) -> Self {
        Self {
            version: "HTTP/1.1".to_string(),
            status_code,
            status_text: status_text.to_string(),
            headers: BTreeMap::from([
                ("content-length".to_string(), "0".to_string()),
                ("connection".to_string(), "close".to_string()),
            ]),
            body: Vec::new(),
        }
    }

    pub fn set_header(&mut self, key: &str, value: &str) -> &mut Self {
        self.headers.insert(key.to_lowercase(), value.to_string());
        self
    }

    pub fn set_body(&mut self, body: Vec<u8>, content_type: &str) -> &mut Self {
        self.headers
            .insert("content-length".to_string(), body.len().to_string());
        self.headers
            .insert("content-type".to_string(), content_type.to_string());
        self.body = body;
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut res = self.to_bytes_headers_only();
        res.extend_from_slice(&self.body);
        res
    }

    /// Emits headers in a stable order: `Content-Type` and `Content-Length`
    /// first (when present), then the rest alphabetically -- `BTreeMap`
    /// already iterates its lowercase keys in that order, so only the two
    /// leading headers need to be pulled out ahead of the loop.
    pub fn to_bytes_headers_only(&self) -> Vec<u8> {
        let mut res = format!(
            "{} {} {}\r\n",
            self.version, self.status_code, self.status_text
        )
        .into_bytes();

        let leading = ["content-type", "content-length"];
        for key in leading {
            if let Some(val) = self.headers.get(key) {
                let formatted_key = Self::to_pascal_case(key);
                res.extend_from_slice(format!("{}: {}\r\n", formatted_key, val).as_bytes());
            }
        }
        for (key, val) in &self.headers {
            if leading.contains(&key.as_str()) {
                continue;
            }
            let formatted_key = Self::to_pascal_case(key);
            res.extend_from_slice(format!("{}: {}\r\n", formatted_key, val).as_bytes());
        }
        res.extend_from_slice(b"\r\n");
        res
    }

    pub fn status_text(code: u16) -> String {
        match code {
            200 => "OK",
            201 => "Created",
            204 => "No Content",
            301 => "Moved Permanently",
            302 => "Found",
            303 => "See Other",
            307 => "Temporary Redirect",
            308 => "Permanent Redirect",
            HTTP_BAD_REQUEST => "Bad Request",
            HTTP_FORBIDDEN => "Forbidden",
            HTTP_NOT_FOUND => "Not Found",
            HTTP_METHOD_NOT_ALLOWED => "Method Not Allowed",
            HTTP_PAYLOAD_TOO_LARGE => "Payload Too Large",
            HTTP_URI_TOO_LONG => "URI Too Long",
            HTTP_HEADER_FIELDS_TOO_LARGE => "Request Header Fields Too Large",
            HTTP_INTERNAL_SERVER_ERROR => "Internal Server Error",
            HTTP_NOT_IMPLEMENTED => "Not Implemented",
            HTTP_BAD_GATEWAY => "Bad Gateway",
            GATEWAY_TIMEOUT => "Gateway Timeout",
            _ => "Unknown",
        }
        .to_string()
    }

    pub fn set_status_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.status_text = HttpResponse::status_text(code);
        self
    }

    fn to_pascal_case(s: &str) -> String {
        s.split('-')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    None => String::new(),
                    Some(f) => f.to_uppercase().collect::<String>() + chars.as_str(),
                }
            })
            .collect::<Vec<String>>()
            .join("-")
    }

    pub fn redirect(code: u16, target_url: &str) -> Self {
        let mut res = HttpResponse::new(code, &HttpResponse::status_text(code));
        res.set_header("Location", target_url)
            .set_header("Content-Length", "0");
        res
    }
}

pub fn get_mime_type(extension: Option<&str>) -> &'static str {
    match extension {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js" | "mjs") => "application/javascript",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz") => "application/gzip",
        Some("tar") => "application/x-tar",
        Some("mp3") => "audio/mpeg",
        Some("mp4") => "video/mp4",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}

pub fn get_ext_from_content_type(content_type: &str) -> &str {
    match content_type {
        "application/json" => ".json",
        "application/pdf" => ".pdf",
        "application/xml" => ".xml",
        "application/zip" => ".zip",
        "audio/mpeg" => ".mp3",
        "image/gif" => ".gif",
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/svg+xml" => ".svg",
        "image/webp" => ".webp",
        "text/css" => ".css",
        "text/html" => ".html",
        "text/javascript" => ".js",
        "text/plain" => ".txt",
        "video/mp4" => ".mp4",
        _ => ".bin",
    }
}

/// Renders a sorted directory listing: `..` first, then entries in
/// lexicographic order, directories suffixed with `/`.
pub fn generate_autoindex(path: &Path, original_url: &str) -> HttpResponse {
    let mut entries: Vec<(String, bool, u64, Option<SystemTime>)> = Vec::new();

    if let Ok(dir) = path.read_dir() {
        for entry in dir.flatten() {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let meta = entry.metadata().ok();
            let is_dir = meta.as_ref().map(|m| m.is_dir()).unwrap_or(false);
            let size = meta.as_ref().map(|m| m.size()).unwrap_or(0);
            let mtime = meta.and_then(|m| m.modified().ok());
            entries.push((name, is_dir, size, mtime));
        }
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let base = original_url.trim_end_matches('/');
    let mut html = format!(
        "<html><head><title>Index of {0}</title></head><body><h1>Index of {0}</h1><table>",
        original_url
    );
    html.push_str(&format!(
        "<tr><td><a href=\"{}/../\">../</a></td><td></td><td></td></tr>",
        base
    ));

    for (name, is_dir, size, mtime) in &entries {
        let display_name = if *is_dir {
            format!("{name}/")
        } else {
            name.clone()
        };
        let size_str = if *is_dir {
            "-".to_string()
        } else {
            size.to_string()
        };
        let mtime_str = mtime
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs().to_string())
            .unwrap_or_else(|| "-".to_string());
        html.push_str(&format!(
            "<tr><td><a href=\"{base}/{name}\">{display_name}</a></td><td>{size_str}</td><td>{mtime_str}</td></tr>"
        ));
    }

    html.push_str("</table></body></html>");
    let mut res = HttpResponse::new(200, "OK");
    res.set_body(html.into_bytes(), "text/html");
    res
}

/// Builds a standard error response, substituting a configured error page
/// when one exists and is readable. Always closes the connection.
pub fn handle_error(code: u16, s_cfg: Option<&Arc<ServerConfig>>) -> HttpResponse {
    let mut res = HttpResponse::new(code, &HttpResponse::status_text(code));

    if let Some(cfg) = s_cfg {
        if let Some(path_str) = cfg.error_pages.get(&code) {
            if let Ok(content) = fs::read(path_str) {
                res.set_body(content, "text/html");
                return res;
            }
        }
    }

    let body = format!("{} {}", code, HttpResponse::status_text(code)).into_bytes();
    res.set_body(body, "text/plain");
    res
}
