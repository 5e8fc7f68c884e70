pub use crate::prelude::*;

pub fn handle_delete(
    request: &HttpRequest,
    location: &LocationConfig,
    s_cfg: &Arc<ServerConfig>,
) -> HttpResponse {
    let root = location.effective_root(s_cfg);
    let root_canon = match Path::new(root).canonicalize() {
        Ok(p) => p,
        Err(_) => return handle_error(HTTP_NOT_FOUND, Some(s_cfg)),
    };

    let relative_path = request
        .url
        .strip_prefix(location.path.as_str())
        .unwrap_or("");
    let target_path = Path::new(root).join(relative_path.trim_start_matches('/'));

    // Canonicalize and check containment to prevent DELETE /x/../../etc/passwd
    let absolute_target = match target_path.canonicalize() {
        Ok(path) => path,
        Err(e) => {
            return match e.kind() {
                ErrorKind::NotFound => handle_error(HTTP_NOT_FOUND, Some(s_cfg)),
                _ => handle_error(HTTP_FORBIDDEN, Some(s_cfg)),
            };
        }
    };

    if !absolute_target.starts_with(&root_canon) {
        return handle_error(HTTP_FORBIDDEN, Some(s_cfg));
    }

    if absolute_target.is_dir() {
        return handle_error(HTTP_FORBIDDEN, Some(s_cfg));
    }

    match fs::remove_file(&absolute_target) {
        Ok(_) => HttpResponse::new(204, "No Content"),
        Err(e) => match e.kind() {
            ErrorKind::PermissionDenied => handle_error(HTTP_FORBIDDEN, Some(s_cfg)),
            _ => handle_error(HTTP_INTERNAL_SERVER_ERROR, Some(s_cfg)),
        },
    }
}
