use crate::prelude::*;

#[derive(Debug)]
pub enum RoutingError {
    NotFound,
    MethodNotAllowed,
    Forbidden,
}

/// Resolves a virtual host's longest-matching location for `path` and checks
/// that `method` is allowed there.
pub fn find_location<'a>(
    s_cfg: &'a ServerConfig,
    path: &str,
    method: &Method,
) -> std::result::Result<&'a LocationConfig, RoutingError> {
    let location = s_cfg.find_location(path).ok_or(RoutingError::NotFound)?;

    if !method.is_allowed(&location.methods) {
        return Err(RoutingError::MethodNotAllowed);
    }

    Ok(location)
}

/// Joins a location's effective root with the request path, stripping the
/// location's prefix first. Rejects any resolved path that escapes the root.
pub fn resolve_fs_path(
    s_cfg: &ServerConfig,
    location: &LocationConfig,
    url_path: &str,
) -> std::result::Result<PathBuf, RoutingError> {
    let root = location.effective_root(s_cfg);
    let relative = url_path
        .strip_prefix(location.path.as_str())
        .unwrap_or(url_path)
        .trim_start_matches('/');

    let candidate = Path::new(root).join(relative);

    let root_canon = Path::new(root)
        .canonicalize()
        .map_err(|_| RoutingError::NotFound)?;

    // The target may not exist yet (e.g. before an upload); only enforce
    // containment against the deepest ancestor that does exist.
    let mut check = candidate.clone();
    loop {
        if let Ok(canon) = check.canonicalize() {
            if !canon.starts_with(&root_canon) {
                return Err(RoutingError::Forbidden);
            }
            break;
        }
        match check.parent() {
            Some(parent) if parent != check => check = parent.to_path_buf(),
            _ => break,
        }
    }

    Ok(candidate)
}
