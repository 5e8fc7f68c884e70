pub use crate::prelude::*;

pub fn handle_get(
    request: &HttpRequest,
    location: &LocationConfig,
    s_cfg: &Arc<ServerConfig>,
) -> (HttpResponse, ActiveAction) {
    let mut path = match router::resolve_fs_path(s_cfg, location, &request.url) {
        Ok(p) => p,
        Err(RoutingError::Forbidden) => {
            return (handle_error(HTTP_FORBIDDEN, Some(s_cfg)), ActiveAction::None)
        }
        Err(_) => return (handle_error(HTTP_NOT_FOUND, Some(s_cfg)), ActiveAction::None),
    };

    if path.is_dir() {
        let index_candidates = location.effective_index(s_cfg);
        let served_index = index_candidates
            .iter()
            .map(|name| path.join(name))
            .find(|candidate| candidate.is_file());

        match served_index {
            Some(index_path) => path = index_path,
            None if location.autoindex => return (generate_autoindex(&path, &request.url), ActiveAction::None),
            None => {
                return (
                    handle_error(HTTP_FORBIDDEN, Some(s_cfg)),
                    ActiveAction::None,
                )
            }
        }
    }

    match File::open(&path) {
        Ok(file) => {
            let Ok(metadata) = file.metadata() else {
                return (
                    handle_error(HTTP_INTERNAL_SERVER_ERROR, Some(s_cfg)),
                    ActiveAction::None,
                );
            };
            let file_size = metadata.size() as usize;
            let mime_type = get_mime_type(path.extension().and_then(|s| s.to_str()));

            let mut res = HttpResponse::new(HTTP_OK, &HttpResponse::status_text(HTTP_OK));
            res.set_header("Content-Length", &file_size.to_string());
            res.set_header("Content-Type", mime_type);
            (res, ActiveAction::FileDownload(file, file_size))
        }
        Err(e) => {
            let code = match e.kind() {
                std::io::ErrorKind::NotFound => HTTP_NOT_FOUND,
                std::io::ErrorKind::PermissionDenied => HTTP_FORBIDDEN,
                _ => HTTP_INTERNAL_SERVER_ERROR,
            };
            (handle_error(code, Some(s_cfg)), ActiveAction::None)
        }
    }
}
