use crate::prelude::*;

/// Reaps idle client connections and runaway CGI children. Called
/// periodically from the main loop rather than on every tick, since neither
/// kind of timeout needs sub-second resolution.
pub fn sweep(server: &mut Server, poll: &Poll) {
    let now = Instant::now();

    server.connections.retain(|_token, conn| {
        if matches!(conn.action, ActiveAction::Cgi { .. }) {
            return true;
        }
        if now.duration_since(conn.last_activity) > CLIENT_TIMEOUT {
            let _ = poll.registry().deregister(&mut conn.stream);
            return false;
        }
        true
    });

    check_time_out_cgi(&mut server.connections, poll, &mut server.cgi_to_client);
}
