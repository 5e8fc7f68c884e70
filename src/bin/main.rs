use webserv::config;
use webserv::error::Result;
use webserv::poll_set::PollSet;
use webserv::server::Server;
use webserv::signals;

const DEFAULT_CONFIG_PATH: &str = "webserv.conf";

fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let source = std::fs::read_to_string(&config_path)
        .map_err(|e| format!("reading {config_path}: {e}"))?;

    let app_config = config::load(&source)?;
    config::display_config(&app_config);

    signals::install();

    let mut pollset = PollSet::new(1024)?;
    let mut server = Server::new(app_config, &mut pollset)?;
    server.run(&mut pollset)
}
