use crate::prelude::*;

/// One bound listener plus the virtual hosts it may dispatch to.
struct Listener {
    socket: TcpListener,
    servers: Vec<Arc<ServerConfig>>,
}

/// The single-threaded event loop. Every listener, client connection, and CGI
/// pipe is a `Token` registered against one shared `Poll`; nothing here ever
/// blocks except the `poll()` call itself.
pub struct Server {
    #[allow(dead_code)]
    config: AppConfig,
    listeners: HashMap<Token, Listener>,
    pub connections: HashMap<Token, HttpConnection>,
    pub cgi_to_client: HashMap<Token, Token>,
    pub zombie_purgatory: Vec<std::process::Child>,
    next_token: usize,
    last_sweep: Instant,
}

const SWEEP_INTERVAL: Duration = Duration::from_secs(5);
const POLL_TIMEOUT: Duration = Duration::from_millis(200);

impl Server {
    pub fn new(config: AppConfig, pollset: &mut PollSet) -> Result<Self> {
        let mut listeners = HashMap::new();

        for addr in config.all_listen_addresses() {
            let mut socket = match listener::bind(&addr) {
                Ok(socket) => socket,
                Err(e) => {
                    errors!("failed to bind listener {}: {}", addr, e);
                    continue;
                }
            };
            let token = pollset.next_token();
            pollset
                .poll
                .registry()
                .register(&mut socket, token, Interest::READABLE)?;

            let servers = config
                .servers_for(&addr)
                .into_iter()
                .cloned()
                .collect::<Vec<_>>();
            info!("listening on {} ({} virtual host(s))", addr, servers.len());
            listeners.insert(token, Listener { socket, servers });
        }

        if listeners.is_empty() {
            return Err("no listener could be bound, aborting".into());
        }

        let next_token = pollset.next;
        Ok(Self {
            config,
            listeners,
            connections: HashMap::new(),
            cgi_to_client: HashMap::new(),
            zombie_purgatory: Vec::new(),
            next_token,
            last_sweep: Instant::now(),
        })
    }

    pub fn run(&mut self, pollset: &mut PollSet) -> Result<()> {
        let mut draining = false;
        let mut drain_deadline = None;

        loop {
            if !draining && signals::shutdown_requested() {
                draining = true;
                drain_deadline = Some(Instant::now() + SWEEP_INTERVAL);
                info!(
                    "shutdown signal received, draining {} connection(s)",
                    self.connections.len()
                );
                for listener in self.listeners.values_mut() {
                    let _ = pollset.poll.registry().deregister(&mut listener.socket);
                }
            }

            pollset.poll.poll(&mut pollset.events, Some(POLL_TIMEOUT))?;

            for event in pollset.events.iter() {
                self.dispatch(&pollset.poll, event)?;
            }

            if self.last_sweep.elapsed() > SWEEP_INTERVAL {
                timeouts::sweep(self, &pollset.poll);
                self.reap_zombies();
                self.last_sweep = Instant::now();
            }

            pollset.next = self.next_token;

            if draining {
                let past_deadline = drain_deadline
                    .map(|deadline| Instant::now() >= deadline)
                    .unwrap_or(true);
                if self.connections.is_empty() || past_deadline {
                    info!(
                        "drain complete, {} connection(s) remaining",
                        self.connections.len()
                    );
                    break;
                }
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, poll: &Poll, event: &Event) -> Result<()> {
        let token = event.token();

        if self.listeners.contains_key(&token) {
            self.accept_all(poll, token)?;
            return Ok(());
        }

        if let Some(&client_token) = self.cgi_to_client.get(&token) {
            if let Some(conn) = self.connections.get_mut(&client_token) {
                handle_cgi_event(poll, event, token, client_token, conn, &mut self.cgi_to_client)?;
            }
            let should_close = self
                .connections
                .get(&client_token)
                .map(|c| c.should_close())
                .unwrap_or(false);
            if should_close {
                HttpConnection::terminate_connection(self, client_token);
            }
            return Ok(());
        }

        if self.connections.contains_key(&token) {
            if event.is_readable() {
                let mut next_token = self.next_token;
                if let Some(conn) = self.connections.get_mut(&token) {
                    HttpConnection::handle_read_phase(
                        conn,
                        poll,
                        token,
                        &mut next_token,
                        &mut self.cgi_to_client,
                    )?;
                }
                self.next_token = next_token;
            }
            if event.is_writable() {
                if let Some(conn) = self.connections.get_mut(&token) {
                    HttpConnection::handle_write_phase(conn, poll, token)?;
                }
            }

            let should_close = self
                .connections
                .get(&token)
                .map(|c| c.should_close())
                .unwrap_or(false);
            if should_close {
                HttpConnection::terminate_connection(self, token);
            }
        }

        Ok(())
    }

    fn accept_all(&mut self, poll: &Poll, listener_token: Token) -> Result<()> {
        loop {
            let accepted = {
                let listener = self.listeners.get_mut(&listener_token).unwrap();
                match listener.socket.accept() {
                    Ok((stream, _addr)) => Some((stream, listener.servers.clone())),
                    Err(e) if e.kind() == ErrorKind::WouldBlock => None,
                    Err(_) => None,
                }
            };

            let Some((mut stream, servers)) = accepted else {
                return Ok(());
            };

            let token = Token(self.next_token);
            self.next_token += 1;

            poll.registry()
                .register(&mut stream, token, Interest::READABLE)?;

            let conn = HttpConnection::new(stream, servers);
            self.connections.insert(token, conn);
        }
    }

    fn reap_zombies(&mut self) {
        self.zombie_purgatory
            .retain_mut(|child| !matches!(child.try_wait(), Ok(Some(_))));
    }
}
