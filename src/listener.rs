use crate::prelude::*;
use socket2::{Domain, Socket, Type};

/// Generous enough that a burst of connects never gets silently dropped by
/// the kernel.
const BACKLOG: i32 = 1024;

/// Binds a non-blocking listening socket with `SO_REUSEADDR` set before mio
/// ever sees it, so a restart doesn't trip over a lingering TIME_WAIT socket.
pub fn bind(addr: &ListenAddress) -> Result<TcpListener> {
    let host = if addr.host.is_empty() || addr.host == "*" {
        "0.0.0.0"
    } else {
        addr.host.as_str()
    };
    let sock_addr: SocketAddr = format!("{}:{}", host, addr.port).parse()?;

    let socket = Socket::new(Domain::IPV4, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.bind(&sock_addr.into())?;
    socket.listen(BACKLOG)?;
    socket.set_nonblocking(true)?;

    Ok(TcpListener::from_std(socket.into()))
}
