use crate::prelude::*;

/// Owns the shared `mio::Poll` plus a monotonic token allocator; every
/// listener, client socket, and CGI pipe gets its token from here so none
/// collide.
pub struct PollSet {
    pub poll: Poll,
    pub events: Events,
    pub(crate) next: usize,
}

impl PollSet {
    pub fn new(event_capacity: usize) -> Result<Self> {
        Ok(Self {
            poll: Poll::new()?,
            events: Events::with_capacity(event_capacity),
            next: 0,
        })
    }

    pub fn next_token(&mut self) -> Token {
        let token = Token(self.next);
        self.next += 1;
        token
    }
}
