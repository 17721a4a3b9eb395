//! The connection object.
//!
//! [`AsyncClient`] owns at most one stack handle and multiplexes the stack's
//! events (connect completion, inbound data, sent acknowledgment, error,
//! periodic poll, deferred name resolution) into one connection lifecycle
//! surfaced through seven single-slot callbacks.
//!
//! Every terminal path (close, abort, fatal error, failed resolution) ends in
//! exactly one `on_disconnect` notification, which may arrive without any
//! prior `on_connect`.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::rc::Rc;

use tracing::{debug, trace, warn};

use super::config::ClientConfig;
use super::handlers::Handlers;
use super::supervisor::{SupervisorAction, TimeoutSupervisor};
use crate::core::constants::NO_PORT;
use crate::core::{ErrorCode, TcpState};
use crate::transport::{Handle, Interest, QueryId, Resolution, Transport};

/// Invoke the handler in `$slot`, handing it the client mutably.
macro_rules! fire {
    ($client:expr, $slot:ident $(, $arg:expr)*) => {{
        if let Some(mut handler) = $client.handlers.$slot.begin() {
            handler($client $(, $arg)*);
            $client.handlers.$slot.finish(handler);
        }
    }};
}

/// Asynchronous, callback-driven TCP connection.
///
/// Created either by application code that intends to connect, or by
/// [`AsyncServer`](crate::server::AsyncServer) around an accepted handle.
/// Dropping the client releases any handle it still holds.
pub struct AsyncClient<T: Transport> {
    /// The shared stack.
    stack: Rc<T>,
    /// The owned handle, if any.
    handle: Option<Handle>,
    /// Nagle preference applied when a handle becomes operational.
    no_delay: Option<bool>,
    /// Ack and idle-receive timeout state.
    supervisor: TimeoutSupervisor,
    /// Received bytes the application has not acknowledged yet.
    rx_ack_len: usize,
    /// Acknowledge the segment being delivered once `on_data` returns.
    auto_ack: bool,
    /// Outstanding name resolution and the port to connect to.
    pending_connect: Option<(QueryId, u16)>,
    /// Application callbacks.
    handlers: Handlers<T>,
}

impl<T: Transport> AsyncClient<T> {
    /// Create an unconnected client with the default configuration.
    pub fn new(stack: Rc<T>) -> Self {
        Self::with_config(stack, ClientConfig::default())
    }

    /// Create an unconnected client.
    pub fn with_config(stack: Rc<T>, config: ClientConfig) -> Self {
        let now = stack.now_millis();
        Self {
            supervisor: TimeoutSupervisor::new(config.ack_timeout_ms, config.rx_timeout_secs, now),
            stack,
            handle: None,
            no_delay: config.no_delay,
            rx_ack_len: 0,
            auto_ack: true,
            pending_connect: None,
            handlers: Handlers::new(),
        }
    }

    /// Wrap an already established handle, e.g. one accepted by a listener.
    pub fn accepted(stack: Rc<T>, handle: Handle, config: ClientConfig) -> Self {
        let mut client = Self::with_config(stack, config);
        client.attach(handle);
        client
    }

    /// Take ownership of `handle`, releasing any handle held before.
    ///
    /// All event kinds of an established connection are registered.
    pub fn attach(&mut self, handle: Handle) {
        if self.handle.is_some() {
            self.teardown();
        }
        self.pending_connect = None;
        self.rx_ack_len = 0;
        self.handle = Some(handle);
        self.supervisor.reset(self.stack.now_millis());
        self.activate(handle);
        debug!(%handle, "handle attached");
    }

    // =========================================================================
    // Connection establishment
    // =========================================================================

    /// Connect to `ip:port`.
    ///
    /// Returns `false` without any callback if a handle is already held, no
    /// route exists, or no handle can be allocated. Otherwise `on_connect`
    /// or `on_error`/`on_disconnect` follows.
    pub fn connect(&mut self, ip: Ipv4Addr, port: u16) -> bool {
        self.connect_addr(SocketAddrV4::new(ip, port))
    }

    /// Connect to `remote`. See [`connect`](Self::connect).
    pub fn connect_addr(&mut self, remote: SocketAddrV4) -> bool {
        match self.try_connect(remote) {
            Ok(()) => true,
            Err(code) => {
                debug!(%remote, error = %code, "connect refused");
                false
            }
        }
    }

    /// Connect to `host:port`, resolving the name first.
    ///
    /// A name answered synchronously connects right away. A pending lookup
    /// returns `true` and connects once the result arrives through
    /// [`handle_resolved`](Self::handle_resolved); if it fails, `on_error`
    /// with [`ErrorCode::DnsFailed`] and then `on_disconnect` are delivered.
    pub fn connect_host(&mut self, host: &str, port: u16) -> bool {
        if self.handle.is_some() || self.pending_connect.is_some() {
            return false;
        }
        match self.stack.resolve(host) {
            Resolution::Resolved(ip) => self.connect(ip, port),
            Resolution::Pending(query) => {
                debug!(host, port, query = query.raw(), "resolution pending");
                self.pending_connect = Some((query, port));
                true
            }
            Resolution::Failed => {
                debug!(host, "resolution refused");
                false
            }
        }
    }

    fn try_connect(&mut self, remote: SocketAddrV4) -> Result<(), ErrorCode> {
        if self.handle.is_some() {
            return Err(ErrorCode::AlreadyConnected);
        }
        if !self.stack.has_route(*remote.ip()) {
            return Err(ErrorCode::Routing);
        }
        let handle = self.stack.allocate().ok_or(ErrorCode::OutOfMemory)?;

        self.stack.register(handle, Interest::CONNECTING);
        if let Err(code) = self.stack.connect(handle, remote) {
            self.stack.register(handle, Interest::NONE);
            self.stack.abort(handle);
            return Err(code);
        }

        self.handle = Some(handle);
        self.rx_ack_len = 0;
        self.supervisor.reset(self.stack.now_millis());
        debug!(%handle, %remote, "connect issued");
        Ok(())
    }

    /// Install full operation on `handle`. A close requested while
    /// connecting stays pending for the next tick.
    fn activate(&mut self, handle: Handle) {
        self.stack.register(handle, Interest::ESTABLISHED);
        if let Some(no_delay) = self.no_delay {
            self.stack.set_nagle(handle, !no_delay);
        }
        self.supervisor.reset_timers(self.stack.now_millis());
    }

    // =========================================================================
    // Outbound data
    // =========================================================================

    /// Queue as much of `data` as the send window allows, without flushing.
    ///
    /// Returns the number of bytes queued.
    pub fn add(&mut self, data: &[u8]) -> usize {
        let Some(handle) = self.handle else {
            return 0;
        };
        if data.is_empty() {
            return 0;
        }
        let room = self.stack.send_buffer(handle);
        if room == 0 {
            return 0;
        }
        let will_send = room.min(data.len());
        match self.stack.write(handle, &data[..will_send]) {
            Ok(()) => will_send,
            Err(code) => {
                trace!(%handle, error = %code, "queue failed");
                0
            }
        }
    }

    /// Flush everything queued.
    ///
    /// Returns `false` if nothing can be sent right now (not established or
    /// the window is zero) or the flush fails.
    pub fn send(&mut self) -> bool {
        if !self.can_send() {
            return false;
        }
        let Some(handle) = self.handle else {
            return false;
        };
        match self.stack.output(handle) {
            Ok(()) => {
                self.supervisor.on_send(self.stack.now_millis());
                true
            }
            Err(code) => {
                trace!(%handle, error = %code, "flush failed");
                false
            }
        }
    }

    /// Queue and flush `data`, chunk by chunk, while the window allows.
    ///
    /// Never waits for the window to reopen: bytes beyond the available
    /// window are not sent. Returns the number of bytes sent.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let Some(handle) = self.handle else {
            return 0;
        };

        let mut sent = 0;
        while sent < data.len() {
            let room = self.space();
            if room == 0 {
                break;
            }
            let will_send = room.min(data.len() - sent);
            let chunk = &data[sent..sent + will_send];

            if let Err(code) = self
                .stack
                .write(handle, chunk)
                .and_then(|()| self.stack.output(handle))
            {
                trace!(%handle, error = %code, "write failed");
                break;
            }
            self.supervisor.on_send(self.stack.now_millis());
            sent += will_send;
        }

        if sent < data.len() {
            trace!(%handle, sent, requested = data.len(), "send window exhausted");
        }
        sent
    }

    /// Write a string. See [`write`](Self::write).
    pub fn write_str(&mut self, data: &str) -> usize {
        self.write(data.as_bytes())
    }

    /// Check if the connection is established with a nonzero send window.
    pub fn can_send(&self) -> bool {
        self.space() > 0
    }

    /// Free send window while established, else zero.
    pub fn space(&self) -> usize {
        match self.handle {
            Some(handle) if self.stack.state(handle) == TcpState::Established => {
                self.stack.send_buffer(handle)
            }
            _ => 0,
        }
    }

    // =========================================================================
    // Inbound data
    // =========================================================================

    /// Acknowledge up to `len` deferred bytes to the stack.
    ///
    /// Called from `on_data`, this also stops the automatic acknowledgment of
    /// the segment being delivered; `ack(0)` opts out without acknowledging.
    /// Returns the number of bytes acknowledged.
    pub fn ack(&mut self, len: usize) -> usize {
        self.auto_ack = false;
        let len = len.min(self.rx_ack_len);
        if len > 0 {
            if let Some(handle) = self.handle {
                self.stack.recved(handle, len);
            }
        }
        self.rx_ack_len -= len;
        len
    }

    /// Keep the segment being delivered unacknowledged.
    pub fn ack_later(&mut self) {
        self.auto_ack = false;
    }

    /// Received bytes not yet acknowledged to the stack.
    pub fn unacked_len(&self) -> usize {
        self.rx_ack_len
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Close the connection.
    ///
    /// Outstanding received bytes are acknowledged first. With `now` the
    /// handle is torn down immediately; otherwise on the next poll, which is
    /// safe to request from inside a callback.
    pub fn close(&mut self, now: bool) {
        if let Some(handle) = self.handle {
            if self.rx_ack_len > 0 {
                self.stack.recved(handle, self.rx_ack_len);
                self.rx_ack_len = 0;
            }
        }
        if now {
            self.teardown();
        } else if self.handle.is_some() {
            self.supervisor.request_close();
        }
    }

    /// Deferred close.
    pub fn stop(&mut self) {
        self.close(false);
    }

    /// Forcibly terminate the connection, skipping the graceful sequence.
    ///
    /// Also cancels a pending name resolution. If anything was cancelled,
    /// `on_error` with [`ErrorCode::Aborted`] and `on_disconnect` follow.
    pub fn abort(&mut self) -> ErrorCode {
        let handle = self.handle.take();
        let pending = self.pending_connect.take();

        if let Some(handle) = handle {
            self.stack.register(handle, Interest::NONE);
            self.stack.abort(handle);
            self.rx_ack_len = 0;
            debug!(%handle, "aborted");
        }
        if handle.is_some() || pending.is_some() {
            self.notify_terminal(ErrorCode::Aborted);
        }
        ErrorCode::Aborted
    }

    /// Graceful teardown: deregister, close (abort if that fails), notify.
    fn teardown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.stack.register(handle, Interest::NONE);
        self.rx_ack_len = 0;

        if let Err(code) = self.stack.close(handle) {
            warn!(%handle, error = %code, "close failed, aborting");
            self.stack.abort(handle);
        }
        debug!(%handle, "closed");
        fire!(self, disconnect);
    }

    fn notify_terminal(&mut self, code: ErrorCode) {
        fire!(self, error, code);
        fire!(self, disconnect);
    }

    // =========================================================================
    // Stack events
    // =========================================================================

    /// Connect completion for `handle`.
    pub fn handle_connected(&mut self, handle: Handle) {
        if self.handle != Some(handle) {
            trace!(%handle, "stale connect completion");
            return;
        }
        self.activate(handle);
        debug!(%handle, "connected");
        fire!(self, connect);
    }

    /// Fatal error on `handle`. The stack has already released it.
    pub fn handle_error(&mut self, handle: Handle, code: ErrorCode) {
        if self.handle != Some(handle) {
            trace!(%handle, error = %code, "stale error");
            return;
        }
        self.handle = None;
        self.stack.register(handle, Interest::NONE);
        self.rx_ack_len = 0;
        debug!(%handle, error = %code, "connection failed");
        self.notify_terminal(code);
    }

    /// Inbound segments on `handle`; `None` or an empty list means the peer closed.
    pub fn handle_received(&mut self, handle: Handle, segments: Option<&[&[u8]]>) {
        if self.handle != Some(handle) {
            return;
        }
        let Some(segments) = segments.filter(|segments| !segments.is_empty()) else {
            debug!(%handle, "peer closed");
            self.teardown();
            return;
        };

        self.supervisor.on_receive(self.stack.now_millis());
        for &segment in segments {
            // The handler may have closed the connection
            if self.handle != Some(handle) {
                break;
            }
            trace!(%handle, len = segment.len(), "data");

            self.auto_ack = true;
            self.rx_ack_len += segment.len();
            fire!(self, data, segment);

            if self.auto_ack && self.handle == Some(handle) {
                let len = segment.len().min(self.rx_ack_len);
                if len > 0 {
                    self.stack.recved(handle, len);
                }
                self.rx_ack_len -= len;
            }
        }
    }

    /// `len` sent bytes were acknowledged by the peer.
    pub fn handle_sent(&mut self, handle: Handle, len: usize) {
        if self.handle != Some(handle) {
            return;
        }
        let elapsed = self.supervisor.on_sent(self.stack.now_millis());
        trace!(%handle, len, elapsed, "ack");
        fire!(self, ack, len, elapsed);
    }

    /// Periodic tick on `handle`.
    pub fn handle_poll(&mut self, handle: Handle) {
        if self.handle != Some(handle) {
            return;
        }
        match self.supervisor.tick(self.stack.now_millis()) {
            SupervisorAction::Close => self.teardown(),
            SupervisorAction::AckTimeout(elapsed) => {
                debug!(%handle, elapsed, "ack timeout");
                fire!(self, timeout, elapsed);
            }
            SupervisorAction::IdleTimeout => {
                debug!(%handle, "receive timeout");
                self.teardown();
            }
            SupervisorAction::Poll => fire!(self, poll),
        }
    }

    /// Result of the lookup `query`; `None` means it failed.
    pub fn handle_resolved(&mut self, query: QueryId, addr: Option<Ipv4Addr>) {
        let port = match self.pending_connect {
            Some((pending, port)) if pending == query => port,
            _ => return,
        };
        self.pending_connect = None;

        match addr {
            Some(ip) => {
                let remote = SocketAddrV4::new(ip, port);
                if let Err(code) = self.try_connect(remote) {
                    warn!(%remote, error = %code, "deferred connect failed");
                    self.notify_terminal(code);
                }
            }
            None => {
                debug!(query = query.raw(), "resolution failed");
                self.notify_terminal(ErrorCode::DnsFailed);
            }
        }
    }

    // =========================================================================
    // Callbacks
    // =========================================================================

    /// Set the connect handler.
    pub fn on_connect<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Self) + 'static,
    {
        self.handlers.connect.set(Some(Box::new(handler)));
    }

    /// Set the disconnect handler.
    pub fn on_disconnect<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Self) + 'static,
    {
        self.handlers.disconnect.set(Some(Box::new(handler)));
    }

    /// Set the sent-acknowledgment handler: `(client, len, elapsed_millis)`.
    pub fn on_ack<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Self, usize, u32) + 'static,
    {
        self.handlers.ack.set(Some(Box::new(handler)));
    }

    /// Set the error handler.
    pub fn on_error<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Self, ErrorCode) + 'static,
    {
        self.handlers.error.set(Some(Box::new(handler)));
    }

    /// Set the data handler.
    pub fn on_data<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Self, &[u8]) + 'static,
    {
        self.handlers.data.set(Some(Box::new(handler)));
    }

    /// Set the ack-timeout handler: `(client, elapsed_millis)`.
    pub fn on_timeout<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Self, u32) + 'static,
    {
        self.handlers.timeout.set(Some(Box::new(handler)));
    }

    /// Set the poll handler.
    pub fn on_poll<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Self) + 'static,
    {
        self.handlers.poll.set(Some(Box::new(handler)));
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Set the ack timeout in milliseconds (0 disables).
    pub fn set_ack_timeout(&mut self, millis: u32) {
        self.supervisor.set_ack_timeout(millis);
    }

    /// Ack timeout in milliseconds.
    pub fn ack_timeout(&self) -> u32 {
        self.supervisor.ack_timeout()
    }

    /// Set the idle-receive timeout in seconds (0 disables).
    pub fn set_rx_timeout(&mut self, secs: u32) {
        self.supervisor.set_rx_timeout(secs);
    }

    /// Idle-receive timeout in seconds.
    pub fn rx_timeout(&self) -> u32 {
        self.supervisor.rx_timeout()
    }

    /// Disable (`true`) or enable (`false`) Nagle's algorithm.
    pub fn set_no_delay(&mut self, no_delay: bool) {
        self.no_delay = Some(no_delay);
        if let Some(handle) = self.handle {
            self.stack.set_nagle(handle, !no_delay);
        }
    }

    /// Check if Nagle's algorithm is disabled on the current handle.
    pub fn no_delay(&self) -> bool {
        self.handle
            .is_some_and(|handle| !self.stack.nagle_enabled(handle))
    }

    // =========================================================================
    // State
    // =========================================================================

    /// The owned handle, if any.
    pub fn handle(&self) -> Option<Handle> {
        self.handle
    }

    /// The shared stack.
    pub fn stack(&self) -> &Rc<T> {
        &self.stack
    }

    /// Protocol state; [`TcpState::Closed`] without a handle.
    pub fn state(&self) -> TcpState {
        self.handle
            .map(|handle| self.stack.state(handle))
            .unwrap_or(TcpState::Closed)
    }

    /// Human-readable protocol state.
    pub fn state_label(&self) -> &'static str {
        self.state().as_str()
    }

    /// Human-readable label for `code`.
    pub fn error_label(code: ErrorCode) -> &'static str {
        code.as_str()
    }

    /// Check if the connection is established.
    pub fn connected(&self) -> bool {
        self.state() == TcpState::Established
    }

    /// Check if the opening handshake is in progress.
    pub fn connecting(&self) -> bool {
        self.handle.is_some() && self.state().is_connecting()
    }

    /// Check if the closing sequence is in progress.
    pub fn disconnecting(&self) -> bool {
        self.handle.is_some() && self.state().is_disconnecting()
    }

    /// Check if the connection is closed or in TIME-WAIT.
    pub fn disconnected(&self) -> bool {
        self.state().is_disconnected()
    }

    /// Check if the object can be discarded or reused.
    pub fn freeable(&self) -> bool {
        self.state().is_freeable()
    }

    /// Check if a name resolution is outstanding.
    pub fn is_resolving(&self) -> bool {
        self.pending_connect.is_some()
    }

    /// The outstanding name resolution, if any.
    pub fn pending_query(&self) -> Option<QueryId> {
        self.pending_connect.map(|(query, _)| query)
    }

    /// Check if the object holds no handle and awaits no resolution.
    pub fn is_idle(&self) -> bool {
        self.handle.is_none() && self.pending_connect.is_none()
    }

    /// Remote endpoint, if a handle is held.
    pub fn remote_addr(&self) -> Option<SocketAddrV4> {
        self.handle.map(|handle| self.stack.remote_endpoint(handle))
    }

    /// Local endpoint, if a handle is held.
    pub fn local_addr(&self) -> Option<SocketAddrV4> {
        self.handle.map(|handle| self.stack.local_endpoint(handle))
    }

    /// Remote address, unspecified without a handle.
    pub fn remote_ip(&self) -> Ipv4Addr {
        self.remote_addr()
            .map(|addr| *addr.ip())
            .unwrap_or(Ipv4Addr::UNSPECIFIED)
    }

    /// Remote port, zero without a handle.
    pub fn remote_port(&self) -> u16 {
        self.remote_addr().map(|addr| addr.port()).unwrap_or(NO_PORT)
    }

    /// Local address, unspecified without a handle.
    pub fn local_ip(&self) -> Ipv4Addr {
        self.local_addr()
            .map(|addr| *addr.ip())
            .unwrap_or(Ipv4Addr::UNSPECIFIED)
    }

    /// Local port, zero without a handle.
    pub fn local_port(&self) -> u16 {
        self.local_addr().map(|addr| addr.port()).unwrap_or(NO_PORT)
    }

    /// Check if both clients hold handles to the same remote endpoint.
    pub fn same_peer(&self, other: &Self) -> bool {
        match (self.remote_addr(), other.remote_addr()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl<T: Transport> Drop for AsyncClient<T> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.teardown();
        }
        // A disconnect handler may have connected again
        self.pending_connect = None;
        if let Some(handle) = self.handle.take() {
            self.stack.register(handle, Interest::NONE);
            self.stack.abort(handle);
            debug!(%handle, "released on drop");
        }
    }
}

impl<T: Transport> fmt::Debug for AsyncClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncClient")
            .field("handle", &self.handle)
            .field("state", &self.state())
            .field("rx_ack_len", &self.rx_ack_len)
            .field("pending_connect", &self.pending_connect)
            .field("supervisor", &self.supervisor)
            .finish()
    }
}
