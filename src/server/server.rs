//! Passive listener.
//!
//! Provides `AsyncServer<T>` for accepting connections on a local endpoint
//! and handing each one to the application as an [`AsyncClient`].

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::client::{AsyncClient, ClientConfig};
use crate::core::TcpState;
use crate::transport::{Handle, Interest, Transport};

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address and port to listen on.
    pub local: SocketAddrV4,

    /// Disable Nagle's algorithm on accepted connections.
    pub no_delay: bool,

    /// Configuration of the connection objects handed to the application.
    /// Its `no_delay` is replaced by the listener's own preference.
    pub client: ClientConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            local: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0),
            no_delay: false,
            client: ClientConfig::default(),
        }
    }
}

/// Builder for a [`ServerConfig`].
#[derive(Debug)]
pub struct ServerBuilder {
    config: ServerConfig,
}

impl ServerBuilder {
    /// Create a new server builder.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Set the listen address.
    pub fn addr(mut self, addr: Ipv4Addr) -> Self {
        self.config.local.set_ip(addr);
        self
    }

    /// Set the listen port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.local.set_port(port);
        self
    }

    /// Disable Nagle's algorithm on accepted connections.
    pub fn no_delay(mut self, no_delay: bool) -> Self {
        self.config.no_delay = no_delay;
        self
    }

    /// Set the configuration of accepted connection objects.
    pub fn client(mut self, config: ClientConfig) -> Self {
        self.config.client = config;
        self
    }

    /// Build the server configuration.
    pub fn build(self) -> ServerConfig {
        self.config
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler receiving each accepted connection.
pub type ClientHandler<T> = dyn FnMut(AsyncClient<T>);

/// A passive TCP listener.
///
/// # Example
///
/// ```ignore
/// use async_tcp::prelude::*;
///
/// let mut server = AsyncServer::with_port(stack.clone(), 80);
/// server.on_client(move |mut client| {
///     client.on_data(|c, data| {
///         c.write(data);
///     });
///     clients.borrow_mut().insert(client);
/// });
/// server.begin();
/// ```
pub struct AsyncServer<T: Transport> {
    /// The shared stack.
    stack: Rc<T>,

    /// Server configuration.
    config: ServerConfig,

    /// The listening handle, once bound.
    handle: Option<Handle>,

    /// Application handler for accepted connections.
    on_client: Option<Box<ClientHandler<T>>>,
}

impl<T: Transport> AsyncServer<T> {
    /// Create a listener for `addr:port`.
    pub fn new(stack: Rc<T>, addr: Ipv4Addr, port: u16) -> Self {
        let config = ServerBuilder::new().addr(addr).port(port).build();
        Self::with_config(stack, config)
    }

    /// Create a listener for `port` on any local address.
    pub fn with_port(stack: Rc<T>, port: u16) -> Self {
        Self::new(stack, Ipv4Addr::UNSPECIFIED, port)
    }

    /// Create a listener from a configuration.
    pub fn with_config(stack: Rc<T>, config: ServerConfig) -> Self {
        Self {
            stack,
            config,
            handle: None,
            on_client: None,
        }
    }

    /// Set the handler that takes ownership of accepted connections.
    pub fn on_client<F>(&mut self, handler: F)
    where
        F: FnMut(AsyncClient<T>) + 'static,
    {
        self.on_client = Some(Box::new(handler));
    }

    /// Start listening.
    ///
    /// Does nothing if already listening. Failures are logged and leave the
    /// listener unbound; [`status`](Self::status) then reports `Closed`.
    pub fn begin(&mut self) {
        if self.handle.is_some() {
            return;
        }
        let local = self.config.local;

        let Some(handle) = self.stack.allocate() else {
            warn!(%local, "listener allocation failed");
            return;
        };

        if let Err(code) = self.stack.bind(handle, local) {
            warn!(%local, error = %code, "bind failed");
            self.release(handle);
            return;
        }

        let Some(listening) = self.stack.listen(handle) else {
            warn!(%local, "listen failed");
            self.release(handle);
            return;
        };

        self.stack.register(listening, Interest::LISTENING);
        self.handle = Some(listening);
        debug!(handle = %listening, %local, "listening");
    }

    /// Stop listening. Safe to call repeatedly.
    pub fn end(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.stack.register(handle, Interest::NONE);
        self.stack.abort(handle);
        debug!(%handle, "listener stopped");
    }

    fn release(&self, handle: Handle) {
        if let Err(code) = self.stack.close(handle) {
            warn!(%handle, error = %code, "close failed, aborting");
            self.stack.abort(handle);
        }
    }

    /// Incoming connection `accepted` on `listener`.
    ///
    /// Without an `on_client` handler the connection is closed immediately.
    pub fn handle_accept(&mut self, listener: Handle, accepted: Handle) {
        if self.handle != Some(listener) {
            debug!(%listener, %accepted, "accept on unknown listener");
            self.release(accepted);
            return;
        }
        let Some(on_client) = self.on_client.as_mut() else {
            debug!(%accepted, "no client handler, closing");
            self.release(accepted);
            return;
        };

        debug!(%listener, %accepted, "accepted");
        let config = ClientConfig {
            no_delay: Some(self.config.no_delay),
            ..self.config.client.clone()
        };
        let client = AsyncClient::accepted(self.stack.clone(), accepted, config);
        on_client(client);
    }

    /// Disable (`true`) or enable (`false`) Nagle's algorithm on future accepts.
    pub fn set_no_delay(&mut self, no_delay: bool) {
        self.config.no_delay = no_delay;
    }

    /// Check if accepted connections get Nagle's algorithm disabled.
    pub fn no_delay(&self) -> bool {
        self.config.no_delay
    }

    /// Protocol state of the listening handle; `Closed` when not listening.
    pub fn status(&self) -> TcpState {
        self.handle
            .map(|handle| self.stack.state(handle))
            .unwrap_or(TcpState::Closed)
    }

    /// Check if the listener is bound.
    pub fn is_listening(&self) -> bool {
        self.handle.is_some()
    }

    /// The listening handle, if bound.
    pub fn handle(&self) -> Option<Handle> {
        self.handle
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl<T: Transport> Drop for AsyncServer<T> {
    fn drop(&mut self) {
        self.end();
    }
}

impl<T: Transport> fmt::Debug for AsyncServer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncServer")
            .field("config", &self.config)
            .field("handle", &self.handle)
            .field("on_client", &self.on_client.is_some())
            .finish()
    }
}
