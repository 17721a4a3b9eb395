//! Scripted in-memory stack used by the unit tests.
//!
//! Every operation is recorded; tests steer the clock, the send window,
//! routing, resolution and failure injection.

use std::cell::RefCell;
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::rc::Rc;

use super::binding::{Handle, Interest, QueryId, Resolution, Transport};
use crate::core::{ErrorCode, TcpState};

/// Window given to freshly allocated handles.
pub const DEFAULT_WINDOW: usize = 2920;

/// Local address of the scripted interface.
pub const LOCAL_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);

/// Recorded stack operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect(Handle, SocketAddrV4),
    Bind(Handle, SocketAddrV4),
    Listen(Handle),
    Write(Handle, usize),
    Output(Handle),
    Recved(Handle, usize),
    Close(Handle),
    Abort(Handle),
    Nagle(Handle, bool),
}

#[derive(Debug)]
struct Pcb {
    state: TcpState,
    window: usize,
    interest: Interest,
    local: SocketAddrV4,
    remote: SocketAddrV4,
    nagle: bool,
    queued: Vec<u8>,
    transmitted: Vec<u8>,
    recved: usize,
}

impl Pcb {
    fn new(window: usize) -> Self {
        Self {
            state: TcpState::Closed,
            window,
            interest: Interest::NONE,
            local: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0),
            remote: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0),
            nagle: true,
            queued: Vec::new(),
            transmitted: Vec::new(),
            recved: 0,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    now: u32,
    next_handle: u32,
    next_query: u32,
    pcbs: HashMap<Handle, Pcb>,
    unroutable: bool,
    alloc_fails: bool,
    bind_fails: bool,
    listen_fails: bool,
    close_fails: bool,
    write_fails: bool,
    output_fails: bool,
    names: HashMap<String, Resolution>,
    calls: Vec<Call>,
}

/// In-memory [`Transport`] implementation.
#[derive(Debug, Default)]
pub struct MockStack {
    inner: RefCell<Inner>,
}

impl MockStack {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn set_now(&self, millis: u32) {
        self.inner.borrow_mut().now = millis;
    }

    pub fn advance(&self, millis: u32) {
        let mut inner = self.inner.borrow_mut();
        inner.now = inner.now.wrapping_add(millis);
    }

    pub fn set_unroutable(&self, unroutable: bool) {
        self.inner.borrow_mut().unroutable = unroutable;
    }

    pub fn set_alloc_fails(&self, fails: bool) {
        self.inner.borrow_mut().alloc_fails = fails;
    }

    pub fn set_bind_fails(&self, fails: bool) {
        self.inner.borrow_mut().bind_fails = fails;
    }

    pub fn set_listen_fails(&self, fails: bool) {
        self.inner.borrow_mut().listen_fails = fails;
    }

    pub fn set_close_fails(&self, fails: bool) {
        self.inner.borrow_mut().close_fails = fails;
    }

    pub fn set_write_fails(&self, fails: bool) {
        self.inner.borrow_mut().write_fails = fails;
    }

    pub fn set_output_fails(&self, fails: bool) {
        self.inner.borrow_mut().output_fails = fails;
    }

    /// Answer lookups of `host` with `resolution`.
    pub fn set_resolution(&self, host: &str, resolution: Resolution) {
        self.inner
            .borrow_mut()
            .names
            .insert(host.to_owned(), resolution);
    }

    /// Make lookups of `host` asynchronous, returning the query they will report on.
    pub fn defer_resolution(&self, host: &str) -> QueryId {
        let mut inner = self.inner.borrow_mut();
        inner.next_query += 1;
        let query = QueryId::new(inner.next_query);
        inner
            .names
            .insert(host.to_owned(), Resolution::Pending(query));
        query
    }

    pub fn set_window(&self, handle: Handle, window: usize) {
        if let Some(pcb) = self.inner.borrow_mut().pcbs.get_mut(&handle) {
            pcb.window = window;
        }
    }

    pub fn set_state(&self, handle: Handle, state: TcpState) {
        if let Some(pcb) = self.inner.borrow_mut().pcbs.get_mut(&handle) {
            pcb.state = state;
        }
    }

    /// Complete the three-way handshake of a connecting handle.
    pub fn establish(&self, handle: Handle) {
        self.set_state(handle, TcpState::Established);
    }

    /// Create an established handle as if accepted from `remote`.
    pub fn incoming(&self, local_port: u16, remote: SocketAddrV4) -> Handle {
        let mut inner = self.inner.borrow_mut();
        inner.next_handle += 1;
        let handle = Handle::new(inner.next_handle);
        let mut pcb = Pcb::new(DEFAULT_WINDOW);
        pcb.state = TcpState::Established;
        pcb.local = SocketAddrV4::new(LOCAL_IP, local_port);
        pcb.remote = remote;
        inner.pcbs.insert(handle, pcb);
        handle
    }

    /// Drop a handle as the stack does before reporting a fatal error.
    pub fn kill(&self, handle: Handle) {
        self.inner.borrow_mut().pcbs.remove(&handle);
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        self.inner.borrow().pcbs.contains_key(&handle)
    }

    pub fn interest(&self, handle: Handle) -> Interest {
        self.inner
            .borrow()
            .pcbs
            .get(&handle)
            .map(|pcb| pcb.interest)
            .unwrap_or(Interest::NONE)
    }

    pub fn transmitted(&self, handle: Handle) -> Vec<u8> {
        self.inner
            .borrow()
            .pcbs
            .get(&handle)
            .map(|pcb| pcb.transmitted.clone())
            .unwrap_or_default()
    }

    pub fn queued(&self, handle: Handle) -> usize {
        self.inner
            .borrow()
            .pcbs
            .get(&handle)
            .map(|pcb| pcb.queued.len())
            .unwrap_or(0)
    }

    /// Total bytes acknowledged through `recved` for `handle`, from the log.
    pub fn recved_total(&self, handle: Handle) -> usize {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Recved(h, len) if *h == handle => Some(*len),
                _ => None,
            })
            .sum()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.borrow().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.inner.borrow().calls.iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.inner.borrow_mut().calls.push(call);
    }
}

impl Transport for MockStack {
    fn now_millis(&self) -> u32 {
        self.inner.borrow().now
    }

    fn has_route(&self, _addr: Ipv4Addr) -> bool {
        !self.inner.borrow().unroutable
    }

    fn allocate(&self) -> Option<Handle> {
        let mut inner = self.inner.borrow_mut();
        if inner.alloc_fails {
            return None;
        }
        inner.next_handle += 1;
        let handle = Handle::new(inner.next_handle);
        inner.pcbs.insert(handle, Pcb::new(DEFAULT_WINDOW));
        Some(handle)
    }

    fn register(&self, handle: Handle, interest: Interest) {
        if let Some(pcb) = self.inner.borrow_mut().pcbs.get_mut(&handle) {
            pcb.interest = interest;
        }
    }

    fn connect(&self, handle: Handle, remote: SocketAddrV4) -> Result<(), ErrorCode> {
        self.record(Call::Connect(handle, remote));
        let mut inner = self.inner.borrow_mut();
        let pcb = inner.pcbs.get_mut(&handle).ok_or(ErrorCode::Closed)?;
        pcb.state = TcpState::SynSent;
        pcb.remote = remote;
        pcb.local = SocketAddrV4::new(LOCAL_IP, 49152 + handle.raw() as u16);
        Ok(())
    }

    fn bind(&self, handle: Handle, local: SocketAddrV4) -> Result<(), ErrorCode> {
        self.record(Call::Bind(handle, local));
        let mut inner = self.inner.borrow_mut();
        if inner.bind_fails {
            return Err(ErrorCode::AddressInUse);
        }
        let pcb = inner.pcbs.get_mut(&handle).ok_or(ErrorCode::Closed)?;
        pcb.local = local;
        Ok(())
    }

    fn listen(&self, handle: Handle) -> Option<Handle> {
        self.record(Call::Listen(handle));
        let mut inner = self.inner.borrow_mut();
        if inner.listen_fails {
            return None;
        }
        let mut pcb = inner.pcbs.remove(&handle)?;
        pcb.state = TcpState::Listen;
        inner.next_handle += 1;
        let listening = Handle::new(inner.next_handle);
        inner.pcbs.insert(listening, pcb);
        Some(listening)
    }

    fn write(&self, handle: Handle, data: &[u8]) -> Result<(), ErrorCode> {
        self.record(Call::Write(handle, data.len()));
        let mut inner = self.inner.borrow_mut();
        if inner.write_fails {
            return Err(ErrorCode::OutOfMemory);
        }
        let pcb = inner.pcbs.get_mut(&handle).ok_or(ErrorCode::Closed)?;
        if data.len() > pcb.window {
            return Err(ErrorCode::OutOfMemory);
        }
        pcb.window -= data.len();
        pcb.queued.extend_from_slice(data);
        Ok(())
    }

    fn output(&self, handle: Handle) -> Result<(), ErrorCode> {
        self.record(Call::Output(handle));
        let mut inner = self.inner.borrow_mut();
        if inner.output_fails {
            return Err(ErrorCode::Routing);
        }
        let pcb = inner.pcbs.get_mut(&handle).ok_or(ErrorCode::Closed)?;
        let queued = std::mem::take(&mut pcb.queued);
        pcb.transmitted.extend_from_slice(&queued);
        Ok(())
    }

    fn recved(&self, handle: Handle, len: usize) {
        self.record(Call::Recved(handle, len));
        if let Some(pcb) = self.inner.borrow_mut().pcbs.get_mut(&handle) {
            pcb.recved += len;
        }
    }

    fn close(&self, handle: Handle) -> Result<(), ErrorCode> {
        self.record(Call::Close(handle));
        let mut inner = self.inner.borrow_mut();
        if inner.close_fails {
            return Err(ErrorCode::OutOfMemory);
        }
        inner.pcbs.remove(&handle);
        Ok(())
    }

    fn abort(&self, handle: Handle) {
        self.record(Call::Abort(handle));
        self.inner.borrow_mut().pcbs.remove(&handle);
    }

    fn send_buffer(&self, handle: Handle) -> usize {
        self.inner
            .borrow()
            .pcbs
            .get(&handle)
            .map(|pcb| pcb.window)
            .unwrap_or(0)
    }

    fn state(&self, handle: Handle) -> TcpState {
        self.inner
            .borrow()
            .pcbs
            .get(&handle)
            .map(|pcb| pcb.state)
            .unwrap_or(TcpState::Closed)
    }

    fn local_endpoint(&self, handle: Handle) -> SocketAddrV4 {
        self.inner
            .borrow()
            .pcbs
            .get(&handle)
            .map(|pcb| pcb.local)
            .unwrap_or(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))
    }

    fn remote_endpoint(&self, handle: Handle) -> SocketAddrV4 {
        self.inner
            .borrow()
            .pcbs
            .get(&handle)
            .map(|pcb| pcb.remote)
            .unwrap_or(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))
    }

    fn set_nagle(&self, handle: Handle, enabled: bool) {
        self.record(Call::Nagle(handle, enabled));
        if let Some(pcb) = self.inner.borrow_mut().pcbs.get_mut(&handle) {
            pcb.nagle = enabled;
        }
    }

    fn nagle_enabled(&self, handle: Handle) -> bool {
        self.inner
            .borrow()
            .pcbs
            .get(&handle)
            .map(|pcb| pcb.nagle)
            .unwrap_or(true)
    }

    fn resolve(&self, host: &str) -> Resolution {
        self.inner
            .borrow()
            .names
            .get(host)
            .copied()
            .unwrap_or(Resolution::Failed)
    }
}
