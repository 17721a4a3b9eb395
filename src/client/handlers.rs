//! Single-slot application callbacks.
//!
//! Each event kind holds at most one handler. Setting a handler replaces the
//! previous one; handlers are never chained.

use std::fmt;

use super::client::AsyncClient;
use crate::core::ErrorCode;
use crate::transport::Transport;

/// Connect, disconnect and poll notifications.
pub type ConnectHandler<T> = dyn FnMut(&mut AsyncClient<T>);

/// Sent-data acknowledgment: `(client, length, elapsed_millis)`.
pub type AckHandler<T> = dyn FnMut(&mut AsyncClient<T>, usize, u32);

/// Fatal error notification.
pub type ErrorHandler<T> = dyn FnMut(&mut AsyncClient<T>, ErrorCode);

/// Inbound payload delivery.
pub type DataHandler<T> = dyn FnMut(&mut AsyncClient<T>, &[u8]);

/// Ack timeout notification: `(client, elapsed_millis)`.
pub type TimeoutHandler<T> = dyn FnMut(&mut AsyncClient<T>, u32);

/// Storage for one handler.
///
/// While a handler runs it is taken out of its slot so it can receive the
/// client mutably. A replacement installed from inside the running handler
/// wins over the running one when it returns. A handler is never re-entered:
/// a nested event of the same kind finds the slot empty.
pub struct Slot<F: ?Sized> {
    handler: Option<Box<F>>,
    running: bool,
    replaced: bool,
}

impl<F: ?Sized> Slot<F> {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self {
            handler: None,
            running: false,
            replaced: false,
        }
    }

    /// Install `handler`, or clear the slot with `None`.
    pub fn set(&mut self, handler: Option<Box<F>>) {
        self.handler = handler;
        if self.running {
            self.replaced = true;
        }
    }

    /// Check if a handler is installed.
    pub fn is_set(&self) -> bool {
        self.handler.is_some()
    }

    /// Take the handler out for a call.
    pub(crate) fn begin(&mut self) -> Option<Box<F>> {
        let handler = self.handler.take()?;
        self.running = true;
        self.replaced = false;
        Some(handler)
    }

    /// Return the handler after a call unless it was replaced meanwhile.
    pub(crate) fn finish(&mut self, handler: Box<F>) {
        if !self.replaced {
            self.handler = Some(handler);
        }
        self.running = false;
        self.replaced = false;
    }
}

impl<F: ?Sized> Default for Slot<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> fmt::Debug for Slot<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("set", &self.handler.is_some())
            .field("running", &self.running)
            .finish()
    }
}

/// The seven callback slots of a connection object.
pub(crate) struct Handlers<T: Transport> {
    pub connect: Slot<ConnectHandler<T>>,
    pub disconnect: Slot<ConnectHandler<T>>,
    pub ack: Slot<AckHandler<T>>,
    pub error: Slot<ErrorHandler<T>>,
    pub data: Slot<DataHandler<T>>,
    pub timeout: Slot<TimeoutHandler<T>>,
    pub poll: Slot<ConnectHandler<T>>,
}

impl<T: Transport> Handlers<T> {
    pub fn new() -> Self {
        Self {
            connect: Slot::new(),
            disconnect: Slot::new(),
            ack: Slot::new(),
            error: Slot::new(),
            data: Slot::new(),
            timeout: Slot::new(),
            poll: Slot::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Counter = dyn FnMut(&mut u32);

    #[test]
    fn test_slot_replace() {
        let mut slot: Slot<Counter> = Slot::new();
        assert!(!slot.is_set());

        slot.set(Some(Box::new(|n: &mut u32| *n += 1)));
        slot.set(Some(Box::new(|n: &mut u32| *n += 10)));

        let mut n = 0;
        let mut handler = slot.begin().unwrap();
        handler(&mut n);
        slot.finish(handler);

        // Only the second handler ran
        assert_eq!(n, 10);
        assert!(slot.is_set());
    }

    #[test]
    fn test_slot_not_reentered() {
        let mut slot: Slot<Counter> = Slot::new();
        slot.set(Some(Box::new(|n: &mut u32| *n += 1)));

        let handler = slot.begin().unwrap();
        assert!(slot.begin().is_none());
        slot.finish(handler);
        assert!(slot.begin().is_some());
    }

    #[test]
    fn test_slot_replaced_while_running() {
        let mut slot: Slot<Counter> = Slot::new();
        slot.set(Some(Box::new(|n: &mut u32| *n += 1)));

        let handler = slot.begin().unwrap();
        slot.set(Some(Box::new(|n: &mut u32| *n += 100)));
        slot.finish(handler);

        let mut n = 0;
        let mut handler = slot.begin().unwrap();
        handler(&mut n);
        slot.finish(handler);
        assert_eq!(n, 100);
    }

    #[test]
    fn test_slot_cleared_while_running() {
        let mut slot: Slot<Counter> = Slot::new();
        slot.set(Some(Box::new(|n: &mut u32| *n += 1)));

        let handler = slot.begin().unwrap();
        slot.set(None);
        slot.finish(handler);
        assert!(!slot.is_set());
    }
}
