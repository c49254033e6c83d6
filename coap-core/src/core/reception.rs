//! Reception record: a message that arrived off the wire, not yet (or
//! already) replied to (§3, §4.7).
//!
//! The original library lets a `ReceptionRecord` hold a reference back to
//! its endpoint and call `_respond` directly, which in Rust would mean a
//! `Rc<RefCell<Endpoint>>` cycle for no real benefit. Instead the record is
//! inert data; replying goes through `Endpoint::respond`, which owns the
//! socket and enforces the at-most-once-reply rule.

use std::net::SocketAddr;

use coap_msg::{Code, Kind, Message};

#[derive(Debug, Clone)]
pub struct ReceptionRecord {
    pub transaction_id: u16,
    pub message: Message,
    pub remote: SocketAddr,
    responded: bool,
    pertains_to: Option<u16>,
}

impl ReceptionRecord {
    pub fn new(transaction_id: u16, message: Message, remote: SocketAddr) -> Self {
        Self { transaction_id, message, remote, responded: false, pertains_to: None }
    }

    /// The transmission record this arrived in reply to, if it was an Ack or
    /// Rst and a matching pending transmission was found at receive time.
    pub fn pertains_to(&self) -> Option<u16> {
        self.pertains_to
    }

    pub(crate) fn set_pertains_to(&mut self, transaction_id: u16) {
        self.pertains_to = Some(transaction_id);
    }

    /// True if this arrived as a Con message and so expects an Ack, a Rst,
    /// or a piggybacked reply.
    pub fn is_confirmable(&self) -> bool {
        self.message.kind == Kind::Con
    }

    pub fn has_responded(&self) -> bool {
        self.responded
    }

    pub(crate) fn mark_responded(&mut self) {
        self.responded = true;
    }

    /// An empty acknowledgement for this message.
    pub fn ack(&self) -> Message {
        Message::new(Kind::Ack, Code::EMPTY)
    }

    /// An empty reset for this message, sent when it can't be processed.
    pub fn reset(&self) -> Message {
        Message::new(Kind::Rst, Code::EMPTY)
    }
}
