//! Transmission record: tracks a message this endpoint sent until it's
//! acknowledged, reset, answered, or given up on (§3, §4.5).
//!
//! Grounded on `coapy.connection.TransmissionRecord`: a Con message to a
//! unicast remote gets the full retransmission budget; anything else (Non,
//! or any message to a multicast remote) gets exactly one send.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use coap_msg::Kind;

use crate::core::reception::ReceptionRecord;
use crate::net::is_multicast;
use crate::retry::Backoff;

#[derive(Debug, Clone)]
pub struct TransmissionRecord {
    pub transaction_id: u16,
    pub packed: Vec<u8>,
    pub remote: SocketAddr,
    pub kind: Kind,
    backoff: Backoff,
    next_event_time: Option<Instant>,
    last_event_time: Instant,
    response_type: Option<Kind>,
    response: Option<ReceptionRecord>,
    responses: Vec<ReceptionRecord>,
}

impl TransmissionRecord {
    pub fn new(
        transaction_id: u16,
        kind: Kind,
        packed: Vec<u8>,
        remote: SocketAddr,
        response_timeout: Duration,
        max_retransmit: u32,
        now: Instant,
    ) -> Self {
        let attempts = if kind == Kind::Con && !is_multicast(remote) { max_retransmit } else { 1 };
        // Non messages have no response to wait for; pre-resolve so the
        // event loop never retransmits or blocks waiting on one.
        let response_type = if kind == Kind::Con { None } else { Some(kind) };
        Self {
            transaction_id,
            packed,
            remote,
            kind,
            backoff: Backoff::new(attempts, response_timeout),
            next_event_time: Some(now),
            last_event_time: now,
            response_type,
            response: None,
            responses: Vec::new(),
        }
    }

    /// Due to be (re)transmitted right now.
    pub fn due_for_retransmit(&self, now: Instant) -> bool {
        self.response_type.is_none() && !self.backoff.is_exhausted() && self.next_event_time.map_or(false, |t| t <= now)
    }

    /// Retries are exhausted and no response ever arrived: nothing more to
    /// send, but the record is kept around until it expires.
    pub fn should_mark_unacknowledged(&self, now: Instant) -> bool {
        self.response_type.is_none() && self.backoff.is_exhausted() && self.next_event_time.map_or(false, |t| t <= now)
    }

    pub fn mark_unacknowledged(&mut self) {
        self.next_event_time = None;
    }

    /// Record that the packet was just put on the wire: advance the backoff
    /// and schedule the next retransmission.
    pub fn decrement_transmissions(&mut self, now: Instant) {
        self.last_event_time = now;
        let wait = self.backoff.advance();
        self.next_event_time = Some(now + wait);
    }

    /// A matching Ack or Rst arrived: stop retransmitting and record it. The
    /// first correlated reception becomes `response`/`response_type`;
    /// subsequent matching packets (e.g. a duplicate Ack) only add to
    /// `responses`, leaving `response`/`response_type` as they were.
    pub fn process_response(&mut self, now: Instant, rx: ReceptionRecord) {
        self.last_event_time = now;
        self.next_event_time = None;
        if self.response.is_none() {
            self.response_type = Some(rx.message.kind);
            self.response = Some(rx.clone());
        }
        self.responses.push(rx);
    }

    pub fn response_type(&self) -> Option<Kind> {
        self.response_type
    }

    /// The first reception correlated to this transmission, if any.
    pub fn response(&self) -> Option<&ReceptionRecord> {
        self.response.as_ref()
    }

    /// Every reception correlated to this transmission, in arrival order.
    pub fn responses(&self) -> &[ReceptionRecord] {
        &self.responses
    }

    /// Retransmission attempts remaining, for logging.
    pub fn attempts_left(&self) -> u32 {
        self.backoff.attempts_left()
    }

    /// Neither acknowledged nor given up on yet.
    pub fn is_unacknowledged(&self) -> bool {
        self.next_event_time.is_none() && self.response_type.is_none()
    }

    /// The next instant this record needs attention (a retransmit or an
    /// expiry check), if any.
    pub fn next_event_time(&self) -> Option<Instant> {
        self.next_event_time
    }

    /// This record has had nothing to do for longer than the configured
    /// history window and can be forgotten.
    pub fn expired(&self, now: Instant, max_tx_history: Duration) -> bool {
        self.next_event_time.is_none() && now > self.last_event_time + max_tx_history
    }
}
