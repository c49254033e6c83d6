//! Endpoint tunables (§6, §9 "Global configuration").
//!
//! Earlier drafts of this crate threaded a `Config` trait with associated
//! types through every generic parameter, the way `kwap::config::Config`
//! does. These values don't vary per socket or per clock, though — they're
//! three durations an operator might want to tune — so they live in a plain
//! struct instead.

use std::time::Duration;

/// The well-known UDP port this protocol binds to by default.
pub const COAP_PORT: u16 = 61616;

/// Tunable timing parameters for retransmission and transaction bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Initial timeout before the first retransmission of a Con message.
    /// Doubles on every subsequent retry (§4.5).
    pub response_timeout: Duration,
    /// Maximum number of times a Con message is retransmitted before the
    /// transaction is given up as unacknowledged.
    pub max_retransmit: u32,
    /// How long a fully-resolved transmission record is kept around (so a
    /// late duplicate ack can still be matched) before it's forgotten.
    pub max_tx_history: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(1),
            max_retransmit: 5,
            max_tx_history: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_external_interface() {
        let cfg = Config::default();
        assert_eq!(cfg.response_timeout, Duration::from_secs(1));
        assert_eq!(cfg.max_retransmit, 5);
        assert_eq!(cfg.max_tx_history, Duration::from_secs(10));
    }
}
