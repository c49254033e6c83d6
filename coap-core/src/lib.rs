//! Endpoint-level state: configuration, sockets, transmission bookkeeping,
//! and the event loop that ties them together. Built on [`coap_msg`]'s wire
//! codec.

pub mod config;
pub mod core;
pub mod net;
pub mod retry;
pub mod socket;
pub mod time;

pub use config::Config;
pub use core::{AlreadyReplied, Endpoint, ProcessError, ReceptionRecord, ReplyError, SendError, TransmissionRecord};
pub use net::{is_multicast, Addrd};
pub use socket::Socket;
pub use time::{Clock, SystemClock};
