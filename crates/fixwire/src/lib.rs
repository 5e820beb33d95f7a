//! fixwire - FIX 4.4 Wire Codec and Session Engine
//!
//! Serializes orders and market-data snapshots into `tag=value` frames with
//! derived body-length and modulo-256 checksum, parses inbound frames, and
//! dispatches them by message type through a per-peer session.
//!
//! The codec is a faithful-enough FIX 4.4 subset for internal round-trip,
//! not a certified exchange gateway: every serialized frame re-parses and
//! re-serializes byte-identically, and checksums always validate.
//!
//! # Example
//!
//! ```
//! use fixwire::{msg_type, tags, FixMessage};
//!
//! let mut msg = FixMessage::new(msg_type::NEW_ORDER_SINGLE);
//! msg.set(tags::SYMBOL, "AAPL");
//! msg.set_int(tags::MSG_SEQ_NUM, 1);
//!
//! let wire = msg.serialize();
//! let parsed = FixMessage::parse(&wire);
//! assert!(parsed.is_valid());
//! assert_eq!(parsed.serialize(), wire);
//! ```

mod convert;
mod message;
mod session;

pub use convert::{execution_report, market_data_snapshot, new_order_single};
pub use message::{msg_type, tags, verify_checksum, FixMessage, BEGIN_STRING, SOH};
pub use session::{FixSession, FrameSink, MemorySink, MessageHandler, NullSink, SessionError};
