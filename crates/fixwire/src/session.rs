//! FIX session engine: sequencing, logon state, type-keyed dispatch.

use std::collections::HashMap;

use thiserror::Error;

use crate::convert::new_order_single;
use crate::message::{msg_type, tags, FixMessage};
use mktsim::Order;

/// Destination for outbound serialized frames.
///
/// The core has no network transport; a sink is whatever the caller wires
/// up — a socket writer, a capture buffer, or nothing.
pub trait FrameSink: Send {
    fn send_frame(&mut self, frame: &[u8]);
}

/// Discards every frame.
pub struct NullSink;

impl FrameSink for NullSink {
    fn send_frame(&mut self, _frame: &[u8]) {}
}

/// Captures frames in memory, in emission order.
#[derive(Default)]
pub struct MemorySink {
    pub frames: Vec<Vec<u8>>,
}

impl FrameSink for MemorySink {
    fn send_frame(&mut self, frame: &[u8]) {
        self.frames.push(frame.to_vec());
    }
}

/// Inbound message handler, invoked inline by `process_message`.
pub type MessageHandler = Box<dyn FnMut(&FixMessage) + Send>;

/// Error from inbound message processing. Neither variant is fatal; the
/// session drops the frame, counts it, and keeps its state.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The frame failed validation and was dropped.
    #[error("malformed frame dropped")]
    InvalidFrame,
    /// No built-in or registered handler matched the message type.
    #[error("unhandled message type {0:?}")]
    UnknownMsgType(String),
}

/// Per-peer FIX session.
///
/// Outbound sequence numbers are contiguous from 1 and never reused within
/// a session. Inbound frames are parsed, validated, handled by the built-in
/// LOGON/LOGOUT/TEST_REQUEST logic, then dispatched through the registered
/// handler table.
pub struct FixSession<S: FrameSink> {
    sender_comp_id: String,
    target_comp_id: String,
    next_seq: u64,
    logged_on: bool,
    handlers: HashMap<String, MessageHandler>,
    sink: S,
    invalid_frames: u64,
    unknown_types: u64,
}

impl<S: FrameSink> FixSession<S> {
    pub fn new(sender: impl Into<String>, target: impl Into<String>, sink: S) -> Self {
        Self {
            sender_comp_id: sender.into(),
            target_comp_id: target.into(),
            next_seq: 1,
            logged_on: false,
            handlers: HashMap::new(),
            sink,
            invalid_frames: 0,
            unknown_types: 0,
        }
    }

    /// Registers a handler for a message type, replacing any previous one.
    pub fn register_handler(&mut self, msg_type: &str, handler: MessageHandler) {
        self.handlers.insert(msg_type.to_owned(), handler);
    }

    /// Returns true between logon and logout.
    pub fn is_logged_on(&self) -> bool {
        self.logged_on
    }

    /// The sequence number the next outbound message will carry.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Count of inbound frames dropped as malformed.
    pub fn invalid_frames(&self) -> u64 {
        self.invalid_frames
    }

    /// Count of inbound messages with no matching handler.
    pub fn unknown_types(&self) -> u64 {
        self.unknown_types
    }

    /// Borrows the sink (to inspect captured frames in tests and demos).
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Emits a LOGON and enters the logged-on state. No-op while logged on.
    pub fn logon(&mut self) {
        if self.logged_on {
            return;
        }
        self.send_message(FixMessage::new(msg_type::LOGON));
        self.logged_on = true;
    }

    /// Emits a LOGOUT and leaves the logged-on state. No-op while logged out.
    pub fn logout(&mut self) {
        if !self.logged_on {
            return;
        }
        self.send_message(FixMessage::new(msg_type::LOGOUT));
        self.logged_on = false;
    }

    /// Emits a HEARTBEAT, echoing a test-request id when replying to one.
    pub fn heartbeat(&mut self, test_req_id: Option<&str>) {
        let mut msg = FixMessage::new(msg_type::HEARTBEAT);
        if let Some(id) = test_req_id {
            msg.set(tags::TEST_REQ_ID, id);
        }
        self.send_message(msg);
    }

    /// Stamps missing sequence/sender/target tags, serializes, and emits.
    pub fn send_message(&mut self, mut msg: FixMessage) {
        if msg.get(tags::MSG_SEQ_NUM).is_none() {
            msg.set_int(tags::MSG_SEQ_NUM, self.next_seq as i64);
        }
        if msg.get(tags::SENDER_COMP_ID).is_none() {
            msg.set(tags::SENDER_COMP_ID, self.sender_comp_id.as_str());
        }
        if msg.get(tags::TARGET_COMP_ID).is_none() {
            msg.set(tags::TARGET_COMP_ID, self.target_comp_id.as_str());
        }

        let frame = msg.serialize();
        self.sink.send_frame(&frame);
        self.next_seq += 1;
    }

    /// Emits a NEW_ORDER_SINGLE for `order`.
    pub fn submit_order(&mut self, order: &Order) {
        self.send_message(new_order_single(order));
    }

    /// Parses and dispatches one inbound frame.
    ///
    /// Malformed frames are dropped with a counter increment and change no
    /// session state. Unknown message types are reported but not fatal.
    pub fn process_message(&mut self, raw: &[u8]) -> Result<(), SessionError> {
        let msg = FixMessage::parse(raw);
        if !msg.is_valid() {
            self.invalid_frames += 1;
            log::warn!("[fix] dropping malformed frame ({} bytes)", raw.len());
            return Err(SessionError::InvalidFrame);
        }

        // msg_type presence is part of is_valid
        let mt = msg.msg_type().unwrap_or_default().to_owned();
        let mut built_in = true;
        match mt.as_str() {
            msg_type::LOGON => self.logged_on = true,
            msg_type::LOGOUT => self.logged_on = false,
            msg_type::TEST_REQUEST => {
                let test_req_id = msg.get(tags::TEST_REQ_ID).map(str::to_owned);
                self.heartbeat(test_req_id.as_deref());
            }
            msg_type::HEARTBEAT => {}
            _ => built_in = false,
        }

        if let Some(handler) = self.handlers.get_mut(mt.as_str()) {
            handler(&msg);
        } else if !built_in {
            self.unknown_types += 1;
            log::debug!("[fix] no handler for message type {mt:?}");
            return Err(SessionError::UnknownMsgType(mt));
        }
        Ok(())
    }
}
