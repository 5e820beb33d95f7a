//! FIX 4.4 frame serializer and parser.
//!
//! Frame layout: `8=FIX.4.4␁9=<body-len>␁<body>10=<checksum>␁`, where `␁`
//! is the single byte 0x01, the body starts with the message-type field and
//! continues with the remaining tags in ascending numeric order, body length
//! counts the bytes between the length field and the checksum field (both
//! exclusive), and the checksum is the byte sum of everything before the
//! checksum field, modulo 256, as exactly three zero-padded decimal digits.

use std::collections::BTreeMap;

/// FIX field delimiter (Start Of Header).
pub const SOH: u8 = 0x01;

/// Protocol identifier carried in tag 8.
pub const BEGIN_STRING: &str = "FIX.4.4";

/// Tag numbers used by the pipeline.
pub mod tags {
    pub const BEGIN_STRING: u32 = 8;
    pub const BODY_LENGTH: u32 = 9;
    pub const CHECK_SUM: u32 = 10;
    pub const CL_ORD_ID: u32 = 11;
    pub const EXEC_ID: u32 = 17;
    pub const LAST_PX: u32 = 31;
    pub const LAST_QTY: u32 = 32;
    pub const MSG_SEQ_NUM: u32 = 34;
    pub const MSG_TYPE: u32 = 35;
    pub const ORDER_QTY: u32 = 38;
    pub const ORD_TYPE: u32 = 40;
    pub const PRICE: u32 = 44;
    pub const SENDER_COMP_ID: u32 = 49;
    pub const SIDE: u32 = 54;
    pub const SYMBOL: u32 = 55;
    pub const TARGET_COMP_ID: u32 = 56;
    pub const TEST_REQ_ID: u32 = 112;
    pub const BID_PX: u32 = 132;
    pub const OFFER_PX: u32 = 133;
    pub const BID_SIZE: u32 = 134;
    pub const OFFER_SIZE: u32 = 135;
}

/// Message-type values carried in tag 35.
pub mod msg_type {
    pub const HEARTBEAT: &str = "0";
    pub const TEST_REQUEST: &str = "1";
    pub const LOGOUT: &str = "5";
    pub const EXECUTION_REPORT: &str = "8";
    pub const LOGON: &str = "A";
    pub const NEW_ORDER_SINGLE: &str = "D";
    pub const ORDER_CANCEL_REQUEST: &str = "F";
    pub const MARKET_DATA_REQUEST: &str = "V";
    pub const MARKET_DATA_SNAPSHOT: &str = "W";
    pub const MARKET_DATA_INCREMENTAL_REFRESH: &str = "X";
}

/// Ordered tag → value mapping with derived framing fields.
///
/// Tags 8 (protocol), 9 (body length) and 10 (checksum) are never caller-set;
/// `serialize` regenerates them on every call, so a message parsed from the
/// wire re-serializes byte-identically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixMessage {
    fields: BTreeMap<u32, String>,
}

impl FixMessage {
    /// Creates a message of the given type (tag 35).
    pub fn new(msg_type: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(tags::MSG_TYPE, msg_type.to_owned());
        Self { fields }
    }

    /// Sets a field. Writes to the derived tags 8/9/10 are ignored; they
    /// are regenerated at serialization time.
    pub fn set(&mut self, tag: u32, value: impl Into<String>) {
        if matches!(tag, tags::BEGIN_STRING | tags::BODY_LENGTH | tags::CHECK_SUM) {
            return;
        }
        self.fields.insert(tag, value.into());
    }

    /// Sets an integer field (decimal, no leading zeros).
    pub fn set_int(&mut self, tag: u32, value: i64) {
        self.set(tag, value.to_string());
    }

    /// Sets a price field as fixed-point with two fractional digits.
    pub fn set_float(&mut self, tag: u32, value: f64) {
        self.set(tag, format!("{value:.2}"));
    }

    /// Returns a field's raw value.
    pub fn get(&self, tag: u32) -> Option<&str> {
        self.fields.get(&tag).map(String::as_str)
    }

    /// Returns a field parsed as an integer.
    pub fn get_int(&self, tag: u32) -> Option<i64> {
        self.get(tag)?.parse().ok()
    }

    /// Returns a field parsed as a float.
    pub fn get_float(&self, tag: u32) -> Option<f64> {
        self.get(tag)?.parse().ok()
    }

    /// Returns the message type (tag 35).
    pub fn msg_type(&self) -> Option<&str> {
        self.get(tags::MSG_TYPE)
    }

    /// Returns the sequence number (tag 34).
    pub fn seq_num(&self) -> Option<u64> {
        self.get(tags::MSG_SEQ_NUM)?.parse().ok()
    }

    /// A frame is valid when it carries the protocol identifier, a message
    /// type, and a sequence number.
    pub fn is_valid(&self) -> bool {
        self.fields.contains_key(&tags::BEGIN_STRING)
            && self.fields.contains_key(&tags::MSG_TYPE)
            && self.fields.contains_key(&tags::MSG_SEQ_NUM)
    }

    /// Serializes to wire bytes with freshly derived tags 8, 9 and 10.
    pub fn serialize(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(64);
        if let Some(mt) = self.fields.get(&tags::MSG_TYPE) {
            push_field(&mut body, tags::MSG_TYPE, mt);
        }
        for (&tag, value) in &self.fields {
            if matches!(
                tag,
                tags::BEGIN_STRING | tags::BODY_LENGTH | tags::CHECK_SUM | tags::MSG_TYPE
            ) {
                continue;
            }
            push_field(&mut body, tag, value);
        }

        let mut frame = Vec::with_capacity(body.len() + 32);
        push_field(&mut frame, tags::BEGIN_STRING, BEGIN_STRING);
        push_field(&mut frame, tags::BODY_LENGTH, &body.len().to_string());
        frame.extend_from_slice(&body);

        let sum: u32 = frame.iter().map(|&b| u32::from(b)).sum();
        push_field(&mut frame, tags::CHECK_SUM, &format!("{:03}", sum % 256));
        frame
    }

    /// Parses wire bytes, scanning `tag=value` fields left to right.
    ///
    /// A malformed header (no `=`, non-numeric tag) or an unterminated value
    /// at end-of-input stops the scan; the message keeps whatever parsed
    /// before that point. Use [`is_valid`](Self::is_valid) to decide whether
    /// the result is usable.
    pub fn parse(data: &[u8]) -> FixMessage {
        let mut fields = BTreeMap::new();
        let mut at = 0usize;

        while at < data.len() {
            let Some(eq) = find_byte(&data[at..], b'=').map(|o| at + o) else {
                break;
            };
            let Some(tag) = std::str::from_utf8(&data[at..eq])
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
            else {
                break;
            };
            let Some(end) = find_byte(&data[eq + 1..], SOH).map(|o| eq + 1 + o) else {
                break; // unterminated value
            };
            let value = String::from_utf8_lossy(&data[eq + 1..end]).into_owned();
            fields.insert(tag, value);
            at = end + 1;
        }

        FixMessage { fields }
    }
}

/// Recomputes a serialized frame's checksum and compares it against the
/// trailing checksum field. False for frames without a well-formed trailer.
pub fn verify_checksum(frame: &[u8]) -> bool {
    // Trailer is exactly "10=DDD<SOH>": 7 bytes.
    if frame.len() < 7 || frame[frame.len() - 1] != SOH {
        return false;
    }
    let trailer_start = frame.len() - 7;
    if &frame[trailer_start..trailer_start + 3] != b"10=" {
        return false;
    }
    let Some(declared) = std::str::from_utf8(&frame[trailer_start + 3..frame.len() - 1])
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
    else {
        return false;
    };

    let sum: u32 = frame[..trailer_start].iter().map(|&b| u32::from(b)).sum();
    sum % 256 == declared
}

fn push_field(buf: &mut Vec<u8>, tag: u32, value: &str) {
    buf.extend_from_slice(tag.to_string().as_bytes());
    buf.push(b'=');
    buf.extend_from_slice(value.as_bytes());
    buf.push(SOH);
}

fn find_byte(haystack: &[u8], needle: u8) -> Option<usize> {
    haystack.iter().position(|&b| b == needle)
}
