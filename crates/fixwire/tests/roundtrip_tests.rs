use fixwire::{
    msg_type, new_order_single, tags, verify_checksum, FixMessage, FixSession, MemorySink,
    BEGIN_STRING,
};
use mktsim::{Order, OrderType, Side, Symbol};

#[test]
fn test_new_order_single_roundtrip_byte_identical() {
    let mut msg = FixMessage::new(msg_type::NEW_ORDER_SINGLE);
    msg.set(tags::SENDER_COMP_ID, "CLIENT1");
    msg.set(tags::TARGET_COMP_ID, "EXCHANGE1");
    msg.set_int(tags::MSG_SEQ_NUM, 1);
    msg.set(tags::SYMBOL, "AAPL");
    msg.set(tags::SIDE, "1");
    msg.set(tags::ORDER_QTY, "100");
    msg.set(tags::PRICE, "150.50");

    let wire = msg.serialize();
    let parsed = FixMessage::parse(&wire);

    assert_eq!(parsed.get(tags::BEGIN_STRING), Some(BEGIN_STRING));
    assert!(parsed.is_valid());
    assert!(verify_checksum(&wire));

    // Declared body length equals the serialized body byte count.
    let body_len = parsed.get_int(tags::BODY_LENGTH).expect("body length");
    let header_len = "8=FIX.4.4\x01".len() + format!("9={body_len}\x01").len();
    assert_eq!(body_len as usize, wire.len() - header_len - 7);

    // Parsing the serialization and re-serializing is byte-identical.
    assert_eq!(parsed.serialize(), wire);
}

#[test]
fn test_roundtrip_across_all_message_types() {
    let types = [
        msg_type::LOGON,
        msg_type::LOGOUT,
        msg_type::HEARTBEAT,
        msg_type::TEST_REQUEST,
        msg_type::NEW_ORDER_SINGLE,
        msg_type::ORDER_CANCEL_REQUEST,
        msg_type::EXECUTION_REPORT,
        msg_type::MARKET_DATA_REQUEST,
        msg_type::MARKET_DATA_SNAPSHOT,
        msg_type::MARKET_DATA_INCREMENTAL_REFRESH,
    ];

    for (i, mt) in types.into_iter().enumerate() {
        let mut msg = FixMessage::new(mt);
        msg.set_int(tags::MSG_SEQ_NUM, i as i64 + 1);
        msg.set(tags::SENDER_COMP_ID, "SIM");
        msg.set(tags::TARGET_COMP_ID, "PEER");

        let wire = msg.serialize();
        assert!(verify_checksum(&wire), "checksum failed for type {mt}");
        let parsed = FixMessage::parse(&wire);
        assert_eq!(parsed.msg_type(), Some(mt));
        assert_eq!(parsed.serialize(), wire, "round-trip drifted for {mt}");
    }
}

#[test]
fn test_order_submission_through_session_validates_on_the_wire() {
    let mut session = FixSession::new("CLIENT1", "EXCHANGE1", MemorySink::default());
    session.logon();

    let order = Order::new(
        1001,
        Symbol::new("AAPL"),
        Side::Buy,
        OrderType::Limit,
        150.50,
        100,
        "CLIENT1",
    );
    session.submit_order(&order);

    let frames = &session.sink().frames;
    assert_eq!(frames.len(), 2); // LOGON then NEW_ORDER_SINGLE

    let nos = FixMessage::parse(&frames[1]);
    assert!(nos.is_valid());
    assert!(verify_checksum(&frames[1]));
    assert_eq!(nos.msg_type(), Some(msg_type::NEW_ORDER_SINGLE));
    assert_eq!(nos.seq_num(), Some(2));
    assert_eq!(nos.get(tags::SENDER_COMP_ID), Some("CLIENT1"));
    assert_eq!(nos.get(tags::TARGET_COMP_ID), Some("EXCHANGE1"));
    assert_eq!(nos.get_int(tags::ORDER_QTY), Some(100));
    assert_eq!(nos.get(tags::PRICE), Some("150.50"));
}

#[test]
fn test_peer_sessions_converse() {
    // Client emits frames into memory; feeding them to a server session
    // drives its state machine and dispatch table.
    let mut client = FixSession::new("CLIENT1", "EXCHANGE1", MemorySink::default());
    client.logon();
    let order = Order::new(
        5,
        Symbol::new("MSFT"),
        Side::Sell,
        OrderType::Market,
        0.0,
        25,
        "CLIENT1",
    );
    client.submit_order(&order);
    client.logout();

    let mut server = FixSession::new("EXCHANGE1", "CLIENT1", MemorySink::default());
    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let capture = std::sync::Arc::clone(&seen);
    server.register_handler(
        msg_type::NEW_ORDER_SINGLE,
        Box::new(move |msg| {
            if let Ok(mut orders) = capture.lock() {
                orders.push((
                    msg.get_int(tags::CL_ORD_ID),
                    msg.get(tags::SIDE).map(str::to_owned),
                ));
            }
        }),
    );

    let frames = client.sink().frames.clone();
    for frame in &frames {
        let _ = server.process_message(frame);
    }

    assert!(!server.is_logged_on(), "logout must close the session");
    let orders_seen = seen.lock().expect("capture lock").clone();
    assert_eq!(orders_seen, vec![(Some(5), Some("2".to_owned()))]);
    assert_eq!(server.invalid_frames(), 0);
}

#[test]
fn test_tick_snapshot_frame_from_conversion() {
    use fixwire::market_data_snapshot;
    use mktsim::Tick;

    let tick = Tick {
        symbol: Symbol::new("GOOGL"),
        bid: 2799.95,
        ask: 2800.05,
        bid_size: 300,
        ask_size: 450,
        last_price: 2800.00,
        last_size: 20,
        timestamp_ns: 77,
    };

    let mut session = FixSession::new("SIM", "STRAT", MemorySink::default());
    session.send_message(market_data_snapshot(&tick));

    let frame = &session.sink().frames[0];
    assert!(verify_checksum(frame));
    let parsed = FixMessage::parse(frame);
    assert_eq!(parsed.msg_type(), Some(msg_type::MARKET_DATA_SNAPSHOT));
    assert_eq!(parsed.get(tags::SYMBOL), Some("GOOGL"));
    assert_eq!(parsed.get(tags::BID_PX), Some("2799.95"));
    assert_eq!(parsed.get(tags::OFFER_PX), Some("2800.05"));
}

#[test]
fn test_stop_order_type_mapping() {
    let order = Order::new(
        9,
        Symbol::new("TSLA"),
        Side::Buy,
        OrderType::Stop,
        180.25,
        50,
        "C2",
    );
    let msg = new_order_single(&order);
    assert_eq!(msg.get(tags::ORD_TYPE), Some("3"));
}
