//! Builders from pipeline records to FIX messages.

use mktsim::{Order, OrderType, Side, Tick, Trade};

use crate::message::{msg_type, tags, FixMessage};

/// Maps a tick to a MARKET_DATA_SNAPSHOT (`W`) frame: symbol, bid/offer
/// price, bid/offer size.
pub fn market_data_snapshot(tick: &Tick) -> FixMessage {
    let mut msg = FixMessage::new(msg_type::MARKET_DATA_SNAPSHOT);
    msg.set(tags::SYMBOL, tick.symbol.as_str());
    msg.set_float(tags::BID_PX, tick.bid);
    msg.set_float(tags::OFFER_PX, tick.ask);
    msg.set_int(tags::BID_SIZE, i64::from(tick.bid_size));
    msg.set_int(tags::OFFER_SIZE, i64::from(tick.ask_size));
    msg
}

/// Maps a trade to an EXECUTION_REPORT (`8`) frame: symbol, last quantity,
/// last price, and an execution id derived from the trade timestamp.
pub fn execution_report(trade: &Trade) -> FixMessage {
    let mut msg = FixMessage::new(msg_type::EXECUTION_REPORT);
    msg.set(tags::SYMBOL, trade.symbol.as_str());
    msg.set_int(tags::LAST_QTY, i64::from(trade.quantity));
    msg.set_float(tags::LAST_PX, trade.price);
    msg.set(tags::EXEC_ID, trade.timestamp_ns.to_string());
    msg
}

/// Maps an order to a NEW_ORDER_SINGLE (`D`) frame: order id, symbol, side
/// (`1` buy / `2` sell), order type, integer quantity, two-decimal price.
pub fn new_order_single(order: &Order) -> FixMessage {
    let mut msg = FixMessage::new(msg_type::NEW_ORDER_SINGLE);
    msg.set_int(tags::CL_ORD_ID, order.id as i64);
    msg.set(tags::SYMBOL, order.symbol.as_str());
    msg.set(
        tags::SIDE,
        match order.side {
            Side::Buy => "1",
            Side::Sell => "2",
        },
    );
    msg.set(
        tags::ORD_TYPE,
        match order.order_type {
            OrderType::Market => "1",
            OrderType::Limit => "2",
            OrderType::Stop => "3",
        },
    );
    msg.set_int(tags::ORDER_QTY, order.quantity);
    msg.set_float(tags::PRICE, order.price);
    msg
}
