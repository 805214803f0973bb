//! WebSocket Push Server
//!
//! Serves dashboard clients on a single port:
//!
//! - `GET /ws` - WebSocket upgrade; every snapshot is one JSON text frame
//! - `GET /api/stock-data?symbol=X&interval=1d` - Four years of OHLC candles
//!
//! Only plain WebSocket clients are served. The socket.io handshake
//! (`/socket.io/?EIO=4&transport=polling`) has no route.
//!
//! # Frame Format
//!
//! ```json
//! {"event":"dashboardUpdate","data":{...},"capturedAt":"2026-01-01T09:15:00Z"}
//! ```
//!
//! Clients never need to send anything. Inbound text frames are ignored and
//! a close frame ends the subscription.

mod server;

pub use server::{
    MISSING_SYMBOL, NO_STOCK_DATA, PushServer, PushServerError, PushServerState, router, serve,
};
