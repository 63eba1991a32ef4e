//! REST API module
//!
//! Provides HTTP REST API for programmatic access to the vault.
//!
//! # Endpoints
//!
//! ## Wallet
//! - `GET /api/wallet` - Address, owners, quorum and balance
//! - `GET /api/owners/{address}` - Owner membership
//! - `POST /api/deposit` - Credit value to the wallet
//!
//! ## Transactions
//! - `GET /api/transactions` - List transactions
//! - `POST /api/transactions` - Submit (signed)
//! - `GET /api/transactions/{id}` - Get transaction
//! - `POST /api/transactions/{id}/approve` - Approve (signed)
//! - `POST /api/transactions/{id}/revoke` - Revoke (signed)
//! - `POST /api/transactions/{id}/execute` - Execute once quorum is reached
//! - `GET /api/transactions/{id}/approvals/{owner}` - Approval by one owner
//!
//! ## Events
//! - `GET /api/events?since=N` - Event log
//! - `GET /api/ledger` - Value received by forwarded-call targets
//! - `GET /ws` - Real-time event feed

pub mod handlers;
pub mod routes;
pub mod websocket;

pub use handlers::ApiState;
pub use routes::{create_router, serve};
pub use websocket::{WsBroadcaster, WsEvent};
