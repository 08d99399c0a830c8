//! Ledger network integration.
//!
//! Provides the JSON-RPC client for the Soroban RPC gateway and the custodial
//! signer that authorizes verification transactions.

pub mod rpc;
pub mod signer;

pub use rpc::{HttpLedgerRpcProvider, LedgerRpcProvider, RpcClientConfig, RpcLedgerClient};
pub use signer::{CustodialSigner, signing_key_from_strkey};
