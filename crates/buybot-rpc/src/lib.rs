//! EVM chain RPC client.
//!
//! Provides one connection handle per chain with:
//! - Streaming (WebSocket pubsub) or polling (HTTP) log delivery, chosen by URL scheme
//! - Pool asset resolution (`token0()` / `token1()`)
//! - Historical ERC-20 balance reads
//! - Loss signalling so the owner can discard and rebuild a dead handle

pub mod client;
pub mod connector;
pub mod contracts;
pub mod error;
pub mod state;

pub use client::{AlloyChainClient, ChainClient, SwapStream};
pub use connector::{AlloyConnector, ChainConnector, EndpointConfig};
pub use contracts::{decode_swap, swap_filter, IUniswapV2Pair, IERC20};
pub use error::{RpcError, RpcResult};
pub use state::{ConnectionState, Transport};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any `wss://` or `https://` connection is made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
