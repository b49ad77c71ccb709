//! Proxy→signer identity resolution (§4.J).
//!
//! Addresses observed on-chain or via push events may be proxy contracts;
//! forensics must operate on the signer EOA, not the proxy. The indexer's
//! `resolve_signer` already folds a plain 404 into `Ok(None)` — what
//! reaches this module as `Err` is a genuine structured error.

use crate::config::ForensicsConfig;
use crate::error::Result;
use sentinel_clients::IndexerClient;
use sentinel_core::Address;
use tracing::{info, warn};

/// Resolve `observed` to its signer, honoring `skipTradesOnProxyError` on a
/// structured resolution failure.
///
/// - No mapping (404): proceed with `observed`, log at info (expected).
/// - Structured error + `skip_trades_on_proxy_error`: propagate the error
///   so the caller skips the trade.
/// - Structured error, otherwise: proceed with `observed`, log at warn.
pub async fn resolve_signer(
    indexer: &dyn IndexerClient,
    observed: Address,
    config: &ForensicsConfig,
) -> Result<Address> {
    match indexer.resolve_signer(&observed).await {
        Ok(Some(signer)) => Ok(signer),
        Ok(None) => {
            info!(address = %observed, "no proxy mapping for address, proceeding with observed address");
            Ok(observed)
        }
        Err(e) if config.skip_trades_on_proxy_error => {
            warn!(address = %observed, error = %e, "proxy resolution failed, skipping trade per configuration");
            Err(e.into())
        }
        Err(e) => {
            warn!(address = %observed, error = %e, "proxy resolution failed, proceeding with observed address");
            Ok(observed)
        }
    }
}
