use std::sync::Arc;

use config::Config;
use middleware::RateLimiter;
use storage::PutUrlSigner;

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod storage;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub rate_limiter: Arc<RateLimiter>,
    pub signer: Arc<dyn PutUrlSigner>,
}
