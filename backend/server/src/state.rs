use std::sync::Arc;

use anyhow::Error;
use deck::{SheetSource, SheetsClient};
use tracing::{info, warn};

use super::{
    config::Config,
    database::{MemoryStore, PromptStore, RedisStore, init_redis},
    events::EventHub,
    redeem::RedeemGate,
};

pub struct AppState {
    pub config: Config,
    pub sheets: Option<Arc<dyn SheetSource>>,
    pub store: Arc<dyn PromptStore>,
    pub redeem: RedeemGate,
    pub events: EventHub,
}

impl AppState {
    /// Builds every backend client once. Bad credentials stop startup here.
    pub async fn new(config: Config) -> Result<Arc<Self>, Error> {
        let sheets: Option<Arc<dyn SheetSource>> = match &config.service_account_json {
            Some(json) => Some(Arc::new(SheetsClient::from_service_account_json(json)?)),
            None => {
                warn!("GOOGLE_SERVICE_ACCOUNT_JSON not set, sheet routes will report a configuration error");
                None
            }
        };

        let store: Arc<dyn PromptStore> = match &config.redis_url {
            Some(url) => {
                info!("Connecting to Redis...");
                Arc::new(RedisStore::new(init_redis(url).await?))
            }
            None => {
                warn!("REDIS_URL not set, clicks and comments are kept in memory");
                Arc::new(MemoryStore::default())
            }
        };

        Ok(Self::from_parts(config, sheets, store))
    }

    pub fn from_parts(
        config: Config,
        sheets: Option<Arc<dyn SheetSource>>,
        store: Arc<dyn PromptStore>,
    ) -> Arc<Self> {
        let redeem = RedeemGate::new(config.redeem_code.clone(), store.clone());

        Arc::new(Self {
            config,
            sheets,
            store,
            redeem,
            events: EventHub::default(),
        })
    }
}
