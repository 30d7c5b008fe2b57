use std::sync::Arc;

use tracing::info;

use crate::database::{PromptStore, StoreError};

/// Per-client redeem activation, persisted in the store.
pub struct RedeemGate {
    code: String,
    store: Arc<dyn PromptStore>,
}

impl RedeemGate {
    pub fn new(code: impl Into<String>, store: Arc<dyn PromptStore>) -> Self {
        Self {
            code: code.into(),
            store,
        }
    }

    pub fn accepts(&self, code: &str) -> bool {
        code.trim() == self.code
    }

    pub async fn is_activated(&self, client_id: &str) -> Result<bool, StoreError> {
        self.store.is_redeemed(client_id).await
    }

    /// `Ok(false)` for a wrong code, the client stays locked.
    pub async fn activate(&self, client_id: &str, code: &str) -> Result<bool, StoreError> {
        if !self.accepts(code) {
            return Ok(false);
        }

        self.store.set_redeemed(client_id).await?;
        info!("Redeem code activated for {client_id}");

        Ok(true)
    }
}
