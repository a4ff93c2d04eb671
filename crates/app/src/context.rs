//! App Context

use std::{io, sync::Arc};

use mala::{
    cart::CartStore,
    clock::{Clock, SystemClock},
    discounts::DiscountSchedule,
    history::OrderHistory,
    rate_limit::{RateLimitPolicy, RateLimiter},
    session::{SessionError, SessionId, Sessions},
    storage::Storage,
};
use rusty_money::iso::Currency;
use thiserror::Error;
use tracing::debug;

use crate::{
    checkout::CheckoutService,
    config::{AppConfig, ConfigError},
    storage::JsonFileStorage,
    stores::{BlobStore, RecordStore, StoreError, SupabaseClient},
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to open data directory")]
    DataDir(#[source] io::Error),

    #[error("failed to load device session")]
    Session(#[from] SessionError),

    #[error("failed to configure backend client")]
    Store(#[from] StoreError),

    #[error("SUPABASE_URL and SUPABASE_ANON_KEY must be set for this command")]
    MissingStore,
}

/// Device state and backend clients for one invocation.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub storage: Arc<dyn Storage>,
    pub clock: Arc<dyn Clock>,
    pub session: SessionId,
    pub currency: &'static Currency,
    pub cart: CartStore,
    pub history: OrderHistory,
    pub schedule: DiscountSchedule<'static>,
    supabase: Option<Arc<SupabaseClient>>,
    rate_limit: RateLimitPolicy,
    evidence_bucket: String,
}

impl AppContext {
    /// Build application context from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the data directory, currency, session or backend
    /// client cannot be set up.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppInitError> {
        let currency = config.device.currency()?;
        let rate_limit = config.rate_limit.policy()?;

        let storage: Arc<dyn Storage> = Arc::new(
            JsonFileStorage::open(&config.device.data_dir).map_err(AppInitError::DataDir)?,
        );
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let session = Sessions::new(Arc::clone(&storage), Arc::clone(&clock)).get_or_create()?;

        let supabase = config
            .store
            .supabase()
            .map(|supabase| SupabaseClient::new(supabase, currency.exponent))
            .transpose()?
            .map(Arc::new);

        debug!(%session, data_dir = %config.device.data_dir.display(), "loaded device context");

        Ok(Self {
            cart: CartStore::new(Arc::clone(&storage)),
            history: OrderHistory::new(Arc::clone(&storage), session.clone()),
            schedule: DiscountSchedule::standard(currency),
            storage,
            clock,
            session,
            currency,
            supabase,
            rate_limit,
            evidence_bucket: config.store.evidence_bucket.clone(),
        })
    }

    /// The hosted record store.
    ///
    /// # Errors
    ///
    /// Returns [`AppInitError::MissingStore`] when no backend is configured.
    pub fn records(&self) -> Result<Arc<dyn RecordStore>, AppInitError> {
        let client: Arc<dyn RecordStore> =
            self.supabase.clone().ok_or(AppInitError::MissingStore)?;

        Ok(client)
    }

    /// Rate limiter for this device's session.
    #[must_use]
    pub fn limiter(&self) -> RateLimiter {
        RateLimiter::new(
            Arc::clone(&self.storage),
            Arc::clone(&self.clock),
            self.session.clone(),
            self.rate_limit.clone(),
        )
    }

    /// Submission workflow wired to the hosted backend.
    ///
    /// # Errors
    ///
    /// Returns [`AppInitError::MissingStore`] when no backend is configured.
    pub fn checkout(&self) -> Result<CheckoutService, AppInitError> {
        let client = self.supabase.clone().ok_or(AppInitError::MissingStore)?;
        let blobs: Arc<dyn BlobStore> = client.clone();

        Ok(CheckoutService::new(
            client,
            blobs,
            self.cart.clone(),
            self.history.clone(),
            self.limiter(),
            self.schedule.clone(),
            Arc::clone(&self.clock),
        )
        .with_evidence_bucket(self.evidence_bucket.clone()))
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use testresult::TestResult;

    use super::*;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        config: AppConfig,
    }

    fn config(dir: &std::path::Path, extra: &[&str]) -> Result<AppConfig, clap::Error> {
        let dir = dir.to_string_lossy().into_owned();
        let mut args = vec!["mala", "--data-dir", dir.as_str()];
        args.extend_from_slice(extra);

        Ok(Harness::try_parse_from(args)?.config)
    }

    #[test]
    fn session_is_stable_across_contexts() -> TestResult {
        let dir = tempfile::tempdir()?;
        let config = config(dir.path(), &[])?;

        let first = AppContext::from_config(&config)?;
        let second = AppContext::from_config(&config)?;

        assert_eq!(first.session, second.session);

        Ok(())
    }

    #[test]
    fn backend_commands_need_credentials() -> TestResult {
        let dir = tempfile::tempdir()?;
        let mut config = config(dir.path(), &[])?;
        config.store.supabase_url = None;

        let context = AppContext::from_config(&config)?;

        assert!(matches!(context.records(), Err(AppInitError::MissingStore)));
        assert!(matches!(context.checkout(), Err(AppInitError::MissingStore)));

        Ok(())
    }

    #[test]
    fn configured_backend_builds_checkout() -> TestResult {
        let dir = tempfile::tempdir()?;
        let config = config(
            dir.path(),
            &[
                "--supabase-url",
                "https://x.supabase.co",
                "--supabase-anon-key",
                "anon",
                "--evidence-bucket",
                "slips",
            ],
        )?;

        let context = AppContext::from_config(&config)?;

        assert!(context.records().is_ok());
        assert!(context.checkout().is_ok());

        Ok(())
    }
}
