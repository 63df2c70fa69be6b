//! Lyra Root Library
//!
//! Wires the gateway integration together for the `lyra` binary:
//! configuration, the transaction store, the checkout flow and the HTTP
//! endpoints the gateway and the buyer's browser talk to.
//!
//! # Architecture
//!
//! The binary is a thin orchestrator. [`initialize`] validates the
//! configuration, opens the store and builds an [`AppState`]; the axum
//! router in [`http`] shares that state across requests. Everything mutable
//! lives in the store; the provider configuration is read-only after
//! startup.

pub mod config;
pub mod error;
pub mod http;

pub use config::{RootConfig, ServerConfig, StoreConfig};
pub use error::{RootError, RootResult};

use lyra_checkout::{
    sign_payment_request, CheckoutOrder, PaymentForm, RequestBuilder, TransIdGenerator,
};
use lyra_core::{
    sign, CoreError, CurrencyTable, FieldSet, ProviderConfig, Transaction, TransactionState,
    TransactionStore,
};
use lyra_notify::NotificationService;
use lyra_store::InMemoryStore;
use std::sync::Arc;
use tracing::info;

/// Compare-and-swap attempts when re-arming a transaction at checkout.
const MAX_RESTART_ATTEMPTS: usize = 3;

/// Shared state for the HTTP handlers and CLI commands.
pub struct AppState {
    pub config: RootConfig,
    pub provider: Arc<ProviderConfig>,
    pub currencies: CurrencyTable,
    pub store: Arc<dyn TransactionStore>,
    pub notifications: NotificationService,
    pub trans_ids: TransIdGenerator,
}

/// Validate the configuration and open the configured store.
pub fn initialize(config: RootConfig) -> RootResult<AppState> {
    config.validate()?;
    let store = open_store(&config.store)?;
    Ok(initialize_with_store(config, store))
}

/// Build the application state around an existing store.
pub fn initialize_with_store(config: RootConfig, store: Arc<dyn TransactionStore>) -> AppState {
    info!(
        mode = %config.gateway.mode,
        site_id = %config.gateway.site_id,
        algorithm = %config.gateway.sign_algorithm,
        "initializing lyra"
    );

    let provider = Arc::new(config.gateway.clone());
    let notifications = NotificationService::new(provider.clone(), store.clone());
    AppState {
        currencies: provider.currency_table(),
        provider,
        store,
        notifications,
        trans_ids: TransIdGenerator::new(),
        config,
    }
}

/// Open the transaction store named by the configuration.
pub fn open_store(config: &StoreConfig) -> RootResult<Arc<dyn TransactionStore>> {
    match config {
        StoreConfig::Memory => {
            info!("using in-memory transaction store");
            Ok(Arc::new(InMemoryStore::new()))
        }
        StoreConfig::Sqlite { path } => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            info!(path = %path.display(), "using sqlite transaction store");
            let store = lyra_store::SqliteStore::open(&path.to_string_lossy())?;
            Ok(Arc::new(store))
        }
    }
}

/// Start a payment session: build the request, record the draft
/// transaction, and sign the form.
pub fn start_checkout(state: &AppState, order: &CheckoutOrder) -> RootResult<PaymentForm> {
    let provider = state.provider.as_ref();
    let request = RequestBuilder::new(provider, &state.currencies, &state.trans_ids)
        .with_return_url(state.config.server.return_url())
        .build(order, provider.mode)?;

    let draft = Transaction::draft(
        request.order_id.clone(),
        order.reference.clone(),
        provider.provider_code.clone(),
        request.amount_minor,
        request.currency.numeric,
    );
    match state.store.create(&draft) {
        Ok(()) => {}
        Err(CoreError::DuplicateReference(_)) => restart_attempt(state.store.as_ref(), &draft)?,
        Err(e) => return Err(e.into()),
    }

    let form = sign_payment_request(request, provider)?;
    info!(
        reference = %order.reference,
        amount = %order.amount,
        currency = %order.currency,
        "payment form signed"
    );
    Ok(form)
}

/// Re-arm an existing transaction for a new payment attempt on the same
/// order. The record goes back to `Draft` with the new amount so that the
/// notification for the new attempt can still be applied.
fn restart_attempt(store: &dyn TransactionStore, draft: &Transaction) -> RootResult<()> {
    let reference = &draft.reference;
    for _ in 0..MAX_RESTART_ATTEMPTS {
        let existing = store
            .find(reference)?
            .ok_or_else(|| RootError::Internal(format!("transaction {reference} vanished")))?;

        if existing.host_reference != draft.host_reference {
            return Err(RootError::ReferenceCollision {
                reference: reference.clone(),
                owner: existing.host_reference,
            });
        }
        if existing.state == TransactionState::Done {
            return Err(RootError::AlreadyPaid(reference.clone()));
        }
        if existing.state == TransactionState::Draft
            && existing.amount_minor == draft.amount_minor
            && existing.currency_numeric == draft.currency_numeric
        {
            info!(reference = %reference, "new payment attempt for existing draft");
            return Ok(());
        }

        if store.compare_and_swap(reference, existing.version, draft)? {
            info!(
                reference = %reference,
                from = %existing.state,
                amount_minor = draft.amount_minor,
                "transaction re-armed for a new payment attempt"
            );
            return Ok(());
        }
    }

    Err(CoreError::Storage(format!(
        "transaction {reference} still contended after {MAX_RESTART_ATTEMPTS} attempts"
    ))
    .into())
}

/// Signature of an arbitrary field set with the configured key and algorithm.
pub fn sign_fields(provider: &ProviderConfig, fields: &FieldSet) -> RootResult<String> {
    let key = &provider.credentials().legacy_key;
    if key.is_empty() {
        return Err(RootError::Config(format!(
            "no legacy key configured for {} mode",
            provider.mode
        )));
    }
    Ok(sign(fields, provider.sign_algorithm, key.expose())?)
}
