//! Storefront context shared by every surface.
//!
//! Owns the configuration, the backend client, every store and the signed-in
//! session. [`Storefront::boot`] restores persisted state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::{info, warn};

use crate::api::{CommerceApi, HttpApi};
use crate::cart::CartStore;
use crate::catalog::{CatalogClient, CatalogStore};
use crate::config::ClientConfig;
use crate::error::{Error, Result, clear_sentry_user, set_sentry_user};
use crate::filters::FilterSelection;
use crate::orders::OrderStore;
use crate::payments::PaymentStore;
use crate::persist::{FileStorage, PersistError, PersistedLogin, PersistedState, StateStorage};
use crate::session::Session;

/// Storefront context.
pub struct Storefront<A> {
    config: ClientConfig,
    api: Arc<A>,
    catalog: CatalogStore<A>,
    filters: Mutex<FilterSelection>,
    cart: CartStore<A>,
    orders: OrderStore<A>,
    payments: PaymentStore<A>,
    session: RwLock<Option<Session>>,
    storage: Box<dyn StateStorage>,
}

impl Storefront<HttpApi> {
    /// Boot against the configured backend with file-backed persistence.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the state file
    /// cannot be read.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let api = Arc::new(HttpApi::new(&config)?);
        let storage = Box::new(FileStorage::new(config.state_path.clone()));
        Self::boot(config, api, storage)
    }
}

impl<A: CommerceApi> Storefront<A> {
    /// Restore persisted state and build the stores.
    ///
    /// A login whose token has expired is dropped together with the cart it
    /// belonged to. Unreadable JSON is discarded with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read or rewritten.
    pub fn boot(
        config: ClientConfig,
        api: Arc<A>,
        storage: Box<dyn StateStorage>,
    ) -> Result<Self> {
        let persisted = match storage.load() {
            Ok(state) => state,
            Err(PersistError::Format(err)) => {
                warn!(error = %err, "Discarding unreadable persisted state");
                None
            }
            Err(err) => return Err(err.into()),
        };

        let mut stale = false;
        let (session, lines) = match persisted {
            Some(PersistedState { login: Some(login), cart, .. }) => {
                let session = Session::from(login);
                if session.is_fresh() {
                    (Some(session), cart)
                } else {
                    info!(user_id = %session.user_id(), "Persisted login expired");
                    stale = true;
                    (None, Vec::new())
                }
            }
            Some(PersistedState { login: None, cart, .. }) => (None, cart),
            None => (None, Vec::new()),
        };

        let client = CatalogClient::new(Arc::clone(&api), config.cache_ttl);
        let storefront = Self {
            catalog: CatalogStore::new(client.clone(), config.error_dismiss_after),
            filters: Mutex::new(FilterSelection::new()),
            cart: CartStore::new(Arc::clone(&api), client),
            orders: OrderStore::new(Arc::clone(&api)),
            payments: PaymentStore::new(Arc::clone(&api)),
            session: RwLock::new(session),
            storage,
            api,
            config,
        };
        storefront.cart.restore_lines(lines);

        if let Some(session) = storefront.session() {
            set_sentry_user(session.user_id(), Some(&session.user.username));
        }
        if stale {
            storefront.persist()?;
        }

        Ok(storefront)
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    #[must_use]
    pub const fn catalog(&self) -> &CatalogStore<A> {
        &self.catalog
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore<A> {
        &self.cart
    }

    #[must_use]
    pub const fn orders(&self) -> &OrderStore<A> {
        &self.orders
    }

    #[must_use]
    pub const fn payments(&self) -> &PaymentStore<A> {
        &self.payments
    }

    /// Lock the filter selection.
    pub fn filters(&self) -> MutexGuard<'_, FilterSelection> {
        self.filters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The signed-in session, if it has not expired.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|session| session.is_fresh())
            .cloned()
    }

    /// The signed-in session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthenticated`] when nobody is signed in.
    pub fn require_session(&self) -> Result<Session> {
        self.session().ok_or(Error::Unauthenticated)
    }

    /// Replace the session and persist it.
    ///
    /// Signing in as a different user drops the previous user's cart, orders
    /// and payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be persisted.
    pub fn sign_in(&self, session: Session) -> Result<()> {
        let previous = self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(session.clone());

        if previous.is_some_and(|prev| prev.user_id() != session.user_id()) {
            self.reset_user_state();
        }

        set_sentry_user(session.user_id(), Some(&session.user.username));
        info!(user_id = %session.user_id(), "Signed in");
        self.persist()
    }

    /// Forget the session and every user-scoped store, then persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be persisted.
    pub fn sign_out(&self) -> Result<()> {
        let previous = self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.reset_user_state();
        clear_sentry_user();
        if let Some(session) = previous {
            info!(user_id = %session.user_id(), "Signed out");
        }
        self.persist()
    }

    fn reset_user_state(&self) {
        self.cart.reset();
        self.orders.reset();
        self.payments.reset();
    }

    /// Write the login and cart lines to storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be written.
    pub fn persist(&self) -> Result<()> {
        let login = self
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(PersistedLogin::from);
        let state = PersistedState {
            login,
            cart: self.cart.snapshot().lines,
            ..PersistedState::default()
        };
        self.storage.save(&state).map_err(Error::from)
    }
}
