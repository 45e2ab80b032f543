//! Token Coordinator
//!
//! Owns the current access token, decides per request whether it can be used
//! as is, must be refreshed, or is unusable, and coalesces concurrent refresh
//! attempts into a single refresh grant.

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::core::AuthorizableRequest;
use crate::error::{AuthorizationError, OAuth2Result};
use crate::flows::GrantClient;
use crate::telemetry::{NoOpMetrics, OAuth2Metrics};
use crate::token::AccessTokenStorage;
use crate::types::{AccessToken, CoordinatorConfig, GrantType};

type PendingRefresh = Shared<BoxFuture<'static, OAuth2Result<AccessToken>>>;

enum TokenDecision {
    Ready(AccessToken),
    Refresh(PendingRefresh),
}

#[derive(Default)]
struct TokenState {
    current: Option<AccessToken>,
    refresh: Option<PendingRefresh>,
    /// Bumped by `authorize` and `deauthorize`; a refresh started under an
    /// older epoch never commits.
    epoch: u64,
}

struct CoordinatorInner<G, S: ?Sized> {
    config: CoordinatorConfig,
    grant_client: Arc<G>,
    storage: Arc<S>,
    metrics: Arc<dyn OAuth2Metrics>,
    state: Mutex<TokenState>,
    /// Held across each storage write. Taken before the state lock is
    /// released, so storage sees commits in state order.
    storage_writes: Mutex<()>,
}

/// Token lifecycle coordinator.
///
/// Cloning yields another handle to the same token state.
pub struct TokenCoordinator<G, S: ?Sized> {
    inner: Arc<CoordinatorInner<G, S>>,
}

impl<G, S: ?Sized> Clone for TokenCoordinator<G, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G, S> TokenCoordinator<G, S>
where
    G: GrantClient + 'static,
    S: AccessTokenStorage + ?Sized + 'static,
{
    /// Create a coordinator, loading the current token from `storage`.
    pub fn new(grant_client: G, storage: Arc<S>) -> Self {
        Self::with_components(
            CoordinatorConfig::default(),
            grant_client,
            storage,
            Arc::new(NoOpMetrics),
        )
    }

    /// Create a coordinator with explicit settings and metrics sink.
    pub fn with_components(
        config: CoordinatorConfig,
        grant_client: G,
        storage: Arc<S>,
        metrics: Arc<dyn OAuth2Metrics>,
    ) -> Self {
        let current = storage.retrieve_access_token();
        debug!(has_token = current.is_some(), "Loaded access token from storage");

        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                grant_client: Arc::new(grant_client),
                storage,
                metrics,
                state: Mutex::new(TokenState {
                    current,
                    ..Default::default()
                }),
                storage_writes: Mutex::new(()),
            }),
        }
    }

    /// Whether a token is held. Expiry is not considered.
    pub fn has_access_token(&self) -> bool {
        self.inner.state.lock().current.is_some()
    }

    /// The token currently held, if any.
    pub fn access_token(&self) -> Option<AccessToken> {
        self.inner.state.lock().current.clone()
    }

    /// Obtain a token with the password grant and make it current.
    ///
    /// On failure neither the held token nor storage change. Concurrent calls
    /// are not coalesced; the last one to finish wins.
    #[instrument(skip(self, password))]
    pub async fn authorize(&self, username: &str, password: &str) -> OAuth2Result<()> {
        let result = self
            .inner
            .grant_client
            .request_password_grant(username, password)
            .await;
        self.inner
            .metrics
            .record_token_request(GrantType::Password.as_str(), result.is_ok());

        let token = result.map_err(|e| {
            self.inner.metrics.record_error(e.error_code());
            e
        })?;

        self.commit_authorized(token);
        debug!("Authorized with password grant");

        Ok(())
    }

    fn commit_authorized(&self, token: AccessToken) {
        let mut state = self.inner.state.lock();
        state.epoch += 1;
        state.refresh = None;
        state.current = Some(token.clone());
        self.inner.store_after_commit(state, Some(&token));
    }

    /// Drop the held token and clear storage.
    pub fn deauthorize(&self) {
        let mut state = self.inner.state.lock();
        state.epoch += 1;
        state.refresh = None;
        state.current = None;
        self.inner.store_after_commit(state, None);
        debug!("Deauthorized");
    }

    /// Set the `Authorization` header on `request`, refreshing the token
    /// first when it has expired.
    ///
    /// Fails closed: on error no header is set and the request is not returned.
    pub async fn authorize_request<R: AuthorizableRequest>(&self, mut request: R) -> OAuth2Result<R> {
        let token = self.usable_token().await?;
        request.set_authorization(&token.authorization_header_value())?;
        Ok(request)
    }

    /// A token that is valid now, refreshing if required.
    pub async fn usable_token(&self) -> OAuth2Result<AccessToken> {
        match self.decide()? {
            TokenDecision::Ready(token) => Ok(token),
            TokenDecision::Refresh(pending) => pending.await,
        }
    }

    fn decide(&self) -> OAuth2Result<TokenDecision> {
        let mut state = self.inner.state.lock();

        let current = state
            .current
            .as_ref()
            .ok_or(AuthorizationError::NoAccessToken)?;

        if !self.is_expired(current) {
            return Ok(TokenDecision::Ready(current.clone()));
        }

        let refresh_token = current
            .refresh_token()
            .ok_or(AuthorizationError::AccessTokenExpired)?
            .to_string();

        let pending = match state.refresh.clone() {
            Some(pending) => {
                debug!("Joining in-flight token refresh");
                self.inner.metrics.record_refresh_coalesced();
                pending
            }
            None => {
                let pending = self.start_refresh(refresh_token, state.epoch);
                state.refresh = Some(pending.clone());
                pending
            }
        };

        Ok(TokenDecision::Refresh(pending))
    }

    fn is_expired(&self, token: &AccessToken) -> bool {
        let leeway = chrono::Duration::from_std(self.inner.config.expiry_leeway)
            .unwrap_or(chrono::Duration::zero());
        token.is_expired(Utc::now() + leeway)
    }

    fn start_refresh(&self, refresh_token: String, epoch: u64) -> PendingRefresh {
        // The pending refresh lives in `inner.state`, so it only holds `inner` weakly.
        let inner = Arc::downgrade(&self.inner);
        let grant_client = Arc::clone(&self.inner.grant_client);
        let metrics = Arc::clone(&self.inner.metrics);

        async move {
            let result = grant_client.request_refresh_grant(&refresh_token).await;
            metrics.record_token_request(GrantType::RefreshToken.as_str(), result.is_ok());
            if let Err(e) = &result {
                warn!(error = %e, "Token refresh failed");
                metrics.record_error(e.error_code());
            }

            match inner.upgrade() {
                Some(inner) => inner.commit_refresh(epoch, &refresh_token, result),
                None => result.map(|token| token.or_refresh_token(Some(&refresh_token))),
            }
        }
        .boxed()
        .shared()
    }
}

impl<G, S> CoordinatorInner<G, S>
where
    S: AccessTokenStorage + ?Sized,
{
    fn commit_refresh(
        &self,
        epoch: u64,
        previous_refresh_token: &str,
        result: OAuth2Result<AccessToken>,
    ) -> OAuth2Result<AccessToken> {
        let mut state = self.state.lock();
        let stale = state.epoch != epoch;
        if !stale {
            state.refresh = None;
        }

        let token = result?.or_refresh_token(Some(previous_refresh_token));
        if stale {
            debug!("Token changed during refresh, not committing refreshed token");
        } else {
            state.current = Some(token.clone());
            self.store_after_commit(state, Some(&token));
            debug!("Refreshed access token");
        }
        Ok(token)
    }

    /// Release `state`, then write `token` through to storage.
    fn store_after_commit(&self, state: MutexGuard<'_, TokenState>, token: Option<&AccessToken>) {
        let _write = self.storage_writes.lock();
        drop(state);
        self.storage.store_access_token(token);
    }
}
