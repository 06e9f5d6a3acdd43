use std::sync::Arc;

use crate::{
    config::Config,
    db::store::KeyValueStore,
    repositories::users::UserStore,
    services::{
        csrf::CsrfService, rate_limit::RateLimitService, session::SessionService,
        verification::VerificationService,
    },
    utils::{email::EmailService, jwt::TokenCodec},
};

/// Shared handles injected into every handler. The store handle is built
/// once at startup; nothing reaches for a global client.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn KeyValueStore>,
    pub users: Arc<dyn UserStore>,
    pub codec: Arc<TokenCodec>,
    pub sessions: Arc<SessionService>,
    pub csrf: Arc<CsrfService>,
    pub verification: Arc<VerificationService>,
    pub rate_limit: Arc<RateLimitService>,
    pub email: Arc<EmailService>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        users: Arc<dyn UserStore>,
        email: Arc<EmailService>,
        config: Config,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(&config));
        let sessions = Arc::new(SessionService::new(
            store.clone(),
            codec.clone(),
            config.clone(),
        ));
        let csrf = Arc::new(CsrfService::new(store.clone(), codec.clone(), config.clone()));
        let verification = Arc::new(VerificationService::new(store.clone(), config.clone()));
        let rate_limit = Arc::new(RateLimitService::new(store.clone(), config.clone()));

        Self {
            config,
            store,
            users,
            codec,
            sessions,
            csrf,
            verification,
            rate_limit,
            email,
        }
    }
}
