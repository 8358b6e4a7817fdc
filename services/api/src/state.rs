//! Application state shared across handlers

use common::{auth::AuthGate, jwt::JwtService, store::Repositories};
use std::sync::Arc;

use crate::{
    config::{AppSettings, SeedPolicy, SyncPolicy},
    notifier::{LogSender, PushSender},
    planner::{TaskPlanner, UnconfiguredPlanner},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repositories: Repositories,
    pub gate: AuthGate,
    /// State of the mounted signup/login routes
    pub auth: auth::AppState,
    pub planner: Arc<dyn TaskPlanner>,
    pub push: Arc<dyn PushSender>,
    pub seed_policy: SeedPolicy,
    pub sync_policy: SyncPolicy,
}

impl AppState {
    /// State with the collaborators the settings describe
    pub fn from_settings(
        repositories: Repositories,
        jwt_service: JwtService,
        settings: &AppSettings,
    ) -> anyhow::Result<Self> {
        let mut state = Self::new(repositories, jwt_service, settings);
        state.planner = crate::planner::from_settings(&settings.planner)?;
        state.push = crate::notifier::from_settings(&settings.push)?;
        Ok(state)
    }

    /// State without external collaborators: planning always falls back and
    /// pushes are only logged
    pub fn new(repositories: Repositories, jwt_service: JwtService, settings: &AppSettings) -> Self {
        let auth = auth::AppState::new(
            repositories.users.clone(),
            jwt_service,
            settings.login_throttle.clone(),
        );

        Self {
            gate: auth.gate(),
            auth,
            repositories,
            planner: Arc::new(UnconfiguredPlanner),
            push: Arc::new(LogSender),
            seed_policy: settings.seed.clone(),
            sync_policy: settings.sync.clone(),
        }
    }

    pub fn with_planner(mut self, planner: Arc<dyn TaskPlanner>) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_push(mut self, push: Arc<dyn PushSender>) -> Self {
        self.push = push;
        self
    }
}
