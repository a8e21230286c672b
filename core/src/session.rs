//! Explicit setup and teardown for one test run.
//!
//! A session owns the player for its environment and the auth token resolved
//! from that environment's credentials. Teardown resets the service with the
//! admin account and reports the run's summary; a failed reset is logged and
//! does not abort teardown.
//!
//! Sessions only emit events. Installing a subscriber is left to the
//! binary or test harness, e.g. through `logging::init`.

use tracing::{info, warn};

use crate::auth::AuthToken;
use crate::config::{Credentials, RunConfig};
use crate::player::ApiPlayer;
use crate::results::RunSummary;

pub struct TestSession {
    config: RunConfig,
    player: ApiPlayer,
    auth: AuthToken,
}

impl TestSession {
    pub fn setup(config: RunConfig) -> Self {
        info!(environment = %config.environment, base_url = %config.base_url, "new test execution starting");
        let player = ApiPlayer::from_config(&config);
        let auth = player.set_auth_details(&config.credentials.username, &config.credentials.password);
        Self { config, player, auth }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn player(&self) -> &ApiPlayer {
        &self.player
    }

    /// Token for the environment's credentials.
    pub fn auth(&self) -> &AuthToken {
        &self.auth
    }

    pub fn teardown(self) -> RunSummary {
        let admin = AuthToken::encode(&Credentials::admin());
        let envelope = self.player.reset_app_state(Some(&admin));
        if envelope.is_successful() {
            info!("application state has been reset");
        } else {
            warn!(status = ?envelope.status_code, error = ?envelope.error, "failed to reset application state");
        }
        self.player.write_summary();
        self.player.summary()
    }
}
