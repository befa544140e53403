use crate::application::mirror::Mirror;
use crate::config::Config;
use crate::domain::account::Account;
use crate::domain::user::User;
use crate::error::Result;
use log::debug;
use std::sync::Arc;

/// Post-creation hook for the host user-management subsystem.
///
/// The host calls `on_user_created` after persisting a new user. When
/// `auto_create_account` is enabled the user's remote account is
/// provisioned right away; otherwise it is created lazily on first use.
#[derive(Clone)]
pub struct AccountProvisioner {
    mirror: Arc<Mirror>,
    enabled: bool,
}

impl AccountProvisioner {
    pub fn new(mirror: Arc<Mirror>, config: &Config) -> Self {
        Self {
            mirror,
            enabled: config.auto_create_account,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the user's account, or `None` when provisioning is disabled.
    pub async fn on_user_created(&self, user: &User) -> Result<Option<Account>> {
        if !self.enabled {
            debug!("account provisioning disabled, skipping user {}", user.id);
            return Ok(None);
        }
        self.ensure_account(user).await.map(Some)
    }

    /// Fetch-or-create, regardless of configuration.
    pub async fn ensure_account(&self, user: &User) -> Result<Account> {
        self.mirror.ensure_account(user).await
    }
}
