//! Stalwart mail server activity surface
//!
//! All calls are scoped to a single FQDN's mail domain and take the base
//! URL/admin token pair produced by `CoreStoreReads::get_stalwart_context`,
//! rather than rediscovering it per call.

use async_trait::async_trait;

use crate::domain::{EmailAccount, EmailAutoReply};
use crate::error::CoreError;

#[async_trait]
pub trait StalwartMail: Send + Sync {
    async fn stalwart_add_alias(
        &self,
        base_url: &str,
        admin_token: &str,
        account: &EmailAccount,
        alias: &str,
    ) -> Result<(), CoreError>;

    async fn stalwart_remove_alias(
        &self,
        base_url: &str,
        admin_token: &str,
        account: &EmailAccount,
        alias: &str,
    ) -> Result<(), CoreError>;

    /// Pushes the full forward list for an account as one Sieve script,
    /// replacing whatever script currently exists rather than diffing it.
    async fn stalwart_sync_forward_script(
        &self,
        base_url: &str,
        admin_token: &str,
        account: &EmailAccount,
        destinations: &[(String, bool)],
    ) -> Result<(), CoreError>;

    async fn stalwart_set_vacation(
        &self,
        base_url: &str,
        admin_token: &str,
        account: &EmailAccount,
        auto_reply: Option<&EmailAutoReply>,
    ) -> Result<(), CoreError>;
}
