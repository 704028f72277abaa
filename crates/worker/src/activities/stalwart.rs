//! Stalwart mail adapter and activity bindings
//!
//! `base_url`/`admin_token` arrive per call from `GetStalwartContext`
//! rather than being fixed on the adapter, since they're scoped per FQDN's
//! mail domain.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use hosting_core::activities::StalwartMail;
use hosting_core::domain::{EmailAccount, EmailAutoReply};
use hosting_core::error::CoreError;

use super::binding::rpc_activity;
use super::http::RpcClient;

pub struct StalwartAdapter {
    rpc: RpcClient,
}

impl StalwartAdapter {
    /// Unlike the other adapters, `StalwartAdapter` has no fixed collaborator
    /// address: each call carries its own target instance's `base_url`, so
    /// the underlying `RpcClient` is addressed per call via `call_url`.
    pub fn new() -> Self {
        Self { rpc: RpcClient::new("") }
    }
}

impl Default for StalwartAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StalwartMail for StalwartAdapter {
    async fn stalwart_add_alias(
        &self,
        base_url: &str,
        admin_token: &str,
        account: &EmailAccount,
        alias: &str,
    ) -> Result<(), CoreError> {
        self.rpc
            .call_url(&format!("{base_url}/api/add-alias"), &(admin_token, account, alias))
            .await
    }

    async fn stalwart_remove_alias(
        &self,
        base_url: &str,
        admin_token: &str,
        account: &EmailAccount,
        alias: &str,
    ) -> Result<(), CoreError> {
        self.rpc
            .call_url(&format!("{base_url}/api/remove-alias"), &(admin_token, account, alias))
            .await
    }

    async fn stalwart_sync_forward_script(
        &self,
        base_url: &str,
        admin_token: &str,
        account: &EmailAccount,
        destinations: &[(String, bool)],
    ) -> Result<(), CoreError> {
        self.rpc
            .call_url(
                &format!("{base_url}/api/sync-forward-script"),
                &(admin_token, account, destinations),
            )
            .await
    }

    async fn stalwart_set_vacation(
        &self,
        base_url: &str,
        admin_token: &str,
        account: &EmailAccount,
        auto_reply: Option<&EmailAutoReply>,
    ) -> Result<(), CoreError> {
        self.rpc
            .call_url(&format!("{base_url}/api/set-vacation"), &(admin_token, account, auto_reply))
            .await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StalwartAliasInput {
    pub base_url: String,
    pub admin_token: String,
    pub account: EmailAccount,
    pub alias: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StalwartForwardInput {
    pub base_url: String,
    pub admin_token: String,
    pub account: EmailAccount,
    pub destinations: Vec<(String, bool)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StalwartVacationInput {
    pub base_url: String,
    pub admin_token: String,
    pub account: EmailAccount,
    pub auto_reply: Option<EmailAutoReply>,
}

rpc_activity!(
    StalwartAddAlias,
    "stalwart_add_alias",
    StalwartAdapter,
    StalwartAliasInput,
    (),
    |c, i| c.stalwart_add_alias(&i.base_url, &i.admin_token, &i.account, &i.alias)
);
rpc_activity!(
    StalwartRemoveAlias,
    "stalwart_remove_alias",
    StalwartAdapter,
    StalwartAliasInput,
    (),
    |c, i| c.stalwart_remove_alias(&i.base_url, &i.admin_token, &i.account, &i.alias)
);
rpc_activity!(
    StalwartSyncForwardScript,
    "stalwart_sync_forward_script",
    StalwartAdapter,
    StalwartForwardInput,
    (),
    |c, i| c.stalwart_sync_forward_script(&i.base_url, &i.admin_token, &i.account, &i.destinations)
);
rpc_activity!(
    StalwartSetVacation,
    "stalwart_set_vacation",
    StalwartAdapter,
    StalwartVacationInput,
    (),
    |c, i| c.stalwart_set_vacation(&i.base_url, &i.admin_token, &i.account, i.auto_reply.as_ref())
);
