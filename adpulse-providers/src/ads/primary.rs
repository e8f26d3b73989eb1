//! Primary adapter: the native bridge over JSON-RPC.

use adpulse_core::{Credential, ReportQuery};
use adpulse_fetch::{
    AdapterKind, Deadline, FetchError, ProcessRunner, TransportAdapter, TransportFailure,
};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::bootstrap::{BootstrapFile, BootstrapRecord};
use super::gaql::build_query;
use super::raw::ProviderRawResult;
use super::rpc::AdsRpcClient;
use super::settings::AdsSettings;

/// Adapter id.
pub const PRIMARY_ADAPTER_ID: &str = "ads.rpc";

struct PrimarySession {
    rpc: AdsRpcClient,
    bootstrap: BootstrapFile,
}

/// Runs queries through a bootstrapped bridge process.
pub struct PrimaryAdapter {
    settings: AdsSettings,
    session: Mutex<PrimarySession>,
}

impl PrimaryAdapter {
    /// Writes the bootstrap record, starts the bridge and performs the
    /// handshake.
    ///
    /// # Errors
    ///
    /// Every bootstrap failure (missing bridge, missing developer token,
    /// failed handshake) is reported as `ConfigInvalid`.
    #[instrument(skip_all, fields(command = %settings.rpc_command))]
    pub async fn bootstrap(
        settings: &AdsSettings,
        credential: &Credential,
        deadline: Deadline,
    ) -> Result<Self, TransportFailure> {
        let runner = ProcessRunner::new();

        let result: Result<Self, FetchError> = async {
            let record = BootstrapRecord::from_settings(settings, credential)?;
            let bootstrap = BootstrapFile::create(settings.bootstrap_dir.as_deref(), record)?;
            let mut rpc = AdsRpcClient::spawn(&runner, &settings.rpc_command, bootstrap.path())?;
            deadline
                .run(async { rpc.initialize().await.map_err(FetchError::from) })
                .await?;

            Ok(Self {
                settings: settings.clone(),
                session: Mutex::new(PrimarySession { rpc, bootstrap }),
            })
        }
        .await;

        match result {
            Ok(adapter) => {
                info!("Native transport bootstrapped");
                Ok(adapter)
            }
            Err(e) => {
                warn!(error = %e, "Native transport bootstrap failed");
                Err(TransportFailure::config_invalid(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl TransportAdapter for PrimaryAdapter {
    type Output = ProviderRawResult;

    fn id(&self) -> &str {
        PRIMARY_ADAPTER_ID
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Primary
    }

    #[instrument(skip_all, fields(account = %query.account_id))]
    async fn execute(
        &self,
        credential: &Credential,
        query: &ReportQuery,
        _deadline: Deadline,
    ) -> Result<ProviderRawResult, FetchError> {
        let mut guard = self.session.lock().await;
        let PrimarySession { rpc, bootstrap } = &mut *guard;

        // The record embeds the refresh token; keep the bridge in step with it.
        let record = BootstrapRecord::from_settings(&self.settings, credential)?;
        if bootstrap.update(record)? {
            rpc.reload(bootstrap.path()).await?;
        }

        let gaql = build_query(query);
        debug!(query = %gaql, "Searching via native transport");
        let result = rpc.search(query.account_id.as_str(), &gaql).await?;
        debug!(rows = result.rows.len(), "Native search returned");
        Ok(ProviderRawResult::Rpc(result))
    }
}
