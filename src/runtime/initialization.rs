//! # Initialization
//!
//! Process startup: rustls provider, tracing, metrics, the health server,
//! Kubernetes and cloud clients, and the per-kind registry.

use crate::adapters::{register_all, AdapterContext};
use crate::config::{load_config, ServerConfig};
use crate::controller::reconciler::types::EngineConfig;
use crate::controller::registry::KindRegistry;
use crate::controller::server::{start_server, ServerState};
use crate::controller::store::{KubeStore, ObjectStore, Stores};
use crate::crd::{
    AutonomousDatabase, Backend, BackendSet, Certificate, Cluster, ComputeInstance, Compartment,
    Listener, LoadBalancer, ManagedObject, NodePool, Subnet, VirtualNetwork,
};
use crate::observability;
use crate::provider::oci::OciRestClient;
use crate::provider::CloudClients;
use crate::runtime::watch_loop::ControllerContext;
use crate::secrets::{KubeSecretStore, SecretStore, TarGzUnpacker};
use anyhow::{Context, Result};
use kube::Client;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Everything the watch loop needs
pub struct InitializationResult {
    /// One entry per managed kind, parents first
    pub registry: Arc<KindRegistry>,
    pub context: ControllerContext,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

fn kube_store<K: ManagedObject>(client: &Client) -> Arc<dyn ObjectStore<K>> {
    Arc::new(KubeStore::<K>::new(client.clone()))
}

fn kube_stores(client: &Client) -> Stores {
    Stores::default()
        .with::<Compartment>(kube_store(client))
        .with::<VirtualNetwork>(kube_store(client))
        .with::<Subnet>(kube_store(client))
        .with::<ComputeInstance>(kube_store(client))
        .with::<Cluster>(kube_store(client))
        .with::<NodePool>(kube_store(client))
        .with::<AutonomousDatabase>(kube_store(client))
        .with::<LoadBalancer>(kube_store(client))
        .with::<BackendSet>(kube_store(client))
        .with::<Listener>(kube_store(client))
        .with::<Certificate>(kube_store(client))
        .with::<Backend>(kube_store(client))
}

/// Initialize the operator runtime
///
/// # Errors
/// Fails if metrics cannot be registered, the health server does not come up,
/// no Kubernetes client can be built or the cloud credentials are unusable.
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before anything touches rustls
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|existing| {
            anyhow::anyhow!("Failed to install rustls crypto provider, found {existing:?}")
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oci_service_operator=info".into()),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting OCI service operator"
    );

    let (controller_config, server_config, cloud_config) = load_config();
    info!(?controller_config, "Loaded controller configuration");

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_handle = {
        let state = Arc::clone(&server_state);
        let port = server_config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = start_server(port, state).await {
                error!("HTTP server error: {}", e);
            }
        })
    };
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let secrets: Arc<dyn SecretStore> = Arc::new(KubeSecretStore::new(client.clone()));
    let credentials = cloud_config
        .resolve(secrets.as_ref())
        .await
        .context("Failed to resolve cloud credentials")?;
    info!(
        region = %credentials.region,
        tenancy = %credentials.tenancy_id,
        endpoint_override = ?credentials.endpoint_override,
        "Resolved cloud credentials"
    );
    let cloud = Arc::new(OciRestClient::new(&credentials).context("Failed to build cloud client")?);

    let adapter_context = AdapterContext {
        clients: CloudClients::from_single(&cloud),
        secrets,
        unpacker: Arc::new(TarGzUnpacker::new(controller_config.wallet_scratch_dir.clone())),
        tenancy_id: credentials.tenancy_id.clone(),
    };
    let registry = register_all(&adapter_context, &kube_stores(&client))
        .context("Failed to register managed kinds")?;
    info!(kinds = ?registry.kinds(), "Registered managed kinds");

    let context = ControllerContext {
        client,
        engine: EngineConfig::from(&controller_config),
        namespace: controller_config.watch_namespace.clone(),
    };

    info!("Operator initialized, starting watch loop...");

    Ok(InitializationResult {
        registry: Arc::new(registry),
        context,
        server_state,
    })
}

/// Wait for the HTTP server to bind
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = Duration::from_secs(config.startup_timeout_secs);
    let poll_interval = Duration::from_millis(config.poll_interval_ms);
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_for_server_ready_sees_flag() {
        let state = Arc::new(ServerState::default());
        let handle = tokio::spawn(std::future::pending::<()>());
        state.is_ready.store(true, Ordering::Relaxed);
        let config = ServerConfig::default();
        wait_for_server_ready(&state, &handle, &config).await.unwrap();
        handle.abort();
    }

    #[tokio::test]
    async fn test_wait_for_server_ready_reports_crash() {
        let state = Arc::new(ServerState::default());
        let handle = tokio::spawn(async {});
        while !handle.is_finished() {
            tokio::task::yield_now().await;
        }
        let config = ServerConfig::default();
        wait_for_server_ready(&state, &handle, &config)
            .await
            .unwrap_err();
    }
}
