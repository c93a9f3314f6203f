use anyhow::Result;
use oci_service_operator::runtime::{initialize, run_watch_loop};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let init_result = initialize().await?;

    run_watch_loop(init_result.registry, init_result.context).await?;

    init_result
        .server_state
        .is_ready
        .store(false, std::sync::atomic::Ordering::Relaxed);
    info!("Controllers stopped, shutting down");

    Ok(())
}
