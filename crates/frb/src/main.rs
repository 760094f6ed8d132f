use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use frb_core::{
    allowlist::{AllowlistStore, AllowlistWatcher},
    config::Config,
    reboot::RebootWorkflow,
};
use frb_manage::ManageClient;

#[tokio::main]
async fn main() -> Result<(), frb_core::Error> {
    frb_core::logging::init("frb")?;

    let cfg = Arc::new(Config::load()?);
    let shutdown = CancellationToken::new();

    let allowlist = Arc::new(AllowlistStore::load(cfg.allowlist_path.clone()));
    let watcher = match AllowlistWatcher::spawn(
        allowlist.clone(),
        cfg.allowlist_debounce,
        shutdown.child_token(),
    ) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!(error = %e, "allowlist hot reload disabled");
            None
        }
    };

    let manage = Arc::new(ManageClient::new(&cfg)?);
    let workflow = Arc::new(RebootWorkflow::new(
        manage,
        cfg.club_id,
        cfg.pc_type.clone(),
    ));

    let result =
        frb_telegram::router::run_polling(cfg, allowlist, workflow, shutdown.clone()).await;

    shutdown.cancel();
    if let Some(w) = watcher {
        w.shutdown().await;
    }

    result.map_err(|e| frb_core::Error::External(format!("telegram bot failed: {e:#}")))?;
    info!("shutdown complete");
    Ok(())
}
