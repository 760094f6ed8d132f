use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::Result;

use super::types::{DeviceEntry, ManageRequest, ManageResponse};

/// Management API used by the reboot workflow.
///
/// The HTTP implementation lives in `frb-manage`; tests use in-memory fakes.
/// Both calls must stop promptly once `cancel` fires.
#[async_trait]
pub trait ManagePort: Send + Sync {
    async fn manage(
        &self,
        req: &ManageRequest,
        cancel: &CancellationToken,
    ) -> Result<ManageResponse>;

    async fn list_devices(
        &self,
        club_id: i64,
        pc_type: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<DeviceEntry>>;
}
