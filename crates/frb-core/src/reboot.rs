//! The `/free_reboot` workflow: reboot every device of the configured type and
//! report per-device outcomes.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    formatting::{chunk_lines, sort_case_insensitive},
    manage::{
        client::ManagePort,
        types::{build_directory, DeviceDirectory, ManageRequest, ManageResponse},
    },
    Result,
};

pub const NO_DATA_MESSAGE: &str = "No data";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RebootReport {
    /// The API reported failure or returned no devices.
    NoData,
    Devices {
        /// `name:true` / `name:false`, sorted case-insensitively.
        lines: Vec<String>,
        /// Set when the name lookup failed and raw ids are shown instead.
        directory_error: Option<String>,
    },
}

impl RebootReport {
    /// Outbound chat messages, each at most `limit` UTF-16 units.
    pub fn into_messages(self, limit: usize) -> Vec<String> {
        match self {
            RebootReport::NoData => vec![NO_DATA_MESSAGE.to_string()],
            RebootReport::Devices {
                lines,
                directory_error,
            } => {
                let mut out = Vec::new();
                if let Some(err) = directory_error {
                    let note = format!("Device names unavailable, showing ids ({err})");
                    out.extend(chunk_lines(&[note], limit));
                }
                out.extend(chunk_lines(&lines, limit));
                out
            }
        }
    }
}

pub struct RebootWorkflow {
    api: Arc<dyn ManagePort>,
    club_id: i64,
    pc_type: String,
}

impl RebootWorkflow {
    pub fn new(api: Arc<dyn ManagePort>, club_id: i64, pc_type: impl Into<String>) -> Self {
        Self {
            api,
            club_id,
            pc_type: pc_type.into(),
        }
    }

    /// Issue the reboot and the directory lookup concurrently, then join them.
    ///
    /// A failed reboot call is an error; a failed lookup only degrades names.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RebootReport> {
        let request = ManageRequest::reboot(self.club_id, self.pc_type.clone());
        let (manage, devices) = tokio::join!(
            self.api.manage(&request, cancel),
            self.api.list_devices(self.club_id, &self.pc_type, cancel),
        );

        let manage = manage?;
        if !manage.has_data() {
            info!(
                club_id = self.club_id,
                pc_type = %self.pc_type,
                status = manage.status,
                "reboot returned no data"
            );
            return Ok(RebootReport::NoData);
        }

        let (directory, directory_error) = match devices {
            Ok(entries) => (build_directory(&entries), None),
            Err(e) => {
                warn!(error = %e, "device directory lookup failed, using raw ids");
                (DeviceDirectory::new(), Some(e.to_string()))
            }
        };

        let lines = format_device_lines(&manage, &directory);
        info!(devices = lines.len(), "reboot finished");
        Ok(RebootReport::Devices {
            lines,
            directory_error,
        })
    }
}

/// One `name:bool` line per device. Only the first status entry counts.
pub fn format_device_lines(resp: &ManageResponse, directory: &DeviceDirectory) -> Vec<String> {
    let mut lines: Vec<String> = resp
        .data
        .iter()
        .map(|(id, outcomes)| {
            let name = directory.get(id).map(String::as_str).unwrap_or(id);
            let ok = outcomes.first().copied().unwrap_or(false);
            format!("{name}:{ok}")
        })
        .collect();
    sort_case_insensitive(&mut lines);
    lines
}
