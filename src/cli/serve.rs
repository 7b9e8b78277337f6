//! Serve command implementation

use anyhow::Result;
use std::path::Path;

use super::{cancel_on_ctrl_c, load_service};
use modscope::server::{LineTransport, McpServer};

pub async fn serve_command(work_dir: &Path, config_path: Option<&Path>) -> Result<()> {
    let service = load_service(work_dir, config_path)?;
    let mut server = McpServer::new(LineTransport::stdio(), service, cancel_on_ctrl_c());
    server.run().await
}
