use anyhow::Result;
use tracing::{error, info};

use renza_protocol::ProtocolEngine;

fn main() -> Result<()> {
    // protocol replies own stdout; logs go to stderr
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    info!("renza starting");

    match ProtocolEngine::new().run() {
        Ok(()) => Ok(()),
        Err(err) => {
            error!(%err, "protocol loop failed");
            std::process::exit(1);
        }
    }
}
