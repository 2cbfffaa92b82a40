use std::sync::Arc;

use tgf_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), tgf_core::Error> {
    tgf_core::logging::init("tgf")?;

    let cfg = Arc::new(Config::load()?);

    tgf_telegram::router::run_polling(cfg)
        .await
        .map_err(|e| tgf_core::Error::Transport(format!("forwarder failed: {e}")))?;

    Ok(())
}
