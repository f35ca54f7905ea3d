//! `jokes-server` binary

use anyhow::Context;
use jokes_server::{cli, logging, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli::command().get_matches();
    let config = cli::load_config(&matches).context("invalid configuration")?;

    if matches.get_flag("print-config") {
        let rendered = config
            .to_raw()
            .to_toml()
            .context("failed to render configuration")?;
        print!("{rendered}");
        return Ok(());
    }

    logging::init(config.log_format).map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        version = jokes_core::VERSION,
        binary = %config.store.binary.display(),
        db_path = %config.store.db_path.display(),
        accounts = %config.accounts.base_url,
        policy = %config.store.success_policy,
        max_string_length = %config.store.max_string_length,
        listen = %config.listen,
        "starting jokes server"
    );
    if let Some(shim) = &config.store.arch_shim {
        tracing::info!(
            expected_arch = %shim.expected_arch,
            host_arch = std::env::consts::ARCH,
            launcher = ?shim.launcher,
            "architecture shim configured"
        );
    }

    server::serve(&config, server::shutdown_signal())
        .await
        .context("server failed")?;
    Ok(())
}
