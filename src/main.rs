use anyhow::Context;
use clap::Parser;
use sustain_ai::utils::{logger, validation::Validate};
use sustain_ai::{build_router, start_server, ArtifactLoader, CliConfig, InferenceService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();
    let config = cli.load().context("failed to load configuration")?;

    // 初始化日誌
    logger::init_logger(cli.verbose, &config.logging.level, config.logging.json);

    tracing::info!("Starting sustain-ai inference API");
    if cli.verbose {
        tracing::debug!(
            bind = %config.bind_address(),
            artifacts = %config.artifacts.dir,
            origin = %config.server.allowed_origin,
            "Service config"
        );
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    // 啟動前一次性載入所有模型
    let registry = ArtifactLoader::new(&config).load();
    let service = InferenceService::new(registry);

    let router = build_router(service, &config.server).context("failed to build router")?;
    start_server(router, &config.bind_address())
        .await
        .context("inference server terminated unexpectedly")?;

    Ok(())
}
