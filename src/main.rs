use clap::Parser;
use job_ingest::utils::{logger, validation::Validate};
use job_ingest::{CliArgs, HttpTransport, IngestConfig, IngestionEngine, LocalStorage};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 載入 TOML 配置
    let mut config = match IngestConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(args.verbose);
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if args.json_logs || config.json_logs() {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting job-ingest");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    args.apply_overrides(&mut config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No providers will be contacted");
        perform_dry_run(&config);
        return Ok(());
    }

    if config.monitoring_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    let transport = Arc::new(HttpTransport::new());
    let store = Arc::new(config.store.open());
    tracing::info!("🗄️ Using job store: {}/{}", config.store.path, store.file());
    let engine = IngestionEngine::from_config(&config, transport, store)?;

    match engine.run().await {
        Ok(report) => {
            tracing::info!("✅ Ingestion completed successfully!");
            println!(
                "✅ Ingested {} jobs ({} inserted, {} updated, {} skipped)",
                report.jobs.len(),
                report.inserted,
                report.updated,
                report.skipped
            );

            if let Some((path, filename)) = config.output_target() {
                let storage = LocalStorage::new(path);
                let written = storage.write_json(filename, &report).await?;
                tracing::info!("📁 Report saved to: {}", written.display());
                println!("📁 Report saved to: {}", written.display());
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Ingestion failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            std::process::exit(e.severity().exit_code());
        }
    }

    Ok(())
}

fn display_config_summary(config: &IngestConfig, args: &CliArgs) {
    println!("📋 Configuration Summary:");
    println!("  Run: {}", config.ingest.name);
    println!("  Re-ingestion policy: {:?}", config.reingest_policy());
    println!("  Concurrent fetch: {}", config.ingest.concurrent_fetch);
    println!(
        "  Providers: {} enabled / {} configured",
        config.enabled_providers().count(),
        config.providers.len()
    );

    println!("  Store: {}/{}", config.store.path, config.store.filename());

    match config.output_target() {
        Some((path, filename)) => println!("  Report: {}/{}", path, filename),
        None => println!("  Report: (not written)"),
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &IngestConfig) {
    println!("🔍 Dry Run Analysis:");
    println!();

    println!("📡 Providers:");
    for provider in &config.providers {
        let status = if provider.is_enabled() { "enabled" } else { "disabled" };
        println!("  {} [{:?}, {}]", provider.name, provider.kind, status);
        println!("    Endpoint: {}", provider.endpoint);

        let request = provider.fetch_request();
        if let Some(timeout) = request.timeout {
            println!("    Timeout: {}s", timeout.as_secs());
        }
        if !request.headers.is_empty() {
            println!("    Headers: {} custom headers", request.headers.len());
        }
    }

    println!();
    println!("✅ Dry run completed - configuration is valid");
}
