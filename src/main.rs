use clap::Parser;
use social_graph::app::commands::{resolve_format, run_convert, run_demo, run_inspect};
use social_graph::utils::error::ErrorSeverity;
use social_graph::utils::{logger, validation::Validate};
use social_graph::{AppConfig, CliConfig, Command, LocalStorage, Serializer, SocialError};

fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = match AppConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config: {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if config.logging.json {
        logger::init_json_logger(if cli.verbose { "debug" } else { &config.logging.level });
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting social-graph CLI");
    tracing::debug!("CLI config: {:?}", cli);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let base_dir = cli.base_dir.clone().unwrap_or_else(|| config.storage.base_dir.clone());
    let fallback = config.default_format()?;
    let serializer =
        Serializer::new(LocalStorage::new(base_dir)).with_json_indent(config.export.json_indent);

    let result = match &cli.command {
        Command::Demo { output, format } => {
            run_demo(&serializer, resolve_format(*format, output, fallback), output)
        }
        Command::Inspect { input, format } => {
            run_inspect(&serializer, resolve_format(*format, input, fallback), input)
        }
        Command::Convert {
            input,
            output,
            from,
            to,
        } => run_convert(
            &serializer,
            resolve_format(*from, input, fallback),
            input,
            resolve_format(*to, output, fallback),
            output,
        ),
    };

    match result {
        Ok(summary) => {
            println!("{}", summary);
            Ok(())
        }
        Err(e) => exit_with(e),
    }
}

fn exit_with(e: SocialError) -> ! {
    tracing::error!(
        "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}
