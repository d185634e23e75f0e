use clap::Parser;
use datadroid::utils::error::{DataError, ErrorSeverity};
use datadroid::utils::{logger, validation::Validate};
use datadroid::{CliConfig, ConfigProvider, ListBinder, ParseEngine, Record, TomlConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting datadroid");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let code = match cli.config.clone() {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            let mut config = match TomlConfig::from_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ Failed to load config file '{}': {}", path, e);
                    std::process::exit(1);
                }
            };
            config.apply_overrides(cli.workers, cli.timeout_secs);
            run(config).await
        }
        None => run(cli).await,
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

async fn run<C: ConfigProvider + Validate>(config: C) -> i32 {
    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());
        return 1;
    }

    let labels = config.labels().to_vec();
    let engine = ParseEngine::new(config);

    let outcomes = match engine.run().await {
        Ok(outcomes) => outcomes,
        Err(e) => {
            report(&e);
            return exit_code(&e);
        }
    };

    let mut worst: Option<&DataError> = None;
    for outcome in &outcomes {
        match outcome.binder(&labels) {
            Some(binder) => print_rows(&outcome.location, &binder),
            None => {
                if let Err(e) = &outcome.result {
                    eprintln!("❌ {}: {}", outcome.location, e);
                    eprintln!("💡 {}", e.recovery_suggestion());
                    if worst.map_or(true, |w| e.severity() > w.severity()) {
                        worst = Some(e);
                    }
                }
            }
        }
    }
    worst.map_or(0, exit_code)
}

fn print_rows(location: &str, binder: &ListBinder<Record>) {
    println!("# {} ({} records)", location, binder.item_count());
    println!("{}", binder.labels().join("\t"));
    for row in binder.rows() {
        let texts: Vec<&str> = row.cells.iter().map(|c| c.text.as_str()).collect();
        println!("{}", texts.join("\t"));
    }
}

fn report(e: &DataError) {
    tracing::error!("Parse run failed: {} (Severity: {:?})", e, e.severity());
    eprintln!("❌ {}", e);
    eprintln!("💡 {}", e.recovery_suggestion());
}

fn exit_code(e: &DataError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}
