use std::sync::Arc;

use clap::Parser;
use tracing::error;

use shorturls::config::{StaticConfig, init_config};
use shorturls::remote_log::RemoteLogger;
use shorturls::runtime::run_server;
use shorturls::system::init_logging;

#[derive(Debug, Parser)]
#[command(name = "shorturls", version, about = "URL shortener with click analytics")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    generate_config: bool,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.generate_config {
        println!("{}", StaticConfig::generate_sample_config());
        return Ok(());
    }

    // .env 可以提供 ACCESS_TOKEN 和 SU__* 覆盖
    dotenvy::dotenv().ok();

    let config = init_config(args.config.as_deref());

    let _guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e.format_colored());
            std::process::exit(1);
        }
    };

    let logger = Arc::new(RemoteLogger::new(&config.remote_log));

    if let Err(e) = run_server(logger).await {
        error!("Server exited with error: {:#}", e);
        return Err(e);
    }

    Ok(())
}
