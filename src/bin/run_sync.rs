use std::io::{self, Write};
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use catalog_sync::sync::{self, SyncConfig, SyncOutcome, SyncReport};

#[derive(Parser, Debug)]
#[command(
    name = "run_sync",
    about = "Synchronize the Tiny product catalog into PostgreSQL once and print the result"
)]
struct Args {
    /// Override the upstream API base url (defaults to TINY_API_BASE_URL).
    #[arg(long)]
    base_url: Option<String>,

    /// Override the pause between page requests, in milliseconds.
    #[arg(long)]
    page_delay_ms: Option<u64>,

    /// Skip applying pending schema migrations before the run.
    #[arg(long)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    let mut config = SyncConfig::from_env();
    if let Some(base_url) = args.base_url {
        config.api_base_url = base_url;
    }
    if let Some(delay) = args.page_delay_ms {
        config.page_delay = Duration::from_millis(delay);
    }

    let pool = match sync::connect_pool(&config, !args.skip_migrations).await {
        Ok(pool) => pool,
        Err(err) => return finish(&Err(err.into())),
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received; stopping after the current page");
            on_interrupt.cancel();
        }
    });

    let outcome = sync::run_with_pool(&config, &pool, cancel).await;
    pool.close().await;

    finish(&outcome)
}

fn finish(outcome: &SyncOutcome) -> Result<(), Box<dyn std::error::Error>> {
    let report = SyncReport::from_outcome(outcome);
    writeln!(io::stdout(), "{}", serde_json::to_string_pretty(&report)?)?;

    if let Err(abort) = outcome {
        writeln!(io::stderr(), "error: {}", abort.error)?;
        std::process::exit(1);
    }

    Ok(())
}
