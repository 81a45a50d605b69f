use anyhow::Result;
use clap::Parser;
use tcptable::config::Config;
use tcptable::{Reply, Request, TcpTableExecutor};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber; stdout is reserved for lookup results
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Parse CLI arguments
    let config = Config::parse();
    config.validate()?;

    info!(
        "tcptable-query v{} looking up {} key(s) at {}",
        env!("CARGO_PKG_VERSION"),
        config.keys.len(),
        config.endpoint
    );

    let executor = TcpTableExecutor::with_config(config.expect, config.executor_config())?;

    let mut failures = 0_usize;
    for (seq_id, key) in (1_u64..).zip(&config.keys) {
        let request = Request::new(config.endpoint.as_str(), key.as_str())?;

        match executor.lookup(seq_id, &request).await {
            Ok(response) => match Reply::parse(&response) {
                Ok(reply) => println!("{key}\t{}\t{}", reply.status, reply.text_lossy()),
                Err(_) => println!("{key}\t-\t{}", String::from_utf8_lossy(&response)),
            },
            Err(e) => {
                error!("Lookup of '{key}' failed: {e}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} lookups failed", config.keys.len());
    }

    Ok(())
}
