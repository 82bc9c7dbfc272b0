use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use symptoms::config::Config;
use symptoms::server::{App, SymptomServer};
use symptoms::{Db, EventStore, SymptomStore};

fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new("info,symptoms=info"));
    tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_level(true)
    .init();

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(threads) = config.worker_threads {
        builder.worker_threads(threads.get());
    }
    let runtime = builder.enable_all().build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> anyhow::Result<()> {
    info!(path = %config.db_path.display(), environment = %config.environment, "opening store");

    // Both repositories share one environment and therefore one writer lock.
    let db = Db::open_with(&config.db_path, config.db_options())?;
    let symptoms = SymptomStore::new(&db)?;
    let events = EventStore::new(&db)?;

    let app = App::new(symptoms, events, config.site());
    let server = SymptomServer::new(app, config.static_dir.clone());
    server.run(config.addr).await?;

    db.sync()?;
    info!("store flushed");
    Ok(())
}
