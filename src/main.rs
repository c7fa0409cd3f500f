use industrial_vacancies::{
    config::{get_config, init_config},
    database::pool::{create_pool, run_migrations},
    services::statistics_service::rng_from_seed,
    AppState,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();
    init_tracing(config.log_json);

    // An explicit directory argument wins over DATA_DIR.
    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.data_dir.clone());

    let pool = create_pool().await?;
    run_migrations(&pool).await?;

    let state = AppState::new(pool)?;

    let result = state.ingest(&data_dir).await?;
    info!(
        run_id = %result.run.id,
        files = result.outcome.stats.files_processed,
        kept = result.outcome.stats.kept,
        inserted = result.inserted,
        "Ingest complete"
    );

    let mut rng = rng_from_seed(config.bootstrap_seed);
    let paths = state.report(&result, &mut rng).await?;
    info!(
        markdown = %paths.markdown.display(),
        summary = %paths.summary.display(),
        xlsx = %paths.xlsx.display(),
        "Reports written"
    );

    state.pool.close().await;
    Ok(())
}
