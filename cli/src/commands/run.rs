use anyhow::{Context, Result};
use sectorgrid::{GeoJsonBorderSource, Pipeline, RunConfig, store::SqliteStore};

/// Fold command-line overrides into the (file or default) configuration.
fn resolve_config(args: &crate::cli::RunArgs) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_path(path)?,
        None => RunConfig::default(),
    };

    if let Some(step_km) = args.step_km { config.step_km = step_km }
    if let Some(radius_km) = args.radius_km { config.fan.radius_km = radius_km }
    if let Some(mode) = args.mode { config.mode = mode.into() }
    if let Some(policy) = args.containment { config.containment = policy.into() }
    if args.workers.is_some() { config.workers = args.workers }
    if let Some(url) = &args.border_url {
        config.border.url = url.clone();
        config.border.file = None;
    }
    if let Some(file) = &args.border_file { config.border.file = Some(file.clone()) }
    if let Some(country) = &args.country { config.border.value = country.clone() }

    Ok(config)
}

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::RunArgs) -> Result<()> {
    let config = resolve_config(args)?;
    tracing::debug!(?config, "resolved configuration");

    let store = SqliteStore::open(&args.database)
        .with_context(|| format!("[run] opening {}", args.database.display()))?;
    let source = GeoJsonBorderSource::from_config(&config.border);

    let mut pipeline = Pipeline::new(config, store)?;
    let summary = pipeline.run(&source, args.force)?;

    println!("[run] {summary}");
    Ok(())
}
