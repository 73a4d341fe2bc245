use std::path::PathBuf;

use sectorgrid::{ContainmentPolicy, ProjectionMode};

/// Grid, sector and coverage generation over a country border
#[derive(clap::Parser, Debug)]
#[command(name = "sectorgrid", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Generate (or reuse) every layer in the database
    Run(RunArgs),

    /// Export stored layers as GeoJSON and/or an SVG map
    Render(RenderArgs),

    /// Serve stored layers as GeoJSON over HTTP
    Serve(ServeArgs),
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum ModeArg {
    Metric,
    Degree,
    Identity,
}

impl From<ModeArg> for ProjectionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Metric => ProjectionMode::Metric,
            ModeArg::Degree => ProjectionMode::Degree,
            ModeArg::Identity => ProjectionMode::Identity,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum ContainmentArg {
    Inclusive,
    Exclusive,
}

impl From<ContainmentArg> for ContainmentPolicy {
    fn from(policy: ContainmentArg) -> Self {
        match policy {
            ContainmentArg::Inclusive => ContainmentPolicy::Inclusive,
            ContainmentArg::Exclusive => ContainmentPolicy::Exclusive,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// SQLite database holding the layers
    #[arg(short, long, env = "SECTORGRID_DATABASE", value_hint = clap::ValueHint::FilePath)]
    pub database: PathBuf,

    /// TOML run configuration; flags below override it
    #[arg(short, long, env = "SECTORGRID_CONFIG", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Grid cell side in kilometres
    #[arg(long, env = "SECTORGRID_STEP_KM")]
    pub step_km: Option<f64>,

    /// Sector radius in kilometres
    #[arg(long, env = "SECTORGRID_RADIUS_KM")]
    pub radius_km: Option<f64>,

    /// How kilometres map onto coordinates
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Whether points on a sector outline count as covered
    #[arg(long, value_enum)]
    pub containment: Option<ContainmentArg>,

    /// Worker threads (defaults to every core)
    #[arg(short, long, env = "SECTORGRID_WORKERS")]
    pub workers: Option<usize>,

    /// GeoJSON URL with country borders
    #[arg(long, conflicts_with = "border_file")]
    pub border_url: Option<String>,

    /// Local GeoJSON file with country borders
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub border_file: Option<PathBuf>,

    /// Value of the border property to select, e.g. "Ukraine"
    #[arg(long)]
    pub country: Option<String>,

    /// Drop every stored layer and regenerate
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    /// SQLite database holding the layers
    #[arg(short, long, env = "SECTORGRID_DATABASE", value_hint = clap::ValueHint::FilePath)]
    pub database: PathBuf,

    /// Output SVG map
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub svg: Option<PathBuf>,

    /// Output directory for one GeoJSON file per layer
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub geojson_dir: Option<PathBuf>,

    /// SVG width in pixels
    #[arg(long, default_value_t = 1200)]
    pub width: i32,
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// SQLite database holding the layers
    #[arg(short, long, env = "SECTORGRID_DATABASE", value_hint = clap::ValueHint::FilePath)]
    pub database: PathBuf,

    /// Address to listen on
    #[arg(short, long, env = "SECTORGRID_LISTEN", default_value = "127.0.0.1:5000")]
    pub listen: String,
}
