use anyhow::{bail, Context, Result};
use sectorgrid::{Presentation, store::SqliteStore};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::RenderArgs) -> Result<()> {
    if args.svg.is_none() && args.geojson_dir.is_none() {
        bail!("[render] nothing to do; pass --svg and/or --geojson-dir");
    }

    let store = SqliteStore::open(&args.database)
        .with_context(|| format!("[render] opening {}", args.database.display()))?;
    let presentation = Presentation::from_store(&store)
        .context("[render] the database has no complete run; use `sectorgrid run` first")?;

    if let Some(path) = &args.svg {
        presentation.to_svg_with_size(path, args.width, 10)?;
        println!("[render] wrote {}", path.display());
    }
    if let Some(dir) = &args.geojson_dir {
        for path in presentation.write_geojson(dir)? {
            println!("[render] wrote {}", path.display());
        }
    }
    Ok(())
}
