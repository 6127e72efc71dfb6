use anyhow::Result;
use tracing::{info, warn};

use crate::commands::{open_session, write_json};

pub async fn run(cli: &crate::cli::Cli, args: &crate::cli::RenderArgs) -> Result<()> {
    let (_store, mut session) = open_session(cli, &args.sources, &args.selection).await?;

    // Explicit layers replace the configured defaults
    if !args.layers.is_empty() {
        let defaults: Vec<String> = session.current_layers().into_iter().map(str::to_string).collect();
        for id in defaults.iter().filter(|id| !args.layers.contains(id)) {
            session.hide_layer(id);
        }
        for id in &args.layers {
            if let Err(failure) = session.show_layer(id) {
                warn!(layer = %failure.layer, reason = %failure.reason, "layer not drawn");
            }
        }
    }

    if let Some(id) = &args.basemap {
        session.set_basemap(id)?;
    }

    if let Some(radius) = args.coverage {
        let result = session.show_coverage(radius)?;
        info!(radius = result.radius_m, covered = result.covered_percent, "coverage drawn");
    }

    info!(layers = ?session.current_layers(), basemap = ?session.current_basemap(), "map rendered");
    write_json(&session.renderer().to_geojson(), args.output.as_deref())
}
