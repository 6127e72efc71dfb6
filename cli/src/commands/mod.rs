pub mod coverage;
pub mod filter;
pub mod heatmap;
pub mod render;
pub mod summary;

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::info;
use wastemap::{
    AdminLevel, EngineConfig, FeatureStore, GeoJsonRenderer, LoadOptions, MapRenderer, MapSession, Role, TransitionOutcome,
};

use crate::cli::{Cli, SelectionArgs, SourceArgs};

/// Read the configuration and load every source into a ready store.
pub(crate) async fn load_store(cli: &Cli, args: &SourceArgs) -> Result<FeatureStore> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    let store = FeatureStore::new(config);
    store.load(&args.sources, LoadOptions::default()).await?;
    Ok(store)
}

/// Load the sources and mount a headless map session with the selection applied.
pub(crate) async fn open_session(cli: &Cli, sources: &SourceArgs, selection: &SelectionArgs) -> Result<(FeatureStore, MapSession<GeoJsonRenderer>)> {
    let store = load_store(cli, sources).await?;
    let role = Role::from_session(sources.role.as_deref());
    let (mut session, _) = MapSession::mount(&store, GeoJsonRenderer::new(), role)?;
    apply_selection(&mut session, selection)?;
    Ok((store, session))
}

/// Apply district, then subdistrict, then block. A child given without its parent is an error here.
pub(crate) fn apply_selection<R: MapRenderer>(session: &mut MapSession<R>, args: &SelectionArgs) -> Result<()> {
    for outcome in [
        session.set_district(args.district.clone()),
        session.set_subdistrict(args.subdistrict.clone()),
        session.set_block(args.block.clone()),
    ] {
        let TransitionOutcome::Ignored(reason) = outcome else { continue };
        let requested = match reason.level {
            AdminLevel::District => &args.district,
            AdminLevel::Subdistrict => &args.subdistrict,
            AdminLevel::Block => &args.block,
        };
        // "all" below an "all" parent is not a real request
        if requested.is_all() { continue }
        bail!("{reason}");
    }
    Ok(())
}

/// Pretty-print JSON to a file, or to stdout if no file is given.
pub(crate) fn write_json(value: &Value, output: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "output written");
        }
        None => println!("{text}"),
    }
    Ok(())
}
