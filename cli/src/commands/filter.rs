use anyhow::{bail, Result};
use tracing::info;
use wastemap::features_to_geojson;

use crate::commands::{open_session, write_json};

pub async fn run(cli: &crate::cli::Cli, args: &crate::cli::FilterArgs) -> Result<()> {
    let (_store, session) = open_session(cli, &args.sources, &args.selection).await?;

    if !session.snapshot().collection_names().any(|name| name == args.collection) {
        bail!("Unknown collection '{}'", args.collection);
    }

    let features = session.filtered_features(&args.collection);
    info!(collection = %args.collection, matched = features.len(), "features filtered");

    write_json(&features_to_geojson(features), args.output.as_deref())
}
