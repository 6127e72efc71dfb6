use anyhow::{Context, Result};
use tracing::info;
use wastemap::{DefaultFetcher, DemandPoint, FeatureReader, SourceFetcher};

use crate::commands::{open_session, write_json};

pub async fn run(cli: &crate::cli::Cli, args: &crate::cli::CoverageArgs) -> Result<()> {
    let (store, mut session) = open_session(cli, &args.sources, &args.selection).await?;

    if let Some(source) = &args.population {
        let config = store.config();
        let bytes = DefaultFetcher::new().fetch(source).await
            .with_context(|| format!("Failed to fetch population source '{}'", source.name))?;
        let demand: Vec<DemandPoint> = FeatureReader::new(&config.attributes, &config.category_aliases)
            .read_bytes(&source.name, &bytes)?
            .iter()
            .filter_map(|f| DemandPoint::from_feature(f, &config.attributes))
            .collect();
        info!(points = demand.len(), "population loaded");
        session = session.with_population(demand);
    }

    let result = session.show_coverage(args.radius)?;
    if result.radius_clamped {
        info!(requested = args.radius, used = result.radius_m, "radius clamped");
    }

    write_json(&result.to_json(), args.output.as_deref())
}
