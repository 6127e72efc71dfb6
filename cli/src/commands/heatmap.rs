use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Value};

use crate::commands::{open_session, write_json};

/// `YYYY-MM-DD` (midnight UTC) or RFC 3339.
fn parse_at(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) { return Ok(t.with_timezone(&Utc)) }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
        .ok_or_else(|| anyhow!("Invalid date '{s}': expected YYYY-MM-DD or RFC 3339"))
}

pub async fn run(cli: &crate::cli::Cli, args: &crate::cli::HeatmapArgs) -> Result<()> {
    let (_store, mut session) = open_session(cli, &args.sources, &args.selection).await?;
    let at = args.at.as_deref().map(parse_at).transpose()?;

    let observations = session.observations();
    let points = session.show_heatmap(&observations, args.frame, at)?;

    let scale = &session.config().heatmap;
    let features: Vec<Value> = points.iter().map(|p| p.to_json(scale)).collect();
    let doc = json!({
        "type": "FeatureCollection",
        "frame": args.frame.to_str(),
        "features": features,
    });

    write_json(&doc, args.output.as_deref())
}
