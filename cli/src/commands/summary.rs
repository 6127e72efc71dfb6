use anyhow::Result;
use serde_json::json;

use crate::commands::{open_session, write_json};

pub async fn run(cli: &crate::cli::Cli, args: &crate::cli::SummaryArgs) -> Result<()> {
    let (_store, session) = open_session(cli, &args.sources, &args.selection).await?;
    let index = session.index();
    let selection = session.selection();

    let names = |list: &[std::sync::Arc<str>]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    let summary = json!({
        "role": session.role().to_string(),
        "collections": session.snapshot().collection_names().collect::<Vec<_>>(),
        "selection": {
            "district": selection.district().to_string(),
            "subdistrict": selection.subdistrict().to_string(),
            "block": selection.block().to_string(),
        },
        "districts": names(index.districts()),
        "subdistricts": names(index.subdistricts(selection.district())),
        "blocks": names(index.blocks(selection.district(), selection.subdistrict())),
        "stats": session.stats(),
        "selected_stats": session.filtered_stats(),
    });

    write_json(&summary, None)
}
