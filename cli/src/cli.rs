use std::path::PathBuf;

use wastemap::{Frame, Scope, SourceDescriptor};

/// Waste-management map engine CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "wastemap", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Engine configuration (JSON); defaults apply when omitted
    #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Print selectable districts and aggregate statistics as JSON
    Summary(SummaryArgs),

    /// Write the features of one collection matching a district/subdistrict/block selection
    Filter(FilterArgs),

    /// Compute coverage buffers and covered-population estimates
    Coverage(CoverageArgs),

    /// Bucket timestamped point observations into heat intensities
    Heatmap(HeatmapArgs),

    /// Compose layers and a basemap into one GeoJSON document
    Render(RenderArgs),
}

#[derive(clap::Args, Debug)]
pub struct SourceArgs {
    /// Feature source as name=path-or-url[@category] (repeatable)
    #[arg(short, long = "source", required = true)]
    pub sources: Vec<SourceDescriptor>,

    /// Session role (admin, leader, stakeholder); anything else is public
    #[arg(long)]
    pub role: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SelectionArgs {
    #[arg(long, default_value = "all")]
    pub district: Scope,

    #[arg(long, default_value = "all")]
    pub subdistrict: Scope,

    #[arg(long, default_value = "all")]
    pub block: Scope,
}

#[derive(clap::Args, Debug)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

#[derive(clap::Args, Debug)]
pub struct FilterArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Collection to filter
    #[arg(long)]
    pub collection: String,

    /// Output GeoJSON file, defaults to stdout
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct CoverageArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Buffer radius in meters (clamped to the configured range)
    #[arg(short, long)]
    pub radius: f64,

    /// Demand points (with a population attribute) for measured coverage, as name=path
    #[arg(long)]
    pub population: Option<SourceDescriptor>,

    /// Output JSON file, defaults to stdout
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct HeatmapArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Time frame: daily, weekly or monthly
    #[arg(short, long, default_value = "weekly")]
    pub frame: Frame,

    /// Only keep the frame period containing this date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub at: Option<String>,

    /// Output GeoJSON file, defaults to stdout
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Layers to draw (collection names); defaults to the configured default layers
    #[arg(short, long = "layer")]
    pub layers: Vec<String>,

    /// Basemap id; defaults to the configured default basemap
    #[arg(short, long)]
    pub basemap: Option<String>,

    /// Also draw coverage buffers at this radius (meters)
    #[arg(long)]
    pub coverage: Option<f64>,

    /// Output GeoJSON file, defaults to stdout
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}
