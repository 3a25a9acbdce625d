use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use opendata_client::{CatalogClient, CatalogFilters, RecordPager};
use parkgraph_common::{Config, DistinctField, SearchFilters};
use parkgraph_etl::{normalize, EtlRun};
use parkgraph_graph::{GraphBuilder, GraphClient, GraphReader};
use parkgraph_query::{NominatimGeocoder, QueryService};
use parkgraph_store::PgDocumentStore;

#[derive(Parser)]
#[command(name = "parkgraph-etl")]
#[command(about = "Load the street-parking open data into Postgres and Neo4j")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch, normalize and load both datasets into the document store
    Load,

    /// Rebuild the graph from the stored spots
    Graph,

    /// Load, then rebuild the graph
    All,

    /// List the zones of a district
    Zones { district: i64 },

    /// Search stored spots by attribute or address
    Search(SearchArgs),

    /// Spots near a coordinate, from the graph
    Nearby {
        lat: f64,
        lon: f64,
        /// Radius in meters (default 100)
        #[arg(long)]
        radius: Option<f64>,
    },

    /// Option lists for the search form, or the stored values of one field
    Options {
        /// district, regulation, spot_type, zone or street (catalog names work too)
        #[arg(long, value_parser = parse_field)]
        field: Option<DistinctField>,
    },

    /// Fetch one filtered page from the remote spots dataset
    Preview {
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[command(flatten)]
        filters: CatalogArgs,
    },

    /// Distinct values of a field in the first remote page
    Sample {
        #[arg(value_parser = parse_field)]
        field: DistinctField,
        #[arg(long, default_value_t = 100)]
        size: u32,
    },
}

#[derive(Args)]
struct SearchArgs {
    #[arg(long)]
    district: Option<i64>,
    #[arg(long)]
    regulation: Option<String>,
    #[arg(long)]
    spot_type: Option<String>,
    #[arg(long)]
    zone: Option<String>,
    #[arg(long)]
    street: Option<String>,
    /// Free-text address; switches to a 500 m proximity search
    #[arg(long)]
    address: Option<String>,
}

impl From<SearchArgs> for SearchFilters {
    fn from(a: SearchArgs) -> Self {
        SearchFilters {
            district: a.district,
            regulation: a.regulation,
            spot_type: a.spot_type,
            zone: a.zone,
            street: a.street,
            address: a.address,
        }
    }
}

#[derive(Args)]
struct CatalogArgs {
    #[arg(long)]
    district: Option<i64>,
    #[arg(long)]
    regulation: Option<String>,
    #[arg(long)]
    zone: Option<String>,
    #[arg(long)]
    spot_type: Option<String>,
}

impl From<CatalogArgs> for CatalogFilters {
    fn from(a: CatalogArgs) -> Self {
        CatalogFilters {
            district: a.district,
            regulation: a.regulation,
            zone: a.zone,
            spot_type: a.spot_type,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("parkgraph=info".parse()?)
                .add_directive("opendata_client=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.log_redacted();

    let store = PgDocumentStore::connect(&config.database_url)
        .await
        .context("Failed to connect to document store")?;

    let result = run(cli.command, &config, store.clone()).await;
    store.close().await;
    result
}

async fn run(command: Command, config: &Config, store: PgDocumentStore) -> Result<()> {
    let store = Arc::new(store);
    let etl = EtlRun::new(store.clone());

    match command {
        Command::Load => {
            load(&etl, config).await?;
        }
        Command::Graph => {
            let graph = connect_graph(config).await?;
            etl.build_graph(&GraphBuilder::new(graph)).await?;
        }
        Command::All => {
            load(&etl, config).await?;
            let graph = connect_graph(config).await?;
            etl.build_graph(&GraphBuilder::new(graph)).await?;
        }
        Command::Zones { district } => {
            let svc = query_service(store, config).await?;
            print_json(&svc.zones_for_district(district).await?)?;
        }
        Command::Search(args) => {
            let svc = query_service(store, config).await?;
            let results = svc.search_spots(args.into()).await?;
            print_json(&json!({
                "count": results.len(),
                "center": QueryService::map_center(&results),
                "results": results,
            }))?;
        }
        Command::Nearby { lat, lon, radius } => {
            let svc = query_service(store, config).await?;
            print_json(&svc.nearby_alternatives(lat, lon, radius).await?)?;
        }
        Command::Options { field: None } => {
            let svc = query_service(store, config).await?;
            print_json(&svc.filter_options().await?)?;
        }
        Command::Options { field: Some(field) } => {
            let svc = query_service(store, config).await?;
            print_json(&svc.distinct_filter_values(field).await?)?;
        }
        Command::Preview { limit, filters } => {
            let catalog = catalog_client(&config.spots_api_url, config);
            let filters = CatalogFilters::from(filters);
            let page = catalog.fetch(Some(limit), 0, Some(&filters)).await;
            print_json(&normalize(page))?;
        }
        Command::Sample { field, size } => {
            let catalog = catalog_client(&config.spots_api_url, config);
            print_json(
                &catalog
                    .sample_distinct_values(field.source_field(), size)
                    .await,
            )?;
        }
    }

    Ok(())
}

async fn load(etl: &EtlRun, config: &Config) -> Result<()> {
    let footprints = catalog_client(&config.footprints_api_url, config);
    let spots = catalog_client(&config.spots_api_url, config);
    let stats = etl
        .load(&footprints, &spots, config.fetch_batch_size)
        .await?;
    info!(%stats, "Documents loaded");
    Ok(())
}

fn parse_field(name: &str) -> std::result::Result<DistinctField, String> {
    DistinctField::parse(name).ok_or_else(|| format!("unknown field '{name}'"))
}

fn catalog_client(url: &str, config: &Config) -> CatalogClient {
    CatalogClient::new(url).with_throttle(Duration::from_millis(config.fetch_throttle_ms))
}

async fn connect_graph(config: &Config) -> Result<GraphClient> {
    GraphClient::from_config(config)
        .await
        .context("Failed to connect to graph store")
}

async fn query_service(store: Arc<PgDocumentStore>, config: &Config) -> Result<QueryService> {
    let graph = connect_graph(config).await?;
    Ok(QueryService::new(
        store,
        Arc::new(GraphReader::new(graph)),
        Arc::new(NominatimGeocoder::new(config.geocoder_url.clone())),
    ))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
