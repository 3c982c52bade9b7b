//! Thin CLI translating flags into `sumav_graph` core calls. Owns
//! logging initialization and configuration loading; all algorithmic work
//! is delegated to the library.

use clap::{Parser, Subcommand};
use sumav_core::Config;
use sumav_graph::dump::{format_dump_name, sort_graph_names};
use sumav_graph::searcher::RepresentativeTokenOptions;
use sumav_graph::{Builder, CozoStore, Searcher};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sumav", version, about = "AV-verdict token-graph builder and query tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest then build the token graph. Ingestion itself (`vt`/`none`
    /// sources) is out of this crate's scope; this builds over whatever is
    /// already present in the Detection Store.
    Build {
        #[arg(value_enum)]
        source: Source,
        path: Option<String>,
        #[arg(long)]
        preprocess_only: bool,
    },
    /// Run a query against the built graph.
    Run {
        #[command(subcommand)]
        query: RunQuery,
    },
    /// Graph dump/mirror naming helpers. The underlying subprocess
    /// orchestration targets a different persistence engine and is out of
    /// scope; these act on the pure naming/sorting logic only.
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum Source {
    Vt,
    None,
}

#[derive(Subcommand, Debug)]
enum RunQuery {
    /// Print the representative token (or ranked list) for a set of labels.
    Select {
        labels: Vec<String>,
        #[arg(long)]
        top_n: Option<usize>,
        #[arg(long)]
        weight_param: Option<f64>,
        #[arg(long)]
        general_param: Option<f64>,
    },
    /// Print the relation record between two tokens, or "no match".
    Compare { t1: String, t2: String },
    /// Print the related-tokens record for a token.
    Similar { t: String },
}

#[derive(Subcommand, Debug)]
enum MigrateAction {
    /// Compute a dump database name from a base name and date range
    /// (`YYYY-MM-DD` for both bounds).
    GetNewDumpedGraphName {
        base: String,
        min_date: String,
        max_date: String,
    },
    /// Sort a list of candidate graph names newest-first.
    GetDumpedGraphNames { names: Vec<String> },
    /// Out of scope: targets a different persistence engine than this
    /// crate's cozo-backed store.
    DumpGraph,
    /// Out of scope: targets a different persistence engine than this
    /// crate's cozo-backed store.
    PullDumpedGraph,
}

fn main() {
    init_tracing();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let cli = Cli::parse();
    if let Err(e) = run(cli, &config) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Build { source, path, preprocess_only } => {
            info!(?source, ?path, preprocess_only, "build requested");
            let store = CozoStore::open_in_memory()?;
            let builder = Builder::new(&store, &store, config.intersection_ratio);
            let report = builder.build_graph()?;
            println!(
                "scanned={} nodes={} edges={} pruned={}",
                report.detections_scanned, report.nodes_written, report.edges_written, report.nodes_pruned
            );
        }
        Command::Run { query } => {
            let store = CozoStore::open_in_memory()?;
            let searcher = Searcher::load(&store, &store, config.intersection_ratio)?;
            match query {
                RunQuery::Select { labels, top_n, weight_param, general_param } => {
                    let opts = RepresentativeTokenOptions {
                        weight_param: weight_param.unwrap_or(config.weight_param),
                        general_param: general_param.unwrap_or(config.general_param),
                        ..Default::default()
                    };
                    match top_n {
                        Some(n) => {
                            for scored in searcher.representative_tokens_top_n(&labels, Some(n), &opts) {
                                println!("{}\t{:.4}", scored.token, scored.score);
                            }
                        }
                        None => match searcher.representative_token(&labels, &opts) {
                            Some(scored) => println!("{}", scored.token),
                            None => println!("(none)"),
                        },
                    }
                }
                RunQuery::Compare { t1, t2 } => match searcher.compare_tokens(&t1, &t2)? {
                    Some(cmp) => println!(
                        "{} {} {} p({t1}|{t2})={:.4} p({t2}|{t1})={:.4} intersection={}",
                        t1,
                        cmp.relation.symbol(),
                        t2,
                        cmp.p_a_given_b,
                        cmp.p_b_given_a,
                        cmp.intersection_row_count
                    ),
                    None => println!("no match"),
                },
                RunQuery::Similar { t } => {
                    let related = searcher.get_related_tokens(&t)?;
                    println!("supersets: {:?}", related.supersets);
                    println!("subsets: {:?}", related.subsets);
                    println!("equalsets: {:?}", related.equalsets);
                }
            }
        }
        Command::Migrate { action } => match action {
            MigrateAction::GetNewDumpedGraphName { base, min_date, max_date } => {
                let min = parse_date(&min_date)?;
                let max = parse_date(&max_date)?;
                println!("{}", format_dump_name(&base, min, max));
            }
            MigrateAction::GetDumpedGraphNames { names } => {
                for name in sort_graph_names(names) {
                    println!("{name}");
                }
            }
            MigrateAction::DumpGraph | MigrateAction::PullDumpedGraph => {
                println!("out of scope for the cozo-backed store");
            }
        },
    }
    Ok(())
}

fn parse_date(s: &str) -> Result<chrono::DateTime<chrono::Utc>, Box<dyn std::error::Error>> {
    let naive = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")?;
    Ok(naive.and_hms_opt(0, 0, 0).unwrap().and_utc())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
