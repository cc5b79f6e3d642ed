use clap::{Parser, Subcommand};
use k8s_openapi::api::core::v1::Pod;
use nettraffic_metrics::MetricSource;
use nettraffic_scheduler::network_traffic::NAME as NETWORK_TRAFFIC;
use nettraffic_scheduler::{default_registry, CycleState, NetworkTrafficArgs, SchedulerProfile};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "nettraffic", about = "Bandwidth-aware node scoring for pod scheduling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scoring cycle and print the final node scores
    Score {
        /// Path to the scheduler profile
        #[arg(long, env = "NETTRAFFIC_CONFIG")]
        config: PathBuf,
        /// Candidate node (repeat for each node)
        #[arg(long = "node", required = true)]
        nodes: Vec<String>,
        /// Name of the pod being placed
        #[arg(long, default_value = "nettraffic-pod")]
        pod: String,
        /// Namespace of the pod being placed
        #[arg(long, default_value = "default")]
        namespace: String,
    },
    /// Print the bandwidth query and the measured sample for one node
    Query {
        /// Path to the scheduler profile
        #[arg(long, env = "NETTRAFFIC_CONFIG")]
        config: PathBuf,
        /// Node to measure
        #[arg(long)]
        node: String,
    },
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Score {
            config,
            nodes,
            pod,
            namespace,
        } => run_score(&config, &nodes, &pod, &namespace).await,
        Commands::Query { config, node } => run_query(&config, &node).await,
    }
}

/// Score the candidate nodes with every plugin of the profile
async fn run_score(
    config: &Path,
    nodes: &[String],
    pod_name: &str,
    namespace: &str,
) -> miette::Result<()> {
    let profile = SchedulerProfile::from_file(config)?;
    info!(
        "Loaded profile {} from {}",
        profile.scheduler_name,
        config.display()
    );

    let runner = profile.build_runner(&default_registry()?)?;

    let mut pod = Pod::default();
    pod.metadata.name = Some(pod_name.to_string());
    pod.metadata.namespace = Some(namespace.to_string());

    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling scoring cycle");
            ctrl_c_token.cancel();
        }
    });

    let state = CycleState::new();
    let cycle = runner.run(&token, &state, &pod, nodes).await?;

    for entry in &cycle.scores {
        match cycle.failures.iter().find(|f| f.node_name == entry.name) {
            Some(failure) => println!(
                "{}\t{}\tineligible ({}: {})",
                entry.name, entry.score, failure.plugin, failure.status
            ),
            None => println!("{}\t{}", entry.name, entry.score),
        }
    }

    match cycle.best() {
        Some(best) => println!("selected\t{}", best.name),
        None => {
            return Err(miette::miette!(
                "No node could be scored for pod {}/{}",
                namespace,
                pod_name
            ))
        }
    }

    Ok(())
}

/// Measure a single node through the NetworkTraffic metric source
async fn run_query(config: &Path, node: &str) -> miette::Result<()> {
    let profile = SchedulerProfile::from_file(config)?;

    let args = profile.plugin_args(NETWORK_TRAFFIC).ok_or_else(|| {
        miette::miette!(
            "Profile {} does not enable the {} plugin",
            config.display(),
            NETWORK_TRAFFIC
        )
    })?;
    let args = NetworkTrafficArgs::from_value(args.clone())?;
    let source = MetricSource::new(args.scoring_config()?)?;

    println!("query\t{}", source.query_for(node));

    let sample = source.fetch_bandwidth(node).await?;
    println!(
        "{}\t{}\t{}",
        sample.node_name,
        sample.bytes_over_window,
        sample.timestamp.to_rfc3339()
    );

    Ok(())
}
