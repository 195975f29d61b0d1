use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

/// Verifies that a Kafka producer can publish a message that a consumer receives.
#[derive(Debug, Parser)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub(crate) command: Command,

    /// Absolute path to the kubeconfig file. In-cluster config is used when omitted.
    #[clap(long, global = true)]
    pub(crate) kubeconfig: Option<PathBuf>,

    /// Namespace where the Kafka cluster is deployed
    #[clap(short, long, global = true)]
    pub(crate) namespace: Option<String>,

    /// Name of the Kafka cluster
    #[clap(long, global = true)]
    pub(crate) kafka_cluster_name: Option<String>,

    /// Job completion timeout in seconds
    #[clap(long, global = true)]
    pub(crate) timeout: Option<u64>,

    /// Optional YAML settings file
    #[clap(short, long, global = true)]
    pub(crate) config: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub(crate) enum Command {
    /// Run the producer/consumer scenario against the cluster
    Run {},

    /// Print the producer and consumer Job manifests without contacting the cluster
    Render {
        /// Kafka image the jobs would run
        #[clap(long)]
        image: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "kafka_smoke",
            "run",
            "--namespace",
            "ns1",
            "--timeout",
            "30",
        ])
        .unwrap();

        assert!(matches!(cli.command, Command::Run {}));
        assert_eq!(cli.namespace.as_deref(), Some("ns1"));
        assert_eq!(cli.timeout, Some(30));
        assert!(cli.kubeconfig.is_none());
    }

    #[test]
    fn test_render_requires_image() {
        assert!(Cli::try_parse_from(["kafka_smoke", "render"]).is_err());
    }
}
