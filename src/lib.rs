use self::cli::{Cli, Command};
use self::config::Config;
use self::kubernetes_objects::cluster::KubeCluster;
use self::kubernetes_objects::workload::{Role, WorkloadSpec};
use self::routine::smoke::ScenarioContext;
use self::routine::smoke::error::ScenarioError;
use self::shutdown::Shutdown;
use clap::Parser;
use kube::config::{KubeConfigOptions, Kubeconfig};
use thiserror::Error;
use tracing::info;
use tracing_error::ExtractSpanTrace;
use tracing_error::SpanTrace;

pub(crate) mod cli;
pub mod config;
pub mod error;
pub(crate) mod kubernetes_objects;
pub(crate) mod poller;
pub(crate) mod routine;
pub mod shutdown;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to load config.\n{0}")]
    ConfigError(#[from] config::ConfigLoadError),

    #[error("Failed to read kubeconfig.\n{0}")]
    KubeconfigError(#[from] kube::config::KubeconfigError),

    #[error("Failed to initialize kubernetes client.\n{0}")]
    KubeClientError(#[from] kube::Error),

    #[error("Failed to render job manifests.\n{0}")]
    RenderError(#[from] serde_yaml::Error),

    #[error("Kafka scenario stopped due to following error:\n{0}")]
    ScenarioError(#[from] ScenarioError),
}

impl ExtractSpanTrace for AppError {
    fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            AppError::ScenarioError(e) => e.span_trace(),
            _ => None,
        }
    }
}

async fn kube_client(config: &Config) -> Result<kube::Client, AppError> {
    let client = match &config.kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)?;
            let client_config =
                kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await?;
            kube::Client::try_from(client_config)?
        }
        None => kube::Client::try_default().await?,
    };
    Ok(client)
}

fn render(config: &Config, image: &str) -> Result<String, AppError> {
    let documents = [Role::Producer, Role::Consumer]
        .into_iter()
        .map(|role| serde_yaml::to_string(&WorkloadSpec::new(role, image, config).manifest()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(documents.join("---\n"))
}

pub async fn app() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = Config::load(&cli).await?;

    info!("Config Loaded.");

    match cli.command {
        Command::Render { image } => {
            print!("{}", render(&config, &image)?);
        }
        Command::Run {} => {
            let client = kube_client(&config).await?;

            info!("Kubernetes Client Initialized.");

            let shutdown = Shutdown::with_deadline(config.deadline);
            let context = ScenarioContext::new(config, KubeCluster::new(client), shutdown);
            context.run().await?;
        }
    }

    Ok(())
}
