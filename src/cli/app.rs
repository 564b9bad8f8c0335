// ABOUTME: Main application orchestration for the epochgraph CLI
// ABOUTME: Coordinates between CLI arguments, configuration, and command execution

use anyhow::Result;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use super::commands;
use super::{Args, Commands, Config};

pub struct App {
    config: Config,
}

impl App {
    /// Create a new application instance
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Initialize logging based on configuration. Logs go to stderr so
    /// stdout stays reserved for the epoch log.
    pub fn init_logging(&self, verbose: bool, no_color: bool) -> Result<()> {
        let env_filter = self.env_filter(verbose);

        match self.config.logging.format.as_str() {
            "compact" => {
                tracing_subscriber::fmt()
                    .compact()
                    .with_env_filter(env_filter)
                    .with_ansi(!no_color)
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .init();
            }
            _ => {
                tracing_subscriber::fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(!no_color)
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .init();
            }
        }

        debug!("Logging initialized");
        Ok(())
    }

    /// `--verbose` always means debug. Otherwise `RUST_LOG` overrides the
    /// configured level.
    fn env_filter(&self, verbose: bool) -> EnvFilter {
        if verbose {
            return EnvFilter::new("debug");
        }

        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.logging.level))
    }

    /// Run the application with parsed arguments
    pub async fn run(&self, args: Args) -> Result<()> {
        self.init_logging(args.verbose, args.no_color)?;

        info!("Starting epochgraph v{}", crate::VERSION);
        debug!("Configuration loaded from: {:?}", args.config);

        match args.command {
            Commands::Run {
                graph,
                epochs,
                timeout,
                format,
                output,
            } => commands::run_graph(graph, epochs, timeout, format, output, &self.config).await,

            Commands::Validate { graph, strict } => {
                commands::validate_graph(graph, strict, &self.config).await
            }

            Commands::Serve { graph, bind } => {
                commands::serve_graph(graph, bind, &self.config).await
            }

            Commands::Init {
                name,
                output_dir,
                template,
            } => commands::init_graph(name, output_dir, template, &self.config).await,
        }
    }

    /// Create application from parsed arguments
    pub fn from_args(args: &Args) -> Result<Self> {
        let config = Config::load(args.config.clone())?;
        Ok(Self::new(config))
    }
}
