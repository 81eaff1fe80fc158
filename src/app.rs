//! Main application orchestration and execution

use crate::{
    cli::Cli,
    client::HttpTransport,
    config::{display_config_summary, load_config, validate_config, EnvManager},
    error::{AppError, Result},
    executor::SpeedTestExecutor,
    logging::Logger,
    models::{Config, SeriesReport},
    output::{OutputCoordinator, OutputFormatterFactory},
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Main application struct that coordinates all components
pub struct App {
    cli: Cli,
}

impl App {
    pub fn new(cli: Cli) -> Result<Self> {
        cli.validate().map_err(AppError::validation)?;
        Ok(Self { cli })
    }

    /// Run the application
    pub async fn run(self) -> Result<()> {
        if self.cli.env_example {
            print!("{}", EnvManager::create_example_env_content());
            return Ok(());
        }

        let config = load_config(self.cli.clone())?;
        let warnings = validate_config(&config)?;
        let coordinator = coordinator_for(&config);

        if !config.json_output {
            println!(
                "{}",
                coordinator.display_header(&format!("Network Speed Tester v{}", crate::VERSION))?
            );
        }

        // Warnings and diagnostics go to stderr so stdout stays parseable
        for warning in &warnings {
            eprintln!("{}", warning.format(config.enable_color && !config.json_output));
        }
        if config.debug {
            eprintln!(
                "Build: {} ({}, {})",
                env!("GIT_COMMIT"),
                env!("BUILD_TIME"),
                env!("TARGET_TRIPLE")
            );
            eprintln!("\nConfiguration Summary:\n{}\n", display_config_summary(&config));
        }

        let report = run_session(&config, &coordinator).await?;
        println!("{}", coordinator.display_report(&report)?);

        if report.summary.completed_cycles == 0 {
            return Err(AppError::measurement(format!(
                "None of the {} cycles produced a measurement; check the server address and rate limits",
                report.points.len()
            )));
        }

        Ok(())
    }
}

fn coordinator_for(config: &Config) -> OutputCoordinator {
    if config.json_output {
        OutputCoordinator::json()
    } else {
        OutputCoordinator::new(OutputFormatterFactory::create_formatter(
            config.enable_color,
            config.verbose || config.debug,
        ))
    }
}

/// Run a full series against the configured server, printing progress as it arrives
pub async fn run_session(config: &Config, coordinator: &OutputCoordinator) -> Result<SeriesReport> {
    let logger = Arc::new(Logger::with_config(crate::PKG_NAME, config));
    let transport = Arc::new(HttpTransport::from_config(config)?);
    let mut executor = SpeedTestExecutor::from_config(config, transport, logger);

    let (tx, mut rx) = mpsc::unbounded_channel();

    // The sender is dropped when the series ends, which closes the channel
    let series = executor.run_series(Some(tx));
    let printer = async {
        while let Some(event) = rx.recv().await {
            match coordinator.display_progress(&event) {
                Ok(Some(line)) => println!("{}", line),
                Ok(None) => {}
                Err(e) => eprintln!("{}", e),
            }
        }
    };

    let (report, ()) = tokio::join!(series, printer);
    report
}
