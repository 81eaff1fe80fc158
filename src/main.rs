//! Network Speed Tester - Main CLI Application
//!
//! Measures download throughput, upload throughput and latency against a
//! speed test server over a series of cycles.

use clap::Parser;
use network_speed_tester::{app::App, cli::Cli, error::ErrorReporter};
use std::process;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(99);
    }));

    let cli = Cli::parse();
    let reporter = ErrorReporter::new(!cli.no_color && !cli.json, cli.verbose || cli.debug);

    let result = match App::new(cli) {
        Ok(app) => app.run().await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        reporter.report_error(&e);
        process::exit(e.exit_code());
    }
}
