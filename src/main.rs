use clap::Parser;
use dom_analyzer::cli::commands::{cmd_analyze, cmd_diff, cmd_patterns, cmd_serve};
use dom_analyzer::cli::config::{Cli, Commands, load_config, log_filter};
use dom_analyzer::trace::logger::TraceLogger;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref());
    let tracer = match cli.trace.as_deref() {
        Some(path) => TraceLogger::new(path),
        None => TraceLogger::disabled(),
    };

    match cli.command {
        Commands::Analyze {
            input,
            baseline,
            output,
            session,
            deliver,
        } => {
            cmd_analyze(
                &input,
                baseline.as_deref(),
                output.as_deref(),
                session.as_deref(),
                deliver,
                &config,
                &tracer,
            )?;
        }
        Commands::Diff { before, after } => {
            cmd_diff(&before, &after, &config.analysis)?;
        }
        Commands::Patterns { input, library } => {
            cmd_patterns(&input, library.as_deref(), &config.analysis)?;
        }
        Commands::Serve { session } => {
            cmd_serve(session.as_deref(), &config)?;
        }
    }

    Ok(())
}
