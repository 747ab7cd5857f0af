// check_systemd - Nagios / Icinga monitoring plugin for systemd
// Main entry point

use check_systemd::check;
use check_systemd::cli::Cli;
use check_systemd::config::Config;
use check_systemd::error::Result;
use check_systemd::options::Options;
use check_systemd::report::{render_error, Report, Severity};
use check_systemd::systemd::select_source;
use check_systemd::version::build_info;
use clap::Parser;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Usage errors must not exit with 2, the supervisor reads that as CRITICAL
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(Severity::Unknown.exit_code())
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Handle version flag
    if cli.version {
        println!("{}", build_info().format_detailed());
        return ExitCode::SUCCESS;
    }

    // Handle build info flag
    if cli.build_info {
        println!("{}", build_info().format_display());
        println!("\n{}", build_info().format_build_info());
        return ExitCode::SUCCESS;
    }

    init_logging(cli.debug);

    match execute(&cli).await {
        Ok(report) => {
            println!("{}", report.render(cli.verbose));
            ExitCode::from(report.exit_code())
        }
        Err(e) => {
            tracing::debug!("Check aborted: {:?}", e);
            println!("{}", render_error(&e));
            ExitCode::from(Severity::Unknown.exit_code())
        }
    }
}

async fn execute(cli: &Cli) -> Result<Report> {
    let config = Config::load(cli.config.clone())?;
    let options = Options::resolve(cli, &config)?;
    let source = select_source(options.data_source).await;
    check::run(source.as_ref(), &options).await
}

/// Log to stderr, stdout is reserved for the plugin output
fn init_logging(debug: u8) {
    let level = match debug {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to initialize logging: {}", e);
    }
}
