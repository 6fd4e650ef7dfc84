use clap::Parser;
use intake::cli::{Cli, Commands, GlobalOpts};
use intake::core::Config;
use miette::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    let config = Config::load();
    init_logging(&global, &config);

    match cli.command {
        Commands::New(args) => intake::cli::commands::new::run(args, &global, &config),
        Commands::Steps(args) => intake::cli::commands::steps::run(args, &global),
        Commands::Check(args) => intake::cli::commands::check::run(args, &global),
        Commands::Submit(args) => intake::cli::commands::submit::run(args, &global, &config),
        Commands::Draft(cmd) => intake::cli::commands::draft::run(cmd, &global, &config),
        Commands::Config(cmd) => intake::cli::commands::config::run(cmd, &global, &config),
        Commands::Completions(args) => intake::cli::commands::completions::run(args),
    }
}

/// Logs go to stderr; `INTAKE_LOG` takes a full filter directive and wins
/// over `--verbose` and the configured level
fn init_logging(global: &GlobalOpts, config: &Config) {
    let filter = EnvFilter::try_from_env("INTAKE_LOG").unwrap_or_else(|_| {
        let level = if global.verbose {
            "debug"
        } else {
            config.log_level.as_deref().unwrap_or("warn")
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
