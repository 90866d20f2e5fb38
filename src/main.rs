use clap::Parser;
use miette::Result;
use dfm::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior so piping into `head` exits quietly
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
    dfm::logging::init(global.verbose);

    match cli.command {
        Commands::Init(args) => dfm::cli::commands::init::run(args, &global),
        Commands::Analyze(args) => dfm::cli::commands::analyze::run(args, &global),
        Commands::Batch(args) => dfm::cli::commands::batch::run(args, &global),
        Commands::Features(args) => dfm::cli::commands::features::run(args, &global),
        Commands::Cost(args) => dfm::cli::commands::cost::run(args, &global),
        Commands::Processes(args) => dfm::cli::commands::processes::run(args, &global),
        Commands::Cache(cmd) => dfm::cli::commands::cache::run(cmd, &global),
        Commands::Rules(cmd) => dfm::cli::commands::rules::run(cmd, &global),
        Commands::Config(cmd) => dfm::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => dfm::cli::commands::completions::run(args),
    }
}
