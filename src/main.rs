use camber::cli::{Cli, Commands};
use clap::Parser;
use miette::Result;

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

    match cli.command {
        Commands::Init(args) => camber::cli::commands::init::run(args),
        Commands::Parts(cmd) => camber::cli::commands::parts::run(cmd, &global),
        Commands::Task(cmd) => camber::cli::commands::task::run(cmd, &global),
        Commands::Infer(args) => camber::cli::commands::infer::run(args, &global),
        Commands::Review(cmd) => camber::cli::commands::review::run(cmd, &global),
        Commands::Report(cmd) => camber::cli::commands::report::run(cmd, &global),
        Commands::Pattern(cmd) => camber::cli::commands::pattern::run(cmd, &global),
    }
}
