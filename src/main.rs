use clap::{Parser, Subcommand};
use keymapping::config::QueryConfig;
use keymapping::source::select_platform_source;
use std::process;
use tracing::{error, info, Level};

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON query config; flags below override it.
    #[arg(global = true, short, long)]
    config: Option<String>,

    #[arg(global = true, long)]
    timeout_ms: Option<u64>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the key map of the active layout
    Keymap(cmd::keymap::KeymapArgs),
    /// Print the active layout's id and display name
    Layout(cmd::layout::LayoutArgs),
    /// Print only the active layout's display name
    LayoutName,
    /// Print whether the keyboard is ISO-shaped: true, false or unknown
    IsIso,
}

fn resolve_config(cli: &Cli) -> keymapping::KmResult<QueryConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("📂 Loading query config: {}", path);
            QueryConfig::load_from_file(path)?
        }
        None => QueryConfig::from_env(),
    };
    if let Some(ms) = cli.timeout_ms {
        config.timeout_ms = ms;
        config.validate()?;
    }
    Ok(config)
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .init();

    let config = resolve_config(&cli).unwrap_or_else(|e| {
        error!("{}", e);
        process::exit(1);
    });

    match select_platform_source() {
        Some(source) => {
            if let Err(e) = keymapping::install_source(source, config) {
                error!("❌ Cannot start keyboard source: {}", e);
                process::exit(1);
            }
        }
        None => info!("⚠️  No keyboard source for this platform; output will be empty."),
    }

    match cli.command {
        Commands::Keymap(args) => cmd::keymap::run(args),
        Commands::Layout(args) => cmd::layout::run(args),
        Commands::LayoutName => println!("{}", keymapping::get_current_keyboard_layout_name()),
        Commands::IsIso => match keymapping::is_iso_keyboard() {
            Some(iso) => println!("{}", iso),
            None => println!("unknown"),
        },
    }
}
