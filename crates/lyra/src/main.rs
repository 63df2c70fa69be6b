use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use lyra::{http::build_router, initialize, sign_fields, RootConfig, RootError, StoreConfig};
use lyra_core::FieldSet;

/// Lyra: Izipay / Micuentaweb payment gateway integration
///
/// Signs payment forms and processes gateway notifications.
#[derive(Parser, Debug)]
#[command(name = "lyra", version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a default configuration file
    Init {
        /// Shop identifier assigned by the gateway
        #[arg(long)]
        site_id: Option<String>,

        /// Keep transactions in a SQLite database
        #[arg(long)]
        sqlite: bool,
    },

    /// Start the HTTP server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        bind: Option<String>,

        /// Port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the signature of a JSON object of fields
    Sign {
        /// JSON file with a flat string-to-string object
        fields: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("lyra=debug,lyra_checkout=debug,lyra_notify=debug,lyra_store=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("lyra=info,lyra_checkout=info,lyra_notify=info,lyra_store=info")
        })
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(path: Option<&PathBuf>) -> Result<RootConfig, RootError> {
    match path {
        Some(p) => RootConfig::load(p),
        None => {
            let default_path = RootConfig::default_config_path();
            RootConfig::load(&default_path)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli).await;
    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), RootError> {
    match cli.command {
        Commands::Init { site_id, sqlite } => cmd_init(cli.config.as_ref(), site_id, sqlite),
        Commands::Serve { bind, port } => cmd_serve(cli.config.as_ref(), bind, port).await,
        Commands::Sign { fields } => cmd_sign(cli.config.as_ref(), &fields),
    }
}

fn cmd_init(
    config_path: Option<&PathBuf>,
    site_id: Option<String>,
    sqlite: bool,
) -> Result<(), RootError> {
    let mut config = load_config(config_path)?;

    if let Some(id) = site_id {
        config.gateway.site_id = id;
    }
    if sqlite {
        config.store = StoreConfig::Sqlite {
            path: RootConfig::default_database_path(),
        };
    }
    config.validate()?;

    let save_path = config_path
        .cloned()
        .unwrap_or_else(RootConfig::default_config_path);
    config.save(&save_path)?;
    info!(path = %save_path.display(), "configuration written");

    println!("Lyra initialized successfully.");
    println!("  Config:     {}", save_path.display());
    println!("  Mode:       {}", config.gateway.mode);
    println!("  Return URL: {}", config.server.return_url());
    println!("  IPN URL:    {}", config.server.notify_url());
    println!("Fill in the gateway credentials before accepting payments.");

    Ok(())
}

async fn cmd_serve(
    config_path: Option<&PathBuf>,
    bind: Option<String>,
    port: Option<u16>,
) -> Result<(), RootError> {
    let mut config = load_config(config_path)?;

    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let state = Arc::new(initialize(config)?);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "lyra listening");
    axum::serve(listener, router).await?;
    Ok(())
}

fn cmd_sign(config_path: Option<&PathBuf>, fields_path: &PathBuf) -> Result<(), RootError> {
    let config = load_config(config_path)?;
    let contents = std::fs::read_to_string(fields_path)?;
    let fields: FieldSet = serde_json::from_str(&contents)?;

    let signature = sign_fields(&config.gateway, &fields)?;
    println!("{}", signature);
    Ok(())
}
