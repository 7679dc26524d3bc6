use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trellis::api::{self, AppState};
use trellis::client::RegistryClient;
use trellis::registry::{Registry, RegistryHandle};
use trellis::render;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Path-addressed model registry with a live HTTP mirror")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the trellis server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// List every path in a running registry
    Keys {
        /// Limit the listing to the children of this node
        path: Option<String>,
    },
    /// Fetch a node's resolved field values
    Values { path: String },
    /// Render the key hierarchy as an ASCII tree
    Tree {
        /// Root of the rendered hierarchy (whole tree when omitted)
        path: Option<String>,
    },
    /// Follow registry events as they happen
    Watch,
}

/// Initialize tracing with output to stderr (for query modes) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "trellis=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // Query modes: log to stderr so stdout is clean for output
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn serve(port: u16) -> anyhow::Result<()> {
    tracing::info!("Starting trellis server on port {}", port);

    let registry = RegistryHandle::new(Registry::new());
    let app = api::create_router(AppState::new(registry));

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("trellis server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Query modes need stderr for logging since stdout is the result channel
    let use_stderr = !matches!(cli.command, Some(Commands::Serve { .. }) | None);
    init_tracing(use_stderr);

    match cli.command {
        Some(Commands::Serve { port }) => serve(port).await?,
        Some(Commands::Keys { path }) => {
            let client = RegistryClient::from_env();
            let keys = match path {
                Some(p) => client.children(&p).await?,
                None => client.keys().await?,
            };
            for key in keys {
                println!("{key}");
            }
        }
        Some(Commands::Values { path }) => {
            let client = RegistryClient::from_env();
            let values = client.values(&path).await?;
            println!("{}", serde_json::to_string_pretty(&values)?);
        }
        Some(Commands::Tree { path }) => {
            let client = RegistryClient::from_env();
            let tree = client.tree(path.as_deref()).await?;
            print!("{}", render::render_tree(&tree));
        }
        Some(Commands::Watch) => {
            let client = RegistryClient::from_env();
            client.watch(|event| println!("{event}")).await?;
        }
        None => {
            // Default: start server
            serve(3000).await?;
        }
    }

    Ok(())
}
