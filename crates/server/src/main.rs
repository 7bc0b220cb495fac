use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use sho_common::{DEFAULT_DB_PATH, DEFAULT_HOST, DEFAULT_PORT, MAX_CONNECTIONS, SWEEP_INTERVAL_SECS};
use sho_server::{Handler, html, serve};
use sho_storage::{ExpirySweeper, MappingCoordinator, MappingStore, MemoryStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "sho-server", about = "sho — redirecionador de URLs")]
struct Args {
    /// Interface onde escutar
    #[arg(long, short = 'i', default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, short, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Arquivo SQLite com os mapeamentos
    #[arg(long, short, value_name = "FILE", default_value = DEFAULT_DB_PATH)]
    db: PathBuf,
    /// Mantém os mapeamentos só em memória (nada é gravado em disco)
    #[arg(long)]
    in_memory: bool,
    /// Segundos entre varreduras de mapeamentos expirados
    #[arg(long, default_value_t = SWEEP_INTERVAL_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    sweep_interval: u64,
    /// HTML servido em /index.html
    #[arg(long, value_name = "FILE")]
    landing: Option<PathBuf>,
    #[arg(long, default_value_t = MAX_CONNECTIONS)]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sho_server=info,sho_storage=info".into()),
        )
        .init();

    let args = Args::parse();

    let landing_page = match args.landing {
        Some(ref path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("não foi possível ler a página inicial {path:?}"))?,
        None => html::default_landing_page(),
    };

    if args.in_memory {
        warn!("modo em memória: os mapeamentos somem quando o processo terminar");
        run(MemoryStore::new(), &args, landing_page).await
    } else {
        let store = SqliteStore::open(&args.db)
            .await
            .with_context(|| format!("não foi possível abrir o banco {:?}", args.db))?;
        let result = run(store.clone(), &args, landing_page).await;
        store.close().await;
        result
    }
}

async fn run<S: MappingStore>(store: S, args: &Args, landing_page: String) -> anyhow::Result<()> {
    store.initialize().await?;

    let sweeper = ExpirySweeper::start(store.clone(), Duration::from_secs(args.sweep_interval));
    let handler = Handler::new(MappingCoordinator::new(store), landing_page);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("sho escutando em {addr}");

    serve(listener, handler, args.max_connections, async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("falha ao instalar handler de Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    })
    .await;

    sweeper.shutdown().await;
    info!("servidor encerrado");
    Ok(())
}
