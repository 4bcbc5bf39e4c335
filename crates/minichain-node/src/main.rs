use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use minichain_core::{chain::Ledger, mine, Block, LedgerError, Transaction};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Leading zero hex characters required of a valid proof
    #[arg(long, default_value_t = minichain_core::POW_DIFFICULTY)]
    difficulty: u32,
}

#[derive(Clone)]
struct AppState {
    ledger: Arc<Ledger>,
    node_id: String,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Deserialize)]
struct TxIn {
    sender: String,
    recipient: String,
    amount: u64,
}

#[derive(Serialize)]
struct TxAccepted {
    message: String,
    index: u64,
}

#[derive(Serialize)]
struct Mined {
    message: &'static str,
    index: u64,
    transactions: Vec<Transaction>,
    proof: u64,
    previous_hash: String,
}

#[derive(Serialize)]
struct FullChain {
    chain: Vec<Block>,
    length: usize,
}

struct ApiError(LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
            // Another seal won the race between proof search and seal.
            LedgerError::StaleProof { .. } => StatusCode::CONFLICT,
            LedgerError::EmptyChain => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn mine(State(state): State<AppState>) -> Result<Json<Mined>, ApiError> {
    let ledger = state.ledger.clone();
    let node_id = state.node_id.clone();

    // The proof search is CPU-bound; run it on a blocking worker so the
    // runtime keeps serving submissions while it grinds.
    let block = tokio::task::spawn_blocking(move || mine::mine_next_block(&ledger, &node_id))
        .await
        .expect("mining task panicked")?;

    Ok(Json(Mined {
        message: "New block forged",
        index: block.index,
        transactions: block.transactions,
        proof: block.proof,
        previous_hash: block.previous_hash,
    }))
}

async fn new_transaction(
    State(state): State<AppState>,
    Json(tx): Json<TxIn>,
) -> Result<(StatusCode, Json<TxAccepted>), ApiError> {
    let index = state
        .ledger
        .submit_transaction(&tx.sender, &tx.recipient, tx.amount)?;
    Ok((
        StatusCode::CREATED,
        Json(TxAccepted {
            message: format!("Transaction will be added to block {index}"),
            index,
        }),
    ))
}

async fn full_chain(State(state): State<AppState>) -> Json<FullChain> {
    let chain = state.ledger.chain();
    let length = chain.len();
    Json(FullChain { chain, length })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    // Process-wide node identity, used only as the reward recipient.
    let node_id = hex::encode(rand::thread_rng().gen::<[u8; 16]>());
    info!(%node_id, difficulty = args.difficulty, "starting node");

    let state = AppState {
        ledger: Arc::new(Ledger::with_difficulty(args.difficulty)),
        node_id,
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/mine", get(mine))
        .route("/transactions/new", post(new_transaction))
        .route("/chain", get(full_chain))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = args.listen.parse()?;
    info!("minichain-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
