use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use vendor_onboard::agent::{AgentDeps, VendorAgent};
use vendor_onboard::config::AppConfig;
use vendor_onboard::llm::{ChatMessage, create_provider};
use vendor_onboard::onboarding::prompts::AGENT_NAME;
use vendor_onboard::onboarding::{
    InMemorySessionStore, OnboardingRouteState, Progress, SessionStore, WELCOME_MESSAGE,
    new_session_id, onboarding_routes,
};
use vendor_onboard::retrieval::{
    DirectorySeeder, EmbeddingProvider, OpenAiEmbeddings, PineconeIndex, Retriever, SeedOutcome,
    ServerlessSpec, embedding_dimension, load_directory,
};
use vendor_onboard::telemetry::{Telemetry, TracingSink};
use vendor_onboard::tools::{ToolExecutor, ToolKind, ToolRegistry};

/// Pause between upload and the test query so new vectors become searchable.
const INDEX_SETTLE_DELAY: Duration = Duration::from_secs(10);
const TEST_QUERY_TOP_K: usize = 3;

#[derive(Parser)]
#[command(name = "vendor-onboard", about = "Vendor onboarding assistant", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive onboarding chat (default)
    Chat,

    /// Load the company directory into the vector index
    Seed {
        /// Directory holding the .md and .txt source files
        #[arg(short, long, default_value = "company_directory")]
        dir: PathBuf,

        /// Upload even when the namespace already holds vectors
        #[arg(short, long)]
        force: bool,

        /// Query run against the index after loading
        #[arg(long, default_value = "security consulting services")]
        test_query: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat(config).await,
        Command::Seed {
            dir,
            force,
            test_query,
        } => seed(config, &dir, force, &test_query).await,
    }
}

async fn seed(config: AppConfig, dir: &Path, force: bool, test_query: &str) -> anyhow::Result<()> {
    let documents = load_directory(dir)
        .await
        .context("Failed to load the company directory")?;
    eprintln!("📂 Loaded {} documents from {}", documents.len(), dir.display());

    let embeddings = Arc::new(OpenAiEmbeddings::new(
        &config.llm.base_url,
        config.llm.api_key.clone(),
        &config.retrieval.embedding_model,
    ));
    let dimension = match embedding_dimension(embeddings.model()) {
        Some(dimension) => dimension,
        None => embeddings
            .embed("dimension check")
            .await
            .context("Failed to embed a sample text")?
            .len(),
    };
    let index = Arc::new(
        PineconeIndex::connect_or_create(
            &config.retrieval.index_name,
            config.retrieval.pinecone_api_key.clone(),
            dimension,
            &ServerlessSpec::default(),
        )
        .await
        .context("Failed to set up the company directory index")?,
    );

    let outcome = DirectorySeeder::new(embeddings.clone(), index.clone())
        .seed(&documents, force)
        .await
        .context("Failed to upload the company directory")?;
    match outcome {
        SeedOutcome::Skipped { existing } => {
            eprintln!("⏭️  Index already holds {} vectors; use --force to reload", existing);
        }
        SeedOutcome::Uploaded { documents, chunks } => {
            eprintln!("✅ Uploaded {} chunks from {} documents", chunks, documents);
            tokio::time::sleep(INDEX_SETTLE_DELAY).await;
        }
    }

    let retriever = Retriever::new(embeddings, index);
    let results = retriever
        .retrieve(test_query, TEST_QUERY_TOP_K, &Telemetry::new(Arc::new(TracingSink)))
        .await
        .unwrap_or_default();
    println!("\nTest query: '{}'", test_query);
    println!("Found {} relevant chunks:", results.len());
    for (i, document) in results.iter().enumerate() {
        let preview: String = document.content.chars().take(200).collect();
        let source = document
            .metadata
            .get("source")
            .and_then(|s| s.as_str())
            .unwrap_or("Unknown");
        println!("\n{}. {}...", i + 1, preview);
        println!("   Source: {}", source);
    }
    Ok(())
}

async fn chat(config: AppConfig) -> anyhow::Result<()> {
    eprintln!("🤖 {} v{}", AGENT_NAME, env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Index: {}", config.retrieval.index_name);

    // ── LLM + retrieval ─────────────────────────────────────────────────
    let llm = create_provider(&config.llm).context("Failed to create LLM provider")?;

    let embeddings = OpenAiEmbeddings::new(
        &config.llm.base_url,
        config.llm.api_key.clone(),
        &config.retrieval.embedding_model,
    );
    let index = PineconeIndex::connect(
        &config.retrieval.index_name,
        config.retrieval.pinecone_api_key.clone(),
    )
    .await
    .context("Failed to connect to the company directory index")?;
    let retriever = Arc::new(
        Retriever::new(Arc::new(embeddings), Arc::new(index)).with_top_k(config.retrieval.top_k),
    );

    // ── Sessions + tools ────────────────────────────────────────────────
    let store = Arc::new(InMemorySessionStore::new());
    let telemetry = Telemetry::new(Arc::new(TracingSink));
    let registry = ToolRegistry::vendor(store.clone(), retriever);
    eprintln!("   Tools: {} registered", registry.count());
    let tools = Arc::new(ToolExecutor::new(Arc::new(registry)));

    // ── Progress endpoint ───────────────────────────────────────────────
    if let Some(port) = config.http_port {
        let app = onboarding_routes(OnboardingRouteState {
            store: store.clone(),
        });
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
            .await
            .with_context(|| format!("Failed to bind progress server port {}", port))?;
        eprintln!(
            "   Progress API: http://0.0.0.0:{}/api/onboarding/{{session_id}}",
            port
        );
        tokio::spawn(async move {
            tracing::info!(port, "Progress server started");
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Progress server stopped: {}", e);
            }
        });
    }

    // ── Agent ───────────────────────────────────────────────────────────
    let session_id = new_session_id();
    let agent = VendorAgent::new(
        session_id.clone(),
        AgentDeps {
            llm,
            tools: tools.clone(),
            telemetry: telemetry.clone(),
        },
        config.system_prompt.clone(),
    );

    eprintln!("   Session: {}", session_id);
    eprintln!("   Commands: /progress, /summary, /quit\n");

    println!("\n{}\n", WELCOME_MESSAGE);
    // Only user and assistant turns are carried between calls.
    let mut history = vec![ChatMessage::assistant(WELCOME_MESSAGE)];

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprint!("> ");
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line.trim().to_string(),
            Ok(None) => break, // EOF
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                break;
            }
        };
        if line.is_empty() {
            eprint!("> ");
            continue;
        }

        match line.as_str() {
            "/quit" | "/exit" => break,
            "/progress" => {
                eprintln!("📋 {}", progress(store.as_ref(), &session_id).await);
            }
            "/summary" => {
                let summary = tools
                    .execute(
                        ToolKind::GetOnboardingSummary.name(),
                        &serde_json::json!({}),
                        &session_id,
                        &telemetry,
                    )
                    .await;
                println!("\n{}\n", summary);
            }
            _ => {
                history.push(ChatMessage::user(&line));
                let reply = agent.process_query(&history).await;
                println!("\n{}\n", reply);
                history.push(ChatMessage::assistant(reply));
                eprintln!("📋 {}", progress(store.as_ref(), &session_id).await);
            }
        }
        eprint!("> ");
    }

    tracing::info!(session_id = %session_id, "Session ended");
    Ok(())
}

async fn progress(store: &dyn SessionStore, session_id: &str) -> Progress {
    match store.get(session_id).await {
        Ok(Some(session)) => session.progress(),
        Ok(None) => Progress::empty(),
        Err(e) => {
            tracing::warn!(session_id = %session_id, "Failed to read session: {}", e);
            Progress::empty()
        }
    }
}
