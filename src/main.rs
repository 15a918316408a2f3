use futures_util::StreamExt;
use iaris::cli::{Cli, Commands, ConfigAction};
use iaris::config::{Config, ConfigValidator};
use iaris::embedding::FastEmbedProvider;
use iaris::error::{IarisError, Result};
use iaris::llm::OpenAiClient;
use iaris::rag::{
    AnswerStream, PipelineSettings, QueryRequest, RagError, RagPipeline, RagResponse,
    DEFAULT_TEMPLATE,
};
use iaris::retrieval::{corpus_topics, load_chunks, SemanticIndex, TopicFilter};
use iaris::session::SessionManager;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Handle commands
    match cli.command {
        Commands::Ask {
            question,
            retriever_k,
            topics,
            no_stream,
            session,
        } => {
            let config = load_config(cli.config, cli.profile)?;
            let options = AskOptions {
                retriever_k,
                topics,
                stream: !no_stream,
                session,
            };
            cmd_ask(&config, &question, options).await?;
        }
        Commands::Chat { session } => {
            let config = load_config(cli.config, cli.profile)?;
            cmd_chat(&config, session).await?;
        }
        Commands::Topics => {
            let config = load_config(cli.config, cli.profile)?;
            cmd_topics(&config)?;
        }
        Commands::Sessions => {
            let config = load_config(cli.config, cli.profile)?;
            cmd_sessions(&config)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, cli.profile, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "iaris=debug" } else { "iaris=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // stdout carries only answers
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

struct AskOptions {
    retriever_k: Option<usize>,
    topics: Vec<String>,
    stream: bool,
    session: Option<String>,
}

/// Load the corpus, build the semantic index and connect the model
async fn build_pipeline(config: &Config) -> Result<RagPipeline> {
    let llm = OpenAiClient::new(config.openai_settings().map_err(RagError::from)?)
        .map_err(RagError::from)?;
    let settings = config.pipeline_settings()?;

    let chunks_file = config.chunks_file();
    let model = config.embedding.model.clone();
    let index_settings = config.index_settings();

    let (index, result) = tokio::task::spawn_blocking(move || -> Result<_> {
        let chunks = load_chunks(&chunks_file)?;
        let provider = FastEmbedProvider::new(&model)
            .map_err(|e| RagError::Retrieval(e.into()))?;
        let built = SemanticIndex::build(Arc::new(provider), chunks, &index_settings)
            .map_err(RagError::from)?;
        Ok(built)
    })
    .await
    .map_err(|e| IarisError::Other(anyhow::anyhow!("Index build task failed: {}", e)))??;

    tracing::info!(
        "Indexed {} chunks ({} failed) in {} ms",
        result.processed,
        result.failed,
        result.duration_ms
    );

    Ok(RagPipeline::new(Arc::new(index), Arc::new(llm)).with_settings(settings))
}

async fn cmd_ask(config: &Config, question: &str, options: AskOptions) -> Result<()> {
    let pipeline = build_pipeline(config).await?;
    let sessions = SessionManager::new(config.sessions_dir());

    let mut session = match options.session.as_deref() {
        Some(key) => Some(sessions.open_or_create(Some(key))?),
        None => None,
    };
    let history = session.as_ref().map(|s| s.history()).unwrap_or_default();

    let request = build_request(pipeline.settings(), question, history, &options);
    let response = pipeline.run(request).await?;

    let answer = print_response(response, options.stream).await?;

    if let Some(session) = session.as_mut() {
        session.record_exchange(question, answer);
        sessions.save_session(session)?;
    }

    Ok(())
}

fn build_request<'h>(
    settings: &PipelineSettings,
    question: &str,
    history: &'h [iaris::rag::ConversationTurn],
    options: &AskOptions,
) -> QueryRequest<'h> {
    let topic_filter = if options.topics.is_empty() {
        settings.topic_filter.clone()
    } else {
        Some(options.topics.iter().cloned().collect::<TopicFilter>())
    };

    QueryRequest {
        query: question.to_string(),
        retriever_k: options.retriever_k.unwrap_or(settings.retriever_k),
        topic_filter,
        prompt_template: settings.prompt_template.clone(),
        history,
        history_window: settings.history_window,
    }
}

async fn cmd_chat(config: &Config, session: Option<String>) -> Result<()> {
    let pipeline = build_pipeline(config).await?;
    let sessions = SessionManager::new(config.sessions_dir());
    let mut session = sessions.open_or_create(session.as_deref())?;

    println!("IARIS ({}). Linha vazia ou /exit para sair.", session.name);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush().ok();

        let line = lines.next_line().await.map_err(|e| IarisError::Io {
            source: e,
            context: "Failed to read from stdin".to_string(),
        })?;

        let query = match line {
            Some(line) => line.trim().to_string(),
            None => break,
        };
        if query.is_empty() || query == "/exit" {
            break;
        }

        let response = match pipeline.run_rag(&query, session.history()).await {
            Ok(response) => response,
            Err(e) => {
                eprintln!("✗ {}", e);
                continue;
            }
        };

        match print_response(response, true).await {
            Ok(answer) => {
                session.record_exchange(query, answer);
                sessions.save_session(&session)?;
            }
            Err(e) => eprintln!("\n✗ {}", e),
        }
    }

    println!("Sessão salva: {} ({})", session.name, session.id);
    Ok(())
}

/// Print the answer and its sources; returns the text shown to the user
async fn print_response(response: RagResponse, stream: bool) -> Result<String> {
    let RagResponse {
        answer_text,
        answer_stream,
        sources,
        ..
    } = response;

    let shown = if stream {
        print_stream(answer_stream).await?
    } else {
        println!("{}", answer_text);
        answer_text
    };

    if !sources.is_empty() {
        println!("\nFontes:");
        for (i, source) in sources.iter().enumerate() {
            let mut lines = source.lines().filter(|l| !l.is_empty());
            if let Some(first) = lines.next() {
                println!("  {}. {}", i + 1, first);
            }
            for line in lines {
                println!("     {}", line);
            }
        }
    }

    Ok(shown)
}

async fn print_stream(mut stream: AnswerStream) -> Result<String> {
    let mut text = String::new();
    let mut stdout = std::io::stdout();

    while let Some(fragment) = stream.next().await {
        let fragment = fragment.map_err(RagError::from)?;
        print!("{}", fragment);
        stdout.flush().ok();
        text.push_str(&fragment);
    }
    println!();

    Ok(text)
}

fn cmd_topics(config: &Config) -> Result<()> {
    let chunks = load_chunks(&config.chunks_file())?;
    let topics = corpus_topics(&chunks);

    if topics.is_empty() {
        println!("No subjects found in {}", config.chunks_file().display());
        return Ok(());
    }

    for topic in topics {
        println!("{}", topic);
    }
    Ok(())
}

fn cmd_sessions(config: &Config) -> Result<()> {
    let manager = SessionManager::new(config.sessions_dir());
    let sessions = manager.list_sessions()?;

    println!("Sessions: {} total", sessions.len());
    for session in sessions {
        println!(
            "  {} - {} exchanges (updated {}) [{}]",
            session.name,
            session.exchange_count(),
            session.updated_at.format("%Y-%m-%d %H:%M:%S"),
            session.id
        );
    }
    Ok(())
}

fn cmd_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path, profile)?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };

            let config = match Config::load(&path) {
                Err(IarisError::ConfigValidation { errors }) => {
                    for error in &errors {
                        println!("✗ {}: {}", error.path, error.message);
                    }
                    return Err(IarisError::ConfigValidation { errors });
                }
                other => other?,
            };
            if let Some(profile) = profile {
                let mut config = config.clone();
                config.apply_profile(&profile)?;
                ConfigValidator::validate(&config)?;
            }
            ConfigValidator::validate_credentials(&config)?;

            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            let mut config = Config::default();

            let template_path = path.with_file_name("prompt.txt");
            if force || !template_path.exists() {
                if let Some(parent) = template_path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| IarisError::Io {
                        source: e,
                        context: format!("Failed to create config directory: {:?}", parent),
                    })?;
                }
                std::fs::write(&template_path, DEFAULT_TEMPLATE).map_err(|e| IarisError::Io {
                    source: e,
                    context: format!("Failed to write prompt template: {:?}", template_path),
                })?;
            }
            config.prompt.template_file = Some(template_path.clone());
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
            println!("✓ Prompt template installed at: {}", template_path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'iaris config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        if let Some(profile) = profile {
            config.apply_profile(&profile)?;
        }
        ConfigValidator::validate(&config)?;
        return Ok(config);
    }

    if let Some(profile) = profile {
        Config::load_with_profile(&path, &profile)
    } else {
        Config::load(&path)
    }
}
