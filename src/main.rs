use dotenvy::dotenv;
use homework_hint_bot::bot::handlers::Command;
use homework_hint_bot::bot::{self, CallbackRouter};
use homework_hint_bot::config::Settings;
use homework_hint_bot::content::KompegeClient;
use homework_hint_bot::conversation::{
    ConversationEngine, InMemorySessionStore, StepTable, WizardEffects,
};
use homework_hint_bot::llm::{DisabledGenerator, HintGenerator, OpenAiCompatGenerator};
use homework_hint_bot::review::ReviewService;
use homework_hint_bot::storage::SqliteStore;
use homework_hint_bot::tutor::TutorService;
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{error, info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting sensitive data
struct RedactionPatterns {
    token1: Regex,
    token2: Regex,
    token3: Regex,
    api_key: Regex,
    bearer: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token1: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token2: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token3: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
            api_key: Regex::new(r"sk-[A-Za-z0-9_-]{16,}")?,
            bearer: Regex::new(r"(Bearer\s+)[A-Za-z0-9._-]+")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token1
            .replace_all(&output, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token2
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token3
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output = self.api_key.replace_all(&output, "[API_KEY]").to_string();
        output = self.bearer.replace_all(&output, "$1[MASKED]").to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // The caller's buffer was consumed even if the redacted length differs.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    // Redaction must be ready before the first log line
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);
    init_logging(patterns);

    info!("Starting homework hint bot...");

    let settings = init_settings();
    let store = init_storage(&settings);

    let content = Arc::new(KompegeClient::new(
        settings.content_api_url.clone(),
        settings.http_timeout(),
    ));
    let generator = init_generator(&settings);

    let tutor = Arc::new(TutorService::new(
        store.clone(),
        content.clone(),
        generator,
        settings.http_timeout(),
    ));
    let review = Arc::new(ReviewService::new(
        store.clone(),
        content,
        settings.homework_url.clone(),
    ));

    let engine = Arc::new(ConversationEngine::new(
        Arc::new(InMemorySessionStore::new(settings.session_idle())),
        init_step_table(),
        Arc::new(WizardEffects::new(store, tutor.clone())),
        settings.clone(),
        settings.effect_timeout(),
    ));
    let router = Arc::new(CallbackRouter::new(
        engine.clone(),
        review,
        tutor,
        settings.clone(),
    ));

    let bot = Bot::new(settings.bot_token.clone());
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine, router, settings])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_storage(settings: &Settings) -> Arc<SqliteStore> {
    match SqliteStore::open(&settings.db_path) {
        Ok(s) => {
            info!("Database opened at {}.", settings.db_path);
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to open database {}: {}", settings.db_path, e);
            std::process::exit(1);
        }
    }
}

fn init_generator(settings: &Settings) -> Arc<dyn HintGenerator> {
    match settings.openrouter_api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => {
            info!(model = %settings.llm_model, "Hint generator initialized.");
            Arc::new(OpenAiCompatGenerator::new(
                key.to_string(),
                settings.llm_base_url.clone(),
                settings.llm_model.clone(),
            ))
        }
        _ => {
            warn!("OPENROUTER_API_KEY is not set, generated hints are disabled.");
            Arc::new(DisabledGenerator)
        }
    }
}

fn init_step_table() -> StepTable {
    match StepTable::build() {
        Ok(table) => table,
        Err(e) => {
            error!("Invalid wizard definitions: {}", e);
            std::process::exit(1);
        }
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text),
                ),
        )
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    engine: Arc<ConversationEngine>,
    settings: Arc<Settings>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_command(bot, msg, cmd, engine, settings).await {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    engine: Arc<ConversationEngine>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_text(bot, msg, engine).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    router: Arc<CallbackRouter>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::callbacks::handle_callback(bot, q, router).await {
        error!("Callback handler error: {}", e);
    }
    respond(())
}
