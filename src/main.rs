use clap::{Arg, ArgMatches, Command, value_parser};
use interlinear::pipeline::{
    AggregationEngine, DEFAULT_LAYER, Lexicon, MemoryStore, PipelineError, ProviderKind,
    RunConfig, Scope, run, untranslated_report,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

fn scope_arg() -> Arg {
    Arg::new("scope")
        .help("Book code (e.g. GEN, JHN, 1CO) or ALL")
        .index(1)
        .default_value("ALL")
}

fn corpus_arg() -> Arg {
    Arg::new("corpus")
        .long("corpus")
        .short('c')
        .help("Corpus snapshot (JSON with books, verses, tokens)")
        .value_parser(value_parser!(PathBuf))
        .required(true)
}

fn data_dir_arg() -> Arg {
    Arg::new("data-dir")
        .long("data-dir")
        .short('d')
        .help("Directory containing glossary/ (greek.json, hebrew.json, keep_original.json, patterns.json)")
        .value_parser(value_parser!(PathBuf))
        .default_value(".")
}

fn cli() -> Command {
    Command::new("interlinear")
        .version("0.1.0")
        .about("Word-by-word Greek/Hebrew translation pipeline")
        .subcommand_required(true)
        .subcommand(
            Command::new("run")
                .about("Resolve untranslated tokens through keep-original, glossary, patterns and the AI service")
                .arg(scope_arg())
                .arg(corpus_arg())
                .arg(data_dir_arg())
                .arg(
                    Arg::new("config")
                        .long("config")
                        .help("JSON run configuration; flags override its values")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("batch-size")
                        .long("batch-size")
                        .short('b')
                        .help("Unique words per service call (default: 10)")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("provider")
                        .long("provider")
                        .short('p')
                        .help("Translation service: openai, ollama or mock"),
                )
                .arg(
                    Arg::new("model")
                        .long("model")
                        .short('m')
                        .help("Model name (default: gpt-4o / qwen2.5:14b)"),
                ),
        )
        .subcommand(
            Command::new("rebuild")
                .about("Rebuild verse texts from token translations")
                .arg(scope_arg())
                .arg(corpus_arg())
                .arg(
                    Arg::new("layer")
                        .long("layer")
                        .help("Layer tag to write")
                        .default_value(DEFAULT_LAYER),
                ),
        )
        .subcommand(
            Command::new("untranslated")
                .about("List unresolved words by frequency")
                .arg(scope_arg())
                .arg(corpus_arg())
                .arg(data_dir_arg()),
        )
}

fn path_arg(matches: &ArgMatches, name: &str) -> Result<PathBuf, String> {
    matches
        .get_one::<PathBuf>(name)
        .cloned()
        .ok_or_else(|| format!("missing --{}", name))
}

fn string_arg<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str, String> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| format!("missing {}", name))
}

/// Set the returned flag on Ctrl-C so the run stops after the current group
fn stop_on_ctrl_c() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing the current group and saving progress");
            flag.store(true, Ordering::SeqCst);
        }
    });
    stop
}

async fn run_command(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let corpus_path = path_arg(matches, "corpus")?;
    let data_dir = path_arg(matches, "data-dir")?;

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if matches.value_source("scope") == Some(clap::parser::ValueSource::CommandLine)
        || matches.get_one::<PathBuf>("config").is_none()
    {
        config.scope = string_arg(matches, "scope")?.to_string();
    }
    if let Some(batch_size) = matches.get_one::<usize>("batch-size") {
        config.batch_size = *batch_size;
    }
    if let Some(provider) = matches.get_one::<String>("provider") {
        config.service.provider = provider.parse::<ProviderKind>()?;
    }
    if let Some(model) = matches.get_one::<String>("model") {
        config.service.model = Some(model.clone());
    }
    config.service.fill_from_env();

    let translator = config.service.build_translator()?;
    let store = MemoryStore::load_json(&corpus_path)?;
    let mut lexicon = Lexicon::load(&data_dir)?;

    let stats = run(&config, &mut lexicon, &store, translator.as_ref(), stop_on_ctrl_c()).await?;

    store.save_json(&corpus_path)?;
    println!("{}", stats);
    Ok(())
}

async fn rebuild_command(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let corpus_path = path_arg(matches, "corpus")?;
    let scope = Scope::parse(string_arg(matches, "scope")?)?;
    let store = MemoryStore::load_json(&corpus_path)?;
    scope.validate(&store).await?;

    let stats = AggregationEngine::new(&store, &store)
        .with_layer(string_arg(matches, "layer")?)
        .rebuild_scope(&scope)
        .await?;

    store.save_json(&corpus_path)?;
    println!(
        "Rebuilt {} verses ({} without tokens, {} errors)",
        stats.updated, stats.skipped, stats.errors
    );
    Ok(())
}

async fn untranslated_command(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let corpus_path = path_arg(matches, "corpus")?;
    let data_dir = path_arg(matches, "data-dir")?;
    let scope = Scope::parse(string_arg(matches, "scope")?)?;
    let store = MemoryStore::load_json(&corpus_path)?;
    scope.validate(&store).await?;
    let lexicon = Lexicon::load(&data_dir)?;

    let report =
        untranslated_report(&store, &scope, &lexicon.keep_original, &lexicon.glossaries).await?;
    println!("{}", report);
    Ok(())
}

/// Exit status for a command that failed
///
/// Validation and configuration errors exit with 2; anything else that
/// stopped the command exits with 1.
fn exit_code(err: &(dyn Error + 'static)) -> ExitCode {
    match err.downcast_ref::<PipelineError>() {
        Some(e) if e.is_fatal() => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let matches = cli().get_matches();
    let result = match matches.subcommand() {
        Some(("run", sub)) => run_command(sub).await,
        Some(("rebuild", sub)) => rebuild_command(sub).await,
        Some(("untranslated", sub)) => untranslated_command(sub).await,
        _ => unreachable!("subcommand_required is set"),
    };

    match result {
        Ok(()) => {
            info!("Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            exit_code(e.as_ref())
        }
    }
}
