use std::sync::Arc;

use clap::Parser;
use clausemap::{
    DataDir,
    Diagnostics,
    QueryService,
    SearchEngine,
    Settings,
    error,
    loader,
    normalize::Normalizer,
    search,
    telemetry::{CsvSink, HttpSink, TelemetryBuffer, TelemetrySink},
    text_util::{confidence_label, display_path},
    translate::LibreTranslate,
};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Command, join_query};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("CLAUSEMAP_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let settings = Settings::from_env()?;
    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let diagnostics = Arc::new(Diagnostics::new());

    let engine = build_engine(&settings, &data_dir, diagnostics.clone())?;
    let records_queries = matches!(
        cli.command,
        Command::Search(_) | Command::Map(_) | Command::Ask(_)
    );
    let telemetry = if records_queries && settings.telemetry && !cli.no_telemetry
    {
        Some(build_telemetry(&settings, &data_dir, diagnostics)?)
    } else {
        None
    };
    let service = QueryService::new(engine, telemetry);

    let outcome = run(&cli.command, &service, &settings, &data_dir);
    service.shutdown();
    if cli.stats {
        print_stats(&service);
    }
    outcome
}

fn run(
    command: &Command,
    service: &QueryService,
    settings: &Settings,
    data_dir: &DataDir,
) -> error::Result<()> {
    match command {
        Command::Search(args) => {
            let query = join_query(&args.query);
            if service.engine().corpora().get(&args.corpus).is_none() {
                tracing::warn!("unknown corpus '{}'", args.corpus);
            }
            let results = service.search(&args.corpus, &query, args.count);
            if args.json {
                search::format_json(&query, &results)?;
            } else {
                search::format_human(&results);
            }
        }
        Command::Map(args) => {
            let query = join_query(&args.query);
            let grouped = service.map(&query, args.count);
            if args.json {
                search::format_json(&query, &grouped)?;
            } else {
                search::format_grouped_human(&grouped);
            }
        }
        Command::Ask(args) => {
            let query = join_query(&args.query);
            let best = service.ask(&query);
            if args.json {
                search::format_json(&query, &best)?;
            } else {
                print_best(best.as_ref());
            }
        }
        Command::Corpora(args) => cmd_corpora(service.engine(), args.json)?,
        Command::Status(args) => {
            cmd_status(service, settings, data_dir, args.json)?;
        }
        Command::Completions(args) => args.generate(),
    }
    Ok(())
}

fn build_engine(
    settings: &Settings,
    data_dir: &DataDir,
    diagnostics: Arc<Diagnostics>,
) -> error::Result<SearchEngine> {
    let corpora_dir = data_dir.corpora_dir()?;
    let corpora = loader::load_corpus_dir(&corpora_dir)?;
    if corpora.is_empty() {
        tracing::warn!(
            "no corpora found, add <NAME>.json files to {}",
            corpora_dir.display()
        );
    }
    let concepts = loader::load_concepts(&data_dir.concepts_file());

    let normalizer = match &settings.translate_url {
        Some(url) => {
            let client = LibreTranslate::new(
                url,
                settings.translate_api_key.clone(),
                settings.http_timeout,
            )?;
            Normalizer::new(
                Box::new(client.clone()),
                Box::new(client),
                &settings.target_language,
                diagnostics.clone(),
            )
        }
        None => {
            Normalizer::monolingual(&settings.target_language, diagnostics.clone())
        }
    };

    Ok(SearchEngine::new(
        Arc::new(corpora),
        Arc::new(concepts),
        normalizer,
        diagnostics,
    )
    .with_max_depth(settings.max_depth))
}

fn build_telemetry(
    settings: &Settings,
    data_dir: &DataDir,
    diagnostics: Arc<Diagnostics>,
) -> error::Result<TelemetryBuffer> {
    let primary: Option<Box<dyn TelemetrySink>> = match &settings.sink_url {
        Some(url) => Some(Box::new(HttpSink::new(url, settings.http_timeout)?)),
        None => None,
    };
    let fallback = Box::new(CsvSink::new(data_dir.telemetry_log()));

    let buffer = TelemetryBuffer::new(
        settings.telemetry_config(),
        primary,
        fallback,
        diagnostics,
    );
    buffer.start()?;
    Ok(buffer)
}

fn print_best(best: Option<&search::RankedResult>) {
    let Some(r) = best else {
        println!("No results found.");
        return;
    };
    println!(
        "{} ({}, {}%)",
        r.corpus,
        confidence_label(r.score),
        r.score
    );
    println!("  {}", display_path(&r.path, None));
    if !r.content.is_empty() {
        println!("  {}", r.content);
    }
}

fn cmd_corpora(engine: &SearchEngine, json: bool) -> error::Result<()> {
    let corpora = engine.corpora();

    if json {
        let list: Vec<_> = corpora
            .iter()
            .map(|c| {
                serde_json::json!({
                    "name": c.name(),
                    "nodes": c.root().node_count(),
                    "empty": c.is_empty(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string(&list)?);
    } else if corpora.is_empty() {
        println!("No corpora loaded.");
    } else {
        for c in corpora.iter() {
            let note = if c.is_empty() { " (empty)" } else { "" };
            println!("{}\t{} nodes{note}", c.name(), c.root().node_count());
        }
    }
    Ok(())
}

fn cmd_status(
    service: &QueryService,
    settings: &Settings,
    data_dir: &DataDir,
    json: bool,
) -> error::Result<()> {
    let engine = service.engine();
    let names: Vec<&str> = engine.corpora().names().collect();
    let log = CsvSink::new(data_dir.telemetry_log());
    let logged = log.summary()?;

    if json {
        let status = serde_json::json!({
            "data_dir": data_dir.root(),
            "corpora": names,
            "concepts": engine.concepts().len(),
            "target_language": settings.target_language,
            "translation": settings.translate_url.is_some(),
            "telemetry": {
                "enabled": settings.telemetry,
                "primary": settings.sink_url.is_some(),
                "log": log.path(),
                "logged_queries": logged.rows,
                "log_files": logged.files,
            },
        });
        println!("{}", serde_json::to_string(&status)?);
    } else {
        println!("Data directory: {}", data_dir.root().display());
        println!("Corpora: {}", names.len());
        for name in &names {
            println!("  {name}");
        }
        println!("Concepts: {}", engine.concepts().len());
        println!("Target language: {}", settings.target_language);
        println!(
            "Translation: {}",
            settings.translate_url.as_deref().unwrap_or("disabled")
        );
        println!(
            "Telemetry: {}",
            if settings.telemetry { "enabled" } else { "disabled" }
        );
        println!(
            "Primary sink: {}",
            settings.sink_url.as_deref().unwrap_or("none")
        );
        println!("Telemetry log: {}", log.path().display());
        println!(
            "Logged queries: {} in {} file(s)",
            logged.rows, logged.files
        );
    }
    Ok(())
}

fn print_stats(service: &QueryService) {
    let engine = service.engine();
    let diagnostics = engine.diagnostics();
    let score_cache = diagnostics.score_cache.snapshot();
    let translation_cache = diagnostics.translation_cache.snapshot();

    eprintln!(
        "Score cache: {} entries, {} hits, {} misses",
        engine.scorer().cached_entries(),
        score_cache.hits,
        score_cache.misses
    );
    eprintln!(
        "Translation cache: {} hits, {} misses",
        translation_cache.hits, translation_cache.misses
    );
    for (metric, avg) in diagnostics.timing_averages() {
        eprintln!("{metric}: {avg:.2} ms avg");
    }

    match service.telemetry_stats() {
        Some(t) => eprintln!(
            "Telemetry: {} pending, {} primary / {} fallback flushes, \
             {} scheduled, {} evicted, {} dropped, primary {}",
            t.pending,
            t.primary_flushes,
            t.fallback_flushes,
            t.scheduled_flushes,
            t.evicted,
            t.dropped,
            if t.primary_active { "active" } else { "inactive" }
        ),
        None => eprintln!("Telemetry: off"),
    }
}
