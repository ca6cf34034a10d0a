use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

use spelling_voice::voice::{FileSink, SpeakerSink, catalog};
use spelling_voice::{
    AudioSink, ClipSource, Config, DurableCache, ElevenLabsClient, PronouncerDefaults, Pronouncer,
    PronunciationRequest, SpeechStyle, SqliteAudioStore, load_word_set,
};

/// spelling-voice - hear words for spelling practice
#[derive(Parser)]
#[command(name = "spelling-voice", version, about)]
struct Cli {
    /// Voice name from the catalog, or a raw voice id
    #[arg(long, global = true)]
    voice: Option<String>,

    /// Speaking style
    #[arg(long, global = true, value_enum)]
    style: Option<SpeechStyle>,

    /// Write clips to this directory instead of playing them
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Do not read or write the durable audio cache
    #[arg(long, global = true)]
    no_persist: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Say a word
    Say {
        word: String,
    },
    /// Say "The word is spelled ..."
    Spell {
        word: String,
    },
    /// Spell a word letter by letter
    Letters {
        word: String,
    },
    /// Say sound segments with pauses, e.g. "ox-y-gen"
    Phonetic {
        breakdown: String,
    },
    /// Pronounce every word in a word set
    Practice {
        /// Word set JSON file
        path: PathBuf,
    },
    /// Fetch audio for a word set into the cache without playing it
    Warm {
        /// Word set JSON file
        path: PathBuf,

        /// Concurrent synthesis requests
        #[arg(short, long, default_value = "4")]
        jobs: usize,
    },
    /// List available voices
    Voices,
    /// Inspect or clean the durable audio cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show cache location and size
    Stats,
    /// Delete cached audio older than the retention period
    Purge {
        /// Override the retention period in days
        #[arg(long)]
        days: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,spelling_voice=info",
        1 => "info,spelling_voice=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    let durable = Arc::new(durable_cache(&config, cli.no_persist));

    if let Command::Cache { action } = &cli.command {
        return cache_command(&config, &durable, action).await;
    }

    // Best-effort retention sweep; never delays the first pronunciation
    durable.spawn_purge(config.cache.max_age);

    let client = Arc::new(ElevenLabsClient::with_options(
        config.api_key(),
        config.client_options(),
    )?);

    if let Command::Voices = &cli.command {
        return list_voices(&client).await;
    }

    let sink: Arc<dyn AudioSink> = match &cli.output_dir {
        Some(dir) => Arc::new(FileSink::new(dir)),
        None => Arc::new(SpeakerSink::new()),
    };

    let defaults = PronouncerDefaults {
        voice: cli.voice.clone().unwrap_or_else(|| config.voice.clone()),
        style: cli.style.unwrap_or(config.style),
    };
    tracing::debug!(voice = %defaults.voice, style = %defaults.style, "pronouncer defaults");

    let pronouncer = Pronouncer::new(client, durable, sink, defaults);
    let result = pronounce_command(&pronouncer, cli.command).await;

    pronouncer.flush().await;
    result
}

fn durable_cache(config: &Config, no_persist: bool) -> DurableCache {
    if no_persist || !config.cache.persist {
        tracing::debug!("durable audio cache disabled");
        return DurableCache::unavailable();
    }

    let path = config.db_path();
    tracing::debug!(path = %path.display(), "using durable audio cache");
    DurableCache::new(Arc::new(SqliteAudioStore::file(path)))
}

async fn pronounce_command(pronouncer: &Pronouncer, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Say { word } => {
            pronouncer.pronounce(&word).await?;
        }
        Command::Spell { word } => {
            pronouncer.pronounce_spelling(&word).await?;
        }
        Command::Letters { word } => {
            pronouncer.pronounce_letter_by_letter(&word).await?;
        }
        Command::Phonetic { breakdown } => {
            pronouncer.pronounce_phonetic_breakdown(&breakdown).await?;
        }
        Command::Practice { path } => practice(pronouncer, &path).await?,
        Command::Warm { path, jobs } => warm(pronouncer, &path, jobs).await?,
        Command::Voices | Command::Cache { .. } => {}
    }

    Ok(())
}

/// Pronounce each word, then its sound segments when the set has them
async fn practice(pronouncer: &Pronouncer, path: &Path) -> anyhow::Result<()> {
    let set = load_word_set(path)?;
    println!("Practising \"{}\" ({} words)\n", set.name, set.words.len());

    for (i, entry) in set.entries().enumerate() {
        println!("{:>3}. {}", i + 1, entry.word);
        if !entry.definition.is_empty() {
            println!("     {}", entry.definition);
        }

        pronouncer.pronounce(&entry.word).await?;

        if let Some(phonetic) = entry.phonetic() {
            println!("     {phonetic}");
            pronouncer.pronounce_phonetic_breakdown(phonetic).await?;
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
    }

    let cached = pronouncer.session_cache().len();
    println!("\nDone. {cached} clips cached this session.");
    Ok(())
}

/// Fill both cache tiers for a word set with bounded concurrency
async fn warm(pronouncer: &Pronouncer, path: &Path, jobs: usize) -> anyhow::Result<()> {
    let set = load_word_set(path)?;
    let defaults = pronouncer.defaults();

    let requests: Vec<PronunciationRequest> = set
        .entries()
        .flat_map(|entry| {
            let word = PronunciationRequest::word(entry.word.as_str());
            let phonetic = entry.phonetic().map(PronunciationRequest::phonetic_breakdown);
            std::iter::once(word).chain(phonetic)
        })
        .map(|r| r.with_voice(defaults.voice.as_str()).with_style(defaults.style))
        .collect();

    let total = requests.len();
    let mut synthesized = 0usize;
    let mut cached = 0usize;
    let mut failed = 0usize;

    let mut results = futures::stream::iter(&requests)
        .map(|request| async move { (request, pronouncer.fetch(request).await) })
        .buffer_unordered(jobs.max(1));

    while let Some((request, result)) = results.next().await {
        match result {
            Ok((_, ClipSource::Synthesized)) => synthesized += 1,
            Ok(_) => cached += 1,
            Err(e @ spelling_voice::Error::MissingCredential) => return Err(e.into()),
            Err(e) => {
                failed += 1;
                tracing::warn!(
                    text = %request.text,
                    mode = %request.mode,
                    error = %e,
                    "failed to fetch audio"
                );
            }
        }
    }

    println!(
        "Warmed \"{}\": {total} clips, {synthesized} synthesized, {cached} already cached, \
         {failed} failed",
        set.name
    );
    Ok(())
}

async fn list_voices(client: &ElevenLabsClient) -> anyhow::Result<()> {
    println!("Built-in voices:");
    for (name, voice) in catalog::voices() {
        println!("  {name:<10} {:<22} {:<14} {}", voice.voice_id, voice.accent, voice.gender);
    }

    if !spelling_voice::SpeechSynthesizer::has_credential(client) {
        println!("\nSet ELEVENLABS_API_KEY to list the voices on your account.");
        return Ok(());
    }

    let voices = client.list_voices().await?;
    println!("\nAccount voices ({}):", voices.len());
    for voice in voices {
        let category = voice.category.as_deref().unwrap_or("-");
        println!("  {:<20} {:<22} {category}", voice.name, voice.voice_id);
    }

    Ok(())
}

async fn cache_command(
    config: &Config,
    durable: &DurableCache,
    action: &CacheAction,
) -> anyhow::Result<()> {
    match action {
        CacheAction::Stats => {
            println!("Database:  {}", config.db_path().display());
            println!("Retention: {} days", config.cache.max_age.as_secs() / 86_400);
            match durable.record_count().await {
                Some(count) => println!("Records:   {count}"),
                None => println!("Records:   unavailable"),
            }
        }
        CacheAction::Purge { days } => {
            let max_age = days.map_or(config.cache.max_age, |d| {
                Duration::from_secs(u64::from(d) * 86_400)
            });
            let removed = durable.purge_older_than(max_age).await;
            println!("Removed {removed} expired clips");
        }
    }

    Ok(())
}
