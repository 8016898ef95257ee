use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use structopt::StructOpt;

use contextspell::frequency::{Aggregator, AggregatorConfig};
use contextspell::speller::Vocabulary;
use contextspell::store::{load_frequency_file, MemoryStore, LOAD_BATCH_SIZE};
use contextspell::sync::{
    CheckpointFile, CommandExtractor, MediaWiki, StoreLocation, Updater, UpdaterConfig,
};
use contextspell::types::NgramKind;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "freq-tools",
    about = "Frequency table toolkit for the contextspell corrector."
)]
enum Opts {
    #[structopt(about = "Count unigrams or bigrams of a corpus")]
    Compute {
        #[structopt(
            short,
            long,
            parse(from_os_str),
            conflicts_with = "directory",
            required_unless = "directory",
            help = "corpus file"
        )]
        file: Option<PathBuf>,

        #[structopt(
            short,
            long,
            parse(from_os_str),
            required_unless = "file",
            help = "directory whose files make up the corpus"
        )]
        directory: Option<PathBuf>,

        #[structopt(short = "t", long = "type", help = "unigrams or bigrams")]
        kind: NgramKind,

        #[structopt(short, long, parse(from_os_str))]
        output: PathBuf,

        #[structopt(short, long, help = "worker threads (default: one per core)")]
        jobs: Option<usize>,

        #[structopt(short, long)]
        verbose: bool,
    },

    #[structopt(about = "Write the keys of a unigram file as a word list")]
    Words {
        #[structopt(parse(from_os_str))]
        unigrams: PathBuf,

        #[structopt(short, long, parse(from_os_str), help = "default: stdout")]
        output: Option<PathBuf>,
    },

    #[structopt(about = "Load a frequency file into a store snapshot")]
    Load {
        #[structopt(parse(from_os_str))]
        input: PathBuf,

        #[structopt(short, long, parse(from_os_str), help = "store snapshot to write to")]
        store: PathBuf,

        #[structopt(long, default_value = "0", help = "skip entries below this count")]
        min: u64,

        #[structopt(short, long)]
        verbose: bool,
    },

    #[structopt(about = "Follow a wiki's recent changes and keep the stores up to date")]
    Sync {
        #[structopt(long, help = "wiki root or API endpoint")]
        wiki: String,

        #[structopt(long, parse(from_os_str), help = "markup to plain text extractor program")]
        extractor: PathBuf,

        #[structopt(
            long = "extractor-arg",
            help = "extractor argument, {input} and {output} are replaced (repeatable)"
        )]
        extractor_args: Vec<String>,

        #[structopt(long, parse(from_os_str), help = "unigram store snapshot")]
        unigrams: Option<PathBuf>,

        #[structopt(long, parse(from_os_str), help = "bigram store snapshot")]
        bigrams: Option<PathBuf>,

        #[structopt(long, parse(from_os_str), default_value = "sync-checkpoint.json")]
        checkpoint: PathBuf,

        #[structopt(long, default_value = "60", help = "seconds between cycle starts")]
        interval: u64,

        #[structopt(long, default_value = "0")]
        namespace: i64,

        #[structopt(long, default_value = "30", help = "HTTP timeout in seconds")]
        timeout: u64,

        #[structopt(long, help = "run a single cycle and exit")]
        once: bool,

        #[structopt(short, long)]
        verbose: bool,
    },
}

fn init_logging(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    } else if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    } else {
        builder.filter_level(log::LevelFilter::Warn);
    }
    builder.init();
}

fn corpus_files(file: Option<PathBuf>, directory: Option<PathBuf>) -> anyhow::Result<Vec<PathBuf>> {
    match (file, directory) {
        (Some(file), None) => {
            if !file.is_file() {
                bail!("{} is not a file", file.display());
            }
            Ok(vec![file])
        }
        (None, Some(directory)) => {
            if !directory.is_dir() {
                bail!("{} is not a directory", directory.display());
            }
            let mut files = std::fs::read_dir(&directory)
                .with_context(|| format!("listing {}", directory.display()))?
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect::<Vec<_>>();
            files.sort();
            Ok(files)
        }
        _ => bail!("specify exactly one of --file and --directory"),
    }
}

fn compute(
    files: &[PathBuf],
    kind: NgramKind,
    output: &Path,
    jobs: Option<usize>,
) -> anyhow::Result<()> {
    let mut config = AggregatorConfig::default();
    if let Some(jobs) = jobs.filter(|j| *j > 0) {
        config.workers = jobs;
    }
    log::debug!("Computing {} of {} files with {:?}", kind, files.len(), config);

    let table = Aggregator::new(kind, config)
        .aggregate_files(files)
        .context("aggregation failed")?;
    table
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;

    log::debug!("Output written to {}.", output.display());
    Ok(())
}

fn words(unigrams: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let vocabulary = Vocabulary::from_frequency_file(unigrams)
        .with_context(|| format!("reading {}", unigrams.display()))?;
    match output {
        Some(path) => vocabulary.write_to(BufWriter::new(File::create(path)?))?,
        None => vocabulary.write_to(io::stdout().lock())?,
    }
    Ok(())
}

fn load(input: &Path, store: &Path, min: u64) -> anyhow::Result<()> {
    let target = MemoryStore::with_snapshot(store)
        .with_context(|| format!("opening {}", store.display()))?;
    let report = load_frequency_file(&target, input, min, LOAD_BATCH_SIZE)
        .with_context(|| format!("loading {}", input.display()))?;
    println!(
        "{} keys loaded into {}, {} below {} skipped",
        report.sent,
        store.display(),
        report.skipped,
        min
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn sync(
    wiki: &str,
    extractor: PathBuf,
    extractor_args: Vec<String>,
    unigrams: Option<PathBuf>,
    bigrams: Option<PathBuf>,
    checkpoint: PathBuf,
    interval: u64,
    namespace: i64,
    timeout: u64,
    once: bool,
) -> anyhow::Result<()> {
    // stores default to where the last run left them
    let previous = CheckpointFile::new(&checkpoint).load()?;
    let location = StoreLocation {
        unigrams: match unigrams {
            Some(path) => path.to_string_lossy().into_owned(),
            None => previous.store.unigrams,
        },
        bigrams: match bigrams {
            Some(path) => path.to_string_lossy().into_owned(),
            None => previous.store.bigrams,
        },
    };
    if location.unigrams.is_empty() || location.bigrams.is_empty() {
        bail!("no stores given and none recorded in {}", checkpoint.display());
    }

    let unigram_store = MemoryStore::with_snapshot(Path::new(&location.unigrams))?;
    let bigram_store = MemoryStore::with_snapshot(Path::new(&location.bigrams))?;

    let mediawiki = MediaWiki::new(wiki, Duration::from_secs(timeout))?;
    let revisions = MediaWiki::new(wiki, Duration::from_secs(timeout))?;
    let extractor = if extractor_args.is_empty() {
        CommandExtractor::new(extractor)
    } else {
        CommandExtractor::with_args(extractor, extractor_args)
    };

    let config = UpdaterConfig {
        interval: Duration::from_secs(interval),
        namespace,
        site: mediawiki.site().to_string(),
        checkpoint_path: checkpoint,
        store: location,
        ..UpdaterConfig::default()
    };
    let updater = Updater::new(
        mediawiki,
        revisions,
        extractor,
        Arc::new(unigram_store),
        Arc::new(bigram_store),
        config,
    );

    if once {
        let report = updater.run_cycle()?;
        println!(
            "{} changes, {} edits absorbed, {} skipped, {} unigram and {} bigram deltas",
            report.changes, report.edits, report.skipped, report.unigram_deltas, report.bigram_deltas
        );
        return Ok(());
    }

    updater.run(&crossbeam_channel::never());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let opts = Opts::from_args();

    match opts {
        Opts::Compute {
            file,
            directory,
            kind,
            output,
            jobs,
            verbose,
        } => {
            init_logging(verbose);
            let files = corpus_files(file, directory)?;
            compute(&files, kind, &output, jobs)
        }
        Opts::Words { unigrams, output } => {
            init_logging(false);
            words(&unigrams, output.as_deref())
        }
        Opts::Load {
            input,
            store,
            min,
            verbose,
        } => {
            init_logging(verbose);
            load(&input, &store, min)
        }
        Opts::Sync {
            wiki,
            extractor,
            extractor_args,
            unigrams,
            bigrams,
            checkpoint,
            interval,
            namespace,
            timeout,
            once,
            verbose,
        } => {
            init_logging(verbose);
            sync(
                &wiki,
                extractor,
                extractor_args,
                unigrams,
                bigrams,
                checkpoint,
                interval,
                namespace,
                timeout,
                once,
            )
        }
    }
}
