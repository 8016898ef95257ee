use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use gumdrop::Options;
use serde::Serialize;

use contextspell::speller::suggestion::Suggestion;
use contextspell::speller::{
    corrected_sentence, ContextSpeller, Correction, CorrectorConfig, Speller, Vocabulary,
};
use contextspell::store::MemoryStore;
use contextspell::tokenizer::Tokenize;

trait OutputWriter {
    fn write_correction(&mut self, input: &str, corrections: &[Correction]);
    fn write_suggestions(&mut self, word: &str, suggestions: &[Suggestion]);
    fn finish(&mut self);
}

struct StdoutWriter;

impl OutputWriter for StdoutWriter {
    fn write_correction(&mut self, _input: &str, corrections: &[Correction]) {
        println!("{}", corrected_sentence(corrections));
    }

    fn write_suggestions(&mut self, word: &str, suggestions: &[Suggestion]) {
        println!("Input: {}", word);
        for sugg in suggestions {
            println!("{}\t\t{:.4}\t{:?}", sugg.value, sugg.score, sugg.class);
        }
        println!();
    }

    fn finish(&mut self) {}
}

#[derive(Serialize)]
struct CorrectionResult {
    input: String,
    corrected: String,
    words: Vec<Correction>,
}

#[derive(Serialize)]
struct SuggestionResult {
    word: String,
    suggestions: Vec<Suggestion>,
}

#[derive(Serialize)]
struct JsonWriter {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    corrections: Vec<CorrectionResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    suggestions: Vec<SuggestionResult>,
}

impl JsonWriter {
    pub fn new() -> JsonWriter {
        JsonWriter {
            corrections: vec![],
            suggestions: vec![],
        }
    }
}

impl OutputWriter for JsonWriter {
    fn write_correction(&mut self, input: &str, corrections: &[Correction]) {
        self.corrections.push(CorrectionResult {
            input: input.to_owned(),
            corrected: corrected_sentence(corrections),
            words: corrections.to_vec(),
        });
    }

    fn write_suggestions(&mut self, word: &str, suggestions: &[Suggestion]) {
        self.suggestions.push(SuggestionResult {
            word: word.to_owned(),
            suggestions: suggestions.to_vec(),
        });
    }

    fn finish(&mut self) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("cannot serialize results: {}", e),
        }
    }
}

#[derive(Debug, Options)]
struct Args {
    #[options(help = "print help message")]
    help: bool,

    #[options(command)]
    command: Option<Command>,
}

#[derive(Debug, Options)]
enum Command {
    #[options(help = "correct every word of the provided sentences")]
    Correct(CorrectArgs),

    #[options(help = "list ranked candidates for a single word")]
    Suggest(SuggestArgs),

    #[options(help = "print input in normalized token form")]
    Tokenize(TokenizeArgs),
}

#[derive(Debug, Options)]
struct CorrectArgs {
    #[options(help = "print help message")]
    help: bool,

    #[options(no_short, long = "unigrams", help = "unigram frequency file", required)]
    unigrams: PathBuf,

    #[options(no_short, long = "bigrams", help = "bigram frequency file", required)]
    bigrams: PathBuf,

    #[options(help = "known words, one per line (default: the unigram keys)")]
    words: Option<PathBuf>,

    #[options(no_short, long = "json", help = "output in JSON format")]
    use_json: bool,

    #[options(free, help = "sentences to be corrected, one per argument")]
    inputs: Vec<String>,
}

#[derive(Debug, Options)]
struct SuggestArgs {
    #[options(help = "print help message")]
    help: bool,

    #[options(no_short, long = "unigrams", help = "unigram frequency file", required)]
    unigrams: PathBuf,

    #[options(no_short, long = "bigrams", help = "bigram frequency file", required)]
    bigrams: PathBuf,

    #[options(help = "known words, one per line (default: the unigram keys)")]
    words: Option<PathBuf>,

    #[options(no_short, long = "prev", help = "previous word")]
    prev: Option<String>,

    #[options(no_short, long = "next", help = "next word")]
    next: Option<String>,

    #[options(help = "maximum number of results")]
    nbest: Option<usize>,

    #[options(no_short, long = "json", help = "output in JSON format")]
    use_json: bool,

    #[options(free, help = "words to be processed")]
    inputs: Vec<String>,
}

#[derive(Debug, Options)]
struct TokenizeArgs {
    #[options(help = "print help message")]
    help: bool,

    #[options(short = "b", long = "bigrams", help = "show word pairs instead of words")]
    is_bigrams: bool,

    #[options(free, help = "text to be tokenized")]
    inputs: Vec<String>,
}

fn read_stdin() -> anyhow::Result<String> {
    eprintln!("Reading from stdin...");
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("reading stdin")?;
    Ok(buffer)
}

fn input_lines(inputs: Vec<String>) -> anyhow::Result<Vec<String>> {
    if !inputs.is_empty() {
        return Ok(inputs);
    }
    Ok(read_stdin()?
        .lines()
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect())
}

fn load_speller(
    unigrams: &Path,
    bigrams: &Path,
    words: Option<&Path>,
) -> anyhow::Result<Arc<ContextSpeller>> {
    let config = CorrectorConfig::from_headers(unigrams, bigrams)
        .with_context(|| format!("reading headers of {} and {}", unigrams.display(), bigrams.display()))?;
    let vocabulary = match words {
        Some(path) => Vocabulary::from_words_file(path),
        None => Vocabulary::from_frequency_file(unigrams),
    }
    .context("loading known words")?;
    log::debug!("{} known words, config {:?}", vocabulary.len(), config);

    let unigram_store = MemoryStore::with_snapshot(unigrams)
        .with_context(|| format!("loading {}", unigrams.display()))?;
    let bigram_store = MemoryStore::with_snapshot(bigrams)
        .with_context(|| format!("loading {}", bigrams.display()))?;

    Ok(ContextSpeller::new(
        Arc::new(vocabulary),
        Arc::new(unigram_store),
        Arc::new(bigram_store),
        config,
    ))
}

fn writer(use_json: bool) -> Box<dyn OutputWriter> {
    if use_json {
        Box::new(JsonWriter::new())
    } else {
        Box::new(StdoutWriter)
    }
}

fn correct(args: CorrectArgs) -> anyhow::Result<()> {
    let speller = load_speller(&args.unigrams, &args.bigrams, args.words.as_deref())?;
    let mut writer = writer(args.use_json);

    for sentence in input_lines(args.inputs)? {
        let corrections = speller.clone().correct_sentence(&sentence)?;
        writer.write_correction(&sentence, &corrections);
    }

    writer.finish();
    Ok(())
}

fn suggest(args: SuggestArgs) -> anyhow::Result<()> {
    let speller = load_speller(&args.unigrams, &args.bigrams, args.words.as_deref())?;
    let mut writer = writer(args.use_json);

    for word in input_lines(args.inputs)? {
        let mut suggestions =
            speller
                .clone()
                .suggest(args.prev.as_deref(), &word, args.next.as_deref())?;
        if let Some(n) = args.nbest.filter(|n| *n > 0) {
            suggestions.truncate(n);
        }
        writer.write_suggestions(&word, &suggestions);
    }

    writer.finish();
    Ok(())
}

fn tokenize(args: TokenizeArgs) -> anyhow::Result<()> {
    let inputs: String = if args.inputs.is_empty() {
        read_stdin()?
    } else {
        args.inputs.join(" ")
    };

    for line in inputs.lines() {
        let tokens: Vec<String> = if args.is_bigrams {
            line.bigrams().collect()
        } else {
            line.unigrams().collect()
        };
        for (index, token) in tokens.iter().enumerate() {
            println!("{:>4}: \"{}\"", index, token);
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let args = Args::parse_args_default_or_exit();

    match args.command {
        None => Ok(()),
        Some(Command::Correct(args)) => correct(args),
        Some(Command::Suggest(args)) => suggest(args),
        Some(Command::Tokenize(args)) => tokenize(args),
    }
}
