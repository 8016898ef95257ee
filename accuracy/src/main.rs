use chrono::prelude::*;
use std::error::Error;
use std::sync::Arc;
use std::{
    io::Write,
    path::Path,
    time::{Instant, SystemTime},
};

use contextspell::speller::suggestion::Suggestion;
use contextspell::speller::{
    corrected_sentence, ContextSpeller, CorrectorConfig, Speller, Vocabulary,
};
use contextspell::store::MemoryStore;
use contextspell::tokenizer::normalize;
use distance::damerau_levenshtein;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::Serialize;
use structopt::clap::{App, AppSettings, Arg};

const MAX_SUGGESTIONS: usize = 10;

fn load_words(
    path: &str,
    max_words: Option<usize>,
) -> Result<Vec<(String, String)>, Box<dyn Error>> {
    let mut rdr = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    Ok(rdr
        .records()
        .filter_map(Result::ok)
        .filter_map(|r| {
            r.get(0)
                .and_then(|x| r.get(1).map(|y| (x.to_string(), y.to_string())))
        })
        .take(max_words.unwrap_or(std::usize::MAX))
        .collect())
}

/// Lowercases the words that the corrector would touch, so outputs and
/// expectations compare in the same form.
fn canonical(text: &str) -> String {
    text.split_whitespace()
        .map(|w| normalize(w).unwrap_or_else(|| w.to_string()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Default, Serialize, PartialOrd, Ord, PartialEq, Eq, Clone, Copy)]
struct Time {
    secs: u64,
    subsec_nanos: u32,
}

impl Time {
    fn from_duration(d: std::time::Duration) -> Time {
        Time {
            secs: d.as_secs(),
            subsec_nanos: d.subsec_nanos(),
        }
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        let ms = self.secs * 1000 + (self.subsec_nanos as u64 / 1_000_000);
        write!(f, "{}ms", ms)
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Outcome {
    Correct,
    Unchanged,
    Wrong,
    Failed,
}

#[derive(Debug, Serialize)]
struct AccuracyResult<'a> {
    input: &'a str,
    expected: &'a str,
    corrected: Option<String>,
    outcome: Outcome,
    distance: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    suggestions: Vec<Suggestion>,
    position: Option<usize>,
    time: Time,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    config: &'a CorrectorConfig,
    summary: Summary,
    results: Vec<AccuracyResult<'a>>,
    start_timestamp: Time,
    total_time: Time,
}

#[derive(Serialize, Default, Debug, Clone)]
struct Summary {
    total_inputs: u32,
    correct: u32,
    unchanged: u32,
    wrong: u32,
    failed: u32,
    slowest_lookup: Time,
    fastest_lookup: Time,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        let percent = |v: u32| -> String {
            format!("{:.2}%", v as f32 / self.total_inputs.max(1) as f32 * 100f32)
        };

        write!(
            f,
            "[correct] {} [unchanged] {} [wrong] {} [failed] {} [fast] {} [slow] {}",
            percent(self.correct),
            percent(self.unchanged),
            percent(self.wrong),
            percent(self.failed),
            self.fastest_lookup,
            self.slowest_lookup
        )
    }
}

impl Summary {
    fn new(results: &[AccuracyResult<'_>]) -> Summary {
        let mut summary = Summary::default();

        results.iter().for_each(|result| {
            summary.total_inputs += 1;
            match result.outcome {
                Outcome::Correct => summary.correct += 1,
                Outcome::Unchanged => summary.unchanged += 1,
                Outcome::Wrong => summary.wrong += 1,
                Outcome::Failed => summary.failed += 1,
            }
        });

        if let Some(slowest) = results.iter().map(|r| r.time).max() {
            summary.slowest_lookup = slowest;
        }
        if let Some(fastest) = results.iter().map(|r| r.time).min() {
            summary.fastest_lookup = fastest;
        }

        summary
    }
}

fn evaluate<'a>(speller: &Arc<ContextSpeller>, input: &'a str, expected: &'a str) -> AccuracyResult<'a> {
    let now = Instant::now();
    let corrected = speller
        .clone()
        .correct_sentence(input)
        .map(|words| corrected_sentence(&words));

    // single words also get their ranked candidates
    let mut suggestions = match input.split_whitespace().count() {
        1 => speller
            .clone()
            .suggest(None, &canonical(input), None)
            .unwrap_or_default(),
        _ => vec![],
    };
    let time = Time::from_duration(now.elapsed());

    let expected_form = canonical(expected);
    let position = suggestions.iter().position(|x| x.value.as_str() == expected_form);
    suggestions.truncate(MAX_SUGGESTIONS);

    let outcome = match &corrected {
        Err(e) => {
            log::error!("{:?}: {}", input, e);
            Outcome::Failed
        }
        Ok(c) if *c == expected_form => Outcome::Correct,
        Ok(c) if *c == canonical(input) => Outcome::Unchanged,
        Ok(_) => Outcome::Wrong,
    };

    AccuracyResult {
        input,
        expected,
        corrected: corrected.ok(),
        outcome,
        distance: damerau_levenshtein(input, expected),
        suggestions,
        position,
        time,
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();

    let matches = App::new("contextspell-accuracy")
        .setting(AppSettings::ArgRequiredElseHelp)
        .version(env!("CARGO_PKG_VERSION"))
        .about("Accuracy testing for the contextspell corrector.")
        .arg(
            Arg::with_name("config")
                .short("c")
                .takes_value(true)
                .help("Provide JSON corrector config file to override the file header totals"),
        )
        .arg(
            Arg::with_name("words")
                .value_name("WORDS")
                .required(true)
                .help("The 'input -> expected' list in tab-delimited value file (TSV)"),
        )
        .arg(
            Arg::with_name("unigrams")
                .long("unigrams")
                .takes_value(true)
                .required(true)
                .help("Unigram frequency file"),
        )
        .arg(
            Arg::with_name("bigrams")
                .long("bigrams")
                .takes_value(true)
                .required(true)
                .help("Bigram frequency file"),
        )
        .arg(
            Arg::with_name("json-output")
                .short("o")
                .value_name("JSON-OUTPUT")
                .help("The file path for the JSON report output"),
        )
        .arg(
            Arg::with_name("tsv-output")
                .short("t")
                .value_name("TSV-OUTPUT")
                .help("The file path for the TSV line append"),
        )
        .arg(
            Arg::with_name("max-words")
                .short("w")
                .takes_value(true)
                .help("Truncate input list to max number of entries specified"),
        )
        .get_matches();

    let unigrams = Path::new(matches.value_of("unigrams").unwrap_or_default());
    let bigrams = Path::new(matches.value_of("bigrams").unwrap_or_default());

    let cfg: CorrectorConfig = match matches.value_of("config") {
        Some(path) => {
            let file = std::fs::File::open(path)?;
            serde_json::from_reader(file)?
        }
        None => CorrectorConfig::from_headers(unigrams, bigrams)?,
    };

    let speller = ContextSpeller::new(
        Arc::new(Vocabulary::from_frequency_file(unigrams)?),
        Arc::new(MemoryStore::with_snapshot(unigrams)?),
        Arc::new(MemoryStore::with_snapshot(bigrams)?),
        cfg.clone(),
    );

    let words = match matches.value_of("words") {
        Some(path) => load_words(
            path,
            matches
                .value_of("max-words")
                .and_then(|x| x.parse::<usize>().ok()),
        )?,
        None => {
            eprintln!("No word list for given path; aborting.");
            std::process::exit(1);
        }
    };

    let pb = ProgressBar::new(words.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{pos}/{len} [{percent}%] {wide_bar} {elapsed_precise}"),
    );

    let start_time = Instant::now();
    let results = words
        .par_iter()
        .progress_with(pb)
        .map(|(input, expected)| evaluate(&speller, input, expected))
        .collect::<Vec<_>>();

    let total_time = Time::from_duration(start_time.elapsed());
    let start_timestamp = Time::from_duration(
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default(),
    );

    let summary = Summary::new(&results);
    println!("{}", summary);

    if let Some(path) = matches.value_of("json-output") {
        let output = std::fs::File::create(path)?;
        let report = Report {
            config: &cfg,
            summary,
            results,
            start_timestamp,
            total_time,
        };
        println!("Writing JSON report…");
        serde_json::to_writer_pretty(output, &report)?;
    } else if let Some(path) = matches.value_of("tsv-output") {
        let mut output = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        if output.metadata()?.len() == 0 {
            // new file, write headers:
            output.write_all(b"date\tinputs\tcorrect\tunchanged\twrong\tfailed\n")?;
        }
        writeln!(
            output,
            "{}\t{}\t{}\t{}\t{}\t{}",
            Local::now().to_rfc3339(),
            summary.total_inputs,
            summary.correct,
            summary.unchanged,
            summary.wrong,
            summary.failed
        )?;
    };

    println!("Done!");
    Ok(())
}
