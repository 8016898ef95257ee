/*! Context-aware spelling correction backed by n-gram frequencies.

Word (unigram) and adjacent word pair (bigram) frequencies are counted from
large corpora by a parallel [`Aggregator`](frequency::Aggregator), kept in a
shared [`FrequencyStore`](store::FrequencyStore), and used to rank correction
candidates within edit distance two by how well they fit between the
previous and the next word. An incremental [`Updater`](sync::Updater) keeps
the counts in step with the edits of a live wiki.

# Usage examples

```no_run
use std::path::Path;
use std::sync::Arc;

use contextspell::speller::{ContextSpeller, CorrectorConfig, Speller, Vocabulary};
use contextspell::store::MemoryStore;

let unigrams = Path::new("it.unigrams");
let bigrams = Path::new("it.bigrams");

let speller = ContextSpeller::new(
    Arc::new(Vocabulary::from_frequency_file(unigrams)?),
    Arc::new(MemoryStore::with_snapshot(unigrams)?),
    Arc::new(MemoryStore::with_snapshot(bigrams)?),
    CorrectorConfig::from_headers(unigrams, bigrams)?,
);
let best = speller.correct(Some("over"), "ther", None)?;
println!("{}", best.value());
# Ok::<(), Box<dyn std::error::Error>>(())
```

Further examples can be found in `contextspell-bin` and `freq-tools` in the
same repository.
*/

pub mod frequency;
pub mod speller;
pub mod store;
pub mod sync;
pub mod tokenizer;
pub mod types;

pub(crate) mod constants;
pub(crate) mod util;
