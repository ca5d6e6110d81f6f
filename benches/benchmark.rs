use criterion::{criterion_group, criterion_main, Criterion};
use hashtag_features::{
    CorpusStatisticsAggregator, ExtractorConfig, HashtagDiscoverer, LexiconScorer, MemoryStore, Pipeline, RawTweet,
    WordFrequency, WordTokenizer,
};
use std::{hint::black_box, sync::Arc};

const WORDS: [&str; 16] = [
    "plastic", "ocean", "waste", "great", "terrible", "beach", "clean", "save", "bag", "straw", "sea", "turtle",
    "recycle", "today", "love", "problem",
];
const TAGS: [&str; 8] = ["Plastic", "COVID19", "ocean", "ZeroWaste", "climate", "beach", "sooo", "Recycle2020"];

struct Rng(u32);

impl Rng {
    fn next(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }
}

fn synthetic_corpus(n: usize) -> MemoryStore {
    let mut rng = Rng(0x9E37_79B9);
    let tweets = (0..n)
        .map(|i| {
            let tag = TAGS[(rng.next() as usize) % TAGS.len()];
            let mut words: Vec<String> = (0..12).map(|_| WORDS[(rng.next() as usize) % WORDS.len()].to_string()).collect();
            words.insert((rng.next() as usize) % words.len(), format!("#{tag}"));
            let value = serde_json::json!({
                "id_str": i.to_string(),
                "text": words.join(" "),
                "entities": {"hashtags": [{"text": tag, "indices": [0, tag.len() + 1]}]},
                "user": {"id_str": format!("u{}", rng.next() % 500)},
                "created_at": 1_500_000_000 + i as i64,
            });
            serde_json::from_value::<RawTweet>(value).expect("synthetic tweet")
        })
        .collect();
    MemoryStore::new(tweets)
}

fn scan_benchmark(c: &mut Criterion) {
    let store = synthetic_corpus(20_000);

    c.bench_function("discover_top_k", |b| {
        b.iter(|| HashtagDiscoverer::new(&store, 10).discover(black_box(1000)).expect("discover"));
    });

    c.bench_function("aggregate_corpus", |b| {
        let aggregator = CorpusStatisticsAggregator::new(&store, WordTokenizer::plain());
        b.iter(|| aggregator.aggregate(black_box(1000)).expect("aggregate"));
    });

    c.bench_function("aggregate_corpus_stemming", |b| {
        let aggregator = CorpusStatisticsAggregator::new(&store, WordTokenizer::stemming());
        b.iter(|| aggregator.aggregate(black_box(1000)).expect("aggregate"));
    });
}

fn extraction_benchmark(c: &mut Criterion) {
    let pipeline = Pipeline::new(synthetic_corpus(20_000), ExtractorConfig::default(), Arc::new(LexiconScorer::new()));
    let stats = pipeline.aggregate().expect("aggregate");

    c.bench_function("extract_hashtag", |b| {
        b.iter(|| pipeline.extract_hashtag(black_box("ZeroWaste"), &stats).expect("row"));
    });

    let tokenizer = WordTokenizer::plain();
    let mut local = WordFrequency::new();
    for text in ["plastic ocean waste", "save the turtle today", "clean beach love"] {
        local.add_words(&tokenizer.words(text));
    }
    c.bench_function("kl_divergence", |b| {
        b.iter(|| black_box(&local).kl_divergence_from(&stats.word_freq));
    });
}

criterion_group!(benches, scan_benchmark, extraction_benchmark);
criterion_main!(benches);
