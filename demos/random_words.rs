//! Refreshes a substring cache every 10 milliseconds from a source of random
//! words, then prints the words containing "de".
//!
//! Run with `RUST_LOG=debug` to see the summary of every refresh cycle.

use lexicache::{invalidator::DefaultInvalidator, sync::SubstringCache, BoxError};

use std::{thread, time::Duration};

const MAX_WORDS: usize = 10;
const MIN_WORD_LEN: usize = 3;
const MAX_WORD_LEN: usize = 10;

/// Returns up to 9 words of 3 to 10 lowercase ASCII letters.
fn random_words() -> Result<Vec<String>, BoxError> {
    let mut bytes = [0u8; 1 + MAX_WORDS * (1 + MAX_WORD_LEN)];
    getrandom::getrandom(&mut bytes).map_err(|e| e.to_string())?;

    let num_words = bytes[0] as usize % MAX_WORDS;
    let words = bytes[1..]
        .chunks(1 + MAX_WORD_LEN)
        .take(num_words)
        .map(|chunk| {
            let len = MIN_WORD_LEN + chunk[0] as usize % (MAX_WORD_LEN - MIN_WORD_LEN + 1);
            chunk[1..=len]
                .iter()
                .map(|b| char::from(b'a' + b % 26))
                .collect()
        })
        .collect();
    Ok(words)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cache = SubstringCache::builder()
        .name("random-words")
        .invalidator(DefaultInvalidator::with_timeout(Duration::from_millis(10)))
        .source(random_words)
        .build()?;

    thread::sleep(Duration::from_millis(500));

    let mut matches = cache.containing("de").collect::<Vec<_>>();
    matches.sort();
    for word in &matches {
        println!("{word}");
    }
    println!();
    println!(
        "{} of {} words contain \"de\"",
        matches.len(),
        cache.key_count()
    );

    cache.terminate();
    Ok(())
}
