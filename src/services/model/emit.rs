//! How fragments are paced on their way to the sink. Pacing is presentation
//! only and never touches usage accounting.

use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::sink::EventSink;
use crate::error::ModelError;

/// Upper bound of [`char_delay`] in milliseconds.
pub const MAX_CHAR_DELAY_MS: u64 = 149;

#[async_trait]
pub trait EmissionStrategy: Send {
    async fn emit(&mut self, fragment: &str, sink: &mut dyn EventSink) -> Result<(), ModelError>;
}

/// One frame per fragment, no delay.
#[derive(Debug, Default, Clone, Copy)]
pub struct WholeFragment;

#[async_trait]
impl EmissionStrategy for WholeFragment {
    async fn emit(&mut self, fragment: &str, sink: &mut dyn EventSink) -> Result<(), ModelError> {
        sink.send(fragment).await
    }
}

/// One frame per character, spaced like a person typing.
#[derive(Debug)]
pub struct TypingPace {
    rng: StdRng,
}

impl TypingPace {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for TypingPace {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmissionStrategy for TypingPace {
    async fn emit(&mut self, fragment: &str, sink: &mut dyn EventSink) -> Result<(), ModelError> {
        let mut buf = [0u8; 4];
        for ch in fragment.chars() {
            sink.send(ch.encode_utf8(&mut buf)).await?;
            let delay = char_delay(ch, &mut self.rng);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
        Ok(())
    }
}

/// Which strategy a backend uses. A fresh strategy is built per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    WholeFragment,
    TypingPace,
}

impl Emission {
    pub fn strategy(self) -> Box<dyn EmissionStrategy> {
        match self {
            Emission::WholeFragment => Box::new(WholeFragment),
            Emission::TypingPace => Box::new(TypingPace::new()),
        }
    }
}

/// Letters of the Latin script. Digits, punctuation and spaces are not Latin.
pub fn is_latin_script(ch: char) -> bool {
    matches!(ch,
        'A'..='Z' | 'a'..='z'
        | '\u{AA}' | '\u{BA}'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2B8}'
        | '\u{2E0}'..='\u{2E4}'
        | '\u{1D00}'..='\u{1D25}' | '\u{1D2C}'..='\u{1D5C}' | '\u{1D62}'..='\u{1D65}'
        | '\u{1D6B}'..='\u{1D77}' | '\u{1D79}'..='\u{1DBE}'
        | '\u{1E00}'..='\u{1EFF}'
        | '\u{2071}' | '\u{207F}' | '\u{2090}'..='\u{209C}'
        | '\u{212A}' | '\u{212B}' | '\u{2132}' | '\u{214E}' | '\u{2160}'..='\u{2188}'
        | '\u{2C60}'..='\u{2C7F}'
        | '\u{A722}'..='\u{A787}' | '\u{A78B}'..='\u{A7CA}' | '\u{A7F2}'..='\u{A7FF}'
        | '\u{AB30}'..='\u{AB5A}' | '\u{AB5C}'..='\u{AB64}'
        | '\u{FB00}'..='\u{FB06}'
        | '\u{FF21}'..='\u{FF3A}' | '\u{FF41}'..='\u{FF5A}'
    )
}

/// Delay after emitting `ch`, in milliseconds.
///
/// Sentence ends pause longest, then commas, then spaces and brackets. Other
/// non-Latin characters get a small random pause; Latin letters mostly none.
pub fn char_delay(ch: char, rng: &mut impl Rng) -> u64 {
    let latin = is_latin_script(ch);
    let penalty: i64 = if latin { 0 } else { 50 };

    let mut delay: i64 = match ch {
        ',' | '，' => 20 + rng.random_range(0..50) + penalty,
        '.' | '。' | '!' | '！' | '?' | '？' => 50 + rng.random_range(0..50) + penalty,
        ' ' | '　' | '(' | '（' | ')' | '）' => 10 + rng.random_range(0..50) + penalty,
        _ => rng.random_range(0..1 + penalty * 2 / 5),
    };
    if latin {
        delay -= 20;
    }

    delay.max(0) as u64
}
