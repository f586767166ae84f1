//! Line-greedy text chunking for embedding.

use std::io::{self, BufRead, Lines};

use crate::models::DEFAULT_MAX_CHUNK_LENGTH;

/// Splits a line stream into chunks of whole lines joined by `\n`.
///
/// Lines are accumulated while the joined length (in bytes, separators included)
/// stays within `max_length`. A line longer than the bound becomes a chunk of its
/// own and is never split. Joining the chunks with `\n` gives back the input lines.
pub struct LineChunker<R: BufRead> {
    lines: Lines<R>,
    max_length: usize,
    buffer: String,
    buffered_lines: usize,
    done: bool,
}

impl<R: BufRead> LineChunker<R> {
    pub fn new(reader: R, max_length: usize) -> Self {
        Self {
            lines: reader.lines(),
            max_length,
            buffer: String::new(),
            buffered_lines: 0,
            done: false,
        }
    }

    pub fn with_default_length(reader: R) -> Self {
        Self::new(reader, DEFAULT_MAX_CHUNK_LENGTH)
    }

    fn take_buffer(&mut self, next_line: Option<String>) -> String {
        let chunk = std::mem::take(&mut self.buffer);
        match next_line {
            Some(line) => {
                self.buffer = line;
                self.buffered_lines = 1;
            }
            None => self.buffered_lines = 0,
        }
        chunk
    }
}

impl<R: BufRead> Iterator for LineChunker<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    if self.buffered_lines == 0 {
                        self.buffer = line;
                        self.buffered_lines = 1;
                    } else if self.buffer.len() + 1 + line.len() <= self.max_length {
                        self.buffer.push('\n');
                        self.buffer.push_str(&line);
                        self.buffered_lines += 1;
                    } else {
                        return Some(Ok(self.take_buffer(Some(line))));
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    if self.buffered_lines == 0 {
                        return None;
                    }
                    return Some(Ok(self.take_buffer(None)));
                }
            }
        }
    }
}

/// Chunk an in-memory text.
pub fn split_text(text: &str, max_length: usize) -> Vec<String> {
    LineChunker::new(text.as_bytes(), max_length)
        .filter_map(Result::ok)
        .collect()
}
