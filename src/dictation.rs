// 🎙️ Dictation Input
// Capability boundary for voice-recognized text

use anyhow::{Context, Result};
use std::io::BufRead;

/// Anything that produces recognized utterances one at a time.
///
/// The store never sees this trait: callers pull an utterance and pass
/// the plain string to `EntryStore::add`. `Ok(None)` means the source
/// is finished (microphone closed, pipe ended).
pub trait Dictation {
    fn next_utterance(&mut self) -> Result<Option<String>>;
}

/// Reads one utterance per line, e.g. piped from a speech-to-text tool.
pub struct LineDictation<R: BufRead> {
    reader: R,
}

impl<R: BufRead> LineDictation<R> {
    pub fn new(reader: R) -> Self {
        LineDictation { reader }
    }
}

impl<R: BufRead> Dictation for LineDictation<R> {
    fn next_utterance(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .context("Failed to read dictated text")?;

        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_lines_until_eof() {
        let mut source = LineDictation::new(Cursor::new("Купить молоко\r\n\nпозвонить маме"));

        assert_eq!(source.next_utterance().unwrap().as_deref(), Some("Купить молоко"));
        assert_eq!(source.next_utterance().unwrap().as_deref(), Some(""));
        assert_eq!(source.next_utterance().unwrap().as_deref(), Some("позвонить маме"));
        assert_eq!(source.next_utterance().unwrap(), None);
    }
}
