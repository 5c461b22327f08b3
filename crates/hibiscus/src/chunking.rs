//! Recursive text splitting for embedding-sized chunks
//!
//! Text is split on the coarsest boundary that works (paragraphs, lines,
//! sentences, words) and adjacent segments are merged back together while
//! they fit. Only a single word longer than the chunk size falls through to
//! fixed character windows. Sizes are counted in characters, never bytes,
//! because the stored labels are Hangul.

const SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "! ", "? ", " "];

/// Splits descriptions into chunks no longer than `chunk_size` characters
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
  chunk_size: usize,
  chunk_overlap: usize,
}

impl RecursiveSplitter {
  /// `chunk_overlap` only applies to the character-window fallback
  pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
    let chunk_size = chunk_size.max(1);
    Self { chunk_size, chunk_overlap: chunk_overlap.min(chunk_size - 1) }
  }

  /// Split text into trimmed, non-empty chunks
  pub fn split(&self, text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
      return Vec::new();
    }

    split_and_merge(text, self.chunk_size, self.chunk_overlap, &SEPARATORS)
      .into_iter()
      .map(|chunk| chunk.trim().to_string())
      .filter(|chunk| !chunk.is_empty())
      .collect()
  }
}

fn char_len(text: &str) -> usize {
  text.chars().count()
}

fn split_and_merge(
  text: &str,
  chunk_size: usize,
  chunk_overlap: usize,
  separators: &[&str],
) -> Vec<String> {
  if char_len(text) <= chunk_size {
    return vec![text.to_string()];
  }

  let Some((separator, remaining)) = separators.split_first() else {
    return split_by_chars(text, chunk_size, chunk_overlap);
  };

  let segments = split_keeping_separator(text, separator);
  if segments.len() <= 1 {
    return split_and_merge(text, chunk_size, chunk_overlap, remaining);
  }

  let mut chunks = Vec::new();
  let mut current = String::new();

  for segment in segments {
    if current.is_empty() || char_len(&current) + char_len(segment) <= chunk_size {
      current.push_str(segment);
      continue;
    }

    flush(&mut chunks, &current, chunk_size, chunk_overlap, remaining);
    current = segment.to_string();
  }

  if !current.is_empty() {
    flush(&mut chunks, &current, chunk_size, chunk_overlap, remaining);
  }

  chunks
}

/// Push a merged run, splitting it further when it is still too long
fn flush(
  chunks: &mut Vec<String>,
  current: &str,
  chunk_size: usize,
  chunk_overlap: usize,
  remaining: &[&str],
) {
  if char_len(current) > chunk_size {
    chunks.extend(split_and_merge(current, chunk_size, chunk_overlap, remaining));
  } else {
    chunks.push(current.to_string());
  }
}

/// Split at a separator, keeping it attached to the preceding segment
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
  let mut result = Vec::new();
  let mut start = 0;

  while let Some(pos) = text[start..].find(separator) {
    let end = start + pos + separator.len();
    result.push(&text[start..end]);
    start = end;
  }

  if start < text.len() {
    result.push(&text[start..]);
  }

  result
}

fn split_by_chars(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
  let chars: Vec<char> = text.chars().collect();
  let step = chunk_size.saturating_sub(chunk_overlap).max(1);
  let mut chunks = Vec::new();
  let mut start = 0;

  while start < chars.len() {
    let end = (start + chunk_size).min(chars.len());
    chunks.push(chars[start..end].iter().collect());
    if end == chars.len() {
      break;
    }
    start += step;
  }

  chunks
}
