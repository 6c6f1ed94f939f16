//! `@name` mention extraction.
//!
//! A mention is an `@` that does not follow a word character, followed by one
//! or more word characters (alphanumerics or `_`). The name ends at the first
//! character that is not a word character, so `@bob,` and `@bob.` both mention
//! `bob`, while `mail@example.com` mentions nobody.
//!
//! Extraction is purely lexical; matching names against registered users is
//! done by the caller (see [`crate::notify::dispatch_mentions`]).

use std::collections::BTreeSet;

fn is_word_char(c: char) -> bool { c.is_alphanumeric() || c == '_' }

/// The distinct names mentioned in `text`, compared case-sensitively.
pub fn mentioned_names(text: &str) -> BTreeSet<&str> {
  let mut names = BTreeSet::new();
  let mut prev: Option<char> = None;
  let mut chars = text.char_indices().peekable();

  while let Some((i, c)) = chars.next() {
    if c == '@' && !prev.is_some_and(is_word_char) {
      let start = i + c.len_utf8();
      let mut end = start;
      while let Some(&(j, n)) = chars.peek() {
        if !is_word_char(n) {
          break;
        }
        end = j + n.len_utf8();
        chars.next();
      }
      if end > start {
        names.insert(&text[start..end]);
        prev = text[start..end].chars().next_back();
        continue;
      }
    }
    prev = Some(c);
  }

  names
}
