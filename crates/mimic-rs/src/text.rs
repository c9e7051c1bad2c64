//! Sentence-level text helpers shared by the agent and the memory pipeline.

/// Characters that terminate a sentence.
fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '?' | '!')
}

/// Cut a generated reply after its last complete sentence.
///
/// A sentence ends at `.`, `?` or `!` followed by whitespace or the end of
/// the text. Everything after the last such mark (a hung, half-generated
/// sentence) is dropped. Text without any terminal mark is returned unchanged.
pub fn trim_after_last_punctuation(text: &str) -> &str {
    let mut cut = None;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if is_terminal(c) && chars.peek().is_none_or(|(_, next)| next.is_whitespace()) {
            cut = Some(i + c.len_utf8());
        }
    }
    match cut {
        Some(end) => text.get(..end).unwrap_or(text),
        None => text,
    }
}

/// Split text into sentences on terminal punctuation followed by whitespace.
///
/// Sentences are trimmed; empty fragments are dropped. A trailing fragment
/// without terminal punctuation is kept as its own sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if is_terminal(c) && chars.peek().is_none_or(|next| next.is_whitespace()) {
            push_trimmed(&mut sentences, &current);
            current.clear();
        }
    }
    push_trimmed(&mut sentences, &current);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}
