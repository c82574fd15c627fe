//! Sentence-level helpers: splitting, TF-IDF ranking, and key-point derivation.
//!
//! Ranking scores every sentence by the cosine similarity of its TF-IDF vector to the centroid
//! of all sentence vectors, so the sentences that best represent the text come first. Ties keep
//! document order, which makes the selection fully deterministic.

use super::types::KeyPoint;
use std::collections::{HashMap, HashSet};

/// Number of key points derived from a summary.
pub const KEY_POINT_COUNT: usize = 5;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few",
    "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
    "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its",
    "itself", "just", "may", "me", "might", "more", "most", "must", "my", "myself", "no", "nor",
    "not", "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves",
    "out", "over", "own", "same", "she", "should", "so", "some", "such", "than", "that", "the",
    "their", "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those",
    "through", "to", "too", "under", "until", "up", "very", "was", "we", "were", "what", "when",
    "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you", "your",
    "yours", "yourself", "yourselves",
];

/// Split text into sentences.
///
/// A sentence ends at `.` or `?` followed by whitespace, unless the terminator closes an
/// abbreviation shaped like `e.g.` or `Dr.`.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();

    for (position, &ch) in chars.iter().enumerate() {
        if ch.is_whitespace() && is_sentence_boundary(&chars, position) {
            push_sentence(&mut sentences, &current);
            current.clear();
        } else {
            current.push(ch);
        }
    }
    push_sentence(&mut sentences, &current);
    sentences
}

fn push_sentence(sentences: &mut Vec<String>, candidate: &str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn is_sentence_boundary(chars: &[char], position: usize) -> bool {
    if position == 0 || !matches!(chars[position - 1], '.' | '?') {
        return false;
    }
    // `x.y.` style abbreviations.
    if position >= 4
        && is_word_char(chars[position - 4])
        && chars[position - 3] == '.'
        && is_word_char(chars[position - 2])
    {
        return false;
    }
    // Titles such as `Mr.` and `Dr.`.
    if position >= 3
        && chars[position - 3].is_ascii_uppercase()
        && chars[position - 2].is_ascii_lowercase()
        && chars[position - 1] == '.'
    {
        return false;
    }
    true
}

fn terms(sentence: &str, stop_words: &HashSet<&str>) -> Vec<String> {
    sentence
        .split(|ch: char| !is_word_char(ch))
        .filter(|word| word.chars().count() > 1)
        .map(str::to_lowercase)
        .filter(|word| !stop_words.contains(word.as_str()))
        .collect()
}

/// Return sentence indices ordered from most to least representative.
pub fn rank_sentences(sentences: &[String]) -> Vec<usize> {
    let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();
    let sentence_terms: Vec<Vec<String>> = sentences
        .iter()
        .map(|sentence| terms(sentence, &stop_words))
        .collect();

    let mut document_frequency: HashMap<&str, usize> = HashMap::new();
    for words in &sentence_terms {
        let unique: HashSet<&str> = words.iter().map(String::as_str).collect();
        for term in unique {
            *document_frequency.entry(term).or_default() += 1;
        }
    }

    let total = sentences.len() as f64;
    let vectors: Vec<HashMap<&str, f64>> = sentence_terms
        .iter()
        .map(|words| {
            let mut vector: HashMap<&str, f64> = HashMap::new();
            for term in words {
                *vector.entry(term.as_str()).or_default() += 1.0;
            }
            for (term, weight) in vector.iter_mut() {
                let df = document_frequency.get(term).copied().unwrap_or(0) as f64;
                *weight *= ((1.0 + total) / (1.0 + df)).ln() + 1.0;
            }
            normalize(&mut vector);
            vector
        })
        .collect();

    let mut centroid: HashMap<&str, f64> = HashMap::new();
    for vector in &vectors {
        for (term, weight) in vector {
            *centroid.entry(*term).or_default() += weight;
        }
    }
    normalize(&mut centroid);

    let scores: Vec<f64> = vectors
        .iter()
        .map(|vector| {
            vector
                .iter()
                .map(|(term, weight)| weight * centroid.get(term).copied().unwrap_or(0.0))
                .sum::<f64>()
        })
        .collect();

    let mut order: Vec<usize> = (0..sentences.len()).collect();
    order.sort_by(|left, right| {
        scores[*right]
            .total_cmp(&scores[*left])
            .then_with(|| left.cmp(right))
    });
    order
}

fn normalize(vector: &mut HashMap<&str, f64>) {
    let norm = vector.values().map(|value| value * value).sum::<f64>().sqrt();
    if norm > 0.0 {
        for value in vector.values_mut() {
            *value /= norm;
        }
    }
}

/// Pick the `count` most representative sentences, returned in document order.
///
/// Texts with at most `count` sentences are returned whole.
pub fn select_key_sentences(text: &str, count: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    if sentences.len() <= count {
        return sentences;
    }

    let mut chosen: Vec<usize> = rank_sentences(&sentences).into_iter().take(count).collect();
    chosen.sort_unstable();
    chosen
        .into_iter()
        .map(|index| sentences[index].clone())
        .collect()
}

/// Pick top-ranked sentences until `max_words` is reached, returned in document order.
///
/// When even the best sentence is over budget it is cut to its first `max_words` words.
pub fn select_sentences_within_budget(text: &str, max_words: usize) -> Vec<String> {
    if max_words == 0 {
        return Vec::new();
    }
    let sentences = split_sentences(text);
    let mut used = 0usize;
    let mut chosen: Vec<(usize, String)> = Vec::new();

    for index in rank_sentences(&sentences) {
        let sentence = &sentences[index];
        let words = sentence.split_whitespace().count();
        if used + words <= max_words {
            used += words;
            chosen.push((index, sentence.clone()));
        } else if chosen.is_empty() {
            let truncated: Vec<&str> = sentence.split_whitespace().take(max_words).collect();
            chosen.push((index, truncated.join(" ")));
            break;
        }
    }

    chosen.sort_by_key(|(index, _)| *index);
    chosen.into_iter().map(|(_, sentence)| sentence).collect()
}

/// Derive labelled key points from a final summary.
pub fn extract_key_points(summary: &str) -> Vec<KeyPoint> {
    select_key_sentences(summary, KEY_POINT_COUNT)
        .into_iter()
        .enumerate()
        .map(|(position, text)| KeyPoint {
            label: format!("Key Point {}", position + 1),
            text,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_periods_and_question_marks() {
        let sentences = split_sentences("Is it benign? The scan says yes. Follow up in May.");
        assert_eq!(
            sentences,
            vec!["Is it benign?", "The scan says yes.", "Follow up in May."]
        );
    }

    #[test]
    fn keeps_abbreviations_inside_sentences() {
        let sentences =
            split_sentences("Dr. Smith reviewed it, e.g. the MRI series. Results were clear.");
        assert_eq!(
            sentences,
            vec![
                "Dr. Smith reviewed it, e.g. the MRI series.",
                "Results were clear."
            ]
        );
    }

    #[test]
    fn exclamation_marks_do_not_split() {
        assert_eq!(split_sentences("Stop! Now."), vec!["Stop! Now."]);
    }

    #[test]
    fn short_texts_are_returned_whole() {
        let sentences = select_key_sentences("One. Two.", 5);
        assert_eq!(sentences, vec!["One.", "Two."]);
    }

    #[test]
    fn ranking_prefers_central_sentences() {
        let text = "Diabetes raises blood glucose. \
                    Blood glucose control reduces diabetes complications. \
                    The cafeteria opens at noon. \
                    Glucose monitoring helps diabetes patients.";
        let chosen = select_key_sentences(text, 2);
        assert_eq!(chosen.len(), 2);
        assert!(!chosen.iter().any(|sentence| sentence.contains("cafeteria")));
    }

    #[test]
    fn selection_preserves_document_order() {
        let text = "Alpha beta gamma. Delta epsilon. Alpha beta gamma delta. Zeta eta. Alpha gamma.";
        let chosen = select_key_sentences(text, 3);
        let positions: Vec<usize> = chosen
            .iter()
            .map(|sentence| text.find(sentence.as_str()).expect("sentence present"))
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn budgeted_selection_truncates_oversized_sentence() {
        let chosen = select_sentences_within_budget("one two three four five six seven.", 3);
        assert_eq!(chosen, vec!["one two three"]);
        assert!(select_sentences_within_budget("anything.", 0).is_empty());
    }

    #[test]
    fn key_points_are_labelled_in_order() {
        let points = extract_key_points("First finding. Second finding.");
        assert_eq!(
            points,
            vec![
                KeyPoint {
                    label: "Key Point 1".into(),
                    text: "First finding.".into()
                },
                KeyPoint {
                    label: "Key Point 2".into(),
                    text: "Second finding.".into()
                },
            ]
        );
        assert!(extract_key_points("   ").is_empty());
    }
}
