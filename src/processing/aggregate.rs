//! Final-summary assembly.
//!
//! Chunk summaries are joined as-is: in chunk order, one space between each, then trimmed.
//! There is no second summarization pass over the joined text, so long documents produce
//! summaries proportionally longer than a single chunk's.

/// Join per-chunk summaries into the document summary.
pub fn aggregate_summaries<I, S>(summaries: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut combined = String::new();
    for summary in summaries {
        combined.push_str(summary.as_ref());
        combined.push(' ');
    }
    combined.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_in_order_with_single_space() {
        assert_eq!(aggregate_summaries(["A.", "B."]), "A. B.");
    }

    #[test]
    fn keeps_duplicates_and_order() {
        let summaries = vec!["Second.".to_string(), "First.".into(), "Second.".into()];
        assert_eq!(aggregate_summaries(&summaries), "Second. First. Second.");
    }

    #[test]
    fn trims_outer_whitespace_only() {
        assert_eq!(aggregate_summaries([" A. ", "B.\n"]), "A.  B.");
    }

    #[test]
    fn no_summaries_yield_empty_string() {
        assert_eq!(aggregate_summaries(Vec::<String>::new()), "");
    }
}
