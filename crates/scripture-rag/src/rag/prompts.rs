//! Prompt Templates
//!
//! Builders for the three synthesis requests the router sends: an answer
//! grounded in retrieved passages, a general-knowledge answer when retrieval
//! produced nothing, and a verse lookup carrying recent conversation. Also
//! the post-processing applied to every generated answer.

use regex::Regex;
use std::sync::LazyLock;

use super::retrieval_filter::FilteredPassages;

/// Appended to answers produced without any retrieved passage.
pub const GENERAL_DISCLAIMER: &str =
    "Note: No specific passages were retrieved for this question; response is based on general biblical teaching.";

const NO_PASSAGES_CONTEXT: &str =
    "No directly relevant passages were found in the index for this query.";

static CHAPTER_VERSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+:\d+\b").expect("chapter:verse regex is valid"));

pub fn build_answer_prompt(passages: &FilteredPassages, question: &str) -> String {
    let allowed = passages.allowed_references.join("; ");
    format!(
        "INSTRUCTIONS:\n\
         - You are a Bible study assistant.\n\
         - Use ONLY the Context passages below; do NOT quote or cite anything not present in Context.\n\
         - If Context is insufficient, say so briefly.\n\
         - Begin with a concise summary (2-4 sentences) that directly answers the question.\n\
         - You may weave in 1-3 direct quotations naturally within the summary only if they add clarity.\n\
         - Avoid bullet points or separate verse lists unless absolutely necessary.\n\
         - Do NOT fabricate content or references.\n\
         - Do NOT include a line that starts with 'Supporting verses:'.\n\n\
         Allowed references (must ONLY cite from this set): {allowed}\n\n\
         Context passages:\n{context}\n\n\
         Question:\n{question}\n\n\
         Answer:\n",
        allowed = allowed,
        context = passages.context(),
        question = question,
    )
}

pub fn build_general_prompt(question: &str) -> String {
    format!(
        "INSTRUCTIONS:\n\
         - You are a Bible study assistant.\n\
         - No specific passages were retrieved; answer from general biblical teaching in 2-3 sentences.\n\
         - If appropriate, you may reference well-known verses by book name (e.g., John 3:16) without quoting.\n\
         - Do NOT invent tasks, math problems, hypotheticals, or numbered lists.\n\n\
         Context:\n{NO_PASSAGES_CONTEXT}\n\n\
         Question:\n{question}\n\n\
         Answer:"
    )
}

/// Attach the disclaimer to a general-knowledge answer.
pub fn with_disclaimer(answer: &str) -> String {
    format!("{}\n\n{}", answer, GENERAL_DISCLAIMER)
}

/// Verse lookup request.
///
/// `verse_lines` holds only verses that resolved; it may be empty, in which
/// case the generator is told to say the passage could not be found.
/// `work_recognized` is false when the work name matched nothing in the
/// corpus.
pub fn build_lookup_prompt(
    memory_context: &str,
    verse_lines: &[String],
    question: &str,
    work_recognized: bool,
) -> String {
    let mut prompt = String::from(
        "INSTRUCTIONS:\n\
         - You are a Bible study assistant.\n\
         - Present the requested passage using the verses in Context.\n\
         - If Context holds no verses, say briefly that the passage could not be found; do not quote from memory.\n",
    );
    if !work_recognized {
        prompt.push_str("- The book named in the question was not recognized in the corpus.\n");
    }
    prompt.push_str("\nContext:\n");
    if !memory_context.is_empty() {
        prompt.push_str(memory_context);
        prompt.push('\n');
    }
    prompt.push_str(&verse_lines.join("\n"));
    prompt.push_str(&format!("\n\nQuestion: {}\nAnswer:", question));
    prompt
}

/// Drop a trailing line that looks like a verse quotation cut off mid-quote.
///
/// Only the last line is considered, and only when it has unbalanced quotes
/// and a `chapter:verse` pair. Trailing whitespace is always trimmed.
pub fn tidy_answer(text: &str) -> String {
    let mut lines: Vec<&str> = text.trim_end().lines().collect();
    let Some(last) = lines.last().map(|l| l.trim()) else {
        return String::new();
    };

    let ascii_unbalanced = last.matches('"').count() % 2 == 1;
    let curly_unbalanced = last.matches('\u{201C}').count() != last.matches('\u{201D}').count();

    if (ascii_unbalanced || curly_unbalanced) && CHAPTER_VERSE_RE.is_match(last) {
        lines.pop();
    }

    lines.join("\n").trim_end().to_string()
}
