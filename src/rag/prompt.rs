//! Prompt Assembly
//!
//! Fixed instruction template filled with retrieved context and the question.

use crate::vector::RankedMatch;

const TEMPLATE: &str = "\
You're an expert assistant with senior software engineering experience and a problem solver, \
doing whatever workaround is necessary to accomplish your goals.

If possible, build your answer on everything useful in the 'Context' section below, \
and use outside resources only when needed to complete the answer.

Try as hard as you can to answer the question, but if you don't know the answer, \
say that you don't know and, if possible, suggest a way to find it.

Answer in the same language the question was written in.

Context:
{context}

Question:
{question}
";

/// Join matched messages, best first
pub fn build_context(matches: &[RankedMatch], separator: &str) -> String {
    matches
        .iter()
        .map(|m| m.record.message.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Render the full generation prompt
pub fn build_prompt(matches: &[RankedMatch], question: &str, separator: &str) -> String {
    let context = build_context(matches, separator);
    // The {context} slot precedes the question, so neither replacement can hit user text
    TEMPLATE
        .replacen("{question}", question, 1)
        .replacen("{context}", &context, 1)
}
