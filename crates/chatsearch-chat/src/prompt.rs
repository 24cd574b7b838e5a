//! Prompt rendering for search-grounded answers.

use chatsearch_core::Summary;

/// Fixed instruction block placed before the question.
pub const PROMPT_PREAMBLE: &str = "Generate a comprehensive and informative answer (but no more than 80 words) for a given question solely based on the provided web Search Results (URL, Title and Summary). You must only use information from the provided search results. Use an unbiased and journalistic tone. Combine search results together into a coherent answer. Do not repeat text. Cite search results using [${number}] notation. Provide a citation for every sentence. Only cite the most relevant results that answer the question accurately. If different results refer to different entities with the same name, write separate answers for each entity.";

/// Render the question and its search results into one prompt.
///
/// Results are numbered from 1 in input order; those numbers are what the
/// model cites. Output depends on nothing but the arguments.
pub fn build_prompt(question: &str, summaries: &[Summary]) -> String {
    let results: Vec<String> = summaries
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "\n# Search result [{}]\n# Title: {}\n# Summary: {}\n# URL: {}",
                i + 1,
                s.title,
                s.summary,
                s.url
            )
        })
        .collect();

    format!(
        "\n{}\n\n# Question: {}\n\n{}\n",
        PROMPT_PREAMBLE,
        question,
        results.join("\n")
    )
}
