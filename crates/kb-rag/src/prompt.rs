use kb_core::types::Chunk;

pub const SYSTEM_PROMPT: &str = "You are a precise knowledge base assistant.
Your task is to answer the user's question strictly based on the provided context documents.

Rules:
1. Use ONLY the information from the context. Do not use outside knowledge.
2. If the answer is not present in the context, state clearly: \"I cannot find the answer in the provided documents.\"
3. Cite your sources in detail. Append the reference at the end of the sentence.
   - Format: [Source: filename, Page: X] (if Page is available)
   - Or: [Source: filename] (if Page is N/A)
4. IMPORTANT: Answer in the SAME LANGUAGE as the user's question.
5. Keep the answer concise and relevant.
";

/// Numbered context blocks, e.g.
/// `[Document 1] (Source: manual.pdf, Page: 3, Chunk: 0)` followed by the text.
pub fn format_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let meta = &chunk.metadata;
            let mut location = format!("Source: {}", meta.source);
            if let Some(page) = meta.page_number {
                location.push_str(&format!(", Page: {page}"));
            }
            if let Some(idx) = meta.chunk_index {
                location.push_str(&format!(", Chunk: {idx}"));
            }
            format!("[Document {}] ({})\n{}", i + 1, location, chunk.content.trim())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_rag_prompt(query: &str, chunks: &[Chunk]) -> String {
    format!(
        "Context information is below:
---------------------
{}
---------------------

Given the context information and not prior knowledge, answer the query.
Query: {}
",
        format_context(chunks),
        query
    )
}
