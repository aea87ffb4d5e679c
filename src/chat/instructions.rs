use crate::rag::{DocumentMetadata, RetrievedDocument};

pub const SEARCH_TOOL: &str = "search_knowledge_base";

pub fn build_agent_instructions(max_steps: usize) -> String {
    format!(
        "You are the assistant for a revenue cycle management company that serves radiology practices.\n\
You answer questions about radiology billing, coding, denials, prior authorization, collections and practice performance, \
grounded in the company's case studies and white papers.\n\
You have access to one tool: {tool}.\n\
{tool} takes {{\"query\": \"<search text>\"}} and returns the most relevant case studies and white paper sections.\n\
You have at most {max_steps} steps. Search before answering.\n\
When you need to use the tool, respond ONLY with JSON in this format:\n\
{{\"type\":\"tool_call\",\"tool_name\":\"{tool}\",\"tool_args\":{{\"query\":\"...\"}}}}\n\
When you have enough context to answer, respond ONLY with JSON in this format:\n\
{{\"type\":\"final\"}}\n\
Do not include any extra text outside the JSON.",
        tool = SEARCH_TOOL,
    )
}

/// Instructions for the streamed answer. `found_documents` switches the
/// prompt to an explicit "nothing found" answer.
pub fn build_answer_instructions(found_documents: bool) -> String {
    let grounding = if found_documents {
        "Base your answer on the knowledge base results above. Mention the relevant case study or white paper by title when you rely on it. \
Do not invent figures that are not in the results."
    } else {
        "The knowledge base search returned no documents. Say plainly that you could not find relevant material in the knowledge base, \
then offer general guidance and suggest contacting the team for specifics. Do not invent case studies or figures."
    };

    format!(
        "Write the final answer for the user now, in plain prose without JSON.\n{}\nKeep it concise and practical.",
        grounding
    )
}

pub fn format_tool_result(query: &str, documents: &[RetrievedDocument]) -> String {
    if documents.is_empty() {
        return format!(
            "Tool `{}` result for \"{}\":\nNo documents found.",
            SEARCH_TOOL, query
        );
    }

    let mut out = format!(
        "Tool `{}` result for \"{}\" ({} documents):",
        SEARCH_TOOL,
        query,
        documents.len()
    );
    for (i, doc) in documents.iter().enumerate() {
        out.push_str(&format!("\n\n[{}] {}", i + 1, describe(&doc.metadata)));
        out.push_str(&format!("\nRelevance: {:.3}", doc.relevance_score));
        out.push('\n');
        out.push_str(doc.content.trim());
    }
    out
}

fn describe(metadata: &DocumentMetadata) -> String {
    match metadata {
        DocumentMetadata::CaseStudy(cs) => {
            let mut text = format!("Case study: {} (client: {}", cs.title, cs.client_name);
            if let Some(kind) = &cs.client_type {
                text.push_str(&format!(", {}", kind));
            }
            text.push(')');
            for (label, value) in [
                ("Challenge", &cs.challenge),
                ("Solution", &cs.solution),
                ("Results", &cs.results),
            ] {
                if !value.trim().is_empty() {
                    text.push_str(&format!("\n{}: {}", label, value.trim()));
                }
            }
            text
        }
        DocumentMetadata::WhitePaperChunk(wp) => {
            let mut text = format!("White paper: {} / {}", wp.title, wp.section_title);
            if !wp.key_points.is_empty() {
                text.push_str(&format!("\nKey points: {}", wp.key_points.join("; ")));
            }
            text
        }
    }
}
