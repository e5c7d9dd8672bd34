//! Prompt templates for knowledge-grounded answers

use crate::types::{ChatMessage, KnowledgeRecord, SourceKind};

use super::{ChatPrompt, PromptMessage};

/// Prompt builder for chat and insight requests
pub struct PromptBuilder;

impl PromptBuilder {
    /// Numbered context block from retrieved records
    pub fn build_context(records: &[KnowledgeRecord]) -> String {
        let mut context = String::new();

        for (i, record) in records.iter().enumerate() {
            context.push_str(&format!(
                "[{}] {}\n{}\n\n---\n\n",
                i + 1,
                Self::format_source_ref(record),
                record.content
            ));
        }

        context
    }

    /// `(official) Topic` or `(student tip, WS24/25) Topic`
    fn format_source_ref(record: &KnowledgeRecord) -> String {
        let mut label = match record.source {
            SourceKind::Official => "official".to_string(),
            SourceKind::Student => "student tip".to_string(),
        };
        if let Some(semester) = record.semester.as_deref().filter(|s| !s.is_empty()) {
            label.push_str(", ");
            label.push_str(semester);
        }
        format!("({}) {}", label, record.topic)
    }

    /// Chat prompt grounded in the knowledge base
    pub fn chat_prompt(question: &str, records: &[KnowledgeRecord], history: &[ChatMessage]) -> ChatPrompt {
        let context = if records.is_empty() {
            "No matching records were found.".to_string()
        } else {
            Self::build_context(records)
        };

        let system = format!(
            r#"You are Mentor AI, an assistant for students of Hochschule Darmstadt (h_da).

Answer using the CONTEXT below. It mixes official information from the university
website with informal tips written by other students.

RULES:
1. Prefer official information for rules, deadlines and fees; present student tips as experiences, not facts
2. Cite the records you use by their number, e.g. [1] or [2][3]
3. If official and student records disagree, say so and cite both
4. If the context does not answer the question, say that you do not know and suggest asking the student office
5. Answer in the language of the question

CONTEXT:
{context}"#,
            context = context
        );

        ChatPrompt {
            system,
            history: history
                .iter()
                .map(|m| PromptMessage::from_role(m.role, m.message.clone()))
                .collect(),
            question: question.to_string(),
        }
    }

    /// Prompt asking for a short insight on a topic
    pub fn insight_prompt(query: &str, records: &[KnowledgeRecord]) -> ChatPrompt {
        let system = format!(
            r#"You summarize what is known about a topic for students of Hochschule Darmstadt (h_da).

Write at most three sentences using ONLY the records below. Point out where official
information and student tips agree or differ. Cite records by their number, e.g. [1].

RECORDS:
{context}"#,
            context = Self::build_context(records)
        );

        ChatPrompt {
            system,
            history: Vec::new(),
            question: query.to_string(),
        }
    }
}
