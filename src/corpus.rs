//! Corpus and question loading
//!
//! - `docs.json`: array of `{topic_id, docs: [{title, snippet, content}]}`
//! - `questions.jsonl`: one question per line (`topic_id`, `uuid`,
//!   `target_event`, `option_A`..`option_D`, `golden_answer`)
//!
//! Corpora are per topic. The short text of a document is `title + " " + snippet`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Topic identifier - numeric in the released data, strings tolerated
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopicId {
    Int(i64),
    Str(String),
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicId::Int(id) => write!(f, "{}", id),
            TopicId::Str(id) => write!(f, "{}", id),
        }
    }
}

/// One topic's documents as parallel full/short text sequences
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    pub full_texts: Vec<String>,
    pub short_texts: Vec<String>,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.full_texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.full_texts.is_empty()
    }

    pub fn push(&mut self, title: &str, snippet: &str, content: &str) {
        self.short_texts.push(format!("{} {}", title, snippet));
        self.full_texts.push(content.to_string());
    }
}

/// A target event with its candidate causes
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub topic_id: TopicId,
    pub uuid: String,
    pub event: String,
    /// Options A-D, in order
    pub options: Vec<String>,
    pub answer: Option<String>,
}

#[derive(Deserialize)]
struct RawTopic {
    topic_id: TopicId,
    #[serde(default)]
    docs: Vec<RawDocument>,
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct RawQuestion {
    topic_id: TopicId,
    uuid: String,
    target_event: String,
    #[serde(rename = "option_A")]
    option_a: String,
    #[serde(rename = "option_B")]
    option_b: String,
    #[serde(rename = "option_C")]
    option_c: String,
    #[serde(rename = "option_D")]
    option_d: String,
    #[serde(default)]
    golden_answer: Option<String>,
}

impl From<RawQuestion> for Question {
    fn from(raw: RawQuestion) -> Self {
        Self {
            topic_id: raw.topic_id,
            uuid: raw.uuid,
            event: raw.target_event,
            options: vec![raw.option_a, raw.option_b, raw.option_c, raw.option_d],
            answer: raw.golden_answer,
        }
    }
}

/// Load per-topic corpora from `docs.json`
pub fn load_corpora(path: &Path) -> Result<HashMap<TopicId, Corpus>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read documents: {}", path.display()))?;
    let topics: Vec<RawTopic> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse documents: {}", path.display()))?;

    let mut corpora = HashMap::with_capacity(topics.len());
    for topic in topics {
        let mut corpus = Corpus::default();
        for doc in &topic.docs {
            corpus.push(&doc.title, &doc.snippet, &doc.content);
        }
        corpora.insert(topic.topic_id, corpus);
    }
    Ok(corpora)
}

/// Load questions from `questions.jsonl`
///
/// Blank lines are ignored; lines that fail to parse are skipped with a warning.
pub fn load_questions(path: &Path) -> Result<Vec<Question>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read questions: {}", path.display()))?;

    let mut questions = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RawQuestion>(line) {
            Ok(raw) => questions.push(raw.into()),
            Err(e) => warn!(line = line_no + 1, error = %e, "skipping malformed question"),
        }
    }
    Ok(questions)
}

/// Questions plus the corpora they refer to
#[derive(Debug, Default)]
pub struct Dataset {
    pub corpora: HashMap<TopicId, Corpus>,
    pub questions: Vec<Question>,
}

impl Dataset {
    pub fn load(docs_path: &Path, questions_path: &Path) -> Result<Self> {
        Ok(Self {
            corpora: load_corpora(docs_path)?,
            questions: load_questions(questions_path)?,
        })
    }

    /// Corpus for a question's topic, if the topic has documents
    pub fn corpus_for(&self, question: &Question) -> Option<&Corpus> {
        self.corpora.get(&question.topic_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_push_builds_short_text() {
        let mut corpus = Corpus::default();
        corpus.push("Ash cloud", "Flights grounded", "Full story");
        assert_eq!(corpus.short_texts, vec!["Ash cloud Flights grounded"]);
        assert_eq!(corpus.full_texts, vec!["Full story"]);
        assert_eq!(corpus.len(), 1);
    }

    #[test]
    fn test_topic_id_untagged() {
        let int: TopicId = serde_json::from_str("7").unwrap();
        let string: TopicId = serde_json::from_str("\"t-7\"").unwrap();
        assert_eq!(int, TopicId::Int(7));
        assert_eq!(string.to_string(), "t-7");
    }

    #[test]
    fn test_question_from_raw() {
        let line = r#"{"topic_id": 3, "uuid": "u1", "target_event": "E", "option_A": "a", "option_B": "b", "option_C": "c", "option_D": "d", "golden_answer": "A,C"}"#;
        let question: Question = serde_json::from_str::<RawQuestion>(line).unwrap().into();
        assert_eq!(question.options, vec!["a", "b", "c", "d"]);
        assert_eq!(question.answer.as_deref(), Some("A,C"));
        assert_eq!(question.topic_id, TopicId::Int(3));
    }
}
