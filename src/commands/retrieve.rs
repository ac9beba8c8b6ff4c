use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use evidence::corpus::{Corpus, Dataset, Question, TopicId};
use evidence::{Retriever, ScoredDocument, Settings};

pub struct RetrieveOptions {
    pub docs: PathBuf,
    pub questions: PathBuf,
    pub config: PathBuf,
    pub limit: Option<usize>,
    pub top_k: Option<usize>,
    pub lexical_only: bool,
}

#[derive(Serialize)]
struct EvidenceLine<'a> {
    uuid: &'a str,
    topic_id: &'a TopicId,
    documents: Vec<RankedEvidence>,
}

#[derive(Serialize)]
struct RankedEvidence {
    rank: usize,
    #[serde(flatten)]
    document: ScoredDocument,
}

pub fn execute(options: RetrieveOptions) -> Result<()> {
    let mut settings = Settings::load(&options.config)?;
    if let Some(top_k) = options.top_k {
        settings.retrieval.top_k = top_k;
        settings.retrieval.coarse_top_k = settings.retrieval.coarse_top_k.max(top_k);
    }

    let retriever = if options.lexical_only {
        Retriever::lexical_only(settings.retrieval_config())?
    } else {
        Retriever::from_settings(&settings)?
    };
    info!(
        scorers = ?retriever.scorer_names(),
        top_k = retriever.config().top_k,
        coarse_top_k = retriever.config().coarse_top_k,
        "retriever ready"
    );

    let mut dataset = Dataset::load(&options.docs, &options.questions)?;
    if let Some(limit) = options.limit {
        dataset.questions.truncate(limit);
    }

    let started = Instant::now();
    let empty = Corpus::default();

    // Questions are independent; the retriever is shared read-only
    let lines: Vec<String> = dataset
        .questions
        .par_iter()
        .map(|question| {
            let corpus = dataset.corpus_for(question).unwrap_or(&empty);
            retrieve_one(&retriever, question, corpus)
        })
        .collect::<Result<_>>()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in &lines {
        writeln!(out, "{}", line)?;
    }

    info!(
        questions = lines.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "retrieval complete"
    );
    Ok(())
}

fn retrieve_one(retriever: &Retriever, question: &Question, corpus: &Corpus) -> Result<String> {
    let documents = retriever
        .retrieve_with_scores(
            &question.event,
            &corpus.short_texts,
            &corpus.full_texts,
            Some(question.options.as_slice()),
        )
        .with_context(|| format!("Retrieval failed for question {}", question.uuid))?;

    let line = EvidenceLine {
        uuid: &question.uuid,
        topic_id: &question.topic_id,
        documents: documents
            .into_iter()
            .enumerate()
            .map(|(i, document)| RankedEvidence {
                rank: i + 1,
                document,
            })
            .collect(),
    };

    Ok(serde_json::to_string(&line)?)
}
