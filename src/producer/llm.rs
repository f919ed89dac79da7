//! # Productor basado en LLM
//! src/producer/llm.rs
//!
//! Colaboradores externos detrás de traits: un servicio de completion,
//! y opcionalmente búsqueda web e imágenes. El transporte concreto
//! (HTTP, credenciales) lo provee quien implemente los traits.

use crate::error::{Error, Result};
use crate::jobs::types::JobRecord;
use crate::producer::ScriptProducer;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Resultados por búsqueda que se agregan al prompt
const DEFAULT_RESEARCH_LIMIT: usize = 5;

/// Servicio que completa un prompt con texto
pub trait CompletionService: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Resultado de una búsqueda web
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

pub trait WebSearch: Send + Sync {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;
}

/// Metadata de una imagen encontrada
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub source: Option<String>,
}

pub trait ImageSearch: Send + Sync {
    fn search_images(&self, query: &str, limit: usize) -> Result<Vec<ImageHit>>;
}

/// Productor que investiga el tema y le pide el guion a un LLM
///
/// Si una búsqueda falla se sigue sin ese contexto. Si falla la
/// completion, el error se propaga como `Upstream` y el job sigue
/// pendiente.
pub struct LlmProducer<C> {
    completion: C,
    web: Option<Box<dyn WebSearch>>,
    images: Option<Box<dyn ImageSearch>>,
    research_limit: usize,
}

impl<C: CompletionService> LlmProducer<C> {
    pub fn new(completion: C) -> Self {
        Self {
            completion,
            web: None,
            images: None,
            research_limit: DEFAULT_RESEARCH_LIMIT,
        }
    }

    pub fn with_web_search(mut self, web: impl WebSearch + 'static) -> Self {
        self.web = Some(Box::new(web));
        self
    }

    pub fn with_image_search(mut self, images: impl ImageSearch + 'static) -> Self {
        self.images = Some(Box::new(images));
        self
    }

    pub fn with_research_limit(mut self, limit: usize) -> Self {
        self.research_limit = limit;
        self
    }

    fn research(&self, job: &JobRecord) -> Vec<SearchHit> {
        let Some(web) = &self.web else {
            return Vec::new();
        };

        match web.search(&job.topic, self.research_limit) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(id = %job.id, error = %e, "búsqueda web fallida, se sigue sin contexto");
                Vec::new()
            }
        }
    }

    fn find_images(&self, job: &JobRecord) -> Vec<ImageHit> {
        let Some(images) = &self.images else {
            return Vec::new();
        };

        match images.search_images(&job.topic, self.research_limit) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(id = %job.id, error = %e, "búsqueda de imágenes fallida");
                Vec::new()
            }
        }
    }
}

/// Arma el prompt para un job a partir de su registro y la investigación
pub fn build_prompt(job: &JobRecord, research: &[SearchHit]) -> String {
    let mut prompt = format!("Write a narrated video script about: {}\n", job.topic);

    if let Some(category) = &job.category {
        prompt.push_str(&format!("Category: {}\n", category));
    }
    if !job.notes.trim().is_empty() {
        prompt.push_str(&format!("Notes from the requester: {}\n", job.notes.trim()));
    }

    if !research.is_empty() {
        prompt.push_str("\nBackground sources:\n");
        for hit in research {
            prompt.push_str(&format!("- {} ({}): {}\n", hit.title, hit.url, hit.snippet));
        }
    }

    prompt.push_str("\nReturn only the script body in Markdown.\n");
    prompt
}

/// Sección de imágenes que se agrega al final del guion
fn image_section(images: &[ImageHit]) -> String {
    let mut section = String::from("\n\n## Images\n");
    for image in images {
        match &image.source {
            Some(source) => section.push_str(&format!("\n- [{}]({}) ({})", image.title, image.url, source)),
            None => section.push_str(&format!("\n- [{}]({})", image.title, image.url)),
        }
    }
    section
}

impl<C: CompletionService> ScriptProducer for LlmProducer<C> {
    fn produce(&self, job: &JobRecord) -> Result<Option<String>> {
        let research = self.research(job);
        let prompt = build_prompt(job, &research);
        debug!(id = %job.id, sources = research.len(), "pidiendo completion");

        let text = self.completion.complete(&prompt)?;
        let body = text.trim();
        if body.is_empty() {
            return Err(Error::upstream("completion", "empty completion"));
        }

        let mut script = body.to_string();
        let images = self.find_images(job);
        if !images.is_empty() {
            script.push_str(&image_section(&images));
        }

        Ok(Some(script))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    fn job() -> JobRecord {
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        JobRecord::pending(
            "Roman Aqueducts".into(),
            Some("history".into()),
            "keep it short".into(),
            at,
        )
    }

    /// Completion falsa que guarda el último prompt
    struct Recorder {
        reply: String,
        last_prompt: Mutex<Option<String>>,
    }

    impl Recorder {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                last_prompt: Mutex::new(None),
            }
        }
    }

    impl CompletionService for &'static Recorder {
        fn complete(&self, prompt: &str) -> Result<String> {
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    struct Failing;

    impl CompletionService for Failing {
        fn complete(&self, _prompt: &str) -> Result<String> {
            Err(Error::upstream("completion", "429 Too Many Requests"))
        }
    }

    struct Canned(Vec<SearchHit>);

    impl WebSearch for Canned {
        fn search(&self, _query: &str, limit: usize) -> Result<Vec<SearchHit>> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    struct BrokenSearch;

    impl WebSearch for BrokenSearch {
        fn search(&self, _query: &str, _limit: usize) -> Result<Vec<SearchHit>> {
            Err(Error::upstream("search", "timeout"))
        }
    }

    struct OneImage;

    impl ImageSearch for OneImage {
        fn search_images(&self, _query: &str, _limit: usize) -> Result<Vec<ImageHit>> {
            Ok(vec![ImageHit {
                title: "Pont du Gard".into(),
                url: "https://img.example/pont.jpg".into(),
                source: Some("CC BY-SA".into()),
            }])
        }
    }

    fn leak(recorder: Recorder) -> &'static Recorder {
        Box::leak(Box::new(recorder))
    }

    #[test]
    fn test_build_prompt_includes_record_fields() {
        let prompt = build_prompt(&job(), &[]);

        assert!(prompt.contains("Roman Aqueducts"));
        assert!(prompt.contains("Category: history"));
        assert!(prompt.contains("keep it short"));
        assert!(!prompt.contains("Background sources"));
    }

    #[test]
    fn test_produce_uses_research() {
        let recorder = leak(Recorder::new("  Water flowed downhill.\n"));
        let hits = vec![SearchHit {
            title: "Aqueduct".into(),
            url: "https://wiki.example/aqueduct".into(),
            snippet: "A watercourse".into(),
        }];
        let producer = LlmProducer::new(recorder).with_web_search(Canned(hits));

        let body = producer.produce(&job()).unwrap();

        assert_eq!(body.as_deref(), Some("Water flowed downhill."));
        let prompt = recorder.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("https://wiki.example/aqueduct"));
    }

    #[test]
    fn test_research_limit() {
        let recorder = leak(Recorder::new("ok"));
        let hits = (0..10)
            .map(|i| SearchHit {
                title: format!("hit {}", i),
                url: format!("https://e.example/{}", i),
                snippet: String::new(),
            })
            .collect();
        let producer = LlmProducer::new(recorder)
            .with_web_search(Canned(hits))
            .with_research_limit(2);

        producer.produce(&job()).unwrap();

        let prompt = recorder.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("hit 1"));
        assert!(!prompt.contains("hit 2"));
    }

    #[test]
    fn test_search_failure_is_not_fatal() {
        let recorder = leak(Recorder::new("still works"));
        let producer = LlmProducer::new(recorder).with_web_search(BrokenSearch);

        assert_eq!(producer.produce(&job()).unwrap().as_deref(), Some("still works"));
    }

    #[test]
    fn test_completion_failure_is_upstream() {
        let err = LlmProducer::new(Failing).produce(&job()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Upstream);
    }

    #[test]
    fn test_empty_completion_is_upstream() {
        let recorder = leak(Recorder::new("   \n"));
        let err = LlmProducer::new(recorder).produce(&job()).unwrap_err();
        assert!(err.to_string().contains("empty completion"));
    }

    #[test]
    fn test_images_appended() {
        let recorder = leak(Recorder::new("Body."));
        let producer = LlmProducer::new(recorder).with_image_search(OneImage);

        let body = producer.produce(&job()).unwrap().unwrap();
        assert!(body.starts_with("Body.\n\n## Images\n"));
        assert!(body.contains("- [Pont du Gard](https://img.example/pont.jpg) (CC BY-SA)"));
    }
}
