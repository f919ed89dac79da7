//! # Tipos y Estructuras para el Sistema de Jobs
//! src/jobs/types.rs
//!
//! Define el Job Record que viaja por la cola, la petición de envío
//! y las funciones que derivan ids y slugs a partir del topic.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]").unwrap());
static TIMESTAMP_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+-").unwrap());

/// Estado de un job tal como queda escrito en su registro
///
/// El núcleo solo escribe `pending`; `done` se deriva de la existencia
/// del artefacto. Un worker externo puede escribir otros estados y se
/// conservan tal cual.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    /// Job en cola esperando al worker
    #[default]
    Pending,

    /// Job con artefacto disponible
    Done,

    /// Cualquier otro estado escrito por terceros
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Done => "done",
            JobStatus::Other(s) => s,
        }
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" | "" => JobStatus::Pending,
            "done" => JobStatus::Done,
            _ => JobStatus::Other(s),
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

/// Registro persistido de un job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    /// `<epochMillis>-<slug>`
    pub id: String,

    pub topic: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default)]
    pub notes: String,

    #[serde(default)]
    pub status: JobStatus,

    /// Instante de envío, con precisión de milisegundos
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    /// Crea un registro pendiente para el instante `created_at`
    ///
    /// El id se arma con los milisegundos de `created_at`, así id y
    /// timestamp siempre coinciden.
    pub fn pending(
        topic: String,
        category: Option<String>,
        notes: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        let id = job_id(created_at.timestamp_millis(), &topic);
        Self {
            id,
            topic,
            category,
            notes,
            status: JobStatus::Pending,
            created_at,
        }
    }

    /// Slug del topic, clave del artefacto en el modo legacy
    pub fn slug(&self) -> String {
        slugify(&self.topic)
    }
}

/// Body de `POST /generate-script`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JobSubmission {
    pub topic: Option<String>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,
}

impl JobSubmission {
    pub fn new(topic: &str) -> Self {
        Self {
            topic: Some(topic.to_string()),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }
}

/// Normaliza texto libre a un nombre seguro para el filesystem
///
/// Cada caracter fuera de `[A-Za-z0-9]` se vuelve `-` (uno por caracter)
/// y el resultado queda en minúsculas.
///
/// # Ejemplo
/// ```
/// use script_queue::jobs::types::slugify;
/// assert_eq!(slugify("Roman Aqueducts"), "roman-aqueducts");
/// assert_eq!(slugify("A!!"), "a--");
/// ```
pub fn slugify(text: &str) -> String {
    NON_ALPHANUMERIC.replace_all(text, "-").to_lowercase()
}

/// Arma el id `<millis>-<slug>`
pub fn job_id(millis: i64, topic: &str) -> String {
    format!("{}-{}", millis, slugify(topic))
}

/// Quita el prefijo `<digitos>-` de un id
///
/// # Ejemplo
/// ```
/// use script_queue::jobs::types::strip_timestamp_prefix;
/// assert_eq!(strip_timestamp_prefix("1700000000000-roman-aqueducts"), "roman-aqueducts");
/// assert_eq!(strip_timestamp_prefix("no-prefix"), "no-prefix");
/// ```
pub fn strip_timestamp_prefix(id: &str) -> &str {
    match TIMESTAMP_PREFIX.find(id) {
        Some(m) => &id[m.end()..],
        None => id,
    }
}
