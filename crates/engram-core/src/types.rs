//! Record types shared across the memory modules
//!
//! All identifiers are opaque UUID-shaped strings. All timestamps are Unix
//! seconds as `f64`, both on the wire and in the stores; `now_ts` is the one
//! place the wall clock is read.

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{FieldError, MemoryError, Result};

/// Current wall-clock time as Unix seconds
pub fn now_ts() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Fresh opaque record id
pub fn fresh_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ============================================================================
// MEMORY TYPES
// ============================================================================

/// The five memory families served by the LTM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    Episodic,
    Semantic,
    Temporal,
    Procedural,
    Evaluator,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Episodic => "episodic",
            MemoryType::Semantic => "semantic",
            MemoryType::Temporal => "temporal",
            MemoryType::Procedural => "procedural",
            MemoryType::Evaluator => "evaluator",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "episodic" => Some(MemoryType::Episodic),
            "semantic" => Some(MemoryType::Semantic),
            "temporal" => Some(MemoryType::Temporal),
            "procedural" => Some(MemoryType::Procedural),
            "evaluator" => Some(MemoryType::Evaluator),
            _ => None,
        }
    }

    pub const ALL: [MemoryType; 5] = [
        MemoryType::Episodic,
        MemoryType::Semantic,
        MemoryType::Temporal,
        MemoryType::Procedural,
        MemoryType::Evaluator,
    ];
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// PROVENANCE
// ============================================================================

/// Who wrote a record, when, and from what
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provenance {
    /// Producer identity
    pub source: String,
    /// Server-assigned write time
    pub recorded_at: f64,
    /// Records this one was derived from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_ids: Option<Vec<String>>,
}

impl Provenance {
    /// Provenance stamped at the current wall-clock
    pub fn now(source: impl Into<String>, parent_ids: Option<Vec<String>>) -> Self {
        Self {
            source: source.into(),
            recorded_at: now_ts(),
            parent_ids,
        }
    }
}

/// Fallback producer identity when the caller does not name one
pub const UNSPECIFIED_SOURCE: &str = "unspecified";

// ============================================================================
// EPISODIC RECORDS
// ============================================================================

/// One completed task experience, vector-indexed by its task query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodicRecord {
    pub id: String,
    pub task_query: String,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Value>,
    /// Quality score in [0, 1]
    pub score: f64,
    /// Derived embedding of `task_query`; dimension is deployment-constant
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    pub created_at: f64,
    pub last_accessed_at: f64,
    pub access_count: u64,
    pub provenance: Provenance,
}

/// Client-supplied episodic record
///
/// `created_at` / `last_accessed_at` may be set by producers backfilling
/// replayed history; both default to the server clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EpisodicDraft {
    pub task_query: String,
    pub outcome: String,
    #[serde(default)]
    pub plan: Option<Value>,
    pub score: f64,
    #[serde(default)]
    pub created_at: Option<f64>,
    #[serde(default)]
    pub last_accessed_at: Option<f64>,
}

impl EpisodicDraft {
    /// Range-check the draft; shape errors are caught by serde
    pub fn validate(&self) -> Result<()> {
        let mut fields = vec![];
        if self.task_query.trim().is_empty() {
            fields.push(FieldError::new("record.task_query", "must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.score) {
            fields.push(FieldError::new("record.score", "must be within [0, 1]"));
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(MemoryError::validation_fields("invalid episodic record", fields))
        }
    }
}

// ============================================================================
// SEMANTIC TRIPLES
// ============================================================================

/// One fact in the knowledge graph
///
/// Node identity is `name`; relation identity is the full triple. Two writes
/// of the same triple collapse into one relation (MERGE semantics).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SemanticTriple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl SemanticTriple {
    /// MERGE identity key of the relation
    pub fn relation_key(&self) -> String {
        format!("{}::{}::{}", self.subject, self.predicate, self.object)
    }

    pub fn validate(&self) -> Result<()> {
        let mut fields = vec![];
        for (name, value) in [
            ("subject", &self.subject),
            ("predicate", &self.predicate),
            ("object", &self.object),
        ] {
            if value.trim().is_empty() {
                fields.push(FieldError::new(name, "must not be empty"));
            }
        }
        if let Some(c) = self.confidence {
            if !(0.0..=1.0).contains(&c) {
                fields.push(FieldError::new("confidence", "must be within [0, 1]"));
            }
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(MemoryError::validation_fields("invalid triple", fields))
        }
    }
}

/// Pattern over triples; `None` acts as a wildcard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: Option<String>,
    pub predicate: Option<String>,
    pub object: Option<String>,
}

impl TriplePattern {
    /// Build from a metadata mapping; unknown keys are rejected
    pub fn from_metadata(map: &Map<String, Value>) -> Result<Self> {
        let mut pattern = Self::default();
        for (key, value) in map {
            let Some(text) = value.as_str() else {
                return Err(MemoryError::validation_fields(
                    "invalid semantic query",
                    vec![FieldError::new(key.clone(), "must be a string")],
                ));
            };
            match key.as_str() {
                "subject" => pattern.subject = Some(text.to_string()),
                "predicate" => pattern.predicate = Some(text.to_string()),
                "object" => pattern.object = Some(text.to_string()),
                other => {
                    return Err(MemoryError::validation_fields(
                        "invalid semantic query",
                        vec![FieldError::new(
                            other.to_string(),
                            "expected one of subject, predicate, object",
                        )],
                    ));
                }
            }
        }
        Ok(pattern)
    }

    pub fn matches(&self, triple: &SemanticTriple) -> bool {
        self.subject.as_deref().is_none_or(|s| s == triple.subject)
            && self.predicate.as_deref().is_none_or(|p| p == triple.predicate)
            && self.object.as_deref().is_none_or(|o| o == triple.object)
    }
}

/// Entity node in a propagated subgraph; identity is `name`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySpec {
    pub name: String,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

// ============================================================================
// TEMPORAL FACTS
// ============================================================================

/// WGS84 point
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

/// Closed bounding box; a zero-area box is a legal point query
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn validate(&self) -> Result<()> {
        let mut fields = vec![];
        if self.min_lon > self.max_lon {
            fields.push(FieldError::new("bbox", "min_lon must be <= max_lon"));
        }
        if self.min_lat > self.max_lat {
            fields.push(FieldError::new("bbox", "min_lat must be <= max_lat"));
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(MemoryError::validation_fields("invalid bounding box", fields))
        }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.lon >= self.min_lon
            && point.lon <= self.max_lon
            && point.lat >= self.min_lat
            && point.lat <= self.max_lat
    }

    /// Parse `min_lon,min_lat,max_lon,max_lat`
    pub fn parse_csv(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(MemoryError::validation_fields(
                "invalid bounding box",
                vec![FieldError::new(
                    "bbox",
                    "expected min_lon,min_lat,max_lon,max_lat",
                )],
            ));
        }
        let mut coords = [0.0f64; 4];
        for (i, part) in parts.iter().enumerate() {
            coords[i] = part.parse().map_err(|_| {
                MemoryError::validation_fields(
                    "invalid bounding box",
                    vec![FieldError::new("bbox", format!("`{part}` is not a number"))],
                )
            })?;
        }
        let bbox = Self {
            min_lon: coords[0],
            min_lat: coords[1],
            max_lon: coords[2],
            max_lat: coords[3],
        };
        bbox.validate()?;
        Ok(bbox)
    }
}

/// Real-world validity window; an open end is treated as +inf
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimeWindow {
    pub valid_from: f64,
    pub valid_to: Option<f64>,
}

impl TimeWindow {
    pub fn end(&self) -> f64 {
        self.valid_to.unwrap_or(f64::INFINITY)
    }

    /// Closed-interval intersection
    pub fn intersects(&self, other: &TimeWindow) -> bool {
        self.valid_from <= other.end() && other.valid_from <= self.end()
    }

    pub fn contains(&self, instant: f64) -> bool {
        instant >= self.valid_from && instant <= self.end()
    }
}

/// One bitemporal assertion
///
/// A new version of the same `(subject, predicate)` never overwrites prior
/// versions; it appends with its own `tx_time` and `valid_from`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalFact {
    pub id: String,
    pub subject: String,
    pub predicate: String,
    pub object: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    pub valid_from: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<f64>,
    /// Server-assigned write time; strictly increasing per pair
    pub tx_time: f64,
    pub provenance: Provenance,
}

impl TemporalFact {
    pub fn validity(&self) -> TimeWindow {
        TimeWindow {
            valid_from: self.valid_from,
            valid_to: self.valid_to,
        }
    }
}

/// Client-supplied temporal fact; `tx_time` is always server-assigned
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemporalFactDraft {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    pub valid_from: f64,
    #[serde(default)]
    pub valid_to: Option<f64>,
}

impl TemporalFactDraft {
    pub fn validate(&self) -> Result<()> {
        let mut fields = vec![];
        for (name, value) in [("subject", &self.subject), ("predicate", &self.predicate)] {
            if value.trim().is_empty() {
                fields.push(FieldError::new(name, "must not be empty"));
            }
        }
        if let Some(to) = self.valid_to {
            if to < self.valid_from {
                fields.push(FieldError::new("valid_to", "must be >= valid_from"));
            }
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(MemoryError::validation_fields("invalid temporal fact", fields))
        }
    }
}

// ============================================================================
// SKILLS
// ============================================================================

/// Skill representation on ingest: either text (embedded server-side) or a
/// ready vector of the deployment dimension. Exactly one of the two.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum SkillRepresentation {
    Text(String),
    Vector(Vec<f32>),
}

impl<'de> Deserialize<'de> for SkillRepresentation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(s) => Ok(SkillRepresentation::Text(s)),
            Value::Array(items) => {
                let vector = items
                    .iter()
                    .map(|v| {
                        v.as_f64().map(|f| f as f32).ok_or_else(|| {
                            serde::de::Error::custom("skill_representation vector must be numeric")
                        })
                    })
                    .collect::<std::result::Result<Vec<f32>, D::Error>>()?;
                Ok(SkillRepresentation::Vector(vector))
            }
            _ => Err(serde::de::Error::custom(
                "skill_representation must be a string or a numeric array",
            )),
        }
    }
}

/// One reusable policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub skill_policy: Value,
    pub skill_representation: SkillRepresentation,
    #[serde(default)]
    pub skill_metadata: Map<String, Value>,
    /// Derived (or supplied) vector used for similarity lookup
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    pub created_at: f64,
    pub provenance: Provenance,
}

/// Client-supplied skill
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkillDraft {
    pub skill_policy: Value,
    pub skill_representation: SkillRepresentation,
    #[serde(default)]
    pub skill_metadata: Map<String, Value>,
}

// ============================================================================
// EVALUATOR CRITIQUES
// ============================================================================

/// One recorded critique, keyed by query fingerprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Critique {
    pub id: String,
    pub critique_payload: Value,
    pub query_fingerprint: String,
    pub created_at: f64,
    pub provenance: Provenance,
}

// ============================================================================
// QUERIES
// ============================================================================

/// Closed sum over the three retrieval query shapes
///
/// On the wire: `{"text": ...}` (or a bare JSON string), `{"vector": [...]}`,
/// or any other mapping, which is taken as a metadata filter.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum QueryInput {
    Text { text: String },
    Vector { vector: Vec<f32> },
    Metadata(Map<String, Value>),
}

impl QueryInput {
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(text) => Ok(QueryInput::Text { text }),
            Value::Object(map) => {
                if map.len() == 1 && map.contains_key("text") {
                    match &map["text"] {
                        Value::String(text) => Ok(QueryInput::Text { text: text.clone() }),
                        _ => Err(MemoryError::validation_fields(
                            "invalid query",
                            vec![FieldError::new("query.text", "must be a string")],
                        )),
                    }
                } else if map.len() == 1 && map.contains_key("vector") {
                    let Value::Array(items) = &map["vector"] else {
                        return Err(MemoryError::validation_fields(
                            "invalid query",
                            vec![FieldError::new("query.vector", "must be a numeric array")],
                        ));
                    };
                    let mut vector = Vec::with_capacity(items.len());
                    for item in items {
                        let Some(f) = item.as_f64() else {
                            return Err(MemoryError::validation_fields(
                                "invalid query",
                                vec![FieldError::new("query.vector", "must be a numeric array")],
                            ));
                        };
                        vector.push(f as f32);
                    }
                    Ok(QueryInput::Vector { vector })
                } else {
                    Ok(QueryInput::Metadata(map))
                }
            }
            _ => Err(MemoryError::validation_fields(
                "invalid query",
                vec![FieldError::new(
                    "query",
                    "must be a string, {text}, {vector}, or a metadata mapping",
                )],
            )),
        }
    }
}

impl<'de> Deserialize<'de> for QueryInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        QueryInput::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// Predicate selecting records for removal; exactly one variant per request
#[derive(Debug, Clone, PartialEq)]
pub enum ForgetPredicate {
    /// Explicit id set
    Ids(Vec<String>),
    /// Records whose `created_at` age exceeds the threshold
    OlderThanDays(f64),
    /// Conjunction of top-level field matches
    Metadata(Map<String, Value>),
}

/// Wire shape of `/forget` bodies
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForgetRequest {
    #[serde(default)]
    pub ids: Option<Vec<String>>,
    #[serde(default)]
    pub older_than_days: Option<f64>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl ForgetRequest {
    pub fn into_predicate(self) -> Result<ForgetPredicate> {
        let supplied = usize::from(self.ids.is_some())
            + usize::from(self.older_than_days.is_some())
            + usize::from(self.metadata.is_some());
        if supplied != 1 {
            return Err(MemoryError::validation_fields(
                "invalid forget predicate",
                vec![FieldError::new(
                    "predicate",
                    "supply exactly one of ids, older_than_days, metadata",
                )],
            ));
        }
        if let Some(ids) = self.ids {
            return Ok(ForgetPredicate::Ids(ids));
        }
        if let Some(days) = self.older_than_days {
            if days < 0.0 {
                return Err(MemoryError::validation_fields(
                    "invalid forget predicate",
                    vec![FieldError::new("older_than_days", "must be >= 0")],
                ));
            }
            return Ok(ForgetPredicate::OlderThanDays(days));
        }
        Ok(ForgetPredicate::Metadata(self.metadata.unwrap_or_default()))
    }
}

/// Retrieval limits are bounded to keep result fan-out predictable
pub const MAX_RETRIEVE_LIMIT: usize = 50;
pub const DEFAULT_RETRIEVE_LIMIT: usize = 5;

/// Validate a caller-supplied limit into `[1, 50]`, defaulting to 5
pub fn validate_limit(limit: Option<i64>) -> Result<usize> {
    match limit {
        None => Ok(DEFAULT_RETRIEVE_LIMIT),
        Some(n) if n >= 1 && n as usize <= MAX_RETRIEVE_LIMIT => Ok(n as usize),
        Some(n) => Err(MemoryError::validation_fields(
            "invalid limit",
            vec![FieldError::new(
                "limit",
                format!("{n} is outside [1, {MAX_RETRIEVE_LIMIT}]"),
            )],
        )),
    }
}

/// Conjunctive top-level field match used by metadata queries and forgets
pub fn metadata_matches(filter: &Map<String, Value>, record: &Value) -> bool {
    let Some(fields) = record.as_object() else {
        return false;
    };
    filter
        .iter()
        .all(|(key, expected)| fields.get(key) == Some(expected))
}

// ============================================================================
// TESTS
// ============================================================================
