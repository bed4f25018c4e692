//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Difficulty, GeneratedExam, GenerationRequest, QuestionCounts, QuestionMix, QuestionType};
use crate::logic::{TypeReport, UserAnswers};
use crate::model::ModelProbe;

/// Question total used when a request names neither counts nor a total.
pub const DEFAULT_QUESTION_COUNT: u32 = 10;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    GenerateExam {
        #[serde(flatten)]
        request: GenerateIn,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Progress {
        percent: u8,
        stage: String,
    },
    Exam {
        exam: GeneratedExam,
        #[serde(rename = "usedFallback")]
        used_fallback: bool,
        sources: Vec<TypeReport>,
    },
    Error {
        message: String,
    },
}

/// Topics arrive either as a list or as the comma separated form input.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TopicsIn {
    List(Vec<String>),
    Text(String),
}

impl Default for TopicsIn {
    fn default() -> Self {
        TopicsIn::List(Vec::new())
    }
}

impl TopicsIn {
    /// Trimmed, non-empty topics.
    pub fn normalized(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            TopicsIn::List(list) => list.iter().map(String::as_str).collect(),
            TopicsIn::Text(text) => text.split(',').collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateIn {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topics: TopicsIn,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    /// Slider form of the difficulty (0, 50 or 100).
    #[serde(default)]
    pub difficulty_level: Option<u8>,
    #[serde(default)]
    pub counts: Option<QuestionCounts>,
    #[serde(default)]
    pub question_count: Option<u32>,
    #[serde(default)]
    pub distribution: Option<QuestionMix>,
    #[serde(default)]
    pub include_answer_key: Option<bool>,
}

impl GenerateIn {
    /// Validate and shape into a generation request plus the answer-key flag.
    /// Exams larger than `max_questions` are refused.
    pub fn into_request(self, max_questions: u32) -> Result<(GenerationRequest, bool), String> {
        let subject = self.subject.as_deref().map(str::trim).unwrap_or_default().to_string();
        if subject.is_empty() {
            return Err("Missing subject".into());
        }
        let topics = self.topics.normalized();
        if topics.is_empty() {
            return Err("Missing topics".into());
        }

        let difficulty = self
            .difficulty
            .or_else(|| self.difficulty_level.map(Difficulty::from_slider))
            .unwrap_or_default();

        let too_many = || format!("Too many questions: at most {} per exam", max_questions);
        let counts = match self.counts {
            Some(c) => {
                let total: u64 = QuestionType::ALL.iter().map(|k| u64::from(c.get(*k))).sum();
                if total > u64::from(max_questions) {
                    return Err(too_many());
                }
                c
            }
            None => {
                let total = self.question_count.unwrap_or(DEFAULT_QUESTION_COUNT);
                if total > max_questions {
                    return Err(too_many());
                }
                let mix = self.distribution.unwrap_or_default();
                if !mix.is_valid() {
                    return Err("Invalid question distribution".into());
                }
                mix.counts_for(total)
            }
        };

        let request = GenerationRequest { subject, topics, difficulty, counts };
        Ok((request, self.include_answer_key.unwrap_or(true)))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOut {
    pub success: bool,
    pub exam: GeneratedExam,
    pub used_fallback: bool,
    pub sources: Vec<TypeReport>,
}

/// The exam is kept loose so a missing or malformed exam maps to a 400.
#[derive(Debug, Deserialize)]
pub struct ExportIn {
    #[serde(default)]
    pub exam: Option<serde_json::Value>,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GradeIn {
    pub exam: GeneratedExam,
    #[serde(default)]
    pub answers: UserAnswers,
}

#[derive(Serialize)]
pub struct CheckModelsOut {
    pub models: Vec<ModelProbe>,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub success: bool,
    pub error: String,
}

impl ErrorOut {
    pub fn new(error: impl Into<String>) -> Self {
        Self { success: false, error: error.into() }
    }
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u32 = 50;

    #[test]
    fn explicit_counts_and_comma_topics() {
        let body: GenerateIn = serde_json::from_str(
            r#"{"subject":" Physics ","topics":"Optics, ,Waves","difficulty":"hard",
                "counts":{"mcCount":2,"tfCount":1,"saCount":0,"essayCount":1}}"#,
        )
        .expect("body");
        let (req, key) = body.into_request(MAX).expect("valid");
        assert_eq!(req.subject, "Physics");
        assert_eq!(req.topics, vec!["Optics".to_string(), "Waves".to_string()]);
        assert_eq!(req.difficulty, Difficulty::Hard);
        assert_eq!(req.counts.total(), 4);
        assert!(key);
    }

    #[test]
    fn total_and_slider_are_shaped() {
        let body: GenerateIn = serde_json::from_str(
            r#"{"subject":"History","topics":["Rome"],"difficultyLevel":0,"questionCount":11,"includeAnswerKey":false}"#,
        )
        .expect("body");
        let (req, key) = body.into_request(MAX).expect("valid");
        assert_eq!(req.difficulty, Difficulty::Easy);
        assert_eq!(
            req.counts,
            QuestionCounts { multiple_choice: 5, true_false: 2, short_answer: 3, essay: 1 }
        );
        assert!(!key);
    }

    #[test]
    fn missing_subject_or_topics_is_rejected() {
        let no_subject: GenerateIn = serde_json::from_str(r#"{"topics":["a"]}"#).expect("body");
        assert_eq!(no_subject.into_request(MAX).unwrap_err(), "Missing subject");
        let blank_topics: GenerateIn = serde_json::from_str(r#"{"subject":"Art","topics":"  , "}"#).expect("body");
        assert_eq!(blank_topics.into_request(MAX).unwrap_err(), "Missing topics");
    }

    #[test]
    fn distribution_not_summing_to_100_still_fills_the_total() {
        let body: GenerateIn = serde_json::from_str(
            r#"{"subject":"Chemistry","topics":["Acids"],"questionCount":10,
                "distribution":{"multipleChoice":100,"trueFalse":100,"shortAnswer":100,"essay":100}}"#,
        )
        .expect("body");
        let (req, _) = body.into_request(MAX).expect("valid");
        assert_eq!(req.counts.total(), 10);
    }

    #[test]
    fn negative_or_empty_distribution_is_rejected() {
        for mix in [
            r#"{"multipleChoice":-10,"trueFalse":50,"shortAnswer":50,"essay":10}"#,
            r#"{"multipleChoice":0,"trueFalse":0,"shortAnswer":0,"essay":0}"#,
        ] {
            let body: GenerateIn = serde_json::from_str(&format!(
                r#"{{"subject":"Art","topics":["Color"],"questionCount":8,"distribution":{}}}"#,
                mix
            ))
            .expect("body");
            assert_eq!(body.into_request(MAX).unwrap_err(), "Invalid question distribution");
        }
    }

    #[test]
    fn oversized_exams_are_rejected() {
        let huge: GenerateIn = serde_json::from_str(
            r#"{"subject":"Art","topics":["Color"],"counts":{"mcCount":4000000000,"tfCount":4000000000}}"#,
        )
        .expect("body");
        assert_eq!(huge.into_request(MAX).unwrap_err(), "Too many questions: at most 50 per exam");

        let over_total: GenerateIn =
            serde_json::from_str(r#"{"subject":"Art","topics":["Color"],"questionCount":51}"#).expect("body");
        assert!(over_total.into_request(MAX).is_err());

        let at_limit: GenerateIn = serde_json::from_str(
            r#"{"subject":"Art","topics":["Color"],"counts":{"mcCount":20,"tfCount":10,"saCount":10,"essayCount":10}}"#,
        )
        .expect("body");
        assert_eq!(at_limit.into_request(MAX).expect("valid").0.counts.total(), 50);
    }

    #[test]
    fn ws_messages_use_type_tags() {
        let msg: ClientWsMessage =
            serde_json::from_str(r#"{"type":"generate_exam","subject":"Art","topics":["Baroque"]}"#).expect("msg");
        assert!(matches!(msg, ClientWsMessage::GenerateExam { .. }));
        let out = serde_json::to_value(ServerWsMessage::Progress { percent: 10, stage: "generating".into() }).expect("json");
        assert_eq!(out["type"], "progress");
        assert_eq!(out["percent"], 10);
    }
}
