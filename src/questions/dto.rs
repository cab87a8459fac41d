use serde::{Deserialize, Serialize};

use crate::auth::session::Flash;
use crate::forms::{Field, FormSchema, Rule, Values};
use crate::questions::repo::{AnswerSummary, QuestionSummary};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

/// Question submission / edit form body.
#[derive(Debug, Deserialize)]
pub struct QuestionForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl QuestionForm {
    pub fn into_values(self) -> Values {
        Values::from([("title", self.title), ("body", self.body)])
    }
}

/// Title length is checked before the '?' suffix transform runs, so the
/// suffix never rescues a too-short title.
pub fn question_schema() -> FormSchema {
    FormSchema {
        fields: vec![
            Field::new(
                "title",
                vec![
                    Rule::Required,
                    Rule::Length {
                        min: Some(20),
                        max: Some(60),
                    },
                    Rule::EnsureSuffix('?'),
                ],
            ),
            Field::new("body", vec![Rule::Optional]),
        ],
    }
}

#[derive(Debug, Deserialize)]
pub struct AnswerForm {
    #[serde(default)]
    pub content: String,
}

impl AnswerForm {
    pub fn into_values(self) -> Values {
        Values::from([("content", self.content)])
    }
}

pub fn answer_schema() -> FormSchema {
    FormSchema {
        fields: vec![Field::new(
            "content",
            vec![
                Rule::Required,
                Rule::Length {
                    min: Some(20),
                    max: None,
                },
            ],
        )],
    }
}

/// One page of the question list.
#[derive(Debug, Serialize)]
pub struct QuestionListPage {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub questions: Vec<QuestionSummary>,
    pub flash: Option<Flash>,
}

/// A question with its answers.
#[derive(Debug, Serialize)]
pub struct QuestionPage {
    pub question: QuestionSummary,
    pub answers: Vec<AnswerSummary>,
    pub flash: Option<Flash>,
}

/// Pre-filled edit form.
#[derive(Debug, Serialize)]
pub struct QuestionFormPage {
    pub title: String,
    pub body: String,
    pub flash: Option<Flash>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_defaults_to_first_page() {
        let q: PageQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.page, 1);
        let q: PageQuery = serde_json::from_str(r#"{"page": 3}"#).unwrap();
        assert_eq!(q.page, 3);
    }

    #[test]
    fn question_form_tolerates_missing_body() {
        let f: QuestionForm =
            serde_json::from_str(r#"{"title": "why is the sky blue at noon"}"#).unwrap();
        let values = f.into_values();
        assert_eq!(values["title"], "why is the sky blue at noon");
        assert_eq!(values["body"], "");
    }
}
