//! Declarative per-field validation.
//!
//! A [`FormSchema`] is an ordered set of fields, each carrying a chain of
//! [`Rule`]s evaluated in declared order. The first failing rule on a field
//! records one user-facing message and aborts that field; the form is valid
//! iff no field recorded a message. Rules that need the store (uniqueness,
//! credential checks) take a [`ValidationCtx`].

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use sqlx::PgPool;

use crate::auth::password::verify_password;
use crate::users::repo::User;

/// Submitted field values, keyed by field name. Transform rules mutate the
/// map in place, so the map holds the canonical values after validation.
pub type Values = BTreeMap<&'static str, String>;

#[derive(Debug, Default, Serialize)]
pub struct FormErrors(BTreeMap<&'static str, String>);

impl FormErrors {
    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub enum Rule {
    /// Skips the rest of the chain when the field is empty.
    Optional,
    Required,
    Length {
        min: Option<usize>,
        max: Option<usize>,
    },
    Email,
    /// Value must equal another field's submitted value.
    EqualTo(&'static str),
    /// Transform: appends the character when the value does not already
    /// end with it.
    EnsureSuffix(char),
    /// No row in `users` may already hold this value in `column`. The
    /// authenticated actor keeping their own current value is not a conflict.
    /// The message is per-form, matching the wording of the page it sits on.
    UniqueUser {
        column: &'static str,
        message: &'static str,
    },
    /// Value must verify against the actor's stored password hash.
    CredentialMatch,
}

pub struct Field {
    pub name: &'static str,
    pub rules: Vec<Rule>,
}

impl Field {
    pub fn new(name: &'static str, rules: Vec<Rule>) -> Self {
        Self { name, rules }
    }
}

pub struct FormSchema {
    pub fields: Vec<Field>,
}

pub struct ValidationCtx<'a> {
    pub db: &'a PgPool,
    pub actor: Option<&'a User>,
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

async fn user_column_taken(db: &PgPool, column: &str, value: &str) -> anyhow::Result<bool> {
    // `column` is a compile-time constant from a schema definition, never
    // user input.
    let sql = format!("SELECT EXISTS(SELECT 1 FROM users WHERE {column} = $1)");
    let taken: bool = sqlx::query_scalar(&sql).bind(value).fetch_one(db).await?;
    Ok(taken)
}

fn actor_column<'a>(actor: &'a User, column: &str) -> Option<&'a str> {
    match column {
        "username" => Some(actor.username.as_str()),
        "email" => Some(actor.email.as_str()),
        _ => None,
    }
}

fn length_message(min: Option<usize>, max: Option<usize>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("Must be between {min} and {max} characters."),
        (Some(min), None) => format!("Must be at least {min} characters."),
        (None, Some(max)) => format!("Must be at most {max} characters."),
        (None, None) => String::new(),
    }
}

impl FormSchema {
    /// Runs every field's rule chain against `values`, mutating transformed
    /// values in place. Returns the canonicalized values or the collected
    /// per-field messages.
    pub async fn validate(
        &self,
        values: &mut Values,
        ctx: &ValidationCtx<'_>,
    ) -> anyhow::Result<Result<(), FormErrors>> {
        let mut errors = FormErrors::default();

        for field in &self.fields {
            let mut value = values.get(field.name).cloned().unwrap_or_default();

            for rule in &field.rules {
                match rule {
                    Rule::Optional => {
                        if value.is_empty() {
                            break;
                        }
                    }
                    Rule::Required => {
                        if value.trim().is_empty() {
                            errors.insert(field.name, "This field is required.");
                            break;
                        }
                    }
                    Rule::Length { min, max } => {
                        let len = value.chars().count();
                        let too_short = min.map_or(false, |m| len < m);
                        let too_long = max.map_or(false, |m| len > m);
                        if too_short || too_long {
                            errors.insert(field.name, length_message(*min, *max));
                            break;
                        }
                    }
                    Rule::Email => {
                        if !is_valid_email(&value) {
                            errors.insert(field.name, "A valid email address is required.");
                            break;
                        }
                    }
                    Rule::EqualTo(other) => {
                        let other_value = values.get(other).map(String::as_str).unwrap_or("");
                        if value != other_value {
                            errors.insert(field.name, format!("Does not match {other}."));
                            break;
                        }
                    }
                    Rule::EnsureSuffix(c) => {
                        if !value.ends_with(*c) {
                            value.push(*c);
                        }
                    }
                    Rule::UniqueUser { column, message } => {
                        // A user keeping their own value is not a duplicate
                        // of themselves.
                        let own = ctx
                            .actor
                            .and_then(|a| actor_column(a, column))
                            .map_or(false, |v| v == value);
                        if !own && user_column_taken(ctx.db, column, &value).await? {
                            errors.insert(field.name, *message);
                            break;
                        }
                    }
                    Rule::CredentialMatch => {
                        let verified = match ctx.actor {
                            Some(actor) => verify_password(&value, &actor.password_hash)?,
                            None => false,
                        };
                        if !verified {
                            errors.insert(
                                field.name,
                                "Make sure you entered your current password correctly.",
                            );
                            break;
                        }
                    }
                }
            }

            values.insert(field.name, value);
        }

        if errors.is_empty() {
            Ok(Ok(()))
        } else {
            Ok(Err(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use crate::state::AppState;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn values(pairs: &[(&'static str, &str)]) -> Values {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    fn schema(fields: Vec<Field>) -> FormSchema {
        FormSchema { fields }
    }

    async fn run(form: &FormSchema, values: &mut Values) -> Result<(), FormErrors> {
        let state = AppState::fake();
        let ctx = ValidationCtx {
            db: &state.db,
            actor: None,
        };
        form.validate(values, &ctx).await.unwrap()
    }

    #[tokio::test]
    async fn required_rejects_blank() {
        let form = schema(vec![Field::new("title", vec![Rule::Required])]);
        let mut vals = values(&[("title", "   ")]);
        let errs = run(&form, &mut vals).await.unwrap_err();
        assert_eq!(errs.get("title"), Some("This field is required."));
    }

    #[tokio::test]
    async fn first_failing_rule_wins() {
        let form = schema(vec![Field::new(
            "email",
            vec![
                Rule::Required,
                Rule::Email,
                Rule::Length {
                    min: Some(100),
                    max: None,
                },
            ],
        )]);
        let mut vals = values(&[("email", "not-an-email")]);
        let errs = run(&form, &mut vals).await.unwrap_err();
        // The email rule fires; the length rule never runs.
        assert_eq!(errs.get("email"), Some("A valid email address is required."));
    }

    #[tokio::test]
    async fn optional_short_circuits_on_empty() {
        let form = schema(vec![Field::new(
            "username",
            vec![
                Rule::Optional,
                Rule::Length {
                    min: Some(3),
                    max: Some(20),
                },
            ],
        )]);
        let mut vals = values(&[("username", "")]);
        assert!(run(&form, &mut vals).await.is_ok());

        let mut vals = values(&[("username", "ab")]);
        assert!(run(&form, &mut vals).await.is_err());
    }

    #[tokio::test]
    async fn length_bounds() {
        let form = schema(vec![Field::new(
            "password",
            vec![Rule::Length {
                min: Some(8),
                max: None,
            }],
        )]);
        let mut vals = values(&[("password", "short")]);
        let errs = run(&form, &mut vals).await.unwrap_err();
        assert_eq!(errs.get("password"), Some("Must be at least 8 characters."));

        let mut vals = values(&[("password", "longenough")]);
        assert!(run(&form, &mut vals).await.is_ok());
    }

    #[tokio::test]
    async fn equal_to_compares_against_other_field() {
        let form = schema(vec![Field::new(
            "confirm_password",
            vec![Rule::EqualTo("password")],
        )]);
        let mut vals = values(&[("password", "hunter22"), ("confirm_password", "hunter2")]);
        assert!(run(&form, &mut vals).await.is_err());

        let mut vals = values(&[("password", "hunter22"), ("confirm_password", "hunter22")]);
        assert!(run(&form, &mut vals).await.is_ok());
    }

    #[tokio::test]
    async fn ensure_suffix_appends_question_mark() {
        let form = schema(vec![Field::new(
            "title",
            vec![Rule::Required, Rule::EnsureSuffix('?')],
        )]);
        let mut vals = values(&[("title", "why is the sky blue at noon")]);
        assert!(run(&form, &mut vals).await.is_ok());
        assert_eq!(vals["title"], "why is the sky blue at noon?");

        let mut vals = values(&[("title", "is water wet everywhere on earth?")]);
        assert!(run(&form, &mut vals).await.is_ok());
        assert_eq!(vals["title"], "is water wet everywhere on earth?");
    }

    #[tokio::test]
    async fn credential_match_verifies_actor_hash() {
        let state = AppState::fake();
        let actor = User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@x.com".into(),
            password_hash: hash_password("password123").unwrap(),
            image_file: "default.jpg".into(),
            name: None,
            join_date: OffsetDateTime::now_utc(),
        };
        let ctx = ValidationCtx {
            db: &state.db,
            actor: Some(&actor),
        };

        let form = schema(vec![Field::new(
            "current_password",
            vec![Rule::Required, Rule::CredentialMatch],
        )]);

        let mut vals = values(&[("current_password", "password123")]);
        assert!(form.validate(&mut vals, &ctx).await.unwrap().is_ok());

        let mut vals = values(&[("current_password", "wrong-password")]);
        let errs = form.validate(&mut vals, &ctx).await.unwrap().unwrap_err();
        assert_eq!(
            errs.get("current_password"),
            Some("Make sure you entered your current password correctly.")
        );
    }

    #[tokio::test]
    async fn credential_match_fails_without_actor() {
        let form = schema(vec![Field::new("current_password", vec![Rule::CredentialMatch])]);
        let mut vals = values(&[("current_password", "anything")]);
        assert!(run(&form, &mut vals).await.is_err());
    }

    #[test]
    fn email_regex_shape() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
    }
}
