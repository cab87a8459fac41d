use serde::{Deserialize, Serialize};

use crate::auth::session::Flash;
use crate::forms::{Field, FormSchema, Rule, Values};

/// Login form body.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    pub fn into_values(self) -> Values {
        Values::from([
            ("email", self.email.trim().to_lowercase()),
            ("password", self.password),
        ])
    }
}

pub fn login_schema() -> FormSchema {
    FormSchema {
        fields: vec![
            Field::new("email", vec![Rule::Required, Rule::Email]),
            Field::new("password", vec![Rule::Required]),
        ],
    }
}

/// Registration form body.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn into_values(self) -> Values {
        Values::from([
            ("username", self.username.trim().to_string()),
            ("email", self.email.trim().to_lowercase()),
            ("password", self.password),
            ("confirm_password", self.confirm_password),
        ])
    }
}

pub fn register_schema() -> FormSchema {
    FormSchema {
        fields: vec![
            Field::new(
                "username",
                vec![
                    Rule::Required,
                    Rule::Length {
                        min: Some(3),
                        max: Some(20),
                    },
                    Rule::UniqueUser {
                        column: "username",
                        message: "That username is taken. Try something unique.",
                    },
                ],
            ),
            Field::new(
                "email",
                vec![
                    Rule::Required,
                    Rule::Email,
                    Rule::UniqueUser {
                        column: "email",
                        message: "That email is already in use.",
                    },
                ],
            ),
            Field::new(
                "password",
                vec![
                    Rule::Required,
                    Rule::Length {
                        min: Some(8),
                        max: None,
                    },
                ],
            ),
            Field::new(
                "confirm_password",
                vec![Rule::Required, Rule::EqualTo("password")],
            ),
        ],
    }
}

/// Render payload for the login and registration pages.
#[derive(Debug, Serialize)]
pub struct AuthPage {
    pub title: &'static str,
    pub flash: Option<Flash>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_values_normalize_email() {
        let form = LoginForm {
            email: "  Alice@X.Com ".into(),
            password: "password123".into(),
        };
        let values = form.into_values();
        assert_eq!(values["email"], "alice@x.com");
        assert_eq!(values["password"], "password123");
    }

    #[test]
    fn register_schema_covers_all_fields() {
        let schema = register_schema();
        let names: Vec<_> = schema.fields.iter().map(|f| f.name).collect();
        assert_eq!(names, ["username", "email", "password", "confirm_password"]);
    }
}
