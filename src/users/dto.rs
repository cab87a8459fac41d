use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::session::Flash;
use crate::forms::{Field, FormSchema, Rule, Values};
use crate::users::repo::User;

/// Public part of a user, safe to render.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub image_file: String,
    pub join_date: OffsetDateTime,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            name: u.name,
            image_file: u.image_file,
            join_date: u.join_date,
        }
    }
}

/// Render payload for the account page.
#[derive(Debug, Serialize)]
pub struct AccountPage {
    pub user: UserProfile,
    pub flash: Option<Flash>,
}

/// Canonicalizes account-edit input the same way the login and registration
/// forms do: email is compared and stored lowercased, identifiers trimmed.
/// Skipping this would let `Alice@X.com` slip past the uniqueness carve-out
/// and strand the account behind a lowercased login lookup.
pub fn normalize_account_values(values: &mut Values) {
    if let Some(email) = values.get_mut("email") {
        *email = email.trim().to_lowercase();
    }
    if let Some(username) = values.get_mut("username") {
        *username = username.trim().to_string();
    }
}

/// Profile edit: every field but the current password is optional, so a
/// partial submission only overwrites what it names.
pub fn edit_account_schema() -> FormSchema {
    FormSchema {
        fields: vec![
            Field::new("name", vec![Rule::Optional]),
            Field::new(
                "username",
                vec![
                    Rule::Optional,
                    Rule::Length {
                        min: Some(3),
                        max: Some(20),
                    },
                    Rule::UniqueUser {
                        column: "username",
                        message: "That username is taken. Please try a different one.",
                    },
                ],
            ),
            Field::new(
                "email",
                vec![
                    Rule::Optional,
                    Rule::Email,
                    Rule::UniqueUser {
                        column: "email",
                        message: "That email is taken. Please try a different one.",
                    },
                ],
            ),
            Field::new(
                "current_password",
                vec![Rule::Required, Rule::CredentialMatch],
            ),
        ],
    }
}

pub fn change_password_schema() -> FormSchema {
    FormSchema {
        fields: vec![
            Field::new(
                "new_password",
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
                vec![Rule::Optional, Rule::EqualTo("new_password")],
            ),
            Field::new(
                "current_password",
                vec![Rule::Required, Rule::CredentialMatch],
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_schema_field_order() {
        let schema = edit_account_schema();
        let names: Vec<_> = schema.fields.iter().map(|f| f.name).collect();
        assert_eq!(names, ["name", "username", "email", "current_password"]);
    }

    #[test]
    fn account_values_normalize_like_login() {
        // A case-shuffled resubmission of the user's own email must compare
        // equal to the stored row, or the self carve-out misses and the
        // stored casing diverges from what login looks up.
        let mut values = Values::from([
            ("email", "  Alice@X.Com ".to_string()),
            ("username", " alice ".to_string()),
            ("name", "Alice".to_string()),
        ]);
        normalize_account_values(&mut values);
        assert_eq!(values["email"], "alice@x.com");
        assert_eq!(values["username"], "alice");
        assert_eq!(values["name"], "Alice");
    }

    #[test]
    fn normalize_ignores_absent_fields() {
        let mut values = Values::from([("new_password", "password123".to_string())]);
        normalize_account_values(&mut values);
        assert_eq!(values["new_password"], "password123");
    }

    #[test]
    fn edit_schema_uses_account_page_wording() {
        let messages: Vec<_> = edit_account_schema()
            .fields
            .iter()
            .flat_map(|f| f.rules.iter())
            .filter_map(|r| match r {
                Rule::UniqueUser { message, .. } => Some(*message),
                _ => None,
            })
            .collect();
        assert_eq!(
            messages,
            [
                "That username is taken. Please try a different one.",
                "That email is taken. Please try a different one.",
            ]
        );
    }
}
