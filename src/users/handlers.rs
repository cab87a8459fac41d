use anyhow::Context;
use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use bytes::Bytes;
use tracing::{info, instrument};

use crate::{
    auth::{
        password::hash_password,
        session::{set_flash, take_flash, CurrentUser},
    },
    error::AppError,
    forms::{FormErrors, ValidationCtx, Values},
    state::AppState,
    storage::ext_from_mime,
    users::{
        dto::{
            change_password_schema, edit_account_schema, normalize_account_values, AccountPage,
        },
        repo::{self, ProfileDelta},
    },
};

#[instrument(skip_all)]
pub async fn account_page(CurrentUser(user): CurrentUser, jar: CookieJar) -> Response {
    let (jar, flash) = take_flash(jar);
    (
        jar,
        Json(AccountPage {
            user: user.into(),
            flash,
        }),
    )
        .into_response()
}

/// Fields parsed out of the account page's multipart body.
struct AccountSubmission {
    values: Values,
    image: Option<(Bytes, String)>,
}

fn field_key(name: &str) -> Option<&'static str> {
    match name {
        "name" => Some("name"),
        "username" => Some("username"),
        "email" => Some("email"),
        "current_password" => Some("current_password"),
        "new_password" => Some("new_password"),
        "confirm_password" => Some("confirm_password"),
        _ => None,
    }
}

async fn collect(mut body: Multipart) -> anyhow::Result<AccountSubmission> {
    let mut values = Values::new();
    let mut image = None;

    while let Some(field) = body.next_field().await.context("read multipart field")? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "image" {
            // Browsers send an empty file part when nothing was chosen.
            if field.file_name().map_or(true, str::is_empty) {
                continue;
            }
            let content_type = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| "application/octet-stream".into());
            let data = field.bytes().await.context("read upload")?;
            if !data.is_empty() {
                image = Some((data, content_type));
            }
        } else if let Some(key) = field_key(&name) {
            values.insert(key, field.text().await.context("read form field")?);
        }
    }

    Ok(AccountSubmission { values, image })
}

/// One endpoint, two forms: a submission carrying `new_password` is the
/// change-password form, anything else is a profile edit.
#[instrument(skip_all)]
pub async fn account_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
    body: Multipart,
) -> Result<Response, AppError> {
    let mut submission = collect(body).await?;
    normalize_account_values(&mut submission.values);

    if submission
        .values
        .get("new_password")
        .is_some_and(|v| !v.is_empty())
    {
        change_password(&state, user, jar, submission.values).await
    } else {
        edit_profile(&state, user, jar, submission).await
    }
}

async fn edit_profile(
    state: &AppState,
    user: repo::User,
    jar: CookieJar,
    submission: AccountSubmission,
) -> Result<Response, AppError> {
    let AccountSubmission { mut values, image } = submission;

    let ctx = ValidationCtx {
        db: &state.db,
        actor: Some(&user),
    };
    if let Err(errors) = edit_account_schema().validate(&mut values, &ctx).await? {
        return Err(AppError::Validation(errors));
    }

    let image_file = match image {
        Some((data, content_type)) => {
            let Some(ext) = ext_from_mime(&content_type) else {
                let mut errors = FormErrors::default();
                errors.insert("image", "Images only, sorry.");
                return Err(AppError::Validation(errors));
            };
            Some(state.avatars.save(ext, data).await?)
        }
        None => None,
    };

    let non_empty = |key: &str| values.get(key).filter(|v| !v.is_empty()).cloned();
    let delta = ProfileDelta {
        name: non_empty("name"),
        username: non_empty("username"),
        email: non_empty("email"),
        image_file,
    };

    if !delta.is_empty() {
        repo::update_profile(&state.db, user.id, delta)
            .await?
            .ok_or(AppError::NotFound)?;
    }
    info!(user_id = %user.id, "account details updated");
    let jar = set_flash(jar, "Account details updated.", "success");
    Ok((jar, Redirect::to("/account")).into_response())
}

async fn change_password(
    state: &AppState,
    user: repo::User,
    jar: CookieJar,
    mut values: Values,
) -> Result<Response, AppError> {
    let ctx = ValidationCtx {
        db: &state.db,
        actor: Some(&user),
    };
    if let Err(errors) = change_password_schema().validate(&mut values, &ctx).await? {
        return Err(AppError::Validation(errors));
    }

    let hash = hash_password(&values["new_password"])?;
    repo::update_password(&state.db, user.id, &hash)
        .await?
        .ok_or(AppError::NotFound)?;
    info!(user_id = %user.id, "password changed");
    let jar = set_flash(jar, "Password changed!", "success");
    Ok((jar, Redirect::to("/account")).into_response())
}
