use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::CookieJar;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{login_schema, register_schema, AuthPage, LoginForm, RegisterForm},
        password::{hash_password, verify_password},
        session::{self, take_flash, CurrentUser, MaybeUser, SessionKeys},
    },
    error::AppError,
    forms::ValidationCtx,
    state::AppState,
    users::repo,
};

#[instrument(skip_all)]
pub async fn login_page(MaybeUser(actor): MaybeUser, jar: CookieJar) -> Response {
    if actor.is_some() {
        return Redirect::to("/").into_response();
    }
    let (jar, flash) = take_flash(jar);
    (
        jar,
        Json(AuthPage {
            title: "Login",
            flash,
        }),
    )
        .into_response()
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if actor.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let mut values = form.into_values();
    let ctx = ValidationCtx {
        db: &state.db,
        actor: None,
    };
    if let Err(errors) = login_schema().validate(&mut values, &ctx).await? {
        return Err(AppError::Validation(errors));
    }

    // An unknown email is the same graceful outcome as a wrong password.
    let user = match repo::find_by_email(&state.db, &values["email"]).await? {
        Some(user) => user,
        None => {
            warn!(email = %values["email"], "login with unknown email");
            return Err(AppError::InvalidCredentials);
        }
    };

    if !verify_password(&values["password"], &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let keys = SessionKeys::from_ref(&state);
    let jar = session::login(jar, &keys, user.id)?;
    let jar = session::set_flash(jar, "Account logged in.", "success");
    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok((jar, Redirect::to("/")).into_response())
}

#[instrument(skip_all)]
pub async fn register_page(MaybeUser(actor): MaybeUser, jar: CookieJar) -> Response {
    if actor.is_some() {
        return Redirect::to("/").into_response();
    }
    let (jar, flash) = take_flash(jar);
    (
        jar,
        Json(AuthPage {
            title: "Registration",
            flash,
        }),
    )
        .into_response()
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    MaybeUser(actor): MaybeUser,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if actor.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let mut values = form.into_values();
    let ctx = ValidationCtx {
        db: &state.db,
        actor: None,
    };
    if let Err(errors) = register_schema().validate(&mut values, &ctx).await? {
        return Err(AppError::Validation(errors));
    }

    let hash = hash_password(&values["password"])?;
    let user = repo::create(&state.db, &values["username"], &values["email"], &hash).await?;

    // Registering also signs the new user in.
    let keys = SessionKeys::from_ref(&state);
    let jar = session::login(jar, &keys, user.id)?;
    let jar = session::set_flash(jar, "Account created.", "success");
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((jar, Redirect::to("/")).into_response())
}

#[instrument(skip_all)]
pub async fn logout(CurrentUser(user): CurrentUser, jar: CookieJar) -> Response {
    let jar = session::logout(jar);
    info!(user_id = %user.id, "user logged out");
    (jar, Redirect::to("/")).into_response()
}
