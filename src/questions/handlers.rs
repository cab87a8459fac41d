use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::CookieJar;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::session::{set_flash, take_flash, CurrentUser},
    error::AppError,
    forms::ValidationCtx,
    questions::{
        dto::{
            answer_schema, question_schema, AnswerForm, PageQuery, QuestionForm, QuestionFormPage,
            QuestionListPage, QuestionPage,
        },
        repo::{self, PAGE_SIZE},
    },
    state::AppState,
};

#[instrument(skip(state, jar))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let questions = repo::list_page(&state.db, query.page).await?;
    let total = repo::count(&state.db).await?;
    let (jar, flash) = take_flash(jar);
    Ok((
        jar,
        Json(QuestionListPage {
            page: query.page.max(1),
            per_page: PAGE_SIZE,
            total,
            questions,
            flash,
        }),
    )
        .into_response())
}

#[instrument(skip(state, jar))]
pub async fn view(
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let question = repo::find(&state.db, question_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let answers = repo::answers_for(&state.db, question_id).await?;
    let (jar, flash) = take_flash(jar);
    Ok((
        jar,
        Json(QuestionPage {
            question,
            answers,
            flash,
        }),
    )
        .into_response())
}

#[instrument(skip(state, user, jar, form))]
pub async fn post_answer(
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
    Form(form): Form<AnswerForm>,
) -> Result<Response, AppError> {
    // The parent question must exist before anything is validated or written.
    repo::find(&state.db, question_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut values = form.into_values();
    let ctx = ValidationCtx {
        db: &state.db,
        actor: Some(&user),
    };
    if let Err(errors) = answer_schema().validate(&mut values, &ctx).await? {
        return Err(AppError::Validation(errors));
    }

    let answer = repo::create_answer(&state.db, question_id, user.id, &values["content"]).await?;
    info!(answer_id = %answer.id, question_id = %question_id, user_id = %user.id, "answer posted");
    let jar = set_flash(jar, "Your answer has been submitted.", "success");
    Ok((jar, Redirect::to(&format!("/question/{question_id}"))).into_response())
}

#[instrument(skip_all)]
pub async fn submit_page(CurrentUser(_user): CurrentUser, jar: CookieJar) -> Response {
    let (jar, flash) = take_flash(jar);
    (
        jar,
        Json(QuestionFormPage {
            title: String::new(),
            body: String::new(),
            flash,
        }),
    )
        .into_response()
}

#[instrument(skip(state, user, jar, form))]
pub async fn submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
    Form(form): Form<QuestionForm>,
) -> Result<Response, AppError> {
    let mut values = form.into_values();
    let ctx = ValidationCtx {
        db: &state.db,
        actor: Some(&user),
    };
    if let Err(errors) = question_schema().validate(&mut values, &ctx).await? {
        return Err(AppError::Validation(errors));
    }

    let question = repo::create(&state.db, &values["title"], &values["body"], user.id).await?;
    info!(question_id = %question.id, user_id = %user.id, "question submitted");
    let jar = set_flash(jar, "Question submitted.", "success");
    Ok((jar, Redirect::to("/")).into_response())
}

#[instrument(skip(state, user, jar))]
pub async fn edit_page(
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let question = repo::find(&state.db, question_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if question.posted_by != user.id {
        return Err(AppError::Forbidden);
    }
    let (jar, flash) = take_flash(jar);
    Ok((
        jar,
        Json(QuestionFormPage {
            title: question.title,
            body: question.body,
            flash,
        }),
    )
        .into_response())
}

#[instrument(skip(state, user, jar, form))]
pub async fn edit(
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
    Form(form): Form<QuestionForm>,
) -> Result<Response, AppError> {
    let question = repo::find(&state.db, question_id)
        .await?
        .ok_or(AppError::NotFound)?;
    // Only the author may edit.
    if question.posted_by != user.id {
        return Err(AppError::Forbidden);
    }

    let mut values = form.into_values();
    let ctx = ValidationCtx {
        db: &state.db,
        actor: Some(&user),
    };
    if let Err(errors) = question_schema().validate(&mut values, &ctx).await? {
        return Err(AppError::Validation(errors));
    }

    repo::update(&state.db, question_id, &values["title"], &values["body"])
        .await?
        .ok_or(AppError::NotFound)?;
    info!(question_id = %question_id, user_id = %user.id, "question edited");
    let jar = set_flash(jar, "Question saved.", "success");
    Ok((jar, Redirect::to(&format!("/question/{question_id}"))).into_response())
}
