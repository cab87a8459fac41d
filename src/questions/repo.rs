use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Fixed page size of the question list.
pub const PAGE_SIZE: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub pub_date: OffsetDateTime,
    pub posted_by: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Answer {
    pub id: Uuid,
    pub content: String,
    pub pub_date: OffsetDateTime,
    pub for_ques: Uuid,
    pub posted_by: Uuid,
}

/// Question row joined with its author's username for list/detail views.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct QuestionSummary {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub pub_date: OffsetDateTime,
    pub posted_by: Uuid,
    pub author: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AnswerSummary {
    pub id: Uuid,
    pub content: String,
    pub pub_date: OffsetDateTime,
    pub posted_by: Uuid,
    pub author: String,
}

/// 1-based page number to row offset; pages below 1 clamp to the first.
pub fn page_offset(page: i64) -> i64 {
    (page.max(1) - 1) * PAGE_SIZE
}

pub async fn list_page(db: &PgPool, page: i64) -> anyhow::Result<Vec<QuestionSummary>> {
    let rows = sqlx::query_as::<_, QuestionSummary>(
        r#"
        SELECT q.id, q.title, q.body, q.pub_date, q.posted_by, u.username AS author
        FROM questions q
        JOIN users u ON u.id = q.posted_by
        ORDER BY q.pub_date DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(PAGE_SIZE)
    .bind(page_offset(page))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn count(db: &PgPool) -> anyhow::Result<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(db)
        .await?;
    Ok(total)
}

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<QuestionSummary>> {
    let row = sqlx::query_as::<_, QuestionSummary>(
        r#"
        SELECT q.id, q.title, q.body, q.pub_date, q.posted_by, u.username AS author
        FROM questions q
        JOIN users u ON u.id = q.posted_by
        WHERE q.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn create(
    db: &PgPool,
    title: &str,
    body: &str,
    posted_by: Uuid,
) -> anyhow::Result<Question> {
    let question = sqlx::query_as::<_, Question>(
        r#"
        INSERT INTO questions (title, body, posted_by)
        VALUES ($1, $2, $3)
        RETURNING id, title, body, pub_date, posted_by
        "#,
    )
    .bind(title)
    .bind(body)
    .bind(posted_by)
    .fetch_one(db)
    .await?;
    Ok(question)
}

/// In-place edit of title/body. Returns `None` when the question is gone.
pub async fn update(
    db: &PgPool,
    id: Uuid,
    title: &str,
    body: &str,
) -> anyhow::Result<Option<Question>> {
    let question = sqlx::query_as::<_, Question>(
        r#"
        UPDATE questions
        SET title = $2, body = $3
        WHERE id = $1
        RETURNING id, title, body, pub_date, posted_by
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(body)
    .fetch_optional(db)
    .await?;
    Ok(question)
}

pub async fn answers_for(db: &PgPool, question_id: Uuid) -> anyhow::Result<Vec<AnswerSummary>> {
    let rows = sqlx::query_as::<_, AnswerSummary>(
        r#"
        SELECT a.id, a.content, a.pub_date, a.posted_by, u.username AS author
        FROM answers a
        JOIN users u ON u.id = a.posted_by
        WHERE a.for_ques = $1
        ORDER BY a.pub_date ASC
        "#,
    )
    .bind(question_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn create_answer(
    db: &PgPool,
    question_id: Uuid,
    posted_by: Uuid,
    content: &str,
) -> anyhow::Result<Answer> {
    let answer = sqlx::query_as::<_, Answer>(
        r#"
        INSERT INTO answers (content, for_ques, posted_by)
        VALUES ($1, $2, $3)
        RETURNING id, content, pub_date, for_ques, posted_by
        "#,
    )
    .bind(content)
    .bind(question_id)
    .bind(posted_by)
    .fetch_one(db)
    .await?;
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offset_is_zero_based_and_clamped() {
        assert_eq!(page_offset(1), 0);
        assert_eq!(page_offset(2), 5);
        assert_eq!(page_offset(3), 10);
        assert_eq!(page_offset(0), 0);
        assert_eq!(page_offset(-7), 0);
    }
}
