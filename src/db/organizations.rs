use crate::models::Organization;

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    name: &str,
) -> Result<Organization, sqlx::Error> {
    sqlx::query_as::<_, Organization>("INSERT INTO organizations (name) VALUES ($1) RETURNING *")
        .bind(name)
        .fetch_one(executor)
        .await
}
