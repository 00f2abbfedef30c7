use crate::models::{Book, NewBook};
use crate::query::{BookSearch, CaseSensitivity};
use crate::repo::{BookRepo, StoreError};
use crate::schema::books;
use bb8::Pool;
use diesel::dsl::sql;
use diesel::expression_methods::{
    BoolExpressionMethods, ExpressionMethods, NullableExpressionMethods,
    PgTextExpressionMethods, TextExpressionMethods,
};
use diesel::pg::Pg;
use diesel::result::DatabaseErrorKind;
use diesel::sql_types::{Nullable, Text};
use diesel::{OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{
    pooled_connection::{AsyncDieselConnectionManager, PoolError},
    AsyncPgConnection, RunQueryDsl,
};

pub type DBPool = bb8::Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

/// Connections are opened lazily, so an unreachable database does not fail here.
pub async fn create_db_pool(connection_string: String) -> Result<DBPool, PoolError> {
    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(connection_string);
    Pool::builder().build(config).await
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("problem getting a connection from the connection pool: {0}")]
    PoolError(#[from] bb8::RunError<PoolError>),
    #[error("problem executing a statement against the DB: {0}")]
    ResultError(#[from] diesel::result::Error),
}

impl StoreError for DatabaseError {
    fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DatabaseError::PoolError(_)
                | DatabaseError::ResultError(diesel::result::Error::DatabaseError(
                    DatabaseErrorKind::ClosedConnection,
                    _
                ))
        )
    }
}

/// The books matching a search, as an unexecuted query. `year` is compared through its text form.
fn matching_books(search: Option<&BookSearch>) -> books::BoxedQuery<'static, Pg> {
    let query = books::table.into_boxed();

    let Some(search) = search else {
        return query;
    };

    let pattern = search.like_pattern();
    let year_text = || sql::<Nullable<Text>>("CAST(books.year AS TEXT)");

    match search.case {
        CaseSensitivity::Sensitive => query.filter(
            books::title
                .like(pattern.clone())
                .nullable()
                .or(books::author.like(pattern.clone()).nullable())
                .or(books::genre.like(pattern.clone()))
                .or(year_text().like(pattern)),
        ),
        CaseSensitivity::Insensitive => query.filter(
            books::title
                .ilike(pattern.clone())
                .nullable()
                .or(books::author.ilike(pattern.clone()).nullable())
                .or(books::genre.ilike(pattern.clone()))
                .or(year_text().ilike(pattern)),
        ),
    }
}

#[derive(Clone)]
pub struct DatabaseBookRepo {
    pool: DBPool,
}

impl DatabaseBookRepo {
    pub fn new(pool: DBPool) -> Self {
        DatabaseBookRepo { pool }
    }
}

impl BookRepo for DatabaseBookRepo {
    type Error = DatabaseError;

    async fn find_books(
        &self,
        search: Option<&BookSearch>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Book>, DatabaseError> {
        let mut conn = self.pool.get().await?;

        let books = matching_books(search)
            .select(Book::as_select())
            .order(books::id.asc())
            .limit(limit)
            .offset(offset)
            .load(&mut conn)
            .await?;

        Ok(books)
    }

    async fn count_books(&self, search: Option<&BookSearch>) -> Result<i64, DatabaseError> {
        let mut conn = self.pool.get().await?;

        let count = matching_books(search)
            .count()
            .get_result::<i64>(&mut conn)
            .await?;

        Ok(count)
    }

    async fn get_book(&self, id: i32) -> Result<Option<Book>, DatabaseError> {
        let mut conn = self.pool.get().await?;

        let maybe_book = books::table
            .find(id)
            .select(Book::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(maybe_book)
    }

    async fn insert_book(&mut self, new_book: NewBook) -> Result<Book, DatabaseError> {
        let mut conn = self.pool.get().await?;

        let inserted_book = diesel::insert_into(books::table)
            .values(new_book)
            .returning(Book::as_returning())
            .get_result(&mut conn)
            .await?;

        Ok(inserted_book)
    }

    async fn update_book(
        &mut self,
        id: i32,
        new_book: NewBook,
    ) -> Result<Option<Book>, DatabaseError> {
        let mut conn = self.pool.get().await?;

        let updated_book = diesel::update(books::table.find(id))
            .set(new_book)
            .returning(Book::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?;

        Ok(updated_book)
    }

    async fn delete_book(&mut self, id: i32) -> Result<bool, DatabaseError> {
        let mut conn = self.pool.get().await?;

        let deleted = diesel::delete(books::table.find(id))
            .execute(&mut conn)
            .await
            .map(|affected_rows| affected_rows == 1)?;

        Ok(deleted)
    }

    async fn check_connection(&self) -> Result<(), DatabaseError> {
        let mut conn = self.pool.get().await?;

        diesel::sql_query("SELECT 1").execute(&mut conn).await?;

        Ok(())
    }
}
