use axum::{
    extract::{Path, Query, State},
    handler::HandlerWithoutStateExt,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Serialize;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use crate::catalog::{self, Mutation, Rejection};
use crate::config::Config;
use crate::models::BookForm;
use crate::query::{CaseSensitivity, ListParams, ListQuery};
use crate::repo::BookRepo;
use crate::views::{
    edit_book_view, list_view, new_book_view, rejected_view, AppError, BookFormView, ListView,
    Rendered, BOOKS_PATH, INDEX_TEMPLATE, NEW_BOOK_TEMPLATE, UPDATE_BOOK_TEMPLATE,
};

#[derive(Clone)]
struct AppState<R> {
    repo: R,
    search_case: CaseSensitivity,
}

/// Routes first, then static assets, the not-found fallbacks and request tracing, outermost last.
/// Missing static files and unsupported methods render the same not-found page as unknown paths.
pub fn build_app<R>(repo: R, config: &Config) -> Router
where
    R: BookRepo + Send + Sync + Clone + 'static,
{
    let state = AppState {
        repo,
        search_case: config.search_case,
    };

    Router::new()
        .route("/", get(redirect_to_books))
        .route("/books", get(list_books::<R>).post(insert_book::<R>))
        .route("/books/new", get(new_book_form))
        .route("/books/{id}", get(get_book::<R>).post(update_book::<R>))
        .route("/books/{id}/delete", post(delete_book::<R>))
        .route("/readyz", get(readyz::<R>))
        .nest_service(
            "/static",
            ServeDir::new(&config.static_dir).fallback(page_not_found.into_service()),
        )
        .method_not_allowed_fallback(page_not_found)
        .fallback(page_not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn redirect_to_books() -> Redirect {
    Redirect::to(BOOKS_PATH)
}

async fn list_books<R>(
    State(state): State<AppState<R>>,
    Query(params): Query<ListParams>,
) -> Result<Rendered<ListView>, AppError>
where
    R: BookRepo,
{
    let query = ListQuery::from_params(&params, state.search_case);

    let page = catalog::list_books(&state.repo, &query).await?;

    info!(
        "Retrieved {} of {} matching books from the DB",
        page.books.len(),
        page.total_matching
    );

    Ok(Rendered::new(INDEX_TEMPLATE, list_view(&query, page)))
}

async fn new_book_form() -> Rendered<BookFormView> {
    Rendered::new(NEW_BOOK_TEMPLATE, new_book_view())
}

async fn insert_book<R>(
    State(state): State<AppState<R>>,
    Form(form): Form<BookForm>,
) -> Result<Response, AppError>
where
    R: BookRepo,
{
    let mut repo = state.repo;

    match catalog::create_book(&mut repo, form).await? {
        Mutation::Saved(book) => {
            info!("Inserted book into the DB: {:?}", book);
            Ok(redirect_to_book(book.id))
        }
        Mutation::Rejected(Rejection { book, violations }) => {
            info!("Rejected new book with {} violation(s)", violations.len());
            Ok(redisplay(NEW_BOOK_TEMPLATE, rejected_view(book, violations)))
        }
    }
}

async fn get_book<R>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<Rendered<BookFormView>, AppError>
where
    R: BookRepo,
{
    let id = parse_book_id(&id)?;

    let book = catalog::find_book(&state.repo, id).await?;

    info!("Retrieved book from DB: {:?}", book);

    Ok(Rendered::new(UPDATE_BOOK_TEMPLATE, edit_book_view(&book)))
}

async fn update_book<R>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
    Form(form): Form<BookForm>,
) -> Result<Response, AppError>
where
    R: BookRepo,
{
    let id = parse_book_id(&id)?;
    let mut repo = state.repo;

    match catalog::update_book(&mut repo, id, form).await? {
        Mutation::Saved(book) => {
            info!("Updated book in DB: {:?}", book);
            Ok(redirect_to_book(book.id))
        }
        Mutation::Rejected(Rejection { book, violations }) => {
            info!(
                "Rejected update of book {} with {} violation(s)",
                id,
                violations.len()
            );
            Ok(redisplay(UPDATE_BOOK_TEMPLATE, rejected_view(book, violations)))
        }
    }
}

async fn delete_book<R>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError>
where
    R: BookRepo,
{
    let id = parse_book_id(&id)?;
    let mut repo = state.repo;

    catalog::delete_book(&mut repo, id).await?;

    info!("Deleted book from DB with ID: {}", id);

    Ok(Redirect::to(BOOKS_PATH))
}

#[derive(Serialize)]
struct ReadyResponse {
    ready: bool,
    store: bool,
}

async fn readyz<R>(State(state): State<AppState<R>>) -> (StatusCode, Json<ReadyResponse>)
where
    R: BookRepo,
{
    let ready = match catalog::check_store(&state.repo).await {
        Ok(()) => true,
        Err(error) => {
            warn!("Readiness check failed: {}", error);
            false
        }
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            ready,
            store: ready,
        }),
    )
}

async fn page_not_found() -> AppError {
    info!("No route matched the request");
    AppError::page_not_found()
}

fn redirect_to_book(id: i32) -> Response {
    Redirect::to(&format!("{BOOKS_PATH}/{id}")).into_response()
}

fn redisplay(template: &'static str, view: BookFormView) -> Response {
    Rendered::new(template, view)
        .with_status(StatusCode::UNPROCESSABLE_ENTITY)
        .into_response()
}

/// IDs that are not integers cannot name a book, so they are reported like a missing one
fn parse_book_id(id: &str) -> Result<i32, AppError> {
    id.parse::<i32>().map_err(|_| {
        info!("Invalid book ID: {}", id);
        AppError::book_not_found()
    })
}
