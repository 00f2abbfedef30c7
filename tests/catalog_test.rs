use reqwest::{redirect, Response, StatusCode};
use serde::Deserialize;
use tokio::net::TcpListener;

use book_catalog::memory::MemoryBookRepo;
use book_catalog::{build_app, Config};

// Note: the application's view-models are not reused here, the tests read the JSON documents
#[derive(Debug, Deserialize)]
struct Page<M> {
    template: String,
    model: M,
}

#[derive(Debug, PartialEq, Eq, Deserialize)]
struct Book {
    id: i32,
    title: String,
    author: String,
    genre: Option<String>,
    year: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModel {
    books: Vec<Book>,
    page: i64,
    size: i64,
    page_count: i64,
    total_matching: i64,
    search_query: Option<String>,
    next_search_url_prefix: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct Draft {
    id: Option<i32>,
    title: String,
    author: String,
    genre: String,
    year: String,
}

#[derive(Debug, Deserialize)]
struct Violation {
    field: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct FormModel {
    book: Draft,
    errors: Vec<Violation>,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ErrorModel {
    message: String,
    status: u16,
}

struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Result<Response, reqwest::Error> {
        self.client.get(self.url(path)).send().await
    }

    async fn post_book(
        &self,
        path: &str,
        book: &[(&str, &str)],
    ) -> Result<Response, reqwest::Error> {
        self.client.post(self.url(path)).form(book).send().await
    }

    async fn list(&self, query: &str) -> Result<ListModel, reqwest::Error> {
        let page = self
            .get(&format!("/books{query}"))
            .await?
            .json::<Page<ListModel>>()
            .await?;
        assert_eq!(page.template, "index");
        Ok(page.model)
    }

    async fn insert(&self, title: &str, author: &str, year: &str) -> Result<i32, reqwest::Error> {
        let response = self
            .post_book(
                "/books",
                &[("title", title), ("author", author), ("genre", ""), ("year", year)],
            )
            .await?;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let id = location(&response)
            .trim_start_matches("/books/")
            .parse()
            .expect("redirect to the new book");
        Ok(id)
    }
}

fn location(response: &Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn start(repo: MemoryBookRepo) -> CatalogClient {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let app = build_app(repo, &Config::default());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .unwrap();

    CatalogClient { client, base_url }
}

#[tokio::test]
async fn root_redirects_to_listing() {
    let client = start(MemoryBookRepo::new()).await;

    let response = client.get("/").await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/books");

    let listing = client.list("").await.unwrap();
    assert!(listing.books.is_empty());
    assert_eq!(listing.page_count, 0);
    assert_eq!(listing.title, "Books");
    assert_eq!(listing.next_search_url_prefix, "/books?");
}

#[tokio::test]
async fn new_book_form_is_empty() {
    let client = start(MemoryBookRepo::new()).await;

    let page = client
        .get("/books/new")
        .await
        .unwrap()
        .json::<Page<FormModel>>()
        .await
        .unwrap();

    assert_eq!(page.template, "books/new-book");
    assert_eq!(page.model.title, "New Book");
    assert_eq!(page.model.book.id, None);
    assert_eq!(page.model.book.title, "");
    assert!(page.model.errors.is_empty());
}

#[tokio::test]
async fn create_then_view_a_book() {
    let client = start(MemoryBookRepo::new()).await;

    let id = client.insert("Dune", "Frank Herbert", "1965").await.unwrap();

    let page = client
        .get(&format!("/books/{id}"))
        .await
        .unwrap()
        .json::<Page<FormModel>>()
        .await
        .unwrap();

    assert_eq!(page.template, "books/update-book");
    assert_eq!(page.model.title, "Edit Book: Dune");
    assert_eq!(page.model.book.id, Some(id));
    assert_eq!(page.model.book.author, "Frank Herbert");
    assert_eq!(page.model.book.year, "1965");
}

#[tokio::test]
async fn invalid_new_book_is_redisplayed_with_errors() {
    let client = start(MemoryBookRepo::new()).await;

    let response = client
        .post_book(
            "/books",
            &[
                ("title", ""),
                ("author", "Frank Herbert"),
                ("genre", "Science Fiction"),
                ("year", "1965"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let page = response.json::<Page<FormModel>>().await.unwrap();
    assert_eq!(page.template, "books/new-book");
    assert_eq!(page.model.title, "New Book");
    assert_eq!(page.model.book.author, "Frank Herbert");
    assert_eq!(page.model.book.genre, "Science Fiction");
    assert_eq!(page.model.book.year, "1965");
    assert_eq!(page.model.errors.len(), 1);
    assert_eq!(page.model.errors[0].field, "title");
    assert_eq!(page.model.errors[0].message, "Please provide a value for \"Title\"");

    assert_eq!(client.list("").await.unwrap().total_matching, 0);
}

#[tokio::test]
async fn update_and_rejected_update() {
    let client = start(MemoryBookRepo::new()).await;
    let id = client.insert("Dune", "Frank Herbert", "1965").await.unwrap();

    let response = client
        .post_book(
            &format!("/books/{id}"),
            &[("title", "Dune Messiah"), ("author", "Frank Herbert"), ("year", "1969")],
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/books/{id}"));

    let listing = client.list("").await.unwrap();
    assert_eq!(
        listing.books,
        vec![Book {
            id,
            title: "Dune Messiah".to_string(),
            author: "Frank Herbert".to_string(),
            genre: None,
            year: Some(1969),
        }]
    );

    let response = client
        .post_book(&format!("/books/{id}"), &[("title", "Dune"), ("author", "")])
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let page = response.json::<Page<FormModel>>().await.unwrap();
    assert_eq!(page.template, "books/update-book");
    assert_eq!(page.model.title, "Edit Book: Dune");
    assert_eq!(page.model.book.id, Some(id));
    assert_eq!(page.model.errors[0].field, "author");

    // The stored book is untouched
    let listing = client.list("").await.unwrap();
    assert_eq!(listing.books[0].title, "Dune Messiah");
}

#[tokio::test]
async fn missing_books_and_routes_are_not_found() {
    let client = start(MemoryBookRepo::new()).await;

    for path in ["/books/99", "/books/not-a-number"] {
        let response = client.get(path).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let page = response.json::<Page<ErrorModel>>().await.unwrap();
        assert_eq!(page.template, "page-not-found");
        assert_eq!(page.model.message, "Looks like the book you requested doesn't exist");
        assert_eq!(page.model.status, 404);
    }

    let response = client
        .post_book("/books/99", &[("title", "Ghost"), ("author", "Nobody")])
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(client.list("").await.unwrap().total_matching, 0);

    let response = client.post_book("/books/99/delete", &[]).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let unknown_pages = [
        client.get("/no/such/page").await.unwrap(),
        client.get("/static/missing.css").await.unwrap(),
        client.get("/books/1/delete").await.unwrap(),
        client.client.put(client.url("/books")).send().await.unwrap(),
    ];
    for response in unknown_pages {
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let page = response.json::<Page<ErrorModel>>().await.unwrap();
        assert_eq!(page.template, "page-not-found");
        assert_eq!(page.model.message, "Looks like the page you requested doesn't exist");
    }
}

#[tokio::test]
async fn delete_removes_the_book() {
    let client = start(MemoryBookRepo::new()).await;
    let dune = client.insert("Dune", "Frank Herbert", "").await.unwrap();
    let emma = client.insert("Emma", "Jane Austen", "").await.unwrap();

    let response = client
        .post_book(&format!("/books/{dune}/delete"), &[])
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/books");

    let response = client.get(&format!("/books/{dune}")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let listing = client.list("").await.unwrap();
    let ids: Vec<_> = listing.books.iter().map(|book| book.id).collect();
    assert_eq!(ids, vec![emma]);
}

#[tokio::test]
async fn search_and_pagination() {
    let client = start(MemoryBookRepo::new()).await;
    let dune = client.insert("Dune", "Herbert", "1965").await.unwrap();
    client.insert("Duna Guide", "X", "2000").await.unwrap();

    let listing = client.list("?searchQuery=Dune").await.unwrap();
    let ids: Vec<_> = listing.books.iter().map(|book| book.id).collect();
    assert_eq!(ids, vec![dune]);
    assert_eq!(listing.search_query.as_deref(), Some("Dune"));
    assert_eq!(listing.next_search_url_prefix, "/books?searchQuery=Dune&");

    for n in 3..=5 {
        client
            .insert(&format!("Book {n}"), "Author", "")
            .await
            .unwrap();
    }

    let listing = client.list("?page=1&size=2").await.unwrap();
    assert_eq!(listing.books.len(), 2);
    assert_eq!((listing.page, listing.size), (1, 2));
    assert_eq!(listing.page_count, 3);

    let listing = client.list("?page=3&size=2").await.unwrap();
    assert_eq!(listing.books.len(), 1);
    assert_eq!(listing.books[0].title, "Book 5");

    let listing = client.list("?page=4&size=2").await.unwrap();
    assert!(listing.books.is_empty());
    assert_eq!(listing.total_matching, 5);
    assert_eq!(listing.page_count, 3);

    let listing = client.list("?page=abc&size=&color=red").await.unwrap();
    assert_eq!((listing.page, listing.size), (1, 5));
    assert_eq!(listing.books.len(), 5);
}

#[tokio::test]
async fn unavailable_store_renders_error_page() {
    let repo = MemoryBookRepo::new();
    let client = start(repo.clone()).await;

    let response = client.get("/readyz").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    repo.set_online(false);

    let response = client.get("/readyz").await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = client.get("/books").await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let page = response.json::<Page<ErrorModel>>().await.unwrap();
    assert_eq!(page.template, "error");
    assert_eq!(page.model.status, 503);
    assert_eq!(page.model.message, "The book catalog is temporarily unavailable");
}

#[tokio::test]
async fn static_assets_are_served() {
    let client = start(MemoryBookRepo::new()).await;

    let response = client.get("/static/styles.css").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
