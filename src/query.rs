//! Turns the listing parameters of a request into a search predicate and a page window.

use serde::Deserialize;

use crate::models::Book;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CaseSensitivity {
    Sensitive,
    #[default]
    Insensitive,
}

/// The listing parameters as they arrive in the query string. Values are kept raw so that
/// anything non-numeric falls back to the defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    #[serde(rename = "searchQuery")]
    pub search_query: Option<String>,
    pub page: Option<String>,
    pub size: Option<String>,
}

/// Matches a book when its title, author, genre or year contains the search text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSearch {
    pub text: String,
    pub case: CaseSensitivity,
}

impl BookSearch {
    /// A `LIKE` pattern matching the search text anywhere in a column, with the wildcard
    /// characters of the text itself escaped.
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.text.len() + 2);
        pattern.push('%');
        for c in self.text.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }

    pub fn matches(&self, book: &Book) -> bool {
        let year = book.year.map(|year| year.to_string());

        let fields = [
            Some(book.title.as_str()),
            Some(book.author.as_str()),
            book.genre.as_deref(),
            year.as_deref(),
        ];

        let matched = fields
            .into_iter()
            .flatten()
            .any(|field| self.contained_in(field));
        matched
    }

    fn contained_in(&self, field: &str) -> bool {
        match self.case {
            CaseSensitivity::Sensitive => field.contains(&self.text),
            CaseSensitivity::Insensitive => field
                .to_lowercase()
                .contains(&self.text.to_lowercase()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Option<BookSearch>,
    pub page: i64,
    pub size: i64,
}

impl ListQuery {
    pub fn from_params(params: &ListParams, case: CaseSensitivity) -> Self {
        let search = params
            .search_query
            .as_ref()
            .filter(|text| !text.is_empty())
            .map(|text| BookSearch {
                text: text.clone(),
                case,
            });

        ListQuery {
            search,
            page: positive_or(params.page.as_deref(), DEFAULT_PAGE),
            size: positive_or(params.size.as_deref(), DEFAULT_PAGE_SIZE),
        }
    }

    pub fn search_text(&self) -> Option<&str> {
        self.search.as_ref().map(|search| search.text.as_str())
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.size)
    }

    pub fn limit(&self) -> i64 {
        self.size
    }
}

fn positive_or(value: Option<&str>, default: i64) -> i64 {
    value
        .and_then(leading_integer)
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

/// Reads the integer at the start of the value and ignores whatever follows it, so `2abc` and
/// `2.5` both read as 2.
fn leading_integer(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let sign_len = usize::from(value.starts_with(['+', '-']));
    let digits_len = value[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();

    value[..sign_len + digits_len].parse().ok()
}

/// One page of a listing, together with the size of the whole result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookPage {
    pub books: Vec<Book>,
    pub total_matching: i64,
    pub page_count: i64,
}

pub fn page_count(total_matching: i64, size: i64) -> i64 {
    if total_matching <= 0 || size <= 0 {
        return 0;
    }
    total_matching / size + i64::from(total_matching % size != 0)
}
