use serde::{Deserialize, Serialize};

use crate::schema::books;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, diesel::Queryable, diesel::Selectable)]
#[diesel(table_name = books)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub year: Option<i32>,
}

/// A validated set of book fields, ready to be inserted or applied to an existing row.
#[derive(Debug, Clone, PartialEq, Eq, diesel::Insertable, diesel::AsChangeset)]
#[diesel(table_name = books)]
#[diesel(treat_none_as_null = true)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub year: Option<i32>,
}

/// The raw field values submitted by the book form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookForm {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub year: Option<String>,
}

/// A book that has not been persisted, carrying the values exactly as they were entered so a
/// rejected form can be redisplayed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookDraft {
    pub id: Option<i32>,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub year: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: &'static str,
    pub message: String,
}

impl Violation {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Violation {
            field,
            message: message.into(),
        }
    }
}

impl BookForm {
    /// Builds an unsaved book from the submitted values. Nothing is validated or normalised.
    pub fn build_unsaved(&self, id: Option<i32>) -> BookDraft {
        let value = |field: &Option<String>| field.clone().unwrap_or_default();

        BookDraft {
            id,
            title: value(&self.title),
            author: value(&self.author),
            genre: value(&self.genre),
            year: value(&self.year),
        }
    }

    /// Checks every field and returns either the fields to persist or all of the violations
    /// found, in field order.
    pub fn validate(&self) -> Result<NewBook, Vec<Violation>> {
        let mut violations = Vec::new();

        let title = required(&self.title, "title", "Title", &mut violations);
        let author = required(&self.author, "author", "Author", &mut violations);

        let genre = self
            .genre
            .as_deref()
            .map(str::trim)
            .filter(|genre| !genre.is_empty())
            .map(str::to_string);

        let year = match self.year.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(year) => match year.parse::<i32>() {
                Ok(year) => Some(year),
                Err(_) => {
                    violations.push(Violation::new("year", "Year must be a whole number"));
                    None
                }
            },
        };

        if violations.is_empty() {
            Ok(NewBook {
                title,
                author,
                genre,
                year,
            })
        } else {
            Err(violations)
        }
    }
}

fn required(
    value: &Option<String>,
    field: &'static str,
    label: &str,
    violations: &mut Vec<Violation>,
) -> String {
    match value.as_deref() {
        Some(value) if !value.trim().is_empty() => value.to_string(),
        _ => {
            violations.push(Violation::new(
                field,
                format!("Please provide a value for \"{label}\""),
            ));
            String::new()
        }
    }
}

impl From<&Book> for BookDraft {
    fn from(book: &Book) -> Self {
        BookDraft {
            id: Some(book.id),
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre.clone().unwrap_or_default(),
            year: book.year.map(|year| year.to_string()).unwrap_or_default(),
        }
    }
}
