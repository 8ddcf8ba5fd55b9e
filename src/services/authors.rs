//! Author reports and deletion

use crate::{
    error::AppResult,
    models::{Author, AuthorDetails, SENTINEL_ID},
    repository::{DeleteOutcome, Repository},
};

#[derive(Clone)]
pub struct AuthorsService {
    repository: Repository,
}

impl AuthorsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn show_author(&self, author_id: i32) -> AppResult<String> {
        let body = if author_id == SENTINEL_ID {
            AuthorDetails {
                author: Author::default_entry(),
                books: Vec::new(),
            }
            .to_string()
        } else {
            match self.repository.authors.get_by_id(author_id).await? {
                Some(details) => details.to_string(),
                None => format!("No such author ID: {}", author_id),
            }
        };
        Ok(format!("Show Author:\n\t{}", body))
    }

    pub async fn show_all_authors(&self) -> AppResult<String> {
        let authors = self.repository.authors.list().await?;

        let mut report = String::from("Show All Authors:");
        for author in authors {
            report.push_str(&format!("\n\t{}", author));
        }
        Ok(report)
    }

    pub async fn delete_author(&self, author_id: i32) -> AppResult<String> {
        let body = if author_id == SENTINEL_ID {
            "Cannot delete default author entry".to_string()
        } else {
            match self.repository.authors.delete(author_id).await? {
                DeleteOutcome::Deleted => {
                    tracing::info!(author_id, "Author deleted");
                    format!("Author with ID {} deleted", author_id)
                }
                _ => format!("No such Author ID: {}", author_id),
            }
        };
        Ok(format!("Delete Author:\n\t{}", body))
    }
}
