//! DashMap-backed movie store for development and tests.
//!
//! Rows live in sharded maps, so writers to different ids never contend and
//! the version compare-and-swap for one id runs under that row's shard lock.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use tracing::debug;

use crate::data::filters::{QueryPlan, SortDirection};
use crate::data::movie::{Movie, NewMovie};
use crate::errors::{AppError, Result};
use crate::store::{MovieQuery, MovieStore};

pub struct InMemoryMovieStore {
    rows: DashMap<i64, Movie>,
    next_id: AtomicI64,
}

impl Default for InMemoryMovieStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMovieStore {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn row_matches(movie: &Movie, title_words: &[String], genres: &[String]) -> bool {
    if !title_words.is_empty() {
        let movie_words = words(&movie.title);
        if !title_words.iter().all(|w| movie_words.contains(w)) {
            return false;
        }
    }
    genres.iter().all(|g| movie.genres.contains(g))
}

fn compare_by(column: &str, a: &Movie, b: &Movie) -> Result<Ordering> {
    Ok(match column {
        "id" => a.id.cmp(&b.id),
        "title" => a.title.cmp(&b.title),
        "year" => a.year.cmp(&b.year),
        "runtime" => a.runtime.cmp(&b.runtime),
        other => {
            return Err(AppError::InternalError(format!(
                "unsupported sort column: {}",
                other
            )))
        }
    })
}

#[async_trait]
impl MovieStore for InMemoryMovieStore {
    async fn insert(&self, movie: NewMovie) -> Result<Movie> {
        let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
        let row = Movie {
            id,
            created_at: Utc::now(),
            title: movie.title,
            year: movie.year,
            runtime: movie.runtime,
            genres: movie.genres.unwrap_or_default(),
            version: 1,
        };
        self.rows.insert(id, row.clone());
        debug!(id, "Inserted movie row");
        Ok(row)
    }

    async fn get(&self, id: i64) -> Result<Option<Movie>> {
        Ok(self.rows.get(&id).map(|row| row.value().clone()))
    }

    async fn update(&self, movie: &Movie) -> Result<Option<i32>> {
        let Some(mut row) = self.rows.get_mut(&movie.id) else {
            return Ok(None);
        };
        if row.version != movie.version {
            return Ok(None);
        }

        let new_version = row.version + 1;
        row.title = movie.title.clone();
        row.year = movie.year;
        row.runtime = movie.runtime;
        row.genres = movie.genres.clone();
        row.version = new_version;
        Ok(Some(new_version))
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        Ok(self.rows.remove(&id).map_or(0, |_| 1))
    }

    async fn get_all(&self, query: &MovieQuery, plan: &QueryPlan) -> Result<(Vec<Movie>, i64)> {
        // Reject unknown columns even when nothing matches.
        if let Some(row) = self.rows.iter().next() {
            compare_by(&plan.sort_column, row.value(), row.value())?;
        }

        let title_words = words(&query.title);
        let mut matched: Vec<Movie> = self
            .rows
            .iter()
            .filter(|row| row_matches(row.value(), &title_words, &query.genres))
            .map(|row| row.value().clone())
            .collect();

        let column = plan.sort_column.as_str();
        matched.sort_by(|a, b| {
            let primary = compare_by(column, a, b).unwrap_or(Ordering::Equal);
            let primary = match plan.direction {
                SortDirection::Ascending => primary,
                SortDirection::Descending => primary.reverse(),
            };
            primary.then_with(|| a.id.cmp(&b.id))
        });

        let total = matched.len() as i64;
        let page = matched
            .into_iter()
            .skip(plan.offset.max(0) as usize)
            .take(plan.limit.max(0) as usize)
            .collect();

        Ok((page, total))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_movie(title: &str, year: i32, genres: &[&str]) -> NewMovie {
        NewMovie {
            title: title.to_string(),
            year,
            runtime: 100,
            genres: Some(genres.iter().map(|g| g.to_string()).collect()),
        }
    }

    fn plan(column: &str, direction: SortDirection) -> QueryPlan {
        QueryPlan {
            sort_column: column.to_string(),
            direction,
            limit: 100,
            offset: 0,
        }
    }

    #[tokio::test]
    async fn test_update_requires_matching_version() {
        let store = InMemoryMovieStore::new();
        let mut movie = store.insert(new_movie("Alien", 1979, &["horror"])).await.unwrap();

        movie.title = "Aliens".to_string();
        assert_eq!(store.update(&movie).await.unwrap(), Some(2));
        // Same stale version again matches nothing.
        assert_eq!(store.update(&movie).await.unwrap(), None);

        let stored = store.get(movie.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Aliens");
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_update_missing_row_matches_nothing() {
        let store = InMemoryMovieStore::new();
        let mut movie = store.insert(new_movie("Alien", 1979, &["horror"])).await.unwrap();
        movie.id = 99;
        assert_eq!(store.update(&movie).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_title_and_genre_filters() {
        let store = InMemoryMovieStore::new();
        store.insert(new_movie("The Breakfast Club", 1985, &["comedy", "drama"])).await.unwrap();
        store.insert(new_movie("Breakfast at Tiffany's", 1961, &["romance"])).await.unwrap();
        store.insert(new_movie("Club Dread", 2004, &["comedy", "horror"])).await.unwrap();

        let query = MovieQuery {
            title: "breakfast CLUB".to_string(),
            genres: vec![],
        };
        let (rows, total) = store.get_all(&query, &plan("id", SortDirection::Ascending)).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].title, "The Breakfast Club");

        let query = MovieQuery {
            title: String::new(),
            genres: vec!["comedy".to_string()],
        };
        let (rows, total) = store.get_all(&query, &plan("year", SortDirection::Descending)).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows[0].title, "Club Dread");
    }

    #[tokio::test]
    async fn test_ties_break_by_id() {
        let store = InMemoryMovieStore::new();
        for title in ["c", "a", "b"] {
            store.insert(new_movie(title, 2000, &["drama"])).await.unwrap();
        }

        let (rows, _) = store
            .get_all(&MovieQuery::default(), &plan("year", SortDirection::Descending))
            .await
            .unwrap();
        let ids: Vec<i64> = rows.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_unknown_sort_column_is_internal_error() {
        let store = InMemoryMovieStore::new();
        store.insert(new_movie("Up", 2009, &["animation"])).await.unwrap();

        let result = store
            .get_all(&MovieQuery::default(), &plan("rating", SortDirection::Ascending))
            .await;
        assert!(matches!(result, Err(AppError::InternalError(_))));
    }

    #[tokio::test]
    async fn test_delete_reports_rows_affected() {
        let store = InMemoryMovieStore::new();
        let movie = store.insert(new_movie("Up", 2009, &["animation"])).await.unwrap();

        assert_eq!(store.delete(movie.id).await.unwrap(), 1);
        assert_eq!(store.delete(movie.id).await.unwrap(), 0);
        assert!(store.is_empty());
    }
}
