//! Storage collaborator for movie rows.
//!
//! Implementations report raw row outcomes the way a relational backend
//! would: a conditional update that matched no `(id, version)` row returns
//! `None`, a delete returns the number of rows removed. Translating those into
//! not-found and edit-conflict outcomes, and bounding each call with a
//! timeout, is the job of [`crate::data::MovieModel`].

pub mod in_memory;

use crate::data::filters::QueryPlan;
use crate::data::movie::{Movie, NewMovie};
use crate::errors::Result;
use async_trait::async_trait;

pub use in_memory::InMemoryMovieStore;

/// Matching criteria for list queries. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieQuery {
    /// Every word must appear as a word of the title (case-insensitive)
    pub title: String,

    /// Movie must carry all of these genres
    pub genres: Vec<String>,
}

#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Insert a row, assigning id, creation time and version 1
    async fn insert(&self, movie: NewMovie) -> Result<Movie>;

    async fn get(&self, id: i64) -> Result<Option<Movie>>;

    /// Write `movie` only if the stored row has `id == movie.id` and
    /// `version == movie.version`, bumping the version. Returns the new
    /// version, or `None` when no row matched.
    async fn update(&self, movie: &Movie) -> Result<Option<i32>>;

    /// Returns the number of rows removed
    async fn delete(&self, id: i64) -> Result<u64>;

    /// One page of matching rows plus the total number of matches
    async fn get_all(&self, query: &MovieQuery, plan: &QueryPlan) -> Result<(Vec<Movie>, i64)>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> Result<()>;
}
