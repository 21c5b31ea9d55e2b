//! Optimistic-concurrency access to movie records.
//!
//! Updates are a compare-and-swap on the row version: the write lands only
//! if the stored version still equals the one the caller read, otherwise the
//! caller gets `EditConflict` and decides whether to re-fetch and retry.
//! Nothing here retries on its own, and every storage call is bounded by the
//! configured timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::data::filters::{calculate_metadata, Filters, PageMetadata};
use crate::data::movie::{Movie, NewMovie};
use crate::errors::{AppError, Result};
use crate::store::{MovieQuery, MovieStore};

pub struct MovieModel<S: MovieStore> {
    store: Arc<S>,
    timeout: Duration,
}

impl<S: MovieStore> Clone for MovieModel<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            timeout: self.timeout,
        }
    }
}

impl<S: MovieStore> MovieModel<S> {
    pub fn new(store: Arc<S>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let result = match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "Storage operation timed out");
                Err(AppError::Timeout { operation })
            }
        };
        crate::metrics::record_store_operation(operation, outcome_label(&result));
        result
    }

    pub async fn insert(&self, movie: NewMovie) -> Result<Movie> {
        let movie = self.bounded("insert", self.store.insert(movie)).await?;
        debug!(id = movie.id, "Movie created");
        Ok(movie)
    }

    pub async fn get(&self, id: i64) -> Result<Movie> {
        if id < 1 {
            return Err(AppError::NotFound);
        }
        self.bounded("get", async { self.store.get(id).await?.ok_or(AppError::NotFound) })
            .await
    }

    /// Write `movie` if its `version` is still current. On success
    /// `movie.version` is advanced and the new version returned.
    pub async fn update(&self, movie: &mut Movie) -> Result<i32> {
        let expected_version = movie.version;
        let id = movie.id;
        let snapshot = movie.clone();

        let new_version = self
            .bounded("update", async {
                self.store
                    .update(&snapshot)
                    .await?
                    .ok_or(AppError::EditConflict { id, expected_version })
            })
            .await?;

        debug!(id, from = expected_version, to = new_version, "Movie updated");
        movie.version = new_version;
        Ok(new_version)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if id < 1 {
            return Err(AppError::NotFound);
        }
        self.bounded("delete", async {
            match self.store.delete(id).await? {
                0 => Err(AppError::NotFound),
                _ => Ok(()),
            }
        })
        .await
    }

    /// List one page. `filters` must already have been validated.
    pub async fn get_all(&self, query: &MovieQuery, filters: &Filters) -> Result<(Vec<Movie>, PageMetadata)> {
        let plan = filters.plan();
        let (movies, total) = self.bounded("get_all", self.store.get_all(query, &plan)).await?;
        Ok((movies, calculate_metadata(total, filters.page, filters.page_size)))
    }

    pub async fn health_check(&self) -> Result<()> {
        self.bounded("health_check", self.store.health_check()).await
    }
}

fn outcome_label<T>(result: &Result<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(AppError::NotFound) => "not_found",
        Err(AppError::EditConflict { .. }) => "conflict",
        Err(AppError::Timeout { .. }) => "timeout",
        Err(_) => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaginationConfig;
    use crate::data::filters::QueryPlan;
    use crate::data::validator::Validator;
    use crate::store::InMemoryMovieStore;
    use async_trait::async_trait;
    use std::collections::HashSet;

    fn model() -> MovieModel<InMemoryMovieStore> {
        MovieModel::new(Arc::new(InMemoryMovieStore::new()), Duration::from_secs(3))
    }

    fn new_movie(title: &str) -> NewMovie {
        NewMovie {
            title: title.to_string(),
            year: 1994,
            runtime: 142,
            genres: Some(vec!["drama".to_string()]),
        }
    }

    fn filters(page: i64, page_size: i64, sort: &str) -> Filters {
        let f = Filters {
            page,
            page_size,
            sort: sort.to_string(),
            sort_safelist: PaginationConfig::default().sort_safelist,
        };
        let mut v = Validator::new();
        f.validate(&mut v, &PaginationConfig::default());
        assert!(v.valid());
        f
    }

    #[tokio::test]
    async fn test_insert_then_get_round_trip() {
        let movies = model();
        let created = movies.insert(new_movie("The Shawshank Redemption")).await.unwrap();

        let fetched = movies.get(created.id).await.unwrap();
        assert_eq!(fetched.version, 1);
        assert_eq!(fetched.title, "The Shawshank Redemption");
        assert_eq!(fetched.year, 1994);
        assert_eq!(fetched.runtime, 142);
        assert_eq!(fetched.genres, vec!["drama".to_string()]);
    }

    #[tokio::test]
    async fn test_get_missing_and_non_positive_ids() {
        let movies = model();
        assert!(matches!(movies.get(42).await, Err(AppError::NotFound)));
        assert!(matches!(movies.get(0).await, Err(AppError::NotFound)));
        assert!(matches!(movies.get(-3).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_bumps_version_by_one() {
        let movies = model();
        let mut movie = movies.insert(new_movie("Heat")).await.unwrap();

        movie.runtime = 170;
        assert_eq!(movies.update(&mut movie).await.unwrap(), 2);
        assert_eq!(movie.version, 2);
        assert_eq!(movies.get(movie.id).await.unwrap().runtime, 170);
    }

    #[tokio::test]
    async fn test_stale_update_is_conflict_not_not_found() {
        let movies = model();
        let mut first = movies.insert(new_movie("Heat")).await.unwrap();
        let mut second = first.clone();

        movies.update(&mut first).await.unwrap();
        let err = movies.update(&mut second).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::EditConflict { expected_version: 1, .. }
        ));
        assert_eq!(second.version, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_exactly_one_wins() {
        let movies = model();
        let movie = movies.insert(new_movie("Ronin")).await.unwrap();

        for round in 0..50 {
            let current = movies.get(movie.id).await.unwrap();
            let barrier = Arc::new(tokio::sync::Barrier::new(2));

            let handles: Vec<_> = (0..2)
                .map(|writer| {
                    let movies = movies.clone();
                    let barrier = Arc::clone(&barrier);
                    let mut copy = current.clone();
                    copy.title = format!("Ronin {} {}", round, writer);
                    tokio::spawn(async move {
                        barrier.wait().await;
                        movies.update(&mut copy).await
                    })
                })
                .collect();

            let mut wins = 0;
            let mut conflicts = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(version) => {
                        assert_eq!(version, current.version + 1);
                        wins += 1;
                    }
                    Err(AppError::EditConflict { .. }) => conflicts += 1,
                    Err(other) => panic!("unexpected error: {}", other),
                }
            }
            assert_eq!((wins, conflicts), (1, 1));
        }
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let movies = model();
        let movie = movies.insert(new_movie("Se7en")).await.unwrap();

        movies.delete(movie.id).await.unwrap();
        assert!(matches!(movies.delete(movie.id).await, Err(AppError::NotFound)));
        assert!(matches!(movies.delete(9_999).await, Err(AppError::NotFound)));
        assert!(matches!(movies.delete(0).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_pages_partition_all_rows() {
        let movies = model();
        for i in 0..25 {
            movies.insert(new_movie(&format!("Movie {}", i))).await.unwrap();
        }

        let mut seen = HashSet::new();
        for page in 1..=3 {
            let (rows, metadata) = movies
                .get_all(&MovieQuery::default(), &filters(page, 10, "-year"))
                .await
                .unwrap();
            assert_eq!(rows.len(), if page == 3 { 5 } else { 10 });
            assert_eq!(metadata.last_page, 3);
            assert_eq!(metadata.total_records, 25);
            assert_eq!(metadata.current_page, page);
            for row in rows {
                assert!(seen.insert(row.id));
            }
        }
        assert_eq!(seen.len(), 25);
    }

    struct StalledStore;

    #[async_trait]
    impl MovieStore for StalledStore {
        async fn insert(&self, _movie: NewMovie) -> Result<Movie> {
            std::future::pending().await
        }
        async fn get(&self, _id: i64) -> Result<Option<Movie>> {
            std::future::pending().await
        }
        async fn update(&self, _movie: &Movie) -> Result<Option<i32>> {
            std::future::pending().await
        }
        async fn delete(&self, _id: i64) -> Result<u64> {
            std::future::pending().await
        }
        async fn get_all(&self, _query: &MovieQuery, _plan: &QueryPlan) -> Result<(Vec<Movie>, i64)> {
            std::future::pending().await
        }
        async fn health_check(&self) -> Result<()> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_backend_times_out() {
        let movies = MovieModel::new(Arc::new(StalledStore), Duration::from_secs(3));

        assert!(matches!(
            movies.get(1).await,
            Err(AppError::Timeout { operation: "get" })
        ));
        assert!(matches!(
            movies.delete(1).await,
            Err(AppError::Timeout { operation: "delete" })
        ));
        assert!(matches!(
            movies.insert(new_movie("Drive")).await,
            Err(AppError::Timeout { operation: "insert" })
        ));

        let mut movie = Movie {
            id: 1,
            created_at: chrono::Utc::now(),
            title: "Drive".to_string(),
            year: 2011,
            runtime: 100,
            genres: vec!["crime".to_string()],
            version: 1,
        };
        assert!(matches!(
            movies.update(&mut movie).await,
            Err(AppError::Timeout { operation: "update" })
        ));
        assert_eq!(movie.version, 1);

        assert!(matches!(
            movies.get_all(&MovieQuery::default(), &filters(1, 10, "id")).await,
            Err(AppError::Timeout { operation: "get_all" })
        ));
    }
}
