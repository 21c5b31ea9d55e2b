use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::data::{Filters, MoviePatch, NewMovie, Validator};
use crate::errors::{AppError, Result};
use crate::server::AppState;
use crate::store::{MovieQuery, MovieStore};

/// Header a client may send with a PATCH to assert the version it last read
pub const EXPECTED_VERSION_HEADER: &str = "x-expected-version";

fn read_id(raw: &str) -> Result<i64> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(AppError::NotFound),
    }
}

fn read_string(qs: &HashMap<String, String>, key: &str, default: &str) -> String {
    match qs.get(key) {
        Some(value) if !value.is_empty() => value.clone(),
        _ => default.to_string(),
    }
}

fn read_csv(qs: &HashMap<String, String>, key: &str) -> Vec<String> {
    match qs.get(key) {
        Some(value) if !value.is_empty() => value.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

fn read_int(qs: &HashMap<String, String>, key: &str, default: i64, v: &mut Validator) -> i64 {
    match qs.get(key) {
        Some(value) if !value.is_empty() => match value.parse::<i64>() {
            Ok(n) => n,
            Err(_) => {
                v.add_error(key, "must be an integer value");
                default
            }
        },
        _ => default,
    }
}

fn read_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

fn read_expected_version(headers: &HeaderMap) -> Result<Option<i32>> {
    let Some(raw) = headers.get(EXPECTED_VERSION_HEADER) else {
        return Ok(None);
    };
    raw.to_str()
        .ok()
        .and_then(|s| s.trim().parse::<i32>().ok())
        .map(Some)
        .ok_or_else(|| AppError::BadRequest(format!("{} must be an integer", EXPECTED_VERSION_HEADER)))
}

pub async fn healthcheck<S: MovieStore + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Json<serde_json::Value>> {
    state.movies.health_check().await?;

    Ok(Json(json!({
        "status": "available",
        "system_info": {
            "environment": state.env,
            "version": env!("CARGO_PKG_VERSION"),
        }
    })))
}

pub async fn list_movies<S: MovieStore + 'static>(
    State(state): State<AppState<S>>,
    Query(qs): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>> {
    let limits = state.pagination.load_full();
    let mut v = Validator::new();

    let query = MovieQuery {
        title: read_string(&qs, "title", ""),
        genres: read_csv(&qs, "genres"),
    };

    let filters = Filters {
        page: read_int(&qs, "page", 1, &mut v),
        page_size: read_int(&qs, "page_size", limits.default_page_size, &mut v),
        sort: read_string(&qs, "sort", "id"),
        sort_safelist: limits.sort_safelist.clone(),
    };

    filters.validate(&mut v, &limits);
    v.into_result()?;

    debug!(?filters, ?query, "Listing movies");
    let (movies, metadata) = state.movies.get_all(&query, &filters).await?;

    Ok(Json(json!({ "movies": movies, "metadata": metadata })))
}

pub async fn create_movie<S: MovieStore + 'static>(
    State(state): State<AppState<S>>,
    body: std::result::Result<Json<NewMovie>, JsonRejection>,
) -> Result<Response> {
    let input = read_body(body)?;

    let mut v = Validator::new();
    input.validate(&mut v);
    v.into_result()?;

    let movie = state.movies.insert(input).await?;
    info!(id = movie.id, title = %movie.title, "Movie created");

    let location = format!("/v1/movies/{}", movie.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(json!({ "movie": movie })),
    )
        .into_response())
}

pub async fn show_movie<S: MovieStore + 'static>(
    State(state): State<AppState<S>>,
    Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let id = read_id(&raw_id)?;
    let movie = state.movies.get(id).await?;
    Ok(Json(json!({ "movie": movie })))
}

/// Partial update guarded by the stored version. With `X-Expected-Version`
/// the client's own view is checked too, so a change made between the
/// client's read and this request is reported instead of overwritten.
pub async fn update_movie<S: MovieStore + 'static>(
    State(state): State<AppState<S>>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    body: std::result::Result<Json<MoviePatch>, JsonRejection>,
) -> Result<Json<serde_json::Value>> {
    let id = read_id(&raw_id)?;
    let patch = read_body(body)?;
    let expected_version = read_expected_version(&headers)?;

    let mut movie = state.movies.get(id).await?;
    if let Some(expected_version) = expected_version {
        if expected_version != movie.version {
            return Err(AppError::EditConflict {
                id,
                expected_version,
            });
        }
    }

    patch.apply(&mut movie);

    let mut v = Validator::new();
    movie.validate(&mut v);
    v.into_result()?;

    state.movies.update(&mut movie).await?;
    info!(id, version = movie.version, "Movie updated");

    Ok(Json(json!({ "movie": movie })))
}

pub async fn delete_movie<S: MovieStore + 'static>(
    State(state): State<AppState<S>>,
    Path(raw_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let id = read_id(&raw_id)?;
    state.movies.delete(id).await?;
    info!(id, "Movie deleted");
    Ok(Json(json!({ "message": "movie deleted" })))
}

pub async fn metrics() -> Result<Response> {
    let body = crate::metrics::gather_metrics().map_err(AppError::InternalError)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_read_id() {
        assert_eq!(read_id("12").unwrap(), 12);
        assert!(matches!(read_id("0"), Err(AppError::NotFound)));
        assert!(matches!(read_id("-4"), Err(AppError::NotFound)));
        assert!(matches!(read_id("abc"), Err(AppError::NotFound)));
    }

    #[test]
    fn test_read_int_flags_non_integers() {
        let mut v = Validator::new();
        let q = qs(&[("page", "two"), ("page_size", "5")]);

        assert_eq!(read_int(&q, "page", 1, &mut v), 1);
        assert_eq!(read_int(&q, "page_size", 20, &mut v), 5);
        assert_eq!(read_int(&q, "missing", 7, &mut v), 7);
        assert_eq!(v.errors().get("page"), Some("must be an integer value"));
        assert!(!v.errors().contains("page_size"));
    }

    #[test]
    fn test_read_expected_version() {
        let mut headers = HeaderMap::new();
        assert_eq!(read_expected_version(&headers).unwrap(), None);

        headers.insert(EXPECTED_VERSION_HEADER, " 3 ".parse().unwrap());
        assert_eq!(read_expected_version(&headers).unwrap(), Some(3));

        headers.insert(EXPECTED_VERSION_HEADER, "three".parse().unwrap());
        assert!(matches!(
            read_expected_version(&headers),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_read_csv_and_string() {
        let q = qs(&[("genres", "drama,crime"), ("title", "")]);
        assert_eq!(read_csv(&q, "genres"), vec!["drama", "crime"]);
        assert!(read_csv(&q, "other").is_empty());
        assert_eq!(read_string(&q, "title", "fallback"), "fallback");
    }
}
