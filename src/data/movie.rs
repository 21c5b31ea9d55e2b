use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::data::validator::{unique, Validator};

/// Columns a list query may order by. Sort allow-list entries must name one
/// of these, optionally prefixed with '-'.
pub const SORTABLE_COLUMNS: &[&str] = &["id", "title", "year", "runtime"];

/// A catalog entry. `version` starts at 1 and grows by exactly one per
/// successful update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,

    #[serde(skip)]
    pub created_at: DateTime<Utc>,

    pub title: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub year: i32,

    /// Minutes
    #[serde(default, skip_serializing_if = "is_zero")]
    pub runtime: i32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,

    pub version: i32,
}

fn is_zero(value: &i32) -> bool {
    *value == 0
}

/// Fields supplied by a client when creating a movie.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewMovie {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub runtime: i32,
    pub genres: Option<Vec<String>>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoviePatch {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime: Option<i32>,
    pub genres: Option<Vec<String>>,
}

impl MoviePatch {
    pub fn apply(self, movie: &mut Movie) {
        if let Some(title) = self.title {
            movie.title = title;
        }
        if let Some(year) = self.year {
            movie.year = year;
        }
        if let Some(runtime) = self.runtime {
            movie.runtime = runtime;
        }
        if let Some(genres) = self.genres {
            movie.genres = genres;
        }
    }
}

pub fn validate_movie(v: &mut Validator, title: &str, year: i32, runtime: i32, genres: Option<&[String]>) {
    v.check(!title.is_empty(), "title", "must be provided");
    v.check(title.len() <= 500, "title", "must not be more than 500 bytes long");

    v.check(year != 0, "year", "must be provided");
    v.check(year >= 1888, "year", "must be greater than or equal to 1888");
    v.check(year <= Utc::now().year(), "year", "must not be in the future");

    v.check(runtime != 0, "runtime", "must be provided");
    v.check(runtime > 0, "runtime", "must be a positive integer");

    match genres {
        None => v.add_error("genres", "must be provided"),
        Some(genres) => {
            v.check(!genres.is_empty(), "genres", "must contain at least 1 genre");
            v.check(genres.len() <= 5, "genres", "must not contain more than 5 genres");
            v.check(unique(genres), "genres", "must not contain duplicate values");
        }
    }
}

impl NewMovie {
    pub fn validate(&self, v: &mut Validator) {
        validate_movie(v, &self.title, self.year, self.runtime, self.genres.as_deref());
    }
}

impl Movie {
    pub fn validate(&self, v: &mut Validator) {
        validate_movie(v, &self.title, self.year, self.runtime, Some(&self.genres));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> NewMovie {
        NewMovie {
            title: "Moana".to_string(),
            year: 2016,
            runtime: 107,
            genres: Some(vec!["animation".to_string(), "adventure".to_string()]),
        }
    }

    #[test]
    fn test_valid_movie() {
        let mut v = Validator::new();
        valid_input().validate(&mut v);
        assert!(v.valid());
    }

    #[test]
    fn test_every_bad_field_is_reported() {
        let input = NewMovie {
            title: String::new(),
            year: 1800,
            runtime: -5,
            genres: Some(vec!["drama".to_string(), "drama".to_string()]),
        };
        let mut v = Validator::new();
        input.validate(&mut v);

        let errors = v.errors();
        assert_eq!(errors.get("title"), Some("must be provided"));
        assert_eq!(errors.get("year"), Some("must be greater than or equal to 1888"));
        assert_eq!(errors.get("runtime"), Some("must be a positive integer"));
        assert_eq!(errors.get("genres"), Some("must not contain duplicate values"));
    }

    #[test]
    fn test_missing_genres() {
        let input = NewMovie {
            genres: None,
            ..valid_input()
        };
        let mut v = Validator::new();
        input.validate(&mut v);
        assert_eq!(v.errors().get("genres"), Some("must be provided"));
    }

    #[test]
    fn test_future_year_rejected() {
        let input = NewMovie {
            year: Utc::now().year() + 1,
            ..valid_input()
        };
        let mut v = Validator::new();
        input.validate(&mut v);
        assert_eq!(v.errors().get("year"), Some("must not be in the future"));
    }

    #[test]
    fn test_patch_only_touches_present_fields() {
        let mut movie = Movie {
            id: 1,
            created_at: Utc::now(),
            title: "Black Panther".to_string(),
            year: 2018,
            runtime: 134,
            genres: vec!["action".to_string()],
            version: 1,
        };
        MoviePatch {
            year: Some(2019),
            ..MoviePatch::default()
        }
        .apply(&mut movie);

        assert_eq!(movie.year, 2019);
        assert_eq!(movie.title, "Black Panther");
        assert_eq!(movie.runtime, 134);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<MoviePatch, _> = serde_json::from_str(r#"{"rating": 5}"#);
        assert!(result.is_err());
    }
}
