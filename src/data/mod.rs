pub mod filters;
pub mod movie;
pub mod movies;
pub mod validator;

pub use filters::{Filters, PageMetadata, QueryPlan, SortDirection};
pub use movie::{Movie, MoviePatch, NewMovie};
pub use movies::MovieModel;
pub use validator::{FieldErrors, Validator};
