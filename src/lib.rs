//! Sample random origin/destination pairs inside a hand-drawn region and
//! record transit and driving directions between them.
//!
//! Coordinates follow one convention everywhere: `x` is the latitude and `y`
//! the longitude.

mod error;
pub use error::Error;
pub use error::RecordValidationError;
pub use error::Result;

mod polygon;
pub use polygon::BoundingBox;
pub use polygon::Polygon;

mod load_boundary;
pub use load_boundary::load_boundary;
pub use load_boundary::load_boundary_file;

mod generate_point;
pub use generate_point::random_point_in_bounds;
pub use generate_point::random_point_in_polygon;
pub use generate_point::try_random_point_in_polygon;

mod record;
pub use record::Field;
pub use record::RawRecord;
pub use record::Record;
pub use record::Row;
pub use record::epoch_seconds;

mod database;
pub use database::Database;

mod config;
pub use config::CollectorConfig;

mod collector;
pub use collector::CollectionReport;
pub use collector::Collector;
pub use collector::DirectionsProvider;

mod summary;
pub use summary::DirectionsSummary;
pub use summary::RowSummary;
pub use summary::summarize_directions;
pub use summary::summarize_row;
