pub mod data;

pub use data::{FieldValue, Measurement, Point, PointBuilder, PointError, RawMessage};
