pub mod cad;
pub mod classification;
pub mod datum;
pub mod enums;
pub mod feature;
pub mod worker;

pub use cad::*;
pub use classification::*;
pub use datum::*;
pub use enums::*;
pub use feature::*;
pub use worker::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },
}
