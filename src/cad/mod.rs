//! CAD evidence source: FreeCAD over JSON-RPC, or a canned demo model.
//! Also writes results back to FreeCAD as TechDraw pages.

pub mod freecad;
pub mod mock;
pub mod techdraw;

pub use freecad::FreecadClient;

use thiserror::Error;

use crate::pipeline::CollaboratorError;

#[derive(Error, Debug)]
pub enum CadError {
    #[error("Cannot connect to FreeCAD RPC at {0}")]
    Connection(String),

    #[error("FreeCAD RPC request failed: {0}")]
    HttpClient(String),

    #[error("FreeCAD execution error: {0}")]
    Execution(String),

    #[error("Failed to parse FreeCAD result: {0}")]
    InvalidResult(String),
}

impl From<CadError> for CollaboratorError {
    fn from(e: CadError) -> Self {
        match e {
            CadError::Connection(_) | CadError::HttpClient(_) => {
                CollaboratorError::Unavailable(e.to_string())
            }
            CadError::Execution(_) | CadError::InvalidResult(_) => {
                CollaboratorError::Backend(e.to_string())
            }
        }
    }
}
