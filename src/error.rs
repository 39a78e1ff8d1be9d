//! Error types for perforation gauge measurement.

use thiserror::Error;

use crate::edge::Edge;

/// Result type alias for perforation gauge operations
pub type Result<T> = std::result::Result<T, GaugeError>;

/// Failures raised by the measurement pipeline.
///
/// Only [`GaugeError::NoStampDetected`] aborts a run. The boundary, tic and
/// spacing variants are confined to the edge that produced them and end up in
/// that edge's report while the other edges carry on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GaugeError {
    /// Segmentation found no stamp silhouette in the image
    #[error("No stamp silhouette detected")]
    NoStampDetected,

    /// The edge strip produced too few boundary samples to trace
    #[error("{edge} edge: {samples} boundary samples (minimum {minimum})")]
    InsufficientBoundarySamples {
        edge: Edge,
        samples: usize,
        minimum: usize,
    },

    /// Too few clustered tics survived to measure a spacing
    #[error("{edge} edge: {found} tics (minimum {minimum})")]
    InsufficientTics {
        edge: Edge,
        found: usize,
        minimum: usize,
    },

    /// Median tic spacing is zero or close enough to zero to be meaningless
    #[error("{edge} edge: degenerate median spacing of {median_px:.3}px")]
    DegenerateSpacing { edge: Edge, median_px: f32 },

    /// Invalid input or configuration value
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// Image or configuration file could not be read
    #[error("Failed to load input: {message}")]
    ImageLoad { message: String },
}

impl GaugeError {
    /// Create an invalid parameter error
    pub fn invalid(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create a load error from any displayable source
    pub fn load(message: impl Into<String>) -> Self {
        Self::ImageLoad {
            message: message.into(),
        }
    }

    /// Whether the failure only affects a single edge of the stamp
    pub fn is_edge_local(&self) -> bool {
        matches!(
            self,
            GaugeError::InsufficientBoundarySamples { .. }
                | GaugeError::InsufficientTics { .. }
                | GaugeError::DegenerateSpacing { .. }
        )
    }

    /// The edge a local failure belongs to, if any
    pub fn edge(&self) -> Option<Edge> {
        match self {
            GaugeError::InsufficientBoundarySamples { edge, .. }
            | GaugeError::InsufficientTics { edge, .. }
            | GaugeError::DegenerateSpacing { edge, .. } => Some(*edge),
            _ => None,
        }
    }

    /// Short message for display next to an unset axis
    pub fn user_message(&self) -> String {
        match self {
            GaugeError::NoStampDetected => {
                "No stamp found in the image. Check the scan background and cropping.".to_string()
            }
            GaugeError::InsufficientBoundarySamples { edge, .. } => {
                format!("The {edge} edge could not be traced.")
            }
            GaugeError::InsufficientTics { edge, found, .. } => {
                format!("Only {found} perforations found on the {edge} edge.")
            }
            GaugeError::DegenerateSpacing { edge, .. } => {
                format!("Perforation spacing on the {edge} edge could not be measured.")
            }
            GaugeError::InvalidParameter { parameter, .. } => {
                format!("Invalid setting for {parameter}.")
            }
            GaugeError::ImageLoad { .. } => {
                "Could not load the image. Please check the file format and try again.".to_string()
            }
        }
    }
}
