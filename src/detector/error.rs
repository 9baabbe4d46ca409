use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ImageDimensionError {
    #[error("Image is empty ({width}x{height})")]
    Empty {
        width: usize,
        height: usize,
    },
    #[error("Image size mismatch (actual: {actual:?}, expected: {expected:?})")]
    Mismatch {
        actual: (usize, usize),
        expected: (usize, usize),
    },
}

/// Error generated when detecting AprilTags in a frame
#[derive(Clone, Debug, PartialEq, Error)]
#[non_exhaustive]
pub enum DetectError {
    #[error("Input image was the wrong size")]
    BadSourceImageDimensions(#[from] #[source] ImageDimensionError),
    #[error("Detector backend error: {0}")]
    Backend(String),
}

/// Error generated when building a detector
#[derive(Clone, Debug, PartialEq, Error)]
#[non_exhaustive]
pub enum DetectorBuildError {
    #[error("Unknown tag family: {0}")]
    UnknownFamily(String),
    #[error("Tag family {0} is not supported by this detector")]
    UnsupportedFamily(&'static str),
    #[error("Detector backend error: {0}")]
    Backend(String),
}

#[cfg(feature="opencv")]
impl From<opencv::Error> for DetectError {
    fn from(value: opencv::Error) -> Self {
        Self::Backend(value.to_string())
    }
}

#[cfg(feature="opencv")]
impl From<opencv::Error> for DetectorBuildError {
    fn from(value: opencv::Error) -> Self {
        Self::Backend(value.to_string())
    }
}
