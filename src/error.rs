use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort the conversion of a single input file. In a directory
/// batch each file is converted independently; one file's error is reported
/// and the remaining files are still attempted.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("header skip of {skip} bytes exceeds file size of {len} bytes")]
    HeaderSkipTooLarge { skip: usize, len: usize },

    #[error("input not found: {0}")]
    InputNotFound(PathBuf),

    #[error("file too small to contain a {0}-byte palette footer")]
    PaletteTooSmall(usize),

    #[error("no geometry candidate consumed the planar data")]
    NoCandidate,

    #[error("planar data of {actual} bytes does not match geometry {width}x{height} with {planes} planes ({expected} bytes)")]
    GeometryMismatch {
        width: usize,
        height: usize,
        planes: usize,
        expected: usize,
        actual: usize,
    },
}
