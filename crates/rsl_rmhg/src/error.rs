//! Error types that can be emitted from this library

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent wrapper for [`serde_json::Error`]
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// the leading four bytes are not a container tag
    #[error("invalid container magic {0:02X?}")]
    #[diagnostic(help("expected \"RMHG\" (or \"GHMR\" for big endian legacy files)"))]
    InvalidMagic([u8; 4]),

    /// a read ran past the end of the buffer
    #[error("unexpected end of buffer at offset {offset}: needed {needed} bytes, {available} available")]
    UnexpectedEof {
        /// Absolute offset of the failed read
        offset: u64,
        /// Number of bytes requested
        needed: usize,
        /// Number of bytes left in the buffer
        available: usize,
    },

    /// an entry's payload range does not fit in the buffer
    #[error("payload at offset {offset} with size {size} exceeds buffer of {len} bytes")]
    PayloadOutOfBounds {
        /// Absolute offset of the payload
        offset: u64,
        /// Declared payload size
        size: u32,
        /// Total buffer length
        len: usize,
    },

    /// containers are nested deeper than the supported limit
    #[error("containers are nested more than {0} levels deep")]
    NestingTooDeep(usize),

    /// unable to find a payload file while repacking
    #[error("cannot find payload file {}", .0.display())]
    PayloadNotFound(PathBuf),

    /// unable to find the intermediate document while repacking
    #[error("could not find {}, please unpack the file again", .0.display())]
    DocumentNotFound(PathBuf),

    /// {0}
    #[error("{0}")]
    CustomError(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
