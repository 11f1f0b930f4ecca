// Error types shared by the game core and the frame glue

use thiserror::Error;

/// Rejected board configuration
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Board size must be at least 1")]
    EmptyBoard,
    #[error("Board size {size} exceeds the maximum of {max}")]
    BoardTooLarge { size: usize, max: usize },
    #[error("Too many mines: {mines} requested but a {size}x{size} board fits at most {max}")]
    TooManyMines { size: usize, mines: usize, max: usize },
}

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid coordinates ({y}, {x}) for a board of size {size}")]
    InvalidCoords { y: usize, x: usize, size: usize },
}

/// Failure reported by the host when asked to add the frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddFrameError {
    #[error("{0}")]
    RejectedByUser(String),
    #[error("{0}")]
    InvalidDomainManifest(String),
    #[error("{0}")]
    Other(String),
}
