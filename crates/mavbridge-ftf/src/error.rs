/// Errors from frame transforms.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum FtfError {
    /// The orientation quaternion is too close to zero to normalize.
    #[error("orientation quaternion cannot be normalized (norm {norm})")]
    DegenerateOrientation { norm: f64 },
}

pub type Result<T> = std::result::Result<T, FtfError>;
