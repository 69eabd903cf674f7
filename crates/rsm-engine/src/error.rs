use crate::core::Lifecycle;
use crate::render::FramePhase;
use crate::resources::Category;
use crate::shader::ShaderStage;

/// Engine-wide result alias.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Every failure the engine can report.
///
/// All variants are fatal during initialization. While frames are running only
/// `ResourceNotFound` is reachable, and it indicates a bad name in calling code.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("asset not found: {path}")]
    AssetNotFound { path: String },

    #[error("failed to decode asset {path}: {reason}")]
    Asset { path: String, reason: String },

    #[error("{stage} shader '{name}' failed to compile:\n{diagnostic}")]
    Compile {
        stage: ShaderStage,
        name: String,
        diagnostic: String,
    },

    #[error("program '{program}' failed to link: {diagnostic}")]
    Link { program: String, diagnostic: String },

    #[error("{category} '{name}' is not registered")]
    ResourceNotFound { category: Category, name: String },

    #[error("{pass}: expected {expected}, found {found}")]
    ConfigurationMismatch {
        pass: &'static str,
        expected: String,
        found: String,
    },

    #[error("cannot enter {requested} while the frame is in {current}")]
    PassOrder {
        requested: FramePhase,
        current: FramePhase,
    },

    #[error("`{operation}` is not allowed while the engine is {state}")]
    Lifecycle {
        operation: &'static str,
        state: Lifecycle,
    },

    #[error("{what} exceeds the compiled budget of {capacity}")]
    Budget { what: &'static str, capacity: usize },

    #[error("surface error: {0}")]
    Surface(String),
}

impl EngineError {
    pub(crate) fn mismatch(
        pass: &'static str,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::ConfigurationMismatch {
            pass,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn asset(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::Asset {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
