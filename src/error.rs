use thiserror::Error;

#[derive(Error, Debug)]
pub enum LumaError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    #[error("Frame format error: {0}")]
    FrameFormat(#[from] FrameFormatError),

    #[error("Frame source error: {details}")]
    Source { details: String },

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

/// Contract violations by a frame source: the luma plane is not usable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameFormatError {
    #[error("frame has no plane at index {index}")]
    MissingPlane { index: usize },

    #[error("plane {index} contains no samples")]
    EmptyPlane { index: usize },
}

impl LumaError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn frame_source<S: Into<String>>(details: S) -> Self {
        Self::Source {
            details: details.into(),
        }
    }

    /// True when the error is a frame layout violation rather than a pipeline failure
    pub fn is_frame_format(&self) -> bool {
        matches!(self, Self::FrameFormat(_))
    }
}

pub type Result<T> = std::result::Result<T, LumaError>;
