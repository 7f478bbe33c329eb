use strum::EnumIs;
use thiserror::Error;

#[derive(Debug, Error, EnumIs)]
pub enum PassError {
    #[error(
        "The reqd_work_group_size property of kernel '{kernel}' has {found} dimension(s), exactly 3 are required: '{annotation}'"
    )]
    MalformedAnnotation {
        kernel: String,
        annotation: String,
        found: usize,
    },

    #[error("Function '{caller}' calls '{symbol}', a builtin the backend does not support")]
    UnsupportedConstruct { symbol: String, caller: String },

    #[error("Symbol '{symbol}' has no counterpart: {context}")]
    MissingCounterpart { symbol: String, context: String },

    #[error("Symbol '{symbol}' carries prefix '{prefix}' but its length field cannot hold it")]
    MalformedMangling { symbol: String, prefix: String },

    #[error(
        "Renaming '{from}' to '{to}' collides with an existing symbol of a different prototype"
    )]
    SymbolCollision { from: String, to: String },

    #[error(
        "Kernel name '{name}' is {len} characters long, the backend accepts at most {max} including the compute unit suffix"
    )]
    KernelNameTooLong { name: String, len: usize, max: usize },

    #[error("Property wrapper '{function}' is reached again while it is being unwrapped")]
    WrapperCycle { function: String },

    #[error("Cannot inline call in '{caller}': {reason}")]
    NotInlinable { caller: String, reason: String },

    #[error("Invalid IR: {0}")]
    Ir(#[from] vxxinstr::utils::Error),

    #[error("Failed to parse pipeline configuration: {source}")]
    ConfigParse {
        #[from]
        source: toml::de::Error,
    },
}

pub type PassResult<T> = Result<T, PassError>;
