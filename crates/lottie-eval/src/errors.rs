use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Matrix is not invertible (determinant {0})")]
    SingularMatrix(f32),
    #[error("Path keyframes {index} and {next} have {count} and {next_count} vertices")]
    VertexCountMismatch {
        index: usize,
        next: usize,
        count: usize,
        next_count: usize,
    },
    #[error("Vector property arity must be 2, 3 or 4, got {0}")]
    InvalidArity(usize),
    #[error("Layer {0} is part of a parent cycle")]
    ParentCycle(u32),
    #[error("Layer {layer} references unknown parent {parent}")]
    UnknownParent { layer: u32, parent: u32 },
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EvalError>;
