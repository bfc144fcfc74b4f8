use thiserror::Error;

/// Structured fault taxonomy for the kernel's core.
///
/// Timeouts are not represented here: they are normal completions on
/// timed composites, signalled through `timed_out`, never an error.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("coroutine '{name}' faulted: {message}")]
    CoroutineFault { name: String, message: String },

    #[error("subroutine '{name}' faulted: {message}")]
    SubroutineFault { name: String, message: String },

    #[error("completion listener panicked: {0}")]
    ListenerPanic(String),
}
