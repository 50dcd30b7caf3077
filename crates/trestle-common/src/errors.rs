#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("channel name '{0}' contains the reserved 'trestle' prefix")]
    ReservedName(String),

    #[error("channel name '{0}' is not a valid channel identifier")]
    InvalidName(String),

    #[error("channel '{0}' is already registered")]
    Duplicate(String),

    #[error("cannot add channel '{0}' after the bridge has attached to a content view")]
    Attached(String),

    #[error("channel '{0}' is not registered")]
    Unknown(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CallError {
    #[error("call to '{channel}' timed out")]
    TimedOut { channel: String },

    #[error("call to '{channel}' failed: {reason}")]
    Failed { channel: String, reason: String },

    #[error("no channel named '{0}' is subscribed")]
    UnknownChannel(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("payload cannot cross the channel boundary: {0}")]
    Unserializable(String),

    #[error("message channel is closed")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("script evaluation failed: {0}")]
    Failed(String),

    #[error("no content view is attached")]
    NotAttached,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed resolution script: {0}")]
    MalformedScript(String),

    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    #[error("the bridge is already attached to a content view")]
    AlreadyAttached,
}

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("bridge namespace is already installed in this environment")]
    AlreadyInstalled,
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("an external navigation observer is already chained")]
    AlreadyChained,
}

#[derive(Debug, thiserror::Error)]
pub enum TrestleError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Call(#[from] CallError),

    #[error(transparent)]
    Post(#[from] PostError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Attach(#[from] AttachError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}
