/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The client configuration is incomplete, e.g. an empty API key.
    Config,
    /// The response body doesn't have the expected shape.
    Protocol,
    /// The server rejected a streaming request before sending any event.
    Streaming,
    /// The caller-supplied parser rejected the model output.
    StructuredOutput,
    /// The request timed out.
    Timeout,
    /// Any other transport failure, such as a refused connection.
    Transport,
    /// A blocking call was made from inside an async runtime, or the
    /// runtime for it couldn't be created.
    Runtime,
}
