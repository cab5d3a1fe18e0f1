/// Configures transport-level policy.
///
/// The client imposes no timeout of its own; set `timeout_ms` to bound each
/// request, including the time spent streaming its body.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}
