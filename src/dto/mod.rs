/// Request bodies sent to krumnet.
pub mod payloads;
/// Validation helpers shared by payloads and the submission state.
pub mod validation;
