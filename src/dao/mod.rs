/// Krumnet API transport.
pub mod krumnet;
/// Wire models returned by krumnet.
pub mod models;
/// Durable storage for the session token.
pub mod storage;
