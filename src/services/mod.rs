/// Drives a single game view: initial load, polling and round actions.
pub mod game_driver;
/// Game state loading and round cursor derivation.
pub mod game_service;
/// Provisioning jobs for new lobbies and games.
pub mod jobs;
/// Lobby listing and membership actions.
pub mod lobby_service;
/// Cancellable background reload of a game view.
pub mod poller;
/// Entry submission and voting.
pub mod round_service;
/// Session resolution and credential lifecycle.
pub mod session_service;
