pub mod controller;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod sync;
pub mod transport;

#[cfg(test)]
mod tests;

/// Token in an engine command line replaced by a fresh random seed at spawn.
pub const RANDOM_SEED_PLACEHOLDER: &str = "%SRAND";

/// Comment line recognized by engines that support comment-based interrupts.
/// Never numbered, never answered.
pub const INTERRUPT_COMMENT_LINE: &str = "# interrupt";

/// Protocol version assumed for engines predating the `protocol_version`
/// command.
pub const DEFAULT_PROTOCOL_VERSION: u32 = 2;
