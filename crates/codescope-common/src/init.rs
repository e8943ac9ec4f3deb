//! Global initialization utilities for the application

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize the application environment
///
/// Loads environment variables from a `.env` file if one exists.
/// Safe to call multiple times - will only run once.
pub fn initialize_environment() {
    INIT.call_once(|| {
        // Searches the current directory and its ancestors
        dotenvy::dotenv().ok();
    });
}
