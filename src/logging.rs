// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_DIRECTIVE: &str = "zvec_client=info";

/// Installs a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive`. Returns `false` when a global subscriber was already set.
pub fn init_tracing(default_directive: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_install_is_a_no_op() {
        let _ = init_tracing(DEFAULT_DIRECTIVE);
        assert!(!init_tracing(DEFAULT_DIRECTIVE));
    }
}
