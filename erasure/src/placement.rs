// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

/// Placement mode of erasure coded pools: every chunk position is chosen independently.
pub const INDEP: &str = "indep";

/// The cluster placement service a scheme registers its ruleset with.
pub trait Placement {
    /// Adds a rule spreading `max_size` chunks below `root` across distinct
    /// `failure_domain` buckets.
    ///
    /// Returns the ruleset id, or a negative status.
    fn add_simple_rule(
        &mut self,
        name: &str,
        root: &str,
        failure_domain: &str,
        mode: &str,
        max_size: usize,
    ) -> Result<i32, i32>;
}
