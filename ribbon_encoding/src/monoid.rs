// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Interface for a monoid. The default value must be the identity of
/// the monoid.
///
/// The reduction stages rely on associativity only: the log-step scan combines
/// elements in a different grouping than a serial fold does.
pub trait Monoid: Default + Copy {
    /// The source value for constructing the monoid.
    type SourceValue;

    /// Creates a monoid from a given value.
    fn new(value: Self::SourceValue) -> Self;

    /// Combines two monoids. This operation must be associative.
    #[must_use]
    fn combine(&self, other: &Self) -> Self;

    /// Serial inclusive scan, the reference the parallel scan must agree with.
    fn inclusive_scan(values: &[Self]) -> Vec<Self> {
        let mut acc = Self::default();
        values
            .iter()
            .map(|v| {
                acc = acc.combine(v);
                acc
            })
            .collect()
    }
}
