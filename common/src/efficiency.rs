// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.

/// Upper bound of the efficiency score.
pub const MAX_EFFICIENCY_SCORE: f64 = 500.0;

/// Computes the efficiency score (a percentage) from estimated and actual hours.
///
/// - No estimate (`estimated <= 0`) gives 0.
/// - Work not started yet (`actual == 0`) counts as on track: 100.
/// - Otherwise `estimated / actual * 100`, clamped to `0..=500`.
pub fn efficiency_score(estimated_hours: f64, actual_hours: f64) -> f64 {
    if estimated_hours <= 0.0 {
        return 0.0;
    }
    if actual_hours == 0.0 {
        return 100.0;
    }
    (estimated_hours / actual_hours * 100.0).clamp(0.0, MAX_EFFICIENCY_SCORE)
}
