use std::cmp::Ordering;

use itertools::Itertools;
use log::debug;

use crate::error::ConvertError;

/// Preferred widths used to break score ties, most common Amiga display
/// widths first.
const WIDTH_TIEBREAK_PRIMARY: usize = 320;
const WIDTH_TIEBREAK_SECONDARY: usize = 256;

/// Bounds of the geometry search space.
#[derive(Debug, Clone, Copy)]
pub struct SearchBounds {
    pub min_planes: usize,
    pub max_planes: usize,
    pub min_width: usize,
    pub max_width: usize,
    pub min_height: usize,
    pub max_height: usize,
    pub width_increment: usize,
}

impl Default for SearchBounds {
    fn default() -> SearchBounds {
        SearchBounds {
            min_planes: 3,
            max_planes: 6,
            min_width: 64,
            max_width: 640,
            min_height: 1,
            max_height: 1024,
            width_increment: 16,
        }
    }
}

/// One hypothesized geometry for the planar data. Height is always derived
/// from the data length, never set independently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub width: usize,
    pub height: usize,
    pub planes: usize,
    /// Stripe score; lower is more plausible. `f64::MAX` until scored.
    pub score: f64,
}

/// Enumerate every (planes, width, height) triple within `bounds` whose byte
/// footprint exactly equals `planar_len`. Plane counts the palette cannot
/// represent are skipped. Candidates are emitted unscored.
pub fn enumerate(planar_len: usize, palette_colors: usize, bounds: &SearchBounds) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    let min_planes = bounds.min_planes.max(1);
    let max_planes = bounds.max_planes.max(min_planes);

    for planes in min_planes..=max_planes {
        if (1usize << planes) > palette_colors {
            continue;
        }

        for width in (bounds.min_width..=bounds.max_width)
            .step_by(bounds.width_increment.max(1))
        {
            let bytes_per_row = width / 8 * planes;
            if bytes_per_row == 0 {
                continue;
            }

            if planar_len % bytes_per_row != 0 {
                continue;
            }

            let height = planar_len / bytes_per_row;
            if height < bounds.min_height || height > bounds.max_height {
                continue;
            }

            candidates.push(Candidate {
                width,
                height,
                planes,
                score: f64::MAX,
            });
        }
    }

    debug!(
        "{} candidates fit {} planar bytes",
        candidates.len(),
        planar_len
    );

    candidates
}

/// Order scored candidates best-first and truncate to `max_candidates`
/// (coerced to at least 1).
///
/// Ordering: score ascending, then width nearest 320, then width nearest
/// 256, then plane count descending. The sort is a pure function of the
/// candidate list, so ranking after a parallel scoring pass is still
/// deterministic.
pub fn rank(
    candidates: Vec<Candidate>,
    max_candidates: usize,
) -> Result<Vec<Candidate>, ConvertError> {
    if candidates.is_empty() {
        return Err(ConvertError::NoCandidate);
    }

    Ok(candidates
        .into_iter()
        .sorted_by(compare)
        .take(max_candidates.max(1))
        .collect())
}

fn compare(a: &Candidate, b: &Candidate) -> Ordering {
    a.score
        .partial_cmp(&b.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            a.width
                .abs_diff(WIDTH_TIEBREAK_PRIMARY)
                .cmp(&b.width.abs_diff(WIDTH_TIEBREAK_PRIMARY))
        })
        .then_with(|| {
            a.width
                .abs_diff(WIDTH_TIEBREAK_SECONDARY)
                .cmp(&b.width.abs_diff(WIDTH_TIEBREAK_SECONDARY))
        })
        .then_with(|| b.planes.cmp(&a.planes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn candidate(width: usize, planes: usize, score: f64) -> Candidate {
        Candidate {
            width,
            height: 100,
            planes,
            score,
        }
    }

    #[test]
    fn exact_fit_geometry_is_found() {
        // 19200 bytes: 320 wide, 3 planes -> 120 bytes per row -> 160 rows
        let candidates = enumerate(19200, 64, &SearchBounds::default());

        assert!(candidates
            .iter()
            .any(|c| c.width == 320 && c.height == 160 && c.planes == 3));

        // every emitted candidate must exactly consume the planar data
        for c in &candidates {
            assert_eq!(c.width / 8 * c.height * c.planes, 19200);
        }
    }

    #[test]
    fn tiny_prime_length_yields_nothing() {
        assert!(enumerate(7, 64, &SearchBounds::default()).is_empty());
    }

    #[test]
    fn palette_limits_plane_count() {
        // 16-color palette cannot represent 5 or 6 planes
        let candidates = enumerate(19200, 16, &SearchBounds::default());
        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|c| c.planes <= 4));
    }

    #[test]
    fn height_bounds_are_enforced() {
        let bounds = SearchBounds {
            min_height: 200,
            max_height: 300,
            ..SearchBounds::default()
        };
        for c in enumerate(19200, 64, &bounds) {
            assert!(c.height >= 200 && c.height <= 300);
        }
    }

    #[test]
    fn enumeration_is_deterministic() {
        let first = enumerate(19200, 64, &SearchBounds::default());
        let second = enumerate(19200, 64, &SearchBounds::default());
        assert_eq!(first, second);
    }

    #[test]
    fn rank_orders_by_score_first() {
        let ranked = rank(
            vec![
                candidate(320, 3, 5.0),
                candidate(64, 3, 1.0),
                candidate(640, 3, 3.0),
            ],
            10,
        )
        .unwrap();

        let scores: Vec<f64> = ranked.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![1.0, 3.0, 5.0]);
    }

    #[rstest]
    // equal scores: width nearest 320 wins
    #[case(candidate(320, 3, 1.0), candidate(256, 3, 1.0))]
    // equal distance to 320: width nearest 256 wins
    #[case(candidate(256, 3, 1.0), candidate(384, 3, 1.0))]
    // identical widths: more planes wins
    #[case(candidate(320, 5, 1.0), candidate(320, 4, 1.0))]
    fn tie_breaks(#[case] expected_first: Candidate, #[case] expected_second: Candidate) {
        let ranked = rank(vec![expected_second, expected_first], 2).unwrap();
        assert_eq!(ranked[0], expected_first);
        assert_eq!(ranked[1], expected_second);
    }

    #[test]
    fn truncates_to_requested_count() {
        let candidates = vec![
            candidate(320, 3, 1.0),
            candidate(256, 3, 2.0),
            candidate(64, 3, 3.0),
        ];

        assert_eq!(rank(candidates.clone(), 2).unwrap().len(), 2);
        // a request below 1 is coerced to 1
        assert_eq!(rank(candidates, 0).unwrap().len(), 1);
    }

    #[test]
    fn empty_list_is_an_error() {
        assert!(matches!(rank(vec![], 5), Err(ConvertError::NoCandidate)));
    }
}
