use rand::Rng;

use crate::{
    error::{InferenceError, Result},
    vocabulary::SymbolId,
};

/// Converts logits into log-probabilities.
///
/// The computation runs in `f64`: the largest logit and then the log of the
/// normalizer are subtracted, so every finite logit maps to a finite
/// log-probability however far it lies below the maximum. `-inf` logits map to
/// `-inf`; NaN, `+inf` or an all-`-inf` vector cannot be normalized and are
/// reported as errors.
pub fn log_softmax(logits: &[f32]) -> Result<Vec<f64>> {
    if logits.is_empty() {
        return Err(InferenceError::InternalComputation(
            "cannot sample from an empty logits vector".to_string(),
        ));
    }
    if let Some(position) = logits
        .iter()
        .position(|l| l.is_nan() || *l == f32::INFINITY)
    {
        return Err(InferenceError::InternalComputation(format!(
            "non-finite logit {} for symbol {position}",
            logits[position]
        )));
    }
    let max = logits
        .iter()
        .copied()
        .filter(|l| l.is_finite())
        .fold(f32::NEG_INFINITY, f32::max);
    if max == f32::NEG_INFINITY {
        return Err(InferenceError::InternalComputation(
            "every logit is -inf".to_string(),
        ));
    }

    let max = f64::from(max);
    // The maximum contributes exp(0) = 1, so the sum is at least 1.
    let log_sum = logits
        .iter()
        .map(|l| (f64::from(*l) - max).exp())
        .sum::<f64>()
        .ln();
    Ok(logits
        .iter()
        .map(|l| f64::from(*l) - max - log_sum)
        .collect())
}

/// Converts logits into a probability distribution.
///
/// Same normalization as [`log_softmax`]. A logit more than about 745 below
/// the maximum underflows to probability `0.0` in `f64`; [`sample`] works on
/// log-probabilities and is not affected.
pub fn softmax(logits: &[f32]) -> Result<Vec<f64>> {
    Ok(log_softmax(logits)?.into_iter().map(f64::exp).collect())
}

/// Draws one symbol from the categorical distribution defined by `logits`.
///
/// No temperature or truncation is applied: the draw follows the raw softmax
/// of the model output. Sampling uses the Gumbel-max trick on the
/// log-probabilities, so only `-inf` logits are never drawn.
pub fn sample<R: Rng + ?Sized>(logits: &[f32], rng: &mut R) -> Result<SymbolId> {
    let log_probabilities = log_softmax(logits)?;
    let mut best: Option<(usize, f64)> = None;
    for (symbol, log_probability) in log_probabilities.into_iter().enumerate() {
        if log_probability == f64::NEG_INFINITY {
            continue;
        }
        // u in (0, 1) keeps the Gumbel noise finite.
        let u = rng.gen::<f64>().max(f64::MIN_POSITIVE);
        let score = log_probability - (-u.ln()).ln();
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((symbol, score));
        }
    }
    best.map(|(symbol, _)| symbol as SymbolId).ok_or_else(|| {
        InferenceError::InternalComputation("no symbol can be drawn".to_string())
    })
}

#[cfg(test)]
mod tests {
    use rand::{
        rngs::{mock::StepRng, StdRng},
        SeedableRng,
    };

    use super::*;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn test_softmax_sums_to_one() {
        let cases: Vec<Vec<f32>> = vec![
            vec![0.0],
            vec![1.0, 2.0, 3.0],
            vec![-5.0, 0.5, 12.0, 7.25],
            vec![1000.0, 999.0, 998.0],
            vec![-1000.0, -1001.0],
        ];
        for logits in cases {
            let probabilities = softmax(&logits).unwrap();
            let total: f64 = probabilities.iter().sum();
            assert!((total - 1.0).abs() < TOLERANCE, "sum {total} for {logits:?}");
            assert!(probabilities.iter().all(|p| *p > 0.0));
        }
    }

    #[test]
    fn test_softmax_matches_closed_form() {
        let probabilities = softmax(&[0.0, (2.0f32).ln()]).unwrap();
        assert!((probabilities[0] - 1.0 / 3.0).abs() < 1e-6);
        assert!((probabilities[1] - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_softmax_large_logits_do_not_overflow() {
        let probabilities = softmax(&[f32::MAX, f32::MAX]).unwrap();
        assert!((probabilities[0] - 0.5).abs() < TOLERANCE);
        assert!((probabilities[1] - 0.5).abs() < TOLERANCE);
    }

    #[test]
    fn test_softmax_negative_infinity_gets_zero_probability() {
        let probabilities = softmax(&[f32::NEG_INFINITY, 0.0, f32::NEG_INFINITY]).unwrap();
        assert_eq!(probabilities, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_softmax_rejects_unnormalizable_logits() {
        let cases: Vec<Vec<f32>> = vec![
            vec![],
            vec![0.0, f32::NAN],
            vec![f32::INFINITY, 0.0],
            vec![f32::NEG_INFINITY, f32::NEG_INFINITY],
        ];
        for logits in cases {
            let result = softmax(&logits);
            assert!(
                matches!(result, Err(InferenceError::InternalComputation(_))),
                "expected error for {logits:?}"
            );
        }
    }

    #[test]
    fn test_log_softmax_keeps_distant_logits_finite() {
        let log_probabilities = log_softmax(&[0.0, -800.0, f32::NEG_INFINITY]).unwrap();
        assert!(log_probabilities[0].abs() < TOLERANCE);
        assert!((log_probabilities[1] + 800.0).abs() < TOLERANCE);
        assert_eq!(log_probabilities[2], f64::NEG_INFINITY);
    }

    #[test]
    fn test_sample_reaches_symbols_far_below_the_maximum() {
        // First draw is the smallest uniform, second the largest: the noise
        // favours symbol 1 strongly enough to beat a logit gap of 30.
        let mut rng = StepRng::new(0, u64::MAX);
        assert_eq!(sample(&[0.0, -30.0], &mut rng).unwrap(), 1);
    }

    #[test]
    fn test_sample_never_picks_impossible_symbol() {
        let mut rng = StdRng::seed_from_u64(7);
        let logits = [f32::NEG_INFINITY, 0.0, f32::NEG_INFINITY, 0.0];
        for _ in 0..200 {
            let symbol = sample(&logits, &mut rng).unwrap();
            assert!(symbol == 1 || symbol == 3);
        }
    }

    #[test]
    fn test_sample_follows_distribution() {
        let mut rng = StdRng::seed_from_u64(42);
        // p = [0.1, 0.2, 0.7]
        let logits = [(0.1f32).ln(), (0.2f32).ln(), (0.7f32).ln()];
        let draws = 20_000;
        let mut counts = [0usize; 3];
        for _ in 0..draws {
            counts[sample(&logits, &mut rng).unwrap() as usize] += 1;
        }
        let frequencies = counts.map(|c| c as f64 / draws as f64);
        assert!((frequencies[0] - 0.1).abs() < 0.02, "{frequencies:?}");
        assert!((frequencies[1] - 0.2).abs() < 0.02, "{frequencies:?}");
        assert!((frequencies[2] - 0.7).abs() < 0.02, "{frequencies:?}");
    }

    #[test]
    fn test_sample_is_reproducible_for_a_seed() {
        let logits = [0.3, -1.2, 2.0, 0.0, 0.7];
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..50)
                .map(|_| sample(&logits, &mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(11), draw(11));
    }
}
