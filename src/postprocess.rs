/// Top-1 class of a probability vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub index: usize,
    pub confidence: f32,
}

/// Index and value of the largest probability. NaN entries never win and
/// ties keep the lowest index. Returns `None` for an empty vector.
pub fn top1(probabilities: &[f32]) -> Option<Prediction> {
    probabilities
        .iter()
        .enumerate()
        .fold(None, |best: Option<Prediction>, (index, &confidence)| match best {
            Some(b) if confidence.is_nan() || confidence <= b.confidence => Some(b),
            None if confidence.is_nan() => None,
            _ => Some(Prediction { index, confidence }),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_the_maximum() {
        let p = top1(&[0.1, 0.7, 0.2]).unwrap();
        assert_eq!(p.index, 1);
        assert_eq!(p.confidence, 0.7);
    }

    #[test]
    fn ties_keep_first() {
        assert_eq!(top1(&[0.5, 0.5]).unwrap().index, 0);
    }

    #[test]
    fn skips_nan() {
        let p = top1(&[f32::NAN, 0.3, f32::NAN, 0.6]).unwrap();
        assert_eq!(p, Prediction { index: 3, confidence: 0.6 });
    }

    #[test]
    fn empty_or_all_nan() {
        assert_eq!(top1(&[]), None);
        assert_eq!(top1(&[f32::NAN]), None);
    }
}
