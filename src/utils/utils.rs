use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

/// Index and value of the first maximum in `values`.
///
/// Later entries only win when strictly greater, so ties resolve to the lowest
/// index. NaN never wins. Returns `None` for an empty slice.
pub fn argmax(values: ArrayView1<f32>) -> Option<(usize, f32)> {
    let mut iter = values.iter().copied().enumerate();
    let (mut max_index, mut max_value) = iter.next()?;

    for (index, value) in iter {
        if value > max_value || (max_value.is_nan() && !value.is_nan()) {
            max_index = index;
            max_value = value;
        }
    }
    Some((max_index, max_value))
}

/// Row-wise [`argmax`] over an R * C matrix with C > 0.
pub fn argmax_rows(values: ArrayView2<f32>) -> (Array1<usize>, Array1<f32>) {
    assert!(values.ncols() > 0, "argmax over a matrix with zero columns");

    let (indices, maxima): (Vec<_>, Vec<_>) = values
        .axis_iter(Axis(0))
        .map(|row| argmax(row).unwrap_or((0, 0.0)))
        .unzip();
    (Array1::from(indices), Array1::from(maxima))
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array1, Array2};

    use crate::utils::utils::{argmax, argmax_rows};

    #[test]
    fn test_argmax_first_max() {
        let values = array![0.2f32, 0.7, 0.7, 0.1];
        assert_eq!(argmax(values.view()), Some((1, 0.7)));
    }

    #[test]
    fn test_argmax_empty() {
        let values = Array1::<f32>::zeros(0);
        assert_eq!(argmax(values.view()), None);
    }

    #[test]
    fn test_argmax_skips_nan() {
        let values = array![f32::NAN, 0.3, 0.1];
        assert_eq!(argmax(values.view()), Some((1, 0.3)));
    }

    #[test]
    fn test_argmax_rows() {
        let values = array![[0.0f32, 0.0, 0.0], [0.1, 0.9, 0.3], [0.5, 0.2, 0.5]];
        let (indices, maxima) = argmax_rows(values.view());
        assert_eq!(indices, array![0usize, 1, 0]);
        assert_eq!(maxima, array![0.0f32, 0.9, 0.5]);
    }

    #[test]
    fn test_argmax_rows_no_rows() {
        let values = Array2::<f32>::zeros((0, 3));
        let (indices, maxima) = argmax_rows(values.view());
        assert!(indices.is_empty());
        assert!(maxima.is_empty());
    }
}
