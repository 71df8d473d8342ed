use ndarray::{Array2, ArrayView2};

/// Pairwise IoU between two box sets in `[x1, y1, x2, y2]` pixel coordinates.
///
/// * `boxes` - N * 4.
/// * `query_boxes` - K * 4.
/// * `return` - N * K overlap matrix, row `n` holds the overlaps of `boxes[n]`
///   against every query box.
///
/// Widths and heights follow the inclusive pixel convention (`x2 - x1 + 1`),
/// so a zero-area box still covers one pixel and never divides by zero.
pub fn bbox_overlaps(boxes: ArrayView2<f32>, query_boxes: ArrayView2<f32>) -> Array2<f32> {
    assert_eq!(boxes.ncols(), 4, "boxes must have 4 columns");
    assert_eq!(query_boxes.ncols(), 4, "query boxes must have 4 columns");

    let n = boxes.nrows();
    let k = query_boxes.nrows();
    let mut overlaps = Array2::<f32>::zeros((n, k));

    for k_idx in 0..k {
        let box_area = (query_boxes[(k_idx, 2)] - query_boxes[(k_idx, 0)] + 1.0)
            * (query_boxes[(k_idx, 3)] - query_boxes[(k_idx, 1)] + 1.0);

        for n_idx in 0..n {
            let iw = boxes[(n_idx, 2)].min(query_boxes[(k_idx, 2)])
                - boxes[(n_idx, 0)].max(query_boxes[(k_idx, 0)])
                + 1.0;
            if iw <= 0.0 {
                continue;
            }

            let ih = boxes[(n_idx, 3)].min(query_boxes[(k_idx, 3)])
                - boxes[(n_idx, 1)].max(query_boxes[(k_idx, 1)])
                + 1.0;
            if ih <= 0.0 {
                continue;
            }

            let ua = ((boxes[(n_idx, 2)] - boxes[(n_idx, 0)] + 1.0)
                * (boxes[(n_idx, 3)] - boxes[(n_idx, 1)] + 1.0)
                + box_area
                - iw * ih)
                .max(1.0e-10);

            overlaps[(n_idx, k_idx)] = iw * ih / ua;
        }
    }
    overlaps
}
