use ndarray::{Array2, ArrayView2, Axis};

/// Largest `dw`/`dh` fed to `exp` when decoding, `ln(1000 / 16)`.
pub const BBOX_XFORM_CLIP: f32 = 4.135_166_6;

/// Regression deltas that move each `ex_rois` box onto its `gt_rois` box.
///
/// * `ex_rois` - N * 4 source boxes.
/// * `gt_rois` - N * 4 target boxes.
/// * `return` - N * 4 `[dx, dy, dw, dh]`, center offsets normalized by the
///   source size and log-scale size ratios.
pub fn nonlinear_transform(ex_rois: ArrayView2<f32>, gt_rois: ArrayView2<f32>) -> Array2<f32> {
    assert_eq!(
        ex_rois.nrows(),
        gt_rois.nrows(),
        "inconsistent number of boxes"
    );
    assert_eq!(ex_rois.ncols(), 4);
    assert_eq!(gt_rois.ncols(), 4);

    let mut targets = Array2::<f32>::zeros((ex_rois.nrows(), 4));
    for ((ex, gt), mut target) in ex_rois
        .axis_iter(Axis(0))
        .zip(gt_rois.axis_iter(Axis(0)))
        .zip(targets.axis_iter_mut(Axis(0)))
    {
        let ex_widths = ex[2] - ex[0] + 1.0;
        let ex_heights = ex[3] - ex[1] + 1.0;
        let ex_ctr_x = ex[0] + 0.5 * ex_widths;
        let ex_ctr_y = ex[1] + 0.5 * ex_heights;

        let gt_widths = gt[2] - gt[0] + 1.0;
        let gt_heights = gt[3] - gt[1] + 1.0;
        let gt_ctr_x = gt[0] + 0.5 * gt_widths;
        let gt_ctr_y = gt[1] + 0.5 * gt_heights;

        target[0] = (gt_ctr_x - ex_ctr_x) / ex_widths;
        target[1] = (gt_ctr_y - ex_ctr_y) / ex_heights;
        target[2] = (gt_widths / ex_widths).ln();
        target[3] = (gt_heights / ex_heights).ln();
    }
    targets
}

/// Inverse of [`nonlinear_transform`], applied to every 4-column class block.
///
/// * `boxes` - N * 4 anchor boxes.
/// * `box_deltas` - N * 4K deltas.
/// * `return` - N * 4K decoded boxes.
pub fn nonlinear_pred(boxes: ArrayView2<f32>, box_deltas: ArrayView2<f32>) -> Array2<f32> {
    assert_eq!(
        boxes.nrows(),
        box_deltas.nrows(),
        "inconsistent number of boxes"
    );
    assert_eq!(boxes.ncols(), 4);
    assert_eq!(
        box_deltas.ncols() % 4,
        0,
        "deltas must hold whole 4-column blocks"
    );

    let mut pred_boxes = Array2::<f32>::zeros(box_deltas.raw_dim());
    for ((anchor, deltas), mut pred) in boxes
        .axis_iter(Axis(0))
        .zip(box_deltas.axis_iter(Axis(0)))
        .zip(pred_boxes.axis_iter_mut(Axis(0)))
    {
        let widths = anchor[2] - anchor[0] + 1.0;
        let heights = anchor[3] - anchor[1] + 1.0;
        let ctr_x = anchor[0] + 0.5 * widths;
        let ctr_y = anchor[1] + 0.5 * heights;

        for start in (0..deltas.len()).step_by(4) {
            let dx = deltas[start];
            let dy = deltas[start + 1];
            let dw = deltas[start + 2].min(BBOX_XFORM_CLIP);
            let dh = deltas[start + 3].min(BBOX_XFORM_CLIP);

            let pred_ctr_x = dx * widths + ctr_x;
            let pred_ctr_y = dy * heights + ctr_y;
            let pred_w = dw.exp() * widths;
            let pred_h = dh.exp() * heights;

            pred[start] = pred_ctr_x - 0.5 * pred_w;
            pred[start + 1] = pred_ctr_y - 0.5 * pred_h;
            pred[start + 2] = pred_ctr_x + 0.5 * pred_w - 1.0;
            pred[start + 3] = pred_ctr_y + 0.5 * pred_h - 1.0;
        }
    }
    pred_boxes
}

/// Clip boxes to image boundaries.
///
/// * `boxes` - N * 4K, every 4-column block is clipped.
/// * `im_shape` - `(height, width)`.
pub fn clip_boxes(boxes: ArrayView2<f32>, im_shape: (usize, usize)) -> Array2<f32> {
    let (height, width) = im_shape;
    let max_x = width.saturating_sub(1) as f32;
    let max_y = height.saturating_sub(1) as f32;

    let mut clipped = boxes.to_owned();
    for mut row in clipped.axis_iter_mut(Axis(0)) {
        for (col, value) in row.iter_mut().enumerate() {
            let bound = if col % 2 == 0 { max_x } else { max_y };
            *value = value.max(0.0).min(bound);
        }
    }
    clipped
}
