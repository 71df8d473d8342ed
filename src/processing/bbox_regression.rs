use ndarray::{s, Array, Array2, ArrayBase, ArrayView1, ArrayView2, Axis, Data, RemoveAxis};

use crate::processing::bbox_transform::nonlinear_transform;

/// compute_targets
/// Expands per-pair regression deltas into the 4-of-4K layout used by the
/// detection head: only the block of the row's own class is non-zero.
///
/// * `ex_rois` - N * 4 sampled proposals.
/// * `gt_rois` - N * 4 ground truth boxes matched to `ex_rois`.
/// * `labels` - N classes, 0 is background.
/// * `return` - (bbox_targets, bbox_inside_weights), both N * 4K. Background
///   rows are all zero in both.
pub fn compute_targets(
    ex_rois: ArrayView2<f32>,
    gt_rois: ArrayView2<f32>,
    labels: ArrayView1<usize>,
    num_classes: usize,
) -> (Array2<f32>, Array2<f32>) {
    assert_eq!(ex_rois.nrows(), gt_rois.nrows());
    assert_eq!(ex_rois.nrows(), labels.len());
    assert_eq!(ex_rois.ncols(), 4);
    assert_eq!(gt_rois.ncols(), 4);

    let targets = nonlinear_transform(ex_rois, gt_rois);

    let mut bbox_targets = Array2::<f32>::zeros((labels.len(), 4 * num_classes));
    let mut bbox_inside_weights = Array2::<f32>::zeros(bbox_targets.raw_dim());

    for (index, &cls) in labels.iter().enumerate().filter(|&(_, &cls)| cls > 0) {
        assert!(
            cls < num_classes,
            "label {} out of range for {} classes",
            cls,
            num_classes
        );
        let start = 4 * cls;
        let end = start + 4;
        bbox_targets
            .slice_mut(s![index, start..end])
            .assign(&targets.row(index));
        bbox_inside_weights
            .slice_mut(s![index, start..end])
            .fill(1.0);
    }

    (bbox_targets, bbox_inside_weights)
}

/// Unmap a subset of items (`data`) back to the original set of `count` items.
///
/// Row `i` of `data` lands at `inds[i]`; every other row is set to `fill`.
/// `inds` may be unsorted. When an index repeats, the last row written wins.
pub fn unmap<A, S, D>(data: &ArrayBase<S, D>, count: usize, inds: &[usize], fill: A) -> Array<A, D>
where
    A: Clone,
    S: Data<Elem = A>,
    D: RemoveAxis,
{
    assert_eq!(
        data.len_of(Axis(0)),
        inds.len(),
        "one index is required per data row"
    );

    let mut shape = data.raw_dim();
    shape[0] = count;
    let mut ret = Array::from_elem(shape, fill);

    for (row, &ind) in data.axis_iter(Axis(0)).zip(inds) {
        assert!(ind < count, "index {} out of range for {} items", ind, count);
        ret.index_axis_mut(Axis(0), ind).assign(&row);
    }
    ret
}
