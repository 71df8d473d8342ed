use anyhow::{ensure, Context, Error, Result};
use log::{debug, warn};
use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use ndarray_rand::rand::Rng;
use ndarray_rand::{RandomExt, SamplingStrategy};

use crate::processing::bbox_regression::{compute_targets, unmap};
use crate::processing::bbox_transform::{clip_boxes, nonlinear_pred};
use crate::rcnn::bbox::bbox_overlaps;
use crate::rcnn::config::SampleConfig;
use crate::utils::utils::argmax_rows;

/// Learning targets for one image, all with one row per input proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTargets {
    /// R classes in `[0, num_classes)`, 0 is background.
    pub labels: Array1<usize>,
    /// The R * 4 proposals the targets refer to.
    pub rois: Array2<f32>,
    /// R * 4K regression targets, zero outside the sampled foreground rows.
    pub bbox_targets: Array2<f32>,
    /// R * 4K loss mask, one block of ones per sampled foreground row.
    pub bbox_inside_weights: Array2<f32>,
}

/// Final per-proposal detections.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// R * 4 boxes of the winning class, clipped to the image.
    pub final_boxes: Array2<f32>,
    /// R winning classes.
    pub classes: Array1<usize>,
    /// R winning scores.
    pub scores: Array1<f32>,
}

/// Matches proposals to ground truth and samples a balanced set of
/// foreground and background rows as learning targets.
///
/// * `gt_boxes` - G * 5 `[x1, y1, x2, y2, class]`, class in `[1, num_classes)`.
/// * `rois` - R * 4 `[x1, y1, x2, y2]` proposals.
///
/// Proposals overlapping their best ground truth box by at least
/// `fg_threshold` are foreground candidates, those below `bg_threshold` are
/// background candidates and get label 0. Proposals in between are never
/// sampled and keep the class of their best match, with zero weights.
pub fn encode<R>(
    gt_boxes: ArrayView2<f32>,
    rois: ArrayView2<f32>,
    num_classes: usize,
    config: &SampleConfig,
    rng: &mut R,
) -> Result<EncodedTargets, Error>
where
    R: Rng + ?Sized,
{
    config.validate().context("invalid sampling config")?;
    ensure!(num_classes > 0, "num_classes must be positive");
    ensure!(
        gt_boxes.ncols() == 5,
        "gt_boxes must be G x 5, but get {:?}",
        gt_boxes.dim()
    );
    ensure!(
        rois.ncols() == 4,
        "rois must be R x 4, but get {:?}",
        rois.dim()
    );

    let num_rois = rois.nrows();
    let num_gt = gt_boxes.nrows();

    let gt_classes = gt_boxes
        .column(4)
        .iter()
        .map(|&cls| {
            ensure!(
                cls.fract() == 0.0 && cls >= 1.0 && (cls as usize) < num_classes,
                "ground truth class {} out of range [1, {})",
                cls,
                num_classes
            );
            Ok(cls as usize)
        })
        .collect::<Result<Array1<usize>>>()?;

    // R x G
    let (gt_assignment, max_overlaps) = if num_gt > 0 {
        let overlaps = bbox_overlaps(rois, gt_boxes.slice(s![.., 0..4]));
        argmax_rows(overlaps.view())
    } else {
        warn!("encode: no ground truth boxes, all proposals are background candidates");
        (Array1::zeros(num_rois), Array1::zeros(num_rois))
    };

    let mut labels: Array1<usize> = if num_gt > 0 {
        gt_assignment.mapv(|gt| gt_classes[gt])
    } else {
        Array1::zeros(num_rois)
    };

    let fg_inds = indices_where(&max_overlaps, |overlap| overlap >= config.fg_threshold);
    let fg_rois = fg_inds.len().min(config.fg_rois_per_image());
    let fg_inds = sample_without_replacement(fg_inds, fg_rois, rng);

    let bg_inds = indices_where(&max_overlaps, |overlap| overlap < config.bg_threshold);
    for &ind in &bg_inds {
        labels[ind] = 0;
    }
    let bg_rois = config.rois_per_image.saturating_sub(fg_rois);
    let num_bg_candidates = bg_inds.len();
    let bg_inds = sample_without_replacement(bg_inds, bg_rois, rng);

    debug!(
        "encode: {} rois, {} gt, fg {}/{}, bg {}/{}",
        num_rois,
        num_gt,
        fg_inds.len(),
        fg_rois,
        bg_inds.len(),
        num_bg_candidates
    );

    let keep_inds: Vec<usize> = fg_inds.iter().chain(bg_inds.iter()).copied().collect();

    let ex_rois = rois.select(Axis(0), &keep_inds);
    let gt_rois = if num_gt > 0 {
        let assigned: Vec<usize> = keep_inds.iter().map(|&ind| gt_assignment[ind]).collect();
        gt_boxes.slice(s![.., 0..4]).select(Axis(0), &assigned)
    } else {
        Array2::zeros((keep_inds.len(), 4))
    };
    let keep_labels = labels.select(Axis(0), &keep_inds);

    let (bbox_targets, bbox_inside_weights) =
        compute_targets(ex_rois.view(), gt_rois.view(), keep_labels.view(), num_classes);
    let bbox_targets = unmap(&bbox_targets, num_rois, &keep_inds, 0.0);
    let bbox_inside_weights = unmap(&bbox_inside_weights, num_rois, &keep_inds, 0.0);

    Ok(EncodedTargets {
        labels,
        rois: rois.to_owned(),
        bbox_targets,
        bbox_inside_weights,
    })
}

/// Decodes predicted deltas into boxes, keeping only the box of the highest
/// scoring class for each proposal.
///
/// * `box_deltas` - R * 4K predicted deltas.
/// * `scores` - R * K class scores.
/// * `rois` - R * 4 proposals the deltas apply to.
/// * `im_height`, `im_width` - image size used for clipping.
pub fn decode(
    box_deltas: ArrayView2<f32>,
    scores: ArrayView2<f32>,
    rois: ArrayView2<f32>,
    im_height: usize,
    im_width: usize,
) -> Result<Decoded, Error> {
    let num_classes = scores.ncols();
    ensure!(num_classes > 0, "scores must have at least one class");
    ensure!(
        rois.ncols() == 4,
        "rois must be R x 4, but get {:?}",
        rois.dim()
    );
    ensure!(
        box_deltas.ncols() == 4 * num_classes,
        "box deltas have {} columns, but {} classes require {}",
        box_deltas.ncols(),
        num_classes,
        4 * num_classes
    );
    ensure!(
        box_deltas.nrows() == rois.nrows() && scores.nrows() == rois.nrows(),
        "inconsistent number of rows: deltas {}, scores {}, rois {}",
        box_deltas.nrows(),
        scores.nrows(),
        rois.nrows()
    );

    let boxes = nonlinear_pred(rois, box_deltas);
    let (classes, max_scores) = argmax_rows(scores);

    let mut final_boxes = Array2::<f32>::zeros((boxes.nrows(), 4));
    for ((mut final_box, row), &cls) in final_boxes
        .axis_iter_mut(Axis(0))
        .zip(boxes.axis_iter(Axis(0)))
        .zip(classes.iter())
    {
        let ind = cls * 4;
        final_box.assign(&row.slice(s![ind..ind + 4]));
    }
    let final_boxes = clip_boxes(final_boxes.view(), (im_height, im_width));

    Ok(Decoded {
        final_boxes,
        classes,
        scores: max_scores,
    })
}

fn indices_where<F>(values: &Array1<f32>, pred: F) -> Array1<usize>
where
    F: Fn(f32) -> bool,
{
    values
        .iter()
        .enumerate()
        .filter(|&(_, &value)| pred(value))
        .map(|(index, _)| index)
        .collect()
}

/// Keeps `inds` as is when it holds at most `size` entries, otherwise draws
/// `size` of them uniformly without replacement.
fn sample_without_replacement<R>(inds: Array1<usize>, size: usize, rng: &mut R) -> Array1<usize>
where
    R: Rng + ?Sized,
{
    if inds.len() <= size {
        return inds;
    }
    inds.sample_axis_using(Axis(0), size, SamplingStrategy::WithoutReplacement, rng)
}
