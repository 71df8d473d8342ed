use anyhow::{ensure, Context, Error, Result};
use log::trace;
use ndarray::{concatenate, s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use std::cmp::Ordering;

use crate::processing::nms::nms;
use crate::rcnn::config::RpnConfig;

/// Class-wise detections that survive [`apply_nms`].
#[derive(Debug, Clone, PartialEq)]
pub struct Detections {
    pub boxes: Array2<f32>,
    pub scores: Array1<f32>,
    pub classes: Array1<usize>,
}

/// Sample proposals according to their scores.
///
/// * `boxes` - M * 4 (anchor-major boxes flattened to rows).
/// * `scores` - M foreground probabilities.
/// * `is_training` - outside training both top-n cuts are halved.
/// * `only_positive` - drop boxes scoring 0.5 or less before anything else.
/// * `return` - (boxes, scores) of the kept proposals, highest score first.
pub fn sample_rpn_outputs(
    boxes: ArrayView2<f32>,
    scores: ArrayView1<f32>,
    config: &RpnConfig,
    is_training: bool,
    only_positive: bool,
) -> Result<(Array2<f32>, Array1<f32>), Error> {
    config.validate().context("invalid rpn config")?;
    ensure!(
        boxes.ncols() == 4,
        "boxes must be M x 4, but get {:?}",
        boxes.dim()
    );
    ensure!(
        boxes.nrows() == scores.len(),
        "{} boxes but {} scores",
        boxes.nrows(),
        scores.len()
    );

    let (pre_nms_top_n, post_nms_top_n) = if is_training {
        (config.pre_nms_top_n, config.post_nms_top_n)
    } else {
        (config.pre_nms_top_n / 2, config.post_nms_top_n / 2)
    };

    let mut keeps: Vec<usize> = (0..boxes.nrows()).collect();
    if only_positive {
        keeps.retain(|&i| scores[i] > 0.5);
    }

    let sizable = filter_boxes(boxes, config.min_size);
    keeps.retain(|&i| sizable[i]);

    keeps.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));
    if pre_nms_top_n > 0 {
        keeps.truncate(pre_nms_top_n);
    }
    trace!(
        "sample_rpn_outputs: {} of {} boxes enter nms",
        keeps.len(),
        boxes.nrows()
    );

    let dets = concatenate![
        Axis(1),
        boxes.select(Axis(0), &keeps),
        scores.select(Axis(0), &keeps).insert_axis(Axis(1))
    ];
    let mut order = nms(dets.view(), config.rpn_nms_threshold);
    if post_nms_top_n > 0 {
        order.truncate(post_nms_top_n);
    }
    trace!("sample_rpn_outputs: {} boxes after nms", order.len());

    let picked: Vec<usize> = order.iter().map(|&i| keeps[i]).collect();
    Ok((
        boxes.select(Axis(0), &picked),
        scores.select(Axis(0), &picked),
    ))
}

/// Mask of boxes whose sides are both at least `min_size`.
pub fn filter_boxes(boxes: ArrayView2<f32>, min_size: f32) -> Array1<bool> {
    boxes
        .axis_iter(Axis(0))
        .map(|b| {
            let ws = b[2] - b[0] + 1.0;
            let hs = b[3] - b[1] + 1.0;
            ws >= min_size && hs >= min_size
        })
        .collect()
}

/// Class-wise NMS over decoded detections, skipping background.
///
/// * `boxes` - R * 4K boxes, one block per class.
/// * `scores` - R * K class scores.
/// * `nms_threshold` - overlap above which a lower scoring box is suppressed.
/// * `score_threshold` - survivors must score strictly above this.
pub fn apply_nms(
    boxes: ArrayView2<f32>,
    scores: ArrayView2<f32>,
    nms_threshold: f32,
    score_threshold: f32,
) -> Result<Detections, Error> {
    let num_classes = scores.ncols();
    ensure!(
        boxes.nrows() == scores.nrows(),
        "shape mismatch {:?} vs {:?}",
        boxes.dim(),
        scores.dim()
    );
    ensure!(
        boxes.ncols() == 4 * num_classes,
        "boxes have {} columns, but {} classes require {}",
        boxes.ncols(),
        num_classes,
        4 * num_classes
    );

    let mut final_boxes = Vec::new();
    let mut final_scores = Vec::new();
    let mut final_classes = Vec::new();

    for cls in 1..num_classes {
        let cls_boxes = boxes.slice(s![.., 4 * cls..4 * cls + 4]);
        let cls_scores = scores.column(cls);
        let dets = concatenate![Axis(1), cls_boxes, cls_scores.insert_axis(Axis(1))];

        for i in nms(dets.view(), nms_threshold) {
            if cls_scores[i] > score_threshold {
                final_boxes.extend(cls_boxes.row(i).iter().copied());
                final_scores.push(cls_scores[i]);
                final_classes.push(cls);
            }
        }
    }

    trace!("apply_nms: {} detections", final_scores.len());
    let boxes = Array2::from_shape_vec((final_scores.len(), 4), final_boxes)?;
    Ok(Detections {
        boxes,
        scores: Array1::from(final_scores),
        classes: Array1::from(final_classes),
    })
}
