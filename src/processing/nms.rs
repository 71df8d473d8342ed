use ndarray::{Array1, ArrayView2};
use std::cmp::Ordering;

// greedily select boxes with high confidence and overlap with current maximum <= thresh
// rule out overlap > thresh
//   :param dets: [[x1, y1, x2, y2, score]]
//   :param thresh: retain overlap <= thresh
//   :return: indexes to keep, highest score first
pub fn nms(dets: ArrayView2<f32>, thresh: f32) -> Vec<usize> {
    assert_eq!(dets.ncols(), 5, "dets must be [x1, y1, x2, y2, score]");

    let x1 = dets.column(0);
    let y1 = dets.column(1);
    let x2 = dets.column(2);
    let y2 = dets.column(3);
    let scores = dets.column(4);

    let areas: Array1<f32> = (&x2 - &x1 + 1.0) * (&y2 - &y1 + 1.0);
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
    });

    let mut keep = Vec::new();
    while let Some((&i, rest)) = order.split_first() {
        keep.push(i);

        order = rest
            .iter()
            .copied()
            .filter(|&j| {
                let xx1 = x1[i].max(x1[j]);
                let yy1 = y1[i].max(y1[j]);
                let xx2 = x2[i].min(x2[j]);
                let yy2 = y2[i].min(y2[j]);

                let w = (xx2 - xx1 + 1.0).max(0.0);
                let h = (yy2 - yy1 + 1.0).max(0.0);
                let inter = w * h;
                let ovr = inter / (areas[i] + areas[j] - inter);
                ovr <= thresh
            })
            .collect();
    }

    keep
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array2};

    use crate::processing::nms::nms;

    #[test]
    fn test_nms() {
        let dets = array![
            [100.0f32, 100.0, 210.0, 210.0, 0.72],
            [250.0, 250.0, 420.0, 420.0, 0.8],
            [220.0, 220.0, 320.0, 330.0, 0.92],
            [100.0, 100.0, 210.0, 210.0, 0.6],
        ];

        let keep = nms(dets.view(), 0.4);
        assert_eq!(keep, vec![2, 1, 0]);
    }

    #[test]
    fn test_nms_keeps_disjoint() {
        let dets = array![
            [0.0f32, 0.0, 9.0, 9.0, 0.5],
            [20.0, 20.0, 29.0, 29.0, 0.9],
        ];

        assert_eq!(nms(dets.view(), 0.0), vec![1, 0]);
    }

    #[test]
    fn test_nms_empty() {
        let dets = Array2::<f32>::zeros((0, 5));
        assert!(nms(dets.view(), 0.5).is_empty());
    }
}
