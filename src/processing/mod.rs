pub mod bbox_regression;
pub mod bbox_transform;
pub mod nms;
pub mod roi;
pub mod sample;
