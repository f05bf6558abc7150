//! 几何构造错误定义
//!
//! 只在实体构造时使用；求交、编辑等算法对"无解"一律返回 `None` 或空集合。

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Non-finite coordinate in {0}")]
    NonFinite(&'static str),

    #[error("Negative size in {kind}: {value}")]
    NegativeSize { kind: &'static str, value: f64 },

    #[error("Degenerate {0}")]
    Degenerate(&'static str),

    #[error("{kind} needs at least {required} points, got {actual}")]
    TooFewPoints {
        kind: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("Invalid opacity: {0}")]
    InvalidOpacity(f64),
}
