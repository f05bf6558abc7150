//! 命令行输入解析
//!
//! 支持的格式：
//! - 绝对坐标: `100,50`
//! - 相对坐标: `@100,50`
//! - 极坐标: `@100<45`（相对参考点）或 `100<45`（相对原点）
//! - 数值: `100`（距离、半径、比例、项数等）
//! - 角度: `<45`
//! - 其它文本按命令处理，例如 `TRIM`、`C`

use thiserror::Error;
use zdraft_core::math::{Point2, Vector2};

/// 解析后的输入
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// 点坐标（相对输入已换算成绝对坐标）
    Point(Point2),
    /// 数值
    Value(f64),
    /// 角度（弧度）
    Angle(f64),
    /// 命令或子命令（大写）
    Command(String),
}

/// 解析错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("输入为空")]
    Empty,
    #[error("无效的数值: {0}")]
    InvalidNumber(String),
    #[error("相对坐标需要参考点: {0}")]
    MissingReference(String),
}

/// 解析一行输入
///
/// `reference_point` 是相对坐标（`@`）的基准点，通常是上一次输入的点。
pub fn parse_input(text: &str, reference_point: Option<Point2>) -> Result<Input, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    let (relative, body) = match text.strip_prefix('@') {
        Some(rest) => (true, rest.trim()),
        None => (false, text),
    };

    let offset = if let Some((length, angle)) = body.split_once('<') {
        let angle = number(angle)?.to_radians();
        if length.trim().is_empty() {
            if relative {
                return Err(ParseError::InvalidNumber(text.to_string()));
            }
            return Ok(Input::Angle(angle));
        }
        let length = number(length)?;
        Vector2::new(angle.cos(), angle.sin()) * length
    } else if let Some((x, y)) = body.split_once(',') {
        Vector2::new(number(x)?, number(y)?)
    } else if !relative && looks_numeric(body) {
        return Ok(Input::Value(number(body)?));
    } else if !relative && body.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Ok(Input::Command(body.to_uppercase()));
    } else {
        return Err(ParseError::InvalidNumber(text.to_string()));
    };

    if relative {
        let base = reference_point.ok_or_else(|| ParseError::MissingReference(text.to_string()))?;
        Ok(Input::Point(base + offset))
    } else {
        Ok(Input::Point(Point2::origin() + offset))
    }
}

fn number(text: &str) -> Result<f64, ParseError> {
    let text = text.trim();
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidNumber(text.to_string()))
}

/// 以数字、符号或小数点开头的文本按数值解析
fn looks_numeric(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
}
