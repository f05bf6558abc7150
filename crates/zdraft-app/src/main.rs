//! ZDraft 命令行驱动程序
//!
//! 用法: `zdraft-app [settings.json] [--dump]`
//!
//! 读取可选的 JSON 设置文件，在示例图纸上跑一段脚本化的编辑会话，
//! `--dump` 时把最终文档以 JSON 输出到标准输出。

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use zdraft_core::block::BlockDefinition;
use zdraft_core::document::Document;
use zdraft_core::entity::Entity;
use zdraft_core::geometry::{BlockRef, Circle, Geometry, Line, Spline};
use zdraft_core::math::Point2;
use zdraft_core::properties::Color;
use zdraft_core::settings::KernelSettings;
use zdraft_core::spline::sample_spline;
use zdraft_tools::{ActionResult, Session};

/// 示例会话的命令脚本，每行一次输入
const DEMO_SCRIPT: &[&str] = &[
    // 圆角：半径 10，点选两条直线
    "FILLET", "10", "50,0", "100,40",
    // 修剪：点击交点左侧
    "TRIM", "220,0",
    // 选中圆，做 6 项整圆环形阵列
    "SELECT", "420,0",
    "AP", "420,0", "400,60", "6", "360",
    // 向内偏移原来的圆
    "OFFSET", "5", "420,0", "400,0",
    // 炸开块参照，再撤销、重做
    "EXPLODE", "500,0",
    "UNDO", "REDO",
];

struct Args {
    settings_path: Option<PathBuf>,
    dump: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        settings_path: None,
        dump: false,
    };
    for arg in std::env::args().skip(1) {
        if arg == "--dump" {
            args.dump = true;
        } else if args.settings_path.is_none() {
            args.settings_path = Some(PathBuf::from(arg));
        } else {
            warn!("忽略多余的参数: {}", arg);
        }
    }
    args
}

/// 读取设置文件；取值校验在 `Session::new` 中进行
fn load_settings(path: Option<&PathBuf>) -> Result<KernelSettings> {
    let Some(path) = path else {
        return Ok(KernelSettings::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("无法读取设置文件 {}", path.display()))?;
    let settings: KernelSettings = serde_json::from_str(&text)
        .with_context(|| format!("设置文件格式错误 {}", path.display()))?;
    info!("已加载设置文件 {}", path.display());
    Ok(settings)
}

fn create_demo_document() -> Document {
    let mut doc = Document::new();

    // 圆角用的转角
    for (a, b) in [((0.0, 0.0), (100.0, 0.0)), ((100.0, 0.0), (100.0, 80.0))] {
        let line = Line::new(Point2::new(a.0, a.1), Point2::new(b.0, b.1));
        doc.add_entity(Entity::new(Geometry::Line(line)).with_color(Color::CYAN));
    }

    // 修剪用的十字
    doc.add_entity(Entity::new(Geometry::Line(Line::new(
        Point2::new(200.0, 0.0),
        Point2::new(300.0, 0.0),
    ))));
    doc.add_entity(Entity::new(Geometry::Line(Line::new(
        Point2::new(250.0, -50.0),
        Point2::new(250.0, 50.0),
    ))));

    doc.add_entity(
        Entity::new(Geometry::Circle(Circle::new(Point2::new(400.0, 0.0), 20.0)))
            .with_color(Color::YELLOW),
    );

    // 螺栓块
    let bolt = doc.add_block(BlockDefinition::new(
        "bolt",
        Point2::origin(),
        vec![
            Entity::new(Geometry::Circle(Circle::new(Point2::origin(), 2.0))),
            Entity::new(Geometry::Line(Line::new(Point2::new(-3.0, 0.0), Point2::new(3.0, 0.0)))),
        ],
    ));
    doc.add_entity(Entity::new(Geometry::BlockRef(BlockRef::new(
        bolt,
        Point2::new(500.0, 0.0),
    ))));

    doc.add_entity(
        Entity::new(Geometry::Spline(Spline::new(
            vec![
                Point2::new(0.0, 150.0),
                Point2::new(40.0, 110.0),
                Point2::new(80.0, 190.0),
                Point2::new(120.0, 150.0),
            ],
            3,
            false,
        )))
        .with_color(Color::MAGENTA),
    );

    info!("创建了 {} 个示例实体", doc.len());
    doc
}

fn describe(result: &ActionResult) -> String {
    match result {
        ActionResult::Continue => "继续".to_string(),
        ActionResult::Commit(modify) => format!(
            "提交（删除 {}，新增 {}）",
            modify.remove_ids.len(),
            modify.add_entities.len()
        ),
        ActionResult::Select(ids) => format!("选中 {} 个", ids.len()),
        ActionResult::Cancel => "取消".to_string(),
        ActionResult::SwitchTo(action) => format!("切换到 {}", action.name()),
        ActionResult::NeedSelection => "需要选择".to_string(),
    }
}

fn main() -> Result<()> {
    // 初始化日志，RUST_LOG 可以覆盖默认级别
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing::subscriber::set_global_default(FmtSubscriber::builder().with_env_filter(filter).finish())?;

    info!("Starting ZDraft...");

    let args = parse_args();
    let settings = load_settings(args.settings_path.as_ref())?;
    let document = create_demo_document();
    if let Some(bolt) = document.blocks().find_by_name("bolt") {
        info!("块 {} 含 {} 个子实体", bolt.name, bolt.entities.len());
    }

    for entity in document.entities() {
        if let Geometry::Spline(spline) = &entity.geometry {
            info!("样条 {} 采样为 {} 个点", entity.id, sample_spline(spline).len());
        }
    }

    let mut session = Session::new(document, settings);
    for line in DEMO_SCRIPT {
        match session.execute(line) {
            Ok(result) => info!(
                "{:>8} -> {}，实体 {} 个，提示: {}",
                line,
                describe(&result),
                session.document().len(),
                session.prompt()
            ),
            Err(err) => warn!("{:>8} -> {}", line, err),
        }
    }

    info!(
        "会话结束：{} 个实体，{} 步可撤销",
        session.document().len(),
        session.history().len()
    );

    if args.dump {
        println!("{}", serde_json::to_string_pretty(session.document())?);
    }

    Ok(())
}
