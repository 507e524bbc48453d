//! # 商品图片接收工具 — 命令行入口
//!
//! 本文件仅负责参数解析、文件读取与结果输出，代替浏览器表单驱动一次接收批次。
//! 业务逻辑分布在 `image_intake` 子模块中，详见 `lib.rs` 架构文档。
//!
//! 命令行没有浏览器提供的声明类型，这里用 `infer` 按文件签名推断媒体类型。

use std::fs;
use std::path::{Path, PathBuf};

use listing_image_intake::error::AppError;
use listing_image_intake::image_intake::{AcceptedImage, IntakeConfig, IntakeReport, IntakeService, RawInput};
use serde::Serialize;

const USAGE: &str = "用法: listing-intake [--config <config.json>] [--payload] <图片文件>...";

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    config_path: Option<PathBuf>,
    include_payload: bool,
    files: Vec<PathBuf>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SlotSummary {
    slot: usize,
    primary: bool,
    media_type: String,
    bytes: u64,
    over_budget: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CliOutput<'a> {
    report: &'a IntakeReport,
    notices: Vec<String>,
    slots: Vec<SlotSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<Vec<&'a AcceptedImage>>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run().await {
        let line = err.describe();
        log::error!("图片接收失败: {line}");
        eprintln!("{line}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let args = parse_args(std::env::args().skip(1))?;

    let config = match &args.config_path {
        Some(path) => IntakeConfig::from_json_str(&fs::read_to_string(path)?)?,
        None => IntakeConfig::default(),
    };
    log::info!(
        "setup: max_images={} ceiling={} bytes",
        config.max_images,
        config.byte_ceiling
    );

    let service = IntakeService::with_config(config)?;
    let inputs = args
        .files
        .iter()
        .map(|path| load_input(path))
        .collect::<Result<Vec<_>, _>>()?;

    let report = service.intake(inputs).await?;
    let slots = service.slots().await;

    let output = CliOutput {
        report: &report,
        notices: report.notices(),
        slots: slots
            .iter()
            .enumerate()
            .map(|(slot, image)| SlotSummary {
                slot,
                primary: slot == 0,
                media_type: image.media_type().to_string(),
                bytes: image.byte_len(),
                over_budget: image.is_over_budget(),
            })
            .collect(),
        payload: args.include_payload.then(|| slots.iter().collect()),
    };

    let json = serde_json::to_string_pretty(&output)?;
    println!("{json}");

    Ok(())
}

fn parse_args<I>(args: I) -> Result<CliArgs, AppError>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| AppError::Usage(format!("--config 缺少路径\n{USAGE}")))?;
                parsed.config_path = Some(PathBuf::from(path));
            }
            "--payload" => parsed.include_payload = true,
            "-h" | "--help" => return Err(AppError::Usage(USAGE.to_string())),
            other if other.starts_with("--") => {
                return Err(AppError::Usage(format!("未知参数: {other}\n{USAGE}")));
            }
            _ => parsed.files.push(PathBuf::from(arg)),
        }
    }

    if parsed.files.is_empty() {
        return Err(AppError::Usage(USAGE.to_string()));
    }

    Ok(parsed)
}

/// 读取文件并按签名推断媒体类型；无法识别时不声明类型。
fn load_input(path: &Path) -> Result<RawInput, AppError> {
    let bytes = fs::read(path)?;
    let media_type = infer::get(&bytes).map(|kind| kind.mime_type());
    log::debug!("📁 读取文件 {} - {} 字节，类型 {:?}", path.display(), bytes.len(), media_type);

    Ok(RawInput::new(bytes, media_type).with_name(path.display().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn parses_config_payload_and_files() {
        let parsed = parse_args(args(&["--config", "intake.json", "a.jpg", "--payload", "b.png"]))
            .expect("args should parse");

        assert_eq!(parsed.config_path, Some(PathBuf::from("intake.json")));
        assert!(parsed.include_payload);
        assert_eq!(parsed.files, vec![PathBuf::from("a.jpg"), PathBuf::from("b.png")]);
    }

    #[test]
    fn requires_at_least_one_file() {
        assert!(matches!(parse_args(args(&[])), Err(AppError::Usage(_))));
        assert!(matches!(parse_args(args(&["--config"])), Err(AppError::Usage(_))));
        assert!(matches!(parse_args(args(&["--verbose", "a.jpg"])), Err(AppError::Usage(_))));
    }

    #[test]
    fn load_input_sniffs_media_type() {
        let dir = std::env::temp_dir().join(format!("listing-intake-cli-test-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("create temp dir");

        let png_path = dir.join("photo.txt");
        let mut png = Vec::new();
        image::DynamicImage::new_rgb8(4, 4)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .expect("encode png");
        fs::write(&png_path, &png).expect("write png");

        let text_path = dir.join("notes.jpg");
        fs::write(&text_path, b"plain text, not a photo").expect("write text");

        let png_input = load_input(&png_path).expect("load png");
        assert_eq!(png_input.media_type(), Some("image/png"));
        let text_input = load_input(&text_path).expect("load text");
        assert_eq!(text_input.media_type(), None);

        let _ = fs::remove_dir_all(dir);
    }
}
