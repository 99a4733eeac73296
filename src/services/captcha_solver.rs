//! 验证码识别服务 - 业务能力层
//!
//! 只负责"图片 → 文本猜测"，不保证正确；是否通过由重试循环观察页面决定

use std::io::Cursor;
use std::process::Stdio;

use async_trait::async_trait;
use image::ImageFormat;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::config::Config;
use crate::error::OcrError;

/// 验证码识别能力
#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    /// 返回尽力而为的识别结果（已去掉非字母数字字符，可能为空）
    async fn solve(&self, image: &[u8]) -> Result<String, OcrError>;
}

/// 去掉 OCR 结果中的非字母数字字符
pub fn clean_guess(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// 灰度化后重新编码为 PNG
pub fn to_grayscale_png(image: &[u8]) -> Result<Vec<u8>, OcrError> {
    let gray = image::load_from_memory(image)?.grayscale();
    let mut buf = Vec::new();
    gray.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

/// 调用本机 tesseract 命令识别
pub struct TesseractSolver {
    command: String,
    /// 页面分割模式，验证码是单行文本
    psm: u8,
}

impl TesseractSolver {
    pub fn new(config: &Config) -> Self {
        Self {
            command: config.tesseract_cmd.clone(),
            psm: 7,
        }
    }

    fn build_args(&self) -> Vec<String> {
        vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "--psm".to_string(),
            self.psm.to_string(),
        ]
    }
}

#[async_trait]
impl CaptchaSolver for TesseractSolver {
    async fn solve(&self, image: &[u8]) -> Result<String, OcrError> {
        let png = to_grayscale_png(image)?;

        let mut child = Command::new(&self.command)
            .args(self.build_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| OcrError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&png)
                .await
                .map_err(|source| OcrError::Spawn {
                    command: self.command.clone(),
                    source,
                })?;
            // 关闭 stdin，tesseract 才会开始处理
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| OcrError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(OcrError::EngineFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        let guess = clean_guess(&raw);
        debug!("OCR 原始结果: {:?} → {:?}", raw.trim(), guess);
        Ok(guess)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    #[test]
    fn clean_guess_keeps_only_alphanumerics() {
        assert_eq!(clean_guess(" A b-1 2!\n"), "Ab12");
        assert_eq!(clean_guess("—_—"), "");
    }

    #[test]
    fn grayscale_conversion_produces_png() {
        let img = ImageBuffer::from_pixel(4, 2, Rgb([200u8, 10, 10]));
        let mut input = Vec::new();
        img.write_to(&mut Cursor::new(&mut input), ImageFormat::Png)
            .unwrap();

        let out = to_grayscale_png(&input).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.color(), image::ColorType::L8);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        assert!(matches!(
            to_grayscale_png(b"not an image"),
            Err(OcrError::ImageDecode(_))
        ));
    }

    #[tokio::test]
    async fn missing_engine_is_a_spawn_error() {
        let solver = TesseractSolver {
            command: "definitely-not-a-tesseract-binary".to_string(),
            psm: 7,
        };
        let img = ImageBuffer::from_pixel(2, 2, Rgb([0u8, 0, 0]));
        let mut input = Vec::new();
        img.write_to(&mut Cursor::new(&mut input), ImageFormat::Png)
            .unwrap();

        let err = solver.solve(&input).await.unwrap_err();
        assert!(matches!(err, OcrError::Spawn { .. }));
    }

    #[test]
    fn single_line_page_segmentation() {
        let solver = TesseractSolver::new(&Config::default());
        assert_eq!(solver.build_args(), ["stdin", "stdout", "--psm", "7"]);
    }
}
