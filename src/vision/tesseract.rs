//! Tesseract OCR backend
//!
//! Drives the `tesseract` command-line engine. Frames are PNG-encoded and piped
//! on stdin; word boxes come back as TSV on stdout.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use super::ocr::{RecognitionConfig, RecognitionEngine};
use super::{BoundingBox, DetectionCandidate};
use crate::capture::frame::Frame;
use crate::error::DetectorError;

/// TSV row level for individual words
const WORD_LEVEL: u32 = 5;

/// Tesseract engine wrapper
pub struct TesseractEngine {
    binary: PathBuf,
    language: String,
    /// Set by `initialize`, cleared by `terminate`
    config: RwLock<Option<RecognitionConfig>>,
}

impl TesseractEngine {
    /// Create an engine for the given binary and language pack (e.g. "eng")
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
            config: RwLock::new(None),
        }
    }

    #[cfg(test)]
    pub fn is_initialized(&self) -> bool {
        self.config.read().is_some()
    }

    /// Command-line arguments for one recognition run
    fn recognition_args(&self, config: &RecognitionConfig) -> Vec<String> {
        let mut args = vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.language.clone(),
            "--psm".to_string(),
            config.page_segmentation_mode.as_psm().to_string(),
        ];
        if !config.character_whitelist.is_empty() {
            args.push("-c".to_string());
            args.push(format!("tessedit_char_whitelist={}", config.character_whitelist));
        }
        args.push("tsv".to_string());
        args
    }
}

#[async_trait]
impl RecognitionEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn initialize(&self, config: &RecognitionConfig) -> Result<(), DetectorError> {
        info!("Initializing tesseract engine with language: {}", self.language);

        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map_err(|e| {
                DetectorError::engine_init(format!("failed to run {:?}: {}", self.binary, e))
            })?;

        if !output.status.success() {
            return Err(DetectorError::engine_init(format!(
                "{:?} --version exited with {}",
                self.binary, output.status
            )));
        }

        // Older releases print the version banner on stderr
        let banner = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };
        let version = banner.lines().next().unwrap_or("unknown version").trim().to_string();

        *self.config.write() = Some(config.clone());
        info!("Tesseract initialized: {}", version);
        Ok(())
    }

    async fn recognize(&self, frame: &Frame) -> Result<Vec<DetectionCandidate>, DetectorError> {
        let config = self
            .config
            .read()
            .clone()
            .ok_or_else(|| DetectorError::recognition("engine is not initialized"))?;

        if frame.data().is_empty() || frame.width() == 0 || frame.height() == 0 {
            return Ok(vec![]);
        }

        debug!("Tesseract: Processing {}x{} frame", frame.width(), frame.height());

        let png = frame
            .encode_png()
            .map_err(|e| DetectorError::recognition(format!("{:#}", e)))?;

        let mut child = Command::new(&self.binary)
            .args(self.recognition_args(&config))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DetectorError::recognition(format!("failed to spawn tesseract: {}", e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| DetectorError::recognition("tesseract stdin unavailable"))?;
        let writer = tokio::spawn(async move {
            stdin.write_all(&png).await?;
            stdin.shutdown().await
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| DetectorError::recognition(format!("tesseract did not finish: {}", e)))?;

        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(DetectorError::recognition(format!("failed to send frame: {}", e)))
            }
            Err(e) => return Err(DetectorError::recognition(format!("frame writer panicked: {}", e))),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DetectorError::recognition(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let candidates = parse_tsv(&String::from_utf8_lossy(&output.stdout));
        debug!("Tesseract: Found {} words", candidates.len());
        Ok(candidates)
    }

    async fn terminate(&self) -> Result<(), DetectorError> {
        if self.config.write().take().is_some() {
            info!("Tesseract engine released");
        }
        Ok(())
    }
}

/// Extract word rows from tesseract's TSV output
///
/// Columns: level, page, block, par, line, word, left, top, width, height, conf, text.
fn parse_tsv(tsv: &str) -> Vec<DetectionCandidate> {
    tsv.lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 12 {
                return None;
            }

            let level: u32 = fields[0].parse().ok()?;
            if level != WORD_LEVEL {
                return None;
            }

            let confidence: f32 = fields[10].trim().parse().ok()?;
            let text = fields[11];
            if confidence < 0.0 || text.trim().is_empty() {
                return None;
            }

            let left: u32 = fields[6].parse().ok()?;
            let top: u32 = fields[7].parse().ok()?;
            let width: u32 = fields[8].parse().ok()?;
            let height: u32 = fields[9].parse().ok()?;

            Some(DetectionCandidate::new(
                text,
                confidence,
                BoundingBox::new(
                    left,
                    top,
                    left.saturating_add(width),
                    top.saturating_add(height),
                ),
            ))
        })
        .collect()
}
