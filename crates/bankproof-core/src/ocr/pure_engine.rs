//! Pure Rust OCR engine wrapper using `pure-onnx-ocr`.

use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use image::DynamicImage;
use tracing::{debug, info, warn};

use super::{join_in_reading_order, model_family, OcrTextSource, Result, TextBox};
use crate::document::{classify, DocumentKind};
use crate::error::OcrError;
use crate::models::config::{OcrConfig, PdfConfig};
use crate::pdf::PdfDocument;

/// OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
///
/// Models are loaded from `OcrConfig::model_dir` on each call, inside the
/// blocking task, so nothing model-related is shared between requests.
#[derive(Debug, Clone, Default)]
pub struct PureOcrEngine {
    config: OcrConfig,
    pdf: PdfConfig,
}

struct ModelPaths {
    detection: PathBuf,
    recognition: PathBuf,
    dictionary: PathBuf,
}

impl PureOcrEngine {
    pub fn new(config: OcrConfig, pdf: PdfConfig) -> Self {
        Self { config, pdf }
    }

    fn model_paths(&self, language: &str) -> ModelPaths {
        let family = model_family(language);
        ModelPaths {
            detection: self.config.model_path(&self.config.detection_model),
            recognition: self.config.model_path(&self.config.recognition_model(family)),
            dictionary: self.config.model_path(&self.config.dictionary_for(family)),
        }
    }

    /// Whether detection and recognition models exist for `language`.
    pub fn models_available(&self, language: &str) -> bool {
        let paths = self.model_paths(language);
        paths.detection.exists() && paths.recognition.exists() && paths.dictionary.exists()
    }

    fn load_engine(paths: &ModelPaths) -> Result<pure_onnx_ocr::engine::OcrEngine> {
        for path in [&paths.detection, &paths.recognition, &paths.dictionary] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!("missing model file {}", path.display())));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&paths.detection)
            .rec_model_path(&paths.recognition)
            .dictionary_path(&paths.dictionary)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", paths.detection.display());
        Ok(engine)
    }

    /// Decode the document into the images to recognize.
    fn document_images(data: &[u8], pdf: &PdfConfig) -> Result<Vec<DynamicImage>> {
        match classify(data) {
            DocumentKind::Pdf => {
                let document = PdfDocument::load(data, pdf)
                    .map_err(|e| OcrError::InvalidImage(e.to_string()))?;
                let images = document.extract_images();
                if images.is_empty() {
                    return Err(OcrError::NoImages);
                }
                Ok(images)
            }
            DocumentKind::Other => {
                let image = image::load_from_memory(data)
                    .map_err(|e| OcrError::InvalidImage(e.to_string()))?;
                Ok(vec![image])
            }
        }
    }

    fn recognize_image(
        engine: &pure_onnx_ocr::engine::OcrEngine,
        image: &DynamicImage,
        keep_unk: bool,
    ) -> Result<String> {
        let results = engine
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        debug!("pure-onnx-ocr returned {} text regions", results.len());

        let boxes: Vec<TextBox> = results
            .iter()
            .map(|r| TextBox {
                bbox: polygon_to_bbox(&r.bounding_box),
                text: if keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                },
                confidence: r.confidence,
            })
            .collect();

        Ok(join_in_reading_order(boxes))
    }

    fn recognize_blocking(data: &[u8], paths: &ModelPaths, config: &OcrConfig, pdf: &PdfConfig) -> Result<String> {
        let start = Instant::now();
        let images = Self::document_images(data, pdf)?;
        let engine = Self::load_engine(paths)?;

        let mut pages = Vec::with_capacity(images.len());
        for (i, image) in images.iter().enumerate() {
            match Self::recognize_image(&engine, image, config.keep_unk) {
                Ok(text) if !text.trim().is_empty() => pages.push(text),
                Ok(_) => debug!("No text detected in image {}", i + 1),
                Err(e) => warn!("OCR failed for image {}: {}", i + 1, e),
            }
        }

        info!(
            "OCR complete: {} of {} images produced text in {}ms",
            pages.len(),
            images.len(),
            start.elapsed().as_millis()
        );

        Ok(pages.join("\n\n"))
    }
}

#[async_trait]
impl OcrTextSource for PureOcrEngine {
    async fn recognize(&self, data: &[u8], language: &str) -> Result<String> {
        let data = data.to_vec();
        let paths = self.model_paths(language);
        let config = self.config.clone();
        let pdf = self.pdf.clone();
        let dispatch = tracing::dispatcher::get_default(|d| d.clone());

        tokio::task::spawn_blocking(move || {
            tracing::dispatcher::with_default(&dispatch, || {
                Self::recognize_blocking(&data, &paths, &config, &pdf)
            })
        })
        .await
        .map_err(|e| OcrError::Task(e.to_string()))?
    }
}

/// Convert a `Polygon<f64>` to our `[f32; 8]` bbox format.
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 8] {
    let mut bbox = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        bbox[i * 2] = coord.x as f32;
        bbox[i * 2 + 1] = coord.y as f32;
    }
    bbox
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_without_models() -> PureOcrEngine {
        let config = OcrConfig {
            model_dir: PathBuf::from("/nonexistent/bankproof-models"),
            ..OcrConfig::default()
        };
        PureOcrEngine::new(config, PdfConfig::default())
    }

    #[test]
    fn test_model_paths_follow_language_family() {
        let paths = engine_without_models().model_paths("por");
        assert!(paths.recognition.ends_with("latin_rec.onnx"));
        assert!(paths.dictionary.ends_with("latin_dict.txt"));
        assert!(paths.detection.ends_with("det.onnx"));
    }

    #[tokio::test]
    async fn test_recognize_rejects_non_image() {
        let result = engine_without_models().recognize(b"plain text, not an image", "eng").await;
        assert!(matches!(result, Err(OcrError::InvalidImage(_))));
    }

    #[tokio::test]
    async fn test_recognize_without_models() {
        let png = {
            let img = DynamicImage::new_rgb8(4, 4);
            let mut buf = std::io::Cursor::new(Vec::new());
            img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
            buf.into_inner()
        };
        let engine = engine_without_models();
        assert!(!engine.models_available("eng"));
        let result = engine.recognize(&png, "eng").await;
        assert!(matches!(result, Err(OcrError::ModelLoad(_))));
    }
}
