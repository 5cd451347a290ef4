//! Optical character recognition for image-like documents.

#[cfg(feature = "native")]
mod pure_engine;

#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use async_trait::async_trait;
use tracing::warn;

use crate::error::OcrError;

/// Result type for OCR operations.
pub type Result<T> = std::result::Result<T, OcrError>;

/// Source of recognized text for a raw document (image or scanned PDF).
#[async_trait]
pub trait OcrTextSource: Send + Sync {
    /// Recognize text using the given language hint (ISO 639-2, e.g. `"eng"`).
    async fn recognize(&self, data: &[u8], language: &str) -> Result<String>;
}

/// A recognized text box with its quadrilateral and content.
#[derive(Debug, Clone)]
pub struct TextBox {
    /// Bounding box coordinates (x1, y1, x2, y2, x3, y3, x4, y4).
    pub bbox: [f32; 8],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl TextBox {
    /// Top-left corner of the axis-aligned bounding rectangle.
    pub fn origin(&self) -> (f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];
        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        (min_x, min_y)
    }
}

/// Sort boxes top-to-bottom, then left-to-right, and join their text by lines.
pub fn join_in_reading_order(mut boxes: Vec<TextBox>) -> String {
    boxes.sort_by(|a, b| {
        let (ax, ay) = a.origin();
        let (bx, by) = b.origin();

        // Same row when within 20 pixels vertically
        let row_a = (ay / 20.0) as i32;
        let row_b = (by / 20.0) as i32;

        if row_a != row_b {
            row_a.cmp(&row_b)
        } else {
            ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal)
        }
    });

    boxes
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Recognition model family for a language hint.
///
/// Only Latin-script recognition models ship; other hints fall back to them.
pub fn model_family(language: &str) -> &'static str {
    match language.to_ascii_lowercase().as_str() {
        "eng" | "en" | "por" | "pt" | "fra" | "fr" | "spa" | "es" | "deu" | "de" | "ita"
        | "it" | "nld" | "nl" | "pol" | "pl" | "lat" => "latin",
        other => {
            warn!("No recognition model for language '{}', using latin", other);
            "latin"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text_box(x: f32, y: f32, text: &str) -> TextBox {
        TextBox {
            bbox: [x, y, x + 50.0, y, x + 50.0, y + 10.0, x, y + 10.0],
            text: text.to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_reading_order() {
        let boxes = vec![
            text_box(200.0, 102.0, "86612413"),
            text_box(10.0, 10.0, "CHAVE:"),
            text_box(10.0, 100.0, "PIN:"),
            text_box(120.0, 12.0, "414979709"),
        ];
        assert_eq!(join_in_reading_order(boxes), "CHAVE:\n414979709\nPIN:\n86612413");
    }

    #[test]
    fn test_model_family() {
        assert_eq!(model_family("eng"), "latin");
        assert_eq!(model_family("POR"), "latin");
        assert_eq!(model_family("jpn"), "latin");
    }
}
