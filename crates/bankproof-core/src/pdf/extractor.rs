//! PDF text and image extraction using lopdf and pdf-extract.

use std::collections::HashSet;

use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, Rgba};
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{PdfTextSource, Result};
use crate::error::PdfError;
use crate::models::config::PdfConfig;

/// A loaded PDF, decrypted when an empty password is enough.
pub struct PdfDocument {
    document: Document,
    raw_data: Vec<u8>,
}

impl PdfDocument {
    /// Parse a PDF from bytes.
    pub fn load(data: &[u8], config: &PdfConfig) -> Result<Self> {
        let mut document = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        let raw_data = if document.is_encrypted() {
            if !config.decrypt_empty_password || document.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract reads bytes, so hand it the decrypted document
            let mut decrypted = Vec::new();
            document
                .save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        let page_count = document.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        Ok(Self { document, raw_data })
    }

    /// Number of pages.
    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Extract the embedded text layer of the whole document.
    pub fn extract_text(&self) -> Result<String> {
        pdf_extract::extract_text_from_mem(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }

    /// Extract every decodable image in the document, in page order.
    pub fn extract_images(&self) -> Vec<DynamicImage> {
        let mut images = Vec::new();
        let mut seen: HashSet<ObjectId> = HashSet::new();

        for (page_number, page_id) in self.document.get_pages() {
            let Some(resources) = self.page_resources(page_id) else {
                continue;
            };
            let Ok(xobjects) = resources.get(b"XObject") else {
                continue;
            };
            let Ok((_, Object::Dictionary(xobj_dict))) = self.document.dereference(xobjects) else {
                continue;
            };

            for (_name, obj_ref) in xobj_dict.iter() {
                if let Object::Reference(id) = obj_ref {
                    if !seen.insert(*id) {
                        continue;
                    }
                }
                if let Ok((_, obj)) = self.document.dereference(obj_ref) {
                    if let Some(img) = self.decode_image(obj) {
                        images.push(img);
                    }
                }
            }
            trace!("Page {}: {} images so far", page_number, images.len());
        }

        // Some scanners write images without wiring them into page resources
        if images.is_empty() {
            debug!("No XObject images found on pages, scanning all objects");
            for (id, object) in self.document.objects.iter() {
                if seen.insert(*id) {
                    if let Some(img) = self.decode_image(object) {
                        images.push(img);
                    }
                }
            }
        }

        debug!("Found {} images in document", images.len());
        images
    }

    fn decode_image(&self, obj: &Object) -> Option<DynamicImage> {
        let Object::Stream(stream) = obj else {
            return None;
        };
        let dict = &stream.dict;

        if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
            return None;
        }

        let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
        let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
        trace!("Found image object: {}x{}", width, height);

        if let Ok(filter) = dict.get(b"Filter") {
            let filter_name = match filter {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                _ => None,
            };

            match filter_name {
                Some(b"DCTDecode") => {
                    return image::load_from_memory_with_format(
                        &stream.content,
                        image::ImageFormat::Jpeg,
                    )
                    .ok();
                }
                Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                    trace!("Skipping unsupported image filter");
                    return None;
                }
                _ => {}
            }
        }

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());

        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| match o {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                Object::Reference(r) => self
                    .document
                    .get_object(*r)
                    .ok()
                    .and_then(|o| o.as_name().ok()),
                _ => None,
            })
            .unwrap_or(b"DeviceRGB");

        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8);

        raw_to_image(&data, width, height, color_space, bits)
    }

    /// Resources dictionary for a page, following `Parent` inheritance.
    fn page_resources(&self, node_id: ObjectId) -> Option<lopdf::Dictionary> {
        let Object::Dictionary(dict) = self.document.get_object(node_id).ok()? else {
            return None;
        };

        if let Ok(resources) = dict.get(b"Resources") {
            if let Ok((_, Object::Dictionary(res_dict))) = self.document.dereference(resources) {
                return Some(res_dict.clone());
            }
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => self.page_resources(*parent_id),
            _ => None,
        }
    }
}

fn raw_to_image(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
    bits_per_component: i64,
) -> Option<DynamicImage> {
    if bits_per_component != 8 {
        trace!("Unsupported bits per component: {}", bits_per_component);
        return None;
    }

    let pixels = (width as usize) * (height as usize);
    let rgba: Vec<u8> = match color_space {
        b"DeviceRGB" | b"RGB" if data.len() >= pixels * 3 => data[..pixels * 3]
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect(),
        b"DeviceGray" | b"G" if data.len() >= pixels => data[..pixels]
            .iter()
            .flat_map(|&g| [g, g, g, 255])
            .collect(),
        _ => {
            trace!("Could not decode image: data_len={}, pixels={}", data.len(), pixels);
            return None;
        }
    };

    ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba).map(DynamicImage::ImageRgba8)
}

/// [`PdfTextSource`] backed by lopdf + pdf-extract, run on a blocking thread.
#[derive(Debug, Clone, Default)]
pub struct PdfTextExtractor {
    config: PdfConfig,
}

impl PdfTextExtractor {
    pub fn new(config: PdfConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PdfTextSource for PdfTextExtractor {
    async fn extract_text(&self, data: &[u8]) -> Result<String> {
        let data = data.to_vec();
        let config = self.config.clone();
        let dispatch = tracing::dispatcher::get_default(|d| d.clone());

        // pdf-extract can panic on malformed fonts; a panic surfaces as a JoinError
        tokio::task::spawn_blocking(move || {
            tracing::dispatcher::with_default(&dispatch, || -> Result<String> {
                let document = PdfDocument::load(&data, &config)?;
                let text = document.extract_text()?;
                debug!("PDF text layer: {} chars from {} pages", text.len(), document.page_count());
                Ok(text)
            })
        })
        .await
        .map_err(|e| PdfError::TextExtraction(format!("extraction task failed: {}", e)))?
    }
}
