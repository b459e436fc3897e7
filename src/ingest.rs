//! PDF ingestion.
//!
//! Every `*.pdf` in the input directory becomes one [`Document`]: page
//! texts are flattened into a single line and embedded images are written
//! next to each other in the image directory as
//! `<stem>_page<N>_img<M>.<ext>`. JPEG, JPEG 2000, JBIG2 and CCITT images
//! keep their stored bytes; other rasters are written as PNG.

use crate::document::Document;
use crate::error::{BenchError, Result};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Object, ObjectId, Stream};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Maximum number of `Parent` hops followed when looking for inherited resources.
const MAX_PARENT_DEPTH: usize = 32;

/// Extracts documents from a directory of PDFs.
#[derive(Debug, Clone)]
pub struct PdfIngestor {
    image_dir: PathBuf,
}

impl PdfIngestor {
    /// Create an ingestor writing images to `image_dir`.
    pub fn new(image_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: image_dir.into(),
        }
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Ingest every PDF in `pdf_dir`, assigning ids 1..N in file-name order.
    pub fn ingest_dir(&self, pdf_dir: &Path) -> Result<Vec<Document>> {
        let files = list_pdfs(pdf_dir)?;
        info!(count = files.len(), dir = %pdf_dir.display(), "ingesting PDFs");

        fs::create_dir_all(&self.image_dir).map_err(|e| BenchError::io(&self.image_dir, e))?;

        files
            .iter()
            .enumerate()
            .map(|(i, path)| self.ingest_file(path, i + 1))
            .collect()
    }

    /// Ingest a single PDF as document `id`.
    ///
    /// The image directory must already exist.
    pub fn ingest_file(&self, path: &Path, id: usize) -> Result<Document> {
        let pdf = lopdf::Document::load(path).map_err(|e| BenchError::pdf(path, e))?;

        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| BenchError::pdf(path, "file name is not valid UTF-8"))?
            .to_string();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled");

        let mut page_texts = Vec::new();
        let mut images = Vec::new();

        for (page_number, page_id) in pdf.get_pages() {
            let text = pdf
                .extract_text(&[page_number])
                .map_err(|e| BenchError::pdf(path, format!("page {}: {}", page_number, e)))?;
            page_texts.push(text);

            let written = self.write_page_images(&pdf, page_id, stem, page_number)?;
            images.extend(written);
        }

        let document = Document::from_pages(id, file_name, &page_texts, images);
        debug!(
            id = document.id,
            file = %document.file_name,
            pages = page_texts.len(),
            words = document.word_count(),
            images = document.images.len(),
            "ingested document"
        );

        Ok(document)
    }

    /// Write every image XObject of a page, returning the file names.
    fn write_page_images(
        &self,
        pdf: &lopdf::Document,
        page_id: ObjectId,
        stem: &str,
        page_number: u32,
    ) -> Result<Vec<String>> {
        let Some(resources) = page_resources(pdf, page_id) else {
            return Ok(Vec::new());
        };

        let mut streams = Vec::new();
        collect_images(pdf, resources, &mut HashSet::new(), &mut streams);

        let mut names = Vec::with_capacity(streams.len());
        for stream in streams {
            let (bytes, ext) = image_payload(pdf, stream);
            let name = image_file_name(stem, page_number, names.len() + 1, ext);
            let path = self.image_dir.join(&name);
            fs::write(&path, &*bytes).map_err(|e| BenchError::io(&path, e))?;

            names.push(name);
        }

        Ok(names)
    }
}

/// List `*.pdf` files (case-insensitive, not recursive) sorted by file name.
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(BenchError::InputDirNotFound(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| BenchError::io(dir, std::io::Error::from(e)))?;
        let is_pdf = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

        if entry.file_type().is_file() && is_pdf {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// `<stem>_page<page>_img<index>.<ext>`
pub fn image_file_name(stem: &str, page: u32, index: usize, ext: &str) -> String {
    format!("{}_page{}_img{}.{}", stem, page, index, ext)
}

/// File extension of a standalone image codec among a stream's filters.
pub fn codec_extension(filters: &[Vec<u8>]) -> Option<&'static str> {
    filters.iter().rev().find_map(|f| match f.as_slice() {
        b"DCTDecode" | b"DCT" => Some("jpeg"),
        b"JPXDecode" => Some("jpx"),
        b"JBIG2Decode" => Some("jb2"),
        b"CCITTFaxDecode" | b"CCF" => Some("ccitt"),
        _ => None,
    })
}

/// Collect the image XObjects reachable from `resources`.
///
/// Form XObjects are searched through their own resources. Each indirect
/// object is visited once, so shared images are listed once and reference
/// cycles terminate.
fn collect_images<'a>(
    pdf: &'a lopdf::Document,
    resources: &'a Dictionary,
    visited: &mut HashSet<ObjectId>,
    images: &mut Vec<&'a Stream>,
) {
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve_dict(pdf, obj))
    else {
        return;
    };

    for (_, value) in xobjects.iter() {
        let stream = match value {
            Object::Reference(id) => {
                if !visited.insert(*id) {
                    continue;
                }
                pdf.get_object(*id).and_then(Object::as_stream)
            }
            other => other.as_stream(),
        };
        let Ok(stream) = stream else {
            continue;
        };

        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => images.push(stream),
            Ok(b"Form") => {
                if let Some(form_resources) = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|r| resolve_dict(pdf, r))
                {
                    collect_images(pdf, form_resources, visited, images);
                }
            }
            _ => {}
        }
    }
}

/// Bytes and extension written for one image stream.
///
/// Codec streams are written as stored. Other rasters are decoded and saved
/// as PNG; a raster that cannot be decoded keeps its raw bytes as `.bin`.
fn image_payload<'a>(pdf: &lopdf::Document, stream: &'a Stream) -> (Cow<'a, [u8]>, &'static str) {
    let filters = stream_filters(&stream.dict);
    if let Some(ext) = codec_extension(&filters) {
        return (Cow::Borrowed(stream.content.as_slice()), ext);
    }

    match encode_png(pdf, stream, &filters) {
        Some(png) => (Cow::Owned(png), "png"),
        None => {
            debug!(?filters, "image stream kept as raw bytes");
            (Cow::Borrowed(stream.content.as_slice()), "bin")
        }
    }
}

/// Re-encode an 8-bit gray, RGB or CMYK raster as PNG.
fn encode_png(pdf: &lopdf::Document, stream: &Stream, filters: &[Vec<u8>]) -> Option<Vec<u8>> {
    let dict = &stream.dict;
    let width = u32::try_from(dict.get(b"Width").and_then(Object::as_i64).ok()?).ok()?;
    let height = u32::try_from(dict.get(b"Height").and_then(Object::as_i64).ok()?).ok()?;
    let bits = dict
        .get(b"BitsPerComponent")
        .and_then(Object::as_i64)
        .unwrap_or(8);
    if bits != 8 {
        return None;
    }
    let components = color_components(pdf, dict.get(b"ColorSpace").ok()?)?;

    let data = raster_bytes(stream, filters)?;
    let needed = (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(components)?;
    if needed == 0 || data.len() < needed {
        return None;
    }
    let data = &data[..needed];

    let image = match components {
        1 => DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, data.to_vec())?),
        3 => DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, data.to_vec())?),
        4 => DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, cmyk_to_rgb(data))?),
        _ => return None,
    };

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .ok()?;
    Some(png)
}

/// Decoded sample bytes of an image stream.
fn raster_bytes(stream: &Stream, filters: &[Vec<u8>]) -> Option<Vec<u8>> {
    if filters.is_empty() {
        return Some(stream.content.clone());
    }

    // lopdf refuses to decode streams whose subtype is Image.
    let mut plain = stream.clone();
    plain.dict.remove(b"Subtype");
    plain.decompressed_content().ok()
}

/// Components per pixel of a color space, for the spaces PNG can hold.
fn color_components(pdf: &lopdf::Document, space: &Object) -> Option<usize> {
    match resolve(pdf, space)? {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Some(1),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Some(3),
            b"DeviceCMYK" | b"CMYK" => Some(4),
            _ => None,
        },
        Object::Array(items) => match items.first()?.as_name().ok()? {
            b"ICCBased" => {
                let profile = resolve(pdf, items.get(1)?)?.as_stream().ok()?;
                let n = profile.dict.get(b"N").and_then(Object::as_i64).ok()?;
                usize::try_from(n).ok()
            }
            b"CalGray" => Some(1),
            b"CalRGB" => Some(3),
            _ => None,
        },
        _ => None,
    }
}

fn cmyk_to_rgb(data: &[u8]) -> Vec<u8> {
    data.chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - u16::from(px[3]);
            [px[0], px[1], px[2]].map(|c| ((255 - u16::from(c)) * k / 255) as u8)
        })
        .collect()
}

fn stream_filters(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(|n| n.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Follow a reference, if any.
fn resolve<'a>(pdf: &'a lopdf::Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => pdf.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Follow a reference (if any) to a dictionary.
fn resolve_dict<'a>(pdf: &'a lopdf::Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Reference(id) => pdf.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Resources of a page, inherited from the page tree when the page has none.
fn page_resources(pdf: &lopdf::Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = pdf.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_PARENT_DEPTH {
        if let Some(resources) = node.get(b"Resources").ok().and_then(|r| resolve_dict(pdf, r)) {
            return Some(resources);
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = pdf.get_dictionary(parent).ok()?;
    }

    None
}
