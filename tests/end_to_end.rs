//! End-to-end annotation through the public API with the real `image`
//! codec. Glyphs come from a fixed-shape rasterizer so pixel positions are
//! predictable without a font file.
//!
//! Run with: cargo test --test end_to_end

use image::{GenericImageView, RgbImage, RgbaImage};
use infoto::caption::MetadataField;
use infoto::imaging::{
    BackgroundSpec, FontError, FontRasterizer, GlyphBitmap, LayoutMetrics, NamedColor, RustCodec,
};
use infoto::process::{self, AnnotateSettings, ErrorKind};
use infoto::scan;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Every visible character is a solid 3×5 block.
struct Bars;

impl FontRasterizer for Bars {
    fn rasterize_char(&self, _index: usize, ch: char) -> Result<GlyphBitmap, FontError> {
        if ch.is_whitespace() {
            return Ok(GlyphBitmap::blank());
        }
        Ok(GlyphBitmap::new(3, 5, vec![255; 15]).unwrap())
    }
}

fn settings(border: u32) -> AnnotateSettings {
    AnnotateSettings {
        background: BackgroundSpec {
            color: NamedColor::White,
            border_width: border,
        },
        font_color: NamedColor::Black,
        layout: LayoutMetrics::default(),
        separator: " | ".to_string(),
        fields: vec![
            MetadataField::new("Model", "", ""),
            MetadataField::new("FNumber", "f/", ""),
        ],
    }
}

fn pattern(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| image::Rgb([x as u8, y as u8, 77]))
}

/// Little-endian TIFF block with a single IFD0 entry: Model = `model`.
fn model_only_exif(model: &str) -> Vec<u8> {
    let mut value = model.as_bytes().to_vec();
    value.push(0);
    let data_offset = 8 + 2 + 12 + 4;
    let mut tiff = b"II".to_vec();
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&8u32.to_le_bytes());
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x0110u16.to_le_bytes());
    tiff.extend_from_slice(&2u16.to_le_bytes());
    tiff.extend_from_slice(&(value.len() as u32).to_le_bytes());
    tiff.extend_from_slice(&(data_offset as u32).to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());
    tiff.extend_from_slice(&value);
    tiff
}

fn write_jpeg_with_exif(path: &Path, img: &RgbImage, tiff: &[u8]) {
    let mut jpeg = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
        .unwrap();
    let payload_len = (2 + 6 + tiff.len()) as u16;
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&payload_len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(tiff);
    out.extend_from_slice(&jpeg[2..]);
    fs::write(path, out).unwrap();
}

fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn png_gets_border_and_keeps_pixels() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("frame.png");
    pattern(100, 80).save(&source).unwrap();

    let result = process::annotate_image(&RustCodec::new(), &Bars, &source, &settings(10)).unwrap();

    assert_eq!(result.output, tmp.path().join("frame-edited.png"));
    assert_eq!(result.caption, "");
    let out = image::open(&result.output).unwrap().to_rgb8();
    assert_eq!(out.dimensions(), (120, 100));
    assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255]);
    assert_eq!(out.get_pixel(119, 99).0, [255, 255, 255]);
    assert_eq!(out.get_pixel(9, 50).0, [255, 255, 255]);
    assert_eq!(out.get_pixel(10, 10).0, [0, 0, 77]);
    assert_eq!(out.get_pixel(10 + 42, 10 + 17).0, [42, 17, 77]);
    assert_eq!(out.get_pixel(109, 89).0, [99, 79, 77]);
    // Source untouched, no temporary left behind
    assert_eq!(dir_names(tmp.path()), vec!["frame-edited.png", "frame.png"]);
}

#[test]
fn jpeg_caption_from_exif() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("DSCF0042.JPG");
    write_jpeg_with_exif(&source, &pattern(100, 80), &model_only_exif("X100V"));

    let result = process::annotate_image(&RustCodec::new(), &Bars, &source, &settings(10)).unwrap();

    // FNumber is absent and skipped
    assert_eq!(result.caption, "X100V");
    assert_eq!(result.output, tmp.path().join("DSCF0042-edited.JPG"));
    assert_eq!(image::image_dimensions(&result.output).unwrap(), (120, 100));
}

#[test]
fn caption_is_drawn_in_bottom_border() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("shot.png");
    pattern(100, 80).save(&source).unwrap();
    // Same caption as the JPEG case, carried by a PNG so pixels are exact
    let tiff = model_only_exif("X100V");
    let mut png = Vec::new();
    pattern(100, 80)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    fs::write(&source, with_exif_chunk(&png, &tiff)).unwrap();

    let result = process::annotate_image(&RustCodec::new(), &Bars, &source, &settings(10)).unwrap();
    assert_eq!(result.caption, "X100V");

    let out = image::open(&result.output).unwrap().to_rgb8();
    // 5 glyphs × (3 + 4) = 35px wide, 5 rows: left = 60 - 17, top = 5 - 2
    assert_eq!(out.get_pixel(43, 93).0, [0, 0, 0]);
    assert_eq!(out.get_pixel(45, 97).0, [0, 0, 0]);
    assert_eq!(out.get_pixel(42, 93).0, [255, 255, 255]);
    assert_eq!(out.get_pixel(46, 93).0, [255, 255, 255]);
    assert_eq!(out.get_pixel(43, 92).0, [255, 255, 255]);
    assert_eq!(out.get_pixel(43, 98).0, [255, 255, 255]);
}

/// Insert an `eXIf` chunk right after IHDR.
fn with_exif_chunk(png: &[u8], tiff: &[u8]) -> Vec<u8> {
    // signature (8) + IHDR chunk (4 len + 4 type + 13 data + 4 crc)
    let split = 8 + 25;
    let mut out = png[..split].to_vec();
    out.extend_from_slice(&(tiff.len() as u32).to_be_bytes());
    out.extend_from_slice(b"eXIf");
    out.extend_from_slice(tiff);
    out.extend_from_slice(&png_crc(b"eXIf", tiff).to_be_bytes());
    out.extend_from_slice(&png[split..]);
    out
}

fn png_crc(kind: &[u8], data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in kind.iter().chain(data) {
        crc ^= byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

#[test]
fn rgba_png_keeps_alpha() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("cutout.png");
    RgbaImage::from_fn(20, 10, |_, _| image::Rgba([10, 20, 30, 40]))
        .save(&source)
        .unwrap();

    let result = process::annotate_image(&RustCodec::new(), &Bars, &source, &settings(4)).unwrap();

    let out = image::open(&result.output).unwrap();
    assert!(out.color().has_alpha());
    assert_eq!(out.dimensions(), (28, 18));
    let out = out.to_rgba8();
    assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255, 255]);
    assert_eq!(out.get_pixel(4, 4).0, [10, 20, 30, 40]);
}

#[test]
fn corrupt_source_leaves_no_output() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("broken.jpg");
    fs::write(&source, b"definitely not a jpeg").unwrap();

    let err = process::annotate_image(&RustCodec::new(), &Bars, &source, &settings(4)).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CodecOpenFailure);
    assert_eq!(dir_names(tmp.path()), vec!["broken.jpg"]);
}

#[test]
fn directory_batch() {
    let tmp = TempDir::new().unwrap();
    pattern(12, 8).save(tmp.path().join("a.png")).unwrap();
    pattern(8, 12).save(tmp.path().join("b.tif")).unwrap();
    fs::write(tmp.path().join("notes.txt"), "not an image").unwrap();

    let images = scan::resolve_targets(tmp.path()).unwrap();
    assert_eq!(images.len(), 2);

    let report = process::annotate_batch_with(
        &RustCodec::new(),
        &images,
        &settings(2),
        || Ok::<_, FontError>(Bars),
        false,
        None,
    )
    .unwrap();
    assert_eq!(report.annotated.len(), 2);
    assert_eq!(image::image_dimensions(tmp.path().join("a-edited.png")).unwrap(), (16, 12));
    assert_eq!(image::image_dimensions(tmp.path().join("b-edited.tif")).unwrap(), (12, 16));

    // A second scan ignores the outputs
    assert_eq!(scan::collect_images(tmp.path()).unwrap().len(), 2);
}
