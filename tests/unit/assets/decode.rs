use std::io::Cursor;
use std::path::PathBuf;

use super::*;

fn encode_png(width: u32, height: u32, rgba: Vec<u8>) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(width, height, rgba).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_image_keeps_straight_alpha() {
    let png = encode_png(2, 1, vec![100, 50, 200, 128, 1, 2, 3, 255]);
    let decoded = decode_image(&png).unwrap();
    assert!(decoded.has_shape(2, 1, PixelFormat::Rgba8));
    assert_eq!(decoded.data, vec![100, 50, 200, 128, 1, 2, 3, 255]);
}

#[test]
fn decode_image_rejects_garbage() {
    let err = decode_image(b"not an image").unwrap_err();
    assert!(matches!(err, FilterError::Other(_)));
}

#[test]
fn save_png_then_load_image() {
    let dir = PathBuf::from("target").join("unit_decode");
    let path = dir.join("nested").join("out.png");
    let _ = std::fs::remove_file(&path);

    let buf = PixelBuffer::from_rgba8(3, 2, (0u8..24).collect()).unwrap();
    save_png(&path, &buf).unwrap();
    let back = load_image(&path).unwrap();
    assert_eq!(back, buf);
}

#[test]
fn load_image_missing_file_names_path() {
    let err = load_image(Path::new("target/does-not-exist.png")).unwrap_err();
    assert!(err.to_string().contains("does-not-exist.png"));
}
