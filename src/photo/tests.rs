use super::*;
use crate::metadata::exif_codec::ExifCodec;
use crate::metadata::{tags, Ifd, TagValue};
use image::{GenericImageView, Rgb, RgbImage};
use tempfile::TempDir;

/// Paints a solid block in place of glyphs.
struct BlockPainter;

impl TextPainter for BlockPainter {
    fn paint(&self, canvas: &mut RgbImage, origin: (i32, i32), size: u32, color: TextColor, _text: &str) {
        for y in origin.1.max(0)..(origin.1 + size as i32).min(canvas.height() as i32) {
            for x in origin.0.max(0)..(origin.0 + size as i32).min(canvas.width() as i32) {
                canvas.put_pixel(x as u32, y as u32, Rgb(color.0));
            }
        }
    }
}

fn exif_store(orientation: u16, with_thumbnail: bool) -> MetadataStore {
    let mut store = MetadataStore::new();
    store.set(Ifd::Primary, tags::ORIENTATION, TagValue::Short(vec![orientation]));
    store.set(
        Ifd::Exif,
        tags::DATE_TIME_ORIGINAL,
        TagValue::Ascii("2023:07:04 10:20:30".to_string()),
    );
    if with_thumbnail {
        let thumb = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 12, Rgb([0, 255, 0])));
        store.set_thumbnail(Some(encode_image(&thumb, ImageFormat::Jpeg).unwrap()));
        store.set(Ifd::Thumbnail, tags::ORIENTATION, TagValue::Short(vec![orientation]));
    }
    store
}

fn write_jpeg(dir: &Path, name: &str, w: u32, h: u32, store: &MetadataStore) -> PathBuf {
    let codec = ExifCodec::new();
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([0, 0, 0])));
    let jpeg = encode_image(&img, ImageFormat::Jpeg).unwrap();
    let bytes = embed_exif(jpeg, codec.dump(store).unwrap()).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn test_timestamp_is_resolved_once() {
    let mut photo = Photo::from_parts(
        Path::new("a.jpg"),
        DynamicImage::new_rgb8(4, 4),
        ImageFormat::Jpeg,
        exif_store(1, false),
    );
    assert_eq!(photo.timestamp(), None);

    let first = photo.resolve_timestamp().unwrap();
    assert_eq!(first.canonical(), "2023-07-04 10:20:30");

    // A later metadata edit does not change the cached value
    photo.metadata.set(
        Ifd::Exif,
        tags::DATE_TIME_ORIGINAL,
        TagValue::Ascii("2020:01:01 00:00:00".to_string()),
    );
    assert_eq!(photo.resolve_timestamp().unwrap(), first);

    photo.reset_timestamp();
    assert_eq!(photo.timestamp(), None);
    assert_eq!(photo.resolve_timestamp().unwrap().canonical(), "2020-01-01 00:00:00");
}

#[test]
fn test_open_and_save_keep_metadata() {
    let tmp = TempDir::new().unwrap();
    let codec = ExifCodec::new();
    let src = write_jpeg(tmp.path(), "in.jpg", 20, 10, &exif_store(1, false));

    let photo = Photo::open(&src, &codec).unwrap();
    assert_eq!(photo.format, ImageFormat::Jpeg);
    assert_eq!(photo.image.dimensions(), (20, 10));
    assert_eq!(photo.metadata.date_time_original(), Some("2023:07:04 10:20:30"));

    let dest = tmp.path().join("nested").join("out.jpg");
    photo.save(&dest, &codec).unwrap();
    assert!(!dest.with_extension("tmp").exists());

    let reopened = Photo::open(&dest, &codec).unwrap();
    assert_eq!(reopened.metadata.date_time_original(), Some("2023:07:04 10:20:30"));
    assert_eq!(reopened.image.dimensions(), (20, 10));
}

#[test]
fn test_process_photo_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");
    let codec = ExifCodec::new();
    let src = write_jpeg(tmp.path(), "IMG_0001.jpg", 400, 300, &exif_store(6, true));

    let ctx = PhotoContext {
        codec: &codec,
        painter: &BlockPainter,
        color: TextColor([255, 0, 0]),
        output_dir: &out,
    };
    let processed = process_photo(&src, &ctx).unwrap();

    assert_eq!(processed.path, out.join("IMG_0001.jpg"));
    assert_eq!(processed.timestamp.canonical(), "2023-07-04 10:20:30");

    let result = Photo::open(&processed.path, &codec).unwrap();
    // Rotated upright, tag reset, capture time untouched
    assert_eq!(result.image.dimensions(), (300, 400));
    assert_eq!(result.metadata.orientation(), 1);
    assert_eq!(result.metadata.date_time_original(), Some("2023:07:04 10:20:30"));

    // Stamp near the bottom-right: size 13, anchor (300 - 130, 400 - 15)
    let px = result.image.to_rgb8().get_pixel(176, 391).0;
    assert!(px[0] > 200 && px[1] < 60, "stamp missing: {:?}", px);

    // Thumbnail regenerated from the rotated, stamped pixels
    let thumb = image::load_from_memory(result.metadata.thumbnail().unwrap()).unwrap();
    assert_eq!(thumb.dimensions(), (9, 12));
    assert!(thumb.to_rgb8().get_pixel(1, 1).0[1] < 60);

    // Source untouched
    let source = Photo::open(&src, &codec).unwrap();
    assert_eq!(source.metadata.orientation(), 6);
}

#[test]
fn test_process_photo_without_capture_time_fails() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");
    let codec = ExifCodec::new();
    let mut store = MetadataStore::new();
    store.set(Ifd::Primary, tags::ORIENTATION, TagValue::Short(vec![1]));
    let src = write_jpeg(tmp.path(), "nodate.jpg", 20, 10, &store);

    let ctx = PhotoContext {
        codec: &codec,
        painter: &BlockPainter,
        color: TextColor::default(),
        output_dir: &out,
    };
    assert!(matches!(
        process_photo(&src, &ctx),
        Err(CamStampError::MetadataMissing { .. })
    ));
    assert!(!out.join("nodate.jpg").exists());
}

/// Loads like the EXIF codec, then reports SceneType the way some cameras
/// store it: as a plain BYTE.
struct ByteSceneCodec(ExifCodec);

impl MetadataCodec for ByteSceneCodec {
    fn load(&self, path: &Path) -> Result<MetadataStore> {
        let mut store = self.0.load(path)?;
        store.set(Ifd::Exif, tags::SCENE_TYPE, TagValue::Byte(vec![1]));
        Ok(store)
    }

    fn dump(&self, store: &MetadataStore) -> Result<Vec<u8>> {
        self.0.dump(store)
    }
}

#[test]
fn test_upright_photo_with_byte_scene_type_is_saved() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");
    let src = write_jpeg(tmp.path(), "up.jpg", 40, 30, &exif_store(1, false));
    let codec = ByteSceneCodec(ExifCodec::new());

    let ctx = PhotoContext {
        codec: &codec,
        painter: &BlockPainter,
        color: TextColor::default(),
        output_dir: &out,
    };
    let processed = process_photo(&src, &ctx).unwrap();

    let saved = Photo::open(&processed.path, &ExifCodec::new()).unwrap();
    assert_eq!(saved.metadata.orientation(), 1);
    assert_eq!(saved.metadata.scene_type(), Some(&TagValue::Undefined(vec![1])));
    assert_eq!(saved.image.dimensions(), (40, 30));
}

#[test]
fn test_save_accepts_short_scene_type() {
    let tmp = TempDir::new().unwrap();
    let mut store = exif_store(1, false);
    store.set(Ifd::Exif, tags::SCENE_TYPE, TagValue::Short(vec![1]));
    let photo = Photo::from_parts(
        Path::new("up.jpg"),
        DynamicImage::new_rgb8(8, 8),
        ImageFormat::Jpeg,
        store,
    );

    let dest = tmp.path().join("up.jpg");
    photo.save(&dest, &ExifCodec::new()).unwrap();
    let saved = Photo::open(&dest, &ExifCodec::new()).unwrap();
    assert_eq!(saved.metadata.scene_type(), Some(&TagValue::Undefined(vec![1])));
}
