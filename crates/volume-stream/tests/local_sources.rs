//! Integration tests: built-in volumes and local NRRD files.

mod common;

use common::{pipeline, request, url, MockFetcher};
use test_utils::{
    create_test_volume, gzip_compress, i16_bytes, locators, write_temp_file,
    NrrdBuilder,
};
use volume_stream::{
    BuiltinVolume, ElementType, FocusPoint, LoadRequest, Url, VolumeDims, VolumeError,
    BUILTIN_SIZE,
};

fn file_url(file: &tempfile::NamedTempFile) -> Url {
    Url::from_file_path(file.path()).unwrap()
}

#[tokio::test]
async fn test_builtin_volumes() {
    let pipeline = pipeline(MockFetcher::new());

    for (locator, volume) in [
        (locators::HELIX, BuiltinVolume::Helix),
        (locators::BOX, BuiltinVolume::Box),
        (locators::COLORMAP, BuiltinVolume::Colormap),
    ] {
        let req = request(locator, BUILTIN_SIZE)
            .with_element_type("float32")
            .at_focus(FocusPoint::new(1.0, 2.0, 3.0));
        let result = pipeline.load(&req).await;

        assert!(result.success, "{} failed: {:?}", locator, result.error);
        assert_eq!(result.element_type, Some(ElementType::UInt8));
        assert_eq!(result.dims, VolumeDims::cube(BUILTIN_SIZE));
        assert_eq!(result.data, volume.generate());
        assert_eq!(result.local_focus, FocusPoint::origin());
        assert_eq!(result.global_focus, FocusPoint::new(1.0, 2.0, 3.0));
    }
}

#[tokio::test]
async fn test_builtin_with_larger_dims_is_padded() {
    let dims = VolumeDims::new(BUILTIN_SIZE, BUILTIN_SIZE, BUILTIN_SIZE + 1);
    let req = LoadRequest::new(url(locators::COLORMAP), dims);
    let result = pipeline(MockFetcher::new()).load(&req).await;

    assert!(result.success);
    assert_eq!(Some(result.data.len()), dims.voxel_count());
    let generated = BUILTIN_SIZE.pow(3);
    assert!(result.data[generated..].iter().all(|&v| v == 0));
}

#[tokio::test]
async fn test_builtin_with_smaller_dims_is_not_truncated() {
    let result = pipeline(MockFetcher::new())
        .load(&request(locators::BOX, 16))
        .await;
    assert!(result.success);
    assert_eq!(result.data.len(), BUILTIN_SIZE.pow(3));
}

#[tokio::test]
async fn test_oversized_request_dims_fail() {
    let pipeline = pipeline(MockFetcher::new());
    for dims in [
        VolumeDims::new(1 << 20, 1 << 20, 1 << 20),
        VolumeDims::new(usize::MAX, 2, 1),
    ] {
        let req = LoadRequest::new(url(locators::BOX), dims);
        let result = pipeline.load(&req).await;

        assert!(!result.success);
        assert!(result.data.is_empty());
        assert!(matches!(result.error, Some(VolumeError::VolumeTooLarge(_))));
    }
}

#[tokio::test]
async fn test_local_raw_uint8() {
    let volume = create_test_volume(8, 8, 8);
    let file = write_temp_file(
        &NrrdBuilder::new("uchar", &[8, 8, 8])
            .payload(volume.clone())
            .build(),
        ".nrrd",
    );

    let req = LoadRequest::new(file_url(&file), VolumeDims::cube(8));
    let result = pipeline(MockFetcher::new()).load(&req).await;

    assert!(result.success, "load failed: {:?}", result.error);
    assert_eq!(result.element_type, Some(ElementType::UInt8));
    assert_eq!(result.data, volume);
}

#[tokio::test]
async fn test_local_gzip_int16_is_rescaled() {
    let samples: Vec<i16> = vec![-300, -100, 100, 300];
    let file = write_temp_file(
        &NrrdBuilder::new("short", &[2, 2, 1])
            .encoding("gzip")
            .endian("little")
            .payload(gzip_compress(&i16_bytes(&samples)))
            .build(),
        ".nrrd",
    );

    let req = LoadRequest::new(file_url(&file), VolumeDims::new(2, 2, 1));
    let result = pipeline(MockFetcher::new()).load(&req).await;

    assert!(result.success, "load failed: {:?}", result.error);
    assert_eq!(result.element_type, Some(ElementType::Int16));
    // 200 * 255 / 600 = 85
    assert_eq!(result.data, vec![0, 85, 170, 255]);
}

#[tokio::test]
async fn test_local_type_falls_back_to_request_hint() {
    // 32-bit integers are not a supported element type; the hint decides.
    let payload = vec![1u8, 0, 0, 0, 2, 0, 0, 0];
    let file = write_temp_file(
        &NrrdBuilder::new("int", &[2]).payload(payload.clone()).build(),
        ".nrrd",
    );

    let req = LoadRequest::new(file_url(&file), VolumeDims::new(8, 1, 1)).with_element_type("uint8");
    let result = pipeline(MockFetcher::new()).load(&req).await;

    assert!(result.success);
    assert_eq!(result.element_type, Some(ElementType::UInt8));
    assert_eq!(result.data, payload);
}

#[tokio::test]
async fn test_local_malformed_file_fails() {
    let file = write_temp_file(b"this is not a volume", ".nrrd");
    let req = LoadRequest::new(file_url(&file), VolumeDims::cube(2));
    let result = pipeline(MockFetcher::new()).load(&req).await;

    assert!(!result.success);
    assert!(result.data.is_empty());
    assert!(matches!(result.error, Some(VolumeError::LocalDecode(_))));
    assert_eq!(result.source, req.source);
}

#[tokio::test]
async fn test_local_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = Url::from_file_path(dir.path().join("absent.nrrd")).unwrap();
    let result = pipeline(MockFetcher::new())
        .load(&LoadRequest::new(missing, VolumeDims::cube(2)))
        .await;

    assert!(!result.success);
    assert!(matches!(result.error, Some(VolumeError::Io(_))));
}

#[tokio::test]
async fn test_unsupported_scheme_fails() {
    let fetcher = MockFetcher::new();
    let result = pipeline(fetcher.clone())
        .load(&request("s3://bucket/volume.zarr", 4))
        .await;

    assert!(!result.success);
    assert!(matches!(
        result.error,
        Some(VolumeError::UnsupportedSource(_))
    ));
    assert!(fetcher.requested().is_empty());
}
