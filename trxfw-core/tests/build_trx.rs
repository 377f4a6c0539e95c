use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use trxfw_core::format::trx::{TrxHeader, TRX_MAGIC};
use trxfw_core::layout::TRX_ALIGNMENT;
use trxfw_core::build::BuildContext;
use trxfw_core::{build_image, FwError, HeaderConfig, ImageFormat};

fn write_random(path: &Path, bytes: usize, seed: u64) -> PathBuf {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<u8> = (0..bytes).map(|_| rng.gen()).collect();
    fs::write(path, data).unwrap();
    path.to_path_buf()
}

fn ne_u32(b: &[u8], off: usize) -> u32 {
    let mut w = [0u8; 4];
    w.copy_from_slice(&b[off..off + 4]);
    u32::from_ne_bytes(w)
}

fn trx_inputs(dir: &Path, sizes: [usize; 3]) -> Vec<PathBuf> {
    ["loader", "kernel", "fs"]
        .iter()
        .zip(sizes)
        .enumerate()
        .map(|(i, (name, size))| write_random(&dir.join(name), size, i as u64 + 1))
        .collect()
}

#[test]
fn misaligned_kernel_layout_matches_arithmetic() {
    let td = tempfile::tempdir().unwrap();
    let inputs = trx_inputs(td.path(), [100, 200, 7800]);
    let out = td.path().join("fw.trx");

    let report = build_image(&inputs, &out, ImageFormat::Trx, &HeaderConfig::default()).unwrap();
    assert_eq!(report.padding, Some(7864));

    let img = fs::read(&out).unwrap();
    assert_eq!(img.len(), 15992);
    assert_eq!(ne_u32(&img, 0), TRX_MAGIC);
    assert_eq!(ne_u32(&img, 4), 15992);
    assert_eq!(ne_u32(&img, 16), 28);
    assert_eq!(ne_u32(&img, 20), 128);
    assert_eq!(ne_u32(&img, 24), 8192);
    assert_eq!(ne_u32(&img, 24) as u64 % TRX_ALIGNMENT, 0);

    // Payloads sit at their offsets; the gap before the last one is zeros.
    assert_eq!(&img[28..128], &fs::read(&inputs[0]).unwrap()[..]);
    assert_eq!(&img[128..328], &fs::read(&inputs[1]).unwrap()[..]);
    assert!(img[328..8192].iter().all(|&b| b == 0));
    assert_eq!(&img[8192..], &fs::read(&inputs[2]).unwrap()[..]);

    // Padding file does not outlive a successful run.
    assert!(!td.path().join("fw.trx.zeros").exists());
}

#[test]
fn aligned_kernel_gets_no_padding() {
    let td = tempfile::tempdir().unwrap();
    // 28 + 100 + 8064 = 8192
    let inputs = trx_inputs(td.path(), [100, 8064, 333]);
    let out = td.path().join("fw.trx");

    let report = build_image(&inputs, &out, ImageFormat::Trx, &HeaderConfig::default()).unwrap();
    assert_eq!(report.padding, None);
    assert_eq!(report.manifest.files.len(), 3);

    let img = fs::read(&out).unwrap();
    assert_eq!(ne_u32(&img, 16), 28);
    assert_eq!(ne_u32(&img, 20), 128);
    assert_eq!(ne_u32(&img, 24), 8192);
    assert_eq!(ne_u32(&img, 4) as usize, img.len());
}

#[test]
fn crc_covers_everything_after_crc_field() {
    let td = tempfile::tempdir().unwrap();
    let inputs = trx_inputs(td.path(), [1000, 3000, 5000]);
    let out = td.path().join("fw.trx");
    build_image(&inputs, &out, ImageFormat::Trx, &HeaderConfig::default()).unwrap();

    let img = fs::read(&out).unwrap();
    let stored = ne_u32(&img, 8);
    assert_eq!(stored, !crc32fast::hash(&img[TrxHeader::CRC_START..]));
}

#[test]
fn rebuild_is_byte_identical() {
    let td = tempfile::tempdir().unwrap();
    let inputs = trx_inputs(td.path(), [512, 4096, 9000]);
    let a = td.path().join("a.trx");
    let b = td.path().join("b.trx");
    build_image(&inputs, &a, ImageFormat::Trx, &HeaderConfig::default()).unwrap();
    build_image(&inputs, &b, ImageFormat::Trx, &HeaderConfig::default()).unwrap();
    assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());

    // Re-running over an existing output overwrites it rather than appending.
    build_image(&inputs, &a, ImageFormat::Trx, &HeaderConfig::default()).unwrap();
    assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
}

#[test]
fn swapping_equal_size_payloads_changes_crc() {
    let td = tempfile::tempdir().unwrap();
    let inputs = trx_inputs(td.path(), [2048, 2048, 100]);
    let swapped = vec![inputs[1].clone(), inputs[0].clone(), inputs[2].clone()];
    let a = td.path().join("a.trx");
    let b = td.path().join("b.trx");
    build_image(&inputs, &a, ImageFormat::Trx, &HeaderConfig::default()).unwrap();
    build_image(&swapped, &b, ImageFormat::Trx, &HeaderConfig::default()).unwrap();

    let ia = fs::read(&a).unwrap();
    let ib = fs::read(&b).unwrap();
    assert_eq!(&ia[12..28], &ib[12..28]);
    assert_ne!(ne_u32(&ia, 8), ne_u32(&ib, 8));
}

#[test]
fn wrong_payload_count_fails_before_writing() {
    let td = tempfile::tempdir().unwrap();
    let a = write_random(&td.path().join("a"), 10, 1);
    let b = write_random(&td.path().join("b"), 10, 2);
    let out = td.path().join("fw.trx");

    let cfg = HeaderConfig::default();
    let err = build_image(&[a, b], &out, ImageFormat::Trx, &cfg).unwrap_err();
    assert!(matches!(
        err,
        FwError::Manifest {
            expected: 3,
            got: 2,
            ..
        }
    ));
    assert!(!out.exists());
}

#[test]
fn missing_payload_is_io_error() {
    let td = tempfile::tempdir().unwrap();
    let a = write_random(&td.path().join("a"), 10, 1);
    let missing = td.path().join("nope");
    let out = td.path().join("fw.trx");

    let inputs = [a.clone(), missing, a];
    let cfg = HeaderConfig::default();
    let err = build_image(&inputs, &out, ImageFormat::Trx, &cfg).unwrap_err();
    assert!(matches!(err, FwError::Io { op: "stat", .. }));
}

#[test]
fn verify_echo_matches_file() {
    let td = tempfile::tempdir().unwrap();
    let inputs = trx_inputs(td.path(), [10, 20, 30]);
    let out = td.path().join("fw.trx");
    let report = build_image(&inputs, &out, ImageFormat::Trx, &HeaderConfig::default()).unwrap();

    assert!(report.verify.magic_ok());
    let text = report.verify.to_string();
    assert!(text.contains("offset[0] = 28"));
    assert!(text.contains("offset[2] = 8192"));
    assert_eq!(report.verify.to_json()["header"]["offsets"][1], 38);
}

#[test]
fn padding_file_is_named_after_output() {
    let td = tempfile::tempdir().unwrap();
    let inputs = trx_inputs(td.path(), [100, 200, 7800]);
    // An unrelated `.zeros` next to the output is left alone.
    let bystander = write_random(&td.path().join(".zeros"), 64, 9);
    let before = fs::read(&bystander).unwrap();

    let out = td.path().join("fw.trx");
    let ctx = BuildContext::new(&inputs, &out, ImageFormat::Trx, &HeaderConfig::default()).unwrap();
    assert_eq!(ctx.padding_path(), td.path().join("fw.trx.zeros"));

    let other = td.path().join("other.trx");
    build_image(&inputs, &out, ImageFormat::Trx, &HeaderConfig::default()).unwrap();
    build_image(&inputs, &other, ImageFormat::Trx, &HeaderConfig::default()).unwrap();
    assert_eq!(fs::read(&out).unwrap(), fs::read(&other).unwrap());
    assert_eq!(fs::read(&bystander).unwrap(), before);
}

#[test]
fn build_report_json_lists_files() {
    let td = tempfile::tempdir().unwrap();
    let inputs = trx_inputs(td.path(), [100, 200, 7800]);
    let out = td.path().join("fw.trx");
    let report = build_image(&inputs, &out, ImageFormat::Trx, &HeaderConfig::default()).unwrap();

    let j = report.to_json();
    assert_eq!(j["padding"], 7864);
    assert_eq!(j["payload_bytes"], 15992 - 28);
    let files = j["files"].as_array().unwrap();
    assert_eq!(files.len(), 4);
    assert_eq!(files[0]["slot"]["payload"], 0);
    assert_eq!(files[2]["slot"], "padding");
    assert_eq!(files[2]["size"], 7864);
    assert_eq!(files[3]["slot"]["payload"], 2);
    assert_eq!(j["image"]["header"]["file_length"], 15992);
}
