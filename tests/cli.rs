use std::path::Path;
use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use rstest::*;
use serde_json::Value;

macro_rules! cargo_run {
    ($cmd:expr, $($args:expr),*) => {
        {
            let mut cmd = Command::cargo_bin($cmd)?;
            $(cmd.arg($args);)*
            cmd.assert()
        }
    };
}

fn write_photo(path: &Path, color: [u8; 3]) -> Result<()> {
    RgbImage::from_pixel(64, 48, Rgb(color)).save(path)?;
    Ok(())
}

/// ingest 的 JSON 输出是回执数组，取出 ID 列表
fn ingest_ids(conf_dir: &Path, photo: &Path, session: &str) -> Result<Vec<String>> {
    let output = Command::cargo_bin("photobooth")?
        .args(["-c", conf_dir.to_str().unwrap(), "-f", "json", "ingest"])
        .arg(photo)
        .args(["--session", session, "--seed", "7"])
        .output()?;
    assert!(output.status.success(), "ingest failed: {:?}", output);
    let receipts: Value = serde_json::from_slice(&output.stdout)?;
    Ok(receipts
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect())
}

#[test]
fn ingest_then_list_sessions() -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    let photo = conf_dir.path().join("red.png");
    write_photo(&photo, [255, 0, 0])?;

    cargo_run!("photobooth", "-c", conf_dir.path(), "ingest", &photo, "-F", "bw", "--seed", "7")
        .success();
    cargo_run!("photobooth", "-c", conf_dir.path(), "-f", "json", "sessions")
        .success()
        .stdout(predicate::str::contains("\"image_count\": 1"));
    Ok(())
}

#[test]
fn unknown_filters_are_skipped_in_receipt() -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    let photo = conf_dir.path().join("red.png");
    write_photo(&photo, [255, 0, 0])?;

    cargo_run!(
        "photobooth",
        "-c",
        conf_dir.path(),
        "-f",
        "json",
        "ingest",
        &photo,
        "-F",
        "sparkle,bw"
    )
    .success()
    .stdout(predicate::str::contains("black_white").and(predicate::str::contains("sparkle").not()));
    Ok(())
}

#[rstest]
#[case::classic("classic")]
#[case::polaroid("polaroid")]
#[case::distressed("distressed")]
fn strip_has_fixed_canvas(#[case] frame: &str) -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    let red = conf_dir.path().join("red.png");
    let blue = conf_dir.path().join("blue.png");
    write_photo(&red, [220, 30, 30])?;
    write_photo(&blue, [30, 30, 220])?;

    ingest_ids(conf_dir.path(), &red, "party")?;
    ingest_ids(conf_dir.path(), &blue, "party")?;

    let out = conf_dir.path().join("strip.jpg");
    cargo_run!(
        "photobooth",
        "-c",
        conf_dir.path(),
        "strip",
        "party",
        "--frame",
        frame,
        "--seed",
        "7",
        "-o",
        &out
    )
    .success();

    let strip = image::open(&out)?;
    assert_eq!((strip.width(), strip.height()), (400, 1200));

    // 会话统计里出现一条拼条
    cargo_run!("photobooth", "-c", conf_dir.path(), "-f", "json", "sessions")
        .success()
        .stdout(
            predicate::str::contains("\"image_count\": 2")
                .and(predicate::str::contains("\"strip_count\": 1")),
        );
    Ok(())
}

#[test]
fn strip_of_unknown_session_fails() -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    cargo_run!("photobooth", "-c", conf_dir.path(), "strip", "ghost")
        .failure()
        .stderr(predicate::str::contains("no images found for session ghost"));
    Ok(())
}

#[rstest]
#[case::l2("l2")]
#[case::cosine("cosine")]
fn similar_excludes_the_target(#[case] metric: &str) -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    let mut ids = vec![];
    for (name, color) in [("a.png", [250, 10, 10]), ("b.png", [249, 10, 10]), ("c.png", [245, 10, 10])]
    {
        let photo = conf_dir.path().join(name);
        write_photo(&photo, color)?;
        ids.extend(ingest_ids(conf_dir.path(), &photo, "s")?);
    }

    cargo_run!(
        "photobooth",
        "-c",
        conf_dir.path(),
        "--metric",
        metric,
        "-f",
        "json",
        "similar",
        &ids[0],
        "-n",
        "2"
    )
    .success()
    .stdout(
        predicate::str::contains(&ids[1])
            .and(predicate::str::contains(&ids[2]))
            .and(predicate::str::contains(&ids[0]).not()),
    );
    Ok(())
}

#[test]
fn similar_with_unknown_id_fails() -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    cargo_run!("photobooth", "-c", conf_dir.path(), "similar", "no-such-id")
        .failure()
        .stderr(predicate::str::contains("artifact not found"));
    Ok(())
}

#[test]
fn show_exports_the_processed_image() -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    let photo = conf_dir.path().join("red.png");
    write_photo(&photo, [255, 0, 0])?;
    let ids = ingest_ids(conf_dir.path(), &photo, "s")?;

    let out = conf_dir.path().join("export.png");
    cargo_run!("photobooth", "-c", conf_dir.path(), "show", &ids[0], "-o", &out).success();

    // 没套滤镜，导出的 PNG 和上传内容逐像素一致
    let exported = image::open(&out)?.to_rgb8();
    assert_eq!(exported.dimensions(), (64, 48));
    assert_eq!(exported.get_pixel(10, 10), &Rgb([255, 0, 0]));
    Ok(())
}

#[test]
fn ingest_walks_directories() -> Result<()> {
    let conf_dir = assert_fs::TempDir::new()?;
    let album = conf_dir.path().join("album");
    std::fs::create_dir(&album)?;
    write_photo(&album.join("one.png"), [10, 200, 10])?;
    write_photo(&album.join("two.png"), [10, 10, 200])?;
    std::fs::write(album.join("notes.txt"), "not a photo")?;

    cargo_run!("photobooth", "-c", conf_dir.path(), "ingest", &album, "--session", "walk")
        .success();
    cargo_run!("photobooth", "-c", conf_dir.path(), "-f", "json", "sessions")
        .success()
        .stdout(predicate::str::contains("\"image_count\": 2"));
    Ok(())
}
