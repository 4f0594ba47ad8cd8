use icofix::{Frame, IconContainer, Raster};
use std::fs::{self, File};
use std::path::Path;
use std::process::{Command, Output};

//===========================================================================//

fn run_icofix(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_icofix"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn write_default_input(dir: &Path) {
    fs::create_dir(dir.join("icons")).unwrap();
    let rgba = [30u8, 60, 90, 255].repeat(40 * 40);
    let raster = Raster::from_rgba_data(40, 40, rgba);
    let mut container = IconContainer::new();
    container.add_frame(Frame::encode_png(&raster).unwrap());
    let file = File::create(dir.join("icons/icon.ico")).unwrap();
    container.write(file).unwrap();
}

fn read_icon(path: &Path) -> IconContainer {
    IconContainer::read(File::open(path).unwrap()).unwrap()
}

//===========================================================================//

#[test]
fn default_run_prints_one_confirmation_line() {
    let dir = tempfile::tempdir().unwrap();
    write_default_input(dir.path());
    let output = run_icofix(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(0));
    let written = dir.path().join("icons/icon_fixed.ico");
    assert!(written.is_file());
    let container = read_icon(&written);
    assert_eq!(container.frames().len(), 6);
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout, "✅ Icon fixed and saved as icon_fixed.ico\n");
    assert_eq!(stdout.lines().count(), 1);
}

#[test]
fn custom_output_name_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    write_default_input(dir.path());
    let output =
        run_icofix(dir.path(), &["-o", "app.ico", "-s", "32", "-s", "16"]);
    assert_eq!(output.status.code(), Some(0));
    let written = dir.path().join("app.ico");
    let container = read_icon(&written);
    assert_eq!(container.frames().len(), 2);
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout, "✅ Icon fixed and saved as app.ico\n");
}

#[test]
fn missing_input_exits_with_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_icofix(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("error: Failed to decode"), "{}", stderr);
    assert!(stderr.contains("icon.ico"), "{}", stderr);
    assert!(!dir.path().join("icons/icon_fixed.ico").exists());
}

#[test]
fn invalid_size_is_rejected_without_output() {
    let dir = tempfile::tempdir().unwrap();
    write_default_input(dir.path());
    let output = run_icofix(dir.path(), &["-s", "512"]);
    assert_ne!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
    assert!(!dir.path().join("icons/icon_fixed.ico").exists());
}

//===========================================================================//
