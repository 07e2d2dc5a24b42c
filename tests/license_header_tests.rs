// SPDX-License-Identifier: GPL-3.0-only

//! Every source file carries the package licence

use std::fs;
use std::path::{Path, PathBuf};

fn rust_files(dir: &Path, files: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            rust_files(&path, files);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path);
        }
    }
}

#[test]
fn test_source_headers_match_package_license() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let header = format!(
        "// SPDX-License-Identifier: {}",
        env!("CARGO_PKG_LICENSE")
    );

    let mut files = vec![root.join("build.rs")];
    rust_files(&root.join("src"), &mut files);
    rust_files(&root.join("tests"), &mut files);
    assert!(files.len() > 10);

    for file in files {
        let text = fs::read_to_string(&file).unwrap();
        let first = text.lines().next().unwrap_or_default();
        assert_eq!(first, header, "{}", file.display());
    }
}
