//! Library resolution and sketch staging.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::args::CompilerArgs;
use crate::error::{Result, StageError};
use crate::layout;
use crate::resolve::{resolve_dir, resolve_in, LibraryReference, ResolvedDir};
use crate::shim;
use crate::walk::{copy_tree, is_native, list_files, SWIFT_EXTS};

/// Inputs for one staging run.
#[derive(Debug, Clone)]
pub struct StageRequest {
    /// Swift core sources, always compiled first.
    pub core_dir: PathBuf,
    /// Roots searched for Swift libraries, in priority order.
    pub managed_roots: Vec<PathBuf>,
    /// Root searched for native counterparts shipped with the tool.
    pub native_root: PathBuf,
    /// Sketch directory; staged libraries land in `libraries/` below it.
    pub sketch_dir: PathBuf,
    pub libraries: Vec<String>,
    pub sketchbook_root: Option<PathBuf>,
    pub sketchbook_libraries: Vec<String>,
}

impl StageRequest {
    /// Request using the standard tool and project layout.
    pub fn new(tool_root: &Path, project_root: &Path, sketch_dir: &Path) -> Self {
        Self {
            core_dir: tool_root.join("swift").join("core"),
            managed_roots: vec![
                tool_root.join("swift").join("libs"),
                project_root.join("libs"),
            ],
            native_root: tool_root.join("arduino").join("libs"),
            sketch_dir: sketch_dir.to_path_buf(),
            libraries: Vec::new(),
            sketchbook_root: None,
            sketchbook_libraries: Vec::new(),
        }
    }

    pub fn with_libraries(mut self, libraries: Vec<String>) -> Self {
        self.libraries = libraries;
        self
    }

    pub fn with_sketchbook(mut self, root: Option<PathBuf>, libraries: Vec<String>) -> Self {
        self.sketchbook_root = root;
        self.sketchbook_libraries = libraries;
        self
    }
}

/// One Swift library and what was staged for it.
#[derive(Debug, Clone, Serialize)]
pub struct StagedLibrary {
    pub reference: LibraryReference,
    pub swift_files: usize,
    /// Leaf names staged under `libraries/`.
    pub staged_dirs: Vec<String>,
}

/// Result of a sketchbook lookup; only reported, never copied.
#[derive(Debug, Clone, Serialize)]
pub struct SketchbookLibrary {
    pub name: String,
    pub found: Option<ResolvedDir>,
}

/// Everything a staging run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StagedLibrarySet {
    pub core_files: usize,
    pub libraries: Vec<StagedLibrary>,
    pub sketchbook: Vec<SketchbookLibrary>,
    pub shims: Vec<String>,
    pub collisions: Vec<String>,
    pub promoted: Vec<String>,
    /// SHA-256 over the source arguments and generated root files.
    pub fingerprint: String,
}

/// Resolve every requested library, append Swift sources to `args` and stage
/// native sources into the sketch.
///
/// Sources are appended as: core, then each library in request order. A
/// library missing from every managed root is fatal; a missing native
/// counterpart is not.
pub fn resolve_and_stage(request: &StageRequest, args: &mut CompilerArgs) -> Result<StagedLibrarySet> {
    let mut set = StagedLibrarySet::default();

    let core = if request.core_dir.is_dir() {
        list_files(&request.core_dir, SWIFT_EXTS)?
    } else {
        Vec::new()
    };
    if core.is_empty() {
        return Err(StageError::NoCoreSources {
            path: request.core_dir.clone(),
        });
    }
    set.core_files = core.len();
    args.extend(core)?;

    if request.libraries.is_empty() {
        info!("no Swift libraries requested; core only");
    } else {
        info!(count = request.libraries.len(), "including Swift libraries");
    }

    for name in &request.libraries {
        let staged = stage_library(request, name, args, &mut set)?;
        set.libraries.push(staged);
    }

    set.sketchbook = report_sketchbook(request)?;
    set.fingerprint = fingerprint(args, &request.sketch_dir, &set)?;
    Ok(set)
}

fn stage_library(
    request: &StageRequest,
    name: &str,
    args: &mut CompilerArgs,
    set: &mut StagedLibrarySet,
) -> Result<StagedLibrary> {
    let managed = resolve_in(&request.managed_roots, name)?.ok_or_else(|| {
        StageError::LibraryNotFound {
            name: name.to_string(),
            searched: request.managed_roots.clone(),
        }
    })?;

    let swift = list_files(&managed.path, SWIFT_EXTS)?;
    if swift.is_empty() {
        return Err(StageError::EmptyLibrary {
            name: name.to_string(),
            path: managed.path.clone(),
        });
    }
    info!(lib = %managed.leaf, path = %managed.path.display(), files = swift.len(), "adding Swift library");
    let swift_files = swift.len();
    args.extend(swift)?;

    let libraries_dir = request.sketch_dir.join("libraries");
    let mut staged_dirs = Vec::new();

    let bridged = copy_tree(&managed.path, &libraries_dir.join(&managed.leaf), is_native)?;
    if bridged > 0 {
        info!(lib = %managed.leaf, files = bridged, "staged bridge sources");
        finish_staged_dir(&request.sketch_dir, &managed.leaf, set)?;
        staged_dirs.push(managed.leaf.clone());
    }

    let native = resolve_dir(&request.native_root, name)?;
    match &native {
        Some(found) => {
            let lib_dir = libraries_dir.join(&found.leaf);
            // A flat native library merged over already-normalized bridge
            // sources goes straight into `src/`.
            let dst = if !found.path.join("src").is_dir() && lib_dir.join("src").is_dir() {
                lib_dir.join("src")
            } else {
                lib_dir
            };
            let copied = copy_tree(&found.path, &dst, |_| true)?;
            info!(lib = %found.leaf, files = copied, "copied native library");
            finish_staged_dir(&request.sketch_dir, &found.leaf, set)?;
            if !staged_dirs.contains(&found.leaf) {
                staged_dirs.push(found.leaf.clone());
            }
        }
        None => info!(lib = %managed.leaf, "language-only library (no native counterpart)"),
    }

    Ok(StagedLibrary {
        reference: LibraryReference {
            name: name.to_string(),
            managed,
            native,
        },
        swift_files,
        staged_dirs,
    })
}

fn finish_staged_dir(sketch_dir: &Path, leaf: &str, set: &mut StagedLibrarySet) -> Result<()> {
    let lib_dir = sketch_dir.join("libraries").join(leaf);
    layout::normalize(&lib_dir)?;
    layout::ensure_properties(&lib_dir, leaf)?;
    let shims = shim::generate_shims(sketch_dir, leaf)?;
    set.shims.extend(shims.written);
    set.collisions.extend(shims.collisions);
    for name in shim::promote_sources(sketch_dir, leaf)? {
        if !set.promoted.contains(&name) {
            set.promoted.push(name);
        }
    }
    Ok(())
}

fn report_sketchbook(request: &StageRequest) -> Result<Vec<SketchbookLibrary>> {
    if request.sketchbook_libraries.is_empty() {
        return Ok(Vec::new());
    }
    let Some(root) = &request.sketchbook_root else {
        warn!(
            count = request.sketchbook_libraries.len(),
            "sketchbook libraries requested but no sketchbook directory found"
        );
        return Ok(request
            .sketchbook_libraries
            .iter()
            .map(|name| SketchbookLibrary {
                name: name.clone(),
                found: None,
            })
            .collect());
    };

    let mut report = Vec::new();
    for name in &request.sketchbook_libraries {
        let found = resolve_dir(root, name)?;
        match &found {
            Some(dir) => info!(lib = %dir.leaf, path = %dir.path.display(), "using sketchbook library"),
            None => warn!(lib = %name, root = %root.display(), "sketchbook library not found; skipping"),
        }
        report.push(SketchbookLibrary {
            name: name.clone(),
            found,
        });
    }
    Ok(report)
}

fn fingerprint(args: &CompilerArgs, sketch_dir: &Path, set: &StagedLibrarySet) -> Result<String> {
    let mut hasher = Sha256::new();
    for source in args.iter() {
        hasher.update(source.to_string_lossy().as_bytes());
        hasher.update([0u8]);
    }
    let generated: BTreeSet<&String> = set.shims.iter().chain(&set.promoted).collect();
    for name in generated {
        let path = sketch_dir.join(name);
        let bytes = fs::read(&path).map_err(|e| StageError::io(&path, e))?;
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(&bytes);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        tool: tempfile::TempDir,
        project: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let fixture = Self {
                tool: tempfile::tempdir().unwrap(),
                project: tempfile::tempdir().unwrap(),
            };
            fixture.tool_file("swift/core/Core.swift", "// core\n");
            fixture.tool_file("swift/core/gpio/Pins.swift", "// pins\n");
            fixture
        }

        fn tool_file(&self, rel: &str, text: &str) {
            write(&self.tool.path().join(rel), text);
        }

        fn project_file(&self, rel: &str, text: &str) {
            write(&self.project.path().join(rel), text);
        }

        fn sketch(&self) -> PathBuf {
            self.project.path().join("build/sketch")
        }

        fn request(&self, libs: &[&str]) -> StageRequest {
            let sketch = self.sketch();
            fs::create_dir_all(sketch.join("libraries")).unwrap();
            StageRequest::new(self.tool.path(), self.project.path(), &sketch)
                .with_libraries(libs.iter().map(|s| s.to_string()).collect())
        }
    }

    fn write(path: &Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn core_sources_come_first_and_sorted() {
        let fx = Fixture::new();
        fx.tool_file("swift/libs/I2C/I2C.swift", "");
        let mut args = CompilerArgs::new();
        let set = resolve_and_stage(&fx.request(&["i2c"]), &mut args).unwrap();

        let names: Vec<_> = args
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Core.swift", "Pins.swift", "I2C.swift"]);
        assert_eq!(set.core_files, 2);
        assert_eq!(set.libraries[0].reference.managed.leaf, "I2C");
    }

    #[test]
    fn language_only_library_creates_no_staged_dir() {
        let fx = Fixture::new();
        fx.tool_file("swift/libs/Socket/Socket.swift", "");
        fx.tool_file("swift/libs/Socket/Address.swift", "");
        let mut args = CompilerArgs::new();
        let set = resolve_and_stage(&fx.request(&["Socket"]), &mut args).unwrap();

        assert!(set.libraries[0].reference.is_language_only());
        assert!(set.libraries[0].staged_dirs.is_empty());
        assert!(!fx.sketch().join("libraries/Socket").exists());
        assert_eq!(args.len(), 4);
    }

    #[test]
    fn native_counterpart_is_staged_under_actual_case() {
        let fx = Fixture::new();
        fx.tool_file("swift/libs/wifi/WiFi.swift", "");
        fx.tool_file("arduino/libs/WiFi/wifi.h", "#pragma once\n");
        fx.tool_file("arduino/libs/WiFi/wifi.cpp", "#include \"wifi.h\"\n");
        let mut args = CompilerArgs::new();
        let set = resolve_and_stage(&fx.request(&["WIFI"]), &mut args).unwrap();

        let lib = fx.sketch().join("libraries/WiFi");
        assert!(lib.join("src/wifi.h").is_file());
        assert!(lib.join("src/wifi.cpp").is_file());
        assert!(lib.join("library.properties").is_file());
        assert!(fx.sketch().join("wifi.h").is_file());
        assert!(fx.sketch().join("__WiFi__wifi.cpp").is_file());
        assert_eq!(set.libraries[0].staged_dirs, vec!["WiFi"]);
        assert_eq!(set.shims, vec!["wifi.h"]);
    }

    #[test]
    fn bridge_sources_in_swift_library_are_staged() {
        let fx = Fixture::new();
        fx.tool_file("swift/libs/SSD1306/SSD1306.swift", "");
        fx.tool_file("swift/libs/SSD1306/SSD1306Bridge.h", "");
        fx.tool_file("swift/libs/SSD1306/SSD1306Bridge.cpp", "");
        let mut args = CompilerArgs::new();
        let set = resolve_and_stage(&fx.request(&["ssd1306"]), &mut args).unwrap();

        assert_eq!(set.libraries[0].staged_dirs, vec!["SSD1306"]);
        assert!(fx.sketch().join("libraries/SSD1306/src/SSD1306Bridge.h").is_file());
        assert!(!fx.sketch().join("libraries/SSD1306/SSD1306.swift").exists());
        assert_eq!(set.promoted, vec!["__SSD1306__SSD1306Bridge.cpp"]);
    }

    #[test]
    fn bridge_sources_survive_merge_with_native_src_tree() {
        let fx = Fixture::new();
        fx.tool_file("swift/libs/Disp/Disp.swift", "");
        fx.tool_file("swift/libs/Disp/DispBridge.h", "#pragma once\n");
        fx.tool_file("swift/libs/Disp/DispBridge.cpp", "#include \"DispBridge.h\"\n");
        fx.tool_file("arduino/libs/Disp/src/disp.h", "#pragma once\n");
        fx.tool_file("arduino/libs/Disp/src/disp.cpp", "#include \"disp.h\"\n");
        let mut args = CompilerArgs::new();
        let set = resolve_and_stage(&fx.request(&["disp"]), &mut args).unwrap();

        let src = fx.sketch().join("libraries/Disp/src");
        assert!(src.join("DispBridge.cpp").is_file());
        assert!(src.join("disp.cpp").is_file());
        assert_eq!(set.libraries[0].staged_dirs, vec!["Disp"]);
        assert_eq!(set.shims, vec!["DispBridge.h", "disp.h"]);
        assert!(set.collisions.is_empty());
        assert_eq!(
            set.promoted,
            vec!["__Disp__DispBridge.cpp", "__Disp__disp.cpp"]
        );
        assert!(fx.sketch().join("__Disp__DispBridge.cpp").is_file());
    }

    #[test]
    fn flat_native_library_lands_in_bridge_src() {
        let fx = Fixture::new();
        fx.tool_file("swift/libs/Servo/Servo.swift", "");
        fx.tool_file("swift/libs/Servo/ServoBridge.cpp", "");
        fx.tool_file("arduino/libs/Servo/servo.h", "#pragma once\n");
        fx.tool_file("arduino/libs/Servo/servo.cpp", "");
        let mut args = CompilerArgs::new();
        let set = resolve_and_stage(&fx.request(&["Servo"]), &mut args).unwrap();

        let lib = fx.sketch().join("libraries/Servo");
        assert!(lib.join("src/servo.cpp").is_file());
        assert!(!lib.join("servo.cpp").exists());
        assert_eq!(set.shims, vec!["servo.h"]);
        assert_eq!(
            set.promoted,
            vec!["__Servo__ServoBridge.cpp", "__Servo__servo.cpp"]
        );
    }

    #[test]
    fn project_local_library_is_found() {
        let fx = Fixture::new();
        fx.project_file("libs/Sensor/Sensor.swift", "");
        let mut args = CompilerArgs::new();
        let set = resolve_and_stage(&fx.request(&["sensor"]), &mut args).unwrap();
        assert_eq!(
            set.libraries[0].reference.managed.path,
            fx.project.path().join("libs/Sensor")
        );
    }

    #[test]
    fn missing_library_is_fatal() {
        let fx = Fixture::new();
        let mut args = CompilerArgs::new();
        let err = resolve_and_stage(&fx.request(&["Nope"]), &mut args).unwrap_err();
        assert!(matches!(err, StageError::LibraryNotFound { ref name, .. } if name == "Nope"));
    }

    #[test]
    fn library_without_swift_sources_is_fatal() {
        let fx = Fixture::new();
        fx.tool_file("swift/libs/Empty/notes.txt", "");
        let mut args = CompilerArgs::new();
        let err = resolve_and_stage(&fx.request(&["Empty"]), &mut args).unwrap_err();
        assert!(matches!(err, StageError::EmptyLibrary { .. }));
    }

    #[test]
    fn empty_core_is_fatal() {
        let tool = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let request = StageRequest::new(tool.path(), project.path(), &project.path().join("sketch"));
        let err = resolve_and_stage(&request, &mut CompilerArgs::new()).unwrap_err();
        assert!(matches!(err, StageError::NoCoreSources { .. }));
    }

    #[test]
    fn overflow_surfaces_from_staging() {
        let fx = Fixture::new();
        let mut args = CompilerArgs::with_limit(10);
        let err = resolve_and_stage(&fx.request(&[]), &mut args).unwrap_err();
        assert!(matches!(err, StageError::ArgumentOverflow { .. }));
    }

    #[test]
    fn restaging_a_clean_sketch_is_byte_identical() {
        let fx = Fixture::new();
        fx.tool_file("swift/libs/I2C/I2C.swift", "");
        fx.tool_file("arduino/libs/I2C/I2C.h", "#pragma once\n");
        fx.tool_file("arduino/libs/I2C/I2C.cpp", "// impl\n");

        let mut first_args = CompilerArgs::new();
        let first = resolve_and_stage(&fx.request(&["I2C"]), &mut first_args).unwrap();
        let first_shim = fs::read(fx.sketch().join("I2C.h")).unwrap();

        fs::remove_dir_all(fx.sketch()).unwrap();

        let mut second_args = CompilerArgs::new();
        let second = resolve_and_stage(&fx.request(&["I2C"]), &mut second_args).unwrap();
        let second_shim = fs::read(fx.sketch().join("I2C.h")).unwrap();

        assert_eq!(first_args, second_args);
        assert_eq!(first_shim, second_shim);
        assert_eq!(first.fingerprint, second.fingerprint);
        assert!(second.collisions.is_empty());
    }

    #[test]
    fn sketchbook_libraries_are_reported_not_copied() {
        let fx = Fixture::new();
        let sketchbook = tempfile::tempdir().unwrap();
        fs::create_dir(sketchbook.path().join("Adafruit_SSD1306")).unwrap();
        let request = fx.request(&[]).with_sketchbook(
            Some(sketchbook.path().to_path_buf()),
            vec!["adafruit_ssd1306".into(), "Missing".into()],
        );
        let set = resolve_and_stage(&request, &mut CompilerArgs::new()).unwrap();

        assert_eq!(set.sketchbook.len(), 2);
        assert_eq!(
            set.sketchbook[0].found.as_ref().map(|d| d.leaf.as_str()),
            Some("Adafruit_SSD1306")
        );
        assert!(set.sketchbook[1].found.is_none());
        assert!(!fx.sketch().join("libraries/Adafruit_SSD1306").exists());
    }
}
