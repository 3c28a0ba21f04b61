use std::sync::Arc;

use tempfile::TempDir;

use super::*;
use crate::asset::Minify;
use crate::asset::preamble::strip_leading_use_strict;
use crate::fs::MemoryFs;

const ROOT: &str = "/vfs/app";
const MAIN_JS: &str = "/vfs/app/web/public/main.js";
const INDEX_HTML: &str = "/vfs/app/web/public/index.html";

fn config() -> AssetConfig {
    let mut config = AssetConfig::default();
    config.build.settle_delay_ms = 0;
    config.set_root(Path::new(ROOT));
    config
}

fn engine_with(config: &AssetConfig, fs: &Arc<MemoryFs>) -> AssetMin<Arc<MemoryFs>> {
    AssetMin::with_minifiers(config, Arc::clone(fs), Minifiers::passthrough())
}

fn engine(fs: &Arc<MemoryFs>) -> AssetMin<Arc<MemoryFs>> {
    engine_with(&config(), fs)
}

fn put(engine: &AssetMin<Arc<MemoryFs>>, path: &str, content: &str, event: FileEvent) {
    engine.filesystem().insert(path, content);
    engine.handle_path(Path::new(path), event).unwrap();
}

fn text(engine: &AssetMin<Arc<MemoryFs>>, kind: ArtifactKind) -> String {
    String::from_utf8(engine.serialize(kind).unwrap()).unwrap()
}

fn output(fs: &MemoryFs, path: &str) -> String {
    String::from_utf8(fs.get(Path::new(path)).unwrap()).unwrap()
}

// ============================================================================
// ordering and reconciliation
// ============================================================================

#[test]
fn test_theme_before_module() {
    let fs = Arc::new(MemoryFs::new());
    let engine = engine(&fs);

    put(&engine, "/vfs/app/modules/m.js", "console.log('M')", FileEvent::Create);
    put(&engine, "/vfs/app/web/theme/t.js", "console.log('T')", FileEvent::Create);

    let expected = "'use strict';\nconsole.log('T')\nconsole.log('M')\n";
    assert_eq!(text(&engine, ArtifactKind::Script), expected);
    assert_eq!(output(&fs, MAIN_JS), expected);
}

#[test]
fn test_stylesheet_theme_precedence() {
    let fs = Arc::new(MemoryFs::new());
    let engine = engine(&fs);

    put(&engine, "/vfs/app/modules/card/card.css", ".card{}", FileEvent::Create);
    put(&engine, "/vfs/app/web/theme/base.css", ":root{}", FileEvent::Create);

    assert_eq!(text(&engine, ArtifactKind::Stylesheet), ":root{}\n.card{}\n");
}

#[test]
fn test_idempotent_create() {
    let fs = Arc::new(MemoryFs::new());
    let engine = engine(&fs);

    put(&engine, "/vfs/app/modules/a.js", "A", FileEvent::Create);
    let first = engine.serialize(ArtifactKind::Script).unwrap();
    put(&engine, "/vfs/app/modules/a.js", "A", FileEvent::Create);
    assert_eq!(engine.serialize(ArtifactKind::Script).unwrap(), first);
}

#[test]
fn test_write_replaces_content() {
    let fs = Arc::new(MemoryFs::new());
    let engine = engine(&fs);

    put(&engine, "/vfs/app/modules/a.js", "let version = 1;", FileEvent::Create);
    put(&engine, "/vfs/app/modules/b.js", "let other = 0;", FileEvent::Create);
    put(&engine, "/vfs/app/modules/a.js", "let version = 2;", FileEvent::Write);

    let out = output(&fs, MAIN_JS);
    assert_eq!(out.matches("let version = 2;").count(), 1);
    assert!(!out.contains("let version = 1;"));
    assert!(out.find("version").unwrap() < out.find("other").unwrap());
}

#[test]
fn test_remove_clears_content() {
    let fs = Arc::new(MemoryFs::new());
    let engine = engine(&fs);

    put(&engine, "/vfs/app/modules/a.js", "A()", FileEvent::Create);
    put(&engine, "/vfs/app/modules/b.js", "B()", FileEvent::Create);
    fs.remove(Path::new("/vfs/app/modules/a.js"));
    engine
        .handle_path(Path::new("/vfs/app/modules/a.js"), FileEvent::Remove)
        .unwrap();

    let out = output(&fs, MAIN_JS);
    assert!(!out.contains("A()"));
    assert!(out.contains("B()"));

    // untracked removal is a no-op
    engine
        .handle_path(Path::new("/vfs/app/modules/never.js"), FileEvent::Delete)
        .unwrap();
}

#[test]
fn test_rename_keeps_one_copy() {
    let fs = Arc::new(MemoryFs::new());
    let engine = engine(&fs);
    let content = "console.log('C')";

    put(&engine, "/vfs/app/modules/old.js", content, FileEvent::Create);
    fs.remove(Path::new("/vfs/app/modules/old.js"));
    engine
        .handle_path(Path::new("/vfs/app/modules/old.js"), FileEvent::Rename)
        .unwrap();
    put(&engine, "/vfs/app/modules/new.js", content, FileEvent::Create);
    put(&engine, "/vfs/app/modules/new.js", content, FileEvent::Write);

    assert_eq!(text(&engine, ArtifactKind::Script).matches(content).count(), 1);
    assert_eq!(output(&fs, MAIN_JS).matches(content).count(), 1);
}

#[test]
fn test_sprite_wraps_icons() {
    let fs = Arc::new(MemoryFs::new());
    let engine = engine(&fs);

    put(&engine, "/vfs/app/modules/icons/home.svg", "<symbol id=\"home\"/>", FileEvent::Create);

    let out = output(&fs, "/vfs/app/web/public/sprite.svg");
    assert!(out.starts_with("<svg class=\"sprite-icons\""));
    assert!(out.contains("<defs>\n<symbol id=\"home\"/>\n</defs>"));
}

#[test]
fn test_favicon_single_slot() {
    let fs = Arc::new(MemoryFs::new());
    let engine = engine(&fs);

    put(&engine, "/vfs/app/web/theme/favicon.svg", "<svg>1</svg>", FileEvent::Create);
    put(&engine, "/vfs/app/modules/brand/favicon.svg", "<svg>2</svg>", FileEvent::Create);

    assert_eq!(text(&engine, ArtifactKind::Favicon), "<svg>2</svg>\n");
    assert!(!text(&engine, ArtifactKind::Sprite).contains("<svg>2</svg>"));
    assert_eq!(output(&fs, "/vfs/app/web/public/favicon.svg"), "<svg>2</svg>\n");
}

#[test]
fn test_favicon_removal_writes_nothing() {
    let fs = Arc::new(MemoryFs::new());
    let engine = engine(&fs);
    let icon = "/vfs/app/web/theme/favicon.svg";

    put(&engine, icon, "<svg>1</svg>", FileEvent::Create);
    let writes = fs.write_count();
    fs.remove(Path::new(icon));
    engine.handle_path(Path::new(icon), FileEvent::Remove).unwrap();

    assert_eq!(fs.write_count(), writes);
    assert_eq!(text(&engine, ArtifactKind::Favicon), "");
}

// ============================================================================
// document
// ============================================================================

#[test]
fn test_marker_shell_splice() {
    let fs = Arc::new(MemoryFs::new());
    let engine = engine(&fs);

    put(
        &engine,
        "/vfs/app/web/theme/index.html",
        "<html><body>\n<!-- MODULES -->\n</body></html>",
        FileEvent::Create,
    );
    put(&engine, "/vfs/app/modules/nav/nav.html", "<nav>N</nav>", FileEvent::Create);

    let out = text(&engine, ArtifactKind::Document);
    assert_eq!(out, "<html><body>\n\n<nav>N</nav>\n\n</body></html>\n");
    assert_eq!(out.matches("<nav>N</nav>").count(), 1);
}

#[test]
fn test_standalone_document_ignored() {
    let fs = Arc::new(MemoryFs::new());
    let engine = engine(&fs);
    let before = text(&engine, ArtifactKind::Document);

    put(
        &engine,
        "/vfs/app/modules/page.html",
        "<!DOCTYPE html><html><body><p>page</p></body></html>",
        FileEvent::Create,
    );

    assert_eq!(text(&engine, ArtifactKind::Document), before);
    assert_eq!(fs.write_count(), 0);
}

#[test]
fn test_shell_removal_restores_default() {
    let fs = Arc::new(MemoryFs::new());
    let engine = engine(&fs);

    put(
        &engine,
        "/vfs/app/web/theme/index.html",
        "<body>{{.Modules}}</body>",
        FileEvent::Create,
    );
    assert!(text(&engine, ArtifactKind::Document).starts_with("<body>"));

    fs.remove(Path::new("/vfs/app/web/theme/index.html"));
    engine
        .handle_path(Path::new("/vfs/app/web/theme/index.html"), FileEvent::Remove)
        .unwrap();

    let out = text(&engine, ArtifactKind::Document);
    assert!(out.starts_with("<!doctype html>"));
    assert!(out.contains("<title>App</title>"));
}

#[test]
fn test_existing_document_output_adopted() {
    let fs = Arc::new(MemoryFs::new());
    fs.insert(
        INDEX_HTML,
        "<!doctype html><html><body><!-- MODULES --></body></html>",
    );
    let engine = engine(&fs);

    assert_eq!(
        text(&engine, ArtifactKind::Document),
        "<!doctype html><html><body>\n</body></html>\n"
    );
}

#[test]
fn test_restart_keeps_single_module_copy() {
    let fs = Arc::new(MemoryFs::new());
    let module = "/vfs/app/modules/m1/m1.html";
    fs.insert(module, "<div class=\"module-1\">\n    <h2>Test Module 1</h2>\n</div>");

    for run in 0..3 {
        let engine =
            AssetMin::with_minifiers(&config(), Arc::clone(&fs), Minifiers::standard());
        engine.handle_path(Path::new(module), FileEvent::Write).unwrap();
        let page = output(&fs, INDEX_HTML);
        assert_eq!(page.matches("Test Module 1").count(), 1, "run {run}: {page}");
    }
}

// ============================================================================
// write gate
// ============================================================================

#[test]
fn test_create_with_existing_output_stays_in_memory() {
    let fs = Arc::new(MemoryFs::new());
    fs.insert(MAIN_JS, "OLD");
    let engine = engine(&fs);

    put(&engine, "/vfs/app/modules/a.js", "A()", FileEvent::Create);
    put(&engine, "/vfs/app/modules/b.js", "B()", FileEvent::Create);
    assert_eq!(output(&fs, MAIN_JS), "OLD");
    assert_eq!(fs.write_count(), 0);
    assert!(!engine.is_write_enabled());

    put(&engine, "/vfs/app/modules/b.js", "B()", FileEvent::Write);
    assert!(engine.is_write_enabled());
    assert_eq!(fs.write_count(), 1);
    let out = output(&fs, MAIN_JS);
    assert!(out.contains("A()"));
    assert!(out.contains("B()"));
}

#[test]
fn test_first_output_always_written() {
    let fs = Arc::new(MemoryFs::new());
    let engine = engine(&fs);

    put(&engine, "/vfs/app/modules/a.css", "a{}", FileEvent::Create);
    assert_eq!(fs.write_count(), 1);
    assert!(engine.is_write_enabled());
}

#[test]
fn test_force_recompile_ignores_gate() {
    let fs = Arc::new(MemoryFs::new());
    fs.insert(MAIN_JS, "OLD");
    let engine = engine(&fs);

    put(&engine, "/vfs/app/modules/a.js", "A()", FileEvent::Create);
    engine.force_recompile("JS").unwrap();
    assert_eq!(output(&fs, MAIN_JS), "'use strict';\nA()\n");
    assert!(!engine.is_write_enabled());
}

#[test]
fn test_recompile_all_skips_empty_favicon() {
    let fs = Arc::new(MemoryFs::new());
    let engine = engine(&fs);

    engine.recompile_all().unwrap();
    assert!(fs.exists(Path::new("/vfs/app/web/public/sprite.svg")));
    assert!(fs.exists(Path::new(INDEX_HTML)));
    assert!(!fs.exists(Path::new("/vfs/app/web/public/favicon.svg")));
    assert!(engine.force_recompile(".txt").is_err());
}

// ============================================================================
// guards and errors
// ============================================================================

#[test]
fn test_own_output_is_ignored() {
    let fs = Arc::new(MemoryFs::new());
    let engine = engine(&fs);
    put(&engine, "/vfs/app/modules/a.js", "A()", FileEvent::Create);
    let before = text(&engine, ArtifactKind::Script);
    let writes = fs.write_count();

    engine.handle_path(Path::new(MAIN_JS), FileEvent::Write).unwrap();
    engine
        .handle_event("MAIN.JS", ".JS", Path::new("/VFS/APP/web/public/MAIN.JS"), FileEvent::Write)
        .unwrap();

    assert_eq!(text(&engine, ArtifactKind::Script), before);
    assert_eq!(fs.write_count(), writes);
}

#[test]
fn test_output_paths() {
    let fs = Arc::new(MemoryFs::new());
    let engine = engine(&fs);
    let paths = engine.output_paths();

    assert_eq!(paths.len(), 5);
    assert!(paths.contains(&PathBuf::from(MAIN_JS)));
    assert!(paths.contains(&PathBuf::from(INDEX_HTML)));
    assert!(engine.is_output(Path::new("/vfs/app/web/public/style.css")));
}

#[test]
fn test_invalid_input_rejected() {
    let fs = Arc::new(MemoryFs::new());
    let engine = engine(&fs);

    let err = engine
        .handle_event("notes.txt", ".txt", Path::new("/vfs/app/notes.txt"), FileEvent::Create)
        .unwrap_err();
    assert!(matches!(err.cause, AssetError::UnsupportedExtension(_)));

    let err = engine
        .handle_event("", ".js", Path::new(""), FileEvent::Create)
        .unwrap_err();
    assert!(matches!(err.cause, AssetError::EmptyPath));
}

#[test]
fn test_read_failure_leaves_state() {
    let fs = Arc::new(MemoryFs::new());
    let engine = engine(&fs);
    let before = text(&engine, ArtifactKind::Script);

    let err = engine
        .handle_path(Path::new("/vfs/app/modules/gone.js"), FileEvent::Write)
        .unwrap_err();
    assert!(matches!(err.cause, AssetError::Read { .. }));
    assert_eq!(err.event, FileEvent::Write);
    assert!(err.to_string().contains("gone.js"));
    assert_eq!(text(&engine, ArtifactKind::Script), before);
}

struct RejectBroken;

impl Minify for RejectBroken {
    fn minify(&self, source: &str) -> Result<String, String> {
        if source.contains("BROKEN") {
            Err("unexpected token".to_string())
        } else {
            Ok(source.to_string())
        }
    }
}

#[test]
fn test_minify_failure_keeps_memory() {
    let fs = Arc::new(MemoryFs::new());
    let mut minifiers = Minifiers::passthrough();
    minifiers.set(ArtifactKind::Script, RejectBroken);
    let engine = AssetMin::with_minifiers(&config(), Arc::clone(&fs), minifiers);

    fs.insert("/vfs/app/modules/bad.js", "BROKEN(");
    let err = engine
        .handle_path(Path::new("/vfs/app/modules/bad.js"), FileEvent::Create)
        .unwrap_err();
    assert!(matches!(err.cause, AssetError::Minify { .. }));
    assert!(err.to_string().contains("text/javascript"));
    assert!(text(&engine, ArtifactKind::Script).contains("BROKEN("));
    assert!(!fs.exists(Path::new(MAIN_JS)));

    // the next good edit flushes
    put(&engine, "/vfs/app/modules/bad.js", "fixed()", FileEvent::Write);
    assert!(output(&fs, MAIN_JS).contains("fixed()"));
}

struct ReadOnlyFs(MemoryFs);

impl Filesystem for ReadOnlyFs {
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        self.0.read(path)
    }

    fn write(&self, _path: &Path, _bytes: &[u8]) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        ))
    }

    fn exists(&self, path: &Path) -> bool {
        self.0.exists(path)
    }
}

#[test]
fn test_write_failure_keeps_memory() {
    let inner = MemoryFs::new();
    inner.insert("/vfs/app/modules/a.css", "a{}");
    let engine = AssetMin::with_minifiers(&config(), ReadOnlyFs(inner), Minifiers::passthrough());

    let err = engine
        .handle_path(Path::new("/vfs/app/modules/a.css"), FileEvent::Create)
        .unwrap_err();
    assert!(matches!(err.cause, AssetError::Write { .. }));
    assert_eq!(engine.serialize(ArtifactKind::Stylesheet).unwrap(), b"a{}\n");
}

#[test]
fn test_update_content_directly() {
    let fs = Arc::new(MemoryFs::new());
    fs.insert(MAIN_JS, "OLD");
    let engine = engine(&fs);

    engine
        .update_content_directly("/vfs/app/modules/gen.js", "generated()")
        .unwrap();
    assert!(engine.is_write_enabled());
    assert!(output(&fs, MAIN_JS).contains("generated()"));
}

#[test]
fn test_clear_sources() {
    let fs = Arc::new(MemoryFs::new());
    let engine = engine(&fs);
    put(&engine, "/vfs/app/web/theme/t.js", "T()", FileEvent::Create);
    put(&engine, "/vfs/app/modules/m.js", "M()", FileEvent::Create);

    engine.clear_sources();
    assert_eq!(text(&engine, ArtifactKind::Script), "'use strict';\n");
}

#[test]
fn test_concurrent_events() {
    let fs = Arc::new(MemoryFs::new());
    let engine = Arc::new(engine(&fs));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                let path = format!("/vfs/app/modules/m{i}.js");
                engine.filesystem().insert(path.as_str(), format!("m{i}()"));
                engine.handle_path(Path::new(&path), FileEvent::Create).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let out = text(&engine, ArtifactKind::Script);
    for i in 0..8 {
        assert_eq!(out.matches(&format!("m{i}()")).count(), 1);
    }
    assert_eq!(output(&fs, MAIN_JS), out);
}

// ============================================================================
// disk
// ============================================================================

#[test]
fn test_preamble_failure_then_recovery() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    let mut config = AssetConfig::default();
    config.build.settle_delay_ms = 0;
    config.script.preamble_file = Some("init.js".into());
    config.set_root(root);

    let engine = AssetMin::with_minifiers(&config, DiskFs, Minifiers::passthrough());
    let source = root.join("modules/a.js");
    std::fs::create_dir_all(source.parent().unwrap()).unwrap();
    std::fs::write(&source, "A()").unwrap();

    let err = engine.handle_path(&source, FileEvent::Create).unwrap_err();
    assert!(matches!(err.cause, AssetError::Preamble { .. }));

    std::fs::write(root.join("init.js"), "init();").unwrap();
    engine.force_recompile(".js").unwrap();
    let out = std::fs::read_to_string(root.join("web/public/main.js")).unwrap();
    assert_eq!(out, "'use strict';init();\nA()\n");
}

#[test]
fn test_disk_minified_output() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    let mut config = AssetConfig::default();
    config.build.settle_delay_ms = 0;
    config.set_root(root);

    let engine = AssetMin::new(&config, DiskFs);
    let source = root.join("web/theme/base.css");
    std::fs::create_dir_all(source.parent().unwrap()).unwrap();
    std::fs::write(&source, "body {\n  color: red;\n}\n").unwrap();

    engine.handle_path(&source, FileEvent::Create).unwrap();
    let out = std::fs::read_to_string(root.join("web/public/style.css")).unwrap();
    assert_eq!(out, "body{color:red}");
    assert_eq!(
        engine.minified_content(ArtifactKind::Stylesheet).unwrap(),
        out.as_bytes()
    );
}

#[test]
fn test_standard_script_bundle_keeps_declarations() {
    let fs = Arc::new(MemoryFs::new());
    let engine = AssetMin::with_minifiers(&config(), Arc::clone(&fs), Minifiers::standard());

    put(
        &engine,
        "/vfs/app/modules/save.js",
        "function onSave() {\n  return counter + 1;\n}\nvar counter = 1;\n",
        FileEvent::Create,
    );

    let out = output(&fs, MAIN_JS);
    assert!(strip_leading_use_strict(&out).len() < out.len(), "no prologue: {out}");
    assert!(out.contains("onSave"));
    assert!(out.contains("counter"));
}
