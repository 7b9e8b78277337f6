mod common;

use common::TestWorkspace;
use modscope::config::{ScanSettings, WorkspaceSettings};
use modscope::scanner::ImportScanner;
use modscope::workspace::ModuleRegistry;

#[test]
fn scanning_twice_gives_identical_reports() {
    let ws = TestWorkspace::new();
    ws.add_module("plugins", "voice_plugin", "");
    ws.add_module("cores", "audio_core", "");
    ws.write(
        "plugins/voice_plugin/engine/__init__.py",
        "from .pipeline import Pipeline\nfrom cores.audio_core import Stream\n",
    );
    ws.write(
        "plugins/voice_plugin/engine/pipeline.py",
        "import numpy as np\nimport json, typing\nfrom PIL import Image\n",
    );
    ws.write("plugins/voice_plugin/__pycache__/stale.py", "import flask\n");
    ws.write("plugins/voice_plugin/notes.txt", "import django\n");

    let registry = ModuleRegistry::load(ws.root(), &WorkspaceSettings::default()).unwrap();
    let scanner = ImportScanner::new(&registry, &ScanSettings::default());
    let module = registry.get_module("voice_plugin").unwrap();

    let first = scanner.scan(module);
    let second = scanner.scan(module);
    assert_eq!(first, second);

    assert_eq!(first.files_scanned, 2);
    assert!(first.issues.is_empty());
    assert_eq!(
        first.imports.internal.iter().collect::<Vec<_>>(),
        ["audio_core"]
    );
    assert_eq!(
        first.imports.external.iter().collect::<Vec<_>>(),
        ["numpy", "pillow"]
    );
    assert!(first.stdlib.contains("json") && first.stdlib.contains("typing"));
    assert!(first.local.contains(".pipeline"));
}
