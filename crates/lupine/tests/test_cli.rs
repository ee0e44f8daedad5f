use std::fs;
use std::process::Command;

use tempfile::TempDir;

/// Run the lupine binary inside the given project directory.
fn run_lupine(project: &TempDir, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_lupine"))
        .args(args)
        .current_dir(project.path())
        .output()
        .expect("failed to spawn lupine binary")
}

#[test]
fn test_cli_zero_argument_run_uses_defaults() {
    let project = TempDir::new().unwrap();
    fs::create_dir_all(project.path().join("src")).unwrap();
    fs::write(
        project.path().join("src/main.lua"),
        "local greet = require('greet')\ngreet()\n",
    )
    .unwrap();
    // Default patterns probe src/?.lua relative to the working directory
    fs::write(
        project.path().join("src/greet.lua"),
        "return function() print('hi') end\n",
    )
    .unwrap();

    let output = run_lupine(&project, &[]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let bundle = fs::read_to_string(project.path().join("build/bundle.lua")).unwrap();
    assert!(bundle.contains("__bundle_register(\"greet\""));
}

#[test]
fn test_cli_missing_entry_exits_nonzero() {
    let project = TempDir::new().unwrap();

    let output = run_lupine(&project, &["--entry", "absent.lua"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("absent.lua"));
    assert!(!project.path().join("build").exists());
}

#[test]
fn test_cli_unresolved_module_names_the_reference() {
    let project = TempDir::new().unwrap();
    fs::write(
        project.path().join("main.lua"),
        "local ghost = require('ghost.module')\n",
    )
    .unwrap();

    let output = run_lupine(
        &project,
        &["--entry", "main.lua", "--output", "out/bundle.lua"],
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ghost.module"));
    assert!(!project.path().join("out").join("bundle.lua").exists());
}

#[test]
fn test_cli_project_config_supplies_ignore_set() {
    let project = TempDir::new().unwrap();
    fs::write(
        project.path().join("lupine.toml"),
        r#"
src_patterns = ["?.lua"]
ignored_modules = ["lib.moonloader", "ffi"]
"#,
    )
    .unwrap();
    fs::write(
        project.path().join("main.lua"),
        "local ml = require('lib.moonloader')\nlocal ffi = require('ffi')\nreturn 0\n",
    )
    .unwrap();

    let output = run_lupine(
        &project,
        &["--entry", "main.lua", "--output", "build/out.lua"],
    );

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let bundle = fs::read_to_string(project.path().join("build/out.lua")).unwrap();
    assert!(!bundle.contains("__bundle_register(\"lib.moonloader\""));
    assert!(!bundle.contains("__bundle_register(\"ffi\""));
}

#[test]
fn test_cli_rejects_unknown_lua_version() {
    let project = TempDir::new().unwrap();
    fs::write(project.path().join("main.lua"), "return 0\n").unwrap();

    let output = run_lupine(
        &project,
        &[
            "--entry",
            "main.lua",
            "--output",
            "build/out.lua",
            "--lua-version",
            "lua60",
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("lua60"));
}

#[test]
fn test_cli_isolate_seals_the_bundle() {
    let project = TempDir::new().unwrap();
    fs::write(project.path().join("main.lua"), "return 0\n").unwrap();

    let output = run_lupine(
        &project,
        &[
            "--entry",
            "main.lua",
            "--output",
            "build/out.lua",
            "--isolate",
        ],
    );

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let bundle = fs::read_to_string(project.path().join("build/out.lua")).unwrap();
    assert!(bundle.contains("end)(nil)"));
    assert!(!bundle.contains("end)(require)"));
}
