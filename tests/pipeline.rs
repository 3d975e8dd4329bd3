//! End-to-end pipeline runs against fixture projects on disk.

mod common;

use common::ProjectFixture;
use serde_json::json;
use wpscaffold::pipeline::scaffold;

#[test]
fn default_run_scaffolds_a_project() {
    let fixture = ProjectFixture::new();
    fixture.write_manifest(json!({ "wp-version": "6.4.2" }));

    let report = scaffold(fixture.root(), &[]).expect("scaffold run");
    assert!(report.is_clean());

    assert!(fixture.exists("wp-config.php"));
    assert!(fixture.exists("index.php"));
    assert!(fixture.exists(".env.example"));
    assert!(fixture.exists(".gitignore"));
    assert!(fixture.exists("wp-content/mu-plugins"));

    let wp_config = fixture.read("wp-config.php");
    assert!(wp_config.contains("__DIR__ . '/wp/'"));
    assert!(wp_config.contains("WordPress 6.4.2"));
    let index = fixture.read("index.php");
    assert!(index.contains("/wp/wp-blog-header.php"));
}

#[test]
fn rerun_is_idempotent() {
    let fixture = ProjectFixture::new();
    fixture.write_manifest(json!({ "wp-version": "6.4" }));

    scaffold(fixture.root(), &[]).expect("first run");
    let before = fixture.read("wp-config.php");
    // user edits survive a re-run
    fixture.write_file("wp-config.php", "<?php // hand-edited\n");

    let report = scaffold(fixture.root(), &[]).expect("second run");
    assert!(report.is_clean());
    assert!(report.skipped.contains(&"wp-config".to_string()));
    assert!(report.skipped.contains(&"index".to_string()));
    assert_eq!(fixture.read("wp-config.php"), "<?php // hand-edited\n");
    assert_ne!(before, fixture.read("wp-config.php"));
}

#[test]
fn selection_runs_only_named_steps_in_catalog_order() {
    let fixture = ProjectFixture::new();
    fixture.write_manifest(json!({ "wp-version": "6.4" }));

    let selection = vec!["index".to_string(), "check-paths".to_string()];
    let report = scaffold(fixture.root(), &selection).expect("selective run");
    assert_eq!(
        report.succeeded,
        vec!["check-paths".to_string(), "index".to_string()]
    );
    assert!(fixture.exists("index.php"));
    assert!(!fixture.exists("wp-config.php"));
}

#[test]
fn overlay_skip_list_wins_over_manifest() {
    let fixture = ProjectFixture::new();
    fixture.write_manifest(json!({
        "wp-version": "6.4",
        "skip-steps": ["gitignore"]
    }));
    fixture.write_overlay(json!({ "skip-steps": ["env-example"] }));

    let report = scaffold(fixture.root(), &[]).expect("scaffold run");
    assert!(report.is_clean());
    // the overlay replaces the manifest list entirely
    assert!(fixture.exists(".gitignore"));
    assert!(!fixture.exists(".env.example"));
}

#[test]
fn missing_wordpress_version_is_fatal_before_any_step() {
    let fixture = ProjectFixture::new();
    fixture.write_manifest(json!({}));

    let err = scaffold(fixture.root(), &[]).unwrap_err();
    assert!(err.to_string().contains("no supported WordPress version"));
    assert!(!fixture.exists("wp-config.php"));
    assert!(!fixture.exists("index.php"));
}

#[test]
fn optional_wordpress_scaffolds_without_a_core_package() {
    let fixture = ProjectFixture::new();
    fixture.write_manifest(json!({ "require-wp": false }));

    let report = scaffold(fixture.root(), &[]).expect("scaffold run");
    assert!(report.is_clean());
    assert!(fixture.read("wp-config.php").contains("WordPress unknown"));
}

#[test]
fn core_package_version_feeds_the_templates() {
    let fixture = ProjectFixture::new();
    fixture.write_manifest(json!({}));
    fixture.install_packages(json!([
        { "name": "roots/wordpress", "type": "wordpress-core", "version": "6.5" }
    ]));

    let report = scaffold(fixture.root(), &[]).expect("scaffold run");
    assert!(report.is_clean());
    assert!(fixture.read("wp-config.php").contains("WordPress 6.5.0"));
}

#[test]
fn mu_plugin_packages_get_a_loader() {
    let fixture = ProjectFixture::new();
    fixture.write_manifest(json!({ "wp-version": "6.4" }));
    fixture.install_packages(json!([
        { "name": "acme/loader", "type": "wordpress-muplugin", "version": "1.2.0" }
    ]));
    fixture.write_file("vendor/acme/loader/entry.php", "<?php // entry\n");

    let report = scaffold(fixture.root(), &[]).expect("scaffold run");
    assert!(report.is_clean());
    let loader = fixture.read("wp-content/mu-plugins/wpscaffold-loader.php");
    assert!(loader.contains("entry.php"));
    assert!(loader.contains("// acme/loader"));
}

#[test]
fn unregistered_custom_step_degrades_to_placeholder() {
    let fixture = ProjectFixture::new();
    fixture.write_manifest(json!({
        "wp-version": "6.4",
        "custom-steps": { "mystery": "no-such-factory" }
    }));

    let report = scaffold(fixture.root(), &[]).expect("scaffold run");
    assert!(report.is_clean());
    assert!(report.skipped.contains(&"mystery".to_string()));
    assert!(fixture.exists("wp-config.php"));
}

#[test]
fn dropins_and_content_dev_run_end_to_end() {
    let fixture = ProjectFixture::new();
    fixture.write_manifest(json!({
        "wp-version": "6.4",
        "dropins": ["assets/object-cache.php"],
        "content-dev-op": "copy"
    }));
    fixture.write_file("assets/object-cache.php", "<?php // cache\n");
    fixture.write_file("content-dev/plugins/acme/acme.php", "<?php // dev plugin\n");

    let report = scaffold(fixture.root(), &[]).expect("scaffold run");
    assert!(report.is_clean());
    assert!(fixture.exists("wp-content/object-cache.php"));
    assert!(fixture.exists("wp-content/plugins/acme/acme.php"));
}
