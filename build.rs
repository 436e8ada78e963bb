use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use syntect::dumps::dump_to_uncompressed_file;
use syntect::highlighting::ThemeSet;
use syntect::html::{ClassStyle, css_for_theme_with_class_style};
use two_face::syntax;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("cargo sets OUT_DIR"));
    write_syntax_pack(&out_dir).expect("failed to write syntax pack");
    write_theme_css(&out_dir).expect("failed to write syntax theme stylesheet");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=migrations");
}

fn write_syntax_pack(out_dir: &Path) -> Result<(), String> {
    let syntax_set = syntax::extra_newlines();
    let pack_path = out_dir.join("syntaxes.packdump");
    dump_to_uncompressed_file(&syntax_set, &pack_path)
        .map_err(|err| format!("failed to encode syntax set: {err}"))?;

    println!("cargo:rustc-env=SYNTAX_PACK_FILE={}", pack_path.display());

    Ok(())
}

fn write_theme_css(out_dir: &Path) -> Result<(), String> {
    let theme_set = ThemeSet::load_defaults();
    let theme = theme_set
        .themes
        .get("base16-ocean.light")
        .ok_or_else(|| "theme `base16-ocean.light` not found".to_string())?;

    let css = css_for_theme_with_class_style(theme, ClassStyle::SpacedPrefixed { prefix: "syntax-" })
        .map_err(|err| err.to_string())?;

    let css_path = out_dir.join("syntax-theme.css");
    fs::write(&css_path, css)
        .map_err(|err| format!("failed to write {}: {err}", css_path.display()))?;

    println!("cargo:rustc-env=SYNTAX_THEME_CSS={}", css_path.display());

    Ok(())
}
