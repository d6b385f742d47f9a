//! Card rendering: one [`CardRecord`] + the run configuration → final markup.
//!
//! Templates are evaluated through [Tera]. The pipeline does not implement a
//! template language of its own — it only wires the evaluation context and
//! injects three capabilities every card layout needs:
//!
//! * `has_image(path=…)` — existence check, scoped to the image directory.
//!   Reports `false` for empty, missing, or non-file paths and never fails,
//!   so templates can branch: `{% if has_image(path=card.art) %}`.
//! * `load_image(path=…)` — the same path rules, but loading is strict: a
//!   missing file or a directory is an error. Returns a base64 data URL so
//!   the markup is self-contained and the render host never touches the
//!   filesystem. The MIME subtype comes from the file extension (`svg` maps
//!   to `svg+xml`).
//! * `include_css(path=…)` — reads a stylesheet, wraps it in `<style>` tags,
//!   and evaluates it against the current context, so CSS can use template
//!   expressions (`width: {{ config.width }}px`) and the image helpers.
//!
//! The check/load split is deliberate: existence checks let a template skip
//! optional art, loading fails loudly when art is required. There is no
//! silent fallback in between.
//!
//! ## Field pre-pass
//!
//! Before the main template runs, every *text* field of the card is itself
//! evaluated with the card record as context. A description can therefore
//! reference sibling fields (`"Deals {{ damage }} damage"`) and the main
//! template sees already-resolved text. Non-text fields pass through
//! untouched.
//!
//! [Tera]: https://keats.github.io/tera/

use crate::config::RenderConfig;
use crate::error::CardpressError;
use crate::record::{CardRecord, FieldValue};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tera::Tera;

/// The template evaluation context for one card.
#[derive(Debug, Serialize)]
pub struct RenderContext<'a> {
    /// The card, with text fields already resolved by the pre-pass.
    pub card: &'a CardRecord,
    /// The run configuration.
    pub config: &'a RenderConfig,
    /// Zero-based position of the card in the sequence.
    pub index: usize,
    /// Total number of cards in the run.
    pub count: usize,
}

/// Evaluate the configured template file into final markup.
///
/// Reads `config.template` (relative to the base directory) and renders it
/// with the full context and the three injected capabilities. A missing
/// template file is fatal.
pub async fn render_card(ctx: &RenderContext<'_>) -> Result<String, CardpressError> {
    let template_path = ctx.config.base_dir.join(&ctx.config.template);
    let source = tokio::fs::read_to_string(&template_path)
        .await
        .map_err(|_| CardpressError::TemplateNotFound {
            path: template_path.clone(),
        })?;
    render_markup(&source, ctx)
}

/// Render template source with the full card context and capabilities.
pub fn render_markup(source: &str, ctx: &RenderContext<'_>) -> Result<String, CardpressError> {
    let context = context_of(ctx, "card template")?;
    let mut tera = Tera::default();
    // Markup is trusted local input; escaping data URLs would corrupt them.
    tera.autoescape_on(vec![]);
    register_capabilities(&mut tera, ctx, &context);

    tera.add_raw_template("card", source)
        .map_err(|e| render_error("card template", e))?;
    tera.render("card", &context)
        .map_err(|e| render_error("card template", e))
}

/// Evaluate an inline template string (e.g. the PNG filename) against the
/// full render context. No capabilities are injected — filenames have no
/// business loading images.
pub fn render_inline(
    template: &str,
    ctx: &RenderContext<'_>,
    what: &str,
) -> Result<String, CardpressError> {
    let context = context_of(ctx, what)?;
    Tera::one_off(template, &context, false).map_err(|e| render_error(what, e))
}

/// The field pre-pass: evaluate every text field of `card` with the card
/// itself as context, returning the resolved record.
pub fn resolve_fields(card: &CardRecord) -> Result<CardRecord, CardpressError> {
    let context = tera::Context::from_serialize(card)
        .map_err(|e| render_error("card fields", e))?;

    let mut resolved = card.clone();
    for (name, value) in card.iter() {
        if let FieldValue::Text(text) = value {
            let rendered = Tera::one_off(text, &context, false)
                .map_err(|e| render_error(&format!("field '{name}'"), e))?;
            resolved.insert(name.clone(), FieldValue::Text(rendered));
        }
    }
    Ok(resolved)
}

fn context_of(ctx: &RenderContext<'_>, what: &str) -> Result<tera::Context, CardpressError> {
    tera::Context::from_serialize(ctx).map_err(|e| render_error(what, e))
}

fn render_error(name: &str, err: tera::Error) -> CardpressError {
    // Tera buries the useful message in the source chain.
    let mut detail = err.to_string();
    let mut cause: &dyn std::error::Error = &err;
    while let Some(source) = cause.source() {
        detail = format!("{detail}: {source}");
        cause = source;
    }
    CardpressError::TemplateRender {
        name: name.to_string(),
        detail,
    }
}

// ── Injected capabilities ────────────────────────────────────────────────

fn register_capabilities(tera: &mut Tera, ctx: &RenderContext<'_>, context: &tera::Context) {
    let image_base = ctx.config.base_dir.join(&ctx.config.img_dir);
    register_image_helpers(tera, &image_base);

    let css_base = ctx.config.base_dir.clone();
    let css_context = context.clone();
    tera.register_function(
        "include_css",
        move |args: &HashMap<String, tera::Value>| -> tera::Result<tera::Value> {
            let rel = required_path_arg(args, "include_css")?;
            let path = css_base.join(rel);
            let css = std::fs::read_to_string(&path)
                .map_err(|_| tera::Error::msg(format!("stylesheet not found: {}", path.display())))?;
            let wrapped = format!("<style>{css}</style>");

            // Stylesheets get their own evaluator with the image helpers
            // re-registered, so CSS can embed data-URL backgrounds.
            let mut css_tera = Tera::default();
            css_tera.autoescape_on(vec![]);
            register_image_helpers(&mut css_tera, &image_base);
            css_tera.add_raw_template("stylesheet", &wrapped)?;
            css_tera.render("stylesheet", &css_context).map(tera::Value::String)
        },
    );
}

fn register_image_helpers(tera: &mut Tera, image_base: &Path) {
    let base = image_base.to_path_buf();
    tera.register_function(
        "has_image",
        move |args: &HashMap<String, tera::Value>| -> tera::Result<tera::Value> {
            Ok(tera::Value::Bool(has_image(&base, path_arg(args))))
        },
    );

    let base = image_base.to_path_buf();
    tera.register_function(
        "load_image",
        move |args: &HashMap<String, tera::Value>| -> tera::Result<tera::Value> {
            let rel = required_path_arg(args, "load_image")?;
            load_image(&base, &rel)
                .map(tera::Value::String)
                .map_err(|e| tera::Error::msg(e.to_string()))
        },
    );
}

fn path_arg(args: &HashMap<String, tera::Value>) -> Option<String> {
    args.get("path").and_then(|v| v.as_str()).map(str::to_string)
}

fn required_path_arg(
    args: &HashMap<String, tera::Value>,
    function: &str,
) -> tera::Result<String> {
    path_arg(args)
        .ok_or_else(|| tera::Error::msg(format!("{function} requires a string `path` argument")))
}

/// Existence check for an image path relative to the image directory.
/// Never fails: empty paths, missing files, and directories all report
/// `false`.
pub fn has_image(image_base: &Path, rel: Option<String>) -> bool {
    match rel {
        Some(rel) if !rel.is_empty() => image_base.join(rel).is_file(),
        _ => false,
    }
}

/// Load an image relative to the image directory as a base64 data URL.
///
/// Strict counterpart to [`has_image`]: an empty path, a missing file, or a
/// directory is an error.
pub fn load_image(image_base: &Path, rel: &str) -> Result<String, CardpressError> {
    if rel.is_empty() {
        return Err(CardpressError::InvalidImagePath);
    }
    let path = image_base.join(rel);
    let metadata = std::fs::metadata(&path)
        .map_err(|_| CardpressError::ImageNotFound { path: path.clone() })?;
    if !metadata.is_file() {
        return Err(CardpressError::ImageIsDirectory { path });
    }

    let mut subtype = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if subtype == "svg" {
        subtype.push_str("+xml");
    }

    let bytes = std::fs::read(&path)
        .map_err(|_| CardpressError::ImageNotFound { path: path.clone() })?;
    Ok(format!(
        "data:image/{subtype};base64,{}",
        STANDARD.encode(bytes)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use std::fs;

    fn card(pairs: &[(&str, FieldValue)]) -> CardRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn test_ctx<'a>(record: &'a CardRecord, config: &'a RenderConfig) -> RenderContext<'a> {
        RenderContext {
            card: record,
            config,
            index: 0,
            count: 1,
        }
    }

    #[test]
    fn pre_pass_resolves_cross_field_references() {
        let record = card(&[
            ("damage", FieldValue::Number(3.into())),
            (
                "description",
                FieldValue::Text("Deals {{ damage }} damage".into()),
            ),
        ]);
        let resolved = resolve_fields(&record).unwrap();
        assert_eq!(
            resolved.get("description"),
            Some(&FieldValue::Text("Deals 3 damage".into()))
        );
        // non-text fields untouched
        assert_eq!(resolved.get("damage"), Some(&FieldValue::Number(3.into())));
    }

    #[test]
    fn pre_pass_leaves_plain_text_alone() {
        let record = card(&[("name", FieldValue::Text("Goblin".into()))]);
        assert_eq!(resolve_fields(&record).unwrap(), record);
    }

    #[test]
    fn markup_renders_card_and_config_fields() {
        let record = card(&[("name", FieldValue::Text("Goblin".into()))]);
        let config = RenderConfig::default();
        let ctx = test_ctx(&record, &config);
        let markup = render_markup(
            "<div style=\"width: {{ config.width }}px\">{{ card.name }} ({{ index + 1 }}/{{ count }})</div>",
            &ctx,
        )
        .unwrap();
        assert_eq!(markup, "<div style=\"width: 825px\">Goblin (1/1)</div>");
    }

    #[test]
    fn undefined_field_follows_evaluator_semantics() {
        let record = card(&[]);
        let config = RenderConfig::default();
        let ctx = test_ctx(&record, &config);
        let err = render_markup("{{ card.rarity }}", &ctx);
        assert!(matches!(err, Err(CardpressError::TemplateRender { .. })));
    }

    #[test]
    fn filename_template_embeds_card_fields() {
        let record = card(&[("id", FieldValue::Number(7.into()))]);
        let config = RenderConfig::default();
        let ctx = test_ctx(&record, &config);
        let name = render_inline(&config.png_filename, &ctx, "png filename").unwrap();
        assert_eq!(name, "card_7.png");
    }

    #[test]
    fn has_image_never_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!has_image(dir.path(), None));
        assert!(!has_image(dir.path(), Some(String::new())));
        assert!(!has_image(dir.path(), Some("missing.png".into())));

        fs::write(dir.path().join("a.png"), b"png").unwrap();
        assert!(has_image(dir.path(), Some("a.png".into())));

        fs::create_dir(dir.path().join("sub")).unwrap();
        assert!(!has_image(dir.path(), Some("sub".into())));
    }

    #[test]
    fn load_image_builds_data_url_with_svg_mime() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("icon.SVG"), b"<svg/>").unwrap();
        let url = load_image(dir.path(), "icon.SVG").unwrap();
        assert!(url.starts_with("data:image/svg+xml;base64,"), "got: {url}");
        assert!(url.ends_with(&STANDARD.encode(b"<svg/>")));
    }

    #[test]
    fn load_image_is_strict() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_image(dir.path(), ""),
            Err(CardpressError::InvalidImagePath)
        ));
        assert!(matches!(
            load_image(dir.path(), "missing.png"),
            Err(CardpressError::ImageNotFound { .. })
        ));
        fs::create_dir(dir.path().join("sub")).unwrap();
        assert!(matches!(
            load_image(dir.path(), "sub"),
            Err(CardpressError::ImageIsDirectory { .. })
        ));
    }

    #[test]
    fn include_css_evaluates_template_expressions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("style.css"),
            ".card { width: {{ config.width }}px; }",
        )
        .unwrap();

        let record = card(&[]);
        let config = RenderConfig::builder()
            .base_dir(dir.path())
            .build()
            .unwrap();
        let ctx = test_ctx(&record, &config);
        let markup = render_markup("{{ include_css(path=\"style.css\") }}", &ctx).unwrap();
        assert_eq!(markup, "<style>.card { width: 825px; }</style>");
    }

    #[test]
    fn include_css_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let record = card(&[]);
        let config = RenderConfig::builder()
            .base_dir(dir.path())
            .build()
            .unwrap();
        let ctx = test_ctx(&record, &config);
        let err = render_markup("{{ include_css(path=\"missing.css\") }}", &ctx);
        assert!(matches!(err, Err(CardpressError::TemplateRender { .. })));
    }

    #[test]
    fn template_can_branch_on_has_image() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("img")).unwrap();
        fs::write(dir.path().join("img/a.png"), b"\x89PNG").unwrap();

        let record = card(&[("art", FieldValue::Text("a.png".into()))]);
        let config = RenderConfig::builder()
            .base_dir(dir.path())
            .build()
            .unwrap();
        let ctx = test_ctx(&record, &config);
        let markup = render_markup(
            "{% if has_image(path=card.art) %}<img src=\"{{ load_image(path=card.art) }}\">{% else %}no art{% endif %}",
            &ctx,
        )
        .unwrap();
        assert!(markup.starts_with("<img src=\"data:image/png;base64,"));
    }
}
