//! Tera card engine and the [`CardRenderer`] seam.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tera::Tera;

use cardwatch_core::paths::CARD_TEMPLATE_FILE;
use cardwatch_core::RenderJob;

use crate::background;
use crate::capture::CaptureCommand;
use crate::context::CardContext;
use crate::error::{io_err, RenderError};

// ---------------------------------------------------------------------------
// Embedded templates: baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("card.html.tera", include_str!("templates/card.html.tera")),
    (
        "_partials/style.css.tera",
        include_str!("templates/_partials/style.css.tera"),
    ),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.is_dir() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    let mut templates = Vec::new();
    for path in files {
        if path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = normalize_template_name(rel);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(style_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(normalize_template_name(Path::new(name)), (*content).to_string());
    }
    if let Some(dir) = style_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    let items: Vec<(String, String)> = templates.into_iter().collect();
    tera.add_raw_templates(items)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// CardEngine
// ---------------------------------------------------------------------------

/// Compiled card templates: the embedded set overlaid with any `.tera` files
/// found under the style directory.
pub struct CardEngine {
    tera: Tera,
}

impl CardEngine {
    /// Embedded templates only.
    pub fn new() -> Result<Self, RenderError> {
        Self::with_style_dir(None)
    }

    /// Embedded templates, overridden by files under `style_dir` when given.
    pub fn with_style_dir(style_dir: Option<&Path>) -> Result<Self, RenderError> {
        Ok(CardEngine {
            tera: build_tera(style_dir)?,
        })
    }

    /// Render the card template for `ctx`. Line endings come back as LF.
    pub fn render_card(&self, ctx: &CardContext) -> Result<String, RenderError> {
        let html = self.tera.render(CARD_TEMPLATE_FILE, &ctx.to_tera_context()?)?;
        Ok(html.replace("\r\n", "\n"))
    }
}

// ---------------------------------------------------------------------------
// CardRenderer
// ---------------------------------------------------------------------------

/// Turns a [`RenderJob`] into an artifact on disk and returns its path.
pub trait CardRenderer: Send + Sync {
    fn render(&self, job: &RenderJob) -> Result<PathBuf, RenderError>;
}

/// Writes HTML cards, optionally handing each one to a [`CaptureCommand`].
///
/// Templates are reloaded from the job's style directory on every call so
/// edits take effect without a restart.
#[derive(Debug, Clone, Default)]
pub struct HtmlCardRenderer {
    capture: Option<CaptureCommand>,
}

impl HtmlCardRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capture(capture: Option<CaptureCommand>) -> Self {
        HtmlCardRenderer { capture }
    }

    /// Render the HTML for `job` without touching the filesystem output.
    pub fn render_html(&self, job: &RenderJob) -> Result<String, RenderError> {
        let style_dir = &job.template.style_dir;
        let engine = CardEngine::with_style_dir(Some(style_dir.as_path()))?;
        let background_image = match &job.template.background_dir {
            Some(dir) => background::pick(dir, &job.commit.revision)?.map(|p| background::file_url(&p)),
            None => None,
        };
        let ctx = CardContext::from_job(job, background_image, Utc::now());
        engine.render_card(&ctx)
    }
}

impl CardRenderer for HtmlCardRenderer {
    fn render(&self, job: &RenderJob) -> Result<PathBuf, RenderError> {
        let html = self.render_html(job)?;
        write_atomic(&job.output_path, &html)?;
        match &self.capture {
            Some(capture) => capture.run(&job.output_path),
            None => Ok(job.output_path.clone()),
        }
    }
}

/// Write `content` via a `.tmp` sibling and rename over `path`.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<(), RenderError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
    }
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}
