//! Static asset generation.
//!
//! Publishes every non-document file of the content tree into
//! `<output>/static/`, under the flattened names from
//! [`paths::sanitize_filename`]. Recognized images (`jpg`, `jpeg`, `png`) are
//! re-encoded and get a lazy-load placeholder; everything else is copied.
//!
//! ```text
//! content/notes/photo.JPG
//!   compress_to_webp = true  → static/notes-photo.webp        (lossless WebP)
//!                              static/lazy/notes-photo.webp   (20px, blurred)
//!   compress_to_webp = false → static/notes-photo.JPG         (JPEG at images.quality)
//!                              static/lazy/notes-photo.JPG
//! content/notes/paper.pdf    → static/notes-paper.pdf         (copied)
//! ```
//!
//! Output names always agree with the URLs the markdown renderer and
//! [`AssetPipeline`] hand out.
//!
//! Jobs run in parallel on a rayon pool bounded by
//! `processing.max_processes`, behind the [`EncodeBackend`] trait so tests
//! can record operations instead of decoding pixels. The [`cache`] skips
//! jobs whose source bytes and parameters are unchanged. A failing job is
//! reported in [`AssetReport::failures`] and does not stop the others.
//!
//! Two sources can flatten onto one output name (`a/b.png` and `a-b.png`,
//! or `photo.jpg` and `photo.png` once both become `.webp`). The first in
//! tree order wins; the others are reported as failures and never written.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageReader};
use rayon::prelude::*;
use thiserror::Error;

use crate::assets::{self, AssetPipeline};
use crate::cache::{self, CacheLookup, CacheManifest, CacheStats};
use crate::config::{ImagesConfig, SiteConfig, effective_threads};
use crate::paths;
use crate::types::{ContentNode, NodeKind};

/// Directory inside the output root that holds published assets.
pub const STATIC_DIR: &str = "static";
/// Placeholder directory, inside [`STATIC_DIR`].
pub const LAZY_DIR: &str = "lazy";

/// Placeholder width in pixels; height keeps the aspect ratio.
pub const PLACEHOLDER_WIDTH: u32 = 20;
const PLACEHOLDER_BLUR: f32 = 3.0;
const PLACEHOLDER_JPEG_QUALITY: u8 = 30;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Encoding failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    WebpLossless,
    Jpeg { quality: u8 },
    Png { quality: u8 },
}

impl OutputFormat {
    fn cache_label(&self) -> String {
        match self {
            Self::WebpLossless => "webp-lossless".to_string(),
            Self::Jpeg { quality } => format!("jpeg-{quality}"),
            Self::Png { quality } => format!("png-{quality}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetOp {
    Encode(OutputFormat),
    Placeholder(OutputFormat),
    Copy,
}

impl AssetOp {
    fn params_hash(&self) -> String {
        match self {
            Self::Encode(format) => cache::hash_params(&["encode", &format.cache_label()]),
            Self::Placeholder(format) => cache::hash_params(&[
                "placeholder",
                &format.cache_label(),
                &PLACEHOLDER_WIDTH.to_string(),
            ]),
            Self::Copy => cache::hash_params(&["copy"]),
        }
    }
}

/// One file to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetJob {
    /// Content path of the source file.
    pub source: String,
    /// Output path relative to the output root.
    pub output: String,
    pub op: AssetOp,
}

/// The pixel work, separated out so it can be swapped in tests.
pub trait EncodeBackend: Sync {
    /// Re-encode `source` into `output` in the given format.
    fn encode(&self, source: &Path, output: &Path, format: OutputFormat) -> Result<(), EncodeError>;

    /// Write a small blurred preview of `source`.
    fn placeholder(
        &self,
        source: &Path,
        output: &Path,
        format: OutputFormat,
    ) -> Result<(), EncodeError>;
}

/// Backend built on the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustEncoder;

impl EncodeBackend for RustEncoder {
    fn encode(&self, source: &Path, output: &Path, format: OutputFormat) -> Result<(), EncodeError> {
        let img = load_image(source)?;
        write_image(&img, output, format)
    }

    fn placeholder(
        &self,
        source: &Path,
        output: &Path,
        format: OutputFormat,
    ) -> Result<(), EncodeError> {
        let img = load_image(source)?;
        if img.width() == 0 || img.height() == 0 {
            return Err(EncodeError::Failed(format!(
                "empty image: {}",
                source.display()
            )));
        }
        let scale = PLACEHOLDER_WIDTH as f32 / img.width() as f32;
        let height = ((img.height() as f32 * scale).round() as u32).max(1);
        let tiny = img
            .resize_exact(PLACEHOLDER_WIDTH, height, FilterType::Triangle)
            .blur(PLACEHOLDER_BLUR);
        write_image(&tiny, output, format)
    }
}

/// Decode by content, not extension: a PNG saved as `.JPG` still loads.
fn load_image(path: &Path) -> Result<DynamicImage, EncodeError> {
    Ok(ImageReader::open(path)?.with_guessed_format()?.decode()?)
}

fn write_image(img: &DynamicImage, output: &Path, format: OutputFormat) -> Result<(), EncodeError> {
    let mut buffer = Vec::new();
    match format {
        OutputFormat::WebpLossless => {
            let rgba = img.to_rgba8();
            WebPEncoder::new_lossless(&mut buffer).write_image(
                rgba.as_raw(),
                rgba.width(),
                rgba.height(),
                ExtendedColorType::Rgba8,
            )?;
        }
        OutputFormat::Jpeg { quality } => {
            let rgb = img.to_rgb8();
            JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )?;
        }
        OutputFormat::Png { quality } => {
            let compression = match quality {
                0..=33 => CompressionType::Fast,
                34..=66 => CompressionType::Default,
                _ => CompressionType::Best,
            };
            let rgba = img.to_rgba8();
            PngEncoder::new_with_quality(&mut buffer, compression, PngFilter::Adaptive).write_image(
                rgba.as_raw(),
                rgba.width(),
                rgba.height(),
                ExtendedColorType::Rgba8,
            )?;
        }
    }
    fs::write(output, buffer)?;
    Ok(())
}

/// The jobs for one generation run, plus sources left out because their
/// output name was already taken.
#[derive(Debug, Default)]
pub struct AssetPlan {
    pub jobs: Vec<AssetJob>,
    pub conflicts: Vec<EncodeFailure>,
}

impl AssetPlan {
    /// Claim `output` for `node`. A name already claimed by another source
    /// becomes a conflict.
    fn claim(&mut self, claimed: &mut HashMap<String, String>, node: &ContentNode, output: &str) -> bool {
        match claimed.get(output) {
            Some(first) => {
                tracing::warn!(source = %node.path, output, first = %first, "asset output name already taken");
                self.conflicts.push(EncodeFailure {
                    source: node.path.clone(),
                    output: output.to_string(),
                    message: format!("output {output} already produced by {first}"),
                });
                false
            }
            None => {
                claimed.insert(output.to_string(), node.path.clone());
                true
            }
        }
    }
}

/// Decide which files to produce for every asset in the tree.
pub fn plan(tree: &ContentNode, config: &ImagesConfig) -> AssetPlan {
    let webp = AssetPipeline::new(true);
    let quality = config.quality.min(100) as u8;
    let mut plan = AssetPlan::default();
    let mut claimed: HashMap<String, String> = HashMap::new();

    for node in tree.walk() {
        if !matches!(node.kind, NodeKind::Image | NodeKind::OtherAsset) {
            continue;
        }
        let name = paths::sanitize_filename(&node.path);
        if !assets::is_recognized(&node.path) {
            let output = format!("{STATIC_DIR}/{name}");
            if plan.claim(&mut claimed, node, &output) {
                plan.jobs.push(job(node, output, AssetOp::Copy));
            }
            continue;
        }

        let is_png = node
            .path
            .rsplit('.')
            .next()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        let (out_name, full, preview) = if config.compress_to_webp {
            (
                webp.rewrite(&name).into_owned(),
                OutputFormat::WebpLossless,
                OutputFormat::WebpLossless,
            )
        } else if is_png {
            (
                name,
                OutputFormat::Png { quality },
                OutputFormat::Png { quality: 0 },
            )
        } else {
            (
                name,
                OutputFormat::Jpeg { quality },
                OutputFormat::Jpeg {
                    quality: PLACEHOLDER_JPEG_QUALITY,
                },
            )
        };

        // Placeholder names follow the main output, so one claim covers both
        let output = format!("{STATIC_DIR}/{out_name}");
        if !plan.claim(&mut claimed, node, &output) {
            continue;
        }
        plan.jobs.push(job(node, output, AssetOp::Encode(full)));
        if config.lazy_placeholders {
            plan.jobs.push(job(
                node,
                format!("{STATIC_DIR}/{LAZY_DIR}/{out_name}"),
                AssetOp::Placeholder(preview),
            ));
        }
    }
    plan
}

fn job(node: &ContentNode, output: String, op: AssetOp) -> AssetJob {
    AssetJob {
        source: node.path.clone(),
        output,
        op,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeFailure {
    pub source: String,
    pub output: String,
    pub message: String,
}

/// What a generation run did.
#[derive(Debug, Default)]
pub struct AssetReport {
    pub stats: CacheStats,
    /// Output paths produced or confirmed, relative to the output root.
    pub written: Vec<String>,
    pub failures: Vec<EncodeFailure>,
}

/// Generate static assets with the [`RustEncoder`].
pub fn generate_assets(
    content_root: &Path,
    tree: &ContentNode,
    output_dir: &Path,
    config: &SiteConfig,
) -> Result<AssetReport, EncodeError> {
    generate_assets_with(&RustEncoder, content_root, tree, output_dir, config)
}

/// Generate static assets with a specific backend.
///
/// Only setting up the output directory or saving the cache manifest fail
/// the whole run.
pub fn generate_assets_with(
    backend: &impl EncodeBackend,
    content_root: &Path,
    tree: &ContentNode,
    output_dir: &Path,
    config: &SiteConfig,
) -> Result<AssetReport, EncodeError> {
    fs::create_dir_all(output_dir.join(STATIC_DIR).join(LAZY_DIR))?;

    let AssetPlan { jobs, conflicts } = plan(tree, &config.images);
    let manifest = CacheManifest::load(output_dir);
    let threads = effective_threads(&config.processing);

    let work = || {
        let mut sources: Vec<&str> = jobs.iter().map(|j| j.source.as_str()).collect();
        sources.dedup();
        let hashes: HashMap<&str, Result<String, String>> = sources
            .par_iter()
            .map(|s| (*s, cache::hash_file(&content_root.join(s)).map_err(|e| e.to_string())))
            .collect();

        jobs.par_iter()
            .map(|job| {
                let outcome = match &hashes[job.source.as_str()] {
                    Ok(source_hash) => {
                        run_job(backend, &manifest, content_root, output_dir, job, source_hash)
                            .map(|lookup| (lookup, source_hash.clone()))
                            .map_err(|e| e.to_string())
                    }
                    Err(e) => Err(e.clone()),
                };
                (job, outcome)
            })
            .collect::<Vec<_>>()
    };
    let outcomes = match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(work),
        Err(e) => {
            tracing::warn!(error = %e, "could not build encode pool, using the global pool");
            work()
        }
    };

    let mut manifest = manifest;
    let mut report = AssetReport {
        failures: conflicts,
        ..AssetReport::default()
    };
    for (job, outcome) in outcomes {
        match outcome {
            Ok((lookup, source_hash)) => {
                report.stats.record(&lookup);
                manifest.insert(job.output.clone(), source_hash, job.op.params_hash());
                report.written.push(job.output.clone());
            }
            Err(message) => {
                tracing::warn!(source = %job.source, output = %job.output, error = %message, "asset generation failed");
                report.failures.push(EncodeFailure {
                    source: job.source.clone(),
                    output: job.output.clone(),
                    message,
                });
            }
        }
    }
    manifest.save(output_dir)?;

    tracing::info!(
        assets = report.written.len(),
        failed = report.failures.len(),
        cache = %report.stats,
        "static assets generated"
    );
    Ok(report)
}

fn run_job(
    backend: &impl EncodeBackend,
    manifest: &CacheManifest,
    content_root: &Path,
    output_dir: &Path,
    job: &AssetJob,
    source_hash: &str,
) -> Result<CacheLookup, EncodeError> {
    let output = output_dir.join(&job.output);
    let lookup = manifest.lookup(&job.output, source_hash, &job.op.params_hash(), output_dir);
    match &lookup {
        CacheLookup::Hit => {}
        CacheLookup::Moved(previous) => {
            fs::copy(output_dir.join(previous), &output)?;
        }
        CacheLookup::Miss => {
            let source = content_root.join(&job.source);
            match job.op {
                AssetOp::Encode(format) => backend.encode(&source, &output, format)?,
                AssetOp::Placeholder(format) => backend.placeholder(&source, &output, format)?,
                AssetOp::Copy => {
                    fs::copy(&source, &output)?;
                }
            }
        }
    }
    Ok(lookup)
}
