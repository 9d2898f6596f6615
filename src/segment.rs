//! A depth-bounded view over one well's data and core imagery.
//!
//! Datasets are declared once in [`DATASETS`] with their index kind and are
//! loaded lazily from `<segment dir>/<name>.<ext>` through the
//! [`LoaderRegistry`]. Every loaded dataset is restricted to the segment's
//! `[depth_from, depth_to)`; slicing re-applies the same predicates to deep
//! copies, so two segments never share a buffer.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use log::{debug, info, warn};

use crate::config::{MatchParams, SegmentMeta, SegmentOptions};
use crate::core_image::{self, check_no_overlap, CoreImagePair, SampleImages};
use crate::data::filter::filter_dataset;
use crate::data::loader::{find_file, LoaderRegistry};
use crate::data::model::{Dataset, DepthFrame, Interval, IntervalFrame, Table};
use crate::error::{Result, WellError};
use crate::matching::apply::{shift_depth_frame, shift_interval_frame};
use crate::matching::{self, plan_shifts, MatchReport};

pub const META_FILE: &str = "meta.json";
pub const SAMPLES_DL_DIR: &str = "samples_dl";
pub const SAMPLES_UV_DIR: &str = "samples_uv";
/// Column of the `samples` dataset holding the photograph file name.
pub const SAMPLE_COLUMN: &str = "SAMPLE";

// ---------------------------------------------------------------------------
// Dataset descriptors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    /// Keyed by `DEPTH`.
    Depth,
    /// Keyed by `DEPTH_FROM`, `DEPTH_TO`.
    Interval,
    /// No depth key, loaded verbatim.
    Plain,
}

pub const DATASETS: &[(&str, DatasetKind)] = &[
    ("logs", DatasetKind::Depth),
    ("core_properties", DatasetKind::Depth),
    ("core_logs", DatasetKind::Depth),
    ("layers", DatasetKind::Interval),
    ("boring_intervals", DatasetKind::Interval),
    ("core_lithology", DatasetKind::Interval),
    ("samples", DatasetKind::Interval),
    ("inclination", DatasetKind::Plain),
];

pub fn dataset_kind(name: &str) -> Option<DatasetKind> {
    DATASETS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, kind)| *kind)
}

/// Datasets whose depths are rewritten by [`Segment::match_core_logs`].
pub const CORE_DERIVED: &[&str] = &["core_logs", "core_properties", "core_lithology"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    Unmatched,
    Matched,
}

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Segment {
    path: PathBuf,
    meta: SegmentMeta,
    options: SegmentOptions,
    registry: LoaderRegistry,
    datasets: BTreeMap<String, Dataset>,
    core_images: Option<CoreImagePair>,
    state: MatchState,
}

impl Segment {
    /// Open the segment stored in `path` (reads `meta.json`).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let meta = SegmentMeta::read(&path.join(META_FILE))?;
        Segment::new(path, meta, SegmentOptions::default())
    }

    pub fn new(path: impl AsRef<Path>, meta: SegmentMeta, options: SegmentOptions) -> Result<Self> {
        options.validate()?;
        Ok(Segment {
            path: path.as_ref().to_path_buf(),
            meta,
            options,
            registry: LoaderRegistry::default(),
            datasets: BTreeMap::new(),
            core_images: None,
            state: MatchState::Unmatched,
        })
    }

    pub fn with_registry(mut self, registry: LoaderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn field(&self) -> &str {
        &self.meta.field
    }

    pub fn depth_from(&self) -> i64 {
        self.meta.depth_from
    }

    pub fn depth_to(&self) -> i64 {
        self.meta.depth_to
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn meta(&self) -> &SegmentMeta {
        &self.meta
    }

    pub fn options(&self) -> SegmentOptions {
        self.options
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.datasets.contains_key(name)
    }

    /// Already-loaded dataset, without touching the disk.
    pub fn loaded(&self, name: &str) -> Option<&Dataset> {
        self.datasets.get(name)
    }

    /// Already-registered core images, without building them.
    pub fn cached_core_images(&self) -> Option<&CoreImagePair> {
        self.core_images.as_ref()
    }

    /// Change the image geometry; cached images are discarded.
    pub fn set_options(&mut self, options: SegmentOptions) -> Result<()> {
        options.validate()?;
        if options != self.options {
            self.core_images = None;
        }
        self.options = options;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Datasets
    // -----------------------------------------------------------------------

    /// (Re)load `name` from disk, filtered to the segment's depth range.
    ///
    /// Reloading a core-derived dataset of a matched segment discards the
    /// other core-derived datasets and resets the segment to unmatched.
    pub fn load(&mut self, name: &str) -> Result<&Dataset> {
        let kind = dataset_kind(name)
            .ok_or_else(|| WellError::validation(format!("unknown dataset {name:?}")))?;
        let path = find_file(&self.path, name)?;
        let table = self.registry.load(&path)?;

        let indexed = match kind {
            DatasetKind::Depth => table.into_depth_frame().map(Dataset::Depth),
            DatasetKind::Interval => table.into_interval_frame().map(Dataset::Interval),
            DatasetKind::Plain => Ok(Dataset::Plain(table)),
        }
        .map_err(|source| WellError::Load {
            path: path.clone(),
            source,
        })?;

        let (from, to) = self.bounds();
        let dataset = filter_dataset(&indexed, from, to);
        debug!(
            "{}: loaded {name} from {} ({} of {} rows in range)",
            self.meta.name,
            path.display(),
            dataset.len(),
            indexed.len()
        );
        if self.state == MatchState::Matched && CORE_DERIVED.contains(&name) {
            // fresh rows are uncorrected and must not sit next to shifted ones
            info!(
                "{}: reloaded {name} on a matched segment, core depths are reset",
                self.meta.name
            );
            for derived in CORE_DERIVED {
                self.datasets.remove(*derived);
            }
            self.state = MatchState::Unmatched;
        }
        self.datasets.insert(name.to_string(), dataset);
        Ok(&self.datasets[name])
    }

    /// Cached dataset, loaded on first access.
    pub fn dataset(&mut self, name: &str) -> Result<&Dataset> {
        if !self.datasets.contains_key(name) {
            return self.load(name);
        }
        Ok(&self.datasets[name])
    }

    fn depth_frame(&mut self, name: &str) -> Result<&DepthFrame> {
        self.dataset(name)?
            .as_depth()
            .ok_or_else(|| WellError::validation(format!("{name} is not depth-indexed")))
    }

    fn interval_frame(&mut self, name: &str) -> Result<&IntervalFrame> {
        self.dataset(name)?
            .as_interval()
            .ok_or_else(|| WellError::validation(format!("{name} is not interval-indexed")))
    }

    pub fn logs(&mut self) -> Result<&DepthFrame> {
        self.depth_frame("logs")
    }

    pub fn core_logs(&mut self) -> Result<&DepthFrame> {
        self.depth_frame("core_logs")
    }

    pub fn core_properties(&mut self) -> Result<&DepthFrame> {
        self.depth_frame("core_properties")
    }

    pub fn layers(&mut self) -> Result<&IntervalFrame> {
        self.interval_frame("layers")
    }

    pub fn boring_intervals(&mut self) -> Result<&IntervalFrame> {
        self.interval_frame("boring_intervals")
    }

    pub fn core_lithology(&mut self) -> Result<&IntervalFrame> {
        self.interval_frame("core_lithology")
    }

    pub fn samples(&mut self) -> Result<&IntervalFrame> {
        self.interval_frame("samples")
    }

    pub fn inclination(&mut self) -> Result<&Table> {
        self.dataset("inclination")?
            .as_plain()
            .ok_or_else(|| WellError::validation("inclination is not unindexed"))
    }

    fn bounds(&self) -> (f64, f64) {
        (self.meta.depth_from as f64, self.meta.depth_to as f64)
    }

    // -----------------------------------------------------------------------
    // Slicing
    // -----------------------------------------------------------------------

    /// A new segment over `[depth_from, depth_to)`, which must lie inside this one.
    ///
    /// Loaded datasets are re-filtered, unloaded ones stay unloaded, and
    /// registered core images are cropped rather than rebuilt.
    pub fn slice(&self, depth_from: i64, depth_to: i64) -> Result<Segment> {
        if !(self.meta.depth_from <= depth_from
            && depth_from <= depth_to
            && depth_to <= self.meta.depth_to)
        {
            return Err(WellError::validation(format!(
                "slice [{depth_from}, {depth_to}) is outside segment {} [{}, {})",
                self.meta.name, self.meta.depth_from, self.meta.depth_to
            )));
        }

        let (from, to) = (depth_from as f64, depth_to as f64);
        let datasets = self
            .datasets
            .iter()
            .map(|(name, ds)| (name.clone(), filter_dataset(ds, from, to)))
            .collect();
        debug!(
            "{}: sliced to [{depth_from}, {depth_to})",
            self.meta.name
        );

        Ok(Segment {
            path: self.path.clone(),
            meta: SegmentMeta {
                depth_from,
                depth_to,
                ..self.meta.clone()
            },
            options: self.options,
            registry: self.registry.clone(),
            datasets,
            core_images: self
                .core_images
                .as_ref()
                .map(|pair| pair.crop(depth_from, depth_to)),
            state: self.state,
        })
    }

    // -----------------------------------------------------------------------
    // Log column editing
    // -----------------------------------------------------------------------

    fn check_mnemonics(&mut self, mnemonics: &[&str]) -> Result<()> {
        let logs = self.logs()?;
        if let Some(missing) = mnemonics.iter().find(|m| logs.column_index(m).is_none()) {
            return Err(WellError::not_found(format!("log {missing}"), "logs"));
        }
        Ok(())
    }

    /// A copy of the segment whose `logs` hold only `mnemonics`, in that order.
    pub fn keep_logs(&mut self, mnemonics: &[&str]) -> Result<Segment> {
        self.check_mnemonics(mnemonics)?;
        let mut res = self.clone();
        let kept = res
            .logs()?
            .select_columns(mnemonics)
            .ok_or_else(|| WellError::not_found("log", "logs"))?;
        res.datasets.insert("logs".to_string(), Dataset::Depth(kept));
        Ok(res)
    }

    /// A copy of the segment without the `mnemonics` logs.
    pub fn drop_logs(&mut self, mnemonics: &[&str]) -> Result<Segment> {
        self.check_mnemonics(mnemonics)?;
        let keep: Vec<String> = self
            .logs()?
            .columns
            .iter()
            .filter(|c| !mnemonics.contains(&c.as_str()))
            .cloned()
            .collect();
        let keep: Vec<&str> = keep.iter().map(String::as_str).collect();
        self.keep_logs(&keep)
    }

    /// Rename log columns in place; names not in `mapping` are unchanged.
    pub fn rename_logs(&mut self, mapping: &BTreeMap<String, String>) -> Result<()> {
        self.logs()?;
        if let Some(Dataset::Depth(logs)) = self.datasets.get_mut("logs") {
            for column in &mut logs.columns {
                if let Some(new_name) = mapping.get(column.as_str()) {
                    *column = new_name.clone();
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Core images
    // -----------------------------------------------------------------------

    /// Registered daylight/ultraviolet images, built on first access.
    pub fn core_images(&mut self) -> Result<&CoreImagePair> {
        if self.core_images.is_none() {
            self.load_core()?;
        }
        self.core_images
            .as_ref()
            .ok_or_else(|| WellError::not_found("core images", self.meta.name.clone()))
    }

    /// Rebuild the core images from the sample photographs.
    pub fn load_core(&mut self) -> Result<&CoreImagePair> {
        let samples = self.sample_images()?;
        let pair = core_image::register(
            self.meta.depth_from,
            self.meta.depth_to,
            &self.options,
            &samples,
        )?;
        debug!(
            "{}: registered {} samples into {:?} px",
            self.meta.name,
            samples.len(),
            pair.shape()
        );
        Ok(self.core_images.insert(pair))
    }

    fn sample_names(&mut self) -> Result<Vec<(String, Interval)>> {
        let samples = self.samples()?;
        let names = samples.column(SAMPLE_COLUMN).ok_or_else(|| {
            WellError::not_found(format!("column {SAMPLE_COLUMN}"), "samples")
        })?;
        Ok(names
            .into_iter()
            .map(|v| v.to_string())
            .zip(samples.intervals.iter().copied())
            .collect())
    }

    fn sample_images(&mut self) -> Result<Vec<SampleImages>> {
        let samples = self.sample_names()?;
        // validate before decoding any photograph
        check_no_overlap(samples.iter().map(|(n, iv)| (n.as_str(), *iv)))?;
        samples
            .into_iter()
            .map(|(name, interval)| {
                Ok(SampleImages {
                    dl: self.load_sample_image(SAMPLES_DL_DIR, &name)?,
                    uv: self.load_sample_image(SAMPLES_UV_DIR, &name)?,
                    name,
                    interval,
                })
            })
            .collect()
    }

    /// `dir/name` if `name` has an extension, otherwise the single `dir/name.*`.
    fn load_sample_image(&self, dir: &str, name: &str) -> Result<Option<DynamicImage>> {
        let dir = self.path.join(dir);
        let path = if Path::new(name).extension().is_some() {
            dir.join(name)
        } else {
            match find_file(&dir, name) {
                Ok(path) => path,
                Err(WellError::NotFound { .. }) => return Ok(None),
                Err(e) => return Err(e),
            }
        };
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(image::open(&path)?))
    }

    // -----------------------------------------------------------------------
    // Core chunks
    // -----------------------------------------------------------------------

    /// Continuous runs of flush samples.
    pub fn core_chunks(&mut self) -> Result<Vec<Interval>> {
        let mut samples = self.sample_names()?;
        check_no_overlap(samples.iter().map(|(n, iv)| (n.as_str(), *iv)))?;
        samples.sort_by(|a, b| a.1.depth_from.total_cmp(&b.1.depth_from));

        let mut chunks: Vec<Interval> = Vec::new();
        for (_, iv) in samples {
            match chunks.last_mut() {
                Some(last) if last.depth_to == iv.depth_from => last.depth_to = iv.depth_to,
                _ => chunks.push(iv),
            }
        }
        Ok(chunks)
    }

    /// One segment per core chunk, clamped to this segment's bounds.
    pub fn split_by_core(&mut self) -> Result<Vec<Segment>> {
        self.core_chunks()?
            .into_iter()
            .map(|chunk| {
                let from = (chunk.depth_from.floor() as i64).max(self.meta.depth_from);
                let to = (chunk.depth_to.ceil() as i64).min(self.meta.depth_to);
                self.slice(from, to.max(from))
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Depth matching
    // -----------------------------------------------------------------------

    fn log_series(&mut self, dataset: &str, mnemonic: &str) -> Result<Vec<(f64, f64)>> {
        self.depth_frame(dataset)?
            .series(mnemonic)
            .ok_or_else(|| WellError::not_found(format!("log {mnemonic}"), dataset.to_string()))
    }

    /// R² between the wireline and core log `mnemonic` at the current depths.
    pub fn matching_r2(&mut self, mnemonic: &str) -> Result<Option<f64>> {
        let wireline = self.log_series("logs", mnemonic)?;
        let core = self.log_series("core_logs", mnemonic)?;
        Ok(matching::matching_r2(&wireline, &core))
    }

    /// Shift core-derived depths to best agree with the wireline log.
    ///
    /// Depths of `core_logs`, `core_properties` (if present) and
    /// `core_lithology` are rewritten; the uncorrected depths are gone.
    /// Fails with [`WellError::AlreadyMatched`] on a matched segment unless
    /// `params.allow_rematch` is set, since shifts would compound.
    pub fn match_core_logs(&mut self, params: &MatchParams) -> Result<MatchReport> {
        if self.state == MatchState::Matched && !params.allow_rematch {
            return Err(WellError::AlreadyMatched(self.meta.name.clone()));
        }
        params.validate()?;

        let wireline = self.log_series("logs", &params.mnemonic)?;
        let core = self.log_series("core_logs", &params.mnemonic)?;
        let boring = self.boring_intervals()?.intervals.clone();
        let lithology = self.core_lithology()?.intervals.clone();

        let (groups, shifts) = plan_shifts(&wireline, &core, &boring, &lithology, params)?;

        // Everything is loaded and shifted before the cache is touched, so a
        // failure leaves the segment as it was.
        let (core_logs, core_logs_stats) =
            shift_depth_frame(self.core_logs()?, &shifts, params.uncovered_rows);
        let core_properties = match self.core_properties() {
            Ok(frame) => Some(shift_depth_frame(frame, &shifts, params.uncovered_rows)),
            Err(WellError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };
        let lithology = shift_interval_frame(self.core_lithology()?, &shifts);

        self.datasets
            .insert("core_logs".to_string(), Dataset::Depth(core_logs));
        let core_properties_stats = core_properties.map(|(frame, stats)| {
            self.datasets
                .insert("core_properties".to_string(), Dataset::Depth(frame));
            stats
        });
        self.datasets
            .insert("core_lithology".to_string(), Dataset::Interval(lithology));

        if core_logs_stats.uncovered > 0 {
            warn!(
                "{}: {} core log rows are outside every lithology interval ({:?})",
                self.meta.name, core_logs_stats.uncovered, params.uncovered_rows
            );
        }
        info!(
            "{}: matched {} groups, {} shift records, {} core log rows shifted",
            self.meta.name,
            groups.len(),
            shifts.len(),
            core_logs_stats.shifted
        );

        self.state = MatchState::Matched;
        Ok(MatchReport {
            mnemonic: params.mnemonic.clone(),
            groups,
            shifts,
            core_logs: core_logs_stats,
            core_properties: core_properties_stats,
        })
    }
}
