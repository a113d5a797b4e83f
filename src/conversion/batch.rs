use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::formats::normalize_extension;
use super::{ConversionEngine, ConversionOptions, ConversionRequest, ConversionResult};
use crate::error::{ConvertError, ConvertResult};

/// Where a batch takes its files from
#[derive(Debug, Clone)]
pub enum BatchInput {
    /// Every supported file directly inside the directory (not recursive)
    Directory(PathBuf),
    /// An explicit list of files
    Files(Vec<PathBuf>),
}

/// Progress notifications, delivered in processing order
#[derive(Debug)]
pub enum BatchProgress<'a> {
    Started {
        index: usize,
        total: usize,
        input: &'a Path,
        output: &'a Path,
    },
    Finished {
        index: usize,
        total: usize,
        result: &'a ConversionResult,
    },
}

#[derive(Debug, Clone)]
pub struct FailedConversion {
    pub input_path: PathBuf,
    pub error: String,
}

/// Aggregate counts of one batch run, returned by value
#[derive(Debug, Clone, Default)]
pub struct BatchTally {
    pub converted_count: usize,
    pub failed_count: usize,
    pub outputs: Vec<PathBuf>,
    pub failures: Vec<FailedConversion>,
    pub elapsed: Duration,
}

impl BatchTally {
    pub fn total(&self) -> usize {
        self.converted_count + self.failed_count
    }

    fn record(&mut self, result: &ConversionResult) {
        match &result.error {
            None => {
                self.converted_count += 1;
                self.outputs.push(result.output_path.clone());
            }
            Some(error) => {
                self.failed_count += 1;
                self.failures.push(FailedConversion {
                    input_path: result.input_path.clone(),
                    error: error.clone(),
                });
            }
        }
    }
}

/// Tally of a single conversion
impl From<&ConversionResult> for BatchTally {
    fn from(result: &ConversionResult) -> Self {
        let mut tally = BatchTally {
            elapsed: result.elapsed,
            ..Default::default()
        };
        tally.record(result);
        tally
    }
}

/// Runs the engine over a set of files, one after the other
#[derive(Debug, Clone)]
pub struct BatchRunner {
    engine: ConversionEngine,
}

impl BatchRunner {
    pub fn new(engine: ConversionEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &ConversionEngine {
        &self.engine
    }

    /// Resolve the input into a sorted, de-duplicated list of files.
    ///
    /// Directories match each registered extension in its lowercase or
    /// uppercase spelling only. Listed files must exist and be supported.
    pub fn collect_inputs(&self, input: &BatchInput) -> ConvertResult<Vec<PathBuf>> {
        let registry = self.engine.registry();

        let mut files = match input {
            BatchInput::Directory(dir) => {
                if !dir.exists() {
                    return Err(ConvertError::not_found(dir, "directory does not exist"));
                }
                if !dir.is_dir() {
                    return Err(ConvertError::not_found(
                        dir,
                        "batch mode needs a directory",
                    ));
                }
                debug!("Scanning directory: {}", dir.display());

                let mut accepted: HashSet<String> = HashSet::new();
                for ext in registry.supported_extensions() {
                    let bare = ext.trim_start_matches('.');
                    accepted.insert(bare.to_lowercase());
                    accepted.insert(bare.to_uppercase());
                }

                let mut found = Vec::new();
                for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
                    let entry = entry.map_err(|e| {
                        ConvertError::io(dir, std::io::Error::other(e.to_string()))
                    })?;
                    let path = entry.path();
                    let matches = path
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| accepted.contains(e));
                    if matches && path.is_file() {
                        found.push(path.to_path_buf());
                    }
                }
                found
            }
            BatchInput::Files(list) => {
                for path in list {
                    if !path.exists() {
                        return Err(ConvertError::not_found(path, "file does not exist"));
                    }
                    if !path.is_file() {
                        return Err(ConvertError::not_found(path, "not a file"));
                    }
                    registry.codec_for_path(path)?;
                }
                list.clone()
            }
        };

        files.sort();
        files.dedup();
        debug!("Found {} image files", files.len());
        Ok(files)
    }

    /// Output path for `input` inside `output_dir` with `target_extension`
    pub fn output_path_for(input: &Path, output_dir: &Path, target_extension: &str) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        output_dir.join(format!("{}{}", stem, normalize_extension(target_extension)))
    }

    pub fn run(
        &self,
        input: &BatchInput,
        output_dir: &Path,
        target_extension: &str,
        options: &ConversionOptions,
    ) -> ConvertResult<BatchTally> {
        self.run_with_progress(input, output_dir, target_extension, options, |_| {})
    }

    /// Convert every input into `output_dir`.
    ///
    /// Parameters, the target format and the inputs are all checked before the
    /// output directory is created. Per-file failures only land in the tally.
    pub fn run_with_progress<F>(
        &self,
        input: &BatchInput,
        output_dir: &Path,
        target_extension: &str,
        options: &ConversionOptions,
        mut on_progress: F,
    ) -> ConvertResult<BatchTally>
    where
        F: FnMut(BatchProgress<'_>),
    {
        options.validate()?;
        self.engine.registry().writable_codec_for(target_extension)?;
        let files = self.collect_inputs(input)?;

        std::fs::create_dir_all(output_dir).map_err(|e| ConvertError::io(output_dir, e))?;

        let start = Instant::now();
        let total = files.len();
        let mut tally = BatchTally::default();
        let mut produced: HashSet<PathBuf> = HashSet::new();

        info!(
            "Converting {} files to {} in {}",
            total,
            normalize_extension(target_extension),
            output_dir.display()
        );

        for (index, file) in files.iter().enumerate() {
            let output = Self::output_path_for(file, output_dir, target_extension);
            if !produced.insert(output.clone()) {
                warn!(
                    "{} overwrites an output produced earlier in this batch: {}",
                    file.display(),
                    output.display()
                );
            }

            on_progress(BatchProgress::Started {
                index,
                total,
                input: file,
                output: &output,
            });

            let request = ConversionRequest::new(file, &output, *options);
            let result = match self.engine.convert(&request) {
                Ok(result) => result,
                // The file changed under us after collection
                Err(err) => ConversionResult::failure(&request, err.to_string(), Duration::ZERO),
            };

            tally.record(&result);
            on_progress(BatchProgress::Finished {
                index,
                total,
                result: &result,
            });
        }

        tally.elapsed = start.elapsed();
        info!(
            "Batch finished: {} converted, {} failed",
            tally.converted_count, tally.failed_count
        );
        Ok(tally)
    }
}
