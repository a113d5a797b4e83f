// Conversion logic for the GUI
// Runs one request or batch on a worker thread and reports back over a channel

use super::{ConverterApp, GuiMessage, Mode};
use photo_converter::conversion::{
    BatchInput, BatchProgress, BatchRunner, BatchTally, ConversionEngine, ConversionOptions,
    ConversionRequest, TargetSize,
};
use photo_converter::utils::{display_name, heif_advice, looks_like_heif};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Sender};
use tracing::warn;

/// Work handed to the worker thread
enum Job {
    Single { input: PathBuf, output: PathBuf },
    Batch {
        input: BatchInput,
        output_dir: PathBuf,
        extension: String,
    },
}

/// Positive integer from a resize field
pub(crate) fn parse_dimension(value: &str, label: &str) -> Result<u32, String> {
    match value.trim().parse::<i64>() {
        Ok(n) if n > 0 => u32::try_from(n).map_err(|_| format!("{} is too large", label)),
        Ok(_) => Err(format!("{} must be a positive number", label)),
        Err(_) => Err(format!("{} must be a whole number", label)),
    }
}

/// Suggested file name for the save dialog: input stem plus target extension
pub(crate) fn default_output_name(input: &str, extension: &str) -> String {
    let stem = Path::new(input)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "converted".to_string());
    format!("{}{}", stem, extension)
}

pub(crate) fn summary_message(tally: &BatchTally) -> String {
    format!(
        "Conversion Complete!\nConverted: {}\nFailed: {}",
        tally.converted_count, tally.failed_count
    )
}

impl ConverterApp {
    pub fn start_conversion(&mut self) {
        self.error_message.clear();

        let options = match self.validate() {
            Ok(options) => options,
            Err(message) => {
                self.error_message = message;
                return;
            }
        };

        if let Err(e) = self.settings.save() {
            warn!("Could not save GUI settings: {:#}", e);
        }

        self.log.clear();
        self.results_message.clear();
        self.is_processing = true;
        self.processed_count = 0;
        self.total_count = 0;
        self.current_file.clear();

        let (tx, rx) = channel();
        self.message_receiver = Some(rx);

        let runner = BatchRunner::new(ConversionEngine::new(self.registry.clone()));
        let job = self.job();

        std::thread::spawn(move || run_job(&runner, job, &options, &tx));
    }

    /// Check the form, returning the options to convert with
    fn validate(&self) -> Result<ConversionOptions, String> {
        let has_input = match self.mode {
            Mode::Single => !self.input_path.trim().is_empty(),
            Mode::Batch => !self.input_path.trim().is_empty() || !self.selected_files.is_empty(),
        };
        if !has_input {
            return Err(match self.mode {
                Mode::Single => "Please select an input file".to_string(),
                Mode::Batch => "Please select an input folder or files".to_string(),
            });
        }
        if self.output_path.trim().is_empty() {
            return Err(match self.mode {
                Mode::Single => "Please select an output file".to_string(),
                Mode::Batch => "Please select an output folder".to_string(),
            });
        }

        let quality = self
            .settings
            .override_quality
            .then_some(self.settings.quality);

        let target_size = if self.settings.resize_enabled {
            let width = parse_dimension(&self.settings.resize_width, "Width")?;
            let height = parse_dimension(&self.settings.resize_height, "Height")?;
            Some(TargetSize::new(width, height).map_err(|e| e.to_string())?)
        } else {
            None
        };

        let options = ConversionOptions {
            quality,
            target_size,
        };
        options.validate().map_err(|e| e.to_string())?;
        Ok(options)
    }

    fn job(&self) -> Job {
        let output = PathBuf::from(self.output_path.trim());
        match self.mode {
            Mode::Single => Job::Single {
                input: PathBuf::from(self.input_path.trim()),
                output,
            },
            Mode::Batch => Job::Batch {
                input: if self.selected_files.is_empty() {
                    BatchInput::Directory(PathBuf::from(self.input_path.trim()))
                } else {
                    BatchInput::Files(self.selected_files.clone())
                },
                output_dir: output,
                extension: self.settings.format.clone(),
            },
        }
    }

    /// Apply messages from the worker thread
    pub fn check_messages(&mut self) {
        let mut messages = Vec::new();
        if let Some(ref receiver) = self.message_receiver {
            while let Ok(msg) = receiver.try_recv() {
                messages.push(msg);
            }
        }

        let mut finished = false;
        for msg in messages {
            match msg {
                GuiMessage::Log(line) => self.log.push(line),
                GuiMessage::Progress {
                    current,
                    total,
                    file,
                } => {
                    self.processed_count = current;
                    self.total_count = total;
                    self.current_file = file;
                }
                GuiMessage::Complete(tally) => {
                    self.is_processing = false;
                    self.results_message = summary_message(&tally);
                    self.log.push(format!(
                        "Conversion Complete! Converted: {}, Failed: {}",
                        tally.converted_count, tally.failed_count
                    ));
                    finished = true;
                }
                GuiMessage::Error(err) => {
                    self.is_processing = false;
                    self.log.push(format!("Error: {}", err));
                    self.error_message = err;
                    finished = true;
                }
            }
        }

        if finished {
            self.message_receiver = None;
        }
    }
}

fn run_job(runner: &BatchRunner, job: Job, options: &ConversionOptions, tx: &Sender<GuiMessage>) {
    let send = |msg: GuiMessage| {
        let _ = tx.send(msg);
    };

    match job {
        Job::Single { input, output } => {
            if looks_like_heif(&input)
                && !runner.engine().registry().heif_capability().is_available()
            {
                send(GuiMessage::Log(heif_advice().to_string()));
            }

            send(GuiMessage::Progress {
                current: 0,
                total: 1,
                file: display_name(&input),
            });
            send(GuiMessage::Log(format!(
                "Converting {} -> {}",
                input.display(),
                output.display()
            )));

            let request = ConversionRequest::new(&input, &output, *options);
            match runner.engine().convert(&request) {
                Ok(result) => {
                    match &result.error {
                        None => send(GuiMessage::Log(format!("Saved {}", output.display()))),
                        Some(err) => send(GuiMessage::Log(format!("Failed: {}", err))),
                    }
                    send(GuiMessage::Complete(BatchTally::from(&result)));
                }
                Err(e) => send(GuiMessage::Error(e.to_string())),
            }
        }
        Job::Batch {
            input,
            output_dir,
            extension,
        } => {
            if let BatchInput::Directory(dir) = &input {
                send(GuiMessage::Log(format!("Scanning {}", dir.display())));
            }

            let files = match runner.collect_inputs(&input) {
                Ok(files) => files,
                Err(e) => {
                    send(GuiMessage::Error(e.to_string()));
                    return;
                }
            };
            if files.is_empty() {
                send(GuiMessage::Error("No image files found".to_string()));
                return;
            }
            send(GuiMessage::Log(format!(
                "Found {} image files, converting to {} in {}",
                files.len(),
                extension,
                output_dir.display()
            )));

            let outcome =
                runner.run_with_progress(&input, &output_dir, &extension, options, |event| {
                    match event {
                        BatchProgress::Started {
                            index,
                            total,
                            input,
                            output,
                        } => {
                            send(GuiMessage::Progress {
                                current: index,
                                total,
                                file: display_name(input),
                            });
                            send(GuiMessage::Log(format!(
                                "[{}/{}] {} -> {}",
                                index + 1,
                                total,
                                display_name(input),
                                display_name(output)
                            )));
                        }
                        BatchProgress::Finished {
                            index,
                            total,
                            result,
                        } => {
                            if let Some(err) = &result.error {
                                send(GuiMessage::Log(format!("  Failed: {}", err)));
                            }
                            send(GuiMessage::Progress {
                                current: index + 1,
                                total,
                                file: display_name(&result.input_path),
                            });
                        }
                    }
                });

            match outcome {
                Ok(tally) => send(GuiMessage::Complete(tally)),
                Err(e) => send(GuiMessage::Error(e.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba, RgbaImage};
    use crate::settings::GuiSettings;
    use photo_converter::conversion::{Capability, FormatRegistry};
    use tempfile::TempDir;

    fn runner() -> BatchRunner {
        BatchRunner::new(ConversionEngine::new(FormatRegistry::new(
            Capability::Unavailable,
        )))
    }

    fn drain(rx: std::sync::mpsc::Receiver<GuiMessage>) -> Vec<GuiMessage> {
        rx.try_iter().collect()
    }

    #[test]
    fn test_parse_dimension() {
        assert_eq!(parse_dimension(" 640 ", "Width"), Ok(640));
        assert_eq!(
            parse_dimension("0", "Width"),
            Err("Width must be a positive number".to_string())
        );
        assert_eq!(
            parse_dimension("-3", "Height"),
            Err("Height must be a positive number".to_string())
        );
        assert!(parse_dimension("wide", "Width").is_err());
    }

    #[test]
    fn test_default_output_name() {
        assert_eq!(default_output_name("/photos/IMG_1.HEIC", ".jpg"), "IMG_1.jpg");
        assert_eq!(default_output_name("", ".png"), "converted.png");
    }

    #[test]
    fn test_summary_message() {
        let tally = BatchTally {
            converted_count: 3,
            failed_count: 1,
            ..Default::default()
        };
        assert_eq!(
            summary_message(&tally),
            "Conversion Complete!\nConverted: 3\nFailed: 1"
        );
    }

    fn app_with_files(files: Vec<PathBuf>) -> ConverterApp {
        ConverterApp {
            registry: FormatRegistry::new(Capability::Unavailable),
            settings: GuiSettings::default(),
            mode: Mode::Batch,
            input_path: String::new(),
            selected_files: files,
            output_path: "out".to_string(),
            is_processing: false,
            processed_count: 0,
            total_count: 0,
            current_file: String::new(),
            log: Vec::new(),
            results_message: String::new(),
            error_message: String::new(),
            message_receiver: None,
        }
    }

    #[test]
    fn test_switching_to_single_drops_file_selection() {
        let mut app = app_with_files(vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
        assert!(app.validate().is_ok());

        app.set_mode(Mode::Single);
        assert!(app.selected_files.is_empty());
        assert!(app.output_path.is_empty());

        app.output_path = "out.jpg".to_string();
        assert_eq!(app.validate().unwrap_err(), "Please select an input file");
    }

    #[test]
    fn test_single_mode_ignores_stale_selection() {
        let mut app = app_with_files(vec![PathBuf::from("a.png")]);
        app.mode = Mode::Single;
        assert!(app.validate().is_err());
    }

    #[test]
    fn test_batch_job_ends_with_one_complete() {
        let dir = TempDir::new().unwrap();
        let img: RgbaImage = ImageBuffer::from_fn(8, 8, |x, _| Rgba([x as u8 * 30, 0, 0, 128]));
        img.save(dir.path().join("a.png")).unwrap();
        img.save(dir.path().join("b.png")).unwrap();
        std::fs::write(dir.path().join("c.png"), b"not a png").unwrap();

        let (tx, rx) = channel();
        let job = Job::Batch {
            input: BatchInput::Directory(dir.path().to_path_buf()),
            output_dir: dir.path().join("out"),
            extension: ".jpg".to_string(),
        };
        run_job(&runner(), job, &ConversionOptions::default(), &tx);

        let messages = drain(rx);
        let finals: Vec<_> = messages
            .iter()
            .filter(|m| matches!(m, GuiMessage::Complete(_) | GuiMessage::Error(_)))
            .collect();
        assert_eq!(finals.len(), 1);
        match finals[0] {
            GuiMessage::Complete(tally) => {
                assert_eq!(tally.converted_count, 2);
                assert_eq!(tally.failed_count, 1);
            }
            other => panic!("unexpected final message: {:?}", other),
        }
        assert!(matches!(messages.last(), Some(GuiMessage::Complete(_))));
    }

    #[test]
    fn test_single_job_with_missing_input_reports_error() {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = channel();
        let job = Job::Single {
            input: dir.path().join("missing.png"),
            output: dir.path().join("out.jpg"),
        };
        run_job(&runner(), job, &ConversionOptions::default(), &tx);

        assert!(matches!(drain(rx).last(), Some(GuiMessage::Error(_))));
        assert!(!dir.path().join("out.jpg").exists());
    }

    #[test]
    fn test_empty_folder_reports_error() {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = channel();
        let job = Job::Batch {
            input: BatchInput::Directory(dir.path().to_path_buf()),
            output_dir: dir.path().join("out"),
            extension: ".png".to_string(),
        };
        run_job(&runner(), job, &ConversionOptions::default(), &tx);

        match drain(rx).last() {
            Some(GuiMessage::Error(message)) => assert_eq!(message, "No image files found"),
            other => panic!("unexpected final message: {:?}", other),
        }
    }
}
