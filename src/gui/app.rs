use eframe::egui;
use photo_converter::conversion::{BatchTally, FormatRegistry};
use photo_converter::utils::heif_advice;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;

use crate::settings::GuiSettings;

#[path = "app_processing.rs"]
mod app_processing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Single,
    Batch,
}

pub struct ConverterApp {
    registry: FormatRegistry,
    settings: GuiSettings,

    // Input/Output
    mode: Mode,
    input_path: String,
    selected_files: Vec<PathBuf>,
    output_path: String,

    // Processing state
    is_processing: bool,
    processed_count: usize,
    total_count: usize,
    current_file: String,

    // Results
    log: Vec<String>,
    results_message: String,
    error_message: String,

    // Communication channel for the worker thread
    message_receiver: Option<Receiver<GuiMessage>>,
}

/// Worker to UI messages. Exactly one `Complete` or `Error` ends a run.
#[derive(Debug)]
pub(crate) enum GuiMessage {
    Log(String),
    Progress {
        current: usize,
        total: usize,
        file: String,
    },
    Complete(BatchTally),
    Error(String),
}

impl ConverterApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let registry = FormatRegistry::detect();
        let mut settings = GuiSettings::load();
        if !registry.writable_extensions().contains(&settings.format) {
            settings.format = GuiSettings::default().format;
        }

        let mut log = Vec::new();
        if !registry.heif_capability().is_available() {
            log.push(heif_advice().to_string());
        }

        Self {
            registry,
            settings,
            mode: Mode::Single,
            input_path: String::new(),
            selected_files: Vec::new(),
            output_path: String::new(),
            is_processing: false,
            processed_count: 0,
            total_count: 0,
            current_file: String::new(),
            log,
            results_message: String::new(),
            error_message: String::new(),
            message_receiver: None,
        }
    }

    /// Switching mode invalidates the output location. A multi-file
    /// selection only exists in batch mode.
    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            self.mode = mode;
            self.output_path.clear();
            if mode == Mode::Single {
                self.selected_files.clear();
            }
        }
    }

    fn input_filter(&self) -> Vec<String> {
        self.registry
            .supported_extensions()
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_string())
            .collect()
    }

    fn dialog_in(dir: Option<&PathBuf>) -> rfd::FileDialog {
        match dir {
            Some(dir) => rfd::FileDialog::new().set_directory(dir),
            None => rfd::FileDialog::new(),
        }
    }

    fn render_file_selection(&mut self, ui: &mut egui::Ui) {
        ui.heading("File Selection");
        ui.separator();

        ui.horizontal(|ui| {
            ui.label("Mode:");
            let mut mode = self.mode;
            ui.radio_value(&mut mode, Mode::Single, "Single file");
            ui.radio_value(&mut mode, Mode::Batch, "Batch");
            self.set_mode(mode);
        });

        // Input
        ui.horizontal(|ui| {
            ui.label("Input:");
            if self.selected_files.is_empty() {
                ui.text_edit_singleline(&mut self.input_path);
            } else {
                ui.label(format!("{} files selected", self.selected_files.len()));
                if ui.button("Clear").clicked() {
                    self.selected_files.clear();
                }
            }

            if ui.button("File...").clicked() {
                let picked = Self::dialog_in(self.settings.last_input_dir.as_ref())
                    .add_filter("Images", &self.input_filter())
                    .pick_file();
                if let Some(path) = picked {
                    self.set_mode(Mode::Single);
                    self.selected_files.clear();
                    self.settings.last_input_dir = path.parent().map(PathBuf::from);
                    self.input_path = path.display().to_string();
                }
            }
            if ui.button("Files...").clicked() {
                let picked = Self::dialog_in(self.settings.last_input_dir.as_ref())
                    .add_filter("Images", &self.input_filter())
                    .pick_files();
                if let Some(paths) = picked.filter(|p| !p.is_empty()) {
                    self.set_mode(Mode::Batch);
                    self.settings.last_input_dir = paths[0].parent().map(PathBuf::from);
                    self.input_path.clear();
                    self.selected_files = paths;
                }
            }
            if ui.button("Folder...").clicked() {
                let picked =
                    Self::dialog_in(self.settings.last_input_dir.as_ref()).pick_folder();
                if let Some(path) = picked {
                    self.set_mode(Mode::Batch);
                    self.selected_files.clear();
                    self.input_path = path.display().to_string();
                    self.settings.last_input_dir = Some(path);
                }
            }
        });

        // Output
        ui.horizontal(|ui| {
            ui.label(match self.mode {
                Mode::Single => "Output file:",
                Mode::Batch => "Output folder:",
            });
            ui.text_edit_singleline(&mut self.output_path);
            if ui.button("Browse...").clicked() {
                self.browse_output();
            }
        });

        ui.add_space(10.0);
    }

    fn browse_output(&mut self) {
        let dialog = Self::dialog_in(self.settings.last_output_dir.as_ref());
        let picked = match self.mode {
            Mode::Single => {
                let extension = self.settings.format.trim_start_matches('.').to_string();
                dialog
                    .set_file_name(app_processing::default_output_name(
                        &self.input_path,
                        &self.settings.format,
                    ))
                    .add_filter(extension.to_uppercase(), &[extension])
                    .save_file()
            }
            Mode::Batch => dialog.pick_folder(),
        };

        if let Some(path) = picked {
            self.settings.last_output_dir = match self.mode {
                Mode::Single => path.parent().map(PathBuf::from),
                Mode::Batch => Some(path.clone()),
            };
            self.output_path = path.display().to_string();
        }
    }

    fn render_conversion_settings(&mut self, ui: &mut egui::Ui) {
        ui.heading("Conversion Settings");
        ui.separator();

        let writable = self.registry.writable_extensions();
        ui.horizontal(|ui| {
            ui.label("Output format:");
            egui::ComboBox::from_id_salt("output_format")
                .selected_text(self.settings.format.clone())
                .show_ui(ui, |ui| {
                    for ext in &writable {
                        ui.selectable_value(&mut self.settings.format, ext.clone(), ext.as_str());
                    }
                });
        });

        ui.horizontal(|ui| {
            ui.checkbox(&mut self.settings.override_quality, "Override quality");
            ui.add_enabled(
                self.settings.override_quality,
                egui::Slider::new(&mut self.settings.quality, 1..=100),
            );
        });
        ui.label("(Applies to JPEG, WebP and HEIC only)");

        ui.horizontal(|ui| {
            ui.checkbox(&mut self.settings.resize_enabled, "Resize to");
            ui.add_enabled(
                self.settings.resize_enabled,
                egui::TextEdit::singleline(&mut self.settings.resize_width).desired_width(60.0),
            );
            ui.label("x");
            ui.add_enabled(
                self.settings.resize_enabled,
                egui::TextEdit::singleline(&mut self.settings.resize_height).desired_width(60.0),
            );
        });
        ui.label("(Exact size, aspect ratio is not preserved)");

        ui.add_space(10.0);
    }

    fn render_convert_button(&mut self, ui: &mut egui::Ui) {
        ui.separator();

        let button_text = if self.is_processing {
            "Converting..."
        } else {
            "Convert"
        };

        let button = egui::Button::new(button_text).min_size(egui::vec2(200.0, 40.0));

        if ui.add_enabled(!self.is_processing, button).clicked() {
            self.start_conversion();
        }

        ui.add_space(10.0);
    }

    fn render_progress(&mut self, ui: &mut egui::Ui) {
        if self.is_processing {
            ui.horizontal(|ui| {
                ui.spinner();
                if self.total_count > 0 {
                    ui.label(format!(
                        "Converting: {}/{}",
                        self.processed_count, self.total_count
                    ));
                }
                ui.label(&self.current_file);
            });
            ui.add(egui::ProgressBar::new(0.0).animate(true));
        }

        if !self.results_message.is_empty() {
            ui.label(&self.results_message);
        }

        if !self.error_message.is_empty() {
            ui.colored_label(egui::Color32::RED, &self.error_message);
        }
    }

    fn render_log(&mut self, ui: &mut egui::Ui) {
        ui.heading("Status");
        ui.separator();

        egui::ScrollArea::vertical()
            .id_salt("status_log")
            .max_height(200.0)
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &self.log {
                    ui.monospace(line);
                }
            });
    }
}

impl eframe::App for ConverterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_messages();

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Photo Converter");
                ui.label("Convert images between JPEG, PNG, WebP, GIF, BMP, TIFF and HEIC");
                ui.add_space(20.0);

                self.render_file_selection(ui);
                self.render_conversion_settings(ui);
                self.render_convert_button(ui);
                self.render_progress(ui);
                self.render_log(ui);
            });
        });

        if self.is_processing {
            ctx.request_repaint();
        }
    }
}
