// GUI entry point for photo-converter
// Graphical front-end over the same conversion engine as the CLI

use eframe::egui;

mod app;
mod settings;
use app::ConverterApp;

fn main() -> Result<(), eframe::Error> {
    photo_converter::utils::init_logging(false);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 600.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Photo Converter",
        options,
        Box::new(|cc| Ok(Box::new(ConverterApp::new(cc)))),
    )
}
