use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use indicatif::ProgressBar;
use std::path::Path;

use photo_converter::cli::Args;
use photo_converter::conversion::{
    BatchInput, BatchProgress, BatchRunner, Codec, ConversionEngine, ConversionOptions,
    ConversionRequest, FormatRegistry,
};
use photo_converter::utils::{
    create_progress_bar, display_name, error_println, format_duration, formats_table,
    heif_advice, init_logging, looks_like_heif, warn_println,
};
use photo_converter::JsonMessage;

fn main() -> Result<()> {
    let mut args = Args::parse();
    args.load_and_merge_config()?;
    init_logging(args.verbose);

    let registry = FormatRegistry::detect();

    if !args.json {
        println!("{}", style("Photo Converter").bold().blue());
        println!();
    }

    if args.list_formats {
        if args.json {
            for msg in JsonMessage::formats(&registry) {
                msg.emit();
            }
        } else {
            print_formats(&registry);
        }
        return Ok(());
    }

    if args.verbose && !args.json {
        println!(
            "Supported formats: {}",
            registry.supported_extensions().join(", ")
        );
        if !registry.heif_capability().is_available() {
            println!("{} {}", style("Note:").yellow(), heif_advice());
        }
        println!();
    }

    let json = args.json;
    let outcome = run(&args, registry);
    if let Err(e) = &outcome {
        if json {
            JsonMessage::error(format!("{:#}", e));
            std::process::exit(1);
        }
    }
    let converted_ok = outcome?;

    if !converted_ok {
        std::process::exit(1);
    }
    Ok(())
}

/// Returns false when a single-file conversion failed
fn run(args: &Args, registry: FormatRegistry) -> Result<bool> {
    // Rejected before any file is touched
    let options = args.conversion_options()?;
    let input = args
        .input_path
        .as_deref()
        .context("An input path is required")?;

    if looks_like_heif(input) && !registry.heif_capability().is_available() && !args.json {
        warn_println(heif_advice());
    }

    let runner = BatchRunner::new(ConversionEngine::new(registry));

    if args.batch {
        run_batch(args, input, &runner, &options)?;
        Ok(true)
    } else {
        run_single(args, input, runner.engine(), &options)
    }
}

fn run_single(
    args: &Args,
    input: &Path,
    engine: &ConversionEngine,
    options: &ConversionOptions,
) -> Result<bool> {
    let output = args
        .output_path
        .as_deref()
        .context("Output path is required for single file conversion")?;

    if args.verbose && !args.json {
        println!("Converting: {} -> {}", input.display(), output.display());
    }

    let request = ConversionRequest::new(input, output, *options);
    let result = engine.convert(&request)?;

    if args.json {
        JsonMessage::from_result(&result).emit();
        return Ok(result.succeeded());
    }

    match &result.error {
        None => {
            println!("{}", style("Conversion successful!").bold().green());
            if args.verbose {
                println!("  Time: {}", style(format_duration(result.elapsed)).dim());
            }
        }
        Some(error) => {
            error_println(error);
            println!("{}", style("Conversion failed!").bold().red());
        }
    }

    Ok(result.succeeded())
}

fn run_batch(
    args: &Args,
    input: &Path,
    runner: &BatchRunner,
    options: &ConversionOptions,
) -> Result<()> {
    let format = args
        .normalized_format()
        .context("Format must be specified for batch processing (--format)")?;
    let output_dir = args
        .batch_output_dir()
        .context("Output directory could not be determined")?;

    runner.engine().registry().writable_codec_for(&format)?;

    let batch_input = BatchInput::Directory(input.to_path_buf());
    let files = runner.collect_inputs(&batch_input)?;

    if files.is_empty() {
        if args.json {
            JsonMessage::error("No image files found in the input directory");
        } else {
            println!(
                "{}",
                style("No image files found in the input directory").red()
            );
        }
        return Ok(());
    }

    let progress = if args.json {
        ProgressBar::hidden()
    } else {
        println!("Found {} image files to convert", files.len());
        let pb = create_progress_bar(files.len() as u64);
        pb.set_message("Converting");
        pb
    };

    let tally = runner.run_with_progress(
        &batch_input,
        &output_dir,
        &format,
        options,
        |event| match event {
            BatchProgress::Started {
                index,
                total,
                input,
                output,
            } => {
                if args.json {
                    JsonMessage::progress(index + 1, total, input);
                } else if args.verbose {
                    progress.println(format!(
                        "Converting: {} -> {}",
                        input.display(),
                        output.display()
                    ));
                }
            }
            BatchProgress::Finished { result, .. } => {
                if args.json {
                    JsonMessage::from_result(result).emit();
                }
                progress.inc(1);
            }
        },
    )?;

    progress.finish_and_clear();

    if args.json {
        JsonMessage::summary(&tally).emit();
        return Ok(());
    }

    println!();
    println!("{}", style("Conversion complete!").bold().green());
    println!(
        "  Successfully converted: {} files",
        style(tally.converted_count).bold().green()
    );
    if tally.failed_count > 0 {
        println!(
            "  Failed conversions: {} files",
            style(tally.failed_count).bold().red()
        );
    }
    println!("  Output directory: {}", output_dir.display());
    println!(
        "  Total time: {}",
        style(format_duration(tally.elapsed)).dim()
    );

    if !tally.failures.is_empty() {
        println!();
        println!("{}", style("Errors encountered:").bold().red());
        for (i, failure) in tally.failures.iter().enumerate() {
            println!(
                "  {}: {} - {}",
                style(format!("#{}", i + 1)).dim(),
                style(display_name(&failure.input_path)).bold().red(),
                failure.error
            );
        }
    }

    Ok(())
}

fn print_formats(registry: &FormatRegistry) {
    formats_table(registry).printstd();
    println!();
    if registry.heif_capability().is_available() {
        let access = if Codec::Heif.is_writable() {
            "available (read and write)"
        } else {
            "available (read only)"
        };
        println!("HEIC/HEIF: {}", style(access).green());
    } else {
        println!("HEIC/HEIF: {}", style("not available").yellow());
        println!("  {}", heif_advice());
    }
}
