use std::time::Duration;

use anyhow::Result;
use esframe::process::adts::AdtsExtractor;
use esframe::structs::adts::AdtsFrame;
use esframe::utils::errors::ScanError;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;

use super::command::{AdtsArgs, Cli, OutputFormat};
use crate::input::InputReader;
use crate::timestamp::{kbps, time_str};

const TABLE_HEADER: [&str; 3] = [
    "-------+----------+-----------+-------- ADTS Table -------+--------------+---------------+",
    "  NUM  |    ID    |  PROFILE  |   FREQUENCY   |  CHANNEL  |  FRAME SIZE  |  FRAME COUNT  ",
    "-------+----------+-----------+---------------+-----------+--------------+---------------+",
];

pub fn cmd_adts(args: &AdtsArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Scanning ADTS stream: {}", args.input.display());

    let input = InputReader::new(&args.input)?;
    let total_bytes = input.stream_len()?;

    let mut extractor = AdtsExtractor::with_capacity(input, args.window_size)?;
    extractor.set_fail_level(cli.fail_level());

    let mut context = AdtsContext {
        details: args.details,
        output: args.output,
        rows: Vec::new(),
        stats: StreamStats::default(),
        pb: None,
    };

    if let Some(multi) = multi {
        let pb = multi.add(ProgressBar::new(total_bytes));
        pb.set_style(ProgressStyle::with_template(
            "{spinner:.green} {bytes}/{total_bytes} ({percent}%) {msg}",
        )?);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        context.pb = Some(pb);
    }

    if context.output == OutputFormat::Table {
        context.print_lines(&TABLE_HEADER);
    }

    for frame in extractor {
        match frame {
            Ok(frame) => context.process_frame(&frame),
            Err(ScanError::NoSyncWord) => {
                context.finish();
                println!("No ADTS syncword found in the input.");
                println!("This doesn't appear to be a raw AAC ADTS stream.");
                return Ok(());
            }
            Err(e) => {
                context.finish();
                return Err(e.into());
            }
        }
    }

    context.finish();

    match context.output {
        OutputFormat::Table => context.stats.print_summary(total_bytes),
        OutputFormat::Yaml => {
            let report = AdtsReport {
                input: args.input.display().to_string(),
                size: total_bytes,
                frame_count: context.stats.frames,
                duration: context.stats.duration.map(time_str),
                frames: context.rows,
            };
            print!("{}", serde_yaml_ng::to_string(&report)?);
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct AdtsReport {
    input: String,
    size: u64,
    frame_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<String>,
    frames: Vec<AdtsRow>,
}

#[derive(Serialize)]
struct AdtsRow {
    index: usize,
    offset: u64,
    mpeg_id: String,
    profile: String,
    sampling_frequency: String,
    channel_configuration: String,
    frame_length: u16,
    num_raw_data_blocks: u8,
    protection_absent: bool,
    buffer_fullness: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    crc_check: Option<u16>,
}

impl From<&AdtsFrame> for AdtsRow {
    fn from(frame: &AdtsFrame) -> Self {
        Self {
            index: frame.index,
            offset: frame.offset,
            mpeg_id: frame.mpeg_id.to_string(),
            profile: frame.profile.to_string(),
            sampling_frequency: frame.sampling_frequency.to_string(),
            channel_configuration: frame.channel_configuration.to_string(),
            frame_length: frame.frame_length,
            num_raw_data_blocks: frame.num_raw_data_blocks,
            protection_absent: frame.protection_absent,
            buffer_fullness: frame.buffer_fullness,
            crc_check: frame.crc_check,
        }
    }
}

/// Running totals for the analysis summary.
#[derive(Default)]
struct StreamStats {
    first: Option<AdtsFrame>,
    frames: usize,
    frame_bytes: u64,
    /// `None` once a frame with an unknown rate was seen.
    duration: Option<Duration>,
}

impl StreamStats {
    fn add(&mut self, frame: &AdtsFrame) {
        if self.first.is_none() {
            self.first = Some(frame.clone());
            self.duration = Some(Duration::ZERO);
        }

        self.frames += 1;
        self.frame_bytes += frame.frame_length as u64;
        self.duration = self.duration.zip(frame.duration()).map(|(a, b)| a + b);
    }

    fn print_summary(&self, total_bytes: u64) {
        println!();

        if let Some(ref first) = self.first {
            println!("Stream Information");
            println!("  MPEG version              {}", first.mpeg_id);
            println!("  Profile                   {}", first.profile);
            println!("  Sampling rate             {} Hz", first.sampling_frequency);
            println!("  Channels                  {}", first.channel_configuration);
            println!(
                "  Bit rate mode             {}",
                if first.is_vbr() { "VBR" } else { "CBR" }
            );
            println!();
        }

        println!("Analysis Summary");
        println!("  Frames processed          {}", self.frames);

        let size_mb = total_bytes as f64 / 1_000_000.0;
        println!("  Size                      {size_mb:.2} MB ({total_bytes} bytes)");

        if let Some(duration) = self.duration {
            println!("  Duration                  {}", time_str(duration));

            if let Some(rate) = kbps(self.frame_bytes, duration) {
                println!("  Average data rate         {rate:.1} kbps");
            }
        }

        println!();
    }
}

struct AdtsContext {
    details: bool,
    output: OutputFormat,
    rows: Vec<AdtsRow>,
    stats: StreamStats,
    pb: Option<ProgressBar>,
}

impl AdtsContext {
    fn process_frame(&mut self, frame: &AdtsFrame) {
        self.stats.add(frame);

        match self.output {
            OutputFormat::Table => {
                let mut lines = vec![format!(
                    " {:5} | {:>8} | {:>9} | {:>13} | {:>9} | {:12} | {:13} ",
                    frame.index,
                    frame.mpeg_id,
                    frame.profile,
                    frame.sampling_frequency,
                    frame.channel_configuration,
                    frame.frame_length,
                    frame.num_raw_data_blocks
                )];
                if self.details {
                    lines.push(details_line(frame));
                }
                self.print_lines(&lines);
            }
            OutputFormat::Yaml => self.rows.push(AdtsRow::from(frame)),
        }

        if let Some(ref pb) = self.pb {
            pb.set_position(frame.offset + frame.frame_length as u64);
            if self.stats.frames.is_multiple_of(100) {
                pb.set_message(format!("{} frames", self.stats.frames));
            }
        }
    }

    fn print_lines<S: AsRef<str>>(&self, lines: &[S]) {
        let print = || {
            for line in lines {
                println!("{}", line.as_ref());
            }
        };

        match self.pb {
            Some(ref pb) => pb.suspend(print),
            None => print(),
        }
    }

    fn finish(&self) {
        if let Some(ref pb) = self.pb {
            pb.finish_and_clear();
        }
    }
}

fn details_line(frame: &AdtsFrame) -> String {
    let crc = match frame.crc_check {
        Some(crc) => format!("{crc:#06X}"),
        None => "-".to_string(),
    };

    format!(
        "       | offset {} layer {} private {} copy {} home {} fullness {:#05X} crc {}",
        frame.offset,
        frame.layer,
        frame.private_bit as u8,
        frame.original_copy as u8,
        frame.home as u8,
        frame.buffer_fullness,
        crc
    )
}
