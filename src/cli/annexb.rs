use std::collections::BTreeMap;

use anyhow::Result;
use esframe::log_or_err;
use esframe::process::annexb::NalExtractor;
use esframe::structs::nal_unit::{NalUnit, NalUnitType};
use esframe::utils::errors::ScanError;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::Level;
use serde::Serialize;

use super::command::{AnnexbArgs, Cli, OutputFormat};
use crate::input::InputReader;

const TABLE_HEADER: [&str; 3] = [
    "-----+-------- NALU Table ------+---------+",
    " NUM |    POS  |    IDC |  TYPE |   LEN   |",
    "-----+---------+--------+-------+---------+",
];

pub fn cmd_annexb(args: &AnnexbArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Scanning Annex-B stream: {}", args.input.display());

    let input = InputReader::new(&args.input)?;
    let total_bytes = input.stream_len()?;

    let mut extractor = NalExtractor::with_capacity(input, args.window_size)?;
    extractor.set_fail_level(cli.fail_level());

    let mut context = AnnexbContext {
        details: args.details,
        output: args.output,
        fail_level: cli.fail_level(),
        rows: Vec::new(),
        type_counts: BTreeMap::new(),
        unit_count: 0,
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

    for unit in extractor {
        match unit {
            Ok(unit) => context.process_unit(&unit)?,
            Err(ScanError::NoStartCode) => {
                context.finish();
                println!("No Annex-B start code found in the input.");
                println!("This doesn't appear to be a raw H.264 stream.");
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
        OutputFormat::Table => context.print_summary(total_bytes),
        OutputFormat::Yaml => {
            let report = AnnexbReport {
                input: args.input.display().to_string(),
                size: total_bytes,
                unit_count: context.rows.len(),
                units: context.rows,
            };
            print!("{}", serde_yaml_ng::to_string(&report)?);
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct AnnexbReport {
    input: String,
    size: u64,
    unit_count: usize,
    units: Vec<NalRow>,
}

#[derive(Serialize)]
struct NalRow {
    index: usize,
    offset: u64,
    start_code_len: u8,
    forbidden_bit: bool,
    nal_ref_idc: String,
    nal_unit_type: u8,
    type_name: String,
    payload_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
}

struct AnnexbContext {
    details: bool,
    output: OutputFormat,
    fail_level: Level,
    rows: Vec<NalRow>,
    type_counts: BTreeMap<u8, (NalUnitType, usize)>,
    unit_count: usize,
    pb: Option<ProgressBar>,
}

impl AnnexbContext {
    fn process_unit(&mut self, unit: &NalUnit) -> Result<()> {
        let summary = if self.details {
            self.read_summary(unit)?
        } else {
            None
        };

        let nal_unit_type = unit.nal_unit_type();
        self.type_counts
            .entry(nal_unit_type.value())
            .or_insert((nal_unit_type, 0))
            .1 += 1;
        self.unit_count += 1;

        match self.output {
            OutputFormat::Table => {
                let mut lines = vec![format!(
                    "{:5}| {:8}| {:>7}| {:>6}| {:8}|",
                    unit.index,
                    unit.offset,
                    unit.nal_ref_idc(),
                    nal_unit_type,
                    unit.payload_len()
                )];
                if let Some(summary) = summary {
                    lines.push(format!("     |         |        |       | {summary}"));
                }
                self.print_lines(&lines);
            }
            OutputFormat::Yaml => self.rows.push(NalRow {
                index: unit.index,
                offset: unit.offset,
                start_code_len: unit.start_code_len,
                forbidden_bit: unit.forbidden_bit(),
                nal_ref_idc: unit.nal_ref_idc().to_string(),
                nal_unit_type: nal_unit_type.value(),
                type_name: nal_unit_type.to_string(),
                payload_len: unit.payload_len(),
                summary,
            }),
        }

        if let Some(ref pb) = self.pb {
            pb.set_position(unit.offset + unit.total_len() as u64);
            if self.unit_count.is_multiple_of(100) {
                pb.set_message(format!("{} units", self.unit_count));
            }
        }

        Ok(())
    }

    fn read_summary(&self, unit: &NalUnit) -> Result<Option<String>> {
        match unit.summary() {
            Ok(summary) => Ok(summary.map(|s| s.to_string())),
            Err(e) => {
                log_or_err!(
                    self,
                    Level::Warn,
                    anyhow::anyhow!("NAL unit {} ({}): {e}", unit.index, unit.nal_unit_type())
                );
                Ok(None)
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

    fn print_summary(&self, total_bytes: u64) {
        println!();
        println!("Analysis Summary");
        println!("  NAL units                 {}", self.unit_count);

        let size_mb = total_bytes as f64 / 1_000_000.0;
        println!("  Size                      {size_mb:.2} MB ({total_bytes} bytes)");

        if !self.type_counts.is_empty() {
            println!("  Unit types");
            for (nal_unit_type, count) in self.type_counts.values() {
                let label = format!("{nal_unit_type} ({})", nal_unit_type.value());
                println!("    {label:22}  {count}");
            }
        }

        println!();
    }
}
