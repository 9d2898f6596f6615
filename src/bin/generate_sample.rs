//! Write a synthetic well segment directory: wireline and core logs with a
//! known depth error per coring run, boring/lithology intervals, sample
//! photographs and the match parameters that recover the error.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use clap::Parser;
use image::{Rgb, RgbImage};
use parquet::arrow::ArrowWriter;

use well_segment::{MatchParams, SegmentMeta};

#[derive(Parser, Debug)]
#[command(about = "Generate a synthetic well segment")]
struct Args {
    /// Output directory
    #[arg(default_value = "demo_segment")]
    out: PathBuf,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Depth error of each coring run group: (top, bottom, δ) in cm.
const RUN_GROUPS: [(i64, i64, f64); 2] = [(150_100, 150_900, 30.0), (151_300, 151_700, -20.0)];
const SEGMENT: (i64, i64) = (150_000, 152_000);

fn gamma(depth: f64) -> f64 {
    60.0 + 30.0 * (depth / 70.0).sin() + 15.0 * (depth / 230.0).cos()
}

/// Reproducible noise source for the synthetic logs (xoshiro256**, seeded
/// through splitmix64 so neighbouring seeds give unrelated streams).
struct NoiseRng {
    state: [u64; 4],
}

impl NoiseRng {
    fn seeded(seed: u64) -> Self {
        let mut x = seed;
        let state = std::array::from_fn(|_| {
            x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
            let mut z = x;
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
            z ^ (z >> 31)
        });
        NoiseRng { state }
    }

    fn next_u64(&mut self) -> u64 {
        let [s0, s1, s2, s3] = &mut self.state;
        let out = s1.wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = *s1 << 17;
        *s2 ^= *s0;
        *s3 ^= *s1;
        *s1 ^= *s2;
        *s0 ^= *s3;
        *s2 ^= t;
        *s3 = s3.rotate_left(45);
        out
    }

    /// Uniform in `[0, 1)`.
    fn uniform(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Zero-mean Gaussian measurement noise.
    fn noise(&mut self, std_dev: f64) -> f64 {
        let u1 = self.uniform().max(f64::MIN_POSITIVE);
        let u2 = self.uniform();
        std_dev * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = NoiseRng::seeded(args.seed);
    let out = &args.out;
    std::fs::create_dir_all(out.join("samples_dl"))?;
    std::fs::create_dir_all(out.join("samples_uv"))?;

    SegmentMeta::new("DEMO-1", "Synthetic", SEGMENT.0, SEGMENT.1)?.write(&out.join("meta.json"))?;

    write_wireline_las(&out.join("logs.las"), &mut rng)?;
    let core_depths = write_core_logs(&out.join("core_logs.parquet"), &mut rng)?;
    write_core_properties(&out.join("core_properties.feather"), &core_depths, &mut rng)?;
    write_intervals(out)?;
    write_photographs(out, &mut rng)?;

    let params = MatchParams {
        max_shift: 150.0,
        delta_from: -100.0,
        delta_to: 100.0,
        delta_step: 5.0,
        ..Default::default()
    };
    std::fs::write(
        out.join("match_params.json"),
        serde_json::to_string_pretty(&params)?,
    )?;

    println!("Wrote synthetic segment to {}", out.display());
    Ok(())
}

fn write_wireline_las(path: &Path, rng: &mut NoiseRng) -> Result<()> {
    let mut text = String::from(
        "~Version\n VERS.   2.0 : CWLS LOG ASCII STANDARD\n WRAP.   NO  : ONE LINE PER STEP\n\
         ~Well\n NULL.   -999.25 : NULL VALUE\n\
         ~Curve\n DEPT.CM   : DEPTH\n GK.API    : GAMMA RAY\n~A\n",
    );
    for depth in (SEGMENT.0 - 200..SEGMENT.1 + 200).step_by(10) {
        let gk = gamma(depth as f64) + rng.noise(0.5);
        text.push_str(&format!("{depth}.0 {gk:.3}\n"));
    }
    std::fs::write(path, text).context("writing logs.las")
}

/// Core GK every 5 cm inside the coring runs, recorded at a shifted depth.
fn write_core_logs(path: &Path, rng: &mut NoiseRng) -> Result<Vec<f64>> {
    let mut depths = Vec::new();
    let mut values = Vec::new();
    for (top, bottom, delta) in RUN_GROUPS {
        for depth in (top..bottom).step_by(5) {
            let depth = depth as f64;
            depths.push(depth);
            values.push(gamma(depth + delta) + rng.noise(0.5));
        }
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("DEPTH", DataType::Float64, false),
        Field::new("GK", DataType::Float64, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float64Array::from(depths.clone())),
            Arc::new(Float64Array::from(values)),
        ],
    )?;
    let mut writer = ArrowWriter::try_new(File::create(path)?, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(depths)
}

fn write_core_properties(path: &Path, depths: &[f64], rng: &mut NoiseRng) -> Result<()> {
    let porosity: Vec<f64> = depths
        .iter()
        .map(|_| (0.18 + rng.noise(0.03)).clamp(0.0, 0.4))
        .collect();
    let schema = Arc::new(Schema::new(vec![
        Field::new("DEPTH", DataType::Float64, false),
        Field::new("POROSITY", DataType::Float64, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float64Array::from(depths.to_vec())),
            Arc::new(Float64Array::from(porosity)),
        ],
    )?;
    let mut writer = FileWriter::try_new(File::create(path)?, &schema)?;
    writer.write(&batch)?;
    writer.finish()?;
    Ok(())
}

fn write_intervals(out: &Path) -> Result<()> {
    let mut boring = csv::Writer::from_path(out.join("boring_intervals.csv"))?;
    boring.write_record(["DEPTH_FROM", "DEPTH_TO", "CORE_RECOVERY"])?;
    let mut lithology = csv::Writer::from_path(out.join("core_lithology.csv"))?;
    lithology.write_record(["DEPTH_FROM", "DEPTH_TO", "LITHOLOGY"])?;
    let mut samples = csv::Writer::from_path(out.join("samples.csv"))?;
    samples.write_record(["DEPTH_FROM", "DEPTH_TO", "SAMPLE"])?;

    let rocks = ["sandstone", "siltstone", "shale"];
    let mut sample_no = 0;
    for (top, bottom, _) in RUN_GROUPS {
        // coring runs of 4 m, lithology every metre, samples every half metre
        for run in (top..bottom).step_by(400) {
            let run_end = (run + 400).min(bottom);
            boring.write_record(&[run.to_string(), run_end.to_string(), "0.95".to_string()])?;
        }
        for (i, lith) in (top..bottom).step_by(100).enumerate() {
            lithology.write_record(&[
                lith.to_string(),
                (lith + 100).min(bottom).to_string(),
                rocks[i % rocks.len()].to_string(),
            ])?;
        }
        for piece in (top..bottom).step_by(50) {
            sample_no += 1;
            samples.write_record(&[
                piece.to_string(),
                (piece + 50).min(bottom).to_string(),
                format!("S{sample_no:03}"),
            ])?;
        }
    }
    boring.flush()?;
    lithology.flush()?;
    samples.flush()?;
    Ok(())
}

/// 60x300 px photographs whose brightness follows the gamma log.
fn write_photographs(out: &Path, rng: &mut NoiseRng) -> Result<()> {
    let mut sample_no = 0;
    for (top, bottom, _) in RUN_GROUPS {
        for piece in (top..bottom).step_by(50) {
            sample_no += 1;
            let name = format!("S{sample_no:03}.png");
            let dl = RgbImage::from_fn(60, 300, |_, y| {
                let depth = piece as f64 + y as f64 / 6.0;
                let v = (gamma(depth) * 2.0).clamp(0.0, 255.0) as u8;
                Rgb([v, (v as f64 * 0.8) as u8, (v as f64 * 0.6) as u8])
            });
            dl.save(out.join("samples_dl").join(&name))?;

            // not every piece was photographed under UV light
            if rng.uniform() < 0.8 {
                let uv = RgbImage::from_fn(60, 300, |x, _| {
                    let glow = if x % 20 < 10 { 200 } else { 40 };
                    Rgb([glow / 4, glow, glow / 2])
                });
                uv.save(out.join("samples_uv").join(&name))?;
            }
        }
    }
    Ok(())
}
