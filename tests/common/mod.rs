//! On-disk segment fixture shared by the integration tests.
#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::Path;

use image::{Rgb, RgbImage};
use tempfile::TempDir;
use well_segment::{MatchParams, Segment};

pub const DEPTH_FROM: i64 = 1000;
pub const DEPTH_TO: i64 = 2000;

/// Depth error of the upper coring runs (1100..1400).
pub const DELTA_A: f64 = 6.0;
/// Depth error of the lower coring run (1600..1750).
pub const DELTA_B: f64 = -8.0;

pub fn wave(x: f64) -> f64 {
    (x / 5.0).sin() * 30.0 + (x / 17.0).cos() * 10.0 + 50.0
}

/// Core log depths: every 3 cm in the runs, plus one uncovered row at 1500
/// and one row above the segment.
pub fn core_depths() -> Vec<i64> {
    let mut depths = vec![990];
    depths.extend((1100..1400).step_by(3));
    depths.push(1500);
    depths.extend((1600..1750).step_by(3));
    depths
}

pub fn params() -> MatchParams {
    MatchParams {
        max_shift: 20.0,
        delta_from: -15.0,
        delta_to: 15.0,
        delta_step: 1.0,
        ..Default::default()
    }
}

pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        write(
            root,
            "meta.json",
            r#"{"name": "W-7", "field": "Test", "depth_from": "10m", "depth_to": 2000}"#,
        );

        let mut logs = String::from("DEPTH,GK,NGK\n");
        for d in 900..2100 {
            writeln!(logs, "{d},{},{}", wave(d as f64), 1.0 + d as f64 * 0.001).unwrap();
        }
        write(root, "logs.csv", &logs);

        let mut core = String::from("DEPTH,GK\n");
        for d in core_depths() {
            let delta = match d {
                1100..=1399 => DELTA_A,
                1600..=1749 => DELTA_B,
                _ => 0.0,
            };
            writeln!(core, "{d},{}", wave(d as f64 + delta)).unwrap();
        }
        write(root, "core_logs.csv", &core);

        write(
            root,
            "core_properties.csv",
            "DEPTH,POROSITY\n1150,0.2\n1250,0.18\n1500,0.1\n1700,0.25\n",
        );
        write(
            root,
            "boring_intervals.csv",
            "DEPTH_FROM,DEPTH_TO\n950,1010\n1100,1300\n1305,1400\n1600,1750\n",
        );
        write(
            root,
            "core_lithology.csv",
            "DEPTH_FROM,DEPTH_TO,LITHOLOGY\n1100,1200,sandstone\n1200,1400,shale\n1600,1750,limestone\n",
        );
        write(
            root,
            "layers.csv",
            "DEPTH_FROM,DEPTH_TO,LAYER\n0,1050,top\n1050,1800,reservoir\n1800,3000,base\n2000,2500,below\n",
        );
        write(root, "inclination.csv", "MD,INCL,AZIM\n0,0.0,0.0\n1500,2.5,110.0\n");
        write(
            root,
            "samples.csv",
            "DEPTH_FROM,DEPTH_TO,SAMPLE\n1100,1150,S1\n1150,1200,S2\n1300,1350,S3\n",
        );

        std::fs::create_dir_all(root.join("samples_dl")).unwrap();
        std::fs::create_dir_all(root.join("samples_uv")).unwrap();
        solid(20, 100, [200, 100, 50]).save(root.join("samples_dl/S1.png")).unwrap();
        solid(20, 100, [10, 20, 30]).save(root.join("samples_dl/S2.png")).unwrap();
        solid(20, 100, [255, 255, 255]).save(root.join("samples_dl/S3.png")).unwrap();
        solid(20, 100, [0, 255, 0]).save(root.join("samples_uv/S1.png")).unwrap();

        Fixture { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn open(&self) -> Segment {
        Segment::open(self.path()).unwrap()
    }

    pub fn write(&self, name: &str, contents: &str) {
        write(self.path(), name, contents);
    }
}

fn write(root: &Path, name: &str, contents: &str) {
    std::fs::write(root.join(name), contents).unwrap();
}

pub fn solid(w: u32, h: u32, rgb: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(w, h, Rgb(rgb))
}

/// Load every dataset the fixture provides.
pub fn load_all(segment: &mut Segment) {
    for name in [
        "logs",
        "core_logs",
        "core_properties",
        "boring_intervals",
        "core_lithology",
        "layers",
        "samples",
        "inclination",
    ] {
        segment.load(name).unwrap();
    }
}
