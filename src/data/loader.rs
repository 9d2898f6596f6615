use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use arrow::array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeStringArray, StringArray,
};
use arrow::ipc::reader::FileReader;
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{Table, Value, DEPTH};
use crate::depth::unit_to_cm;
use crate::error::{Result, WellError};

/// A format-specific parser: file → untyped table.
pub type LoaderFn = fn(&Path) -> anyhow::Result<Table>;

// ---------------------------------------------------------------------------
// Loader registry – dispatch by extension
// ---------------------------------------------------------------------------

/// Maps a lower-case file extension to its loader.
///
/// The default registry knows:
/// * `.las`     – LAS 2.0 ASCII well log (`DEPT` curve becomes `DEPTH`)
/// * `.csv`     – header row, one column per field
/// * `.feather` – Arrow IPC file
/// * `.parquet` – Parquet file
#[derive(Debug, Clone)]
pub struct LoaderRegistry {
    loaders: BTreeMap<String, LoaderFn>,
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        let mut registry = LoaderRegistry::empty();
        registry.register("las", load_las);
        registry.register("csv", load_csv);
        registry.register("feather", load_feather);
        registry.register("parquet", load_parquet);
        registry.register("pq", load_parquet);
        registry
    }
}

impl LoaderRegistry {
    pub fn empty() -> Self {
        LoaderRegistry {
            loaders: BTreeMap::new(),
        }
    }

    /// Add or replace the loader for `ext` (without the leading dot).
    pub fn register(&mut self, ext: &str, loader: LoaderFn) -> &mut Self {
        self.loaders.insert(ext.to_ascii_lowercase(), loader);
        self
    }

    pub fn supports(&self, ext: &str) -> bool {
        self.loaders.contains_key(&ext.to_ascii_lowercase())
    }

    /// Parse `path` with the loader registered for its extension.
    pub fn load(&self, path: &Path) -> Result<Table> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let loader = self
            .loaders
            .get(&ext)
            .ok_or_else(|| WellError::UnsupportedFormat(ext.clone()))?;

        debug!("loading {} as .{ext}", path.display());
        loader(path).map_err(|source| WellError::Load {
            path: path.to_path_buf(),
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// File resolver
// ---------------------------------------------------------------------------

/// Find the single file called `name.<ext>` in `dir`.
pub fn find_file(dir: &Path, name: &str) -> Result<PathBuf> {
    let not_found = || WellError::not_found(format!("a file {name}"), dir.display().to_string());
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };

    let prefix = format!("{name}.");
    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if file_name.starts_with(&prefix) && entry.path().is_file() {
            candidates.push(entry.path());
        }
    }
    candidates.sort();

    match candidates.len() {
        0 => Err(not_found()),
        1 => Ok(candidates.remove(0)),
        _ => Err(WellError::Conflict {
            name: name.to_string(),
            dir: dir.to_path_buf(),
            candidates,
        }),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Header row with column names; cell types are guessed per cell.
fn load_csv(path: &Path) -> anyhow::Result<Table> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != columns.len() {
            bail!(
                "CSV row {row_no}: {} fields, expected {}",
                record.len(),
                columns.len()
            );
        }
        rows.push(record.iter().map(guess_value_type).collect());
    }

    Ok(Table::new(columns, rows))
}

fn guess_value_type(s: &str) -> Value {
    let s = s.trim();
    if s.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        if f.is_nan() {
            return Value::Null;
        }
        return Value::Float(f);
    }
    if s == "true" || s == "false" {
        return Value::Bool(s == "true");
    }
    Value::String(s.to_string())
}

// ---------------------------------------------------------------------------
// LAS loader
// ---------------------------------------------------------------------------

/// LAS 2.0 ASCII: `~W` gives the NULL value, `~C` the curve mnemonics and
/// `~A` the data. Wrapped data is handled by reading values in curve-sized chunks.
///
/// `DEPT` values are converted from the curve's unit to centimetres; a
/// missing unit means centimetres.
fn load_las(path: &Path) -> anyhow::Result<Table> {
    let text = std::fs::read_to_string(path).context("reading LAS file")?;

    let mut section = ' ';
    let mut null_value: Option<f64> = None;
    let mut depth_scale: Option<(usize, f64)> = None;
    let mut columns: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix('~') {
            section = rest.chars().next().unwrap_or(' ').to_ascii_uppercase();
            continue;
        }

        match section {
            'W' => {
                let (mnemonic, _, data) = split_header_line(line);
                if mnemonic.eq_ignore_ascii_case("NULL") {
                    null_value = Some(
                        data.parse()
                            .with_context(|| format!("line {}: bad NULL value {data:?}", line_no + 1))?,
                    );
                }
            }
            'C' => {
                let (mnemonic, unit, _) = split_header_line(line);
                let name = if mnemonic.eq_ignore_ascii_case("DEPT") {
                    let scale = las_depth_scale(unit).with_context(|| {
                        format!("line {}: DEPT unit {unit:?} is not a length", line_no + 1)
                    })?;
                    depth_scale = Some((columns.len(), scale));
                    DEPTH.to_string()
                } else {
                    mnemonic.to_string()
                };
                columns.push(name);
            }
            'A' => {
                for token in line.split_whitespace() {
                    let v: f64 = token
                        .parse()
                        .with_context(|| format!("line {}: {token:?} is not a number", line_no + 1))?;
                    values.push(match null_value {
                        Some(null) if v == null => Value::Null,
                        _ => Value::Float(v),
                    });
                }
            }
            _ => {}
        }
    }

    if columns.is_empty() {
        bail!("no ~C (curve) section");
    }
    if values.len() % columns.len() != 0 {
        bail!(
            "{} data values do not fill rows of {} curves",
            values.len(),
            columns.len()
        );
    }
    let rows = values
        .chunks(columns.len())
        .map(|chunk| {
            let mut row = chunk.to_vec();
            if let Some((idx, scale)) = depth_scale {
                if let Value::Float(d) = row[idx] {
                    row[idx] = Value::Float(d * scale);
                }
            }
            row
        })
        .collect();
    Ok(Table::new(columns, rows))
}

/// Centimetres per LAS depth unit. `F` is the LAS abbreviation for feet.
fn las_depth_scale(unit: &str) -> Option<f64> {
    match unit.to_ascii_lowercase().as_str() {
        "" => Some(1.0),
        "f" => unit_to_cm("ft"),
        unit => unit_to_cm(unit),
    }
}

/// `MNEM.UNIT  DATA : DESCRIPTION` → (`MNEM`, `UNIT`, `DATA`).
fn split_header_line(line: &str) -> (&str, &str, &str) {
    let Some((mnemonic, rest)) = line.split_once('.') else {
        return (line.trim(), "", "");
    };
    let rest = match rest.rfind(':') {
        Some(i) => &rest[..i],
        None => rest,
    };
    // the unit runs up to the first space
    let (unit, data) = match rest.find(char::is_whitespace) {
        Some(i) => (&rest[..i], rest[i..].trim()),
        None => (rest, ""),
    };
    (mnemonic.trim(), unit, data)
}

// ---------------------------------------------------------------------------
// Feather / Parquet loaders (Arrow record batches)
// ---------------------------------------------------------------------------

fn load_feather(path: &Path) -> anyhow::Result<Table> {
    let file = File::open(path).context("opening feather file")?;
    let reader = FileReader::try_new(file, None).context("reading Arrow IPC footer")?;
    let mut table = Table::default();
    for batch in reader {
        let batch = batch.context("reading Arrow record batch")?;
        append_batch(&mut table, &batch)?;
    }
    Ok(table)
}

fn load_parquet(path: &Path) -> anyhow::Result<Table> {
    let file = File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;
    let mut table = Table::default();
    for batch in reader {
        let batch = batch.context("reading parquet record batch")?;
        append_batch(&mut table, &batch)?;
    }
    Ok(table)
}

fn append_batch(table: &mut Table, batch: &RecordBatch) -> anyhow::Result<()> {
    let schema = batch.schema();
    let names: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();
    if table.columns.is_empty() {
        table.columns = names;
    } else if table.columns != names {
        bail!("record batch schema {names:?} differs from {:?}", table.columns);
    }

    for row in 0..batch.num_rows() {
        table
            .rows
            .push(batch.columns().iter().map(|col| arrow_cell(col, row)).collect());
    }
    Ok(())
}

/// Extract a single cell from an Arrow column.
fn arrow_cell(col: &ArrayRef, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    let any = col.as_any();
    if let Some(a) = any.downcast_ref::<Float64Array>() {
        let v = a.value(row);
        return if v.is_nan() { Value::Null } else { Value::Float(v) };
    }
    if let Some(a) = any.downcast_ref::<Float32Array>() {
        let v = a.value(row) as f64;
        return if v.is_nan() { Value::Null } else { Value::Float(v) };
    }
    if let Some(a) = any.downcast_ref::<Int64Array>() {
        return Value::Integer(a.value(row));
    }
    if let Some(a) = any.downcast_ref::<Int32Array>() {
        return Value::Integer(a.value(row) as i64);
    }
    if let Some(a) = any.downcast_ref::<BooleanArray>() {
        return Value::Bool(a.value(row));
    }
    if let Some(a) = any.downcast_ref::<StringArray>() {
        return Value::String(a.value(row).to_string());
    }
    if let Some(a) = any.downcast_ref::<LargeStringArray>() {
        return Value::String(a.value(row).to_string());
    }
    match array_value_to_string(col, row) {
        Ok(s) => Value::String(s),
        Err(_) => Value::String(format!("{:?}", col.data_type())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::ipc::writer::FileWriter;
    use tempfile::TempDir;

    #[test]
    fn resolver_distinguishes_missing_and_ambiguous() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("logs.las"), "").unwrap();
        std::fs::write(dir.path().join("layers.csv"), "").unwrap();
        std::fs::write(dir.path().join("layers.feather"), "").unwrap();

        assert_eq!(
            find_file(dir.path(), "logs").unwrap(),
            dir.path().join("logs.las")
        );
        assert!(matches!(
            find_file(dir.path(), "core_logs"),
            Err(WellError::NotFound { .. })
        ));
        assert!(matches!(
            find_file(dir.path(), "layers"),
            Err(WellError::Conflict { ref candidates, .. }) if candidates.len() == 2
        ));
        assert!(matches!(
            find_file(&dir.path().join("missing"), "logs"),
            Err(WellError::NotFound { .. })
        ));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.xlsx");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            LoaderRegistry::default().load(&path),
            Err(WellError::UnsupportedFormat(ext)) if ext == "xlsx"
        ));
    }

    #[test]
    fn csv_cells_are_typed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("core_lithology.csv");
        std::fs::write(
            &path,
            "DEPTH_FROM,DEPTH_TO,LITHOLOGY,POROSITY\n100,120,sandstone,0.21\n120,150,shale,\n",
        )
        .unwrap();

        let t = LoaderRegistry::default().load(&path).unwrap();
        assert_eq!(t.columns, vec!["DEPTH_FROM", "DEPTH_TO", "LITHOLOGY", "POROSITY"]);
        assert_eq!(
            t.rows[0],
            vec![
                Value::Integer(100),
                Value::Integer(120),
                Value::String("sandstone".into()),
                Value::Float(0.21)
            ]
        );
        assert_eq!(t.rows[1][3], Value::Null);
    }

    #[test]
    fn las_sections_are_parsed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.las");
        std::fs::write(
            &path,
            "~Version\n VERS.   2.0 : CWLS LOG ASCII STANDARD\n WRAP.   NO  : ONE LINE PER STEP\n\
             ~Well\n STRT.CM 100.0 : START\n NULL.   -999.25 : NULL VALUE\n\
             ~Curve\n DEPT.CM   : DEPTH\n GK.API    : GAMMA\n\
             ~A\n100.0 12.5\n101.0 -999.25\n102.0\n 13.0\n",
        )
        .unwrap();

        let t = LoaderRegistry::default().load(&path).unwrap();
        assert_eq!(t.columns, vec!["DEPTH", "GK"]);
        assert_eq!(t.len(), 3);
        assert_eq!(t.rows[1][1], Value::Null);
        assert_eq!(t.rows[2], vec![Value::Float(102.0), Value::Float(13.0)]);
    }

    #[test]
    fn las_depths_are_converted_to_centimetres() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.las");
        std::fs::write(
            &path,
            "~Well\n NULL.   -999.25 : NULL VALUE\n\
             ~Curve\n DEPT.M    : DEPTH\n GK.API    : GAMMA\n\
             ~A\n12.0 40.0\n15.5 41.0\n-999.25 42.0\n",
        )
        .unwrap();

        let t = LoaderRegistry::default().load(&path).unwrap();
        assert_eq!(t.rows[0], vec![Value::Float(1200.0), Value::Float(40.0)]);
        assert_eq!(t.rows[1][0], Value::Float(1550.0));
        assert_eq!(t.rows[2][0], Value::Null);

        std::fs::write(&path, "~C\nDEPT.F : d\n~A\n10\n").unwrap();
        let t = LoaderRegistry::default().load(&path).unwrap();
        let feet = t.rows[0][0].as_f64().unwrap();
        assert!((feet - 304.8).abs() < 1e-9, "{feet}");
    }

    #[test]
    fn las_depth_in_a_non_length_unit_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.las");
        std::fs::write(&path, "~C\nDEPT.S : time\n~A\n1\n").unwrap();
        let err = LoaderRegistry::default().load(&path).unwrap_err();
        assert!(matches!(err, WellError::Load { .. }));
        assert!(format!("{err}").contains("DEPT unit"));
    }

    #[test]
    fn las_with_ragged_data_fails_with_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs.las");
        std::fs::write(&path, "~C\nDEPT.M : d\nGK.API : g\n~A\n1 2 3\n").unwrap();
        let err = LoaderRegistry::default().load(&path).unwrap_err();
        assert!(matches!(err, WellError::Load { .. }));
        assert!(err.to_string().contains("logs.las"));
    }

    #[test]
    fn feather_round_trip_through_arrow_ipc() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("core_logs.feather");
        let schema = Arc::new(Schema::new(vec![
            Field::new("DEPTH", DataType::Float64, false),
            Field::new("GK", DataType::Float64, true),
            Field::new("NAME", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Float64Array::from(vec![100.0, 101.0])),
                Arc::new(Float64Array::from(vec![Some(1.5), None])),
                Arc::new(StringArray::from(vec![Some("a"), Some("b")])),
            ],
        )
        .unwrap();
        let mut writer = FileWriter::try_new(File::create(&path).unwrap(), &schema).unwrap();
        writer.write(&batch).unwrap();
        writer.finish().unwrap();

        let t = LoaderRegistry::default().load(&path).unwrap();
        assert_eq!(t.columns, vec!["DEPTH", "GK", "NAME"]);
        assert_eq!(
            t.rows[1],
            vec![Value::Float(101.0), Value::Null, Value::String("b".into())]
        );
    }

    #[test]
    fn custom_formats_register_independently() {
        fn load_nothing(_: &Path) -> anyhow::Result<Table> {
            Ok(Table::default())
        }
        let mut registry = LoaderRegistry::empty();
        assert!(!registry.supports("csv"));
        registry.register("TXT", load_nothing);
        assert!(registry.supports("txt"));
    }
}
