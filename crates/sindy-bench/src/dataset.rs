use crate::errors::{BenchError, BenchResult};
use crate::system::SystemSpec;
use ndarray::{Array2, ArrayD, Axis, Ix2};
use ndarray_npy::{read_npy, NpzReader};
use std::fs::{self, File};
use std::path::Path;

const NPZ_PREFERRED: &str = "X";
const COMMENT: char = '#';

/// Load the dataset at `path` as an `(n_samples, n_features)` array.
///
/// The reader is chosen from the file extension. One-dimensional arrays
/// become a single column.
pub fn load_dataset(path: &Path, spec: &SystemSpec) -> BenchResult<Array2<f64>> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let x = match ext {
        "npy" => to_2d(path, read_npy_any(path)?)?,
        "npz" => to_2d(path, read_npz_any(path)?)?,
        "csv" => read_csv(path, spec)?,
        _ => return Err(BenchError::UnsupportedFormat(path.to_path_buf())),
    };
    tracing::debug!("loaded {} with shape {:?}", path.display(), x.dim());
    Ok(x)
}

/// Check the loaded width against `spec.dims`.
pub fn validate_dataset(x: &Array2<f64>, spec: &SystemSpec) -> BenchResult<()> {
    match spec.dims {
        Some(expected) if x.ncols() != expected => Err(BenchError::DimsMismatch {
            expected,
            actual: x.dim(),
        }),
        _ => Ok(()),
    }
}

fn to_2d(path: &Path, array: ArrayD<f64>) -> BenchResult<Array2<f64>> {
    let array = if array.ndim() == 1 {
        array.insert_axis(Axis(1))
    } else {
        array
    };
    array.into_dimensionality::<Ix2>().map_err(|_| {
        BenchError::data(path, "expected a 1-D or 2-D array")
    })
}

fn read_npy_any(path: &Path) -> BenchResult<ArrayD<f64>> {
    let primary = match read_npy::<_, ArrayD<f64>>(path) {
        Ok(array) => return Ok(array),
        Err(e) => e,
    };
    if let Ok(array) = read_npy::<_, ArrayD<f32>>(path) {
        return Ok(array.mapv(f64::from));
    }
    if let Ok(array) = read_npy::<_, ArrayD<i64>>(path) {
        return Ok(array.mapv(|v| v as f64));
    }
    Err(BenchError::data(path, primary))
}

fn read_npz_any(path: &Path) -> BenchResult<ArrayD<f64>> {
    let file = File::open(path)?;
    let mut npz = NpzReader::new(file).map_err(|e| BenchError::data(path, e))?;
    let names = npz.names().map_err(|e| BenchError::data(path, e))?;

    let name = names
        .iter()
        .find(|n| n.as_str() == NPZ_PREFERRED || n.strip_suffix(".npy") == Some(NPZ_PREFERRED))
        .or_else(|| names.first())
        .cloned()
        .ok_or_else(|| BenchError::data(path, "archive contains no arrays"))?;

    let primary = match npz.by_name::<_, ndarray::IxDyn>(&name) {
        Ok(array) => return Ok(array),
        Err(e) => e,
    };
    if let Ok(array) = npz.by_name::<ndarray::OwnedRepr<f32>, ndarray::IxDyn>(&name) {
        return Ok(array.mapv(f64::from));
    }
    if let Ok(array) = npz.by_name::<ndarray::OwnedRepr<i64>, ndarray::IxDyn>(&name) {
        return Ok(array.mapv(|v| v as f64));
    }
    Err(BenchError::data(path, format!("array {}: {}", name, primary)))
}

fn read_csv(path: &Path, spec: &SystemSpec) -> BenchResult<Array2<f64>> {
    let delimiter = match spec.delimiter.as_bytes() {
        [b] => *b,
        _ => {
            return Err(BenchError::ConfigError(format!(
                "delimiter must be a single byte, got {:?}",
                spec.delimiter
            )))
        }
    };

    let text = fs::read_to_string(path).map_err(|e| BenchError::data(path, e))?;
    let (line_numbers, body) = data_lines(&text, spec.has_header);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut values = Vec::new();
    let mut width = None;
    let mut rows = 0;
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| BenchError::data(path, e))?;
        let line = line_numbers.get(i).copied().unwrap_or(i + 1);
        match width {
            None => width = Some(record.len()),
            Some(w) if w != record.len() => {
                return Err(BenchError::data(
                    path,
                    format!("line {} has {} columns, expected {}", line, record.len(), w),
                ))
            }
            Some(_) => {}
        }
        for field in record.iter() {
            let v = field.parse::<f64>().map_err(|_| {
                BenchError::data(path, format!("line {}: cannot parse {:?} as a number", line, field))
            })?;
            values.push(v);
        }
        rows += 1;
    }

    let x = Array2::from_shape_vec((rows, width.unwrap_or(0)), values)
        .map_err(|e| BenchError::data(path, e))?;

    match &spec.x_columns {
        Some(columns) => select_columns(path, &x, columns),
        None => Ok(x),
    }
}

/// Drop the first physical line when `skip_header` is set, strip `#`
/// comments (whole-line or trailing) and blank lines. Returns the 1-based
/// line number of every kept line alongside the joined text.
fn data_lines(text: &str, skip_header: bool) -> (Vec<usize>, String) {
    let mut numbers = Vec::new();
    let mut kept = Vec::new();
    for (i, line) in text.lines().enumerate().skip(usize::from(skip_header)) {
        let data = line.split_once(COMMENT).map_or(line, |(data, _)| data).trim();
        if data.is_empty() {
            continue;
        }
        numbers.push(i + 1);
        kept.push(data);
    }
    (numbers, kept.join("\n"))
}

fn select_columns(path: &Path, x: &Array2<f64>, columns: &[usize]) -> BenchResult<Array2<f64>> {
    if let Some(bad) = columns.iter().find(|&&c| c >= x.ncols()) {
        return Err(BenchError::data(
            path,
            format!("x_columns index {} out of range for {} columns", bad, x.ncols()),
        ));
    }
    Ok(x.select(Axis(1), columns))
}
