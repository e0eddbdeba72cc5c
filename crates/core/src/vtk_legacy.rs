//! Legacy VTK `STRUCTURED_POINTS` reader and writer.
//!
//! Only the first point-data scalar array is read. `SCALARS` blocks and
//! `FIELD` arrays are both accepted; binary payloads are big-endian as the
//! format requires.

use std::io::Write;
use std::path::Path;

use crate::error::VolumeError;
use crate::volume::{grid_len, ScalarVolume};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Encoding {
    Ascii,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScalarType {
    Bit,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
}

impl ScalarType {
    fn parse(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "bit" => ScalarType::Bit,
            "char" => ScalarType::Int8,
            "unsigned_char" => ScalarType::Uint8,
            "short" => ScalarType::Int16,
            "unsigned_short" => ScalarType::Uint16,
            "int" => ScalarType::Int32,
            "unsigned_int" => ScalarType::Uint32,
            "long" | "vtktypeint64" => ScalarType::Int64,
            "unsigned_long" | "vtktypeuint64" => ScalarType::Uint64,
            "float" => ScalarType::Float32,
            "double" => ScalarType::Float64,
            _ => return None,
        })
    }

    fn size(self) -> usize {
        match self {
            ScalarType::Bit | ScalarType::Int8 | ScalarType::Uint8 => 1,
            ScalarType::Int16 | ScalarType::Uint16 => 2,
            ScalarType::Int32 | ScalarType::Uint32 | ScalarType::Float32 => 4,
            ScalarType::Int64 | ScalarType::Uint64 | ScalarType::Float64 => 8,
        }
    }

    fn decode_be(self, bytes: &[u8]) -> f64 {
        match self {
            ScalarType::Bit | ScalarType::Uint8 => bytes[0] as f64,
            ScalarType::Int8 => bytes[0] as i8 as f64,
            ScalarType::Int16 => i16::from_be_bytes([bytes[0], bytes[1]]) as f64,
            ScalarType::Uint16 => u16::from_be_bytes([bytes[0], bytes[1]]) as f64,
            ScalarType::Int32 => i32::from_be_bytes(array(bytes)) as f64,
            ScalarType::Uint32 => u32::from_be_bytes(array(bytes)) as f64,
            ScalarType::Int64 => i64::from_be_bytes(array(bytes)) as f64,
            ScalarType::Uint64 => u64::from_be_bytes(array(bytes)) as f64,
            ScalarType::Float32 => f32::from_be_bytes(array(bytes)) as f64,
            ScalarType::Float64 => f64::from_be_bytes(array(bytes)),
        }
    }
}

fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

/// Byte cursor that hands out header lines and payload tokens.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            line: 0,
        }
    }

    fn next_line(&mut self) -> Option<&'a str> {
        if self.pos >= self.data.len() {
            return None;
        }
        let rest = &self.data[self.pos..];
        let end = rest.iter().position(|b| *b == b'\n').unwrap_or(rest.len());
        self.pos += (end + 1).min(rest.len());
        self.line += 1;
        let raw = &rest[..end];
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        Some(std::str::from_utf8(raw).unwrap_or(""))
    }

    /// Next non-empty, non-comment line, trimmed.
    fn next_content_line(&mut self) -> Option<&'a str> {
        while let Some(line) = self.next_line() {
            let trimmed = line.trim();
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                return Some(trimmed);
            }
        }
        None
    }

    fn next_token(&mut self) -> Option<&'a str> {
        while self.pos < self.data.len() && self.data[self.pos].is_ascii_whitespace() {
            if self.data[self.pos] == b'\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
        if self.pos >= self.data.len() {
            return None;
        }
        let start = self.pos;
        while self.pos < self.data.len() && !self.data[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        std::str::from_utf8(&self.data[start..self.pos]).ok()
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        if end > self.data.len() {
            return None;
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Some(bytes)
    }
}

struct Header {
    encoding: Encoding,
    dims: Option<[usize; 3]>,
    origin: [f64; 3],
    spacing: [f64; 3],
}

pub(crate) fn read_structured_points(path: &Path) -> Result<ScalarVolume, VolumeError> {
    let data = std::fs::read(path).map_err(|err| VolumeError::io(path, err))?;
    let volume = parse_structured_points(&data)?;
    tracing::info!(
        "loaded volume `{}` {:?} from {}",
        volume.name(),
        volume.dims(),
        path.display()
    );
    Ok(volume)
}

pub(crate) fn parse_structured_points(data: &[u8]) -> Result<ScalarVolume, VolumeError> {
    let mut cursor = Cursor::new(data);
    let banner = cursor
        .next_line()
        .ok_or_else(|| VolumeError::format("file is empty"))?;
    if !banner.trim_start().to_ascii_lowercase().starts_with("# vtk datafile") {
        return Err(VolumeError::format("missing `# vtk DataFile` banner"));
    }
    let _title = cursor.next_line();
    let encoding = match cursor
        .next_content_line()
        .map(|line| line.to_ascii_uppercase())
        .as_deref()
    {
        Some("ASCII") => Encoding::Ascii,
        Some("BINARY") => Encoding::Binary,
        other => {
            return Err(VolumeError::format(format!(
                "expected ASCII or BINARY, found {:?}",
                other
            )))
        }
    };

    let mut header = Header {
        encoding,
        dims: None,
        origin: [0.0; 3],
        spacing: [1.0; 3],
    };
    let mut saw_dataset = false;

    while let Some(line) = cursor.next_content_line() {
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };
        match keyword.to_ascii_uppercase().as_str() {
            "DATASET" => {
                let kind = parts.next().unwrap_or("");
                if !kind.eq_ignore_ascii_case("STRUCTURED_POINTS") {
                    return Err(VolumeError::format(format!(
                        "unsupported dataset type `{}`, expected STRUCTURED_POINTS",
                        kind
                    )));
                }
                saw_dataset = true;
            }
            "DIMENSIONS" => {
                let values = parse_triplet::<usize>(&mut parts, "DIMENSIONS")?;
                header.dims = Some(values);
            }
            "SPACING" | "ASPECT_RATIO" => {
                header.spacing = parse_triplet::<f64>(&mut parts, keyword)?;
            }
            "ORIGIN" => {
                header.origin = parse_triplet::<f64>(&mut parts, "ORIGIN")?;
            }
            "POINT_DATA" => {
                if !saw_dataset {
                    return Err(VolumeError::format("POINT_DATA before DATASET"));
                }
                let count = parse_count(parts.next(), "POINT_DATA")?;
                return read_point_data(&mut cursor, &header, count);
            }
            "CELL_DATA" => {
                return Err(VolumeError::format(
                    "cell data is not supported, expected POINT_DATA",
                ));
            }
            _ => {}
        }
    }
    Err(VolumeError::format("no POINT_DATA section"))
}

fn read_point_data(
    cursor: &mut Cursor<'_>,
    header: &Header,
    count: usize,
) -> Result<ScalarVolume, VolumeError> {
    let dims = header
        .dims
        .ok_or_else(|| VolumeError::format("DIMENSIONS missing"))?;
    let expected = grid_len(dims)?;
    if count != expected {
        return Err(VolumeError::format(format!(
            "POINT_DATA declares {} values but the grid has {}",
            count, expected
        )));
    }

    while let Some(line) = cursor.next_content_line() {
        let mut parts = line.split_whitespace();
        let keyword = parts.next().unwrap_or("").to_ascii_uppercase();
        match keyword.as_str() {
            "SCALARS" => {
                let name = parts
                    .next()
                    .ok_or_else(|| VolumeError::format("SCALARS without a name"))?
                    .to_string();
                let scalar_type = parse_type(parts.next())?;
                let components = match parts.next() {
                    Some(token) => parse_count(Some(token), "SCALARS components")?,
                    None => 1,
                };
                let mark = cursor.pos;
                match cursor.next_content_line() {
                    Some(line) if line.to_ascii_uppercase().starts_with("LOOKUP_TABLE") => {}
                    _ => cursor.pos = mark,
                }
                let values =
                    read_values(cursor, header.encoding, scalar_type, expected, components)?;
                return ScalarVolume::new(name, dims, header.origin, header.spacing, values);
            }
            "FIELD" => {
                let arrays = parse_count(parts.nth(1), "FIELD array count")?;
                if arrays == 0 {
                    continue;
                }
                let line = cursor
                    .next_content_line()
                    .ok_or_else(|| VolumeError::format("FIELD array header missing"))?;
                let mut parts = line.split_whitespace();
                let name = parts.next().unwrap_or("field").to_string();
                let components = parse_count(parts.next(), "FIELD components")?;
                let tuples = parse_count(parts.next(), "FIELD tuples")?;
                let scalar_type = parse_type(parts.next())?;
                if tuples != expected {
                    return Err(VolumeError::format(format!(
                        "FIELD array `{}` has {} tuples but the grid has {}",
                        name, tuples, expected
                    )));
                }
                let values =
                    read_values(cursor, header.encoding, scalar_type, expected, components)?;
                return ScalarVolume::new(name, dims, header.origin, header.spacing, values);
            }
            _ => {}
        }
    }
    Err(VolumeError::format("POINT_DATA has no scalar array"))
}

/// Reads `count` tuples and keeps the first component of each.
fn read_values(
    cursor: &mut Cursor<'_>,
    encoding: Encoding,
    scalar_type: ScalarType,
    count: usize,
    components: usize,
) -> Result<Vec<f64>, VolumeError> {
    let components = components.max(1);
    let total = count
        .checked_mul(components)
        .ok_or_else(|| VolumeError::format("scalar payload too large"))?;
    // never reserve more than the remaining bytes could hold
    let remaining = cursor.data.len().saturating_sub(cursor.pos);
    let mut values = Vec::with_capacity(count.min(remaining));
    match encoding {
        Encoding::Ascii => {
            for index in 0..total {
                let token = cursor.next_token().ok_or_else(|| {
                    VolumeError::format(format!(
                        "expected {} values, file ended after {}",
                        total, index
                    ))
                })?;
                let value = token.parse::<f64>().map_err(|_| {
                    VolumeError::format(format!(
                        "line {}: `{}` is not a number",
                        cursor.line, token
                    ))
                })?;
                if index % components == 0 {
                    values.push(value);
                }
            }
        }
        Encoding::Binary => {
            let size = scalar_type.size();
            let len = total
                .checked_mul(size)
                .ok_or_else(|| VolumeError::format("scalar payload too large"))?;
            let bytes = cursor.take(len).ok_or_else(|| {
                VolumeError::format(format!(
                    "binary payload shorter than {} values of {} bytes",
                    total, size
                ))
            })?;
            values.extend(
                bytes
                    .chunks_exact(size * components)
                    .map(|tuple| scalar_type.decode_be(&tuple[..size])),
            );
        }
    }
    Ok(values)
}

fn parse_triplet<'a, T: std::str::FromStr>(
    parts: &mut impl Iterator<Item = &'a str>,
    keyword: &str,
) -> Result<[T; 3], VolumeError> {
    let mut parse = || {
        parts
            .next()
            .and_then(|token| token.parse::<T>().ok())
            .ok_or_else(|| VolumeError::format(format!("malformed {} line", keyword)))
    };
    Ok([parse()?, parse()?, parse()?])
}

fn parse_count(token: Option<&str>, what: &str) -> Result<usize, VolumeError> {
    token
        .and_then(|token| token.parse::<usize>().ok())
        .ok_or_else(|| VolumeError::format(format!("malformed {}", what)))
}

fn parse_type(token: Option<&str>) -> Result<ScalarType, VolumeError> {
    let name = token.unwrap_or("");
    ScalarType::parse(name)
        .ok_or_else(|| VolumeError::format(format!("unsupported scalar type `{}`", name)))
}

pub(crate) fn write_structured_points(path: &Path, volume: &ScalarVolume) -> Result<(), VolumeError> {
    let io = |err| VolumeError::io(path, err);
    let file = std::fs::File::create(path).map_err(io)?;
    let mut out = std::io::BufWriter::new(file);
    let [nx, ny, nz] = volume.dims();
    let [ox, oy, oz] = volume.origin();
    let [sx, sy, sz] = volume.spacing();
    let name = if volume.name().is_empty() {
        "scalars"
    } else {
        volume.name()
    };

    writeln!(out, "# vtk DataFile Version 3.0").map_err(io)?;
    writeln!(out, "{}", name).map_err(io)?;
    writeln!(out, "ASCII").map_err(io)?;
    writeln!(out, "DATASET STRUCTURED_POINTS").map_err(io)?;
    writeln!(out, "DIMENSIONS {} {} {}", nx, ny, nz).map_err(io)?;
    writeln!(out, "SPACING {} {} {}", sx, sy, sz).map_err(io)?;
    writeln!(out, "ORIGIN {} {} {}", ox, oy, oz).map_err(io)?;
    writeln!(out, "POINT_DATA {}", volume.len()).map_err(io)?;
    writeln!(out, "SCALARS {} double 1", name).map_err(io)?;
    writeln!(out, "LOOKUP_TABLE default").map_err(io)?;
    for row in volume.original_scalars().chunks(nx.max(1)) {
        let mut first = true;
        for value in row {
            if !first {
                write!(out, " ").map_err(io)?;
            }
            write!(out, "{}", value).map_err(io)?;
            first = false;
        }
        writeln!(out).map_err(io)?;
    }
    out.flush().map_err(io)?;
    tracing::debug!("wrote volume `{}` to {}", name, path.display());
    Ok(())
}
