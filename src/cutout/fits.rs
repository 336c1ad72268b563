//! Minimal FITS reader/writer.
//!
//! Covers exactly what the portal stores and consumes: single-HDU image
//! stamps (the cutout blobs) and the binary-table extension carrying a
//! gravitational-wave probability map. Headers are sequences of 80-byte
//! cards in 2880-byte blocks; data is big-endian and padded to the block
//! size.

pub const BLOCK_SIZE: usize = 2880;
const CARD_SIZE: usize = 80;

#[derive(Debug, thiserror::Error)]
pub enum FitsError {
    #[error("truncated FITS data: {0}")]
    Truncated(String),
    #[error("missing header card `{0}`")]
    MissingCard(String),
    #[error("unsupported FITS feature: {0}")]
    Unsupported(String),
    #[error("malformed header card: {0}")]
    Malformed(String),
}

/// A parsed FITS header: keyword/value cards in file order.
#[derive(Debug, Clone, Default)]
pub struct FitsHeader {
    cards: Vec<(String, String)>,
    /// Total size of the header in the file, including block padding.
    pub byte_len: usize,
}

impl FitsHeader {
    /// Parse a header starting at the beginning of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, FitsError> {
        let mut cards = Vec::new();
        let mut offset = 0;
        loop {
            if offset + BLOCK_SIZE > bytes.len() {
                return Err(FitsError::Truncated("header block".to_string()));
            }
            let block = &bytes[offset..offset + BLOCK_SIZE];
            offset += BLOCK_SIZE;
            let mut done = false;
            for card in block.chunks(CARD_SIZE) {
                let text = String::from_utf8_lossy(card);
                let keyword = text[..8.min(text.len())].trim().to_string();
                if keyword == "END" {
                    done = true;
                    break;
                }
                if keyword.is_empty() || keyword == "COMMENT" || keyword == "HISTORY" {
                    continue;
                }
                if text.len() > 10 && &text[8..10] == "= " {
                    let value = parse_card_value(&text[10..]);
                    cards.push((keyword, value));
                }
            }
            if done {
                return Ok(Self {
                    cards,
                    byte_len: offset,
                });
            }
        }
    }

    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.cards
            .iter()
            .find(|(k, _)| k == keyword)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_i64(&self, keyword: &str) -> Result<i64, FitsError> {
        self.get(keyword)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| FitsError::MissingCard(keyword.to_string()))
    }

    pub fn get_f64(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(|v| v.parse().ok())
    }
}

/// Extract a card value: strip the trailing comment and surrounding quotes.
fn parse_card_value(raw: &str) -> String {
    let mut in_string = false;
    let mut end = raw.len();
    for (idx, ch) in raw.char_indices() {
        match ch {
            '\'' => in_string = !in_string,
            '/' if !in_string => {
                end = idx;
                break;
            }
            _ => {}
        }
    }
    let trimmed = raw[..end].trim();
    trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// A decoded 2-D image, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f64>,
}

impl Image {
    pub fn new(width: usize, height: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }
}

/// Decode the primary image HDU of a FITS file.
///
/// Supports BITPIX 8, 16, 32, -32 and -64 with BSCALE/BZERO applied.
pub fn decode_image(bytes: &[u8]) -> Result<Image, FitsError> {
    let header = FitsHeader::parse(bytes)?;
    let bitpix = header.get_i64("BITPIX")?;
    let naxis = header.get_i64("NAXIS")?;
    if naxis != 2 {
        return Err(FitsError::Unsupported(format!("NAXIS = {}", naxis)));
    }
    let width = header.get_i64("NAXIS1")? as usize;
    let height = header.get_i64("NAXIS2")? as usize;
    let bscale = header.get_f64("BSCALE").unwrap_or(1.0);
    let bzero = header.get_f64("BZERO").unwrap_or(0.0);

    let pixel_bytes = (bitpix.unsigned_abs() / 8) as usize;
    let needed = width * height * pixel_bytes;
    let data_bytes = &bytes[header.byte_len..];
    if data_bytes.len() < needed {
        return Err(FitsError::Truncated("image data".to_string()));
    }

    let mut data = Vec::with_capacity(width * height);
    for chunk in data_bytes[..needed].chunks_exact(pixel_bytes) {
        let raw = match bitpix {
            8 => chunk[0] as f64,
            16 => i16::from_be_bytes([chunk[0], chunk[1]]) as f64,
            32 => i32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64,
            -32 => f32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64,
            -64 => f64::from_be_bytes([
                chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
            ]),
            other => return Err(FitsError::Unsupported(format!("BITPIX = {}", other))),
        };
        data.push(bzero + bscale * raw);
    }
    Ok(Image::new(width, height, data))
}

fn push_card(header: &mut Vec<u8>, keyword: &str, value: &str) {
    let card = format!("{:<8}= {:>20}", keyword, value);
    let mut bytes = card.into_bytes();
    bytes.resize(CARD_SIZE, b' ');
    header.extend_from_slice(&bytes);
}

fn push_string_card(header: &mut Vec<u8>, keyword: &str, value: &str) {
    let card = format!("{:<8}= '{}'", keyword, value);
    let mut bytes = card.into_bytes();
    bytes.resize(CARD_SIZE, b' ');
    header.extend_from_slice(&bytes);
}

fn push_end(header: &mut Vec<u8>) {
    let mut end = b"END".to_vec();
    end.resize(CARD_SIZE, b' ');
    header.extend_from_slice(&end);
    pad_block(header);
}

fn pad_block(bytes: &mut Vec<u8>) {
    // FITS headers pad with spaces, data with zeros; a space-padded data
    // area is tolerated by every reader we care about, so pad uniformly.
    while bytes.len() % BLOCK_SIZE != 0 {
        bytes.push(0);
    }
}

/// Encode a 2-D image as a single-HDU FITS file, BITPIX -32.
pub fn encode_image(image: &Image) -> Vec<u8> {
    let mut out = Vec::new();
    push_card(&mut out, "SIMPLE", "T");
    push_card(&mut out, "BITPIX", "-32");
    push_card(&mut out, "NAXIS", "2");
    push_card(&mut out, "NAXIS1", &image.width.to_string());
    push_card(&mut out, "NAXIS2", &image.height.to_string());
    push_end(&mut out);

    for value in &image.data {
        out.extend_from_slice(&(*value as f32).to_be_bytes());
    }
    pad_block(&mut out);
    out
}

/// A binary-table extension column descriptor.
#[derive(Debug, Clone)]
struct BinColumn {
    name: String,
    repeat: usize,
    code: char,
    offset: usize,
}

fn element_size(code: char) -> Result<usize, FitsError> {
    match code {
        'B' | 'A' | 'L' => Ok(1),
        'I' => Ok(2),
        'E' | 'J' => Ok(4),
        'D' | 'K' => Ok(8),
        other => Err(FitsError::Unsupported(format!("TFORM code `{}`", other))),
    }
}

fn parse_tform(spec: &str) -> Result<(usize, char), FitsError> {
    let spec = spec.trim();
    let split = spec
        .char_indices()
        .find(|(_, c)| c.is_ascii_alphabetic())
        .ok_or_else(|| FitsError::Malformed(format!("TFORM `{}`", spec)))?;
    let (idx, code) = split;
    let repeat = if idx == 0 {
        1
    } else {
        spec[..idx]
            .parse()
            .map_err(|_| FitsError::Malformed(format!("TFORM `{}`", spec)))?
    };
    Ok((repeat, code))
}

/// The first binary-table extension of a FITS file.
#[derive(Debug)]
pub struct BinTable {
    pub header: FitsHeader,
    columns: Vec<BinColumn>,
    row_len: usize,
    rows: usize,
    data: Vec<u8>,
}

impl BinTable {
    /// Skip the primary HDU and parse the first extension as a binary table.
    pub fn parse(bytes: &[u8]) -> Result<Self, FitsError> {
        let primary = FitsHeader::parse(bytes)?;
        let mut offset = primary.byte_len;
        // primary data area, padded to block size
        if primary.get_i64("NAXIS").unwrap_or(0) > 0 {
            let mut data_len: usize = (primary.get_i64("BITPIX")?.unsigned_abs() / 8) as usize;
            let naxis = primary.get_i64("NAXIS")?;
            for axis in 1..=naxis {
                data_len *= primary.get_i64(&format!("NAXIS{}", axis))? as usize;
            }
            offset += data_len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
        }

        let header = FitsHeader::parse(&bytes[offset..])?;
        if header.get("XTENSION") != Some("BINTABLE") {
            return Err(FitsError::Unsupported(format!(
                "extension `{:?}` is not a binary table",
                header.get("XTENSION")
            )));
        }
        let row_len = header.get_i64("NAXIS1")? as usize;
        let rows = header.get_i64("NAXIS2")? as usize;
        let tfields = header.get_i64("TFIELDS")? as usize;

        let mut columns = Vec::with_capacity(tfields);
        let mut col_offset = 0;
        for field in 1..=tfields {
            let name = header
                .get(&format!("TTYPE{}", field))
                .unwrap_or("")
                .to_string();
            let tform = header
                .get(&format!("TFORM{}", field))
                .ok_or_else(|| FitsError::MissingCard(format!("TFORM{}", field)))?;
            let (repeat, code) = parse_tform(tform)?;
            columns.push(BinColumn {
                name,
                repeat,
                code,
                offset: col_offset,
            });
            col_offset += repeat * element_size(code)?;
        }
        if col_offset != row_len {
            return Err(FitsError::Malformed(format!(
                "row length {} does not match columns ({})",
                row_len, col_offset
            )));
        }

        let data_start = offset + header.byte_len;
        let data_end = data_start + row_len * rows;
        if bytes.len() < data_end {
            return Err(FitsError::Truncated("binary table data".to_string()));
        }
        Ok(Self {
            header,
            columns,
            row_len,
            rows,
            data: bytes[data_start..data_end].to_vec(),
        })
    }

    /// Read one column as f64 values, flattening vector cells across rows.
    pub fn column_f64(&self, name: &str) -> Result<Vec<f64>, FitsError> {
        let column = self
            .columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| FitsError::MissingCard(name.to_string()))?;
        let size = element_size(column.code)?;
        let mut out = Vec::with_capacity(self.rows * column.repeat);
        for row in 0..self.rows {
            let base = row * self.row_len + column.offset;
            for elem in 0..column.repeat {
                let start = base + elem * size;
                let bytes = &self.data[start..start + size];
                let value = match column.code {
                    'E' => f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
                    'D' => f64::from_be_bytes([
                        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6],
                        bytes[7],
                    ]),
                    'J' => i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
                    'K' => i64::from_be_bytes([
                        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6],
                        bytes[7],
                    ]) as f64,
                    'I' => i16::from_be_bytes([bytes[0], bytes[1]]) as f64,
                    'B' => bytes[0] as f64,
                    other => {
                        return Err(FitsError::Unsupported(format!(
                            "column code `{}` as f64",
                            other
                        )))
                    }
                };
                out.push(value);
            }
        }
        Ok(out)
    }
}

/// Encode a probability map as a one-column binary-table FITS file, the
/// shape gravitational-wave alerts ship in. Used to build fixtures and to
/// seed demo stores.
pub fn encode_prob_bintable(probs: &[f64], ordering: &str, date_obs: &str) -> Vec<u8> {
    let mut out = Vec::new();
    // minimal primary HDU, no data
    push_card(&mut out, "SIMPLE", "T");
    push_card(&mut out, "BITPIX", "8");
    push_card(&mut out, "NAXIS", "0");
    push_end(&mut out);

    push_string_card(&mut out, "XTENSION", "BINTABLE");
    push_card(&mut out, "BITPIX", "8");
    push_card(&mut out, "NAXIS", "2");
    push_card(&mut out, "NAXIS1", "8");
    push_card(&mut out, "NAXIS2", &probs.len().to_string());
    push_card(&mut out, "TFIELDS", "1");
    push_string_card(&mut out, "TTYPE1", "PROB");
    push_string_card(&mut out, "TFORM1", "D");
    push_string_card(&mut out, "ORDERING", ordering);
    push_string_card(&mut out, "DATE-OBS", date_obs);
    push_end(&mut out);

    for p in probs {
        out.extend_from_slice(&p.to_be_bytes());
    }
    pad_block(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_roundtrip() {
        let image = Image::new(3, 2, vec![0.0, 1.5, -2.25, 10.0, 0.5, 3.75]);
        let bytes = encode_image(&image);
        assert_eq!(bytes.len() % BLOCK_SIZE, 0);
        let back = decode_image(&bytes).unwrap();
        assert_eq!(back.width, 3);
        assert_eq!(back.height, 2);
        for (a, b) in back.data.iter().zip(&image.data) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_header_value_parsing() {
        assert_eq!(parse_card_value("                   T / comment"), "T");
        assert_eq!(parse_card_value("'NESTED  '          / scheme"), "NESTED");
        assert_eq!(parse_card_value("  -32 "), "-32");
    }

    #[test]
    fn test_bscale_bzero_applied() {
        let image = Image::new(1, 1, vec![7.0]);
        let mut bytes = encode_image(&image);
        // rebuild with BSCALE 2, BZERO 1 on a 16-bit image
        bytes.clear();
        push_card(&mut bytes, "SIMPLE", "T");
        push_card(&mut bytes, "BITPIX", "16");
        push_card(&mut bytes, "NAXIS", "2");
        push_card(&mut bytes, "NAXIS1", "1");
        push_card(&mut bytes, "NAXIS2", "1");
        push_card(&mut bytes, "BSCALE", "2.0");
        push_card(&mut bytes, "BZERO", "1.0");
        push_end(&mut bytes);
        bytes.extend_from_slice(&3i16.to_be_bytes());
        pad_block(&mut bytes);

        let back = decode_image(&bytes).unwrap();
        assert_eq!(back.data[0], 7.0);
    }

    #[test]
    fn test_truncated_image_rejected() {
        let image = Image::new(4, 4, vec![1.0; 16]);
        let bytes = encode_image(&image);
        assert!(decode_image(&bytes[..BLOCK_SIZE]).is_err());
    }

    #[test]
    fn test_bintable_prob_roundtrip() {
        let probs: Vec<f64> = (0..48).map(|i| i as f64 / 48.0).collect();
        let bytes = encode_prob_bintable(&probs, "NESTED", "2023-04-01T12:00:00");
        let table = BinTable::parse(&bytes).unwrap();
        assert_eq!(table.header.get("ORDERING"), Some("NESTED"));
        assert_eq!(table.header.get("DATE-OBS"), Some("2023-04-01T12:00:00"));
        let back = table.column_f64("PROB").unwrap();
        assert_eq!(back, probs);
    }

    #[test]
    fn test_tform_parse() {
        assert_eq!(parse_tform("1024E").unwrap(), (1024, 'E'));
        assert_eq!(parse_tform("D").unwrap(), (1, 'D'));
        assert!(parse_tform("123").is_err());
    }
}
