//! Binary glTF (GLB) container decoding.
//!
//! Only the container is validated here: the header, the chunk table and the
//! JSON document. Mesh and texture decoding is left to the render engine,
//! which receives the original bytes.

use std::fmt;

/// `glTF` in little-endian.
const MAGIC: u32 = 0x4654_6C67;
/// The only container version we accept.
const VERSION: u32 = 2;
const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;
/// `JSON` in little-endian.
const CHUNK_JSON: u32 = 0x4E4F_534A;
/// `BIN\0` in little-endian.
const CHUNK_BIN: u32 = 0x004E_4942;

/// Errors that can occur while decoding a GLB container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlbError {
    /// Input buffer is too small for the expected data.
    BufferTooSmall { expected: usize, actual: usize },
    /// The header magic is not `glTF`.
    BadMagic(u32),
    /// The container version is not 2.
    UnsupportedVersion(u32),
    /// Invalid chunk layout.
    InvalidChunk {
        context: &'static str,
        detail: String,
    },
    /// The JSON chunk is not a valid glTF document.
    InvalidJson(String),
}

impl fmt::Display for GlbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall { expected, actual } => {
                write!(
                    f,
                    "buffer too small: expected {expected} bytes, got {actual}"
                )
            }
            Self::BadMagic(magic) => write!(f, "bad magic 0x{magic:08x}"),
            Self::UnsupportedVersion(version) => {
                write!(f, "unsupported container version {version}")
            }
            Self::InvalidChunk { context, detail } => {
                write!(f, "invalid chunk in {context}: {detail}")
            }
            Self::InvalidJson(detail) => write!(f, "invalid json chunk: {detail}"),
        }
    }
}

impl std::error::Error for GlbError {}

/// Result type for GLB decoding.
pub type GlbResult<T> = Result<T, GlbError>;

/// A validated GLB container.
#[derive(Debug, Clone, PartialEq)]
pub struct GlbDocument {
    /// The parsed JSON chunk.
    pub json: serde_json::Value,
    /// Length of the binary chunk in bytes (0 if absent).
    pub bin_len: usize,
    /// Number of entries in `scenes`.
    pub scene_count: usize,
    /// Number of entries in `nodes`.
    pub node_count: usize,
    /// Number of entries in `meshes`.
    pub mesh_count: usize,
}

fn read_u32(data: &[u8], offset: usize) -> GlbResult<u32> {
    let bytes = data
        .get(offset..offset + 4)
        .ok_or(GlbError::BufferTooSmall {
            expected: offset + 4,
            actual: data.len(),
        })?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn array_len(json: &serde_json::Value, key: &str) -> usize {
    json.get(key)
        .and_then(serde_json::Value::as_array)
        .map_or(0, Vec::len)
}

/// Decode and validate a GLB container.
pub fn parse_glb(data: &[u8]) -> GlbResult<GlbDocument> {
    if data.len() < HEADER_LEN {
        return Err(GlbError::BufferTooSmall {
            expected: HEADER_LEN,
            actual: data.len(),
        });
    }

    let magic = read_u32(data, 0)?;
    if magic != MAGIC {
        return Err(GlbError::BadMagic(magic));
    }
    let version = read_u32(data, 4)?;
    if version != VERSION {
        return Err(GlbError::UnsupportedVersion(version));
    }
    let declared = read_u32(data, 8)? as usize;
    if declared > data.len() {
        return Err(GlbError::BufferTooSmall {
            expected: declared,
            actual: data.len(),
        });
    }
    let data = &data[..declared];

    let mut offset = HEADER_LEN;
    let mut json = None;
    let mut bin_len = 0;

    while offset < data.len() {
        let chunk_len = read_u32(data, offset)? as usize;
        let chunk_type = read_u32(data, offset + 4)?;
        let start = offset + CHUNK_HEADER_LEN;
        let end = match start.checked_add(chunk_len) {
            Some(end) if end <= data.len() => end,
            _ => {
                return Err(GlbError::InvalidChunk {
                    context: "chunk table",
                    detail: format!(
                        "chunk at {offset} with length {chunk_len} overruns container of {} bytes",
                        data.len()
                    ),
                });
            }
        };

        match chunk_type {
            CHUNK_JSON if json.is_none() && offset == HEADER_LEN => {
                let value: serde_json::Value = serde_json::from_slice(&data[start..end])
                    .map_err(|e| GlbError::InvalidJson(e.to_string()))?;
                if !value.is_object() {
                    return Err(GlbError::InvalidJson("root is not an object".to_string()));
                }
                json = Some(value);
            }
            CHUNK_JSON => {
                return Err(GlbError::InvalidChunk {
                    context: "json chunk",
                    detail: "json chunk must appear exactly once, first".to_string(),
                });
            }
            CHUNK_BIN if json.is_some() => bin_len = chunk_len,
            // Unknown chunk types must be ignored.
            _ if json.is_some() => {}
            other => {
                return Err(GlbError::InvalidChunk {
                    context: "json chunk",
                    detail: format!("first chunk has type 0x{other:08x}"),
                });
            }
        }

        offset = end;
    }

    let json = json.ok_or(GlbError::InvalidChunk {
        context: "json chunk",
        detail: "missing".to_string(),
    })?;

    Ok(GlbDocument {
        scene_count: array_len(&json, "scenes"),
        node_count: array_len(&json, "nodes"),
        mesh_count: array_len(&json, "meshes"),
        json,
        bin_len,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a GLB container from a JSON document and an optional binary chunk.
    pub(crate) fn build_glb(json: &str, bin: Option<&[u8]>) -> Vec<u8> {
        let mut json_bytes = json.as_bytes().to_vec();
        while json_bytes.len() % 4 != 0 {
            json_bytes.push(b' ');
        }
        let mut body = Vec::new();
        body.extend_from_slice(&u32::try_from(json_bytes.len()).unwrap().to_le_bytes());
        body.extend_from_slice(&CHUNK_JSON.to_le_bytes());
        body.extend_from_slice(&json_bytes);
        if let Some(bin) = bin {
            let mut bin = bin.to_vec();
            while bin.len() % 4 != 0 {
                bin.push(0);
            }
            body.extend_from_slice(&u32::try_from(bin.len()).unwrap().to_le_bytes());
            body.extend_from_slice(&CHUNK_BIN.to_le_bytes());
            body.extend_from_slice(&bin);
        }

        let total = u32::try_from(HEADER_LEN + body.len()).unwrap();
        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC.to_le_bytes());
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&total.to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    pub(crate) const STATION_JSON: &str = r#"{"asset":{"version":"2.0"},"scenes":[{"nodes":[0]}],"nodes":[{"mesh":0},{"name":"lights"}],"meshes":[{"primitives":[]}]}"#;

    #[test]
    fn test_parse_minimal() {
        let data = build_glb(STATION_JSON, Some(&[1, 2, 3, 4, 5]));
        let doc = parse_glb(&data).unwrap();
        assert_eq!(doc.scene_count, 1);
        assert_eq!(doc.node_count, 2);
        assert_eq!(doc.mesh_count, 1);
        // Padded to a multiple of four.
        assert_eq!(doc.bin_len, 8);
    }

    #[test]
    fn test_parse_json_only() {
        let data = build_glb(r#"{"asset":{"version":"2.0"}}"#, None);
        let doc = parse_glb(&data).unwrap();
        assert_eq!(doc.bin_len, 0);
        assert_eq!(doc.mesh_count, 0);
    }

    #[test]
    fn test_truncated_header() {
        assert_eq!(
            parse_glb(&[0x67, 0x6C, 0x54]),
            Err(GlbError::BufferTooSmall {
                expected: 12,
                actual: 3
            })
        );
    }

    #[test]
    fn test_bad_magic() {
        let mut data = build_glb(STATION_JSON, None);
        data[0] = b'x';
        assert!(matches!(parse_glb(&data), Err(GlbError::BadMagic(_))));
    }

    #[test]
    fn test_unsupported_version() {
        let mut data = build_glb(STATION_JSON, None);
        data[4] = 1;
        assert_eq!(parse_glb(&data), Err(GlbError::UnsupportedVersion(1)));
    }

    #[test]
    fn test_declared_length_exceeds_buffer() {
        let mut data = build_glb(STATION_JSON, None);
        data.truncate(data.len() - 4);
        assert!(matches!(
            parse_glb(&data),
            Err(GlbError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn test_invalid_json() {
        let data = build_glb("{not json", None);
        assert!(matches!(parse_glb(&data), Err(GlbError::InvalidJson(_))));
    }

    #[test]
    fn test_oversized_chunk_length_rejected() {
        let mut data = build_glb(STATION_JSON, None);
        data[12..16].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            parse_glb(&data),
            Err(GlbError::InvalidChunk {
                context: "chunk table",
                ..
            })
        ));
    }

    #[test]
    fn test_bin_before_json_rejected() {
        let mut data = build_glb(STATION_JSON, None);
        // Rewrite the first chunk type to BIN.
        data[16..20].copy_from_slice(&CHUNK_BIN.to_le_bytes());
        assert!(matches!(
            parse_glb(&data),
            Err(GlbError::InvalidChunk { .. })
        ));
    }
}
