//! Raw GeoTIFF key directory access.
//!
//! The GeoKeyDirectory tag packs a small key/value table into Short values:
//! a 4-value header (version, revision, minor revision, key count) followed
//! by one 4-value entry per key. A key's value lives either in the entry
//! itself or in one of the GeoKeyDirectory, GeoDoubleParams and
//! GeoAsciiParams tags. Keys are exposed as raw values; no geodetic meaning
//! is attached to them.

use tracing::debug;

use crate::error::TagError;
use crate::io::RangeReader;

use super::image::Image;
use super::tags::TagCode;

/// Tag location meaning "the value is stored in the entry itself".
const LOCATION_INLINE: u16 = 0;

/// Decoded header and entries of a GeoKeyDirectory tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoKeyDirectory {
    pub version: u16,
    pub revision: u16,
    pub minor_revision: u16,
    pub entries: Vec<GeoKeyEntry>,
}

/// One key of the directory, before its value is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeyEntry {
    pub key_id: u16,
    /// Tag holding the value, or 0 when `value_offset` is the value
    pub tiff_tag_location: u16,
    pub count: u16,
    pub value_offset: u16,
}

/// The raw value of a key.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoKeyValue {
    Short(Vec<u16>),
    Double(Vec<f64>),
    Ascii(String),
}

/// A key with its resolved value.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoKey {
    pub id: u16,
    pub value: GeoKeyValue,
}

impl GeoKeyDirectory {
    /// Parse the Short values of a GeoKeyDirectory tag.
    ///
    /// Returns `None` when the header is incomplete. Entries declared past
    /// the end of `values` are dropped.
    pub fn parse(values: &[u16]) -> Option<Self> {
        let [version, revision, minor_revision, key_count] = *values.get(..4)? else {
            return None;
        };

        let entries: Vec<GeoKeyEntry> = values[4..]
            .chunks_exact(4)
            .take(key_count as usize)
            .map(|entry| GeoKeyEntry {
                key_id: entry[0],
                tiff_tag_location: entry[1],
                count: entry[2],
                value_offset: entry[3],
            })
            .collect();

        if entries.len() < key_count as usize {
            debug!(
                declared = key_count,
                found = entries.len(),
                "GeoKeyDirectory is shorter than its key count"
            );
        }

        Some(GeoKeyDirectory {
            version,
            revision,
            minor_revision,
            entries,
        })
    }

    /// First entry with the given key id.
    pub fn entry(&self, key_id: u16) -> Option<&GeoKeyEntry> {
        self.entries.iter().find(|entry| entry.key_id == key_id)
    }
}

impl GeoKeyEntry {
    /// Resolve this key's value against the directory and parameter tags.
    ///
    /// Returns `None` for unknown locations or ranges outside the
    /// referenced tag.
    pub fn resolve(
        &self,
        directory: &[u16],
        doubles: &[f64],
        ascii: &str,
    ) -> Option<GeoKeyValue> {
        if self.tiff_tag_location == LOCATION_INLINE {
            return Some(GeoKeyValue::Short(vec![self.value_offset]));
        }

        let start = self.value_offset as usize;
        let end = start + self.count as usize;
        match TagCode::from_u16(self.tiff_tag_location) {
            TagCode::GeoTiffGeoKeyDirectory => {
                directory.get(start..end).map(|v| GeoKeyValue::Short(v.to_vec()))
            }
            TagCode::GeoTiffDoubleParams => {
                doubles.get(start..end).map(|v| GeoKeyValue::Double(v.to_vec()))
            }
            TagCode::GeoTiffAsciiParams => {
                // Values are '|'-terminated inside the shared string
                let text = ascii.get(start..end)?;
                let text = text.strip_suffix('|').unwrap_or(text);
                Some(GeoKeyValue::Ascii(text.to_string()))
            }
            _ => None,
        }
    }
}

impl<R: RangeReader + ?Sized> Image<R> {
    /// The GeoKeyDirectory of this image, if it has one.
    pub async fn geo_key_directory(&self) -> Result<GeoKeyDirectory, TagError> {
        let values = self.geo_key_values().await?;
        parse_directory(&values)
    }

    /// All GeoTIFF keys with their raw values.
    ///
    /// Keys whose value cannot be located are skipped.
    pub async fn geo_keys(&self) -> Result<Vec<GeoKey>, TagError> {
        let values = self.geo_key_values().await?;
        let directory = parse_directory(&values)?;

        let doubles = match self.tag(TagCode::GeoTiffDoubleParams) {
            Some(entry) => self.read_tag_as_vec::<f64>(entry).await?,
            None => Vec::new(),
        };
        let ascii = match self.tag(TagCode::GeoTiffAsciiParams) {
            Some(entry) => self.read_tag_as_string(entry).await?,
            None => String::new(),
        };

        let keys = directory
            .entries
            .iter()
            .filter_map(|entry| {
                let value = entry.resolve(&values, &doubles, &ascii);
                if value.is_none() {
                    debug!(
                        key = entry.key_id,
                        location = entry.tiff_tag_location,
                        "Skipping unresolvable GeoKey"
                    );
                }
                value.map(|value| GeoKey {
                    id: entry.key_id,
                    value,
                })
            })
            .collect();

        Ok(keys)
    }

    async fn geo_key_values(&self) -> Result<Vec<u16>, TagError> {
        let entry = self
            .tag(TagCode::GeoTiffGeoKeyDirectory)
            .ok_or(TagError::MissingTag(TagCode::GeoTiffGeoKeyDirectory))?;
        self.read_tag_as_vec::<u16>(entry).await
    }
}

/// An incomplete header reports the missing fourth value.
fn parse_directory(values: &[u16]) -> Result<GeoKeyDirectory, TagError> {
    GeoKeyDirectory::parse(values).ok_or(TagError::IndexOutOfRange {
        index: 3,
        len: values.len() as u64,
    })
}
