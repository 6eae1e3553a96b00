//! Register catalogs: the named register layout of one controller family.
//!
//! A [`Catalog`] is a list of [`Block`]s, each a contiguous run of registers
//! read with a single Modbus request. Every [`FieldSpec`] of a block maps a
//! symbolic name to an absolute register address and an [`EncodingType`].
//!
//! The two built-in catalogs are kept as YAML data files and parsed once per
//! process, see [`Catalog::builtin`]. Additional layouts can be loaded with
//! [`Catalog::from_yaml_str`] or [`Catalog::from_yaml_file`]:
//!
//! ```yaml
//! variant: legacy
//! blocks:
//!   - kind: input
//!     start: 0
//!     fields:
//!       - { name: ACTUAL_ROOM_TEMPERATURE_HC1, address: 0, type: 2 }
//!       - { name: SET_ROOM_TEMPERATURE_HC1, address: 1, type: 2 }
//! ```

use crate::protocol::{EncodingType, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

/// Maximum number of registers a single Modbus read request may return.
pub const MAX_BLOCK_LEN: usize = 125;

static LEGACY: LazyLock<Arc<Catalog>> = LazyLock::new(|| {
    Arc::new(
        Catalog::from_yaml_str(include_str!("../registers/legacy.yaml"))
            .expect("embedded legacy register map is valid"),
    )
});

static WPM3I: LazyLock<Arc<Catalog>> = LazyLock::new(|| {
    Arc::new(
        Catalog::from_yaml_str(include_str!("../registers/wpm3i.yaml"))
            .expect("embedded WPM3i register map is valid"),
    )
});

/// Errors raised while loading a register catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Cannot read register map: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot parse register map: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("The block starting at address {start} has no fields")]
    EmptyBlock { start: u16 },

    #[error("The block starting at address {start} has {len} fields, at most {MAX_BLOCK_LEN} can be read at once")]
    TooManyFields { start: u16, len: usize },

    #[error("Field {name} at address {address} lies outside of the block starting at address {start}")]
    OffsetOutOfRange {
        name: String,
        address: u16,
        start: u16,
    },

    #[error("Fields {first} and {second} share the address {address}")]
    DuplicateOffset {
        first: String,
        second: String,
        address: u16,
    },

    #[error("Field {0} is declared more than once")]
    DuplicateField(String),
}

/// The controller family a catalog describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Controllers covered by the first ISG Modbus register documentation.
    #[default]
    Legacy,
    /// WPM 3 and WPM 3i heat pump managers.
    Wpm3i,
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "wpm3i" | "wpm3" => Ok(Self::Wpm3i),
            other => Err(format!(
                "Unknown controller variant '{other}', expected 'legacy' or 'wpm3i'"
            )),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::Wpm3i => f.write_str("wpm3i"),
        }
    }
}

/// Modbus register class of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterKind {
    /// Read-only telemetry.
    Input,
    /// Read/write configuration.
    Holding,
}

/// A named register.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldSpec {
    name: String,
    address: u16,
    #[serde(rename = "type")]
    encoding: EncodingType,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, address: u16, encoding: EncodingType) -> Self {
        Self {
            name: name.into(),
            address,
            encoding,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute register address on the wire.
    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn encoding(&self) -> EncodingType {
        self.encoding
    }

    pub fn decode(&self, raw: u16) -> Value {
        self.encoding.decode(raw)
    }
}

/// A contiguous run of registers read with one request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    kind: RegisterKind,
    start: u16,
    fields: Vec<FieldSpec>,
}

impl Block {
    pub fn new(kind: RegisterKind, start: u16, fields: Vec<FieldSpec>) -> Self {
        Self {
            kind,
            start,
            fields,
        }
    }

    pub fn kind(&self) -> RegisterKind {
        self.kind
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Number of registers requested when reading this block.
    pub fn quantity(&self) -> u16 {
        // bounded by MAX_BLOCK_LEN once validated
        self.fields.len() as u16
    }

    /// Index of `field` within the registers returned for this block, `None`
    /// if its address lies outside of the block.
    pub fn offset_of(&self, field: &FieldSpec) -> Option<usize> {
        field
            .address
            .checked_sub(self.start)
            .map(usize::from)
            .filter(|&offset| offset < self.fields.len())
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.fields.is_empty() {
            return Err(CatalogError::EmptyBlock { start: self.start });
        }
        if self.fields.len() > MAX_BLOCK_LEN {
            return Err(CatalogError::TooManyFields {
                start: self.start,
                len: self.fields.len(),
            });
        }
        let mut taken: Vec<Option<&str>> = vec![None; self.fields.len()];
        for field in &self.fields {
            let slot = self
                .offset_of(field)
                .and_then(|offset| taken.get_mut(offset))
                .ok_or_else(|| CatalogError::OffsetOutOfRange {
                    name: field.name.clone(),
                    address: field.address,
                    start: self.start,
                })?;
            if let Some(first) = *slot {
                return Err(CatalogError::DuplicateOffset {
                    first: first.to_string(),
                    second: field.name.clone(),
                    address: field.address,
                });
            }
            *slot = Some(field.name.as_str());
        }
        Ok(())
    }
}

/// Position of a field inside a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldLocation {
    pub block: usize,
    pub index: usize,
}

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    variant: Variant,
    blocks: Vec<Block>,
}

/// The full register layout of one controller family.
///
/// A catalog is immutable once built. It carries no register values, those
/// belong to the client reading the device.
#[derive(Debug, Clone)]
pub struct Catalog {
    variant: Variant,
    blocks: Vec<Block>,
    index: HashMap<String, FieldLocation>,
}

impl Catalog {
    /// Builds a catalog from blocks, validating their layout.
    ///
    /// Blocks are kept in the given order, which is also the order they are
    /// read in.
    pub fn new(variant: Variant, blocks: Vec<Block>) -> Result<Self, CatalogError> {
        let mut index = HashMap::new();
        for (block_index, block) in blocks.iter().enumerate() {
            block.validate()?;
            for (field_index, field) in block.fields.iter().enumerate() {
                let location = FieldLocation {
                    block: block_index,
                    index: field_index,
                };
                if index.insert(field.name.clone(), location).is_some() {
                    return Err(CatalogError::DuplicateField(field.name.clone()));
                }
            }
        }
        Ok(Self {
            variant,
            blocks,
            index,
        })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::new(file.variant, file.blocks)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        log::debug!("Loading register map from {path:?}");
        let file: CatalogFile = serde_yaml::from_reader(std::fs::File::open(path)?)?;
        Self::new(file.variant, file.blocks)
    }

    /// The embedded catalog of a controller family, shared by all clients.
    pub fn builtin(variant: Variant) -> Arc<Catalog> {
        match variant {
            Variant::Legacy => LEGACY.clone(),
            Variant::Wpm3i => WPM3I.clone(),
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Total number of fields over all blocks.
    pub fn len(&self) -> usize {
        self.blocks.iter().map(|block| block.fields.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Finds where a field is declared.
    pub fn locate(&self, name: &str) -> Option<FieldLocation> {
        self.index.get(name).copied()
    }

    /// Finds a field by name, `None` if this controller family has no such register.
    pub fn resolve(&self, name: &str) -> Option<&FieldSpec> {
        self.locate(name).map(|location| self.field(location))
    }

    /// # Panics
    ///
    /// If `location` was not obtained from this catalog.
    pub fn field(&self, location: FieldLocation) -> &FieldSpec {
        &self.blocks[location.block].fields[location.index]
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (FieldLocation, &FieldSpec)> {
        self.blocks
            .iter()
            .enumerate()
            .flat_map(|(block_index, block)| {
                block
                    .fields
                    .iter()
                    .enumerate()
                    .map(move |(field_index, field)| {
                        (
                            FieldLocation {
                                block: block_index,
                                index: field_index,
                            },
                            field,
                        )
                    })
            })
    }
}
