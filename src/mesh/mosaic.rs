//! Named, ordered collections of tiles.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::mesh::Mesh;
use crate::mosaic_error::MosaicError;
use crate::topology::contact::Contact;
use crate::topology::side::Side;
use crate::topology::{TopologyOptions, build_topology};

/// Per-tile cell masks keyed by tile id, each of length `ny * nx`.
pub type TileMasks = BTreeMap<String, Vec<f64>>;

/// Declared structure of a mosaic, used to judge topology completeness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MosaicShape {
    /// Six faces; every boundary must meet a neighbor unless declared open.
    CubedSphere,
    /// Regional domain; unmatched boundaries are physical edges.
    Regional,
    /// No structural expectation.
    #[default]
    Generic,
}

/// A named set of tiles plus, once computed, their contacts.
#[derive(Clone, Debug)]
pub struct Mosaic {
    name: String,
    shape: MosaicShape,
    tiles: Vec<Mesh>,
    index: BTreeMap<String, usize>,
    open_boundaries: BTreeSet<(usize, Side)>,
    contacts: Vec<Contact>,
    period_x: bool,
    period_y: bool,
}

impl Mosaic {
    pub fn new(name: impl Into<String>, shape: MosaicShape) -> Self {
        Self {
            name: name.into(),
            shape,
            tiles: Vec::new(),
            index: BTreeMap::new(),
            open_boundaries: BTreeSet::new(),
            contacts: Vec::new(),
            period_x: false,
            period_y: false,
        }
    }

    /// Build a mosaic from tiles in order; ids must be unique.
    pub fn with_tiles<I>(
        name: impl Into<String>,
        shape: MosaicShape,
        tiles: I,
    ) -> Result<Self, MosaicError>
    where
        I: IntoIterator<Item = Mesh>,
    {
        let mut mosaic = Self::new(name, shape);
        for tile in tiles {
            mosaic.add_tile(tile)?;
        }
        Ok(mosaic)
    }

    /// Append a tile, returning its index. Invalidates computed contacts.
    pub fn add_tile(&mut self, mesh: Mesh) -> Result<usize, MosaicError> {
        if self.index.contains_key(mesh.tile()) {
            return Err(MosaicError::DuplicateTile(mesh.tile().to_string()));
        }
        let idx = self.tiles.len();
        self.index.insert(mesh.tile().to_string(), idx);
        self.tiles.push(mesh);
        self.clear_topology();
        Ok(idx)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn shape(&self) -> MosaicShape {
        self.shape
    }

    #[inline]
    pub fn tiles(&self) -> &[Mesh] {
        &self.tiles
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tile_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn tile(&self, id: &str) -> Result<&Mesh, MosaicError> {
        self.tile_index(id)
            .map(|k| &self.tiles[k])
            .ok_or_else(|| MosaicError::UnknownTile(id.to_string()))
    }

    /// Mark a tile side as a deliberate regional edge that needs no neighbor.
    pub fn declare_open_boundary(&mut self, tile: &str, side: Side) -> Result<(), MosaicError> {
        let idx = self
            .tile_index(tile)
            .ok_or_else(|| MosaicError::UnknownTile(tile.to_string()))?;
        self.open_boundaries.insert((idx, side));
        Ok(())
    }

    #[inline]
    pub fn is_open_boundary(&self, tile_idx: usize, side: Side) -> bool {
        self.open_boundaries.contains(&(tile_idx, side))
    }

    /// Discover contacts from geometry and store them with the periodicity
    /// flags. See [`build_topology`].
    pub fn compute_topology(
        &mut self,
        options: &TopologyOptions,
    ) -> Result<&[Contact], MosaicError> {
        let contacts = build_topology(self, options)?;
        self.period_x = contacts.iter().any(|c| c.is_periodic_x());
        self.period_y = contacts.iter().any(|c| c.is_periodic_y());
        self.contacts = contacts;
        Ok(&self.contacts)
    }

    fn clear_topology(&mut self) {
        self.contacts.clear();
        self.period_x = false;
        self.period_y = false;
    }

    #[inline]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Contacts touching `tile_idx`, on either end.
    pub fn contacts_of(&self, tile_idx: usize) -> impl Iterator<Item = &Contact> + '_ {
        self.contacts.iter().filter(move |c| c.tile_a == tile_idx || c.tile_b == tile_idx)
    }

    /// A tile wraps onto itself east-west.
    #[inline]
    pub fn period_x(&self) -> bool {
        self.period_x
    }

    /// A tile wraps onto itself north-south.
    #[inline]
    pub fn period_y(&self) -> bool {
        self.period_y
    }

    /// Per-tile masks in mosaic order, taking `overrides` first and falling
    /// back to each mesh's own mask. Shapes are checked.
    pub(crate) fn resolve_masks<'a>(
        &'a self,
        overrides: Option<&'a TileMasks>,
    ) -> Result<Vec<Option<&'a [f64]>>, MosaicError> {
        if let Some(map) = overrides {
            if let Some(unknown) = map.keys().find(|k| !self.index.contains_key(*k)) {
                return Err(MosaicError::UnknownTile(unknown.clone()));
            }
        }
        self.tiles
            .iter()
            .map(|mesh| match overrides.and_then(|m| m.get(mesh.tile())) {
                Some(mask) => {
                    mesh.check_cell_array("mask", mask.len())?;
                    Ok(Some(mask.as_slice()))
                }
                None => Ok(mesh.mask()),
            })
            .collect()
    }
}
