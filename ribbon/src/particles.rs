// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Borrowed view over the particle attributes of one frame.

use ribbon_encoding::{
    order_key_from_f32, order_key_from_i32, GpuParticle, LinkOrderKind, RibbonIdKind, Vec3,
};

use crate::{Error, Result};

/// Ribbon id made of a particle slot index and the tag it was acquired with.
///
/// Ids compare by `index` first, then by `acquire_tag`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FullRibbonId {
    pub index: i32,
    pub acquire_tag: i32,
}

/// Which particles belong to the same ribbon.
#[derive(Clone, Copy, Debug, Default)]
pub enum RibbonIds<'a> {
    /// All particles form a single ribbon.
    #[default]
    None,
    Simple(&'a [i32]),
    Full(&'a [FullRibbonId]),
}

/// Key that orders the particles along their ribbon.
#[derive(Clone, Copy, Debug)]
pub enum LinkOrder<'a> {
    /// Sorted ascending.
    Float(&'a [f32]),
    /// Sorted descending.
    Int(&'a [i32]),
}

impl LinkOrder<'_> {
    pub fn kind(&self) -> LinkOrderKind {
        match self {
            Self::Float(_) => LinkOrderKind::Float,
            Self::Int(_) => LinkOrderKind::Int,
        }
    }

    /// Encoded key of particle `i`, comparable with [`LinkOrderKind::compare`].
    pub fn key(&self, i: usize) -> u32 {
        match self {
            Self::Float(v) => order_key_from_f32(v[i]),
            Self::Int(v) => order_key_from_i32(v[i]),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Int(v) => v.len(),
        }
    }
}

/// Read-only particle attributes.
///
/// Only `positions` and `link_order` are needed to generate geometry; every other
/// attribute falls back to its default when absent.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParticleData<'a> {
    pub positions: Option<&'a [Vec3]>,
    pub normalized_ages: Option<&'a [f32]>,
    pub widths: Option<&'a [f32]>,
    pub twists: Option<&'a [f32]>,
    pub ribbon_ids: RibbonIds<'a>,
    pub link_order: Option<LinkOrder<'a>>,
    /// Per-particle U coordinate of the first channel, replacing the solved one.
    pub u0_override: Option<&'a [f32]>,
    pub u1_override: Option<&'a [f32]>,
}

fn attribute<T: Copy>(data: Option<&[T]>, i: usize, default: T) -> T {
    data.and_then(|d| d.get(i).copied()).unwrap_or(default)
}

impl<'a> ParticleData<'a> {
    /// Particles with positions and the given link order, no other attribute.
    pub fn new(positions: &'a [Vec3], link_order: LinkOrder<'a>) -> Self {
        Self {
            positions: Some(positions),
            link_order: Some(link_order),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.positions.map_or(0, <[Vec3]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks that every present attribute has one value per particle.
    pub fn validate(&self) -> Result<()> {
        let expected = self.len();
        let check = |attribute: &'static str, actual: Option<usize>| match actual {
            Some(actual) if actual != expected => Err(Error::AttributeLength {
                attribute,
                expected,
                actual,
            }),
            _ => Ok(()),
        };
        check("normalized_age", self.normalized_ages.map(<[f32]>::len))?;
        check("width", self.widths.map(<[f32]>::len))?;
        check("twist", self.twists.map(<[f32]>::len))?;
        check("link_order", self.link_order.as_ref().map(LinkOrder::len))?;
        check("u0_override", self.u0_override.map(<[f32]>::len))?;
        check("u1_override", self.u1_override.map(<[f32]>::len))?;
        match self.ribbon_ids {
            RibbonIds::None => Ok(()),
            RibbonIds::Simple(ids) => check("ribbon_id", Some(ids.len())),
            RibbonIds::Full(ids) => check("ribbon_id", Some(ids.len())),
        }
    }

    /// Geometry is only generated with positions, a link order and at least two
    /// particles.
    pub fn is_renderable(&self) -> bool {
        self.positions.is_some() && self.link_order.is_some() && self.len() >= 2
    }

    pub fn ribbon_id_kind(&self) -> RibbonIdKind {
        match self.ribbon_ids {
            RibbonIds::None => RibbonIdKind::None,
            RibbonIds::Simple(_) => RibbonIdKind::Simple,
            RibbonIds::Full(_) => RibbonIdKind::Full,
        }
    }

    pub fn has_twist(&self) -> bool {
        self.twists.is_some()
    }

    pub fn position(&self, i: usize) -> Vec3 {
        attribute(self.positions, i, Vec3::ZERO)
    }

    pub fn normalized_age(&self, i: usize) -> f32 {
        attribute(self.normalized_ages, i, 0.0)
    }

    pub fn width(&self, i: usize) -> f32 {
        attribute(self.widths, i, 1.0)
    }

    pub fn twist(&self, i: usize) -> f32 {
        attribute(self.twists, i, 0.0)
    }

    /// Ribbon id of particle `i`; simple ids carry an acquire tag of zero.
    pub fn ribbon_id(&self, i: usize) -> FullRibbonId {
        match self.ribbon_ids {
            RibbonIds::None => FullRibbonId::default(),
            RibbonIds::Simple(ids) => FullRibbonId {
                index: ids[i],
                acquire_tag: 0,
            },
            RibbonIds::Full(ids) => ids[i],
        }
    }

    /// Packs the attributes the compute stages read.
    pub fn to_gpu_particles(&self) -> Vec<GpuParticle> {
        (0..self.len())
            .map(|i| {
                let id = self.ribbon_id(i);
                GpuParticle {
                    position: self.position(i),
                    normalized_age: self.normalized_age(i),
                    width: self.width(i),
                    twist: self.twist(i),
                    ribbon_id: id.index,
                    acquire_tag: id.acquire_tag,
                    order: self.link_order.as_ref().map_or(0, |order| order.key(i)),
                    ..Default::default()
                }
            })
            .collect()
    }
}
